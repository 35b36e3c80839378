use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::{FromRow, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "file_category", rename_all = "lowercase")]
pub enum FileCategory {
    Photo,
    Certificate,
}

impl FileCategory {
    pub fn dir(&self) -> &'static str {
        match self {
            FileCategory::Photo => "photo",
            FileCategory::Certificate => "certificate",
        }
    }

    pub fn max_size(&self) -> usize {
        match self {
            FileCategory::Photo => 1024 * 1024,
            FileCategory::Certificate => 2 * 1024 * 1024,
        }
    }

    pub fn accepts(&self, mime_type: &str) -> bool {
        match self {
            FileCategory::Photo => matches!(mime_type, "image/jpeg" | "image/png" | "image/jpg"),
            FileCategory::Certificate => mime_type == "application/pdf",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FileEntry {
    pub id: i64,
    pub alumni_id: i64,
    pub category: FileCategory,
    pub file_name: String,
    pub original_name: String,
    pub file_path: String,
    pub file_size: i64,
    pub file_type: String,
    pub uploaded_at: DateTime<Utc>,
}

pub struct NewFile {
    pub alumni_id: i64,
    pub category: FileCategory,
    pub file_name: String,
    pub original_name: String,
    pub file_path: String,
    pub file_size: i64,
    pub file_type: String,
}
