use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AlumniEntry {
    pub id: i64,
    pub user_id: Option<i64>,
    pub nim: String,
    pub name: String,
    pub program: String,
    pub cohort_year: i32,
    pub graduation_year: i32,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated alumni fields ready to be written.
#[derive(Debug, Clone)]
pub struct AlumniDraft {
    pub user_id: Option<i64>,
    pub nim: String,
    pub name: String,
    pub program: String,
    pub cohort_year: i32,
    pub graduation_year: i32,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}
