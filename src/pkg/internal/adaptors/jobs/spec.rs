use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::{FromRow, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "job_status", rename_all = "lowercase")]
pub enum JobStatus {
    Active,
    Completed,
    Resigned,
}

impl JobStatus {
    pub const ALLOWED: [&'static str; 3] = ["active", "completed", "resigned"];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "active" => Some(JobStatus::Active),
            "completed" => Some(JobStatus::Completed),
            "resigned" => Some(JobStatus::Resigned),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Active => "active",
            JobStatus::Completed => "completed",
            JobStatus::Resigned => "resigned",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct JobEntry {
    pub id: i64,
    pub alumni_id: i64,
    pub company: String,
    pub position: String,
    pub industry: String,
    pub location: String,
    pub salary_range: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: JobStatus,
    pub description: Option<String>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle state filter. `Active` is `is_deleted = false`, `Trashed` is
/// `is_deleted = true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobState {
    #[default]
    Active,
    Trashed,
    Any,
}

impl JobState {
    pub fn deleted_flag(self) -> Option<bool> {
        match self {
            JobState::Active => Some(false),
            JobState::Trashed => Some(true),
            JobState::Any => None,
        }
    }

    pub fn matches(self, job: &JobEntry) -> bool {
        self.deleted_flag().map_or(true, |flag| job.is_deleted == flag)
    }
}

/// Precondition of a conditional write: the record must be in `state` and,
/// when set, belong to `alumni_id`.
#[derive(Debug, Clone, Copy)]
pub struct JobGuard {
    pub state: JobState,
    pub alumni_id: Option<i64>,
}

impl JobGuard {
    pub fn matches(&self, job: &JobEntry) -> bool {
        self.state.matches(job) && self.alumni_id.map_or(true, |a| job.alumni_id == a)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Transition {
    Trash { at: DateTime<Utc>, by: i64 },
    Restore,
}

impl Transition {
    /// State a record has to be in for this transition to apply.
    pub fn source(&self) -> JobState {
        match self {
            Transition::Trash { .. } => JobState::Active,
            Transition::Restore => JobState::Trashed,
        }
    }

    pub fn apply(&self, job: &mut JobEntry) {
        match *self {
            Transition::Trash { at, by } => {
                job.is_deleted = true;
                job.deleted_at = Some(at);
                job.deleted_by = Some(by);
            }
            Transition::Restore => {
                job.is_deleted = false;
                job.deleted_at = None;
                job.deleted_by = None;
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub state: JobState,
    pub alumni_id: Option<i64>,
    pub search: Option<String>,
}

/// Validated job fields ready to be written.
#[derive(Debug, Clone)]
pub struct JobDraft {
    pub company: String,
    pub position: String,
    pub industry: String,
    pub location: String,
    pub salary_range: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: JobStatus,
    pub description: Option<String>,
}
