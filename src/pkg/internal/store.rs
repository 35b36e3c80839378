//! Record store interface shared by the Postgres and document backends.
//!
//! Business logic only ever talks to `dyn Store`; which backend sits behind
//! it is decided once at startup.

use std::{future::Future, time::Duration};

use async_trait::async_trait;

use crate::{
    pkg::internal::{
        adaptors::{
            alumni::spec::{AlumniDraft, AlumniEntry},
            files::spec::{FileEntry, NewFile},
            jobs::spec::{JobDraft, JobEntry, JobFilter, JobGuard, JobState, Transition},
            users::spec::{NewUser, UserEntry},
        },
        pagination::{AlumniSort, JobSort, ListQuery, PageRequest, Sort},
    },
    prelude::{AppError, Result},
};

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Exact, case-sensitive match on username or email.
    async fn user_by_login(&self, identifier: &str) -> Result<Option<UserEntry>>;
    async fn user_by_id(&self, id: i64) -> Result<Option<UserEntry>>;
    async fn create_user(&self, user: NewUser) -> Result<UserEntry>;
}

#[async_trait]
pub trait AlumniStore: Send + Sync {
    async fn alumni_by_id(&self, id: i64) -> Result<Option<AlumniEntry>>;
    async fn alumni_by_user(&self, user_id: i64) -> Result<Option<AlumniEntry>>;
    /// Fails with `Conflict` when the NIM or the linked user is already taken.
    async fn create_alumni(&self, draft: AlumniDraft) -> Result<AlumniEntry>;
    /// Leaves `user_id` untouched.
    async fn update_alumni(&self, id: i64, draft: AlumniDraft) -> Result<Option<AlumniEntry>>;
    /// Removes the profile together with its job records and file metadata.
    async fn delete_alumni(&self, id: i64) -> Result<bool>;
    async fn list_alumni(&self, query: &ListQuery<AlumniSort>) -> Result<Vec<AlumniEntry>>;
    async fn count_alumni(&self, search: Option<&str>) -> Result<u64>;
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn job_by_id(&self, id: i64, state: JobState) -> Result<Option<JobEntry>>;
    async fn create_job(&self, alumni_id: i64, draft: JobDraft) -> Result<JobEntry>;
    /// Only active records are updated.
    async fn update_job(&self, id: i64, draft: JobDraft) -> Result<Option<JobEntry>>;
    /// Single conditional write: applies `transition` only if the record
    /// still satisfies `guard`. `None` means nothing matched.
    async fn transition_job(
        &self,
        id: i64,
        guard: JobGuard,
        transition: Transition,
    ) -> Result<Option<JobEntry>>;
    /// `window: None` returns every match.
    async fn list_jobs(
        &self,
        filter: &JobFilter,
        sort: Sort<JobSort>,
        window: Option<PageRequest>,
    ) -> Result<Vec<JobEntry>>;
    async fn count_jobs(&self, filter: &JobFilter) -> Result<u64>;
    /// Conditional delete; `false` means nothing matched `guard`.
    async fn delete_job(&self, id: i64, guard: JobGuard) -> Result<bool>;
}

#[async_trait]
pub trait FileStore: Send + Sync {
    async fn create_file(&self, file: NewFile) -> Result<FileEntry>;
    async fn file_by_id(&self, id: i64) -> Result<Option<FileEntry>>;
    async fn files_for_alumni(&self, alumni_id: i64) -> Result<Vec<FileEntry>>;
    async fn delete_file(&self, id: i64) -> Result<bool>;
}

#[async_trait]
pub trait Store: UserStore + AlumniStore + JobStore + FileStore {
    async fn ping(&self) -> Result<()>;
}

/// Bounds a store interaction; a backend that does not answer in time is
/// reported as `StoreUnavailable`.
pub async fn with_deadline<T>(limit: Duration, fut: impl Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::error!("store call exceeded {:?}", limit);
            Err(AppError::StoreUnavailable)
        }
    }
}
