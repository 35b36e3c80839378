use std::time::Duration;

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, QueryBuilder};

use crate::{
    pkg::internal::{
        adaptors::{
            alumni::{
                mutators::AlumniMutator,
                selectors::AlumniSelector,
                spec::{AlumniDraft, AlumniEntry},
            },
            files::{
                mutators::FileMutator,
                selectors::FileSelector,
                spec::{FileEntry, NewFile},
            },
            jobs::{
                mutators::JobMutator,
                selectors::JobSelector,
                spec::{JobDraft, JobEntry, JobFilter, JobGuard, JobState, Transition},
            },
            users::{
                mutators::UserMutator,
                selectors::UserSelector,
                spec::{NewUser, UserEntry},
            },
        },
        pagination::{AlumniSort, JobSort, ListQuery, PageRequest, Sort},
        store::{AlumniStore, FileStore, JobStore, Store, UserStore},
    },
    prelude::Result,
};

/// Appends a case-insensitive substring match of `term` against any of
/// `columns`. Column names come from fixed allow-lists, only the term is bound.
pub fn push_search(qb: &mut QueryBuilder<'_, Postgres>, columns: &[&str], term: &str) {
    qb.push(" AND (");
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            qb.push(" OR ");
        }
        qb.push("strpos(lower(")
            .push(*column)
            .push("), lower(")
            .push_bind(term.to_string())
            .push(")) > 0");
    }
    qb.push(")");
}

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connections are opened on first use, so a database that is down at
    /// boot only fails the requests that need it.
    pub fn connect_lazy(url: &str, max_connections: u32, acquire_timeout: Duration) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect_lazy(url)?;
        Ok(PgStore { pool })
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn user_by_login(&self, identifier: &str) -> Result<Option<UserEntry>> {
        let mut conn = self.pool.acquire().await?;
        UserSelector::new(&mut conn).get_by_login(identifier).await
    }

    async fn user_by_id(&self, id: i64) -> Result<Option<UserEntry>> {
        let mut conn = self.pool.acquire().await?;
        UserSelector::new(&mut conn).get_by_id(id).await
    }

    async fn create_user(&self, user: NewUser) -> Result<UserEntry> {
        let mut conn = self.pool.acquire().await?;
        UserMutator::new(&mut conn).create(user).await
    }
}

#[async_trait]
impl AlumniStore for PgStore {
    async fn alumni_by_id(&self, id: i64) -> Result<Option<AlumniEntry>> {
        let mut conn = self.pool.acquire().await?;
        AlumniSelector::new(&mut conn).get_by_id(id).await
    }

    async fn alumni_by_user(&self, user_id: i64) -> Result<Option<AlumniEntry>> {
        let mut conn = self.pool.acquire().await?;
        AlumniSelector::new(&mut conn).get_by_user(user_id).await
    }

    async fn create_alumni(&self, draft: AlumniDraft) -> Result<AlumniEntry> {
        let mut conn = self.pool.acquire().await?;
        AlumniMutator::new(&mut conn).create(draft).await
    }

    async fn update_alumni(&self, id: i64, draft: AlumniDraft) -> Result<Option<AlumniEntry>> {
        let mut conn = self.pool.acquire().await?;
        AlumniMutator::new(&mut conn).update(id, draft).await
    }

    async fn delete_alumni(&self, id: i64) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        AlumniMutator::new(&mut conn).delete(id).await
    }

    async fn list_alumni(&self, query: &ListQuery<AlumniSort>) -> Result<Vec<AlumniEntry>> {
        let mut conn = self.pool.acquire().await?;
        AlumniSelector::new(&mut conn).list(query).await
    }

    async fn count_alumni(&self, search: Option<&str>) -> Result<u64> {
        let mut conn = self.pool.acquire().await?;
        AlumniSelector::new(&mut conn).count(search).await
    }
}

#[async_trait]
impl JobStore for PgStore {
    async fn job_by_id(&self, id: i64, state: JobState) -> Result<Option<JobEntry>> {
        let mut conn = self.pool.acquire().await?;
        JobSelector::new(&mut conn).get_by_id(id, state).await
    }

    async fn create_job(&self, alumni_id: i64, draft: JobDraft) -> Result<JobEntry> {
        let mut conn = self.pool.acquire().await?;
        JobMutator::new(&mut conn).create(alumni_id, draft).await
    }

    async fn update_job(&self, id: i64, draft: JobDraft) -> Result<Option<JobEntry>> {
        let mut conn = self.pool.acquire().await?;
        JobMutator::new(&mut conn).update(id, draft).await
    }

    async fn transition_job(
        &self,
        id: i64,
        guard: JobGuard,
        transition: Transition,
    ) -> Result<Option<JobEntry>> {
        let mut conn = self.pool.acquire().await?;
        JobMutator::new(&mut conn).transition(id, guard, transition).await
    }

    async fn list_jobs(
        &self,
        filter: &JobFilter,
        sort: Sort<JobSort>,
        window: Option<PageRequest>,
    ) -> Result<Vec<JobEntry>> {
        let mut conn = self.pool.acquire().await?;
        JobSelector::new(&mut conn).list(filter, sort, window).await
    }

    async fn count_jobs(&self, filter: &JobFilter) -> Result<u64> {
        let mut conn = self.pool.acquire().await?;
        JobSelector::new(&mut conn).count(filter).await
    }

    async fn delete_job(&self, id: i64, guard: JobGuard) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        JobMutator::new(&mut conn).delete(id, guard).await
    }
}

#[async_trait]
impl FileStore for PgStore {
    async fn create_file(&self, file: NewFile) -> Result<FileEntry> {
        let mut conn = self.pool.acquire().await?;
        FileMutator::new(&mut conn).create(file).await
    }

    async fn file_by_id(&self, id: i64) -> Result<Option<FileEntry>> {
        let mut conn = self.pool.acquire().await?;
        FileSelector::new(&mut conn).get_by_id(id).await
    }

    async fn files_for_alumni(&self, alumni_id: i64) -> Result<Vec<FileEntry>> {
        let mut conn = self.pool.acquire().await?;
        FileSelector::new(&mut conn).get_by_alumni(alumni_id).await
    }

    async fn delete_file(&self, id: i64) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        FileMutator::new(&mut conn).delete(id).await
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
