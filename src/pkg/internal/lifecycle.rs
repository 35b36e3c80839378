//! Job records: reads, admin maintenance and the trash lifecycle.
//!
//! ```text
//! Active --trash--> Trashed --restore--> Active
//!                   Trashed --purge----> (gone)
//! ```
//!
//! Every state change is a single conditional write against the store. The
//! record is read first only to tell "wrong state" from "not yours"; the
//! write re-checks state and owner, so a concurrent change shows up as
//! `NotFound` instead of being overwritten.

use std::{sync::Arc, time::Duration};

use chrono::Utc;

use crate::{
    pkg::internal::{
        adaptors::jobs::spec::{JobEntry, JobFilter, JobGuard, JobState, Transition},
        pagination::{JobSort, ListQuery, Order, Page, Sort},
        policy::{can_act_on, Action, Actor},
        store::{with_deadline, Store},
        validation::JobInput,
    },
    prelude::{AppError, Result},
};

pub struct JobLifecycle {
    store: Arc<dyn Store>,
    deadline: Duration,
}

impl JobLifecycle {
    pub fn new(store: Arc<dyn Store>, deadline: Duration) -> Self {
        JobLifecycle { store, deadline }
    }

    async fn page(&self, filter: JobFilter, query: &ListQuery<JobSort>) -> Result<Page<JobEntry>> {
        let items = with_deadline(
            self.deadline,
            self.store.list_jobs(&filter, query.sort, Some(query.page)),
        )
        .await?;
        let total = with_deadline(self.deadline, self.store.count_jobs(&filter)).await?;
        Ok(Page::new(items, total, query))
    }

    async fn alumni_of(&self, actor: &Actor) -> Result<Option<i64>> {
        let profile = with_deadline(self.deadline, self.store.alumni_by_user(actor.user_id)).await?;
        Ok(profile.map(|a| a.id))
    }

    /// Loads the record and checks it is in `expected` state and that the
    /// actor may perform `action` on it. Returns the guard the write must use.
    async fn authorize(
        &self,
        id: i64,
        expected: JobState,
        actor: &Actor,
        action: Action,
    ) -> Result<JobGuard> {
        let record = with_deadline(self.deadline, self.store.job_by_id(id, JobState::Any))
            .await?
            .filter(|r| expected.matches(r))
            .ok_or_else(|| AppError::not_found("job record"))?;
        let actor_alumni = if actor.is_admin() {
            None
        } else {
            self.alumni_of(actor).await?
        };
        if !can_act_on(actor, actor_alumni, record.alumni_id, action) {
            tracing::warn!(
                "user {} denied {:?} on job {} of alumni {}",
                actor.user_id,
                action,
                id,
                record.alumni_id
            );
            return Err(AppError::Forbidden(
                "you can only manage job records of your own alumni profile".into(),
            ));
        }
        Ok(JobGuard {
            state: expected,
            alumni_id: (!actor.is_admin()).then_some(record.alumni_id),
        })
    }

    fn require(actor: &Actor, action: Action) -> Result<()> {
        if can_act_on(actor, None, 0, action) {
            Ok(())
        } else {
            Err(AppError::Forbidden("admin role required".into()))
        }
    }

    pub async fn list(&self, query: &ListQuery<JobSort>) -> Result<Page<JobEntry>> {
        let filter = JobFilter {
            state: JobState::Active,
            alumni_id: None,
            search: query.search.clone(),
        };
        self.page(filter, query).await
    }

    pub async fn get(&self, id: i64) -> Result<JobEntry> {
        with_deadline(self.deadline, self.store.job_by_id(id, JobState::Active))
            .await?
            .ok_or_else(|| AppError::not_found("job record"))
    }

    pub async fn list_by_alumni(&self, actor: &Actor, alumni_id: i64) -> Result<Vec<JobEntry>> {
        Self::require(actor, Action::Manage)?;
        with_deadline(self.deadline, self.store.alumni_by_id(alumni_id))
            .await?
            .ok_or_else(|| AppError::not_found("alumni"))?;
        let filter = JobFilter {
            state: JobState::Active,
            alumni_id: Some(alumni_id),
            search: None,
        };
        let sort = Sort {
            field: JobSort::StartDate,
            order: Order::Desc,
        };
        with_deadline(self.deadline, self.store.list_jobs(&filter, sort, None)).await
    }

    pub async fn create(&self, actor: &Actor, input: JobInput) -> Result<JobEntry> {
        Self::require(actor, Action::Manage)?;
        // a missing alumni_id is left for validation to report
        if let Some(alumni_id) = input.alumni_id {
            with_deadline(self.deadline, self.store.alumni_by_id(alumni_id))
                .await?
                .ok_or_else(|| AppError::not_found("alumni"))?;
        }
        let (alumni_id, draft) = input.into_new()?;
        let job = with_deadline(self.deadline, self.store.create_job(alumni_id, draft)).await?;
        tracing::info!("{} created job {} for alumni {}", actor.username, job.id, alumni_id);
        Ok(job)
    }

    pub async fn update(&self, actor: &Actor, id: i64, input: JobInput) -> Result<JobEntry> {
        Self::require(actor, Action::Manage)?;
        self.get(id).await?;
        let draft = input.into_draft()?;
        // still conditional: the record may be trashed in between
        let job = with_deadline(self.deadline, self.store.update_job(id, draft))
            .await?
            .ok_or_else(|| AppError::not_found("job record"))?;
        tracing::info!("{} updated job {}", actor.username, id);
        Ok(job)
    }

    /// Removes the record whatever its state.
    pub async fn hard_delete(&self, actor: &Actor, id: i64) -> Result<()> {
        Self::require(actor, Action::Manage)?;
        let guard = JobGuard {
            state: JobState::Any,
            alumni_id: None,
        };
        if !with_deadline(self.deadline, self.store.delete_job(id, guard)).await? {
            return Err(AppError::not_found("job record"));
        }
        tracing::info!("{} deleted job {}", actor.username, id);
        Ok(())
    }

    pub async fn soft_delete(&self, actor: &Actor, id: i64) -> Result<JobEntry> {
        let transition = Transition::Trash {
            at: Utc::now(),
            by: actor.user_id,
        };
        let guard = self.authorize(id, transition.source(), actor, Action::Trash).await?;
        let job = with_deadline(self.deadline, self.store.transition_job(id, guard, transition))
            .await?
            .ok_or_else(|| AppError::not_found("job record"))?;
        tracing::info!("{} moved job {} to trash", actor.username, id);
        Ok(job)
    }

    pub async fn restore(&self, actor: &Actor, id: i64) -> Result<JobEntry> {
        let transition = Transition::Restore;
        let guard = self.authorize(id, transition.source(), actor, Action::Restore).await?;
        let job = with_deadline(self.deadline, self.store.transition_job(id, guard, transition))
            .await?
            .ok_or_else(|| AppError::not_found("job record"))?;
        tracing::info!("{} restored job {}", actor.username, id);
        Ok(job)
    }

    /// Permanently removes a trashed record.
    pub async fn purge(&self, actor: &Actor, id: i64) -> Result<()> {
        let guard = self
            .authorize(id, JobState::Trashed, actor, Action::PurgeTrashed)
            .await?;
        if !with_deadline(self.deadline, self.store.delete_job(id, guard)).await? {
            return Err(AppError::not_found("job record"));
        }
        tracing::info!("{} purged job {} from trash", actor.username, id);
        Ok(())
    }

    /// Admins see every trashed record, users only those of their own
    /// profile. Newest deletions first.
    pub async fn list_trash(&self, actor: &Actor, query: &ListQuery<JobSort>) -> Result<Page<JobEntry>> {
        let query = ListQuery {
            sort: Sort {
                field: JobSort::DeletedAt,
                order: Order::Desc,
            },
            ..query.clone()
        };
        let alumni_id = if actor.is_admin() {
            None
        } else {
            match self.alumni_of(actor).await? {
                Some(id) => Some(id),
                None => return Ok(Page::new(Vec::new(), 0, &query)),
            }
        };
        let filter = JobFilter {
            state: JobState::Trashed,
            alumni_id,
            search: query.search.clone(),
        };
        self.page(filter, &query).await
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use crate::{
        pkg::internal::{
            adaptors::{jobs::spec::JobState, users::spec::Role},
            fixtures,
            pagination::{JobSort, ListParams, ListQuery},
        },
        prelude::AppError,
    };

    fn everything() -> ListQuery<JobSort> {
        ListQuery::from_params(&ListParams::default())
    }

    #[tokio::test]
    #[traced_test]
    async fn trash_then_restore_only_clears_the_trash_stamp() {
        let world = fixtures::world().await;
        let (owner, alumni) = world.alumnus("andi", "1001").await;
        let job = world.job(alumni.id, "Acme").await;

        let trashed = world.jobs.soft_delete(&owner, job.id).await.unwrap();
        assert!(trashed.is_deleted);
        assert_eq!(trashed.deleted_by, Some(owner.user_id));
        assert!(trashed.deleted_at.is_some());

        let restored = world.jobs.restore(&owner, job.id).await.unwrap();
        assert_eq!(restored, job);
    }

    #[tokio::test]
    #[traced_test]
    async fn trashing_twice_fails_without_restamping() {
        let world = fixtures::world().await;
        let (owner, alumni) = world.alumnus("andi", "1001").await;
        let job = world.job(alumni.id, "Acme").await;
        let first = world.jobs.soft_delete(&owner, job.id).await.unwrap();

        let again = world.jobs.soft_delete(&world.admin, job.id).await;
        assert!(matches!(again, Err(AppError::NotFound(_))));
        let stored = world.store.job_by_id(job.id, JobState::Any).await.unwrap().unwrap();
        assert_eq!(stored.deleted_at, first.deleted_at);
    }

    #[tokio::test]
    #[traced_test]
    async fn strangers_are_forbidden_and_nothing_changes() {
        let world = fixtures::world().await;
        let (_, alumni) = world.alumnus("andi", "1001").await;
        let (stranger, _) = world.alumnus("bela", "1002").await;
        let job = world.job(alumni.id, "Acme").await;

        let res = world.jobs.soft_delete(&stranger, job.id).await;
        assert!(matches!(res, Err(AppError::Forbidden(_))));
        let stored = world.store.job_by_id(job.id, JobState::Any).await.unwrap().unwrap();
        assert!(!stored.is_deleted);

        world.jobs.soft_delete(&world.admin, job.id).await.unwrap();
        assert!(matches!(
            world.jobs.restore(&stranger, job.id).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            world.jobs.purge(&stranger, job.id).await,
            Err(AppError::Forbidden(_))
        ));
        let stored = world.store.job_by_id(job.id, JobState::Any).await.unwrap().unwrap();
        assert!(stored.is_deleted);
    }

    #[tokio::test]
    #[traced_test]
    async fn purge_requires_the_record_to_be_trashed() {
        let world = fixtures::world().await;
        let (owner, alumni) = world.alumnus("andi", "1001").await;
        let job = world.job(alumni.id, "Acme").await;

        let res = world.jobs.purge(&world.admin, job.id).await;
        assert!(matches!(res, Err(AppError::NotFound(_))));

        world.jobs.soft_delete(&owner, job.id).await.unwrap();
        world.jobs.purge(&owner, job.id).await.unwrap();
        assert!(world.store.job_by_id(job.id, JobState::Any).await.unwrap().is_none());
        assert!(matches!(world.jobs.get(job.id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    #[traced_test]
    async fn trash_listing_is_scoped_to_the_owner() {
        let world = fixtures::world().await;
        let (andi, x) = world.alumnus("andi", "1001").await;
        let (bela, y) = world.alumnus("bela", "1002").await;
        let job = world.job(x.id, "Acme").await;
        let other = world.job(y.id, "Globex").await;
        world.jobs.soft_delete(&andi, job.id).await.unwrap();
        world.jobs.soft_delete(&bela, other.id).await.unwrap();

        let mine = world.jobs.list_trash(&andi, &everything()).await.unwrap();
        assert_eq!(mine.items.iter().map(|j| j.id).collect::<Vec<_>>(), vec![job.id]);
        let theirs = world.jobs.list_trash(&bela, &everything()).await.unwrap();
        assert!(theirs.items.iter().all(|j| j.id != job.id));
        assert_eq!(theirs.meta.sort_by, "deleted_at");

        let all = world.jobs.list_trash(&world.admin, &everything()).await.unwrap();
        assert_eq!(all.meta.total, 2);
        assert_eq!(all.items[0].id, other.id);

        let nobody = world.actor("citra", Role::User).await;
        let empty = world.jobs.list_trash(&nobody, &everything()).await.unwrap();
        assert_eq!((empty.meta.total, empty.meta.pages), (0, 0));
    }

    #[tokio::test]
    #[traced_test]
    async fn trashed_records_leave_the_regular_views() {
        let world = fixtures::world().await;
        let (owner, alumni) = world.alumnus("andi", "1001").await;
        let job = world.job(alumni.id, "Acme").await;
        world.job(alumni.id, "Globex").await;
        world.jobs.soft_delete(&owner, job.id).await.unwrap();

        let page = world.jobs.list(&everything()).await.unwrap();
        assert_eq!(page.meta.total, 1);
        let by_alumni = world.jobs.list_by_alumni(&world.admin, alumni.id).await.unwrap();
        assert_eq!(by_alumni.len(), 1);
        assert!(matches!(
            world.jobs.update(&world.admin, job.id, fixtures::job_input(alumni.id, "New")).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            world.jobs.list_by_alumni(&owner, alumni.id).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    #[traced_test]
    async fn admin_delete_ignores_state_and_create_needs_alumni() {
        let world = fixtures::world().await;
        let (_, alumni) = world.alumnus("andi", "1001").await;
        let job = world.job(alumni.id, "Acme").await;
        world.jobs.hard_delete(&world.admin, job.id).await.unwrap();
        assert!(matches!(
            world.jobs.hard_delete(&world.admin, job.id).await,
            Err(AppError::NotFound(_))
        ));

        let missing = world.jobs.create(&world.admin, fixtures::job_input(999, "Acme")).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));

        let mut pending = fixtures::job_input(alumni.id, "Acme");
        pending.status = "pending".into();
        assert!(matches!(
            world.jobs.create(&world.admin, pending).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    #[traced_test]
    async fn missing_records_win_over_bad_payloads() {
        let world = fixtures::world().await;
        let (owner, alumni) = world.alumnus("andi", "1001").await;

        let mut pending = fixtures::job_input(999, "Acme");
        pending.status = "pending".into();
        assert!(matches!(
            world.jobs.create(&world.admin, pending.clone()).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            world.jobs.update(&world.admin, 424242, pending.clone()).await,
            Err(AppError::NotFound(_))
        ));

        let job = world.job(alumni.id, "Acme").await;
        world.jobs.soft_delete(&owner, job.id).await.unwrap();
        assert!(matches!(
            world.jobs.update(&world.admin, job.id, pending).await,
            Err(AppError::NotFound(_))
        ));

        let mut orphan = fixtures::job_input(alumni.id, "Acme");
        orphan.alumni_id = None;
        match world.jobs.create(&world.admin, orphan).await {
            Err(AppError::Validation(problems)) => {
                assert!(problems.contains(&"alumni_id is required".to_string()))
            }
            other => panic!("expected a validation error, got {other:?}"),
        }
    }
}
