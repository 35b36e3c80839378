use std::{sync::Arc, time::Duration};

use crate::{
    pkg::internal::{
        adaptors::alumni::spec::AlumniEntry,
        blob::BlobStore,
        pagination::{AlumniSort, ListQuery, Page},
        policy::{can_act_on, Action, Actor},
        store::{with_deadline, Store},
        validation::AlumniInput,
    },
    prelude::{AppError, Result},
};

pub struct AlumniService {
    store: Arc<dyn Store>,
    blobs: Arc<dyn BlobStore>,
    deadline: Duration,
}

impl AlumniService {
    pub fn new(store: Arc<dyn Store>, blobs: Arc<dyn BlobStore>, deadline: Duration) -> Self {
        AlumniService {
            store,
            blobs,
            deadline,
        }
    }

    pub async fn list(&self, query: &ListQuery<AlumniSort>) -> Result<Page<AlumniEntry>> {
        let items = with_deadline(self.deadline, self.store.list_alumni(query)).await?;
        let total = with_deadline(self.deadline, self.store.count_alumni(query.search.as_deref())).await?;
        Ok(Page::new(items, total, query))
    }

    pub async fn get(&self, id: i64) -> Result<AlumniEntry> {
        with_deadline(self.deadline, self.store.alumni_by_id(id))
            .await?
            .ok_or_else(|| AppError::not_found("alumni"))
    }

    /// Users register their own profile; admins may link any user or none.
    /// A user never gets a second profile.
    pub async fn create(&self, actor: &Actor, input: AlumniInput) -> Result<AlumniEntry> {
        let mut draft = input.into_draft()?;
        if !actor.is_admin() {
            draft.user_id = Some(actor.user_id);
        }
        if let Some(user_id) = draft.user_id {
            with_deadline(self.deadline, self.store.user_by_id(user_id))
                .await?
                .ok_or_else(|| AppError::not_found("user"))?;
            let existing = with_deadline(self.deadline, self.store.alumni_by_user(user_id)).await?;
            if existing.is_some() {
                return Err(AppError::Conflict(
                    "an alumni profile already exists for this user".into(),
                ));
            }
        }
        let alumni = with_deadline(self.deadline, self.store.create_alumni(draft)).await?;
        tracing::info!("user {} created alumni {}", actor.user_id, alumni.id);
        Ok(alumni)
    }

    pub async fn update(&self, actor: &Actor, id: i64, input: AlumniInput) -> Result<AlumniEntry> {
        if !can_act_on(actor, None, id, Action::Manage) {
            return Err(AppError::Forbidden("admin role required".into()));
        }
        let draft = input.into_draft()?;
        let alumni = with_deadline(self.deadline, self.store.update_alumni(id, draft))
            .await?
            .ok_or_else(|| AppError::not_found("alumni"))?;
        tracing::info!("user {} updated alumni {}", actor.user_id, id);
        Ok(alumni)
    }

    /// Hard delete. Job records and file metadata go with the profile; stored
    /// file contents are removed afterwards on a best-effort basis.
    pub async fn delete(&self, actor: &Actor, id: i64) -> Result<()> {
        if !can_act_on(actor, None, id, Action::Manage) {
            return Err(AppError::Forbidden("admin role required".into()));
        }
        let files = with_deadline(self.deadline, self.store.files_for_alumni(id)).await?;
        if !with_deadline(self.deadline, self.store.delete_alumni(id)).await? {
            return Err(AppError::not_found("alumni"));
        }
        for file in files {
            if let Err(e) = self.blobs.remove(&file.file_path).await {
                tracing::warn!("left blob {} behind: {}", file.file_path, e);
            }
        }
        tracing::info!("user {} deleted alumni {}", actor.user_id, id);
        Ok(())
    }
}
