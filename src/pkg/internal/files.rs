use std::{sync::Arc, time::Duration};

use uuid::Uuid;

use crate::{
    pkg::internal::{
        adaptors::files::spec::{FileCategory, FileEntry, NewFile},
        blob::BlobStore,
        policy::{can_act_on, Action, Actor},
        store::{with_deadline, Store},
    },
    prelude::{AppError, Result},
};

/// One file taken from a multipart upload.
#[derive(Debug, Clone)]
pub struct Upload {
    pub original_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Blob extension follows the accepted content type, never the client's
/// file name.
fn extension(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => ".png",
        "image/jpeg" | "image/jpg" => ".jpg",
        "application/pdf" => ".pdf",
        _ => "",
    }
}

pub struct FileService {
    store: Arc<dyn Store>,
    blobs: Arc<dyn BlobStore>,
    deadline: Duration,
}

impl FileService {
    pub fn new(store: Arc<dyn Store>, blobs: Arc<dyn BlobStore>, deadline: Duration) -> Self {
        FileService {
            store,
            blobs,
            deadline,
        }
    }

    async fn alumni_of(&self, actor: &Actor) -> Result<Option<i64>> {
        let profile = with_deadline(self.deadline, self.store.alumni_by_user(actor.user_id)).await?;
        Ok(profile.map(|a| a.id))
    }

    /// Admins upload on behalf of the alumni named in the form, users for
    /// their own profile.
    async fn target(&self, actor: &Actor, alumni_field: Option<&str>) -> Result<i64> {
        if !actor.is_admin() {
            return self.alumni_of(actor).await?.ok_or_else(|| {
                AppError::Forbidden("create your alumni profile before uploading files".into())
            });
        }
        let raw = alumni_field
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::BadRequest("alumni_id is required".into()))?;
        let alumni_id: i64 = raw
            .parse()
            .map_err(|_| AppError::BadRequest("alumni_id must be a number".into()))?;
        with_deadline(self.deadline, self.store.alumni_by_id(alumni_id))
            .await?
            .ok_or_else(|| AppError::not_found("alumni"))?;
        Ok(alumni_id)
    }

    pub async fn upload(
        &self,
        actor: &Actor,
        category: FileCategory,
        upload: Upload,
        alumni_field: Option<&str>,
    ) -> Result<FileEntry> {
        if upload.bytes.is_empty() {
            return Err(AppError::BadRequest("file is empty".into()));
        }
        if upload.bytes.len() > category.max_size() {
            return Err(AppError::BadRequest(format!(
                "{} exceeds the {} MB limit",
                category.dir(),
                category.max_size() / (1024 * 1024)
            )));
        }
        if !category.accepts(&upload.content_type) {
            return Err(AppError::BadRequest(format!(
                "file type {} is not allowed for {}",
                upload.content_type,
                category.dir()
            )));
        }
        let alumni_id = self.target(actor, alumni_field).await?;

        let file_name = format!("{}{}", Uuid::new_v4(), extension(&upload.content_type));
        let key = format!("{}/{}", category.dir(), file_name);
        let size = upload.bytes.len() as i64;
        self.blobs.put(&key, upload.bytes, &upload.content_type).await?;

        let record = NewFile {
            alumni_id,
            category,
            file_name,
            original_name: upload.original_name,
            file_path: key.clone(),
            file_size: size,
            file_type: upload.content_type,
        };
        match with_deadline(self.deadline, self.store.create_file(record)).await {
            Ok(file) => {
                tracing::info!("{} uploaded {} {}", actor.username, category.dir(), file.id);
                Ok(file)
            }
            Err(e) => {
                if let Err(cleanup) = self.blobs.remove(&key).await {
                    tracing::warn!("orphaned blob {}: {}", key, cleanup);
                }
                Err(e)
            }
        }
    }

    pub async fn list_for_alumni(&self, actor: &Actor, alumni_id: i64) -> Result<Vec<FileEntry>> {
        if actor.is_admin() {
            with_deadline(self.deadline, self.store.alumni_by_id(alumni_id))
                .await?
                .ok_or_else(|| AppError::not_found("alumni"))?;
        } else {
            let own = self.alumni_of(actor).await?;
            if !can_act_on(actor, own, alumni_id, Action::AccessFiles) {
                return Err(AppError::Forbidden("you can only view your own files".into()));
            }
        }
        with_deadline(self.deadline, self.store.files_for_alumni(alumni_id)).await
    }

    pub async fn delete(&self, actor: &Actor, id: i64) -> Result<()> {
        let file = with_deadline(self.deadline, self.store.file_by_id(id))
            .await?
            .ok_or_else(|| AppError::not_found("file"))?;
        let own = if actor.is_admin() {
            None
        } else {
            self.alumni_of(actor).await?
        };
        if !can_act_on(actor, own, file.alumni_id, Action::AccessFiles) {
            return Err(AppError::Forbidden("you can only delete your own files".into()));
        }
        if !with_deadline(self.deadline, self.store.delete_file(id)).await? {
            return Err(AppError::not_found("file"));
        }
        if let Err(e) = self.blobs.remove(&file.file_path).await {
            tracing::warn!("file {} removed but blob {} stayed: {}", id, file.file_path, e);
        }
        tracing::info!("{} deleted file {}", actor.username, id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::Upload;
    use crate::{
        pkg::internal::{
            adaptors::{files::spec::FileCategory, users::spec::Role},
            fixtures,
        },
        prelude::AppError,
    };

    fn photo(size: usize) -> Upload {
        Upload {
            original_name: "Me.PNG".into(),
            content_type: "image/png".into(),
            bytes: vec![7; size],
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn users_upload_to_their_own_profile() {
        let world = fixtures::world().await;
        let (owner, alumni) = world.alumnus("andi", "1001").await;
        let file = world
            .files
            .upload(&owner, FileCategory::Photo, photo(64), Some("999"))
            .await
            .unwrap();
        assert_eq!(file.alumni_id, alumni.id);
        assert!(file.file_path.starts_with("photo/"));
        assert!(file.file_name.ends_with(".png"));
        assert!(world.uploads.path().join(&file.file_path).exists());

        let listed = world.files.list_for_alumni(&owner, alumni.id).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    #[traced_test]
    async fn uploads_are_checked_before_anything_is_stored() {
        let world = fixtures::world().await;
        let (owner, _) = world.alumnus("andi", "1001").await;
        let big = world
            .files
            .upload(&owner, FileCategory::Photo, photo(1024 * 1024 + 1), None)
            .await;
        assert!(matches!(big, Err(AppError::BadRequest(_))));

        let wrong_type = world
            .files
            .upload(&owner, FileCategory::Certificate, photo(10), None)
            .await;
        assert!(matches!(wrong_type, Err(AppError::BadRequest(_))));

        let nobody = world.actor("bela", Role::User).await;
        let orphan = world.files.upload(&nobody, FileCategory::Photo, photo(10), None).await;
        assert!(matches!(orphan, Err(AppError::Forbidden(_))));

        let unnamed = world.files.upload(&world.admin, FileCategory::Photo, photo(10), None).await;
        assert!(matches!(unnamed, Err(AppError::BadRequest(_))));
        let unknown = world
            .files
            .upload(&world.admin, FileCategory::Photo, photo(10), Some("404"))
            .await;
        assert!(matches!(unknown, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    #[traced_test]
    async fn only_owners_and_admins_touch_files() {
        let world = fixtures::world().await;
        let (owner, alumni) = world.alumnus("andi", "1001").await;
        let (stranger, _) = world.alumnus("bela", "1002").await;
        let file = world
            .files
            .upload(&world.admin, FileCategory::Photo, photo(10), Some(&alumni.id.to_string()))
            .await
            .unwrap();

        assert!(matches!(
            world.files.list_for_alumni(&stranger, alumni.id).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            world.files.delete(&stranger, file.id).await,
            Err(AppError::Forbidden(_))
        ));
        world.files.delete(&owner, file.id).await.unwrap();
        assert!(!world.uploads.path().join(&file.file_path).exists());
        assert!(matches!(
            world.files.delete(&owner, file.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    #[traced_test]
    async fn stored_names_follow_the_content_type() {
        let world = fixtures::world().await;
        let (owner, _) = world.alumnus("andi", "1001").await;
        let disguised = Upload {
            original_name: "x.html".into(),
            ..photo(32)
        };
        let file = world
            .files
            .upload(&owner, FileCategory::Photo, disguised, None)
            .await
            .unwrap();
        assert!(file.file_name.ends_with(".png"), "{}", file.file_name);
        assert!(file.file_path.ends_with(".png"));
        assert_eq!(file.original_name, "x.html");
    }
}
