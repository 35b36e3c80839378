use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    Extension,
};
use axum_extra::extract::WithRejection;

use crate::{
    pkg::{
        internal::{
            adaptors::files::spec::{FileCategory, FileEntry},
            files::Upload,
            policy::Actor,
        },
        server::{response::Envelope, state::AppState},
    },
    prelude::{AppError, Result},
};

fn bad_form(err: MultipartError) -> AppError {
    AppError::BadRequest(format!("invalid multipart form: {}", err.body_text()))
}

/// Pulls the `file` part and the optional `alumni_id` field out of the form.
async fn read_form(mut form: Multipart) -> Result<(Upload, Option<String>)> {
    let mut upload = None;
    let mut alumni_id = None;
    while let Some(field) = form.next_field().await.map_err(bad_form)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let original_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(bad_form)?;
                upload = Some(Upload {
                    original_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            "alumni_id" => alumni_id = Some(field.text().await.map_err(bad_form)?),
            _ => {}
        }
    }
    let upload = upload.ok_or_else(|| AppError::BadRequest("form field 'file' is required".into()))?;
    Ok((upload, alumni_id))
}

async fn upload(
    state: AppState,
    actor: &Actor,
    category: FileCategory,
    form: Multipart,
) -> Result<Envelope<FileEntry>> {
    let (upload, alumni_id) = read_form(form).await?;
    let file = state
        .files
        .upload(actor, category, upload, alumni_id.as_deref())
        .await?;
    Ok(Envelope::created("file uploaded", file))
}

pub async fn upload_photo(
    State(state): State<AppState>,
    Extension(actor): Extension<Arc<Actor>>,
    WithRejection(form, _): WithRejection<Multipart, AppError>,
) -> Result<Envelope<FileEntry>> {
    upload(state, &actor, FileCategory::Photo, form).await
}

pub async fn upload_certificate(
    State(state): State<AppState>,
    Extension(actor): Extension<Arc<Actor>>,
    WithRejection(form, _): WithRejection<Multipart, AppError>,
) -> Result<Envelope<FileEntry>> {
    upload(state, &actor, FileCategory::Certificate, form).await
}

pub async fn list_for_alumni(
    State(state): State<AppState>,
    Extension(actor): Extension<Arc<Actor>>,
    WithRejection(Path(alumni_id), _): WithRejection<Path<i64>, AppError>,
) -> Result<Envelope<Vec<FileEntry>>> {
    let files = state.files.list_for_alumni(&actor, alumni_id).await?;
    Ok(Envelope::ok("files retrieved", files))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(actor): Extension<Arc<Actor>>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> Result<Envelope<()>> {
    state.files.delete(&actor, id).await?;
    Ok(Envelope::ok("file deleted", ()))
}
