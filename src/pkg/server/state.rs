use std::{sync::Arc, time::Duration};

use crate::{
    conf::{settings, BlobBackend, StoreBackend},
    pkg::internal::{
        adaptors::{document::DocStore, postgres::PgStore},
        alumni::AlumniService,
        auth::{AuthService, TokenIssuer},
        blob::{BlobStore, LocalBlobs, S3Blobs, S3Settings},
        files::FileService,
        lifecycle::JobLifecycle,
        store::Store,
    },
    prelude::Result,
};

#[derive(Clone)]
pub struct AppState {
    pub service_name: String,
    pub store: Arc<dyn Store>,
    pub deadline: Duration,
    pub auth: Arc<AuthService>,
    pub jobs: Arc<JobLifecycle>,
    pub alumni: Arc<AlumniService>,
    pub files: Arc<FileService>,
}

impl AppState {
    pub async fn new() -> Result<AppState> {
        let deadline = Duration::from_secs(settings.store_timeout_secs);
        let store: Arc<dyn Store> = match settings.store_backend {
            StoreBackend::Postgres => Arc::new(PgStore::connect_lazy(
                &settings.database_url,
                settings.database_pool_max_connections,
                deadline,
            )?),
            StoreBackend::Document => Arc::new(DocStore::open(&settings.document_path)?),
        };
        let blobs: Arc<dyn BlobStore> = match settings.blob_backend {
            BlobBackend::Local => Arc::new(LocalBlobs::new(&settings.upload_dir)),
            BlobBackend::S3 => Arc::new(
                S3Blobs::connect(S3Settings {
                    bucket: &settings.s3_bucket,
                    endpoint: &settings.s3_endpoint,
                    region: &settings.s3_region,
                    access_key: &settings.s3_access_key,
                    secret_key: &settings.s3_secret_key,
                })
                .await?,
            ),
        };
        tracing::info!(
            "using {:?} store and {:?} uploads",
            settings.store_backend,
            settings.blob_backend
        );
        let tokens = TokenIssuer::new(
            &settings.jwt_secret,
            chrono::Duration::hours(settings.jwt_ttl_hours),
        );
        AppState::from_parts(
            &settings.service_name,
            store,
            blobs,
            tokens,
            deadline,
            settings.bcrypt_cost,
        )
    }

    pub fn from_parts(
        service_name: &str,
        store: Arc<dyn Store>,
        blobs: Arc<dyn BlobStore>,
        tokens: TokenIssuer,
        deadline: Duration,
        bcrypt_cost: u32,
    ) -> Result<AppState> {
        Ok(AppState {
            service_name: service_name.to_string(),
            auth: Arc::new(AuthService::new(store.clone(), deadline, tokens, bcrypt_cost)?),
            jobs: Arc::new(JobLifecycle::new(store.clone(), deadline)),
            alumni: Arc::new(AlumniService::new(store.clone(), blobs.clone(), deadline)),
            files: Arc::new(FileService::new(store.clone(), blobs, deadline)),
            store,
            deadline,
        })
    }
}
