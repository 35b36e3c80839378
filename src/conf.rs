use config::{Config, ConfigError, Environment};
use lazy_static::lazy_static;
use serde::Deserialize;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Document,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BlobBackend {
    Local,
    S3,
}

#[derive(Deserialize, Clone)]
pub struct Settings {
    #[serde(default = "defaults::service_name")]
    pub service_name: String,
    #[serde(default = "defaults::listen_port")]
    pub listen_port: String,
    #[serde(default = "defaults::store_backend")]
    pub store_backend: StoreBackend,
    #[serde(default)]
    pub database_url: String,
    #[serde(default = "defaults::pool_size")]
    pub database_pool_max_connections: u32,
    #[serde(default = "defaults::document_path")]
    pub document_path: String,
    #[serde(default = "defaults::store_timeout_secs")]
    pub store_timeout_secs: u64,
    //auth
    #[serde(default = "defaults::jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "defaults::jwt_ttl_hours")]
    pub jwt_ttl_hours: i64,
    #[serde(default = "defaults::bcrypt_cost")]
    pub bcrypt_cost: u32,
    //uploads
    #[serde(default = "defaults::blob_backend")]
    pub blob_backend: BlobBackend,
    #[serde(default = "defaults::upload_dir")]
    pub upload_dir: String,
    #[serde(default)]
    pub s3_bucket: String,
    #[serde(default)]
    pub s3_endpoint: String,
    #[serde(default = "defaults::s3_region")]
    pub s3_region: String,
    #[serde(default)]
    pub s3_access_key: String,
    #[serde(default)]
    pub s3_secret_key: String,
}

mod defaults {
    use super::{BlobBackend, StoreBackend};

    pub fn service_name() -> String {
        "alumni-registry".into()
    }
    pub fn listen_port() -> String {
        "3000".into()
    }
    pub fn store_backend() -> StoreBackend {
        StoreBackend::Document
    }
    pub fn pool_size() -> u32 {
        10
    }
    pub fn document_path() -> String {
        "data/alumni.redb".into()
    }
    pub fn store_timeout_secs() -> u64 {
        5
    }
    pub fn jwt_secret() -> String {
        "change-me".into()
    }
    pub fn jwt_ttl_hours() -> i64 {
        24
    }
    pub fn bcrypt_cost() -> u32 {
        bcrypt::DEFAULT_COST
    }
    pub fn blob_backend() -> BlobBackend {
        BlobBackend::Local
    }
    pub fn upload_dir() -> String {
        "uploads".into()
    }
    pub fn s3_region() -> String {
        "us-east-1".into()
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let conf = Config::builder()
            .add_source(Environment::default())
            .build()?;
        let mut s: Settings = conf.try_deserialize()?;
        // store calls must give up well before a client would
        s.store_timeout_secs = s.store_timeout_secs.clamp(1, 9);
        if s.store_backend == StoreBackend::Postgres && s.database_url.is_empty() {
            return Err(ConfigError::Message(
                "DATABASE_URL is required for the postgres backend".into(),
            ));
        }
        if s.blob_backend == BlobBackend::S3 && s.s3_bucket.is_empty() {
            return Err(ConfigError::Message(
                "S3_BUCKET is required for the s3 blob backend".into(),
            ));
        }
        if s.jwt_secret == defaults::jwt_secret() {
            tracing::warn!("JWT_SECRET not set, using the development secret");
        }
        Ok(s)
    }
}

lazy_static! {
    pub static ref settings: Settings = Settings::new().expect("improperly configured");
}
