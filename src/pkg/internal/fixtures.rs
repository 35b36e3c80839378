//! Shared setup for service tests: a document store and upload directory in
//! temporary folders, plus helpers to seed users, profiles and jobs.

use std::{sync::Arc, time::Duration};

use tempfile::TempDir;

use crate::pkg::internal::{
    adaptors::{
        alumni::spec::AlumniEntry,
        document::DocStore,
        jobs::spec::JobEntry,
        users::spec::{NewUser, Role, UserEntry},
    },
    alumni::AlumniService,
    auth::{AuthService, TokenIssuer},
    blob::{BlobStore, LocalBlobs},
    files::FileService,
    lifecycle::JobLifecycle,
    policy::Actor,
    store::Store,
    validation::{AlumniInput, JobInput},
};

pub const PASSWORD: &str = "s3cret-pass";
pub const SECRET: &str = "test-secret";
pub const COST: u32 = 4;

pub struct World {
    _data: TempDir,
    pub uploads: TempDir,
    pub store: Arc<dyn Store>,
    pub blobs: Arc<dyn BlobStore>,
    pub auth: AuthService,
    pub jobs: JobLifecycle,
    pub alumni: AlumniService,
    pub files: FileService,
    pub admin: Actor,
}

pub fn tokens() -> TokenIssuer {
    TokenIssuer::new(SECRET, chrono::Duration::hours(1))
}

pub async fn world() -> World {
    let data = tempfile::tempdir().unwrap();
    let uploads = tempfile::tempdir().unwrap();
    let store: Arc<dyn Store> = Arc::new(DocStore::open(data.path().join("alumni.redb")).unwrap());
    let blobs: Arc<dyn BlobStore> = Arc::new(LocalBlobs::new(uploads.path()));
    let deadline = Duration::from_secs(5);
    let mut world = World {
        auth: AuthService::new(store.clone(), deadline, tokens(), COST).unwrap(),
        jobs: JobLifecycle::new(store.clone(), deadline),
        alumni: AlumniService::new(store.clone(), blobs.clone(), deadline),
        files: FileService::new(store.clone(), blobs.clone(), deadline),
        admin: Actor {
            user_id: 0,
            username: String::new(),
            role: Role::Admin,
        },
        _data: data,
        uploads,
        store,
        blobs,
    };
    world.admin = world.actor("admin", Role::Admin).await;
    world
}

pub fn alumni_input(nim: &str) -> AlumniInput {
    AlumniInput {
        user_id: None,
        nim: nim.into(),
        name: format!("Alumni {nim}"),
        program: "Informatics".into(),
        cohort_year: 2015,
        graduation_year: 2019,
        email: format!("{nim}@campus.test"),
        phone: Some("0812000000".into()),
        address: None,
    }
}

pub fn job_input(alumni_id: i64, company: &str) -> JobInput {
    JobInput {
        alumni_id: Some(alumni_id),
        company: company.into(),
        position: "Engineer".into(),
        industry: "Software".into(),
        location: "Surabaya".into(),
        salary_range: Some("10-15jt".into()),
        start_date: "2020-03-01".into(),
        end_date: None,
        status: "active".into(),
        description: None,
    }
}

pub fn actor_of(user: &UserEntry) -> Actor {
    Actor {
        user_id: user.id,
        username: user.username.clone(),
        role: user.role,
    }
}

impl World {
    pub async fn user(&self, username: &str, role: Role) -> UserEntry {
        let password_hash = bcrypt::hash(PASSWORD, COST).unwrap();
        self.store
            .create_user(NewUser {
                username: username.into(),
                email: format!("{username}@campus.test"),
                password_hash,
                role,
            })
            .await
            .unwrap()
    }

    pub async fn actor(&self, username: &str, role: Role) -> Actor {
        actor_of(&self.user(username, role).await)
    }

    /// A user together with the alumni profile they own.
    pub async fn alumnus(&self, username: &str, nim: &str) -> (Actor, AlumniEntry) {
        let actor = self.actor(username, Role::User).await;
        let alumni = self.alumni.create(&actor, alumni_input(nim)).await.unwrap();
        (actor, alumni)
    }

    pub async fn job(&self, alumni_id: i64, company: &str) -> JobEntry {
        self.jobs
            .create(&self.admin, job_input(alumni_id, company))
            .await
            .unwrap()
    }
}
