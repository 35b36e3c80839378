//! Embedded document backend.
//!
//! Every entity is a JSON document keyed by its numeric id inside a redb
//! table; ids come from a per-entity counter kept in `sequences`. Each store
//! call is one redb transaction, so conditional writes check and update the
//! document atomically.

use std::{cmp::Ordering, path::Path, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use redb::{Database, ReadTransaction, ReadableTable, Table, TableDefinition, WriteTransaction};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::oneshot;

use crate::{
    pkg::internal::{
        adaptors::{
            alumni::spec::{AlumniDraft, AlumniEntry},
            files::spec::{FileEntry, NewFile},
            jobs::spec::{JobDraft, JobEntry, JobFilter, JobGuard, JobState, Transition},
            users::spec::{NewUser, UserEntry},
        },
        pagination::{AlumniSort, JobSort, ListQuery, Order, PageRequest, Sort},
        store::{AlumniStore, FileStore, JobStore, Store, UserStore},
    },
    prelude::{AppError, Result},
};

type Docs = TableDefinition<'static, u64, &'static [u8]>;

const USERS: Docs = TableDefinition::new("users");
const ALUMNI: Docs = TableDefinition::new("alumni");
const JOBS: Docs = TableDefinition::new("jobs");
const FILES: Docs = TableDefinition::new("files");
const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

const DUPLICATE: &str = "record already exists";

#[derive(Debug, thiserror::Error)]
pub enum DocError {
    #[error("opening document store: {0}")]
    Database(#[from] redb::DatabaseError),
    #[error("starting transaction: {0}")]
    Transaction(#[from] redb::TransactionError),
    #[error("opening table: {0}")]
    Table(#[from] redb::TableError),
    #[error("storage: {0}")]
    Storage(#[from] redb::StorageError),
    #[error("committing: {0}")]
    Commit(#[from] redb::CommitError),
    #[error("document encoding: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Conflict(String),
    #[error("{0} not found")]
    MissingReference(&'static str),
    #[error("caller gave up before commit")]
    Abandoned,
}

fn key(id: i64) -> Option<u64> {
    u64::try_from(id).ok()
}

fn load<T: DeserializeOwned>(
    table: &impl ReadableTable<u64, &'static [u8]>,
    id: u64,
) -> Result<Option<T>, DocError> {
    match table.get(id)? {
        Some(raw) => Ok(Some(serde_json::from_slice(raw.value())?)),
        None => Ok(None),
    }
}

fn load_all<T: DeserializeOwned>(
    table: &impl ReadableTable<u64, &'static [u8]>,
) -> Result<Vec<T>, DocError> {
    let mut docs = Vec::new();
    for entry in table.iter()? {
        let (_, raw) = entry?;
        docs.push(serde_json::from_slice(raw.value())?);
    }
    Ok(docs)
}

fn save<T: Serialize>(
    table: &mut Table<'_, u64, &'static [u8]>,
    id: u64,
    doc: &T,
) -> Result<(), DocError> {
    let raw = serde_json::to_vec(doc)?;
    table.insert(id, raw.as_slice())?;
    Ok(())
}

fn next_id(txn: &WriteTransaction, sequence: &str) -> Result<i64, DocError> {
    let mut seq = txn.open_table(SEQUENCES)?;
    let next = seq.get(sequence)?.map(|v| v.value()).unwrap_or(0) + 1;
    seq.insert(sequence, next)?;
    Ok(next as i64)
}

fn contains_term(fields: &[&str], term: &str) -> bool {
    fields.iter().any(|f| f.to_lowercase().contains(term))
}

fn directed(ord: Ordering, order: Order) -> Ordering {
    match order {
        Order::Asc => ord,
        Order::Desc => ord.reverse(),
    }
}

fn window<T>(items: Vec<T>, page: PageRequest) -> Vec<T> {
    items
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit as usize)
        .collect()
}

fn alumni_matches(alumni: &AlumniEntry, term: Option<&str>) -> bool {
    term.map_or(true, |t| {
        contains_term(
            &[
                alumni.name.as_str(),
                alumni.nim.as_str(),
                alumni.program.as_str(),
                alumni.email.as_str(),
            ],
            t,
        )
    })
}

fn job_matches(job: &JobEntry, filter: &JobFilter, term: Option<&str>) -> bool {
    filter.state.matches(job)
        && filter.alumni_id.map_or(true, |a| job.alumni_id == a)
        && term.map_or(true, |t| {
            contains_term(
                &[
                    job.company.as_str(),
                    job.position.as_str(),
                    job.industry.as_str(),
                    job.location.as_str(),
                    job.status.as_str(),
                ],
                t,
            )
        })
}

fn sort_alumni(rows: &mut [AlumniEntry], sort: Sort<AlumniSort>) {
    rows.sort_by(|a, b| {
        let primary = match sort.field {
            AlumniSort::Id => a.id.cmp(&b.id),
            AlumniSort::Nim => a.nim.cmp(&b.nim),
            AlumniSort::Name => a.name.cmp(&b.name),
            AlumniSort::Program => a.program.cmp(&b.program),
            AlumniSort::CohortYear => a.cohort_year.cmp(&b.cohort_year),
            AlumniSort::GraduationYear => a.graduation_year.cmp(&b.graduation_year),
            AlumniSort::Email => a.email.cmp(&b.email),
            AlumniSort::CreatedAt => a.created_at.cmp(&b.created_at),
        };
        directed(primary, sort.order).then_with(|| directed(a.id.cmp(&b.id), sort.order))
    });
}

/// Missing values sort last whichever way the listing is ordered.
fn sort_jobs(rows: &mut [JobEntry], sort: Sort<JobSort>) {
    rows.sort_by(|a, b| {
        let primary = match sort.field {
            JobSort::DeletedAt => match (a.deleted_at, b.deleted_at) {
                (Some(x), Some(y)) => directed(x.cmp(&y), sort.order),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            field => directed(
                match field {
                    JobSort::Id => a.id.cmp(&b.id),
                    JobSort::AlumniId => a.alumni_id.cmp(&b.alumni_id),
                    JobSort::Company => a.company.cmp(&b.company),
                    JobSort::Position => a.position.cmp(&b.position),
                    JobSort::Industry => a.industry.cmp(&b.industry),
                    JobSort::Location => a.location.cmp(&b.location),
                    JobSort::Status => a.status.as_str().cmp(b.status.as_str()),
                    JobSort::StartDate => a.start_date.cmp(&b.start_date),
                    _ => a.created_at.cmp(&b.created_at),
                },
                sort.order,
            ),
        };
        primary.then_with(|| directed(a.id.cmp(&b.id), sort.order))
    });
}

fn matching_jobs(
    txn: &ReadTransaction,
    filter: &JobFilter,
    sort: Option<Sort<JobSort>>,
) -> Result<Vec<JobEntry>, DocError> {
    let term = filter.search.as_deref().map(str::to_lowercase);
    let mut rows: Vec<JobEntry> = load_all::<JobEntry>(&txn.open_table(JOBS)?)?
        .into_iter()
        .filter(|j| job_matches(j, filter, term.as_deref()))
        .collect();
    if let Some(sort) = sort {
        sort_jobs(&mut rows, sort);
    }
    Ok(rows)
}

#[derive(Clone)]
pub struct DocStore {
    db: Arc<Database>,
}

impl DocStore {
    /// Opens (or creates) the database file and makes sure every table exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DocError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;
        let txn = db.begin_write()?;
        txn.open_table(USERS)?;
        txn.open_table(ALUMNI)?;
        txn.open_table(JOBS)?;
        txn.open_table(FILES)?;
        txn.open_table(SEQUENCES)?;
        txn.commit()?;
        tracing::info!("document store ready at {}", path.display());
        Ok(DocStore { db: Arc::new(db) })
    }

    async fn read<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&ReadTransaction) -> Result<T, DocError> + Send + 'static,
    {
        let db = self.db.clone();
        let out = tokio::task::spawn_blocking(move || -> Result<T, DocError> {
            let txn = db.begin_read()?;
            f(&txn)
        })
        .await?;
        Ok(out?)
    }

    /// Runs `f` in one write transaction. If the caller stopped waiting
    /// (deadline elapsed) before the commit, the transaction is aborted, so a
    /// `StoreUnavailable` answer never hides a write that went through.
    async fn write<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&WriteTransaction) -> Result<T, DocError> + Send + 'static,
    {
        let db = self.db.clone();
        let (reply, answer) = oneshot::channel();
        tokio::task::spawn_blocking(move || {
            let run = || -> Result<T, DocError> {
                let txn = db.begin_write()?;
                let value = f(&txn)?;
                if reply.is_closed() {
                    txn.abort()?;
                    return Err(DocError::Abandoned);
                }
                txn.commit()?;
                Ok(value)
            };
            let outcome = run();
            if let Err(DocError::Abandoned) = outcome {
                tracing::warn!("write abandoned by its caller, rolled back");
            }
            let _ = reply.send(outcome);
        });
        let out = answer
            .await
            .map_err(|e| AppError::internal("document store worker vanished", e))?;
        Ok(out?)
    }
}

#[async_trait]
impl UserStore for DocStore {
    async fn user_by_login(&self, identifier: &str) -> Result<Option<UserEntry>> {
        let identifier = identifier.to_string();
        self.read(move |txn| {
            let users = load_all::<UserEntry>(&txn.open_table(USERS)?)?;
            Ok(users
                .into_iter()
                .filter(|u| u.username == identifier || u.email == identifier)
                .min_by_key(|u| u.id))
        })
        .await
    }

    async fn user_by_id(&self, id: i64) -> Result<Option<UserEntry>> {
        self.read(move |txn| match key(id) {
            Some(k) => load(&txn.open_table(USERS)?, k),
            None => Ok(None),
        })
        .await
    }

    async fn create_user(&self, user: NewUser) -> Result<UserEntry> {
        self.write(move |txn| {
            let mut table = txn.open_table(USERS)?;
            let taken = load_all::<UserEntry>(&table)?
                .iter()
                .any(|u| u.username == user.username || u.email == user.email);
            if taken {
                return Err(DocError::Conflict(DUPLICATE.into()));
            }
            let now = Utc::now();
            let entry = UserEntry {
                id: next_id(txn, "users")?,
                username: user.username,
                email: user.email,
                password_hash: user.password_hash,
                role: user.role,
                created_at: now,
                updated_at: now,
            };
            save(&mut table, entry.id as u64, &entry)?;
            Ok(entry)
        })
        .await
    }
}

#[async_trait]
impl AlumniStore for DocStore {
    async fn alumni_by_id(&self, id: i64) -> Result<Option<AlumniEntry>> {
        self.read(move |txn| match key(id) {
            Some(k) => load(&txn.open_table(ALUMNI)?, k),
            None => Ok(None),
        })
        .await
    }

    async fn alumni_by_user(&self, user_id: i64) -> Result<Option<AlumniEntry>> {
        self.read(move |txn| {
            let rows = load_all::<AlumniEntry>(&txn.open_table(ALUMNI)?)?;
            Ok(rows.into_iter().find(|a| a.user_id == Some(user_id)))
        })
        .await
    }

    async fn create_alumni(&self, draft: AlumniDraft) -> Result<AlumniEntry> {
        self.write(move |txn| {
            if let Some(user_id) = draft.user_id.and_then(key) {
                if load::<UserEntry>(&txn.open_table(USERS)?, user_id)?.is_none() {
                    return Err(DocError::MissingReference("user"));
                }
            }
            let mut table = txn.open_table(ALUMNI)?;
            let taken = load_all::<AlumniEntry>(&table)?.iter().any(|a| {
                a.nim == draft.nim || (draft.user_id.is_some() && a.user_id == draft.user_id)
            });
            if taken {
                return Err(DocError::Conflict(DUPLICATE.into()));
            }
            let now = Utc::now();
            let entry = AlumniEntry {
                id: next_id(txn, "alumni")?,
                user_id: draft.user_id,
                nim: draft.nim,
                name: draft.name,
                program: draft.program,
                cohort_year: draft.cohort_year,
                graduation_year: draft.graduation_year,
                email: draft.email,
                phone: draft.phone,
                address: draft.address,
                created_at: now,
                updated_at: now,
            };
            save(&mut table, entry.id as u64, &entry)?;
            Ok(entry)
        })
        .await
    }

    async fn update_alumni(&self, id: i64, draft: AlumniDraft) -> Result<Option<AlumniEntry>> {
        self.write(move |txn| {
            let Some(k) = key(id) else { return Ok(None) };
            let mut table = txn.open_table(ALUMNI)?;
            let Some(mut entry) = load::<AlumniEntry>(&table, k)? else {
                return Ok(None);
            };
            let taken = load_all::<AlumniEntry>(&table)?
                .iter()
                .any(|a| a.id != id && a.nim == draft.nim);
            if taken {
                return Err(DocError::Conflict(DUPLICATE.into()));
            }
            entry.nim = draft.nim;
            entry.name = draft.name;
            entry.program = draft.program;
            entry.cohort_year = draft.cohort_year;
            entry.graduation_year = draft.graduation_year;
            entry.email = draft.email;
            entry.phone = draft.phone;
            entry.address = draft.address;
            entry.updated_at = Utc::now();
            save(&mut table, k, &entry)?;
            Ok(Some(entry))
        })
        .await
    }

    async fn delete_alumni(&self, id: i64) -> Result<bool> {
        self.write(move |txn| {
            let Some(k) = key(id) else { return Ok(false) };
            if txn.open_table(ALUMNI)?.remove(k)?.is_none() {
                return Ok(false);
            }
            let mut jobs = txn.open_table(JOBS)?;
            for job in load_all::<JobEntry>(&jobs)? {
                if job.alumni_id == id {
                    jobs.remove(job.id as u64)?;
                }
            }
            let mut files = txn.open_table(FILES)?;
            for file in load_all::<FileEntry>(&files)? {
                if file.alumni_id == id {
                    files.remove(file.id as u64)?;
                }
            }
            Ok(true)
        })
        .await
    }

    async fn list_alumni(&self, query: &ListQuery<AlumniSort>) -> Result<Vec<AlumniEntry>> {
        let query = query.clone();
        self.read(move |txn| {
            let term = query.search.as_deref().map(str::to_lowercase);
            let mut rows: Vec<AlumniEntry> = load_all::<AlumniEntry>(&txn.open_table(ALUMNI)?)?
                .into_iter()
                .filter(|a| alumni_matches(a, term.as_deref()))
                .collect();
            sort_alumni(&mut rows, query.sort);
            Ok(window(rows, query.page))
        })
        .await
    }

    async fn count_alumni(&self, search: Option<&str>) -> Result<u64> {
        let term = search.map(str::to_lowercase);
        self.read(move |txn| {
            let rows = load_all::<AlumniEntry>(&txn.open_table(ALUMNI)?)?;
            Ok(rows
                .iter()
                .filter(|a| alumni_matches(a, term.as_deref()))
                .count() as u64)
        })
        .await
    }
}

#[async_trait]
impl JobStore for DocStore {
    async fn job_by_id(&self, id: i64, state: JobState) -> Result<Option<JobEntry>> {
        self.read(move |txn| {
            let Some(k) = key(id) else { return Ok(None) };
            let job = load::<JobEntry>(&txn.open_table(JOBS)?, k)?;
            Ok(job.filter(|j| state.matches(j)))
        })
        .await
    }

    async fn create_job(&self, alumni_id: i64, draft: JobDraft) -> Result<JobEntry> {
        self.write(move |txn| {
            let owner = match key(alumni_id) {
                Some(k) => load::<AlumniEntry>(&txn.open_table(ALUMNI)?, k)?,
                None => None,
            };
            if owner.is_none() {
                return Err(DocError::MissingReference("alumni"));
            }
            let now = Utc::now();
            let entry = JobEntry {
                id: next_id(txn, "jobs")?,
                alumni_id,
                company: draft.company,
                position: draft.position,
                industry: draft.industry,
                location: draft.location,
                salary_range: draft.salary_range,
                start_date: draft.start_date,
                end_date: draft.end_date,
                status: draft.status,
                description: draft.description,
                is_deleted: false,
                deleted_at: None,
                deleted_by: None,
                created_at: now,
                updated_at: now,
            };
            save(&mut txn.open_table(JOBS)?, entry.id as u64, &entry)?;
            Ok(entry)
        })
        .await
    }

    async fn update_job(&self, id: i64, draft: JobDraft) -> Result<Option<JobEntry>> {
        self.write(move |txn| {
            let Some(k) = key(id) else { return Ok(None) };
            let mut table = txn.open_table(JOBS)?;
            let Some(mut entry) = load::<JobEntry>(&table, k)?.filter(|j| !j.is_deleted) else {
                return Ok(None);
            };
            entry.company = draft.company;
            entry.position = draft.position;
            entry.industry = draft.industry;
            entry.location = draft.location;
            entry.salary_range = draft.salary_range;
            entry.start_date = draft.start_date;
            entry.end_date = draft.end_date;
            entry.status = draft.status;
            entry.description = draft.description;
            entry.updated_at = Utc::now();
            save(&mut table, k, &entry)?;
            Ok(Some(entry))
        })
        .await
    }

    async fn transition_job(
        &self,
        id: i64,
        guard: JobGuard,
        transition: Transition,
    ) -> Result<Option<JobEntry>> {
        self.write(move |txn| {
            let Some(k) = key(id) else { return Ok(None) };
            let mut table = txn.open_table(JOBS)?;
            let Some(mut entry) = load::<JobEntry>(&table, k)?.filter(|j| guard.matches(j)) else {
                return Ok(None);
            };
            transition.apply(&mut entry);
            save(&mut table, k, &entry)?;
            Ok(Some(entry))
        })
        .await
    }

    async fn list_jobs(
        &self,
        filter: &JobFilter,
        sort: Sort<JobSort>,
        page: Option<PageRequest>,
    ) -> Result<Vec<JobEntry>> {
        let filter = filter.clone();
        self.read(move |txn| {
            let rows = matching_jobs(txn, &filter, Some(sort))?;
            Ok(match page {
                Some(page) => window(rows, page),
                None => rows,
            })
        })
        .await
    }

    async fn count_jobs(&self, filter: &JobFilter) -> Result<u64> {
        let filter = filter.clone();
        self.read(move |txn| Ok(matching_jobs(txn, &filter, None)?.len() as u64))
            .await
    }

    async fn delete_job(&self, id: i64, guard: JobGuard) -> Result<bool> {
        self.write(move |txn| {
            let Some(k) = key(id) else { return Ok(false) };
            let mut table = txn.open_table(JOBS)?;
            let found = load::<JobEntry>(&table, k)?.is_some_and(|j| guard.matches(&j));
            if found {
                table.remove(k)?;
            }
            Ok(found)
        })
        .await
    }
}

#[async_trait]
impl FileStore for DocStore {
    async fn create_file(&self, file: NewFile) -> Result<FileEntry> {
        self.write(move |txn| {
            let owner = match key(file.alumni_id) {
                Some(k) => load::<AlumniEntry>(&txn.open_table(ALUMNI)?, k)?,
                None => None,
            };
            if owner.is_none() {
                return Err(DocError::MissingReference("alumni"));
            }
            let entry = FileEntry {
                id: next_id(txn, "files")?,
                alumni_id: file.alumni_id,
                category: file.category,
                file_name: file.file_name,
                original_name: file.original_name,
                file_path: file.file_path,
                file_size: file.file_size,
                file_type: file.file_type,
                uploaded_at: Utc::now(),
            };
            save(&mut txn.open_table(FILES)?, entry.id as u64, &entry)?;
            Ok(entry)
        })
        .await
    }

    async fn file_by_id(&self, id: i64) -> Result<Option<FileEntry>> {
        self.read(move |txn| match key(id) {
            Some(k) => load(&txn.open_table(FILES)?, k),
            None => Ok(None),
        })
        .await
    }

    async fn files_for_alumni(&self, alumni_id: i64) -> Result<Vec<FileEntry>> {
        self.read(move |txn| {
            let mut rows: Vec<FileEntry> = load_all::<FileEntry>(&txn.open_table(FILES)?)?
                .into_iter()
                .filter(|f| f.alumni_id == alumni_id)
                .collect();
            rows.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at).then(b.id.cmp(&a.id)));
            Ok(rows)
        })
        .await
    }

    async fn delete_file(&self, id: i64) -> Result<bool> {
        self.write(move |txn| match key(id) {
            Some(k) => Ok(txn.open_table(FILES)?.remove(k)?.is_some()),
            None => Ok(false),
        })
        .await
    }
}

#[async_trait]
impl Store for DocStore {
    async fn ping(&self) -> Result<()> {
        self.read(|txn| {
            txn.open_table(USERS)?;
            Ok(())
        })
        .await
    }
}
