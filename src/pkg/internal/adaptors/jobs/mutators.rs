use sqlx::PgConnection;

use crate::{
    pkg::internal::adaptors::jobs::spec::{JobDraft, JobEntry, JobGuard, Transition},
    prelude::Result,
};

pub struct JobMutator<'a> {
    pool: &'a mut PgConnection,
}

impl<'a> JobMutator<'a> {
    pub fn new(pool: &'a mut PgConnection) -> Self {
        JobMutator { pool }
    }

    pub async fn create(&mut self, alumni_id: i64, job: JobDraft) -> Result<JobEntry> {
        let row = sqlx::query_as::<_, JobEntry>(
            r#"
            INSERT INTO jobs (alumni_id, company, position, industry, location, salary_range,
                              start_date, end_date, status, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, alumni_id, company, position, industry, location, salary_range, start_date,
                      end_date, status, description, is_deleted, deleted_at, deleted_by, created_at,
                      updated_at
            "#,
        )
        .bind(alumni_id)
        .bind(&job.company)
        .bind(&job.position)
        .bind(&job.industry)
        .bind(&job.location)
        .bind(&job.salary_range)
        .bind(job.start_date)
        .bind(job.end_date)
        .bind(job.status)
        .bind(&job.description)
        .fetch_one(&mut *self.pool)
        .await?;
        Ok(row)
    }

    pub async fn update(&mut self, id: i64, job: JobDraft) -> Result<Option<JobEntry>> {
        let row = sqlx::query_as::<_, JobEntry>(
            r#"
            UPDATE jobs
            SET company = $2, position = $3, industry = $4, location = $5, salary_range = $6,
                start_date = $7, end_date = $8, status = $9, description = $10,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND is_deleted = FALSE
            RETURNING id, alumni_id, company, position, industry, location, salary_range, start_date,
                      end_date, status, description, is_deleted, deleted_at, deleted_by, created_at,
                      updated_at
            "#,
        )
        .bind(id)
        .bind(&job.company)
        .bind(&job.position)
        .bind(&job.industry)
        .bind(&job.location)
        .bind(&job.salary_range)
        .bind(job.start_date)
        .bind(job.end_date)
        .bind(job.status)
        .bind(&job.description)
        .fetch_optional(&mut *self.pool)
        .await?;
        Ok(row)
    }

    pub async fn transition(
        &mut self,
        id: i64,
        guard: JobGuard,
        transition: Transition,
    ) -> Result<Option<JobEntry>> {
        let (deleted, deleted_at, deleted_by) = match transition {
            Transition::Trash { at, by } => (true, Some(at), Some(by)),
            Transition::Restore => (false, None, None),
        };
        let row = sqlx::query_as::<_, JobEntry>(
            r#"
            UPDATE jobs
            SET is_deleted = $4, deleted_at = $5, deleted_by = $6
            WHERE id = $1
              AND ($2::BOOLEAN IS NULL OR is_deleted = $2)
              AND ($3::BIGINT IS NULL OR alumni_id = $3)
            RETURNING id, alumni_id, company, position, industry, location, salary_range, start_date,
                      end_date, status, description, is_deleted, deleted_at, deleted_by, created_at,
                      updated_at
            "#,
        )
        .bind(id)
        .bind(guard.state.deleted_flag())
        .bind(guard.alumni_id)
        .bind(deleted)
        .bind(deleted_at)
        .bind(deleted_by)
        .fetch_optional(&mut *self.pool)
        .await?;
        Ok(row)
    }

    pub async fn delete(&mut self, id: i64, guard: JobGuard) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM jobs
             WHERE id = $1
               AND ($2::BOOLEAN IS NULL OR is_deleted = $2)
               AND ($3::BIGINT IS NULL OR alumni_id = $3)",
        )
        .bind(id)
        .bind(guard.state.deleted_flag())
        .bind(guard.alumni_id)
        .execute(&mut *self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
