use sqlx::PgConnection;

use crate::{
    pkg::internal::adaptors::alumni::spec::{AlumniDraft, AlumniEntry},
    prelude::Result,
};

pub struct AlumniMutator<'a> {
    pool: &'a mut PgConnection,
}

impl<'a> AlumniMutator<'a> {
    pub fn new(pool: &'a mut PgConnection) -> Self {
        AlumniMutator { pool }
    }

    pub async fn create(&mut self, alumni: AlumniDraft) -> Result<AlumniEntry> {
        let row = sqlx::query_as::<_, AlumniEntry>(
            r#"
            INSERT INTO alumni (user_id, nim, name, program, cohort_year, graduation_year, email, phone, address)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, user_id, nim, name, program, cohort_year, graduation_year, email, phone,
                      address, created_at, updated_at
            "#,
        )
        .bind(alumni.user_id)
        .bind(&alumni.nim)
        .bind(&alumni.name)
        .bind(&alumni.program)
        .bind(alumni.cohort_year)
        .bind(alumni.graduation_year)
        .bind(&alumni.email)
        .bind(&alumni.phone)
        .bind(&alumni.address)
        .fetch_one(&mut *self.pool)
        .await?;
        Ok(row)
    }

    pub async fn update(&mut self, id: i64, alumni: AlumniDraft) -> Result<Option<AlumniEntry>> {
        let row = sqlx::query_as::<_, AlumniEntry>(
            r#"
            UPDATE alumni
            SET nim = $2, name = $3, program = $4, cohort_year = $5, graduation_year = $6,
                email = $7, phone = $8, address = $9, updated_at = CURRENT_TIMESTAMP
            WHERE id = $1
            RETURNING id, user_id, nim, name, program, cohort_year, graduation_year, email, phone,
                      address, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&alumni.nim)
        .bind(&alumni.name)
        .bind(&alumni.program)
        .bind(alumni.cohort_year)
        .bind(alumni.graduation_year)
        .bind(&alumni.email)
        .bind(&alumni.phone)
        .bind(&alumni.address)
        .fetch_optional(&mut *self.pool)
        .await?;
        Ok(row)
    }

    /// Jobs and files go with it through `ON DELETE CASCADE`.
    pub async fn delete(&mut self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM alumni WHERE id = $1")
            .bind(id)
            .execute(&mut *self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
