use sqlx::PgConnection;

use crate::{
    pkg::internal::adaptors::files::spec::{FileEntry, NewFile},
    prelude::Result,
};

pub struct FileMutator<'a> {
    pool: &'a mut PgConnection,
}

impl<'a> FileMutator<'a> {
    pub fn new(pool: &'a mut PgConnection) -> Self {
        FileMutator { pool }
    }

    pub async fn create(&mut self, file: NewFile) -> Result<FileEntry> {
        let row = sqlx::query_as::<_, FileEntry>(
            r#"
            INSERT INTO files (alumni_id, category, file_name, original_name, file_path, file_size, file_type)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, alumni_id, category, file_name, original_name, file_path, file_size,
                      file_type, uploaded_at
            "#,
        )
        .bind(file.alumni_id)
        .bind(file.category)
        .bind(&file.file_name)
        .bind(&file.original_name)
        .bind(&file.file_path)
        .bind(file.file_size)
        .bind(&file.file_type)
        .fetch_one(&mut *self.pool)
        .await?;
        Ok(row)
    }

    pub async fn delete(&mut self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM files WHERE id = $1")
            .bind(id)
            .execute(&mut *self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
