use sqlx::PgConnection;

use crate::{pkg::internal::adaptors::files::spec::FileEntry, prelude::Result};

pub struct FileSelector<'a> {
    pool: &'a mut PgConnection,
}

impl<'a> FileSelector<'a> {
    pub fn new(pool: &'a mut PgConnection) -> Self {
        FileSelector { pool }
    }

    pub async fn get_by_id(&mut self, id: i64) -> Result<Option<FileEntry>> {
        let row = sqlx::query_as::<_, FileEntry>(
            "SELECT id, alumni_id, category, file_name, original_name, file_path, file_size,
                    file_type, uploaded_at
             FROM files WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get_by_alumni(&mut self, alumni_id: i64) -> Result<Vec<FileEntry>> {
        let rows = sqlx::query_as::<_, FileEntry>(
            "SELECT id, alumni_id, category, file_name, original_name, file_path, file_size,
                    file_type, uploaded_at
             FROM files WHERE alumni_id = $1 ORDER BY uploaded_at DESC, id DESC",
        )
        .bind(alumni_id)
        .fetch_all(&mut *self.pool)
        .await?;
        Ok(rows)
    }
}
