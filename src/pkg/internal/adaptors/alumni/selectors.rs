use sqlx::{PgConnection, Postgres, QueryBuilder};

use crate::{
    pkg::internal::{
        adaptors::{alumni::spec::AlumniEntry, postgres::push_search},
        pagination::{AlumniSort, ListQuery, SortField},
    },
    prelude::Result,
};

const SEARCH_COLUMNS: [&str; 4] = ["name", "nim", "program", "email"];

pub struct AlumniSelector<'a> {
    pool: &'a mut PgConnection,
}

impl<'a> AlumniSelector<'a> {
    pub fn new(pool: &'a mut PgConnection) -> Self {
        AlumniSelector { pool }
    }

    pub async fn get_by_id(&mut self, id: i64) -> Result<Option<AlumniEntry>> {
        let row = sqlx::query_as::<_, AlumniEntry>(
            "SELECT id, user_id, nim, name, program, cohort_year, graduation_year, email, phone,
                    address, created_at, updated_at
             FROM alumni WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get_by_user(&mut self, user_id: i64) -> Result<Option<AlumniEntry>> {
        let row = sqlx::query_as::<_, AlumniEntry>(
            "SELECT id, user_id, nim, name, program, cohort_year, graduation_year, email, phone,
                    address, created_at, updated_at
             FROM alumni WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&mut *self.pool)
        .await?;
        Ok(row)
    }

    pub async fn list(&mut self, query: &ListQuery<AlumniSort>) -> Result<Vec<AlumniEntry>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT id, user_id, nim, name, program, cohort_year, graduation_year, email, phone,
                    address, created_at, updated_at
             FROM alumni WHERE TRUE",
        );
        if let Some(term) = query.search.as_deref() {
            push_search(&mut qb, &SEARCH_COLUMNS, term);
        }
        let order = query.sort.order.sql();
        qb.push(" ORDER BY ")
            .push(query.sort.field.column())
            .push(" ")
            .push(order)
            .push(", id ")
            .push(order)
            .push(" LIMIT ")
            .push_bind(query.page.limit as i64)
            .push(" OFFSET ")
            .push_bind(query.page.offset() as i64);
        let rows = qb
            .build_query_as::<AlumniEntry>()
            .fetch_all(&mut *self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn count(&mut self, search: Option<&str>) -> Result<u64> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM alumni WHERE TRUE");
        if let Some(term) = search {
            push_search(&mut qb, &SEARCH_COLUMNS, term);
        }
        let total = qb.build_query_scalar::<i64>().fetch_one(&mut *self.pool).await?;
        Ok(total.max(0) as u64)
    }
}
