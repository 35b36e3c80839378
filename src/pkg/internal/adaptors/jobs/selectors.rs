use sqlx::{PgConnection, Postgres, QueryBuilder};

use crate::{
    pkg::internal::{
        adaptors::{
            jobs::spec::{JobEntry, JobFilter, JobState},
            postgres::push_search,
        },
        pagination::{JobSort, PageRequest, Sort, SortField},
    },
    prelude::Result,
};

const SEARCH_COLUMNS: [&str; 5] = ["company", "position", "industry", "location", "status::text"];

pub struct JobSelector<'a> {
    pool: &'a mut PgConnection,
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &JobFilter) {
    if let Some(flag) = filter.state.deleted_flag() {
        qb.push(" AND is_deleted = ").push_bind(flag);
    }
    if let Some(alumni_id) = filter.alumni_id {
        qb.push(" AND alumni_id = ").push_bind(alumni_id);
    }
    if let Some(term) = filter.search.as_deref() {
        push_search(qb, &SEARCH_COLUMNS, term);
    }
}

impl<'a> JobSelector<'a> {
    pub fn new(pool: &'a mut PgConnection) -> Self {
        JobSelector { pool }
    }

    pub async fn get_by_id(&mut self, id: i64, state: JobState) -> Result<Option<JobEntry>> {
        let row = sqlx::query_as::<_, JobEntry>(
            "SELECT id, alumni_id, company, position, industry, location, salary_range, start_date,
                    end_date, status, description, is_deleted, deleted_at, deleted_by, created_at,
                    updated_at
             FROM jobs WHERE id = $1 AND ($2::BOOLEAN IS NULL OR is_deleted = $2)",
        )
        .bind(id)
        .bind(state.deleted_flag())
        .fetch_optional(&mut *self.pool)
        .await?;
        Ok(row)
    }

    /// Nulls sort last in either direction, which keeps never-trashed rows at
    /// the bottom of a `deleted_at` ordering.
    pub async fn list(
        &mut self,
        filter: &JobFilter,
        sort: Sort<JobSort>,
        window: Option<PageRequest>,
    ) -> Result<Vec<JobEntry>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT id, alumni_id, company, position, industry, location, salary_range, start_date,
                    end_date, status, description, is_deleted, deleted_at, deleted_by, created_at,
                    updated_at
             FROM jobs WHERE TRUE",
        );
        push_filter(&mut qb, filter);
        let order = sort.order.sql();
        qb.push(" ORDER BY ")
            .push(sort.field.column())
            .push(" ")
            .push(order)
            .push(" NULLS LAST, id ")
            .push(order);
        if let Some(window) = window {
            qb.push(" LIMIT ")
                .push_bind(window.limit as i64)
                .push(" OFFSET ")
                .push_bind(window.offset() as i64);
        }
        let rows = qb
            .build_query_as::<JobEntry>()
            .fetch_all(&mut *self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn count(&mut self, filter: &JobFilter) -> Result<u64> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM jobs WHERE TRUE");
        push_filter(&mut qb, filter);
        let total = qb.build_query_scalar::<i64>().fetch_one(&mut *self.pool).await?;
        Ok(total.max(0) as u64)
    }
}
