use serde::{Deserialize, Serialize};

pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

/// Raw list query string. Numbers stay strings so garbage falls back to the
/// defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        let page = page.filter(|p| *p >= 1).unwrap_or(1);
        let limit = limit
            .filter(|l| (1..=MAX_LIMIT as i64).contains(l))
            .unwrap_or(DEFAULT_LIMIT as i64);
        PageRequest {
            page: u32::try_from(page).unwrap_or(u32::MAX),
            limit: limit as u32,
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest::new(None, None)
    }
}

pub fn page_count(total: u64, limit: u32) -> u64 {
    if total == 0 {
        return 0;
    }
    total.div_ceil(limit.max(1) as u64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|r| r.trim().to_ascii_lowercase()).as_deref() {
            Some("asc") => Order::Asc,
            _ => Order::Desc,
        }
    }

    pub fn sql(self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Order::Asc => "asc",
            Order::Desc => "desc",
        }
    }
}

/// A column a listing may be ordered by. `parse` is the allow-list: anything
/// it rejects falls back to `DEFAULT` and never reaches a query.
pub trait SortField: Copy + std::fmt::Debug {
    const DEFAULT: Self;
    fn parse(raw: &str) -> Option<Self>;
    fn column(self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort<F> {
    pub field: F,
    pub order: Order,
}

impl<F: SortField> Sort<F> {
    pub fn resolve(sort_by: Option<&str>, order: Option<&str>) -> Self {
        Sort {
            field: sort_by.and_then(|s| F::parse(s.trim())).unwrap_or(F::DEFAULT),
            order: Order::parse(order),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobSort {
    Id,
    AlumniId,
    Company,
    Position,
    Industry,
    Location,
    Status,
    StartDate,
    CreatedAt,
    /// Trash ordering only, not selectable by clients.
    DeletedAt,
}

impl SortField for JobSort {
    const DEFAULT: Self = JobSort::CreatedAt;

    fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "id" => JobSort::Id,
            "alumni_id" => JobSort::AlumniId,
            "company" => JobSort::Company,
            "position" => JobSort::Position,
            "industry" => JobSort::Industry,
            "location" => JobSort::Location,
            "status" => JobSort::Status,
            "start_date" => JobSort::StartDate,
            "created_at" => JobSort::CreatedAt,
            _ => return None,
        })
    }

    fn column(self) -> &'static str {
        match self {
            JobSort::Id => "id",
            JobSort::AlumniId => "alumni_id",
            JobSort::Company => "company",
            JobSort::Position => "position",
            JobSort::Industry => "industry",
            JobSort::Location => "location",
            JobSort::Status => "status",
            JobSort::StartDate => "start_date",
            JobSort::CreatedAt => "created_at",
            JobSort::DeletedAt => "deleted_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlumniSort {
    Id,
    Nim,
    Name,
    Program,
    CohortYear,
    GraduationYear,
    Email,
    CreatedAt,
}

impl SortField for AlumniSort {
    const DEFAULT: Self = AlumniSort::CreatedAt;

    fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "id" => AlumniSort::Id,
            "nim" => AlumniSort::Nim,
            "name" => AlumniSort::Name,
            "program" => AlumniSort::Program,
            "cohort_year" => AlumniSort::CohortYear,
            "graduation_year" => AlumniSort::GraduationYear,
            "email" => AlumniSort::Email,
            "created_at" => AlumniSort::CreatedAt,
            _ => return None,
        })
    }

    fn column(self) -> &'static str {
        match self {
            AlumniSort::Id => "id",
            AlumniSort::Nim => "nim",
            AlumniSort::Name => "name",
            AlumniSort::Program => "program",
            AlumniSort::CohortYear => "cohort_year",
            AlumniSort::GraduationYear => "graduation_year",
            AlumniSort::Email => "email",
            AlumniSort::CreatedAt => "created_at",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListQuery<F> {
    pub search: Option<String>,
    pub sort: Sort<F>,
    pub page: PageRequest,
}

fn parse_number(raw: Option<&String>) -> Option<i64> {
    raw.and_then(|r| r.trim().parse().ok())
}

impl<F: SortField> ListQuery<F> {
    pub fn from_params(params: &ListParams) -> Self {
        ListQuery {
            search: params
                .search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            sort: Sort::resolve(params.sort_by.as_deref(), params.order.as_deref()),
            page: PageRequest::new(
                parse_number(params.page.as_ref()),
                parse_number(params.limit.as_ref()),
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PageMeta {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
    #[serde(rename = "sortBy")]
    pub sort_by: &'static str,
    pub order: &'static str,
    pub search: String,
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Page<T> {
    pub fn new<F: SortField>(items: Vec<T>, total: u64, query: &ListQuery<F>) -> Self {
        Page {
            items,
            meta: PageMeta {
                page: query.page.page,
                limit: query.page.limit,
                total,
                pages: page_count(total, query.page.limit),
                sort_by: query.sort.field.column(),
                order: query.sort.order.as_str(),
                search: query.search.clone().unwrap_or_default(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_and_limit_are_clamped() {
        assert_eq!(PageRequest::new(Some(0), Some(0)), PageRequest { page: 1, limit: 10 });
        assert_eq!(PageRequest::new(Some(-3), Some(101)), PageRequest { page: 1, limit: 10 });
        assert_eq!(PageRequest::new(Some(3), Some(100)), PageRequest { page: 3, limit: 100 });
        assert_eq!(PageRequest::new(Some(3), Some(20)).offset(), 40);
    }

    #[test]
    fn pages_is_zero_only_for_empty_results() {
        assert_eq!(page_count(0, 10), 0);
        assert_eq!(page_count(1, 10), 1);
        assert_eq!(page_count(10, 10), 1);
        assert_eq!(page_count(11, 10), 2);
        assert_eq!(page_count(250, 100), 3);
    }

    #[test]
    fn unknown_sort_fields_fall_back_to_default() {
        let sort = Sort::<JobSort>::resolve(Some("company; drop table jobs"), Some("asc"));
        assert_eq!(sort.field, JobSort::CreatedAt);
        assert_eq!(sort.order, Order::Asc);

        let sort = Sort::<JobSort>::resolve(Some("deleted_at"), None);
        assert_eq!(sort.field, JobSort::CreatedAt);
        assert_eq!(sort.order, Order::Desc);

        let sort = Sort::<AlumniSort>::resolve(Some("graduation_year"), Some("sideways"));
        assert_eq!(sort.field, AlumniSort::GraduationYear);
        assert_eq!(sort.order, Order::Desc);
    }

    #[test]
    fn list_query_tolerates_garbage_numbers() {
        let params = ListParams {
            page: Some("two".into()),
            limit: Some("25".into()),
            search: Some("   ".into()),
            ..Default::default()
        };
        let query = ListQuery::<AlumniSort>::from_params(&params);
        assert_eq!(query.page, PageRequest { page: 1, limit: 25 });
        assert_eq!(query.search, None);
    }
}
