//! Request payloads for alumni and job records, checked with `validator`
//! plus the cross-field rules it cannot express. Every violated rule is
//! reported, not just the first.

use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use validator::{Validate, ValidationErrors};

use crate::{
    pkg::internal::adaptors::{
        alumni::spec::AlumniDraft,
        jobs::spec::{JobDraft, JobStatus},
    },
    prelude::{AppError, Result},
};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Flattens derive-level violations into their messages, sorted so the
/// response is stable.
pub fn violations(result: std::result::Result<(), ValidationErrors>) -> Vec<String> {
    let Err(errors) = result else {
        return Vec::new();
    };
    let mut messages: Vec<String> = errors
        .field_errors()
        .values()
        .flat_map(|list| list.iter())
        .map(|e| match &e.message {
            Some(message) => message.to_string(),
            None => format!("{} is invalid", e.code),
        })
        .collect();
    messages.sort();
    messages
}

fn trimmed(value: String) -> String {
    value.trim().to_string()
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `YYYY-MM-DD`, or an RFC 3339 timestamp of which only the date is kept.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|t| t.date_naive()))
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct JobInput {
    #[serde(default)]
    pub alumni_id: Option<i64>,
    #[serde(default)]
    #[validate(length(min = 1, message = "company is required"))]
    pub company: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "position is required"))]
    pub position: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "industry is required"))]
    pub industry: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "location is required"))]
    pub location: String,
    #[serde(default)]
    pub salary_range: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, message = "start_date is required"))]
    pub start_date: String,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, message = "status is required"))]
    pub status: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl JobInput {
    fn normalized(self) -> Self {
        JobInput {
            alumni_id: self.alumni_id,
            company: trimmed(self.company),
            position: trimmed(self.position),
            industry: trimmed(self.industry),
            location: trimmed(self.location),
            salary_range: optional(self.salary_range),
            start_date: trimmed(self.start_date),
            end_date: optional(self.end_date),
            status: trimmed(self.status).to_lowercase(),
            description: optional(self.description),
        }
    }

    /// Payload of a new record; `alumni_id` is mandatory.
    pub fn into_new(self) -> Result<(i64, JobDraft)> {
        let alumni_id = self.alumni_id;
        let mut problems = Vec::new();
        if alumni_id.is_none() {
            problems.push("alumni_id is required".to_string());
        }
        let draft = self.check(problems)?;
        match alumni_id {
            Some(id) => Ok((id, draft)),
            None => Err(AppError::Validation(vec!["alumni_id is required".into()])),
        }
    }

    /// Payload of an update; an `alumni_id` in the body is ignored.
    pub fn into_draft(self) -> Result<JobDraft> {
        self.check(Vec::new())
    }

    fn check(self, mut problems: Vec<String>) -> Result<JobDraft> {
        let input = self.normalized();
        problems.extend(violations(input.validate()));

        let start_date = match input.start_date.as_str() {
            "" => None,
            raw => {
                let parsed = parse_date(raw);
                if parsed.is_none() {
                    problems.push("start_date must be a date (YYYY-MM-DD)".into());
                }
                parsed
            }
        };
        let end_date = match input.end_date.as_deref() {
            None => None,
            Some(raw) => {
                let parsed = parse_date(raw);
                if parsed.is_none() {
                    problems.push("end_date must be a date (YYYY-MM-DD)".into());
                }
                parsed
            }
        };
        if let (Some(start), Some(end)) = (start_date, end_date) {
            if end < start {
                problems.push("end_date cannot be earlier than start_date".into());
            }
        }
        let status = JobStatus::parse(&input.status);
        if status.is_none() {
            problems.push(format!(
                "status must be '{}', '{}', or '{}'",
                JobStatus::ALLOWED[0],
                JobStatus::ALLOWED[1],
                JobStatus::ALLOWED[2]
            ));
        }

        match (start_date, status) {
            (Some(start_date), Some(status)) if problems.is_empty() => Ok(JobDraft {
                company: input.company,
                position: input.position,
                industry: input.industry,
                location: input.location,
                salary_range: input.salary_range,
                start_date,
                end_date,
                status,
                description: input.description,
            }),
            _ => Err(AppError::Validation(problems)),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct AlumniInput {
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    #[validate(length(min = 1, message = "nim is required"))]
    pub nim: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "program is required"))]
    pub program: String,
    #[serde(default)]
    #[validate(range(min = 1, message = "cohort_year must be greater than 0"))]
    pub cohort_year: i32,
    #[serde(default)]
    #[validate(range(min = 1, message = "graduation_year must be greater than 0"))]
    pub graduation_year: i32,
    #[serde(default)]
    #[validate(length(min = 1, message = "email is required"))]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl AlumniInput {
    pub fn into_draft(self) -> Result<AlumniDraft> {
        let input = AlumniInput {
            user_id: self.user_id,
            nim: trimmed(self.nim),
            name: trimmed(self.name),
            program: trimmed(self.program),
            cohort_year: self.cohort_year,
            graduation_year: self.graduation_year,
            email: trimmed(self.email),
            phone: optional(self.phone),
            address: optional(self.address),
        };
        let mut problems = violations(input.validate());
        if !input.email.is_empty() && !input.email.contains('@') {
            problems.push("email must contain '@'".into());
        }
        if input.graduation_year < input.cohort_year {
            problems.push("graduation_year cannot be earlier than cohort_year".into());
        }
        if !problems.is_empty() {
            return Err(AppError::Validation(problems));
        }
        Ok(AlumniDraft {
            user_id: input.user_id,
            nim: input.nim,
            name: input.name,
            program: input.program,
            cohort_year: input.cohort_year,
            graduation_year: input.graduation_year,
            email: input.email,
            phone: input.phone,
            address: input.address,
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginInput {
    #[serde(default)]
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

impl LoginInput {
    pub fn check(&self) -> Result<()> {
        let problems = violations(self.validate());
        if problems.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(problems))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AlumniInput, JobInput};
    use crate::{pkg::internal::adaptors::jobs::spec::JobStatus, prelude::AppError};

    fn violations_of(err: AppError) -> Vec<String> {
        match err {
            AppError::Validation(list) => list,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn unknown_status_is_reported_with_the_allowed_values() {
        let input = JobInput {
            alumni_id: Some(1),
            company: "Acme".into(),
            position: "Engineer".into(),
            industry: "Software".into(),
            location: "Jakarta".into(),
            start_date: "2021-02-01".into(),
            status: "pending".into(),
            ..Default::default()
        };
        let problems = violations_of(input.into_new().unwrap_err());
        assert_eq!(problems, vec!["status must be 'active', 'completed', or 'resigned'"]);
    }

    #[test]
    fn every_violation_is_listed() {
        let input = JobInput {
            company: "  ".into(),
            start_date: "yesterday".into(),
            ..Default::default()
        };
        let problems = violations_of(input.into_new().unwrap_err());
        for expected in [
            "alumni_id is required",
            "company is required",
            "position is required",
            "industry is required",
            "location is required",
            "status is required",
            "start_date must be a date (YYYY-MM-DD)",
        ] {
            assert!(problems.iter().any(|p| p == expected), "missing {expected}: {problems:?}");
        }
    }

    #[test]
    fn valid_job_input_becomes_a_draft() {
        let input = JobInput {
            company: " Acme ".into(),
            position: "Engineer".into(),
            industry: "Software".into(),
            location: "Jakarta".into(),
            start_date: "2021-02-01T00:00:00Z".into(),
            end_date: Some("".into()),
            status: "Completed".into(),
            salary_range: Some("  ".into()),
            ..Default::default()
        };
        let draft = input.into_draft().unwrap();
        assert_eq!(draft.company, "Acme");
        assert_eq!(draft.status, JobStatus::Completed);
        assert_eq!(draft.end_date, None);
        assert_eq!(draft.salary_range, None);
    }

    #[test]
    fn end_date_before_start_date_is_rejected() {
        let input = JobInput {
            company: "Acme".into(),
            position: "Engineer".into(),
            industry: "Software".into(),
            location: "Jakarta".into(),
            start_date: "2021-02-01".into(),
            end_date: Some("2020-01-01".into()),
            status: "resigned".into(),
            ..Default::default()
        };
        let problems = violations_of(input.into_draft().unwrap_err());
        assert_eq!(problems, vec!["end_date cannot be earlier than start_date"]);
    }

    #[test]
    fn alumni_years_must_be_ordered() {
        let input = AlumniInput {
            nim: "123".into(),
            name: "Sari".into(),
            program: "Physics".into(),
            cohort_year: 2020,
            graduation_year: 2018,
            email: "sari.campus.test".into(),
            ..Default::default()
        };
        let problems = violations_of(input.into_draft().unwrap_err());
        assert_eq!(
            problems,
            vec![
                "email must contain '@'".to_string(),
                "graduation_year cannot be earlier than cohort_year".to_string(),
            ]
        );
    }

    #[test]
    fn trailing_garbage_after_a_date_is_rejected() {
        let input = JobInput {
            company: "Acme".into(),
            position: "Engineer".into(),
            industry: "Software".into(),
            location: "Jakarta".into(),
            start_date: "2021-02-01garbage".into(),
            status: "active".into(),
            ..Default::default()
        };
        let problems = violations_of(input.into_draft().unwrap_err());
        assert_eq!(problems, vec!["start_date must be a date (YYYY-MM-DD)"]);
    }
}
