use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::pkg::internal::pagination::{Page, PageMeta};

#[derive(Serialize)]
struct Body<'a, T> {
    success: bool,
    message: &'a str,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    meta: Option<PageMeta>,
}

/// Success envelope: `{success: true, message, data}` plus `meta` on lists.
pub struct Envelope<T> {
    status: StatusCode,
    message: String,
    data: T,
    meta: Option<PageMeta>,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Envelope {
            status: StatusCode::OK,
            message: message.into(),
            data,
            meta: None,
        }
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Envelope {
            status: StatusCode::CREATED,
            ..Envelope::ok(message, data)
        }
    }
}

impl<T: Serialize> Envelope<Vec<T>> {
    pub fn page(message: impl Into<String>, page: Page<T>) -> Self {
        Envelope {
            meta: Some(page.meta),
            ..Envelope::ok(message, page.items)
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        let body = Body {
            success: true,
            message: &self.message,
            data: self.data,
            meta: self.meta,
        };
        (self.status, Json(body)).into_response()
    }
}
