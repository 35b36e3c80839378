use std::any::Any;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use super::handlers::{alumni, auth, files, jobs, probes};
use super::middlewares::authn;
use super::state::AppState;
use crate::prelude::{AppError, Result};

pub const API_PREFIX: &str = "/alumni-crud-api";

// largest upload (2 MiB certificate) plus multipart framing
const BODY_LIMIT: usize = 3 * 1024 * 1024;

fn panic_response(_: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("request handler panicked");
    AppError::Internal("internal server error".into()).into_response()
}

pub fn routes(state: AppState) -> Router {
    let api = Router::new()
        .route("/auth/profile", get(auth::profile))
        .route("/alumni", get(alumni::list).post(alumni::create))
        .route(
            "/alumni/:id",
            get(alumni::get).put(alumni::update).delete(alumni::delete),
        )
        .route("/pekerjaan", get(jobs::list).post(jobs::create))
        .route("/pekerjaan/trash", get(jobs::trash))
        .route("/pekerjaan/alumni/:alumni_id", get(jobs::by_alumni))
        .route(
            "/pekerjaan/:id",
            get(jobs::get).put(jobs::update).delete(jobs::delete),
        )
        .route("/pekerjaan/:id/soft-delete", patch(jobs::soft_delete))
        .route("/pekerjaan/:id/restore", patch(jobs::restore))
        .route("/pekerjaan/:id/hard-delete", delete(jobs::hard_delete))
        .route("/upload/photo", post(files::upload_photo))
        .route("/upload/certificate", post(files::upload_certificate))
        .route("/files/alumni/:alumni_id", get(files::list_for_alumni))
        .route("/files/:id", delete(files::delete))
        .route_layer(from_fn_with_state(state.clone(), authn::authenticate))
        .route("/auth/login", post(auth::login));

    let app = Router::new()
        .route("/", get(probes::root))
        .route("/healthz", get(probes::healthz))
        .route("/livez", get(probes::livez))
        .nest(API_PREFIX, api);
    with_layers(app).with_state(state)
}

/// Request-wide layers; must be applied after every route is registered.
fn with_layers<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(panic_response))
}

pub async fn build_routes() -> Result<Router> {
    let state = AppState::new().await?;
    Ok(routes(state))
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use tracing_test::traced_test;

    use super::{routes, with_layers};
    use crate::pkg::{
        internal::{
            adaptors::{document::DocStore, users::spec::Role},
            blob::LocalBlobs,
            store::Store,
        },
        server::state::AppState,
    };

    struct Harness {
        _dirs: (tempfile::TempDir, tempfile::TempDir),
        app: Router,
        state: AppState,
    }

    async fn harness() -> Harness {
        let data = tempfile::tempdir().unwrap();
        let uploads = tempfile::tempdir().unwrap();
        let store: Arc<dyn Store> = Arc::new(DocStore::open(data.path().join("api.redb")).unwrap());
        let state = AppState::from_parts(
            "alumni-registry",
            store,
            Arc::new(LocalBlobs::new(uploads.path())),
            crate::pkg::internal::auth::TokenIssuer::new("router-secret", chrono::Duration::hours(1)),
            Duration::from_secs(5),
            4,
        )
        .unwrap();
        Harness {
            _dirs: (data, uploads),
            app: routes(state.clone()),
            state,
        }
    }

    impl Harness {
        async fn call(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut req = Request::builder()
                .method(method)
                .uri(format!("/alumni-crud-api{uri}"));
            if let Some(token) = token {
                req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            let req = match body {
                Some(body) => req
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string())),
                None => req.body(Body::empty()),
            }
            .unwrap();
            let res = self.app.clone().oneshot(req).await.unwrap();
            let status = res.status();
            let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
            let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
            (status, json)
        }

        async fn login(&self, username: &str, role: Role) -> String {
            self.state
                .auth
                .register(username, &format!("{username}@campus.test"), "pass-word", role)
                .await
                .unwrap();
            let (status, body) = self
                .call(
                    Method::POST,
                    "/auth/login",
                    None,
                    Some(json!({"username": username, "password": "pass-word"})),
                )
                .await;
            assert_eq!(status, StatusCode::OK, "{body}");
            body["data"]["token"].as_str().unwrap().to_string()
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn protected_routes_need_a_valid_token() {
        let h = harness().await;
        let (status, body) = h.call(Method::GET, "/alumni", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);

        let (status, _) = h.call(Method::GET, "/alumni", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = h
            .call(Method::POST, "/auth/login", None, Some(json!({"username": "", "password": ""})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"].as_array().map(|e| e.len()), Some(2));

        let token = h.login("andi", Role::User).await;
        let (status, body) = h.call(Method::GET, "/auth/profile", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["username"], "andi");
        assert!(body["data"].get("password_hash").is_none());
    }

    #[tokio::test]
    #[traced_test]
    async fn trash_flow_over_http() {
        let h = harness().await;
        let admin = h.login("admin", Role::Admin).await;
        let user = h.login("andi", Role::User).await;

        let (status, body) = h
            .call(
                Method::POST,
                "/alumni",
                Some(&user),
                Some(json!({
                    "nim": "1001", "name": "Andi", "program": "Informatics",
                    "cohort_year": 2016, "graduation_year": 2020, "email": "andi@campus.test"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let alumni_id = body["data"]["id"].as_i64().unwrap();

        let job = json!({
            "alumni_id": alumni_id, "company": "Acme", "position": "Engineer",
            "industry": "Software", "location": "Malang", "start_date": "2021-01-04",
            "status": "active"
        });
        let (status, _) = h.call(Method::POST, "/pekerjaan", Some(&user), Some(job.clone())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, body) = h.call(Method::POST, "/pekerjaan", Some(&admin), Some(job)).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let job_id = body["data"]["id"].as_i64().unwrap();

        let (status, _) = h
            .call(Method::PATCH, &format!("/pekerjaan/{job_id}/soft-delete"), Some(&user), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = h.call(Method::GET, &format!("/pekerjaan/{job_id}"), Some(&user), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = h.call(Method::GET, "/pekerjaan/trash", Some(&user), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["meta"]["total"], 1);
        assert_eq!(body["meta"]["sortBy"], "deleted_at");

        let (status, body) = h
            .call(Method::PATCH, &format!("/pekerjaan/{job_id}/restore"), Some(&user), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["is_deleted"], false);

        let (status, _) = h
            .call(Method::DELETE, &format!("/pekerjaan/{job_id}/hard-delete"), Some(&admin), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    #[traced_test]
    async fn malformed_ids_are_bad_requests() {
        let h = harness().await;
        let token = h.login("admin", Role::Admin).await;
        let (status, body) = h.call(Method::GET, "/pekerjaan/abc", Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn probes_answer_outside_the_api_prefix() {
        let h = harness().await;
        for uri in ["/livez", "/healthz"] {
            let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
            let res = h.app.clone().oneshot(req).await.unwrap();
            assert_eq!(res.status(), StatusCode::OK, "{uri}");
        }
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let res = h.app.clone().oneshot(req).await.unwrap();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["data"]["service"], "alumni-registry");
    }

    #[tokio::test]
    #[traced_test]
    async fn panicking_handlers_become_a_plain_500() {
        async fn boom() -> &'static str {
            panic!("secret stack detail")
        }
        let app = with_layers(Router::new().route("/boom", axum::routing::get(boom)));
        let req = Request::builder().uri("/boom").body(Body::empty()).unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "internal server error");
        assert!(!body.to_string().contains("secret stack detail"));
    }

    #[tokio::test]
    #[traced_test]
    async fn uploads_must_be_multipart() {
        let h = harness().await;
        let token = h.login("andi", Role::User).await;
        let (status, body) = h
            .call(Method::POST, "/upload/photo", Some(&token), Some(json!({"file": "x"})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().starts_with("expected a multipart form"));
    }
}
