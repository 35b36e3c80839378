use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};

use crate::{
    pkg::{internal::policy::Actor, server::state::AppState},
    prelude::{AppError, Result},
};

/// Resolves the bearer token into an [`Actor`] request extension.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let Some(bearer) = request.headers().typed_get::<Authorization<Bearer>>() else {
        tracing::warn!("token missing, authentication denied");
        return Err(AppError::Unauthenticated("missing bearer token".into()));
    };
    let claims = state.auth.validate(bearer.token()).map_err(|e| {
        tracing::warn!("token rejected: {}", e);
        AppError::from(e)
    })?;
    request.extensions_mut().insert(Arc::new(Actor::from(claims)));
    Ok(next.run(request).await)
}

/// Extractor for admin-only handlers. Must run behind [`authenticate`].
pub struct RequireAdmin(pub Arc<Actor>);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor = parts
            .extensions
            .get::<Arc<Actor>>()
            .cloned()
            .ok_or_else(|| AppError::Unauthenticated("authentication required".into()))?;
        if !actor.is_admin() {
            tracing::warn!("user {} tried an admin-only route {}", actor.user_id, parts.uri.path());
            return Err(AppError::Forbidden("admin role required".into()));
        }
        Ok(RequireAdmin(actor))
    }
}
