use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use axum_extra::extract::WithRejection;
use serde::Serialize;

use crate::{
    pkg::{
        internal::{adaptors::users::spec::UserProfile, policy::Actor, validation::LoginInput},
        server::{response::Envelope, state::AppState},
    },
    prelude::{AppError, Result},
};

#[derive(Serialize)]
pub struct LoginOutput {
    pub user: UserProfile,
    pub token: String,
}

pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(input), _): WithRejection<Json<LoginInput>, AppError>,
) -> Result<Envelope<LoginOutput>> {
    input.check()?;
    let (user, token) = state.auth.authenticate(&input.username, &input.password).await?;
    Ok(Envelope::ok("login successful", LoginOutput { user, token }))
}

pub async fn profile(
    State(state): State<AppState>,
    Extension(actor): Extension<Arc<Actor>>,
) -> Result<Envelope<UserProfile>> {
    let profile = state.auth.profile(actor.user_id).await?;
    Ok(Envelope::ok("profile retrieved", profile))
}
