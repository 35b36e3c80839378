use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use axum_extra::extract::WithRejection;

use crate::{
    pkg::{
        internal::{
            adaptors::alumni::spec::AlumniEntry,
            pagination::{AlumniSort, ListParams, ListQuery},
            policy::Actor,
            validation::AlumniInput,
        },
        server::{middlewares::authn::RequireAdmin, response::Envelope, state::AppState},
    },
    prelude::{AppError, Result},
};

pub async fn list(
    State(state): State<AppState>,
    WithRejection(Query(params), _): WithRejection<Query<ListParams>, AppError>,
) -> Result<Envelope<Vec<AlumniEntry>>> {
    let query = ListQuery::<AlumniSort>::from_params(&params);
    let page = state.alumni.list(&query).await?;
    Ok(Envelope::page("alumni retrieved", page))
}

pub async fn get(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> Result<Envelope<AlumniEntry>> {
    Ok(Envelope::ok("alumni retrieved", state.alumni.get(id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(actor): Extension<Arc<Actor>>,
    WithRejection(Json(input), _): WithRejection<Json<AlumniInput>, AppError>,
) -> Result<Envelope<AlumniEntry>> {
    let alumni = state.alumni.create(&actor, input).await?;
    Ok(Envelope::created("alumni created", alumni))
}

pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(actor): RequireAdmin,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
    WithRejection(Json(input), _): WithRejection<Json<AlumniInput>, AppError>,
) -> Result<Envelope<AlumniEntry>> {
    let alumni = state.alumni.update(&actor, id, input).await?;
    Ok(Envelope::ok("alumni updated", alumni))
}

pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(actor): RequireAdmin,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> Result<Envelope<()>> {
    state.alumni.delete(&actor, id).await?;
    Ok(Envelope::ok("alumni deleted", ()))
}
