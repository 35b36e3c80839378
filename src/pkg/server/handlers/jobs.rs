use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use axum_extra::extract::WithRejection;

use crate::{
    pkg::{
        internal::{
            adaptors::jobs::spec::JobEntry,
            pagination::{JobSort, ListParams, ListQuery},
            policy::Actor,
            validation::JobInput,
        },
        server::{middlewares::authn::RequireAdmin, response::Envelope, state::AppState},
    },
    prelude::{AppError, Result},
};

type IdPath = WithRejection<Path<i64>, AppError>;

pub async fn list(
    State(state): State<AppState>,
    WithRejection(Query(params), _): WithRejection<Query<ListParams>, AppError>,
) -> Result<Envelope<Vec<JobEntry>>> {
    let query = ListQuery::<JobSort>::from_params(&params);
    let page = state.jobs.list(&query).await?;
    Ok(Envelope::page("job records retrieved", page))
}

pub async fn trash(
    State(state): State<AppState>,
    Extension(actor): Extension<Arc<Actor>>,
    WithRejection(Query(params), _): WithRejection<Query<ListParams>, AppError>,
) -> Result<Envelope<Vec<JobEntry>>> {
    let query = ListQuery::<JobSort>::from_params(&params);
    let page = state.jobs.list_trash(&actor, &query).await?;
    Ok(Envelope::page("trash retrieved", page))
}

pub async fn get(
    State(state): State<AppState>,
    WithRejection(Path(id), _): IdPath,
) -> Result<Envelope<JobEntry>> {
    Ok(Envelope::ok("job record retrieved", state.jobs.get(id).await?))
}

pub async fn by_alumni(
    State(state): State<AppState>,
    RequireAdmin(actor): RequireAdmin,
    WithRejection(Path(alumni_id), _): IdPath,
) -> Result<Envelope<Vec<JobEntry>>> {
    let jobs = state.jobs.list_by_alumni(&actor, alumni_id).await?;
    Ok(Envelope::ok("job records retrieved", jobs))
}

pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(actor): RequireAdmin,
    WithRejection(Json(input), _): WithRejection<Json<JobInput>, AppError>,
) -> Result<Envelope<JobEntry>> {
    let job = state.jobs.create(&actor, input).await?;
    Ok(Envelope::created("job record created", job))
}

pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(actor): RequireAdmin,
    WithRejection(Path(id), _): IdPath,
    WithRejection(Json(input), _): WithRejection<Json<JobInput>, AppError>,
) -> Result<Envelope<JobEntry>> {
    let job = state.jobs.update(&actor, id, input).await?;
    Ok(Envelope::ok("job record updated", job))
}

pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(actor): RequireAdmin,
    WithRejection(Path(id), _): IdPath,
) -> Result<Envelope<()>> {
    state.jobs.hard_delete(&actor, id).await?;
    Ok(Envelope::ok("job record deleted", ()))
}

pub async fn soft_delete(
    State(state): State<AppState>,
    Extension(actor): Extension<Arc<Actor>>,
    WithRejection(Path(id), _): IdPath,
) -> Result<Envelope<JobEntry>> {
    let job = state.jobs.soft_delete(&actor, id).await?;
    Ok(Envelope::ok("job record moved to trash", job))
}

pub async fn restore(
    State(state): State<AppState>,
    Extension(actor): Extension<Arc<Actor>>,
    WithRejection(Path(id), _): IdPath,
) -> Result<Envelope<JobEntry>> {
    let job = state.jobs.restore(&actor, id).await?;
    Ok(Envelope::ok("job record restored", job))
}

pub async fn hard_delete(
    State(state): State<AppState>,
    Extension(actor): Extension<Arc<Actor>>,
    WithRejection(Path(id), _): IdPath,
) -> Result<Envelope<()>> {
    state.jobs.purge(&actor, id).await?;
    Ok(Envelope::ok("job record permanently deleted", ()))
}
