use axum::extract::State;
use serde_json::{json, Value};

use crate::{
    pkg::{
        internal::store::with_deadline,
        server::{response::Envelope, state::AppState},
    },
    prelude::Result,
};

pub async fn livez() -> Result<()> {
    tracing::debug!("service is live");
    Ok(())
}

pub async fn healthz(State(state): State<AppState>) -> Result<()> {
    with_deadline(state.deadline, state.store.ping()).await?;
    tracing::debug!("service is healthy");
    Ok(())
}

pub async fn root(State(state): State<AppState>) -> Envelope<Value> {
    Envelope::ok(
        "service is running",
        json!({
            "service": state.service_name,
            "version": env!("CARGO_PKG_VERSION"),
        }),
    )
}
