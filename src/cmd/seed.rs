use crate::{
    pkg::{internal::adaptors::users::spec::Role, server::state::AppState},
    prelude::{AppError, Result},
};

/// Users are not self-service; this is how accounts come into existence.
pub async fn user(username: &str, email: &str, password: &str, role: &str) -> Result<()> {
    let role: Role = role.parse().map_err(AppError::BadRequest)?;
    if username.trim().is_empty() || password.is_empty() || !email.contains('@') {
        return Err(AppError::BadRequest(
            "username, password and a valid email are required".into(),
        ));
    }
    let state = AppState::new().await?;
    let user = state.auth.register(username.trim(), email.trim(), password, role).await?;
    tracing::info!("seeded {:?} user {} ({})", user.role, user.username, user.id);
    Ok(())
}
