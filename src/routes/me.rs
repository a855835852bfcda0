use axum::{extract::State, response::IntoResponse};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::api::{DataResponse, NoContent};
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::{EntityKind, UserRole};
use crate::error::ApiError;
use crate::store::DataStore;

#[derive(Serialize)]
pub struct MeResponse {
    pub user_id: String,
    pub email: Option<String>,
    pub role: UserRole,
    /// Cached record count per entity kind
    pub cached: BTreeMap<&'static str, usize>,
}

fn cache_counts(store: &DataStore) -> BTreeMap<&'static str, usize> {
    let cache = store.snapshot();
    EntityKind::ALL
        .iter()
        .map(|kind| (kind.as_str(), cache.len_of(*kind)))
        .collect()
}

/// GET /me
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store_for(&auth).await;

    Ok(DataResponse::new(MeResponse {
        user_id: auth.user_id.clone(),
        email: auth.email.clone(),
        role: auth.role,
        cached: cache_counts(&store),
    }))
}

/// POST /session/refresh
///
/// Refetch every entity kind for the caller's session.
pub async fn refresh_session(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(user_id = %auth.user_id, "Refreshing session data");

    let store = state.store_for(&auth).await;
    store.refresh_all().await?;
    Ok(DataResponse::new(cache_counts(&store)))
}

/// DELETE /session
///
/// Ends the session: the store stops accepting writes and its persisted
/// snapshot is cleared.
pub async fn end_session(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let closed = state.sessions.close(&auth.user_id).await;
    tracing::info!(user_id = %auth.user_id, closed, "Session ended");
    Ok(NoContent)
}
