use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::{Created, DataResponse};
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::{CreateDisputeInput, EntityKind, UpdateDisputeInput};
use crate::error::ApiError;

use super::ensure;

#[derive(Debug, Default, Deserialize)]
pub struct DisputeListQuery {
    pub project_id: Option<String>,
}

/// GET /disputes
pub async fn list_disputes(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Query(query): Query<DisputeListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store_for(&auth).await;
    ensure(&store, EntityKind::Dispute).await?;

    let disputes = match query.project_id {
        Some(project_id) => store.disputes_by_project(&project_id),
        None => store.disputes(),
    };
    Ok(DataResponse::new(disputes))
}

/// POST /disputes
pub async fn create_dispute(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Json(input): Json<CreateDisputeInput>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(user_id = %auth.user_id, project_id = %input.project_id, "Raising dispute");

    let store = state.store_for(&auth).await;
    let dispute = store.create_dispute(input).await?;
    Ok(Created(dispute))
}

/// PATCH /disputes/:dispute_id
pub async fn update_dispute(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(dispute_id): Path<String>,
    Json(input): Json<UpdateDisputeInput>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store_for(&auth).await;
    ensure(&store, EntityKind::Project).await?;
    let dispute = store.update_dispute(&dispute_id, input).await?;
    Ok(DataResponse::new(dispute))
}
