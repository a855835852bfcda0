use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::api::{Created, DataResponse};
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::{CreateBidInput, EntityKind, UpdateBidInput};
use crate::error::ApiError;

use super::ensure;

/// GET /projects/:project_id/bids
pub async fn list_bids(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(project_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store_for(&auth).await;
    ensure(&store, EntityKind::Bid).await?;
    Ok(DataResponse::new(store.bids_by_project(&project_id)))
}

/// GET /bids/mine
pub async fn my_bids(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store_for(&auth).await;
    ensure(&store, EntityKind::Bid).await?;
    Ok(DataResponse::new(store.bids_by_freelancer(&auth.user_id)))
}

/// POST /projects/:project_id/bids
pub async fn create_bid(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(project_id): Path<String>,
    Json(mut input): Json<CreateBidInput>,
) -> Result<impl IntoResponse, ApiError> {
    input.project_id = project_id;
    tracing::info!(
        user_id = %auth.user_id,
        project_id = %input.project_id,
        amount = input.amount,
        "Submitting bid"
    );

    let store = state.store_for(&auth).await;
    let bid = store.create_bid(input).await?;
    Ok(Created(bid))
}

/// PATCH /bids/:bid_id
pub async fn update_bid(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(bid_id): Path<String>,
    Json(input): Json<UpdateBidInput>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store_for(&auth).await;
    let bid = store.update_bid(&bid_id, input).await?;
    Ok(DataResponse::new(bid))
}

/// POST /bids/:bid_id/accept
pub async fn accept_bid(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(bid_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(user_id = %auth.user_id, bid_id = %bid_id, "Accepting bid");

    let store = state.store_for(&auth).await;
    ensure(&store, EntityKind::Project).await?;
    let accepted = store.accept_bid(&bid_id).await?;
    Ok(DataResponse::new(accepted))
}
