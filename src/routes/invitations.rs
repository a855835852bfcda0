use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::api::{Created, DataResponse};
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::{CreateBidInvitationInput, EntityKind, UpdateBidInvitationInput};
use crate::error::ApiError;

use super::ensure;

/// GET /projects/:project_id/invitations
pub async fn list_invitations(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(project_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store_for(&auth).await;
    ensure(&store, EntityKind::BidInvitation).await?;
    Ok(DataResponse::new(store.invitations_by_project(&project_id)))
}

/// GET /invitations/mine
pub async fn my_invitations(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store_for(&auth).await;
    ensure(&store, EntityKind::BidInvitation).await?;
    Ok(DataResponse::new(
        store.invitations_for_freelancer(&auth.user_id),
    ))
}

/// POST /projects/:project_id/invitations
pub async fn create_invitation(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(project_id): Path<String>,
    Json(mut input): Json<CreateBidInvitationInput>,
) -> Result<impl IntoResponse, ApiError> {
    input.project_id = project_id;
    tracing::info!(
        user_id = %auth.user_id,
        project_id = %input.project_id,
        freelancer_id = %input.freelancer_id,
        "Inviting freelancer"
    );

    let store = state.store_for(&auth).await;
    ensure(&store, EntityKind::Project).await?;
    let invitation = store.create_bid_invitation(input).await?;
    Ok(Created(invitation))
}

/// PATCH /invitations/:invitation_id
pub async fn respond_to_invitation(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(invitation_id): Path<String>,
    Json(input): Json<UpdateBidInvitationInput>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store_for(&auth).await;
    ensure(&store, EntityKind::Project).await?;
    let invitation = store.update_bid_invitation(&invitation_id, input).await?;
    Ok(DataResponse::new(invitation))
}
