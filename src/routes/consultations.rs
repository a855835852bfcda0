use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::api::{Created, DataResponse};
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::{CreateConsultationInput, EntityKind, UpdateConsultationInput};
use crate::error::ApiError;

use super::ensure;

/// GET /consultations
pub async fn list_consultations(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store_for(&auth).await;
    ensure(&store, EntityKind::Consultation).await?;
    Ok(DataResponse::new(store.consultations_by_user(&auth.user_id)))
}

/// POST /consultations
pub async fn create_consultation(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Json(input): Json<CreateConsultationInput>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(user_id = %auth.user_id, "Booking consultation");

    let store = state.store_for(&auth).await;
    let consultation = store.create_consultation(input).await?;
    Ok(Created(consultation))
}

/// PATCH /consultations/:consultation_id
pub async fn update_consultation(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(consultation_id): Path<String>,
    Json(input): Json<UpdateConsultationInput>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store_for(&auth).await;
    let consultation = store.update_consultation(&consultation_id, input).await?;
    Ok(DataResponse::new(consultation))
}
