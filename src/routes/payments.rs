use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::api::{Created, DataResponse};
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::{CreatePaymentInput, EntityKind, UpdatePaymentInput};
use crate::error::ApiError;

use super::ensure;

/// GET /projects/:project_id/payments
pub async fn list_payments(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(project_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store_for(&auth).await;
    ensure(&store, EntityKind::Payment).await?;
    Ok(DataResponse::new(store.payments_by_project(&project_id)))
}

/// POST /payments
pub async fn create_payment(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Json(input): Json<CreatePaymentInput>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(user_id = %auth.user_id, project_id = %input.project_id, "Recording payment");

    let store = state.store_for(&auth).await;
    ensure(&store, EntityKind::Project).await?;
    let payment = store.create_payment(input).await?;
    Ok(Created(payment))
}

/// PATCH /payments/:payment_id
pub async fn update_payment(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(payment_id): Path<String>,
    Json(input): Json<UpdatePaymentInput>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store_for(&auth).await;
    ensure(&store, EntityKind::Project).await?;
    let payment = store.update_payment(&payment_id, input).await?;
    Ok(DataResponse::new(payment))
}
