use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::DataResponse;
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::EntityKind;
use crate::error::ApiError;

use super::ensure;

#[derive(Debug, Default, Deserialize)]
pub struct FreelancerQuery {
    /// Case-insensitive skill match
    pub skill: Option<String>,
}

/// GET /freelancers
pub async fn list_freelancers(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Query(query): Query<FreelancerQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store_for(&auth).await;
    ensure(&store, EntityKind::Freelancer).await?;

    let mut freelancers = store.freelancers();
    if let Some(skill) = query.skill.filter(|s| !s.trim().is_empty()) {
        freelancers.retain(|f| f.skills.iter().any(|s| s.eq_ignore_ascii_case(skill.trim())));
    }
    Ok(DataResponse::new(freelancers))
}

/// GET /freelancers/:freelancer_id
pub async fn get_freelancer(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(freelancer_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store_for(&auth).await;
    ensure(&store, EntityKind::Freelancer).await?;

    let freelancer = store
        .freelancer(&freelancer_id)
        .ok_or_else(|| ApiError::not_found("Freelancer not found"))?;
    Ok(DataResponse::new(freelancer))
}

/// GET /clients
pub async fn list_clients(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store_for(&auth).await;
    ensure(&store, EntityKind::Client).await?;
    Ok(DataResponse::new(store.clients()))
}

/// GET /clients/:client_id
pub async fn get_client(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(client_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store_for(&auth).await;
    ensure(&store, EntityKind::Client).await?;

    let client = store
        .client(&client_id)
        .ok_or_else(|| ApiError::not_found("Client not found"))?;
    Ok(DataResponse::new(client))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::auth::jwt::test_tokens::mint;
    use crate::testing::{test_app, FakeBackend};

    #[tokio::test]
    async fn filters_freelancers_by_skill() {
        let backend = Arc::new(FakeBackend::new());
        backend.seed(
            "/freelancers",
            vec![
                json!({ "id": "f1", "name": "Ada", "skills": ["Rust", "Go"] }),
                json!({ "id": "f2", "name": "Lin", "skills": ["Design"] }),
            ],
        );
        let (app, _) = test_app(backend);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/freelancers?skill=rust")
                    .header(
                        header::AUTHORIZATION,
                        format!("Bearer {}", mint("c1", "client", None, 600)),
                    )
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["id"], "f1");
    }
}
