use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::api::{Created, DataResponse, NoContent};
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::{CreateMilestoneInput, EntityKind, UpdateMilestoneInput};
use crate::error::ApiError;

use super::ensure;

/// GET /projects/:project_id/milestones
///
/// Milestones arrive embedded in the project list, so loading projects is
/// enough to answer this.
pub async fn list_milestones(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(project_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store_for(&auth).await;
    ensure(&store, EntityKind::Project).await?;
    Ok(DataResponse::new(store.milestones_by_project(&project_id)))
}

/// POST /projects/:project_id/milestones
pub async fn create_milestone(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(project_id): Path<String>,
    Json(mut input): Json<CreateMilestoneInput>,
) -> Result<impl IntoResponse, ApiError> {
    input.project_id = project_id;
    tracing::info!(user_id = %auth.user_id, project_id = %input.project_id, "Creating milestone");

    let store = state.store_for(&auth).await;
    ensure(&store, EntityKind::Project).await?;
    let milestone = store.create_milestone(input).await?;
    Ok(Created(milestone))
}

/// PATCH /milestones/:milestone_id
pub async fn update_milestone(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(milestone_id): Path<String>,
    Json(input): Json<UpdateMilestoneInput>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(user_id = %auth.user_id, milestone_id = %milestone_id, "Updating milestone");

    let store = state.store_for(&auth).await;
    let milestone = store.update_milestone(&milestone_id, input).await?;
    Ok(DataResponse::new(milestone))
}

/// DELETE /milestones/:milestone_id
pub async fn delete_milestone(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(milestone_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store_for(&auth).await;
    store.delete_milestone(&milestone_id).await?;
    Ok(NoContent)
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
    async fn lists_embedded_milestones_in_order() {
        let backend = Arc::new(FakeBackend::new());
        backend.seed(
            "/projects",
            vec![json!({
                "id": "p1",
                "client_id": "c1",
                "title": "Portal",
                "client_budget": 100000,
                "milestones": [
                    { "id": "m1", "title": "Design", "amount": 30000 },
                    { "id": "m2", "title": "Build", "amount": 70000 }
                ]
            })],
        );
        let (app, _) = test_app(backend);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/projects/p1/milestones")
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
        let titles: Vec<_> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["title"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(titles, vec!["Design", "Build"]);
        assert_eq!(body["data"][1]["project_id"], "p1");
    }
}
