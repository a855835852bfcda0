use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::{Created, DataResponse, NoContent};
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::{CreateProjectInput, EntityKind, Project, UpdateProjectInput};
use crate::error::ApiError;

use super::ensure;

/// Project with the platform margin, shown to staff only
#[derive(Debug, Serialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProjectListQuery {
    /// Only projects the caller is a party to
    #[serde(default)]
    pub mine: bool,
}

/// GET /projects
pub async fn list_projects(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Query(query): Query<ProjectListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store_for(&auth).await;
    ensure(&store, EntityKind::Project).await?;

    let projects = if query.mine {
        store.get_projects_by_user(&auth.user_id)
    } else {
        store.projects()
    };
    Ok(DataResponse::new(projects))
}

/// POST /projects
pub async fn create_project(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Json(input): Json<CreateProjectInput>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(user_id = %auth.user_id, title = %input.title, "Creating project");

    let store = state.store_for(&auth).await;
    let project = store.create_project(input).await?;
    Ok(Created(project))
}

/// GET /projects/:project_id
pub async fn get_project(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(project_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store_for(&auth).await;
    ensure(&store, EntityKind::Project).await?;

    let project = store
        .project(&project_id)
        .ok_or_else(|| ApiError::not_found("Project not found"))?;
    let margin = if auth.role.is_staff() {
        project.margin()
    } else {
        None
    };
    Ok(DataResponse::new(ProjectDetail { project, margin }))
}

/// PATCH /projects/:project_id
pub async fn update_project(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(project_id): Path<String>,
    Json(input): Json<UpdateProjectInput>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(user_id = %auth.user_id, project_id = %project_id, "Updating project");

    let store = state.store_for(&auth).await;
    let project = store.update_project(&project_id, input).await?;
    Ok(DataResponse::new(project))
}

/// DELETE /projects/:project_id
pub async fn delete_project(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(project_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(user_id = %auth.user_id, project_id = %project_id, "Deleting project");

    let store = state.store_for(&auth).await;
    store.delete_project(&project_id).await?;
    Ok(NoContent)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Request},
        Router,
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::auth::jwt::test_tokens::mint;
    use crate::testing::{test_app, FakeBackend};

    async fn get_project(app: &Router, user: &str, role: &str) -> Value {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/projects/p1")
                    .header(
                        header::AUTHORIZATION,
                        format!("Bearer {}", mint(user, role, None, 600)),
                    )
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn margin_is_visible_to_staff_only() {
        let backend = Arc::new(FakeBackend::new());
        backend.seed(
            "/projects",
            vec![json!({
                "id": "p1",
                "client_id": "c1",
                "title": "Portal",
                "client_budget": 100000,
                "freelancer_budget": 70000,
                "freelancer_id": "f2",
                "status": "assigned"
            })],
        );
        let (app, _) = test_app(backend);

        let body = get_project(&app, "a1", "admin").await;
        assert_eq!(body["data"]["title"], "Portal");
        assert_eq!(body["data"]["margin"], 30000);

        let body = get_project(&app, "c1", "client").await;
        assert_eq!(body["data"]["title"], "Portal");
        assert!(body["data"].get("margin").is_none());
    }
}
