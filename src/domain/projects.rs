use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{de, Entity, EntityKind, HasStatus, Milestone};

/// Project status enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Draft,
    PendingReview,
    Open,
    Assigned,
    InProgress,
    Completed,
    Cancelled,
    OnHold,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingReview => "pending_review",
            Self::Open => "open",
            Self::Assigned => "assigned",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::OnHold => "on_hold",
        }
    }
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Project entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    #[serde(alias = "_id", deserialize_with = "de::id")]
    pub id: String,
    #[serde(alias = "clientId", deserialize_with = "de::id")]
    pub client_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(alias = "clientBudget", deserialize_with = "de::amount")]
    pub client_budget: i64,
    #[serde(default, alias = "freelancerBudget", deserialize_with = "de::opt_amount")]
    pub freelancer_budget: Option<i64>,
    #[serde(default, alias = "freelancerId", deserialize_with = "de::opt_id")]
    pub freelancer_id: Option<String>,
    #[serde(default, alias = "agentId", deserialize_with = "de::opt_id")]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "updatedAt")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Milestones embedded by the list endpoint; detached into the flat
    /// milestone list before caching.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub milestones: Vec<Milestone>,
}

impl Project {
    /// Platform revenue: client-facing minus freelancer-facing budget.
    pub fn margin(&self) -> Option<i64> {
        self.freelancer_budget
            .map(|freelancer| self.client_budget - freelancer)
    }

    /// Whether `user_id` is the client, assigned freelancer or agent.
    pub fn involves(&self, user_id: &str) -> bool {
        self.client_id == user_id
            || self.freelancer_id.as_deref() == Some(user_id)
            || self.agent_id.as_deref() == Some(user_id)
    }

    /// Remove embedded milestones, stamping each with this project's id when
    /// missing and its position in the array as `order`.
    pub fn detach_milestones(&mut self) -> Vec<Milestone> {
        let mut milestones = std::mem::take(&mut self.milestones);
        for (index, milestone) in milestones.iter_mut().enumerate() {
            if milestone.project_id.is_empty() {
                milestone.project_id = self.id.clone();
            }
            milestone.order = index as u32;
        }
        milestones
    }
}

impl Entity for Project {
    const KIND: EntityKind = EntityKind::Project;

    fn id(&self) -> &str {
        &self.id
    }
}

impl HasStatus for Project {
    fn status_key(&self) -> &'static str {
        self.status.as_str()
    }
}

/// Request DTO for creating a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProjectInput {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    pub client_budget: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    /// Filled from the session when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
}

/// Request DTO for updating a project
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProjectInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_budget: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freelancer_budget: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freelancer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_backend_shapes() {
        let project: Project = serde_json::from_value(serde_json::json!({
            "_id": 7,
            "clientId": "c1",
            "title": "Mobile app",
            "clientBudget": "100000",
            "freelancerBudget": 80000,
            "status": "open",
            "milestones": [
                { "_id": "m1", "title": "Design", "amount": 40000 },
                { "_id": "m2", "title": "Build", "amount": 60000 }
            ]
        }))
        .unwrap();

        assert_eq!(project.id, "7");
        assert_eq!(project.client_budget, 100_000);
        assert_eq!(project.margin(), Some(20_000));
        assert_eq!(project.status, ProjectStatus::Open);
        assert_eq!(project.milestones.len(), 2);
    }

    #[test]
    fn detach_milestones_assigns_order_and_parent() {
        let mut project: Project = serde_json::from_value(serde_json::json!({
            "id": "p1",
            "client_id": "c1",
            "title": "Site",
            "client_budget": 5000,
            "milestones": [
                { "id": "m2", "title": "Second", "amount": 1 },
                { "id": "m1", "title": "First", "amount": 1, "project_id": "other" }
            ]
        }))
        .unwrap();

        let milestones = project.detach_milestones();
        assert!(project.milestones.is_empty());
        assert_eq!(milestones[0].id, "m2");
        assert_eq!(milestones[0].order, 0);
        assert_eq!(milestones[0].project_id, "p1");
        assert_eq!(milestones[1].order, 1);
        assert_eq!(milestones[1].project_id, "other");
    }

    #[test]
    fn involves_matches_every_party() {
        let project: Project = serde_json::from_value(serde_json::json!({
            "id": "p1",
            "client_id": "c1",
            "freelancer_id": "f1",
            "agent_id": "a1",
            "title": "Site",
            "client_budget": 5000
        }))
        .unwrap();

        assert!(project.involves("c1"));
        assert!(project.involves("f1"));
        assert!(project.involves("a1"));
        assert!(!project.involves("someone"));
        assert_eq!(project.margin(), None);
    }
}
