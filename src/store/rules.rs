//! Status transition → notification mapping.
//!
//! Each rule names the entity kind and the status it moved into, who should
//! hear about it, and the text to show. `{subject}` in a description is
//! replaced with the entity's display subject (project title, milestone
//! title, consultation topic).

use chrono::Utc;
use uuid::Uuid;

use super::cache::{Cached, EntityCache};
use crate::domain::{
    Bid, BidInvitation, Consultation, Dispute, EntityKind, HasStatus, Milestone, Notification,
    NotificationType, Payment, Project,
};

/// Who receives a notification, resolved against the entity and the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    ProjectClient,
    ProjectFreelancer,
    BidFreelancer,
    InvitedFreelancer,
    Inviter,
    ConsultationClient,
    DisputeRaiser,
    Payee,
}

#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub kind: EntityKind,
    pub status: &'static str,
    pub audience: Audience,
    pub notification_type: NotificationType,
    pub title: &'static str,
    pub description: &'static str,
}

const fn rule(
    kind: EntityKind,
    status: &'static str,
    audience: Audience,
    notification_type: NotificationType,
    title: &'static str,
    description: &'static str,
) -> Rule {
    Rule {
        kind,
        status,
        audience,
        notification_type,
        title,
        description,
    }
}

use Audience::*;
use EntityKind as K;
use NotificationType as N;

#[rustfmt::skip]
pub static RULES: &[Rule] = &[
    // Projects
    rule(K::Project, "pending_review", ProjectClient, N::ProjectSubmitted,
        "Project submitted", "{subject} was submitted and is awaiting review"),
    rule(K::Project, "open", ProjectClient, N::ProjectApproved,
        "Project approved", "{subject} is now open for bids"),
    rule(K::Project, "assigned", ProjectClient, N::ProjectAssigned,
        "Freelancer assigned", "A freelancer has been assigned to {subject}"),
    rule(K::Project, "assigned", ProjectFreelancer, N::ProjectAssigned,
        "New project assignment", "You have been assigned to {subject}"),
    rule(K::Project, "in_progress", ProjectClient, N::ProjectStarted,
        "Project started", "Work on {subject} has started"),
    rule(K::Project, "completed", ProjectClient, N::ProjectCompleted,
        "Project completed", "{subject} has been completed"),
    rule(K::Project, "completed", ProjectFreelancer, N::ProjectCompleted,
        "Project completed", "{subject} has been marked as completed"),
    rule(K::Project, "cancelled", ProjectClient, N::ProjectCancelled,
        "Project cancelled", "{subject} has been cancelled"),
    rule(K::Project, "cancelled", ProjectFreelancer, N::ProjectCancelled,
        "Project cancelled", "{subject} has been cancelled"),
    // Milestones
    rule(K::Milestone, "submitted", ProjectClient, N::MilestoneSubmitted,
        "Milestone submitted", "{subject} was submitted for your approval"),
    rule(K::Milestone, "approved", ProjectFreelancer, N::MilestoneApproved,
        "Milestone approved", "{subject} was approved"),
    rule(K::Milestone, "rejected", ProjectFreelancer, N::MilestoneRejected,
        "Milestone needs changes", "{subject} was sent back for revisions"),
    // Bids
    rule(K::Bid, "shortlisted", BidFreelancer, N::BidShortlisted,
        "Bid shortlisted", "Your bid on {subject} was shortlisted"),
    rule(K::Bid, "accepted", BidFreelancer, N::BidAccepted,
        "Bid accepted", "Your bid on {subject} was accepted"),
    rule(K::Bid, "rejected", BidFreelancer, N::BidRejected,
        "Bid not selected", "Your bid on {subject} was not selected"),
    // Invitations
    rule(K::BidInvitation, "pending", InvitedFreelancer, N::BidInvitation,
        "Invitation to bid", "You have been invited to bid on {subject}"),
    rule(K::BidInvitation, "accepted", Inviter, N::InvitationAccepted,
        "Invitation accepted", "Your invitation to bid on {subject} was accepted"),
    rule(K::BidInvitation, "declined", Inviter, N::InvitationDeclined,
        "Invitation declined", "Your invitation to bid on {subject} was declined"),
    // Consultations
    rule(K::Consultation, "scheduled", ConsultationClient, N::ConsultationScheduled,
        "Consultation scheduled", "Your consultation about {subject} has been scheduled"),
    rule(K::Consultation, "completed", ConsultationClient, N::ConsultationCompleted,
        "Consultation completed", "Your consultation about {subject} is complete"),
    rule(K::Consultation, "cancelled", ConsultationClient, N::ConsultationCancelled,
        "Consultation cancelled", "Your consultation about {subject} was cancelled"),
    // Payments
    rule(K::Payment, "released", Payee, N::PaymentReleased,
        "Payment released", "A payment for {subject} has been released"),
    rule(K::Payment, "refunded", Payee, N::PaymentRefunded,
        "Payment refunded", "A payment for {subject} has been refunded"),
    // Disputes
    rule(K::Dispute, "under_review", DisputeRaiser, N::DisputeUnderReview,
        "Dispute under review", "Your dispute on {subject} is being reviewed"),
    rule(K::Dispute, "resolved", DisputeRaiser, N::DisputeResolved,
        "Dispute resolved", "Your dispute on {subject} has been resolved"),
    rule(K::Dispute, "closed", DisputeRaiser, N::DisputeClosed,
        "Dispute closed", "Your dispute on {subject} was closed"),
];

/// Entities whose status transitions produce notifications.
pub trait Notifiable: Cached + HasStatus {
    /// Owning project, used to resolve project audiences and subjects.
    fn project_id(&self) -> Option<&str>;

    /// Recipients carried directly on the entity.
    fn party(&self, _audience: Audience) -> Option<&str> {
        None
    }

    fn subject(&self, cache: &EntityCache) -> String {
        self.project_id()
            .and_then(|id| cache.find::<Project>(id))
            .map(|p| p.title.clone())
            .unwrap_or_else(|| "your project".to_string())
    }

    fn link(&self) -> String {
        match self.project_id() {
            Some(project_id) => format!("/projects/{}", project_id),
            None => format!("{}/{}", Self::KIND.path(), self.id()),
        }
    }

    fn recipient(&self, audience: Audience, cache: &EntityCache) -> Option<String> {
        if let Some(user) = self.party(audience) {
            return Some(user.to_string());
        }
        let project = cache.find::<Project>(self.project_id()?)?;
        match audience {
            ProjectClient => Some(project.client_id.clone()),
            ProjectFreelancer => project.freelancer_id.clone(),
            _ => None,
        }
    }
}

impl Notifiable for Project {
    fn project_id(&self) -> Option<&str> {
        Some(&self.id)
    }

    fn party(&self, audience: Audience) -> Option<&str> {
        match audience {
            ProjectClient => Some(&self.client_id),
            ProjectFreelancer => self.freelancer_id.as_deref(),
            _ => None,
        }
    }

    fn subject(&self, _cache: &EntityCache) -> String {
        self.title.clone()
    }
}

impl Notifiable for Milestone {
    fn project_id(&self) -> Option<&str> {
        Some(&self.project_id)
    }

    fn subject(&self, _cache: &EntityCache) -> String {
        self.title.clone()
    }
}

impl Notifiable for Bid {
    fn project_id(&self) -> Option<&str> {
        Some(&self.project_id)
    }

    fn party(&self, audience: Audience) -> Option<&str> {
        match audience {
            BidFreelancer => Some(&self.freelancer_id),
            _ => None,
        }
    }
}

impl Notifiable for BidInvitation {
    fn project_id(&self) -> Option<&str> {
        Some(&self.project_id)
    }

    fn party(&self, audience: Audience) -> Option<&str> {
        match audience {
            InvitedFreelancer => Some(&self.freelancer_id),
            Inviter => Some(&self.invited_by),
            _ => None,
        }
    }
}

impl Notifiable for Consultation {
    fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    fn party(&self, audience: Audience) -> Option<&str> {
        match audience {
            ConsultationClient => Some(&self.client_id),
            _ => None,
        }
    }

    fn subject(&self, _cache: &EntityCache) -> String {
        self.topic.clone()
    }

    fn link(&self) -> String {
        format!("/consultations/{}", self.id)
    }
}

impl Notifiable for Payment {
    fn project_id(&self) -> Option<&str> {
        Some(&self.project_id)
    }

    fn party(&self, audience: Audience) -> Option<&str> {
        match audience {
            Payee => self.payee_id.as_deref(),
            _ => None,
        }
    }
}

impl Notifiable for Dispute {
    fn project_id(&self) -> Option<&str> {
        Some(&self.project_id)
    }

    fn party(&self, audience: Audience) -> Option<&str> {
        match audience {
            DisputeRaiser => Some(&self.raised_by),
            _ => None,
        }
    }
}

/// Notifications owed for `entity` having moved out of `previous` status.
///
/// Nothing is produced when the status did not change. Pass `None` for a
/// freshly created entity.
pub fn notifications_for<T: Notifiable>(
    entity: &T,
    previous: Option<&'static str>,
    cache: &EntityCache,
) -> Vec<Notification> {
    let status = entity.status_key();
    if previous == Some(status) {
        return Vec::new();
    }

    let now = Utc::now();
    RULES
        .iter()
        .filter(|r| r.kind == T::KIND && r.status == status)
        .filter_map(|r| {
            let Some(user_id) = entity.recipient(r.audience, cache) else {
                tracing::debug!(kind = %T::KIND, status, audience = ?r.audience, "No recipient for notification rule");
                return None;
            };
            Some(Notification {
                id: Uuid::new_v4().to_string(),
                user_id,
                notification_type: r.notification_type,
                title: r.title.to_string(),
                description: Some(r.description.replace("{subject}", &entity.subject(cache))),
                link: Some(entity.link()),
                read: false,
                created_at: Some(now),
            })
        })
        .collect()
}
