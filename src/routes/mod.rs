pub mod bids;
pub mod consultations;
pub mod directory;
pub mod disputes;
pub mod health;
pub mod invitations;
pub mod me;
pub mod messages;
pub mod milestones;
pub mod notifications;
pub mod payments;
pub mod projects;
pub mod realtime;

use axum::{
    routing::{get, patch, post, put},
    Router,
};
use std::sync::Arc;

use crate::app::AppState;
use crate::domain::EntityKind;
use crate::error::ApiResult;
use crate::store::DataStore;

/// Build the API router with all routes
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Public routes
        .route("/health", get(health::health_check))
        // Session
        .route("/me", get(me::get_me))
        .route("/session/refresh", post(me::refresh_session))
        .route("/session", axum::routing::delete(me::end_session))
        // Projects
        .route(
            "/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route(
            "/projects/:project_id",
            get(projects::get_project)
                .patch(projects::update_project)
                .delete(projects::delete_project),
        )
        // Milestones
        .route(
            "/projects/:project_id/milestones",
            get(milestones::list_milestones).post(milestones::create_milestone),
        )
        .route(
            "/milestones/:milestone_id",
            patch(milestones::update_milestone).delete(milestones::delete_milestone),
        )
        // Bids
        .route(
            "/projects/:project_id/bids",
            get(bids::list_bids).post(bids::create_bid),
        )
        .route("/bids/mine", get(bids::my_bids))
        .route("/bids/:bid_id", patch(bids::update_bid))
        .route("/bids/:bid_id/accept", post(bids::accept_bid))
        // Invitations
        .route(
            "/projects/:project_id/invitations",
            get(invitations::list_invitations).post(invitations::create_invitation),
        )
        .route("/invitations/mine", get(invitations::my_invitations))
        .route(
            "/invitations/:invitation_id",
            patch(invitations::respond_to_invitation),
        )
        // Consultations
        .route(
            "/consultations",
            get(consultations::list_consultations).post(consultations::create_consultation),
        )
        .route(
            "/consultations/:consultation_id",
            patch(consultations::update_consultation),
        )
        // Payments
        .route(
            "/projects/:project_id/payments",
            get(payments::list_payments),
        )
        .route("/payments", post(payments::create_payment))
        .route("/payments/:payment_id", patch(payments::update_payment))
        // Disputes
        .route(
            "/disputes",
            get(disputes::list_disputes).post(disputes::create_dispute),
        )
        .route("/disputes/:dispute_id", patch(disputes::update_dispute))
        // Messaging
        .route(
            "/conversations",
            get(messages::list_conversations).post(messages::create_conversation),
        )
        .route(
            "/conversations/:conversation_id/messages",
            get(messages::list_messages).post(messages::send_message),
        )
        // Notifications
        .route("/notifications", get(notifications::list_notifications))
        .route(
            "/notifications/unread-count",
            get(notifications::get_unread_count),
        )
        .route(
            "/notifications/read-all",
            put(notifications::mark_all_as_read),
        )
        .route(
            "/notifications/:notification_id/read",
            put(notifications::mark_as_read),
        )
        // Directory
        .route("/freelancers", get(directory::list_freelancers))
        .route("/freelancers/:freelancer_id", get(directory::get_freelancer))
        .route("/clients", get(directory::list_clients))
        .route("/clients/:client_id", get(directory::get_client))
        // Realtime
        .route("/ws", get(realtime::socket))
}

/// Make sure `kind` is loaded. When the fetch fails but data for the kind is
/// already cached, the stale data is served instead of the error.
pub(crate) async fn ensure(store: &DataStore, kind: EntityKind) -> ApiResult<()> {
    match store.ensure_loaded(kind).await {
        Ok(()) => Ok(()),
        Err(e) if store.has_cached(kind) => {
            tracing::warn!(kind = %kind, error = %e, "Serving cached data after failed load");
            Ok(())
        }
        Err(e) => Err(e),
    }
}
