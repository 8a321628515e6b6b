use axum::{
    Router, middleware,
    routing::{delete, get, patch, post},
};

use crate::{
    AppState,
    handlers::{alerts, crisis, directory, instance, tickets},
    infra::identity::identity_middleware,
};

/// Create all v1 API routes
pub fn create_v1_router(_state: AppState) -> Router<AppState> {
    Router::new()
        // Public federation endpoints, called by peer instances
        .route("/instance/info", get(instance::instance_info))
        .route("/alerts/receive", post(alerts::receive_alert))
        .merge(create_protected_routes())
}

/// Routes that require an authenticated member
fn create_protected_routes() -> Router<AppState> {
    Router::new()
        // Crisis state machine
        .route("/communities/{id}/crisis/status", get(crisis::get_status))
        .route("/communities/{id}/crisis/toggle", post(crisis::toggle_mode))
        .route("/communities/{id}/crisis/vote", post(crisis::cast_vote))
        // Emergency tickets
        .route(
            "/communities/{id}/tickets",
            get(tickets::list_tickets).post(tickets::create_ticket),
        )
        .route(
            "/communities/{id}/tickets/triage",
            get(tickets::triage_queue),
        )
        .route(
            "/communities/{id}/tickets/{ticket_id}",
            get(tickets::get_ticket).patch(tickets::update_ticket),
        )
        .route(
            "/communities/{id}/tickets/{ticket_id}/comments",
            get(tickets::list_comments).post(tickets::add_comment),
        )
        // Federation directory
        .route(
            "/directory",
            get(directory::list_instances).post(directory::register_instance),
        )
        .route("/directory/refresh", post(directory::refresh_directory))
        .route("/directory/{id}", delete(directory::remove_instance))
        // Red Sky alerts
        .route("/alerts", get(alerts::list_alerts))
        .route("/alerts/send", post(alerts::send_alert))
        .route("/alerts/{id}/dismiss", patch(alerts::dismiss_alert))
        .route_layer(middleware::from_fn(identity_middleware))
}

#[cfg(test)]
mod tests {
    use redsky_core::api::routes::v1;

    /// The nested literals above must stay in step with the shared constants
    /// peers and clients build URLs from.
    #[test]
    fn shared_route_constants_live_under_the_versioned_root() {
        for path in [
            v1::crisis::STATUS,
            v1::crisis::TOGGLE,
            v1::crisis::VOTE,
            v1::tickets::COLLECTION,
            v1::tickets::TRIAGE,
            v1::tickets::ITEM,
            v1::tickets::COMMENTS,
            v1::directory::COLLECTION,
            v1::directory::ITEM,
            v1::directory::REFRESH,
            v1::alerts::COLLECTION,
            v1::alerts::SEND,
            v1::alerts::RECEIVE,
            v1::alerts::DISMISS,
            v1::instance::INFO,
        ] {
            assert!(path.starts_with(v1::ROOT), "{path}");
        }
    }
}
