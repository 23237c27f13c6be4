//! Route definitions for the `/admin` resource tree.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{auth, qr, qualification, question, ranking_points, session, venue};
use crate::state::AppState;

/// Routes mounted at `/admin`. Everything but `/login` requires the admin role.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::admin_login))
        .route("/venues", get(venue::list).post(venue::create))
        .route("/venues/{id}", put(venue::update))
        .route("/sessions", get(session::list))
        .route("/sessions/bulk", post(session::bulk_create))
        .route("/sessions/{id}", get(session::get_by_id))
        .route("/sessions/{id}/status", put(session::update_status))
        .route("/sessions/{id}/results", get(session::results))
        .route("/sessions/{id}/qualifications", get(session::qualifications))
        .route("/qr", get(qr::issue))
        .route("/qr/list", get(qr::list_active))
        .route("/qr/deactivate", post(qr::deactivate))
        .route("/questions", get(question::list).post(question::create))
        .route(
            "/questions/{id}",
            put(question::update).delete(question::delete),
        )
        .route("/ranking-points", get(ranking_points::list))
        .route("/ranking-points/{level}", put(ranking_points::upsert))
        .route("/qualifications/{id}/approve", post(qualification::approve))
}
