//! Route definitions for the `/student` resource tree.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{auth, student, survey};
use crate::state::AppState;

/// Routes mounted at `/student`. Everything but `/login` requires the student role.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::student_login))
        .route("/profile", get(student::profile))
        .route("/sessions", get(student::list_sessions))
        .route("/sessions/book", post(student::book))
        .route("/sessions/cancel", post(student::cancel))
        .route("/sessions/join", post(student::join))
        .route("/session", get(student::session_details))
        .route("/session/participants", get(student::participants))
        .route("/session/phase", post(student::record_phase))
        .route("/questions", get(survey::questions))
        .route("/survey", post(survey::submit))
        .route("/survey/completion", get(survey::completion))
        .route("/survey/timer/start", post(survey::start_timer))
        .route("/survey/timer", get(survey::check_timer))
        .route("/survey/penalty", post(survey::apply_penalty))
        .route("/results", get(student::results))
}
