pub mod admin;
pub mod health;
pub mod student;

use axum::Router;

use crate::state::AppState;

/// Build the API route tree.
///
/// ```text
/// /admin/login                                 admin login (public)
/// /admin/venues                                list, create
/// /admin/venues/{id}                           update
/// /admin/sessions                              list (?venue_id=&status=)
/// /admin/sessions/bulk                         bulk create (POST)
/// /admin/sessions/{id}                         get
/// /admin/sessions/{id}/status                  status change (PUT)
/// /admin/sessions/{id}/results                 live scoring
/// /admin/sessions/{id}/qualifications          qualifications of the session
/// /admin/qr                                    issue (?venue_id=&validity=&max_capacity=)
/// /admin/qr/list                               active tokens (?venue_id=)
/// /admin/qr/deactivate                         deactivate (POST ?qr_id=)
/// /admin/questions                             list, create
/// /admin/questions/{id}                        update, delete
/// /admin/ranking-points                        list
/// /admin/ranking-points/{level}                upsert (PUT)
/// /admin/qualifications/{id}/approve           approve (POST)
///
/// /student/login                               student login (public)
/// /student/profile                             profile + level progress
/// /student/sessions                            open sessions (?level=)
/// /student/sessions/book                       book (POST)
/// /student/sessions/cancel                     cancel booking (POST)
/// /student/sessions/join                       join by QR (POST)
/// /student/session                             details (?session_id=)
/// /student/session/participants                present peers (?session_id=)
/// /student/session/phase                       phase heartbeat (POST)
/// /student/questions                           survey questions (?session_id=&level=)
/// /student/survey                              submit (POST)
/// /student/survey/completion                   completion status (?session_id=)
/// /student/survey/timer/start                  start timer (POST)
/// /student/survey/timer                        check timer (?session_id=&scope=)
/// /student/survey/penalty                      apply timeout penalty (POST)
/// /student/results                             own result (?session_id=)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/admin", admin::router())
        .nest("/student", student::router())
}
