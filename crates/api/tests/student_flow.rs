//! End-to-end student flow over HTTP: QR join, survey, scoring,
//! qualification approval and booking.

mod common;

use axum::http::StatusCode;
use axum::Router;
use common::{
    admin_token, assert_error, body_json, create_admin, create_student, get_auth, post_json_auth,
    student_token,
};
use gd_core::types::DbId;
use serde_json::{json, Value};
use sqlx::PgPool;

async fn create_venue(app: &Router, token: &str, capacity: i32) -> DbId {
    let body = json!({ "name": "Seminar Room", "capacity": capacity, "level": 1 });
    let response = post_json_auth(app, "/admin/venues", token, body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

async fn issue_qr(app: &Router, token: &str, venue_id: DbId, max_capacity: i32) -> String {
    let uri = format!("/admin/qr?venue_id={venue_id}&max_capacity={max_capacity}");
    let response = get_auth(app, &uri, token).await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["data"]["qr_data"]
        .as_str()
        .unwrap()
        .to_string()
}

async fn join(app: &Router, token: &str, qr_data: &str) -> axum::response::Response {
    post_json_auth(app, "/student/sessions/join", token, json!({ "qr_data": qr_data })).await
}

/// The same two-student ranking for each of the five fallback questions.
fn final_ranking(session_id: DbId, first: DbId, second: DbId) -> Value {
    let ranks = json!({ "1": first, "2": second });
    let responses: serde_json::Map<String, Value> =
        (1..=5).map(|q| (q.to_string(), ranks.clone())).collect();
    json!({ "session_id": session_id, "responses": responses, "is_final": true })
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_full_session_flow(pool: PgPool) {
    create_admin(&pool, "proctor").await;
    let a = create_student(&pool, "R001", 1).await;
    let b = create_student(&pool, "R002", 1).await;
    let c = create_student(&pool, "R003", 1).await;
    create_student(&pool, "R004", 1).await;
    let app = common::build_test_app(pool);

    let admin = admin_token(&app, "proctor").await;
    let venue_id = create_venue(&app, &admin, 3).await;
    let qr_data = issue_qr(&app, &admin, venue_id, 3).await;

    let token_a = student_token(&app, "R001").await;
    let token_b = student_token(&app, "R002").await;
    let token_c = student_token(&app, "R003").await;
    let token_d = student_token(&app, "R004").await;

    // --- Join ---
    let response = join(&app, &token_a, &qr_data).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let session_id = json["data"]["session_id"].as_i64().unwrap();
    assert_eq!(json["data"]["status"], "active");

    for token in [&token_b, &token_c, &token_a] {
        let response = join(&app, token, &qr_data).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["data"]["session_id"], session_id);
    }

    let response = join(&app, &token_d, &qr_data).await;
    assert_error(response, StatusCode::FORBIDDEN).await;

    let uri = format!("/student/session/participants?session_id={session_id}");
    let response = get_auth(&app, &uri, &token_a).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 3);
    assert!(json["data"].as_array().unwrap().iter().all(|p| p["phase"] == "prep"));

    let response = get_auth(&app, &uri, &token_d).await;
    assert_error(response, StatusCode::FORBIDDEN).await;

    let body = json!({ "session_id": session_id, "phase": "survey" });
    let response = post_json_auth(&app, "/student/session/phase", &token_a, body).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // --- Survey ---
    let uri = format!("/student/questions?session_id={session_id}");
    let response = get_auth(&app, &uri, &token_a).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 5);

    let body = json!({
        "session_id": session_id,
        "responses": { "1": { "1": b } },
        "is_partial": true,
        "is_final": true
    });
    let response = post_json_auth(&app, "/student/survey", &token_a, body).await;
    assert_error(response, StatusCode::BAD_REQUEST).await;

    let body = final_ranking(session_id, b, c);
    let response = post_json_auth(&app, "/student/survey", &token_a, body).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["questions_saved"], 5);
    assert_eq!(json["data"]["finalized"], false);

    let uri = format!("/student/survey/completion?session_id={session_id}");
    let response = get_auth(&app, &uri, &token_a).await;
    assert_eq!(body_json(response).await["data"]["completed"], true);

    let body = final_ranking(session_id, a, c);
    let response = post_json_auth(&app, "/student/survey", &token_b, body).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = final_ranking(session_id, a, b);
    let response = post_json_auth(&app, "/student/survey", &token_c, body).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["finalized"], true);

    // --- Results ---
    let uri = format!("/admin/sessions/{session_id}/results");
    let response = get_auth(&app, &uri, &admin).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "completed");
    let order: Vec<DbId> = json["data"]["ranking"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["student_id"].as_i64().unwrap())
        .collect();
    assert_eq!(order, vec![a, b, c]);
    assert!(json["data"]["disqualified"].as_array().unwrap().is_empty());
    assert!(json["data"]["biased_responders"].as_array().unwrap().is_empty());

    let uri = format!("/student/results?session_id={session_id}");
    let response = get_auth(&app, &uri, &token_b).await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["position"], 2);
    assert_eq!(json["data"]["participant_count"], 3);
    assert_eq!(json["data"]["disqualified"], false);

    // --- Qualification ---
    let uri = format!("/admin/sessions/{session_id}/qualifications");
    let response = get_auth(&app, &uri, &admin).await;
    let json = body_json(response).await;
    let quals = json["data"].as_array().unwrap();
    assert_eq!(quals.len(), 3);
    let qual_a = quals
        .iter()
        .find(|q| q["student_id"] == a)
        .expect("A qualified");
    assert_eq!(qual_a["qualified_for_level"], 2);
    let qual_id = qual_a["id"].as_i64().unwrap();

    let response = get_auth(&app, "/student/profile", &token_a).await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["progress"]["pending_qualification_id"], qual_id);

    let uri = format!("/admin/qualifications/{qual_id}/approve");
    let body = json!({ "feedback": "Strong opener" });
    let response = post_json_auth(&app, &uri, &admin, body.clone()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["is_approved"], true);

    let response = get_auth(&app, "/student/profile", &token_a).await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["current_gd_level"], 2);
    assert_eq!(json["data"]["progress"]["highest_approved_level"], 2);

    let response = post_json_auth(&app, &uri, &admin, body).await;
    assert_error(response, StatusCode::CONFLICT).await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_booking_and_cancellation(pool: PgPool) {
    create_admin(&pool, "proctor").await;
    create_student(&pool, "R100", 1).await;
    create_student(&pool, "R200", 2).await;
    let app = common::build_test_app(pool);

    let admin = admin_token(&app, "proctor").await;
    let venue_id = create_venue(&app, &admin, 4).await;
    let student = student_token(&app, "R100").await;
    let senior = student_token(&app, "R200").await;
    let body = json!({ "venue_id": venue_id });

    let response = get_auth(&app, "/student/sessions", &student).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_json_auth(&app, "/student/sessions/book", &student, body.clone()).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["data"]["status"], "pending");

    let response = post_json_auth(&app, "/student/sessions/book", &student, body.clone()).await;
    assert_error(response, StatusCode::CONFLICT).await;

    let response = post_json_auth(&app, "/student/sessions/book", &senior, body.clone()).await;
    assert_error(response, StatusCode::FORBIDDEN).await;

    let response = post_json_auth(&app, "/student/sessions/cancel", &student, body.clone()).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = post_json_auth(&app, "/student/sessions/cancel", &student, body).await;
    assert_error(response, StatusCode::NOT_FOUND).await;
}
