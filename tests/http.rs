mod common;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::Value;
use tower::ServiceExt;

use block_scheduler::config::SolverConfig;
use block_scheduler::data::SchedulingInput;
use block_scheduler::server::router;
use common::*;

async fn post(path: &str, input: &SchedulingInput) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(input).unwrap()))
        .unwrap();

    let response = router(SolverConfig::default()).oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

#[tokio::test]
async fn solve_returns_placed_assignments() {
    let input = school(vec![
        in_room(taught(block("a", "g1", "math", 2), "t1"), "A1"),
        in_room(taught(block("b", "g2", "math", 1), "t1"), "A1"),
    ]);

    let (status, body) = post("/v1/schedule/solve", &input).await;
    assert_eq!(status, StatusCode::OK);

    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["feasible"], Value::Bool(true));
    assert_eq!(json["score"]["hard"], 0);
    assert!(
        json["assignments"]
            .as_array()
            .unwrap()
            .iter()
            .all(|a| a["timeslotId"].is_string())
    );
    assert_eq!(json["constraints"].as_array().unwrap().len(), 12);
    assert_eq!(json["defragmentation"]["total"], 0);
}

#[tokio::test]
async fn analyze_keeps_the_schedule_as_given() {
    let input = school(vec![at(block("a", "g1", "prog", 2), "Lun-13-2")]);

    let (status, body) = post("/v1/schedule/analyze", &input).await;
    assert_eq!(status, StatusCode::OK);

    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["assignments"][0]["timeslotId"], "Lun-13-2");
    assert_eq!(json["feasible"], Value::Bool(false));
    assert!(json.get("defragmentation").is_none());
}

#[tokio::test]
async fn defragment_reports_the_repair() {
    let input = school(vec![at(block("a", "g1", "math", 2), "Lun-8-1")]);

    let (status, body) = post("/v1/schedule/defragment", &input).await;
    assert_eq!(status, StatusCode::OK);

    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["defragmentation"]["fixed"], 1);
    assert_eq!(json["assignments"][0]["timeslotId"], "Lun-7-2");
    assert_eq!(json["diagnostics"]["lengthMismatches"], Value::Array(vec![]));
}

#[tokio::test]
async fn unknown_reference_is_a_bad_request() {
    let input = school(vec![block("a", "g1", "history", 1)]);

    let (status, body) = post("/v1/schedule/solve", &input).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        String::from_utf8(body).unwrap(),
        "assignment 'a' references unknown course 'history'"
    );
}
