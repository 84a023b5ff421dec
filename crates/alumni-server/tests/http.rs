use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use alumni_db::Database;

const SECRET: &str = "test-secret";

fn app() -> (Router, Arc<Database>) {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let state = alumni_server::build_state(db.clone(), SECRET.to_string());
    (alumni_server::router(state), db)
}

async fn call(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
        Some(body) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn register(app: &Router, rollno: &str, username: &str) -> StatusCode {
    let body = json!({
        "rollno": rollno,
        "fullname": format!("{username} fullname"),
        "username": username,
        "password": "correct horse",
    });
    call(app, "POST", "/auth/register", None, Some(body)).await.0
}

async fn login(app: &Router, username: &str) -> String {
    let body = json!({ "username": username, "password": "correct horse" });
    let (status, value) = call(app, "POST", "/auth/login", None, Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    value["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn register_login_and_profile() {
    let (app, _db) = app();
    assert_eq!(register(&app, "21CS001", "alice").await, StatusCode::CREATED);

    let token = login(&app, "alice").await;
    let (status, me) = call(&app, "GET", "/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me, json!({ "rollno": "21CS001", "fullname": "alice fullname", "username": "alice" }));
    assert!(me.get("password").is_none());
}

#[tokio::test]
async fn duplicate_registrations_are_rejected() {
    let (app, db) = app();
    assert_eq!(register(&app, "21CS001", "alice").await, StatusCode::CREATED);
    assert_eq!(register(&app, "21CS002", "alice").await, StatusCode::CONFLICT);
    assert_eq!(register(&app, "21CS001", "alicia").await, StatusCode::CONFLICT);
    assert_eq!(db.count_users().unwrap(), 1);
}

#[tokio::test]
async fn incomplete_registration_is_bad_request() {
    let (app, db) = app();
    let body = json!({ "rollno": "", "fullname": "x", "username": "x", "password": "pw" });
    let (status, _) = call(&app, "POST", "/auth/register", None, Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(db.count_users().unwrap(), 0);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let (app, _db) = app();
    register(&app, "21CS001", "alice").await;

    let body = json!({ "username": "alice", "password": "wrong" });
    let (status, _) = call(&app, "POST", "/auth/login", None, Some(body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let body = json!({ "username": "nobody", "password": "correct horse" });
    let (status, _) = call(&app, "POST", "/auth/login", None, Some(body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn directory_requires_a_session() {
    let (app, _db) = app();
    register(&app, "21CS001", "alice").await;
    register(&app, "21CS002", "bob").await;

    let (status, _) = call(&app, "GET", "/directory", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = login(&app, "alice").await;
    let (status, entries) = call(&app, "GET", "/directory", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let mut rollnos: Vec<&str> = entries
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["rollno"].as_str().unwrap())
        .collect();
    rollnos.sort();
    assert_eq!(rollnos, ["21CS001", "21CS002"]);
    assert!(entries[0]["fullname"].as_str().unwrap().ends_with("fullname"));
}

#[tokio::test]
async fn query_token_is_not_accepted_outside_gateway() {
    let (app, _db) = app();
    register(&app, "21CS001", "alice").await;
    let token = login(&app, "alice").await;

    let (status, _) = call(&app, "GET", &format!("/directory?token={token}"), None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&app, "GET", &format!("/me?token={token}"), None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn conversation_over_http() {
    let (app, db) = app();
    register(&app, "21CS001", "alice").await;
    register(&app, "21CS002", "bob").await;
    let alice = login(&app, "alice").await;
    let bob = login(&app, "bob").await;

    let (status, sent) = call(
        &app,
        "POST",
        "/conversations/bob/messages",
        Some(&alice),
        Some(json!({ "message": "hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sent["sender"], "alice");
    assert_eq!(sent["receiver"], "bob");
    assert_eq!(sent["message"], "hi");

    call(&app, "POST", "/conversations/alice/messages", Some(&bob), Some(json!({ "message": "hey" }))).await;

    let (_, from_alice) = call(&app, "GET", "/conversations/bob", Some(&alice), None).await;
    let (_, from_bob) = call(&app, "GET", "/conversations/alice", Some(&bob), None).await;
    assert_eq!(from_alice, from_bob);

    let texts: Vec<&str> = from_alice
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["message"].as_str().unwrap())
        .collect();
    assert_eq!(texts, ["hi", "hey"]);

    // Missing and empty text are rejected before the store
    let before = db.count_messages().unwrap();
    for body in [json!({}), json!({ "message": "" })] {
        let (status, _) = call(&app, "POST", "/conversations/bob/messages", Some(&alice), Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
    assert_eq!(db.count_messages().unwrap(), before);
}

#[tokio::test]
async fn http_send_with_room_goes_through_the_relay() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let state = alumni_server::build_state(db.clone(), SECRET.to_string());
    let app = alumni_server::router(state.clone());

    let (conn, mut rx) = state.relay.connect().await;
    state.relay.join(conn, "bob", "r1").await;

    register(&app, "21CS001", "alice").await;
    let alice = login(&app, "alice").await;

    let body = json!({ "message": "ping", "room": "r1" });
    let (status, _) = call(&app, "POST", "/conversations/bob/messages", Some(&alice), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);

    let event = serde_json::to_value(rx.recv().await.unwrap()).unwrap();
    assert_eq!(
        event,
        json!({
            "type": "receive_message",
            "data": { "sender": "alice", "receiver": "bob", "message": "ping", "room": "r1" },
        })
    );
}

#[tokio::test]
async fn health_is_public() {
    let (app, _db) = app();
    let (status, body) = call(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
