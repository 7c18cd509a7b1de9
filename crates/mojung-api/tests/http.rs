use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use mojung_api::auth::{AppState, AppStateInner};
use mojung_api::cookies::{ACCESS_COOKIE, ID_COOKIE, NAME_COOKIE, REFRESH_COOKIE};
use mojung_auth::{SessionConfig, SessionManager, TokenKind};
use mojung_db::Database;
use mojung_types::models::Identity;

const SECRET: &str = "integration-test-secret";

fn setup() -> (Router, AppState) {
    let state: AppState = Arc::new(AppStateInner {
        db: Database::open_in_memory().unwrap(),
        sessions: SessionManager::new(&SessionConfig::new(SECRET)),
        page_size: 4,
        secure_cookies: false,
    });
    (mojung_api::router(state.clone()), state)
}

fn post_json(uri: &str, body: Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// `(name, value)` for every Set-Cookie header on the response.
fn set_cookies(resp: &Response) -> Vec<(String, String)> {
    resp.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| {
            let raw = v.to_str().unwrap();
            let pair = raw.split(';').next().unwrap();
            let (name, value) = pair.split_once('=').unwrap();
            (name.to_string(), value.to_string())
        })
        .collect()
}

fn cookie_header(cookies: &[(String, String)]) -> String {
    cookies
        .iter()
        .map(|(n, v)| format!("{}={}", n, v))
        .collect::<Vec<_>>()
        .join("; ")
}

async fn json_body(resp: Response) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> Response {
    app.clone().oneshot(req).await.unwrap()
}

/// Registers and logs in through the HTTP surface; returns the Cookie header.
async fn register_and_login(app: &Router, user_id: &str, password: &str) -> String {
    let resp = send(
        app,
        post_json(
            "/users/register",
            json!({"userId": user_id, "password": password, "name": user_id.to_uppercase()}),
            None,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = send(
        app,
        post_json("/users/login", json!({"userId": user_id, "password": password}), None),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    cookie_header(&set_cookies(&resp))
}

/// A user that exists in storage without paying for a password hash.
fn seeded_identity(state: &AppState, handle: &str) -> Identity {
    let id = Uuid::new_v4();
    state
        .db
        .create_user(id, handle, handle, "unused", Utc::now())
        .unwrap();
    Identity {
        id,
        name: handle.to_string(),
    }
}

#[tokio::test]
async fn health_is_public() {
    let (app, _) = setup();
    let resp = send(&app, get("/health", None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn login_sets_session_cookies_and_returns_tokens() {
    let (app, _) = setup();
    register_and_login(&app, "alice", "pw-alice").await;

    let resp = send(
        &app,
        post_json("/users/login", json!({"userId": "alice", "password": "pw-alice"}), None),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let names: Vec<String> = set_cookies(&resp).into_iter().map(|(n, _)| n).collect();
    for expected in [ACCESS_COOKIE, REFRESH_COOKIE, ID_COOKIE, NAME_COOKIE] {
        assert!(names.iter().any(|n| n == expected), "missing cookie {}", expected);
    }
    let http_only = resp
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter(|v| v.to_str().unwrap().contains("HttpOnly"))
        .count();
    assert_eq!(http_only, 2);

    let body = json_body(resp).await;
    assert_eq!(body["result"], "success");
    assert_eq!(body["data"]["name"], "ALICE");
    assert!(body["data"]["accessToken"].as_str().is_some());
    assert!(body["data"]["refreshToken"].as_str().is_some());
}

#[tokio::test]
async fn bad_credentials_share_one_answer() {
    let (app, _) = setup();
    register_and_login(&app, "alice", "pw-alice").await;

    let wrong_password = send(
        &app,
        post_json("/users/login", json!({"userId": "alice", "password": "nope"}), None),
    )
    .await;
    let unknown_user = send(
        &app,
        post_json("/users/login", json!({"userId": "mallory", "password": "nope"}), None),
    )
    .await;

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);
    let a = json_body(wrong_password).await;
    let b = json_body(unknown_user).await;
    assert_eq!(a["code"], "INVALID_CREDENTIALS");
    assert_eq!(a, b);
}

#[tokio::test]
async fn check_id_and_duplicate_registration() {
    let (app, state) = setup();
    seeded_identity(&state, "taken");

    let body = json_body(send(&app, post_json("/users/check-id", json!({"userId": "taken"}), None)).await).await;
    assert_eq!(body["result"], "success");
    assert_eq!(body["data"]["available"], false);

    let body = json_body(send(&app, post_json("/users/check-id", json!({"userId": "fresh"}), None)).await).await;
    assert_eq!(body["data"]["available"], true);

    let resp = send(
        &app,
        post_json("/users/register", json!({"userId": "taken", "password": "pw", "name": "T"}), None),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(resp).await["code"], "USER_ID_TAKEN");

    let resp = send(
        &app,
        post_json("/users/register", json!({"userId": "  ", "password": "pw", "name": "T"}), None),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["code"], "EMPTY_FIELD");
}

#[tokio::test]
async fn posting_requires_a_session() {
    let (app, _) = setup();

    let resp = send(&app, post_json("/messages", json!({"recipient": "bob", "content": "hi"}), None)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(resp).await["code"], "LOGIN_REQUIRED");

    let forged = format!("{}=not-a-token; {}=also-not", ACCESS_COOKIE, REFRESH_COOKIE);
    let resp = send(
        &app,
        post_json("/messages", json!({"recipient": "bob", "content": "hi"}), Some(&forged)),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let cleared = set_cookies(&resp);
    assert!(cleared.iter().any(|(n, v)| n == ACCESS_COOKIE && v.is_empty()));
    assert!(cleared.iter().any(|(n, v)| n == REFRESH_COOKIE && v.is_empty()));
    assert_eq!(json_body(resp).await["code"], "INVALID_SESSION");
}

#[tokio::test]
async fn expired_access_is_renewed_transparently() {
    let (app, state) = setup();
    let identity = seeded_identity(&state, "alice");
    let codec = state.sessions.codec();
    let now = Utc::now();
    let stale = codec
        .issue_at(TokenKind::Access, &identity, Duration::hours(1), now - Duration::hours(2))
        .unwrap();
    let refresh = codec
        .issue_at(TokenKind::Refresh, &identity, Duration::days(30), now)
        .unwrap();
    let cookie = format!("{}={}; {}={}", ACCESS_COOKIE, stale.token, REFRESH_COOKIE, refresh.token);

    let resp = send(&app, get("/auth/check", Some(&cookie))).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(resp).await["code"], "ACCESS_EXPIRED");

    let resp = send(
        &app,
        post_json("/messages", json!({"recipient": "bob", "content": "hi"}), Some(&cookie)),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let renewed = set_cookies(&resp);
    let (_, fresh) = renewed
        .iter()
        .find(|(n, _)| n == ACCESS_COOKIE)
        .expect("renewed access cookie");
    assert_ne!(fresh, &stale.token);

    let resp = send(&app, get("/auth/refresh", Some(&cookie))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(json_body(resp).await["data"]["accessToken"].as_str().is_some());
}

/// Max-Age of the named cookie as set on the response.
fn max_age(resp: &Response, name: &str) -> Option<i64> {
    resp.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap())
        .find(|raw| raw.starts_with(&format!("{}=", name)))?
        .split(';')
        .find_map(|attr| attr.trim().strip_prefix("Max-Age="))
        .map(|n| n.parse().unwrap())
}

#[tokio::test]
async fn access_cookie_lives_as_long_as_the_session() {
    let (app, _) = setup();
    register_and_login(&app, "alice", "pw-alice").await;

    let resp = send(
        &app,
        post_json("/users/login", json!({"userId": "alice", "password": "pw-alice"}), None),
    )
    .await;
    let access = max_age(&resp, ACCESS_COOKIE).unwrap();
    let refresh = max_age(&resp, REFRESH_COOKIE).unwrap();
    assert!(access > 3600, "access cookie would vanish with its token: {}", access);
    assert!((refresh - access).abs() <= 1);
}

#[tokio::test]
async fn refresh_cookie_alone_is_renewed_transparently() {
    let (app, state) = setup();
    let identity = seeded_identity(&state, "alice");
    let refresh = state
        .sessions
        .codec()
        .issue_at(TokenKind::Refresh, &identity, Duration::days(30), Utc::now())
        .unwrap();
    let cookie = format!("{}={}", REFRESH_COOKIE, refresh.token);

    let resp = send(&app, get("/auth/check", Some(&cookie))).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(resp).await["code"], "ACCESS_EXPIRED");

    let resp = send(
        &app,
        post_json("/messages", json!({"recipient": "bob", "content": "hi"}), Some(&cookie)),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert!(set_cookies(&resp).iter().any(|(n, v)| n == ACCESS_COOKIE && !v.is_empty()));

    let resp = send(&app, get("/auth/check", None)).await;
    assert_eq!(json_body(resp).await["code"], "LOGIN_REQUIRED");
}

#[tokio::test]
async fn malformed_input_is_answered_with_an_envelope() {
    let (app, state) = setup();
    let identity = seeded_identity(&state, "alice");
    let codec = state.sessions.codec();
    let access = codec
        .issue_at(TokenKind::Access, &identity, Duration::hours(1), Utc::now())
        .unwrap();
    let refresh = codec
        .issue_at(TokenKind::Refresh, &identity, Duration::days(30), Utc::now())
        .unwrap();
    let cookie = format!("{}={}; {}={}", ACCESS_COOKIE, access.token, REFRESH_COOKIE, refresh.token);

    let resp = send(&app, get("/mainBoard?page=abc", None)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_body(resp).await;
    assert_eq!(body["result"], "fail");
    assert_eq!(body["code"], "INVALID_PAGE");

    let resp = send(&app, post_json("/messages", json!({"recipient": "bob"}), Some(&cookie))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["code"], "EMPTY_FIELD");

    let resp = send(&app, post_json("/votes", json!({"options": [{"content": "a"}]}), Some(&cookie))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["code"], "EMPTY_FIELD");

    let resp = send(&app, post_json("/votes/xyz/options/1", json!({}), Some(&cookie))).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = json_body(resp).await;
    assert_eq!(body["result"], "fail");
    assert_eq!(body["code"], "NOT_FOUND");

    let garbled = Request::builder()
        .method("POST")
        .uri("/users/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let resp = send(&app, garbled).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["code"], "MALFORMED_REQUEST");

    let resp = send(&app, post_json("/users/login", json!({"userId": "alice"}), None)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["code"], "EMPTY_FIELD");

    assert_eq!(state.db.index_len().unwrap(), 0);
}

#[tokio::test]
async fn expired_session_forces_logout() {
    let (app, state) = setup();
    let identity = seeded_identity(&state, "alice");
    let codec = state.sessions.codec();
    let long_ago = Utc::now() - Duration::days(60);
    let access = codec
        .issue_at(TokenKind::Access, &identity, Duration::hours(1), long_ago)
        .unwrap();
    let refresh = codec
        .issue_at(TokenKind::Refresh, &identity, Duration::days(30), long_ago)
        .unwrap();
    let cookie = format!("{}={}; {}={}", ACCESS_COOKIE, access.token, REFRESH_COOKIE, refresh.token);

    let resp = send(
        &app,
        post_json("/votes", json!({"title": "t", "options": [{"content": "a"}]}), Some(&cookie)),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookies(&resp).iter().any(|(n, v)| n == REFRESH_COOKIE && v.is_empty()));
    assert_eq!(json_body(resp).await["code"], "SESSION_EXPIRED");
}

#[tokio::test]
async fn board_shows_posts_newest_first_with_ballot_overlay() {
    let (app, _) = setup();
    let cookie = register_and_login(&app, "alice", "pw-alice").await;

    let resp = send(
        &app,
        post_json("/messages", json!({"recipient": "bob", "content": "hello"}), Some(&cookie)),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = send(
        &app,
        post_json(
            "/votes",
            json!({"title": "Lunch?", "options": [{"content": "noodles"}, {"content": "rice"}]}),
            Some(&cookie),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let vote_id = json_body(resp).await["data"]["id"].as_str().unwrap().to_string();

    let ballot_uri = format!("/votes/{}/options/2", vote_id);
    let resp = send(&app, post_json(&ballot_uri, json!({}), Some(&cookie))).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = send(&app, post_json(&ballot_uri, json!({}), Some(&cookie))).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(resp).await["code"], "ALREADY_VOTED");

    let resp = send(
        &app,
        post_json(&format!("/votes/{}/options/9", vote_id), json!({}), Some(&cookie)),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["code"], "INVALID_OPTION");

    let body = json_body(send(&app, get("/mainBoard?page=1", Some(&cookie))).await).await;
    assert_eq!(body["result"], "success");
    let posts = body["data"].as_array().unwrap();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0]["mode"], "VOTE");
    assert_eq!(posts[0]["selectedOptionId"], "2");
    assert_eq!(posts[0]["totalBallots"], 1);
    assert_eq!(posts[0]["optionCounts"][0]["count"], 0);
    assert_eq!(posts[0]["optionCounts"][1]["count"], 1);
    assert_eq!(posts[1]["mode"], "MESSAGE");
    assert_eq!(posts[1]["recipient"], "bob");
    assert_eq!(posts[1]["content"], "hello");

    let body = json_body(send(&app, get("/mainBoard", None)).await).await;
    let posts = body["data"].as_array().unwrap();
    assert_eq!(posts.len(), 2);
    assert!(posts[0].get("selectedOptionId").is_none());
}

#[tokio::test]
async fn board_reports_empty_and_out_of_range_pages() {
    let (app, state) = setup();

    let body = json_body(send(&app, get("/mainBoard", None)).await).await;
    assert_eq!(body["result"], "success");
    assert_eq!(body["code"], "NO_POSTS");
    assert_eq!(body["data"], json!([]));

    let author = seeded_identity(&state, "alice");
    state
        .db
        .create_message(author.id, "bob", "hi", Utc::now())
        .unwrap();

    let body = json_body(send(&app, get("/mainBoard?page=2", None)).await).await;
    assert_eq!(body["code"], "PAGE_OUT_OF_RANGE");
    assert_eq!(body["data"], json!([]));

    let resp = send(&app, get("/mainBoard?page=0", None)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["code"], "INVALID_PAGE");
}

#[tokio::test]
async fn logout_clears_every_session_cookie() {
    let (app, _) = setup();
    let cookie = register_and_login(&app, "alice", "pw-alice").await;

    let resp = send(&app, get("/users/logout", Some(&cookie))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cleared = set_cookies(&resp);
    assert_eq!(cleared.len(), 4);
    assert!(cleared.iter().all(|(_, v)| v.is_empty()));
    assert_eq!(json_body(resp).await["result"], "success");
}
