use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{Value, json};
use tapline::{
    AppState, Stores,
    clock::ManualClock,
    config::Config,
    database::MemoryStore,
    routes,
    utils::error_codes,
};
use tower::ServiceExt;

fn config() -> Config {
    Config {
        database_url: String::new(),
        redis_url: String::new(),
        jwt_secret: "integration-secret".into(),
        jwt_expiration_secs: 30 * 24 * 3600,
        rate_limit_window_secs: 60,
        rate_limit_requests: 100,
        server_host: "::".into(),
        server_port: 0,
        api_base_uri: "/api".into(),
        tap_cooldown_secs: 180,
        summary_refresh_hour: 23,
        default_utc_offset_minutes: 0,
        bcrypt_cost: 4,
    }
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap()
}

struct TestApp {
    router: Router,
    clock: Arc<ManualClock>,
    store: Arc<MemoryStore>,
}

impl TestApp {
    fn new() -> Self {
        let clock = Arc::new(ManualClock::new(t0()));
        let store = Arc::new(MemoryStore::with_clock(clock.clone()));
        let state = AppState::new(config(), Stores::memory(store.clone()), clock.clone());
        Self {
            router: routes::router(state),
            clock,
            store,
        }
    }

    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn register(&self, username: &str) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/users/register",
                None,
                Some(json!({
                    "email": format!("{username}@example.com"),
                    "password": "hunter22",
                    "display_name": username.to_uppercase(),
                    "username": username,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], error_codes::SUCCESS);
        body["resp_data"]["token"].as_str().unwrap().to_string()
    }

    async fn try_connect(&self, token: &str, username: &str) -> Value {
        let (_, body) = self
            .call(
                Method::POST,
                "/api/connections",
                Some(token),
                Some(json!({ "username": username })),
            )
            .await;
        body
    }

    async fn connect(&self, token: &str, username: &str) -> String {
        let body = self.try_connect(token, username).await;
        assert_eq!(body["code"], error_codes::SUCCESS, "{body}");
        body["resp_data"]["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = TestApp::new();
    let (status, body) = app.call(Method::GET, "/api/connections", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], error_codes::AUTH_FAILED);

    let (status, _) = app
        .call(Method::GET, "/api/summary", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_login_and_profile() {
    let app = TestApp::new();
    app.register("alice").await;

    let (_, body) = app
        .call(
            Method::POST,
            "/api/users/login",
            None,
            Some(json!({ "email": "alice@example.com", "password": "hunter22" })),
        )
        .await;
    assert_eq!(body["code"], error_codes::SUCCESS);
    assert!(body["resp_data"]["user"].get("password_hash").is_none());
    let token = body["resp_data"]["token"].as_str().unwrap().to_string();

    let (_, me) = app.call(Method::GET, "/api/users/me", Some(token.as_str()), None).await;
    assert_eq!(me["resp_data"]["username"], "alice");

    let (_, wrong) = app
        .call(
            Method::POST,
            "/api/users/login",
            None,
            Some(json!({ "email": "alice@example.com", "password": "nope" })),
        )
        .await;
    assert_eq!(wrong["code"], error_codes::AUTH_FAILED);
}

#[tokio::test]
async fn adding_connections_enforces_rules() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    app.register("bob").await;

    app.connect(&alice, "@Bob").await;

    assert_eq!(
        app.try_connect(&alice, "bob").await["code"],
        error_codes::ALREADY_CONNECTED
    );
    assert_eq!(
        app.try_connect(&alice, "@alice").await["code"],
        error_codes::SELF_ADDITION
    );
    assert_eq!(
        app.try_connect(&alice, "dave").await["code"],
        error_codes::NOT_FOUND
    );

    let (_, list) = app.call(Method::GET, "/api/connections", Some(alice.as_str()), None).await;
    let rows = list["resp_data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["label"], "BOB");
    assert_eq!(rows[0]["tapped_today"], 0);
}

#[tokio::test]
async fn tap_cooldown_over_http() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    app.register("bob").await;
    let id = app.connect(&alice, "bob").await;
    let tap_uri = format!("/api/connections/{id}/tap");

    let (_, first) = app.call(Method::POST, &tap_uri, Some(alice.as_str()), None).await;
    assert_eq!(first["code"], error_codes::SUCCESS);
    assert_eq!(first["resp_data"]["tapped_today"], 1);

    app.clock.advance(Duration::milliseconds(100_000));
    let (status, blocked) = app.call(Method::POST, &tap_uri, Some(alice.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(blocked["code"], error_codes::COOLDOWN_ACTIVE);

    let (_, today) = app
        .call(Method::GET, &format!("/api/connections/{id}/today"), Some(alice.as_str()), None)
        .await;
    assert_eq!(today["resp_data"]["tapped_today"], 1);
    assert_eq!(today["resp_data"]["can_tap"], false);

    app.clock.advance(Duration::milliseconds(80_001));
    let (_, second) = app.call(Method::POST, &tap_uri, Some(alice.as_str()), None).await;
    assert_eq!(second["resp_data"]["tapped_today"], 2);
}

#[tokio::test]
async fn cooldown_is_per_session() {
    let app = TestApp::new();
    let first_session = app.register("alice").await;
    app.register("bob").await;
    let id = app.connect(&first_session, "bob").await;

    let (_, login) = app
        .call(
            Method::POST,
            "/api/users/login",
            None,
            Some(json!({ "email": "alice@example.com", "password": "hunter22" })),
        )
        .await;
    let second_session = login["resp_data"]["token"].as_str().unwrap().to_string();

    let tap_uri = format!("/api/connections/{id}/tap");
    let (_, a) = app.call(Method::POST, &tap_uri, Some(first_session.as_str()), None).await;
    let (_, b) = app.call(Method::POST, &tap_uri, Some(second_session.as_str()), None).await;
    assert_eq!(a["code"], error_codes::SUCCESS);
    assert_eq!(b["code"], error_codes::SUCCESS);
    assert_eq!(b["resp_data"]["tapped_today"], 2);
}

#[tokio::test]
async fn failed_removal_keeps_cooldown() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    app.register("bob").await;
    let id = app.connect(&alice, "bob").await;
    let tap_uri = format!("/api/connections/{id}/tap");

    let (_, first) = app.call(Method::POST, &tap_uri, Some(alice.as_str()), None).await;
    assert_eq!(first["code"], error_codes::SUCCESS);

    app.store.set_offline(true);
    let (_, removed) = app
        .call(Method::DELETE, &format!("/api/connections/{id}"), Some(alice.as_str()), None)
        .await;
    assert_eq!(removed["resp_data"]["outcome"], "failed");
    app.store.set_offline(false);

    app.clock.advance(Duration::seconds(1));
    let (_, again) = app.call(Method::POST, &tap_uri, Some(alice.as_str()), None).await;
    assert_eq!(again["code"], error_codes::COOLDOWN_ACTIVE);
    assert_eq!(app.store.tap_count().await, 1);
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    app.register("bob").await;
    let id = app.connect(&alice, "bob").await;
    let tap_uri = format!("/api/connections/{id}/tap");

    app.call(Method::POST, &tap_uri, Some(alice.as_str()), None).await;
    let (status, _) = app
        .call(Method::POST, "/api/users/logout", Some(alice.as_str()), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    app.clock.advance(Duration::seconds(1));
    let (status, body) = app.call(Method::POST, &tap_uri, Some(alice.as_str()), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], error_codes::AUTH_FAILED);
    assert_eq!(app.store.tap_count().await, 1);
}

#[tokio::test]
async fn expired_session_is_rejected() {
    let app = TestApp::new();
    let alice = app.register("alice").await;

    app.clock.advance(Duration::days(31));
    let (status, _) = app.call(Method::GET, "/api/users/me", Some(alice.as_str()), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn foreign_connection_cannot_be_tapped_or_removed() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let id = app.connect(&alice, "bob").await;

    let (_, tap) = app
        .call(Method::POST, &format!("/api/connections/{id}/tap"), Some(bob.as_str()), None)
        .await;
    assert_eq!(tap["code"], error_codes::NOT_FOUND);

    let (_, removed) = app
        .call(Method::DELETE, &format!("/api/connections/{id}"), Some(bob.as_str()), None)
        .await;
    assert_eq!(removed["resp_data"]["outcome"], "absent");

    let (_, removed) = app
        .call(Method::DELETE, &format!("/api/connections/{id}"), Some(alice.as_str()), None)
        .await;
    assert_eq!(removed["resp_data"]["outcome"], "removed");
}

#[tokio::test]
async fn summary_refreshes_after_evening_hour() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let id = app.connect(&alice, "bob").await;
    app.call(Method::POST, &format!("/api/connections/{id}/tap"), Some(alice.as_str()), None)
        .await;

    let (_, noon) = app.call(Method::GET, "/api/summary", Some(bob.as_str()), None).await;
    assert_eq!(noon["resp_data"]["state"], "empty");
    assert!(noon["resp_data"].get("summary").is_none());

    app.clock.set(Utc.with_ymd_and_hms(2024, 5, 10, 23, 5, 0).unwrap());
    let (_, evening) = app.call(Method::GET, "/api/summary", Some(bob.as_str()), None).await;
    assert_eq!(evening["resp_data"]["state"], "refreshed");
    assert_eq!(evening["resp_data"]["summary"]["count24"]["alice"], 1);
    assert_eq!(evening["resp_data"]["summary"]["count7d"]["alice"], 1);

    app.clock.advance(Duration::minutes(30));
    let (_, later) = app.call(Method::GET, "/api/summary", Some(bob.as_str()), None).await;
    assert_eq!(later["resp_data"]["state"], "cached");

    // UTC+10 次日 08:00 即 UTC 22:00：新的一天，未到刷新时刻
    app.clock.set(Utc.with_ymd_and_hms(2024, 5, 11, 22, 0, 0).unwrap());
    let (_, morning) = app
        .call(Method::GET, "/api/summary?tz_offset_minutes=600", Some(bob.as_str()), None)
        .await;
    assert_eq!(morning["resp_data"]["state"], "stale");
}

#[tokio::test]
async fn preferences_round_trip() {
    let app = TestApp::new();
    let alice = app.register("alice").await;

    let (_, initial) = app
        .call(Method::GET, "/api/users/preferences", Some(alice.as_str()), None)
        .await;
    assert_eq!(initial["resp_data"]["guide_dismissed"], false);

    let (_, updated) = app
        .call(
            Method::PUT,
            "/api/users/preferences",
            Some(alice.as_str()),
            Some(json!({ "language": "fr", "guide_dismissed": true })),
        )
        .await;
    assert_eq!(updated["resp_data"]["language"], "fr");

    let (_, read_back) = app
        .call(Method::GET, "/api/users/preferences", Some(alice.as_str()), None)
        .await;
    assert_eq!(read_back["resp_data"]["guide_dismissed"], true);
}
