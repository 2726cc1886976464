use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use querydeck::config::Config;
use tower::ServiceExt;

/// Bootstrap admin seeded by the initial migration
const ADMIN_EMAIL: &str = "admin@querydeck.local";
const ADMIN_PASSWORD: &str = "changeme";

async fn spawn_app() -> Router {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();

    let state = querydeck::api::create_app_state_from_config(config, None)
        .await
        .expect("Failed to create app state");
    querydeck::api::router(state).await
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

/// Logs in and returns the session cookie to replay on later requests.
async fn login(app: &Router, email: &str, password: &str) -> String {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/login")
                .header("Content-Type", mime::APPLICATION_JSON.as_ref())
                .body(Body::from(
                    serde_json::json!({"email": email, "password": password}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    response
        .headers()
        .get("set-cookie")
        .expect("login should set a session cookie")
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string()
}

async fn login_admin(app: &Router) -> String {
    login(app, ADMIN_EMAIL, ADMIN_PASSWORD).await
}

fn get(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("Cookie", cookie)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, cookie: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Cookie", cookie)
        .header("Content-Type", mime::APPLICATION_JSON.as_ref())
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_unauthenticated_requests_are_rejected() {
    let app = spawn_app().await;

    for uri in ["/api/users", "/api/teams", "/api/databases", "/api/chats"] {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/users")
                .header("Authorization", "Bearer qd_not_a_real_key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_probes_are_public() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health/live")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health/ready")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["ready"], true);
    assert_eq!(body["checks"]["database"], true);
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/login")
                .header("Content-Type", mime::APPLICATION_JSON.as_ref())
                .body(Body::from(
                    serde_json::json!({"email": ADMIN_EMAIL, "password": "wrong"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_flow_and_me() {
    let app = spawn_app().await;
    let cookie = login_admin(&app).await;

    let response = app
        .clone()
        .oneshot(get("/api/auth/me", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["email"], ADMIN_EMAIL);
    assert_eq!(body["data"]["role"], "admin");
}

#[tokio::test]
async fn test_user_crud_and_duplicate_email() {
    let app = spawn_app().await;
    let cookie = login_admin(&app).await;

    let payload = serde_json::json!({
        "email": "dana@example.com",
        "name": "Dana",
        "password": "s3cret-enough"
    });

    let response = app
        .clone()
        .oneshot(post_json("/api/users", &cookie, &payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    let user_id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["role"], "user");

    // Same email again reads as a validation failure
    let response = app
        .clone()
        .oneshot(post_json("/api/users", &cookie, &payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(get(&format!("/api/users/{user_id}"), &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The password digest never appears in any user payload
    let body = body_json(response).await;
    assert!(body["data"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_non_admin_cannot_manage_users() {
    let app = spawn_app().await;
    let admin_cookie = login_admin(&app).await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/users",
            &admin_cookie,
            &serde_json::json!({
                "email": "mo@example.com",
                "name": "Mo",
                "password": "plain-user-pw"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let user_cookie = login(&app, "mo@example.com", "plain-user-pw").await;

    let response = app
        .clone()
        .oneshot(get("/api/users", &user_cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/teams",
            &user_cookie,
            &serde_json::json!({"name": "Rogue"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_team_creation_and_duplicate_name() {
    let app = spawn_app().await;
    let cookie = login_admin(&app).await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/teams",
            &cookie,
            &serde_json::json!({"name": "Analytics", "member_ids": [1]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["data"]["member_count"], 1);
    assert_eq!(body["data"]["members"][0]["email"], ADMIN_EMAIL);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/teams",
            &cookie,
            &serde_json::json!({"name": "Analytics"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Unknown member ids are rejected before the team is written
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/teams",
            &cookie,
            &serde_json::json!({"name": "Ghosts", "member_ids": [999]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_team_creation_accepts_members_key() {
    let app = spawn_app().await;
    let cookie = login_admin(&app).await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/teams",
            &cookie,
            &serde_json::json!({"name": "Ops", "members": [1]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["data"]["member_count"], 1);
    assert_eq!(body["data"]["members"][0]["email"], ADMIN_EMAIL);
}

async fn create_team_and_key(
    app: &Router,
    cookie: &str,
    team_name: &str,
    permissions: serde_json::Value,
) -> (i64, String) {
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/teams",
            cookie,
            &serde_json::json!({"name": team_name, "member_ids": [1]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let team_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/teams/{team_id}/api-keys"),
            cookie,
            &serde_json::json!({"name": "ci", "permissions": permissions}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    let secret = body["data"]["api_key"].as_str().unwrap().to_string();
    assert!(secret.starts_with("qd_"));
    // The stored digest must not leak through the response
    assert!(body["data"].get("key_hash").is_none());

    (team_id, secret)
}

#[tokio::test]
async fn test_api_key_authenticates_and_is_team_scoped() {
    let app = spawn_app().await;
    let cookie = login_admin(&app).await;

    let (team_id, secret) =
        create_team_and_key(&app, &cookie, "Pipelines", serde_json::json!(["query:read"])).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/teams/{team_id}"))
                .header("Authorization", format!("Bearer {secret}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Key actors have no role, so admin surfaces stay closed
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/users")
                .header("Authorization", format!("Bearer {secret}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_api_key_scope_gates_query() {
    let app = spawn_app().await;
    let cookie = login_admin(&app).await;

    let (_, secret) = create_team_and_key(
        &app,
        &cookie,
        "Reporting",
        serde_json::json!(["tables:read"]),
    )
    .await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/query")
                .header("Authorization", format!("Bearer {secret}"))
                .header("Content-Type", mime::APPLICATION_JSON.as_ref())
                .body(Body::from(
                    serde_json::json!({"question": "How many orders?", "database_id": 1})
                        .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_deactivated_key_stops_authenticating() {
    let app = spawn_app().await;
    let cookie = login_admin(&app).await;

    let (team_id, secret) =
        create_team_and_key(&app, &cookie, "Ephemeral", serde_json::json!(["query:read"])).await;

    let response = app
        .clone()
        .oneshot(get(&format!("/api/teams/{team_id}/api-keys"), &cookie))
        .await
        .unwrap();
    let body = body_json(response).await;
    let key_id = body["data"][0]["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/teams/{team_id}/api-keys/{key_id}"))
                .header("Cookie", cookie.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Same 401 as an unknown key
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/teams/{team_id}"))
                .header("Authorization", format!("Bearer {secret}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_api_key_is_rejected_like_unknown() {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    let state = querydeck::api::create_app_state_from_config(config, None)
        .await
        .expect("Failed to create app state");
    let app = querydeck::api::router(state.clone()).await;

    let cookie = login_admin(&app).await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/teams",
            &cookie,
            &serde_json::json!({"name": "Batch", "members": [1]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let team_id = body_json(response).await["data"]["id"].as_i64().unwrap() as i32;

    // Key whose expiry already passed; only reachable through the store,
    // the handler refuses non-positive expires_in_days.
    let secret = querydeck::auth::api_key::generate_api_key();
    let expired = (chrono::Utc::now() - chrono::Duration::days(1)).to_rfc3339();
    state
        .store()
        .create_api_key(
            team_id,
            1,
            "stale",
            querydeck::auth::api_key::lookup_prefix(&secret),
            &querydeck::auth::api_key::hash_api_key(&secret),
            &["query:read".to_string()],
            Some(&expired),
        )
        .await
        .unwrap();

    // Same 401 as a key that never existed
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/teams/{team_id}"))
                .header("Authorization", format!("Bearer {secret}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_engine_failure_surfaces_as_500_with_message() {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    // Port 1 is never listening, so the engine call fails at connect
    config.query_engine.endpoint = "http://127.0.0.1:1".to_string();

    let state = querydeck::api::create_app_state_from_config(config, None)
        .await
        .expect("Failed to create app state");
    let app = querydeck::api::router(state).await;

    let cookie = login_admin(&app).await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/databases",
            &cookie,
            &serde_json::json!({
                "name": "orders",
                "connection": "postgres://app:pw@10.0.0.9/orders",
                "engine": "postgres"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let database_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/query",
            &cookie,
            &serde_json::json!({"question": "How many orders?", "database_id": database_id}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("query engine"), "{message}");
}

#[tokio::test]
async fn test_access_grant_requires_exactly_one_subject() {
    let app = spawn_app().await;
    let cookie = login_admin(&app).await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/databases",
            &cookie,
            &serde_json::json!({
                "name": "warehouse",
                "connection": "postgres://wh:pw@10.0.0.5/warehouse",
                "engine": "postgres"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let database_id = body["data"]["id"].as_i64().unwrap();
    // Connection strings are write-only
    assert!(body["data"].get("connection").is_none());
    assert_eq!(body["data"]["sync_status"], "yet_to_sync");

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/accesses",
            &cookie,
            &serde_json::json!({"team_id": 1, "user_id": 1, "database_id": database_id}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/accesses",
            &cookie,
            &serde_json::json!({"database_id": database_id}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/accesses",
            &cookie,
            &serde_json::json!({"user_id": 1, "database_id": database_id}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_database_access_filters_listing() {
    let app = spawn_app().await;
    let admin_cookie = login_admin(&app).await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/users",
            &admin_cookie,
            &serde_json::json!({
                "email": "ana@example.com",
                "name": "Ana",
                "password": "plain-user-pw"
            }),
        ))
        .await
        .unwrap();
    let user_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/databases",
            &admin_cookie,
            &serde_json::json!({
                "name": "sales",
                "connection": "mysql://sales:pw@10.0.0.9/sales",
                "engine": "mysql"
            }),
        ))
        .await
        .unwrap();
    let database_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let user_cookie = login(&app, "ana@example.com", "plain-user-pw").await;

    // No grant yet: empty listing, detail forbidden
    let response = app
        .clone()
        .oneshot(get("/api/databases", &user_cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 0);

    let response = app
        .clone()
        .oneshot(get(&format!("/api/databases/{database_id}"), &user_cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/accesses",
            &admin_cookie,
            &serde_json::json!({"user_id": user_id, "database_id": database_id}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(get(&format!("/api/databases/{database_id}"), &user_cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_chat_lifecycle() {
    let app = spawn_app().await;
    let cookie = login_admin(&app).await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/databases",
            &cookie,
            &serde_json::json!({
                "name": "metrics",
                "connection": "postgres://m:pw@10.0.0.7/metrics",
                "engine": "postgres"
            }),
        ))
        .await
        .unwrap();
    let database_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/chats",
            &cookie,
            &serde_json::json!({"title": "Q3 revenue", "database_ids": [database_id]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let chat_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(get("/api/chats", &cookie))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(get(&format!("/api/chats/{chat_id}/messages"), &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 0);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/chats/{chat_id}"))
                .header("Cookie", cookie.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get(&format!("/api/chats/{chat_id}"), &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_chats_are_not_visible_across_users() {
    let app = spawn_app().await;
    let admin_cookie = login_admin(&app).await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/users",
            &admin_cookie,
            &serde_json::json!({
                "email": "kim@example.com",
                "name": "Kim",
                "password": "plain-user-pw"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/databases",
            &admin_cookie,
            &serde_json::json!({
                "name": "ops",
                "connection": "postgres://o:pw@10.0.0.8/ops",
                "engine": "postgres"
            }),
        ))
        .await
        .unwrap();
    let database_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/chats",
            &admin_cookie,
            &serde_json::json!({"title": "private", "database_ids": [database_id]}),
        ))
        .await
        .unwrap();
    let chat_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let user_cookie = login(&app, "kim@example.com", "plain-user-pw").await;
    let response = app
        .clone()
        .oneshot(get(&format!("/api/chats/{chat_id}"), &user_cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sync_status_update_is_admin_only() {
    let app = spawn_app().await;
    let admin_cookie = login_admin(&app).await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/databases",
            &admin_cookie,
            &serde_json::json!({
                "name": "events",
                "connection": "postgres://e:pw@10.0.0.3/events",
                "engine": "postgres"
            }),
        ))
        .await
        .unwrap();
    let database_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/api/databases/{database_id}/sync-status"))
                .header("Cookie", admin_cookie.as_str())
                .header("Content-Type", mime::APPLICATION_JSON.as_ref())
                .body(Body::from(
                    serde_json::json!({"sync_status": "synced", "embeddings_ready": true})
                        .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["sync_status"], "synced");
    assert_eq!(body["data"]["embeddings_ready"], true);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/api/databases/{database_id}/sync-status"))
                .header("Cookie", admin_cookie.as_str())
                .header("Content-Type", mime::APPLICATION_JSON.as_ref())
                .body(Body::from(
                    serde_json::json!({"sync_status": "nonsense"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_system_status_reports_counts() {
    let app = spawn_app().await;
    let cookie = login_admin(&app).await;

    let response = app
        .clone()
        .oneshot(get("/api/system/status", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["users"], 1);
    assert_eq!(body["data"]["databases"], 0);
}
