use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use time;

use crate::config::Config;
use crate::state::SharedState;

mod accesses;
mod api_keys;
pub mod auth;
mod chats;
mod databases;
mod error;
mod observability;
mod query;
mod system;
mod teams;
mod types;
mod users;
mod validation;

pub use error::ApiError;
pub use types::*;

use tokio::sync::RwLock;

use crate::clients::{JsonResultDecoder, ResultDecoder};
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    /// Decodes persisted result buffers fetched from the object store.
    pub decoder: Arc<dyn ResultDecoder>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Arc<RwLock<Config>> {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }
}

pub async fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    Ok(Arc::new(AppState {
        shared,
        decoder: Arc::new(JsonResultDecoder),
        start_time: std::time::Instant::now(),
        prometheus_handle,
    }))
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    create_app_state(shared, prometheus_handle).await
}

pub async fn router(state: Arc<AppState>) -> Router {
    let (cors_origins, secure_cookies, session_expiry_days) = {
        let config = state.config().read().await;
        (
            config.server.cors_allowed_origins.clone(),
            config.server.secure_cookies,
            config.server.session_expiry_days,
        )
    };

    let protected_routes = create_protected_router(state.clone());

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(secure_cookies)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::days(
            session_expiry_days,
        )));

    let api_router = Router::new()
        .merge(protected_routes)
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .layer(session_layer);

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .route("/health/live", get(system::health_live))
        .route("/health/ready", get(system::health_ready))
        .with_state(state)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(
            observability::security_headers_middleware,
        ))
        .layer(middleware::from_fn(observability::logging_middleware))
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/me", get(auth::get_current_user))
        .route("/auth/password", put(auth::change_password))
        .route("/users", get(users::list_users))
        .route("/users", post(users::create_user))
        .route("/users/{id}", get(users::get_user))
        .route("/users/{id}", put(users::update_user))
        .route("/users/{id}", delete(users::delete_user))
        .route("/teams", get(teams::list_teams))
        .route("/teams", post(teams::create_team))
        .route("/teams/{id}", get(teams::get_team))
        .route("/teams/{id}", put(teams::update_team))
        .route("/teams/{id}", delete(teams::delete_team))
        .route("/teams/{team_id}/api-keys", get(api_keys::list_api_keys))
        .route("/teams/{team_id}/api-keys", post(api_keys::create_api_key))
        .route(
            "/teams/{team_id}/api-keys/{key_id}",
            delete(api_keys::deactivate_api_key),
        )
        .route("/databases", get(databases::list_databases))
        .route("/databases", post(databases::create_database))
        .route("/databases/{id}", get(databases::get_database))
        .route("/databases/{id}", put(databases::update_database))
        .route("/databases/{id}", delete(databases::delete_database))
        .route("/databases/{id}/tables", get(databases::list_tables))
        .route(
            "/databases/{id}/tables/{table}/skip",
            put(databases::set_table_skip),
        )
        .route(
            "/databases/{id}/tables/{table}/fields/{field}",
            put(databases::set_field_description),
        )
        .route(
            "/databases/{id}/sync-status",
            put(databases::set_sync_status),
        )
        .route("/accesses", get(accesses::list_accesses))
        .route("/accesses", post(accesses::create_access))
        .route("/accesses/{id}", delete(accesses::delete_access))
        .route("/chats", get(chats::list_chats))
        .route("/chats", post(chats::create_chat))
        .route("/chats/{id}", get(chats::get_chat))
        .route("/chats/{id}", delete(chats::delete_chat))
        .route("/chats/{id}/messages", get(chats::list_messages))
        .route("/query", post(query::run_query))
        .route("/query/results/{key}", get(query::get_result))
        .route("/system/status", get(system::get_status))
        .route("/metrics", get(observability::get_metrics))
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}
