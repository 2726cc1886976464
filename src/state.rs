use std::sync::Arc;
use tokio::sync::RwLock;

use crate::clients::{ObjectStoreClient, QueryEngineClient, VectorStoreClient};
use crate::config::Config;
use crate::db::Store;

/// Build a shared HTTP client with reasonable defaults for API calls.
/// Reused across all HTTP-based clients to enable connection pooling and
/// avoid socket exhaustion.
fn build_shared_http_client(timeout_seconds: u64) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_seconds))
        .user_agent("Querydeck/1.0")
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build shared HTTP client: {e}"))
}

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub object_store: Arc<ObjectStoreClient>,

    pub vector_store: Arc<VectorStoreClient>,

    pub query_engine: Arc<QueryEngineClient>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let http_client =
            build_shared_http_client(config.object_store.request_timeout_seconds.into())?;

        // Engine calls run much longer than metadata calls, so they get
        // their own timeout.
        let engine_client =
            build_shared_http_client(config.query_engine.request_timeout_seconds.into())?;

        let object_store = Arc::new(ObjectStoreClient::new(
            http_client.clone(),
            &config.object_store,
        ));
        let vector_store = Arc::new(VectorStoreClient::new(http_client, &config.vector_store));
        let query_engine = Arc::new(QueryEngineClient::new(engine_client, &config.query_engine));

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            store,
            object_store,
            vector_store,
            query_engine,
        })
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }
}
