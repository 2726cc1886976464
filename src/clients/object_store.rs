use bytes::Bytes;
use reqwest::Client;

use super::ClientError;
use crate::config::ObjectStoreConfig;

const SERVICE: &str = "object store";

/// Fetches named objects from the configured bucket. Path-style access,
/// the only operation this service consumes.
#[derive(Clone)]
pub struct ObjectStoreClient {
    client: Client,
    endpoint: String,
    bucket: String,
}

impl ObjectStoreClient {
    #[must_use]
    pub fn new(client: Client, config: &ObjectStoreConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            bucket: config.bucket.clone(),
        }
    }

    pub async fn fetch_object(&self, key: &str) -> Result<Option<Bytes>, ClientError> {
        let url = format!("{}/{}/{}", self.endpoint, self.bucket, key);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ClientError::http(SERVICE, e))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(ClientError::from_response(SERVICE, response).await);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::http(SERVICE, e))?;

        Ok(Some(bytes))
    }
}
