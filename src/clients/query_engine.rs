use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::ClientError;
use crate::config::QueryEngineConfig;

const SERVICE: &str = "query engine";

#[derive(Serialize)]
struct ExecuteRequest<'a> {
    connection: &'a str,
    engine: &'a str,
    question: &'a str,
}

/// Answer from the natural-language-to-SQL engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryAnswer {
    pub answer: String,
    pub generated_query: Option<String>,
    /// Object-store key under which the engine persisted the result set
    pub result_object: Option<String>,
}

#[derive(Clone)]
pub struct QueryEngineClient {
    client: Client,
    endpoint: String,
}

impl QueryEngineClient {
    #[must_use]
    pub fn new(client: Client, config: &QueryEngineConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        }
    }

    pub async fn execute(
        &self,
        connection: &str,
        engine: &str,
        question: &str,
    ) -> Result<QueryAnswer, ClientError> {
        let url = format!("{}/query", self.endpoint);

        let response = self
            .client
            .post(&url)
            .json(&ExecuteRequest {
                connection,
                engine,
                question,
            })
            .send()
            .await
            .map_err(|e| ClientError::http(SERVICE, e))?;

        if !response.status().is_success() {
            return Err(ClientError::from_response(SERVICE, response).await);
        }

        response
            .json::<QueryAnswer>()
            .await
            .map_err(|e| ClientError::Decode {
                service: SERVICE,
                message: e.to_string(),
            })
    }
}
