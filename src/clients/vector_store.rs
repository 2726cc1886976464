use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::ClientError;
use crate::config::VectorStoreConfig;

const SERVICE: &str = "vector store";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldInfo {
    pub name: String,
    pub data_type: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableInfo {
    pub name: String,
    pub skipped: bool,
    pub fields: Vec<FieldInfo>,
}

#[derive(Serialize)]
struct SkipRequest {
    skipped: bool,
}

#[derive(Serialize)]
struct DescriptionRequest<'a> {
    description: &'a str,
}

/// Client for the vector store's table/field metadata surface. Vector
/// search itself happens downstream; this service only edits metadata.
#[derive(Clone)]
pub struct VectorStoreClient {
    client: Client,
    endpoint: String,
}

impl VectorStoreClient {
    #[must_use]
    pub fn new(client: Client, config: &VectorStoreConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        }
    }

    pub async fn list_tables(&self, database_id: i32) -> Result<Vec<TableInfo>, ClientError> {
        let url = format!("{}/databases/{}/tables", self.endpoint, database_id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ClientError::http(SERVICE, e))?;

        if !response.status().is_success() {
            return Err(ClientError::from_response(SERVICE, response).await);
        }

        response
            .json::<Vec<TableInfo>>()
            .await
            .map_err(|e| ClientError::Decode {
                service: SERVICE,
                message: e.to_string(),
            })
    }

    pub async fn set_table_skip(
        &self,
        database_id: i32,
        table: &str,
        skipped: bool,
    ) -> Result<(), ClientError> {
        let url = format!(
            "{}/databases/{}/tables/{}/skip",
            self.endpoint, database_id, table
        );

        let response = self
            .client
            .put(&url)
            .json(&SkipRequest { skipped })
            .send()
            .await
            .map_err(|e| ClientError::http(SERVICE, e))?;

        if !response.status().is_success() {
            return Err(ClientError::from_response(SERVICE, response).await);
        }

        Ok(())
    }

    pub async fn set_field_description(
        &self,
        database_id: i32,
        table: &str,
        field: &str,
        description: &str,
    ) -> Result<(), ClientError> {
        let url = format!(
            "{}/databases/{}/tables/{}/fields/{}",
            self.endpoint, database_id, table, field
        );

        let response = self
            .client
            .put(&url)
            .json(&DescriptionRequest { description })
            .send()
            .await
            .map_err(|e| ClientError::http(SERVICE, e))?;

        if !response.status().is_success() {
            return Err(ClientError::from_response(SERVICE, response).await);
        }

        Ok(())
    }
}
