//! Narrow HTTP clients for the external data planes. Each client owns a
//! small surface over one collaborator; failures carry the service name
//! and the downstream body so handlers can surface them verbatim.

pub mod object_store;
pub mod query_engine;
pub mod results;
pub mod vector_store;

use thiserror::Error;

pub use object_store::ObjectStoreClient;
pub use query_engine::{QueryAnswer, QueryEngineClient};
pub use results::{ColumnInfo, JsonResultDecoder, ResultDecoder, ResultTable};
pub use vector_store::{FieldInfo, TableInfo, VectorStoreClient};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{service} request failed: {source}")]
    Http {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} returned {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Failed to decode {service} response: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },
}

impl ClientError {
    pub(crate) fn http(service: &'static str, source: reqwest::Error) -> Self {
        Self::Http { service, source }
    }

    pub(crate) async fn from_response(
        service: &'static str,
        response: reqwest::Response,
    ) -> Self {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Self::Status {
            service,
            status,
            body,
        }
    }
}
