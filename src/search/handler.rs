//! Search request validation and delegation.

use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, info_span, warn, Instrument};

use super::{EmbeddingVector, QueryEncoder};
use crate::error::{Error, Result};
use crate::store::{ApiKey, QueryPayload, SearchResponse, VectorStore, VectorStoreSession};
use crate::telemetry;

/// Incoming search request, as sent by clients.
///
/// Required fields are optional at the serde level so that a missing field
/// surfaces as a validation error rather than a body rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchRequest {
    /// Starpoint credential
    #[serde(rename = "starpoint_api_key", default)]
    pub api_key: Option<ApiKey>,
    /// Collection to query
    #[serde(rename = "starpoint_collection_name", default)]
    pub collection_name: Option<String>,
    /// Free text to embed
    #[serde(rename = "query_to_embed", default)]
    pub query_text: Option<String>,
    /// SQL-like filter
    #[serde(rename = "sql", default)]
    pub filter_expression: Option<String>,
}

/// A request that passed validation.
#[derive(Debug, Clone)]
pub struct ValidatedSearch {
    /// Credential for this request's session
    pub api_key: ApiKey,
    /// Non-blank collection name
    pub collection_name: String,
    /// Text to embed, if any
    pub query_text: Option<String>,
    /// Filter, `None` when absent or blank
    pub filter_expression: Option<String>,
}

impl SearchRequest {
    /// Check required fields and normalize the filter.
    pub fn validate(self) -> Result<ValidatedSearch> {
        let api_key = self
            .api_key
            .filter(|key| !key.is_blank())
            .ok_or_else(|| Error::Validation("starpoint_api_key is required".into()))?;
        let collection_name = self
            .collection_name
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| Error::Validation("starpoint_collection_name is required".into()))?;
        let filter_expression = self.filter_expression.filter(|sql| !sql.trim().is_empty());

        Ok(ValidatedSearch {
            api_key,
            collection_name,
            query_text: self.query_text,
            filter_expression,
        })
    }
}

/// Turns search requests into vector store queries.
///
/// Holds the shared encoder and store; per-request state lives only on the
/// stack of [`SearchHandler::handle`].
#[derive(Clone)]
pub struct SearchHandler {
    encoder: Arc<dyn QueryEncoder>,
    store: Arc<dyn VectorStore>,
}

impl SearchHandler {
    /// Create a handler over an encoder and a vector store.
    pub fn new(encoder: Arc<dyn QueryEncoder>, store: Arc<dyn VectorStore>) -> Self {
        Self { encoder, store }
    }

    /// The shared encoder.
    pub fn encoder(&self) -> &Arc<dyn QueryEncoder> {
        &self.encoder
    }

    /// Validate, optionally encode, query, and return the store's response.
    pub async fn handle(&self, request: SearchRequest) -> Result<SearchResponse> {
        let result = match request.validate() {
            Ok(search) => {
                let span = info_span!(
                    "search",
                    request_id = %uuid::Uuid::new_v4(),
                    collection = %search.collection_name,
                    has_text = search.query_text.is_some(),
                    has_filter = search.filter_expression.is_some()
                );
                self.execute(search).instrument(span).await
            }
            Err(e) => Err(e),
        };

        match &result {
            Ok(_) => telemetry::record_search("ok"),
            Err(e) => {
                warn!(kind = e.kind(), "Search failed: {}", e);
                telemetry::record_search(e.kind());
            }
        }
        result
    }

    async fn execute(&self, search: ValidatedSearch) -> Result<SearchResponse> {
        // Key checks run here, ahead of any inference
        let session = self.store.session(search.api_key)?;

        let embedding = match search.query_text {
            Some(text) => Some(self.encode(text).await?),
            None => None,
        };

        let payload = QueryPayload {
            collection_name: search.collection_name,
            sql: search.filter_expression,
            embedding,
        };

        let response = session.query(payload).await?;
        info!("Search completed");
        Ok(response)
    }

    /// Run the encoder on the blocking pool so inference does not hold up
    /// other requests on the async workers.
    async fn encode(&self, text: String) -> Result<EmbeddingVector> {
        let encoder = Arc::clone(&self.encoder);
        let started = Instant::now();

        let embedding = tokio::task::spawn_blocking(move || encoder.encode(&text))
            .await
            .map_err(|e| Error::Encoding(format!("Inference task failed: {}", e)))??;

        telemetry::record_encoding(started.elapsed());
        Ok(embedding)
    }
}
