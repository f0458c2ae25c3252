//! Vector store client seam.
//!
//! A [`VectorStore`] hands out one [`VectorStoreSession`] per request, bound
//! to that request's API key. Sessions are dropped when the request ends.

mod starpoint;

pub use starpoint::{StarpointClient, StarpointSession, API_KEY_HEADER, QUERY_PATH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;
use crate::search::EmbeddingVector;

/// Opaque vector store response, returned to the caller unchanged.
pub type SearchResponse = serde_json::Value;

/// Vector store credential.
///
/// `Debug` and `Display` are redacted so the key cannot leak through logs or
/// error messages.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a raw key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw key, for building the outbound request only.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// True when the key is empty or whitespace.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Everything the vector store needs to run one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryPayload {
    /// Target collection
    pub collection_name: String,
    /// Filter expression; `None` means unfiltered
    pub sql: Option<String>,
    /// Query vector; `None` means no similarity ranking
    pub embedding: Option<EmbeddingVector>,
}

/// Factory for per-request vector store sessions.
pub trait VectorStore: Send + Sync {
    /// Open a session authenticated with `api_key`.
    ///
    /// Called before the query text is encoded, so a key the store cannot
    /// use is rejected with [`Error::Validation`](crate::error::Error) first.
    fn session(&self, api_key: ApiKey) -> Result<Box<dyn VectorStoreSession>>;
}

/// An authenticated, single-request view of the vector store.
#[async_trait]
pub trait VectorStoreSession: Send + Sync {
    /// Run the query and return the store's response as-is.
    async fn query(&self, payload: QueryPayload) -> Result<SearchResponse>;
}
