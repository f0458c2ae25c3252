//! Starpoint reader API client.

use async_trait::async_trait;
use reqwest::header::HeaderValue;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::debug;

use super::{ApiKey, QueryPayload, SearchResponse, VectorStore, VectorStoreSession};
use crate::config::VectorStoreSettings;
use crate::error::{Error, Result};
use crate::telemetry;

/// Header carrying the Starpoint API key.
pub const API_KEY_HEADER: &str = "x-starpoint-key";

/// Query route of the reader API.
pub const QUERY_PATH: &str = "/api/v1/query";

/// Longest downstream error body echoed back to the caller.
const MAX_ERROR_BODY: usize = 1024;

#[derive(Serialize)]
struct QueryBody<'a> {
    collection_name: &'a str,
    sql: Option<&'a str>,
    query_embedding: Option<EmbeddingBody<'a>>,
}

#[derive(Serialize)]
struct EmbeddingBody<'a> {
    values: &'a [f32],
    dimensionality: usize,
}

impl<'a> From<&'a QueryPayload> for QueryBody<'a> {
    fn from(payload: &'a QueryPayload) -> Self {
        Self {
            collection_name: &payload.collection_name,
            sql: payload.sql.as_deref(),
            query_embedding: payload.embedding.as_ref().map(|e| EmbeddingBody {
                values: e.as_slice(),
                dimensionality: e.len(),
            }),
        }
    }
}

/// Connection pool to the Starpoint reader API.
///
/// Holds no credentials; each request gets its own [`StarpointSession`].
#[derive(Debug, Clone)]
pub struct StarpointClient {
    http: reqwest::Client,
    query_url: String,
}

impl StarpointClient {
    /// Build a client from settings.
    pub fn new(settings: &VectorStoreSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .user_agent(concat!("starpoint-search/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            query_url: format!("{}{}", settings.base_url.trim_end_matches('/'), QUERY_PATH),
        })
    }

    /// Full URL queries are posted to.
    pub fn query_url(&self) -> &str {
        &self.query_url
    }
}

impl VectorStore for StarpointClient {
    fn session(&self, api_key: ApiKey) -> Result<Box<dyn VectorStoreSession>> {
        let mut header = HeaderValue::from_str(api_key.expose()).map_err(|_| {
            Error::Validation(
                "starpoint_api_key contains characters not allowed in an HTTP header".into(),
            )
        })?;
        header.set_sensitive(true);

        Ok(Box::new(StarpointSession {
            http: self.http.clone(),
            query_url: self.query_url.clone(),
            api_key: header,
        }))
    }
}

/// Starpoint client bound to one API key.
pub struct StarpointSession {
    http: reqwest::Client,
    query_url: String,
    api_key: HeaderValue,
}

#[async_trait]
impl VectorStoreSession for StarpointSession {
    async fn query(&self, payload: QueryPayload) -> Result<SearchResponse> {
        let body = QueryBody::from(&payload);
        let started = Instant::now();

        let response = self
            .http
            .post(&self.query_url)
            .header(API_KEY_HEADER, self.api_key.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let status = response.status();
        telemetry::record_vector_store_query(started.elapsed(), status.as_u16());
        debug!(status = status.as_u16(), "Starpoint query answered");

        if !status.is_success() {
            let text = match response.text().await {
                Ok(text) => text,
                Err(e) => {
                    debug!(status = status.as_u16(), "Unreadable Starpoint error body: {}", e);
                    String::new()
                }
            };
            let message = if text.trim().is_empty() {
                status.canonical_reason().unwrap_or("no reason given").to_string()
            } else {
                text.chars().take(MAX_ERROR_BODY).collect()
            };
            return Err(Error::Downstream {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<SearchResponse>()
            .await
            .map_err(|e| Error::Transport(format!("Unreadable Starpoint response: {}", e)))
    }
}
