//! Starpoint search gateway.
//!
//! Exposes one search endpoint that embeds a natural-language query with a
//! CLIP text encoder and forwards it, with an optional SQL filter, to a
//! Starpoint collection. The store's response is returned unchanged.

pub mod api;
pub mod config;
pub mod error;
pub mod search;
pub mod store;
pub mod telemetry;

pub use api::{ApiServer, AppState, HealthResponse};
pub use config::{
    ApiSettings, EncoderSettings, GatewayConfig, MetricsSettings, VectorStoreSettings,
};
pub use error::{Error, Result};
pub use search::{
    ComputeDevice, DevicePreference, EmbeddingVector, EncoderDescriptor, EncoderModel,
    FastEmbedEncoder, QueryEncoder, SearchHandler, SearchRequest, EMBEDDING_DIM,
};
pub use store::{
    ApiKey, QueryPayload, SearchResponse, StarpointClient, VectorStore, VectorStoreSession,
};
pub use telemetry::MetricsService;
