//! Query-to-vector search pipeline.
//!
//! Turns an incoming search request into a Starpoint query:
//! - CLIP text encoder (FastEmbed, ONNX-based) for query embeddings
//! - Request validation and filter normalisation
//! - Delegation to a per-request vector store session
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌────────────────┐
//! │  SearchRequest  │────▶│ SearchHandler  │
//! │  (JSON body)    │     │  (validation)  │
//! └─────────────────┘     └───────┬────────┘
//!                                 │ query_to_embed?
//!                                 ▼
//!                         ┌──────────────┐
//!                         │ QueryEncoder │
//!                         │  [f32; 512]  │
//!                         └──────┬───────┘
//!                                │
//!                                ▼
//!                       ┌────────────────┐
//!                       │  QueryPayload  │
//!                       │ (sql, vector)  │
//!                       └───────┬────────┘
//!                               │
//!                               ▼
//!                       ┌────────────────┐
//!                       │   Starpoint    │
//!                       │  (verbatim)    │
//!                       └────────────────┘
//! ```

mod device;
mod embedding;
mod encoder;
mod handler;

pub use device::{ComputeDevice, DevicePreference};
pub use embedding::{l2_normalize, EmbeddingVector, EncoderDescriptor, QueryEncoder};
pub use encoder::{EncoderModel, FastEmbedEncoder};
pub use handler::{SearchHandler, SearchRequest, ValidatedSearch};

/// Default embedding model (CLIP ViT-B/32 text branch - 512 dimensions)
pub const DEFAULT_MODEL: &str = "clip-ViT-B-32";

/// Embedding dimension for the default model
pub const EMBEDDING_DIM: usize = 512;

/// Tolerance used when checking that a vector has unit norm
pub const NORM_TOLERANCE: f32 = 1e-5;
