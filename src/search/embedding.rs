//! Embedding vectors and the encoder seam.

use serde::{Deserialize, Serialize};

use super::ComputeDevice;
use crate::error::{Error, Result};

/// An L2-normalized query embedding.
///
/// Only constructed through [`EmbeddingVector::from_raw`], so every value of
/// this type has unit Euclidean norm.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EmbeddingVector(Vec<f32>);

impl EmbeddingVector {
    /// Normalize a raw model output into an embedding.
    pub fn from_raw(mut raw: Vec<f32>) -> Result<Self> {
        if raw.is_empty() {
            return Err(Error::Encoding("model produced an empty vector".into()));
        }
        l2_normalize(&mut raw)?;
        Ok(Self(raw))
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the vector has no components.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Euclidean norm (1.0 up to rounding).
    pub fn norm(&self) -> f32 {
        euclidean_norm(&self.0)
    }

    /// Borrow the components.
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Take ownership of the components.
    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }
}

fn euclidean_norm(values: &[f32]) -> f32 {
    values
        .iter()
        .map(|v| f64::from(*v) * f64::from(*v))
        .sum::<f64>()
        .sqrt() as f32
}

/// Divide `values` by their Euclidean norm in place.
///
/// Fails when the norm is zero or not finite, since such a vector has no
/// direction to preserve.
pub fn l2_normalize(values: &mut [f32]) -> Result<()> {
    let norm = euclidean_norm(values);
    if !norm.is_finite() || norm == 0.0 {
        return Err(Error::Encoding(format!(
            "cannot normalize vector with norm {}",
            norm
        )));
    }
    for v in values.iter_mut() {
        *v /= norm;
    }
    Ok(())
}

/// Static description of a loaded encoder, reported by `/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderDescriptor {
    /// Model name
    pub model: String,
    /// Device inference runs on
    pub device: String,
    /// Output dimensionality
    pub dimension: usize,
}

/// Text to unit-vector encoder.
///
/// Implementations are built once at startup and shared read-only between
/// requests; `encode` may block for the duration of a forward pass.
pub trait QueryEncoder: Send + Sync {
    /// Encode `text` into a normalized embedding.
    fn encode(&self, text: &str) -> Result<EmbeddingVector>;

    /// Output dimensionality.
    fn dimension(&self) -> usize;

    /// Device inference runs on.
    fn device(&self) -> ComputeDevice;

    /// Model name.
    fn model_name(&self) -> &str;

    /// Summary for health reporting.
    fn descriptor(&self) -> EncoderDescriptor {
        EncoderDescriptor {
            model: self.model_name().to_string(),
            device: self.device().to_string(),
            dimension: self.dimension(),
        }
    }
}
