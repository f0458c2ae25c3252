//! FastEmbed-backed query encoder.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tracing::{debug, info, warn};

use super::{ComputeDevice, EmbeddingVector, QueryEncoder};
use crate::config::EncoderSettings;
use crate::error::{Error, Result};

/// Text encoders the gateway knows how to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderModel {
    /// Text branch of CLIP ViT-B/32, shares its space with CLIP image vectors
    ClipVitB32,
}

impl EncoderModel {
    /// Canonical name used in config files and health output.
    pub fn name(&self) -> &'static str {
        match self {
            EncoderModel::ClipVitB32 => "clip-ViT-B-32",
        }
    }

    /// Output dimensionality.
    pub fn dimension(&self) -> usize {
        match self {
            EncoderModel::ClipVitB32 => 512,
        }
    }

    fn fastembed_model(&self) -> EmbeddingModel {
        match self {
            EncoderModel::ClipVitB32 => EmbeddingModel::ClipVitB32,
        }
    }
}

impl fmt::Display for EncoderModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EncoderModel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clip-vit-b-32" | "vit-b/32" | "clip" => Ok(EncoderModel::ClipVitB32),
            _ => Err(Error::Config(format!("unsupported encoder model '{}'", s))),
        }
    }
}

/// Query encoder running an ONNX text model through FastEmbed.
///
/// The model session is created once and only read afterwards, so one
/// instance can be shared by every request.
pub struct FastEmbedEncoder {
    model: TextEmbedding,
    kind: EncoderModel,
    device: ComputeDevice,
}

impl FastEmbedEncoder {
    /// Load the configured model, downloading it on first use.
    ///
    /// If the model cannot be placed on the resolved CUDA device it is loaded
    /// on the CPU instead.
    pub fn new(settings: &EncoderSettings) -> Result<Self> {
        let kind: EncoderModel = settings.model.parse()?;
        let device = ComputeDevice::resolve(settings.device_preference()?);
        info!("Loading {} text encoder on {}", kind, device);

        let (model, device) = match Self::load(kind, settings, device) {
            Ok(model) => (model, device),
            Err(e) if device != ComputeDevice::Cpu => {
                warn!("Could not load {} on {} ({}), falling back to CPU", kind, device, e);
                (Self::load(kind, settings, ComputeDevice::Cpu)?, ComputeDevice::Cpu)
            }
            Err(e) => return Err(e),
        };

        Ok(Self {
            model,
            kind,
            device,
        })
    }

    fn load(
        kind: EncoderModel,
        settings: &EncoderSettings,
        device: ComputeDevice,
    ) -> Result<TextEmbedding> {
        let mut options = InitOptions::new(kind.fastembed_model())
            .with_show_download_progress(settings.show_download_progress);
        if let Some(dir) = &settings.cache_dir {
            options = options.with_cache_dir(PathBuf::from(dir));
        }
        #[cfg(feature = "cuda")]
        {
            options = options.with_execution_providers(device.execution_providers());
        }
        #[cfg(not(feature = "cuda"))]
        let _ = device;

        TextEmbedding::try_new(options)
            .map_err(|e| Error::Encoding(format!("Failed to load {}: {}", kind, e)))
    }

    /// Which model is loaded.
    pub fn kind(&self) -> EncoderModel {
        self.kind
    }
}

impl QueryEncoder for FastEmbedEncoder {
    fn encode(&self, text: &str) -> Result<EmbeddingVector> {
        debug!(chars = text.chars().count(), "Encoding query text");

        let mut batch = self
            .model
            .embed(vec![text], None)
            .map_err(|e| Error::Encoding(format!("Inference failed: {}", e)))?;
        let raw = batch
            .pop()
            .ok_or_else(|| Error::Encoding("model returned no embedding".into()))?;

        if raw.len() != self.kind.dimension() {
            return Err(Error::Encoding(format!(
                "expected {} dimensions from {}, got {}",
                self.kind.dimension(),
                self.kind,
                raw.len()
            )));
        }
        EmbeddingVector::from_raw(raw)
    }

    fn dimension(&self) -> usize {
        self.kind.dimension()
    }

    fn device(&self) -> ComputeDevice {
        self.device
    }

    fn model_name(&self) -> &str {
        self.kind.name()
    }
}
