//! Inference device selection.
//!
//! The device is resolved once when the encoder is built. Without the `cuda`
//! feature every preference resolves to the CPU.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Requested device, as written in the config file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DevicePreference {
    /// CUDA device 0 when available, otherwise CPU
    #[default]
    Auto,
    /// Always CPU
    Cpu,
    /// A specific CUDA device, falling back to CPU when unavailable
    Cuda(i32),
}

impl FromStr for DevicePreference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value = s.trim().to_ascii_lowercase();
        match value.as_str() {
            "auto" | "" => Ok(DevicePreference::Auto),
            "cpu" => Ok(DevicePreference::Cpu),
            "cuda" | "gpu" => Ok(DevicePreference::Cuda(0)),
            other => other
                .strip_prefix("cuda:")
                .and_then(|id| id.parse::<i32>().ok())
                .filter(|id| *id >= 0)
                .map(DevicePreference::Cuda)
                .ok_or_else(|| {
                    Error::Config(format!(
                        "unknown device '{}', expected auto, cpu, cuda or cuda:<id>",
                        s
                    ))
                }),
        }
    }
}

/// Device the encoder actually runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeDevice {
    /// General-purpose CPU execution
    Cpu,
    /// CUDA execution on the given device id
    Cuda(i32),
}

impl fmt::Display for ComputeDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComputeDevice::Cpu => write!(f, "cpu"),
            ComputeDevice::Cuda(id) => write!(f, "cuda:{}", id),
        }
    }
}

impl ComputeDevice {
    /// Resolve a preference against the accelerators present on this host.
    pub fn resolve(preference: DevicePreference) -> ComputeDevice {
        Self::resolve_with(preference, cuda_available)
    }

    /// Resolve a preference, asking `usable` whether a CUDA device id can host
    /// the model.
    pub fn resolve_with(
        preference: DevicePreference,
        usable: impl Fn(i32) -> bool,
    ) -> ComputeDevice {
        match preference {
            DevicePreference::Cpu => ComputeDevice::Cpu,
            DevicePreference::Auto => {
                if usable(0) {
                    ComputeDevice::Cuda(0)
                } else {
                    ComputeDevice::Cpu
                }
            }
            DevicePreference::Cuda(id) => {
                if usable(id) {
                    ComputeDevice::Cuda(id)
                } else {
                    tracing::warn!(
                        "CUDA device {} requested but not available, falling back to CPU",
                        id
                    );
                    ComputeDevice::Cpu
                }
            }
        }
    }

    /// ONNX Runtime execution providers for this device.
    #[cfg(feature = "cuda")]
    pub fn execution_providers(&self) -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
        use ort::execution_providers::CUDAExecutionProvider;

        match self {
            ComputeDevice::Cpu => Vec::new(),
            ComputeDevice::Cuda(id) => vec![CUDAExecutionProvider::default()
                .with_device_id(*id)
                .build()
                .error_on_failure()],
        }
    }
}

/// Whether ONNX Runtime can create a CUDA provider on `device_id`.
///
/// `is_available` only reports that the runtime was built with CUDA, so the
/// provider is also registered on a scratch session builder. Registration
/// fails when no GPU is present or the id is out of range.
#[cfg(feature = "cuda")]
fn cuda_available(device_id: i32) -> bool {
    use ort::execution_providers::{CUDAExecutionProvider, ExecutionProvider};
    use ort::session::Session;

    let provider = CUDAExecutionProvider::default().with_device_id(device_id);
    if !provider.is_available().unwrap_or(false) {
        return false;
    }

    let registered = Session::builder().and_then(|builder| provider.register(&builder));
    if let Err(e) = &registered {
        tracing::debug!("CUDA device {} rejected by ONNX Runtime: {}", device_id, e);
    }
    registered.is_ok()
}

#[cfg(not(feature = "cuda"))]
fn cuda_available(_device_id: i32) -> bool {
    false
}
