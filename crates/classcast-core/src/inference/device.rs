//! Device selection for inference.

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use candle_core::Device;
use tracing::info;

/// Which compute device the user asked for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DevicePreference {
    /// Use an accelerator when one answers, otherwise CPU.
    #[default]
    Auto,
    Cpu,
    /// Require CUDA; fail startup when it is unavailable.
    Cuda,
}

impl FromStr for DevicePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "cuda" => Ok(Self::Cuda),
            other => Err(format!("unknown device '{other}' (expected auto, cpu or cuda)")),
        }
    }
}

impl fmt::Display for DevicePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Auto => "auto",
            Self::Cpu => "cpu",
            Self::Cuda => "cuda",
        };
        f.write_str(name)
    }
}

/// Resolves a device preference against what this build can actually use.
///
/// `Auto` probes accelerators (Metal on macOS, CUDA elsewhere) and falls
/// back to CPU. `Cuda` is strict: when the feature is compiled out or no
/// device answers, startup fails instead of silently running on CPU.
///
/// # Errors
///
/// Returns an error when CUDA is requested but unavailable.
pub fn select_device(preference: DevicePreference) -> Result<Device> {
    match preference {
        DevicePreference::Cpu => {
            info!("Using CPU for inference");
            Ok(Device::Cpu)
        }
        DevicePreference::Cuda => new_cuda(),
        DevicePreference::Auto => Ok(auto_device()),
    }
}

#[cfg(feature = "cuda")]
fn new_cuda() -> Result<Device> {
    use anyhow::Context;
    let device = Device::new_cuda(0).context("CUDA requested but no device answered")?;
    info!("Using CUDA device for inference");
    Ok(device)
}

#[cfg(not(feature = "cuda"))]
fn new_cuda() -> Result<Device> {
    anyhow::bail!("CUDA requested but this build has no CUDA support")
}

fn auto_device() -> Device {
    #[cfg(feature = "metal")]
    {
        if let Ok(device) = Device::new_metal(0) {
            info!("Using Metal device for inference");
            return device;
        }
    }

    #[cfg(feature = "cuda")]
    {
        if let Ok(device) = Device::new_cuda(0) {
            info!("Using CUDA device for inference");
            return device;
        }
    }

    info!("Using CPU for inference");
    Device::Cpu
}
