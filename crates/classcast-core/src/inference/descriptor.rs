//! Model descriptor: the TOML sidecar describing a network's geometry.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

/// Color handling for the input tensor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Three input channels, RGB order.
    #[default]
    Rgb,
    /// One grayscale channel.
    Luma,
}

/// Layer widths of the network head.
#[derive(Debug, Clone, Deserialize)]
pub struct HeadConfig {
    /// Output channels of each conv stage, in order.
    pub conv_channels: Vec<usize>,
    /// Width of the hidden fully-connected layer.
    pub hidden: usize,
}

/// Describes the architecture a set of weights was trained for: input
/// geometry, normalization, conv stage widths and the hidden layer size.
///
/// Every conv stage is 3x3 with padding 1, followed by ReLU and 2x2 max
/// pooling, so each stage halves the spatial dimensions (integer floor).
#[derive(Debug, Clone, Deserialize)]
pub struct ModelDescriptor {
    pub input_width: usize,
    pub input_height: usize,
    #[serde(default)]
    pub color: ColorMode,
    /// Per-channel mean subtracted after scaling to `[0, 1]`.
    #[serde(default)]
    pub mean: Option<Vec<f32>>,
    /// Per-channel divisor applied after mean subtraction.
    #[serde(default)]
    pub std: Option<Vec<f32>>,
    pub head: HeadConfig,
}

impl ModelDescriptor {
    /// Loads and validates a descriptor from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML, or
    /// describes a geometry that cannot produce a network.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model descriptor: {}", path.display()))?;
        let descriptor: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse model descriptor: {}", path.display()))?;
        descriptor
            .validate()
            .with_context(|| format!("Invalid model descriptor: {}", path.display()))?;
        Ok(descriptor)
    }

    /// Number of input channels implied by the color mode.
    #[must_use]
    pub fn channels(&self) -> usize {
        match self.color {
            ColorMode::Rgb => 3,
            ColorMode::Luma => 1,
        }
    }

    /// Flattened feature length after the final conv stage.
    #[must_use]
    pub fn feature_len(&self) -> usize {
        let (w, h) = self.pooled_dims();
        self.head.conv_channels.last().copied().unwrap_or(0) * w * h
    }

    /// Spatial dimensions after every pooling stage has run.
    fn pooled_dims(&self) -> (usize, usize) {
        let stages = u32::try_from(self.head.conv_channels.len()).unwrap_or(u32::MAX);
        (
            self.input_width.checked_shr(stages).unwrap_or(0),
            self.input_height.checked_shr(stages).unwrap_or(0),
        )
    }

    /// Rejects geometry the network constructor could not realize.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first inconsistency found.
    pub fn validate(&self) -> Result<()> {
        if self.input_width == 0 || self.input_height == 0 {
            bail!("input dimensions must be positive");
        }
        if self.head.conv_channels.is_empty() {
            bail!("at least one conv stage is required");
        }
        if self.head.conv_channels.iter().any(|&c| c == 0) {
            bail!("conv channel counts must be positive");
        }
        if self.head.hidden == 0 {
            bail!("hidden layer width must be positive");
        }

        let (w, h) = self.pooled_dims();
        if w == 0 || h == 0 {
            bail!(
                "{} conv stages pool a {}x{} input away to nothing",
                self.head.conv_channels.len(),
                self.input_width,
                self.input_height
            );
        }

        for (name, values) in [("mean", &self.mean), ("std", &self.std)] {
            if let Some(values) = values {
                if values.len() != self.channels() {
                    bail!(
                        "{name} must have {} entries, got {}",
                        self.channels(),
                        values.len()
                    );
                }
            }
        }
        if let Some(std) = &self.std {
            if std.iter().any(|&s| s == 0.0) {
                bail!("std entries must be non-zero");
            }
        }

        Ok(())
    }

    /// Per-channel normalization, defaulting to mean 0 and std 1.
    #[must_use]
    pub fn normalization(&self) -> (Vec<f32>, Vec<f32>) {
        let channels = self.channels();
        let mean = self.mean.clone().unwrap_or_else(|| vec![0.0; channels]);
        let std = self.std.clone().unwrap_or_else(|| vec![1.0; channels]);
        (mean, std)
    }
}
