//! CLI command definitions and handlers.

pub mod labels;
pub mod poll;
pub mod relay;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use classcast_core::inference::{select_device, ConvClassifier, DevicePreference, ModelDescriptor};
use classcast_core::{DispatchContext, LabelSet, LABELS_ENV};
use tracing::info;

use crate::config::AppConfig;

/// Classcast - image classification dispatch daemons
#[derive(Parser)]
#[command(name = "classcast")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Watch a directory and classify incoming image files
    Poll(poll::PollArgs),
    /// Serve classification requests over redis pub/sub
    Relay(relay::RelayArgs),
    /// Print the resolved label list
    Labels(labels::LabelsArgs),
}

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Clean exit.
    Success = 0,
    /// Startup or runtime failure.
    Error = 1,
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        Self::from(code as u8)
    }
}

/// Parse and validate a top-k value (at least 1).
fn parse_top_k(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid count"))?;
    if value >= 1 {
        Ok(value)
    } else {
        Err(String::from("top-k must be at least 1"))
    }
}

/// Resolves the label set from the highest-priority source present: the
/// `--labels` flag, then the `CLASSCAST_LABELS` environment variable, then
/// the config file.
///
/// # Errors
///
/// Returns an error if no source is set or the winning source is invalid.
pub fn resolve_labels(flag: Option<&str>, from_config: Option<&str>) -> Result<LabelSet> {
    let spec = flag
        .map(str::to_owned)
        .or_else(|| std::env::var(LABELS_ENV).ok())
        .or_else(|| from_config.map(str::to_owned))
        .ok_or_else(|| {
            anyhow!("No labels configured (use --labels, {LABELS_ENV} or a config file)")
        })?;
    LabelSet::resolve(&spec)
}

/// Model and label arguments shared by both drivers.
#[derive(Args, Clone)]
pub struct ModelArgs {
    /// Model weights file (safetensors)
    #[arg(short, long, value_name = "FILE")]
    pub model: Option<PathBuf>,

    /// Model descriptor (TOML: input geometry, color mode, layer widths)
    #[arg(long, value_name = "FILE")]
    pub model_config: Option<PathBuf>,

    /// Class labels: inline comma-separated list, or a path to a label file
    #[arg(short, long, value_name = "LABELS")]
    pub labels: Option<String>,

    /// Compute device (auto, cpu or cuda)
    #[arg(long, value_name = "DEVICE")]
    pub device: Option<DevicePreference>,

    /// Keep only the N highest-scoring labels in each result
    #[arg(long, value_name = "N", value_parser = parse_top_k)]
    pub top_k: Option<usize>,

    /// Merged config (populated by `with_config`, not from CLI).
    #[arg(skip)]
    config: Option<AppConfig>,
}

impl ModelArgs {
    /// Apply configuration file values, respecting CLI precedence.
    pub fn with_config(mut args: Self, config: &AppConfig) -> Self {
        if args.model.is_none() {
            args.model.clone_from(&config.model.path);
        }
        if args.model_config.is_none() {
            args.model_config.clone_from(&config.model.config);
        }
        if args.device.is_none() {
            args.device = config.device_preference();
        }
        if args.top_k.is_none() {
            args.top_k = config.output.top_k.filter(|k| *k >= 1);
        }

        args.config = Some(config.clone());
        args
    }

    fn config_labels(&self) -> Option<&str> {
        self.config
            .as_ref()
            .and_then(|c| c.labels.source.as_deref())
    }

    /// Builds the dispatch context both drivers share: resolved labels, the
    /// loaded model on its device, and output shaping.
    ///
    /// # Errors
    ///
    /// Returns an error if labels, the descriptor or the weights cannot be
    /// resolved, or the label count does not match the model's output width.
    pub fn build_context(&self) -> Result<DispatchContext> {
        let labels = resolve_labels(self.labels.as_deref(), self.config_labels())?;

        let weights = self
            .model
            .as_deref()
            .context("No model file configured (use --model or the config file)")?;
        let descriptor_path = self
            .model_config
            .as_deref()
            .context("No model descriptor configured (use --model-config or the config file)")?;

        let descriptor = ModelDescriptor::load(descriptor_path)?;
        let device = select_device(self.device.unwrap_or_default())?;

        info!(
            "Loading model {} for {} labels",
            weights.display(),
            labels.len()
        );
        let classifier = ConvClassifier::load(weights, descriptor, device, labels.len())?;

        Ok(DispatchContext::new(
            Box::new(classifier),
            labels,
            self.top_k,
        ))
    }
}
