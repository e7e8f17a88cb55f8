//! Labels command - print the resolved label list.

use anyhow::Result;
use clap::Args;

use super::resolve_labels;
use crate::config::AppConfig;

/// Arguments for the labels command.
#[derive(Args, Clone)]
pub struct LabelsArgs {
    /// Class labels: inline comma-separated list, or a path to a label file
    #[arg(short, long, value_name = "LABELS")]
    pub labels: Option<String>,
}

/// Run the labels command. Resolves labels exactly as the drivers would,
/// so a deployment's label config can be checked without loading a model.
///
/// # Errors
///
/// Returns an error if no label source is set or it is invalid.
pub fn run(args: &LabelsArgs) -> Result<()> {
    let config = AppConfig::load();
    let labels = resolve_labels(args.labels.as_deref(), config.labels.source.as_deref())?;

    println!("{} labels", labels.len());
    for label in labels.iter() {
        println!("  {label}");
    }

    Ok(())
}
