//! Poll command - watch a directory and classify incoming image files.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use classcast_adapters::{FsSpool, PollDriver, PollOptions};

use super::ModelArgs;
use crate::config::AppConfig;

/// Hardcoded default values for the polling loop.
mod defaults {
    pub const INTERVAL_SECS: f64 = 1.0;
    pub const MAX_FAILURES: u32 = 3;
}

/// Parse and validate a polling interval in seconds (> 0).
fn parse_interval(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(format!("{value} is not a positive interval"))
    }
}

/// Parse and validate a retry limit (at least 1).
fn parse_max_failures(s: &str) -> Result<u32, String> {
    let value: u32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid count"))?;
    if value >= 1 {
        Ok(value)
    } else {
        Err(String::from("max-failures must be at least 1"))
    }
}

/// Arguments for the poll command.
#[derive(Args, Clone)]
pub struct PollArgs {
    /// Directory watched for incoming images
    #[arg(short, long, value_name = "DIR")]
    pub input: PathBuf,

    /// Directory results are written to
    #[arg(short, long, value_name = "DIR")]
    pub output: PathBuf,

    /// Stage results here, then rename them into the output directory
    #[arg(long, value_name = "DIR")]
    pub tmp: Option<PathBuf>,

    /// Directory for inputs that keep failing (default: <input>/failed)
    #[arg(long, value_name = "DIR")]
    pub quarantine: Option<PathBuf>,

    /// Seconds between directory scans
    #[arg(long, value_name = "SECS", value_parser = parse_interval)]
    pub interval: Option<f64>,

    /// Attempts per file before it is quarantined
    #[arg(long, value_name = "N", value_parser = parse_max_failures)]
    pub max_failures: Option<u32>,

    /// Delete inputs after success instead of moving them to the output dir
    #[arg(long)]
    pub delete_input: bool,

    /// Pretty-print result JSON
    #[arg(long)]
    pub pretty: bool,

    /// Exit once the watched directory has no pending work
    #[arg(long)]
    pub drain: bool,

    #[command(flatten)]
    pub model: ModelArgs,
}

impl PollArgs {
    /// Apply configuration file values, respecting CLI precedence.
    pub fn with_config(mut args: Self, config: &AppConfig) -> Self {
        // Values the config validator warned about are left unused.
        if args.interval.is_none() {
            args.interval = config.poll.interval.filter(|i| i.is_finite() && *i > 0.0);
        }
        if args.max_failures.is_none() {
            args.max_failures = config.poll.max_failures.filter(|m| *m >= 1);
        }
        if !args.delete_input {
            args.delete_input = config.poll.delete_input.unwrap_or(false);
        }
        if !args.pretty {
            args.pretty = config.poll.pretty.unwrap_or(false);
        }

        args.model = ModelArgs::with_config(args.model, config);
        args
    }

    /// Get the polling interval with fallback to the hardcoded default.
    fn interval(&self) -> Duration {
        Duration::from_secs_f64(self.interval.unwrap_or(defaults::INTERVAL_SECS))
    }

    /// Get the retry limit with fallback to the hardcoded default.
    fn max_failures(&self) -> u32 {
        self.max_failures.unwrap_or(defaults::MAX_FAILURES)
    }
}

/// Run the poll command.
///
/// # Errors
///
/// Returns an error if the directories or the model cannot be set up.
pub fn run(args: &PollArgs) -> Result<()> {
    let config = AppConfig::load();
    let args = PollArgs::with_config(args.clone(), &config);

    let spool = FsSpool::new(
        args.input.clone(),
        args.output.clone(),
        args.tmp.clone(),
        args.quarantine.clone(),
    )?;
    let ctx = args.model.build_context()?;

    let options = PollOptions {
        interval: args.interval(),
        max_failures: args.max_failures(),
        delete_input: args.delete_input,
        pretty: args.pretty,
        drain: args.drain,
    };

    PollDriver::new(&ctx, spool, options).run();
    Ok(())
}
