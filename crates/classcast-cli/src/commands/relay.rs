//! Relay command - serve classification requests over redis pub/sub.

use anyhow::{bail, Context, Result};
use clap::Args;
use classcast_adapters::{RedisRelay, RelayOptions};

use super::ModelArgs;
use crate::config::AppConfig;

/// Hardcoded default values for the redis connection.
mod defaults {
    pub const HOST: &str = "localhost";
    pub const PORT: u16 = 6379;
    pub const DB: i64 = 0;
}

/// Arguments for the relay command.
#[derive(Args, Clone)]
pub struct RelayArgs {
    /// Redis host
    #[arg(short = 'H', long, value_name = "HOST")]
    pub host: Option<String>,

    /// Redis port
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Redis database index
    #[arg(long, value_name = "DB")]
    pub db: Option<i64>,

    /// Channel image payloads arrive on
    #[arg(long, value_name = "CHANNEL")]
    pub channel_in: Option<String>,

    /// Channel results are published to
    #[arg(long, value_name = "CHANNEL")]
    pub channel_out: Option<String>,

    #[command(flatten)]
    pub model: ModelArgs,
}

impl RelayArgs {
    /// Apply configuration file values, respecting CLI precedence.
    pub fn with_config(mut args: Self, config: &AppConfig) -> Self {
        if args.host.is_none() {
            args.host.clone_from(&config.relay.host);
        }
        if args.port.is_none() {
            args.port = config.relay.port;
        }
        if args.db.is_none() {
            args.db = config.relay.db;
        }
        if args.channel_in.is_none() {
            args.channel_in.clone_from(&config.relay.channel_in);
        }
        if args.channel_out.is_none() {
            args.channel_out.clone_from(&config.relay.channel_out);
        }

        args.model = ModelArgs::with_config(args.model, config);
        args
    }

    fn options(&self) -> Result<RelayOptions> {
        let channel_in = self
            .channel_in
            .clone()
            .context("No inbound channel configured (use --channel-in or the config file)")?;
        let channel_out = self
            .channel_out
            .clone()
            .context("No outbound channel configured (use --channel-out or the config file)")?;
        // Publishing results onto the channel we consume would feed the
        // relay its own output forever.
        if channel_in == channel_out {
            bail!("inbound and outbound channels must differ");
        }

        Ok(RelayOptions {
            host: self
                .host
                .clone()
                .unwrap_or_else(|| defaults::HOST.to_owned()),
            port: self.port.unwrap_or(defaults::PORT),
            db: self.db.unwrap_or(defaults::DB),
            channel_in,
            channel_out,
        })
    }
}

/// Run the relay command. Only returns on startup failure; once connected
/// the loop is ended by process signals alone.
///
/// # Errors
///
/// Returns an error if channels or the model cannot be set up.
pub fn run(args: &RelayArgs) -> Result<()> {
    let config = AppConfig::load();
    let args = RelayArgs::with_config(args.clone(), &config);

    let options = args.options()?;
    let ctx = args.model.build_context()?;

    let relay = RedisRelay::new(options)?;
    relay.run(&ctx)
}
