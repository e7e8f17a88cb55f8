//! Redis relay: the queue-based driver.

use std::time::Duration;

use anyhow::{Context, Result};
use classcast_core::{DispatchContext, DispatchError};
use redis::Commands;
use tracing::{info, warn};

/// Connection and channel settings for the relay.
#[derive(Debug, Clone)]
pub struct RelayOptions {
    pub host: String,
    pub port: u16,
    pub db: i64,
    pub channel_in: String,
    pub channel_out: String,
}

impl RelayOptions {
    /// Redis connection URL for these settings.
    #[must_use]
    pub fn url(&self) -> String {
        format!("redis://{}:{}/{}", self.host, self.port, self.db)
    }
}

/// A duplex message transport: inbound payloads and outbound replies.
///
/// Abstracted from redis so the pump loop can be exercised with a scripted
/// transport in tests.
pub trait Transport {
    /// Blocks until the next inbound payload arrives.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::BrokerConnection`] when the link fails.
    fn next_message(&mut self) -> Result<Vec<u8>, DispatchError>;

    /// Publishes one reply.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::BrokerConnection`] when the link fails.
    fn publish(&mut self, payload: &[u8]) -> Result<(), DispatchError>;
}

/// Receives payloads and publishes replies until the transport fails, then
/// returns the broker error that ended the session.
///
/// A bad payload is logged and skipped; nothing is published for it. Only
/// transport failures end the loop, and those become a reconnect in the
/// caller rather than an exit.
pub fn pump(transport: &mut dyn Transport, ctx: &DispatchContext) -> DispatchError {
    loop {
        let payload = match transport.next_message() {
            Ok(payload) => payload,
            Err(e) => return e,
        };
        match ctx.respond(&payload) {
            Ok(reply) => {
                if let Err(e) = transport.publish(&reply) {
                    return e;
                }
            }
            Err(e) => warn!("{e}"),
        }
    }
}

/// Delay between reconnect attempts: starts at 1s, doubles to a 60s
/// ceiling, reset after a successful subscribe.
#[derive(Debug)]
struct Backoff {
    delay: Duration,
}

impl Backoff {
    const INITIAL: Duration = Duration::from_secs(1);
    const MAX: Duration = Duration::from_secs(60);

    fn new() -> Self {
        Self {
            delay: Self::INITIAL,
        }
    }

    fn next(&mut self) -> Duration {
        let delay = self.delay;
        self.delay = (delay * 2).min(Self::MAX);
        delay
    }

    fn reset(&mut self) {
        self.delay = Self::INITIAL;
    }
}

/// The queue-based driver: subscribes to an inbound channel, classifies
/// every payload, and publishes result JSON on an outbound channel.
///
/// Losing the broker never ends the process; the relay reconnects with
/// backoff for as long as it runs.
pub struct RedisRelay {
    client: redis::Client,
    options: RelayOptions,
}

impl RedisRelay {
    /// Prepares a relay for the given broker settings.
    ///
    /// No connection is made here; the first connect happens inside
    /// [`run`](Self::run) so a broker that is still starting up gets the
    /// same retry treatment as one that went away.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings do not form a valid redis URL.
    pub fn new(options: RelayOptions) -> Result<Self> {
        let client = redis::Client::open(options.url())
            .with_context(|| format!("Invalid redis target {}", options.url()))?;
        Ok(Self { client, options })
    }

    /// Runs the relay loop; never returns.
    pub fn run(&self, ctx: &DispatchContext) -> ! {
        let mut backoff = Backoff::new();
        loop {
            let err = self.session(ctx, &mut backoff);
            warn!("{err}");
            let delay = backoff.next();
            info!("Reconnecting in {}s", delay.as_secs());
            std::thread::sleep(delay);
        }
    }

    /// One connect-subscribe-pump session; returns the error that ended it.
    fn session(&self, ctx: &DispatchContext, backoff: &mut Backoff) -> DispatchError {
        let mut sub_conn = match self.client.get_connection() {
            Ok(conn) => conn,
            Err(e) => return broker_error(e, "connect (subscriber)"),
        };
        let mut pub_conn = match self.client.get_connection() {
            Ok(conn) => conn,
            Err(e) => return broker_error(e, "connect (publisher)"),
        };

        let mut pubsub = sub_conn.as_pubsub();
        if let Err(e) = pubsub.subscribe(&self.options.channel_in) {
            return broker_error(e, "subscribe");
        }

        info!(
            "Subscribed to '{}' on {}, replying on '{}'",
            self.options.channel_in,
            self.options.url(),
            self.options.channel_out
        );
        backoff.reset();

        let mut transport = RedisTransport {
            pubsub,
            publisher: &mut pub_conn,
            channel_out: &self.options.channel_out,
        };
        pump(&mut transport, ctx)
    }
}

struct RedisTransport<'a> {
    pubsub: redis::PubSub<'a>,
    publisher: &'a mut redis::Connection,
    channel_out: &'a str,
}

impl Transport for RedisTransport<'_> {
    fn next_message(&mut self) -> Result<Vec<u8>, DispatchError> {
        let msg = self
            .pubsub
            .get_message()
            .map_err(|e| broker_error(e, "receive"))?;
        msg.get_payload::<Vec<u8>>()
            .map_err(|e| broker_error(e, "payload"))
    }

    fn publish(&mut self, payload: &[u8]) -> Result<(), DispatchError> {
        let _receivers: i64 = self
            .publisher
            .publish(self.channel_out, payload)
            .map_err(|e| broker_error(e, "publish"))?;
        Ok(())
    }
}

fn broker_error(err: redis::RedisError, action: &str) -> DispatchError {
    DispatchError::broker(anyhow::Error::new(err).context(action.to_owned()))
}
