//! Error taxonomy shared by both drivers.

use thiserror::Error;

/// How a failure relates to the driver loop that hit it.
///
/// Startup problems abort the process before any loop begins. Everything
/// after startup is either scoped to one work item (log and move on) or to
/// the broker link (reconnect with backoff). Neither of the latter two may
/// terminate a running driver.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Fatal configuration or model problem detected before a driver starts.
    #[error("startup failed: {source}")]
    Startup {
        #[source]
        source: anyhow::Error,
    },

    /// One file or message could not be processed; the loop keeps going.
    #[error("transient failure on {item}: {source}")]
    TransientItem {
        item: String,
        #[source]
        source: anyhow::Error,
    },

    /// The broker link dropped or could not be established.
    #[error("broker connection error: {source}")]
    BrokerConnection {
        #[source]
        source: anyhow::Error,
    },
}

impl DispatchError {
    #[must_use]
    pub fn startup(source: anyhow::Error) -> Self {
        Self::Startup { source }
    }

    #[must_use]
    pub fn transient(item: impl Into<String>, source: anyhow::Error) -> Self {
        Self::TransientItem {
            item: item.into(),
            source,
        }
    }

    #[must_use]
    pub fn broker(source: anyhow::Error) -> Self {
        Self::BrokerConnection { source }
    }
}
