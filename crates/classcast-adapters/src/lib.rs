//! Classcast Adapters - Transport and filesystem glue
//!
//! This crate provides the two drivers that feed the dispatch core:
//! - A directory-polling driver built on a filesystem spool
//! - A redis pub/sub relay

pub mod poll;
pub mod relay;
pub mod spool;

pub use poll::{PollDriver, PollOptions, TickReport};
pub use relay::{pump, RedisRelay, RelayOptions, Transport};
pub use spool::{FsSpool, PendingFile};
