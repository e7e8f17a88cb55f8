//! Classcast Core - Shared classification dispatch
//!
//! This crate contains the domain types, the classifier port with its
//! candle-backed implementation, and the dispatch context both drivers
//! (directory polling and broker relay) are built on.

pub mod context;
pub mod domain;
pub mod error;
pub mod inference;
pub mod ports;

pub use context::DispatchContext;
pub use domain::{LabelSet, Prediction, LABELS_ENV};
pub use error::DispatchError;
pub use ports::Classifier;
