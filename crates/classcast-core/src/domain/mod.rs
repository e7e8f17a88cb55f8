//! Domain types: labels and predictions.

mod labels;
mod prediction;

pub use labels::{LabelSet, LABELS_ENV};
pub use prediction::Prediction;
