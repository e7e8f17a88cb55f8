//! Ports (trait interfaces) between drivers and the model.

mod classifier;

pub use classifier::Classifier;
