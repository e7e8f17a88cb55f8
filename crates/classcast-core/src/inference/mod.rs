//! Candle-backed model loading and execution.

mod convnet;
mod descriptor;
mod device;
mod weights;

pub use convnet::ConvClassifier;
pub use descriptor::{ColorMode, HeadConfig, ModelDescriptor};
pub use device::{select_device, DevicePreference};
pub use weights::load_weights;
