//! The classifier port.

use anyhow::Result;
use image::DynamicImage;

/// An opaque classification model.
///
/// Implementations return one score per configured label, in label order,
/// as probabilities in `[0, 1]`. Calls are synchronous and uninterruptible;
/// an implementation that hangs stalls its driver loop, so models are
/// expected to finish in bounded time.
pub trait Classifier: Send + Sync {
    /// Scores a decoded image against every label.
    ///
    /// # Errors
    ///
    /// Returns an error if preprocessing or inference fails.
    fn classify(&self, image: &DynamicImage) -> Result<Vec<f32>>;
}
