//! Mock implementation of the classifier port.

use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{bail, Result};
use classcast_core::Classifier;
use image::DynamicImage;

/// Mock implementation of `Classifier` for testing.
///
/// Returns a fixed score vector and can be scripted to fail a number of
/// leading calls, which is how retry behavior gets exercised. Clones share
/// their counters, so tests can keep one clone for assertions while a
/// driver owns the other.
#[derive(Clone)]
pub struct MockClassifier {
    scores: Vec<f32>,
    remaining_failures: Arc<Mutex<usize>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockClassifier {
    /// Creates a mock that always succeeds with the given scores.
    #[must_use]
    pub fn with_scores(scores: Vec<f32>) -> Self {
        Self::failing_times(0, scores)
    }

    /// Creates a mock whose first `failures` calls error, after which it
    /// succeeds with the given scores.
    #[must_use]
    pub fn failing_times(failures: usize, scores: Vec<f32>) -> Self {
        Self {
            scores,
            remaining_failures: Arc::new(Mutex::new(failures)),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Creates a mock that fails every call.
    #[must_use]
    pub fn always_failing() -> Self {
        Self::failing_times(usize::MAX, vec![])
    }

    /// Returns how many times `classify` was called.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Classifier for MockClassifier {
    fn classify(&self, _image: &DynamicImage) -> Result<Vec<f32>> {
        if let Ok(mut count) = self.call_count.lock() {
            *count += 1;
        }

        let mut remaining = self
            .remaining_failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *remaining > 0 {
            if *remaining != usize::MAX {
                *remaining -= 1;
            }
            bail!("injected inference failure");
        }

        Ok(self.scores.clone())
    }
}
