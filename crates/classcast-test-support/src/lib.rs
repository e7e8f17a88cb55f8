//! Test support utilities for classcast.
//!
//! Provides a scriptable classifier mock, synthetic image builders, and an
//! on-disk model fixture for end-to-end tests.
//!
//! # Example
//!
//! ```
//! use classcast_core::Classifier;
//! use classcast_test_support::{MockClassifier, SyntheticImage};
//!
//! let classifier = MockClassifier::with_scores(vec![0.25, 0.75]);
//! let image = SyntheticImage::checkerboard(32, 32);
//! let scores = classifier.classify(&image).unwrap();
//! assert_eq!(scores, vec![0.25, 0.75]);
//! ```

mod builders;
mod mocks;
mod model;

pub use builders::{png_bytes, save_into, SyntheticImage};
pub use mocks::MockClassifier;
pub use model::TestModel;
