//! The dispatch context shared by both drivers.

use std::path::Path;

use anyhow::{Context as _, Result};
use image::DynamicImage;

use crate::domain::{LabelSet, Prediction};
use crate::error::DispatchError;
use crate::ports::Classifier;

/// Everything a driver needs to turn one image into one result: the model,
/// the label list, and output shaping. Built once at startup and shared by
/// reference; drivers bring their own transport.
pub struct DispatchContext {
    classifier: Box<dyn Classifier>,
    labels: LabelSet,
    top_k: Option<usize>,
}

impl DispatchContext {
    #[must_use]
    pub fn new(classifier: Box<dyn Classifier>, labels: LabelSet, top_k: Option<usize>) -> Self {
        Self {
            classifier,
            labels,
            top_k,
        }
    }

    #[must_use]
    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// Classifies a decoded image.
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails or the model's output width does
    /// not match the label count.
    pub fn predict_image(&self, image: &DynamicImage) -> Result<Prediction> {
        let scores = self.classifier.classify(image)?;
        Prediction::from_scores(&self.labels, &scores, self.top_k)
    }

    /// Reads and classifies an image file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be decoded or inference fails.
    pub fn predict_path(&self, path: &Path) -> Result<Prediction> {
        let image = image::open(path)
            .with_context(|| format!("Failed to decode image: {}", path.display()))?;
        self.predict_image(&image)
    }

    /// Decodes and classifies an in-memory image payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be decoded or inference fails.
    pub fn predict_bytes(&self, bytes: &[u8]) -> Result<Prediction> {
        let image = image::load_from_memory(bytes).context("Failed to decode image payload")?;
        self.predict_image(&image)
    }

    /// One full request/response step for message payloads: decode,
    /// classify, render compact result JSON.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::TransientItem`]: the payload was bad or
    /// inference failed, and the caller's loop should log and move on.
    pub fn respond(&self, payload: &[u8]) -> Result<Vec<u8>, DispatchError> {
        let item = format!("{}-byte payload", payload.len());
        let prediction = self
            .predict_bytes(payload)
            .map_err(|e| DispatchError::transient(item.clone(), e))?;
        let json = prediction
            .to_json(false)
            .map_err(|e| DispatchError::transient(item, e))?;
        Ok(json.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;

    struct Fixed(Vec<f32>);

    impl Classifier for Fixed {
        fn classify(&self, _image: &DynamicImage) -> Result<Vec<f32>> {
            Ok(self.0.clone())
        }
    }

    struct Failing;

    impl Classifier for Failing {
        fn classify(&self, _image: &DynamicImage) -> Result<Vec<f32>> {
            bail!("injected inference failure")
        }
    }

    fn context(scores: Vec<f32>, top_k: Option<usize>) -> DispatchContext {
        let labels = LabelSet::from_inline("bird,cat,dog").unwrap();
        DispatchContext::new(Box::new(Fixed(scores)), labels, top_k)
    }

    fn png_bytes() -> Vec<u8> {
        let image = image::RgbImage::from_pixel(4, 4, image::Rgb([10, 60, 200]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(image)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_respond_renders_ordered_json() {
        let ctx = context(vec![0.125, 0.5, 0.25], None);
        let reply = ctx.respond(&png_bytes()).unwrap();
        assert_eq!(
            String::from_utf8(reply).unwrap(),
            r#"{"cat":0.5,"dog":0.25,"bird":0.125}"#
        );
    }

    #[test]
    fn test_respond_rejects_garbage_payload() {
        let ctx = context(vec![0.2, 0.3, 0.5], None);
        let err = ctx.respond(b"not an image").unwrap_err();
        assert!(matches!(err, DispatchError::TransientItem { .. }));
        assert!(err.to_string().contains("12-byte payload"));
    }

    #[test]
    fn test_respond_surfaces_inference_failure_as_transient() {
        let labels = LabelSet::from_inline("a,b").unwrap();
        let ctx = DispatchContext::new(Box::new(Failing), labels, None);
        let err = ctx.respond(&png_bytes()).unwrap_err();
        assert!(matches!(err, DispatchError::TransientItem { .. }));
    }

    #[test]
    fn test_path_and_bytes_agree() {
        let ctx = context(vec![0.25, 0.5, 0.25], Some(2));
        let bytes = png_bytes();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.png");
        std::fs::write(&path, &bytes).unwrap();

        let from_path = ctx.predict_path(&path).unwrap();
        let from_bytes = ctx.predict_bytes(&bytes).unwrap();
        assert_eq!(from_path, from_bytes);
        assert_eq!(from_path.len(), 2);
    }

    #[test]
    fn test_score_count_mismatch_errors() {
        let ctx = context(vec![0.5, 0.5], None);
        assert!(ctx.predict_bytes(&png_bytes()).is_err());
    }
}
