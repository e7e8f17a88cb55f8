//! The convolutional classifier candle executes.

// Allow common ML code patterns
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]

use std::path::Path;

use anyhow::{Context, Result};
use candle_core::{Device, Module, Tensor, D};
use candle_nn::ops::softmax;
use candle_nn::{conv2d, linear, Conv2d, Conv2dConfig, Linear};
use image::DynamicImage;
use tracing::debug;

use super::descriptor::{ColorMode, ModelDescriptor};
use super::weights::load_weights;
use crate::ports::Classifier;

/// A small image classification network loaded from safetensors weights.
///
/// The descriptor fixes the shape: N conv stages (3x3, padding 1, ReLU,
/// 2x2 max pool), flattened into two fully-connected layers. The output
/// layer is as wide as the label list and gets softmaxed, so scores are
/// probabilities summing to 1.
#[derive(Debug)]
pub struct ConvClassifier {
    stages: Vec<Conv2d>,
    fc1: Linear,
    fc2: Linear,
    descriptor: ModelDescriptor,
    device: Device,
}

impl ConvClassifier {
    /// Builds the network and loads its weights.
    ///
    /// `num_classes` must equal the output width of the stored weights; a
    /// label list that does not fit the trained model is rejected here,
    /// before any driver starts.
    ///
    /// # Errors
    ///
    /// Returns an error if weights are missing, malformed, or shaped for a
    /// different geometry than the descriptor and label count describe.
    pub fn load(
        weights: &Path,
        descriptor: ModelDescriptor,
        device: Device,
        num_classes: usize,
    ) -> Result<Self> {
        let vb = load_weights(weights, &device)?;

        let mut stages = Vec::with_capacity(descriptor.head.conv_channels.len());
        let mut in_channels = descriptor.channels();
        for (i, &out_channels) in descriptor.head.conv_channels.iter().enumerate() {
            let name = format!("conv{}", i + 1);
            let conv = conv2d(
                in_channels,
                out_channels,
                3,
                Conv2dConfig {
                    padding: 1,
                    ..Conv2dConfig::default()
                },
                vb.pp(&name),
            )
            .with_context(|| format!("Failed to load conv stage '{name}'"))?;
            stages.push(conv);
            in_channels = out_channels;
        }

        let fc1 = linear(descriptor.feature_len(), descriptor.head.hidden, vb.pp("fc1"))
            .context("Failed to load hidden layer 'fc1'")?;
        let fc2 = linear(descriptor.head.hidden, num_classes, vb.pp("fc2")).with_context(|| {
            format!(
                "Failed to load output layer 'fc2' for {num_classes} labels \
                 (the label count must match the model's output width)"
            )
        })?;

        debug!(
            "Loaded {}-stage convnet: {}x{} input, {} classes",
            stages.len(),
            descriptor.input_width,
            descriptor.input_height,
            num_classes
        );

        Ok(Self {
            stages,
            fc1,
            fc2,
            descriptor,
            device,
        })
    }

    /// Scales, normalizes and lays an image out as an NCHW tensor.
    fn preprocess(&self, image: &DynamicImage) -> Result<Tensor> {
        let w = self.descriptor.input_width;
        let h = self.descriptor.input_height;
        let resized =
            image.resize_exact(w as u32, h as u32, image::imageops::FilterType::Lanczos3);
        let (mean, std) = self.descriptor.normalization();

        let data: Vec<f32> = match self.descriptor.color {
            ColorMode::Rgb => {
                let rgb = resized.to_rgb8();
                // Channel-planar layout: all red values, then green, then blue.
                let mut data = vec![0.0f32; 3 * w * h];
                for (x, y, pixel) in rgb.enumerate_pixels() {
                    let idx = y as usize * w + x as usize;
                    for c in 0..3 {
                        data[c * w * h + idx] = (f32::from(pixel[c]) / 255.0 - mean[c]) / std[c];
                    }
                }
                data
            }
            ColorMode::Luma => {
                let gray = resized.to_luma8();
                gray.pixels()
                    .map(|p| (f32::from(p[0]) / 255.0 - mean[0]) / std[0])
                    .collect()
            }
        };

        Tensor::from_vec(data, (1, self.descriptor.channels(), h, w), &self.device)
            .context("Failed to build input tensor")
    }
}

impl Module for ConvClassifier {
    fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        let mut x = x.clone();
        for conv in &self.stages {
            x = conv.forward(&x)?;
            x = x.relu()?;
            x = x.max_pool2d(2)?;
        }

        let x = x.flatten_from(1)?;
        let x = self.fc1.forward(&x)?;
        let x = x.relu()?;
        self.fc2.forward(&x)
    }
}

impl Classifier for ConvClassifier {
    fn classify(&self, image: &DynamicImage) -> Result<Vec<f32>> {
        let input = self.preprocess(image)?;
        let logits = self.forward(&input)?;
        let probs = softmax(&logits, D::Minus1)?;
        let scores = probs.squeeze(0)?.to_vec1::<f32>()?;
        Ok(scores)
    }
}
