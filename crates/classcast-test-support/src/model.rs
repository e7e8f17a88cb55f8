//! A tiny on-disk model fixture for end-to-end tests.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use safetensors::tensor::TensorView;

/// Paths of a model fixture written by [`TestModel::write_into`].
pub struct TestModel {
    pub weights: PathBuf,
    pub descriptor: PathBuf,
}

impl TestModel {
    /// Writes a loadable model into `dir`: zeroed weights for an 8x8 luma
    /// net (one conv stage of 4 channels, hidden width 8) plus the matching
    /// descriptor. Zeroed weights score every class equally, which keeps
    /// end-to-end assertions deterministic.
    ///
    /// # Errors
    ///
    /// Returns an error if the files cannot be written.
    pub fn write_into(dir: &Path, num_classes: usize) -> Result<Self> {
        let weights = dir.join("model.safetensors");
        let descriptor = dir.join("model.toml");

        // 8x8 pooled once leaves 4x4; 4 channels flatten to 64 features.
        let shapes: Vec<(&str, Vec<usize>)> = vec![
            ("conv1.weight", vec![4, 1, 3, 3]),
            ("conv1.bias", vec![4]),
            ("fc1.weight", vec![8, 64]),
            ("fc1.bias", vec![8]),
            ("fc2.weight", vec![num_classes, 8]),
            ("fc2.bias", vec![num_classes]),
        ];
        let buffers: Vec<Vec<f32>> = shapes
            .iter()
            .map(|(_, shape)| vec![0.0f32; shape.iter().product()])
            .collect();

        let mut tensors: HashMap<String, TensorView> = HashMap::new();
        for ((name, shape), data) in shapes.iter().zip(&buffers) {
            let view = TensorView::new(
                safetensors::Dtype::F32,
                shape.clone(),
                bytemuck::cast_slice(data),
            )
            .context("Failed to build tensor view")?;
            tensors.insert((*name).to_owned(), view);
        }

        let serialized = safetensors::serialize(&tensors, &None).context("Failed to serialize weights")?;
        fs::write(&weights, serialized)
            .with_context(|| format!("Failed to write {}", weights.display()))?;

        fs::write(
            &descriptor,
            "input_width = 8\n\
             input_height = 8\n\
             color = \"luma\"\n\
             \n\
             [head]\n\
             conv_channels = [4]\n\
             hidden = 8\n",
        )
        .with_context(|| format!("Failed to write {}", descriptor.display()))?;

        Ok(Self {
            weights,
            descriptor,
        })
    }
}
