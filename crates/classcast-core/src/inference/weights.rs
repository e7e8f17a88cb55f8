//! Weight loading from safetensors files.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use safetensors::SafeTensors;
use tracing::debug;

/// Reads a safetensors file into a `VarBuilder` on the given device.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid safetensors
/// data, or holds a dtype candle cannot represent.
pub fn load_weights(path: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    debug!("Loading weights from {}", path.display());

    let data = std::fs::read(path)
        .with_context(|| format!("Failed to read weights file: {}", path.display()))?;
    let tensors = SafeTensors::deserialize(&data)
        .with_context(|| format!("Failed to parse safetensors: {}", path.display()))?;

    let mut map: HashMap<String, Tensor> = HashMap::new();
    for (name, view) in tensors.tensors() {
        let dtype = candle_dtype(view.dtype())
            .with_context(|| format!("Tensor '{name}' has an unsupported dtype"))?;
        let tensor = Tensor::from_raw_buffer(view.data(), dtype, view.shape(), device)
            .with_context(|| format!("Failed to load tensor '{name}'"))?;
        map.insert(name, tensor);
    }

    Ok(VarBuilder::from_tensors(map, DType::F32, device))
}

fn candle_dtype(dtype: safetensors::Dtype) -> Result<DType> {
    use safetensors::Dtype;
    Ok(match dtype {
        Dtype::F32 => DType::F32,
        Dtype::F64 => DType::F64,
        Dtype::F16 => DType::F16,
        Dtype::BF16 => DType::BF16,
        Dtype::I64 => DType::I64,
        Dtype::U32 => DType::U32,
        Dtype::U8 => DType::U8,
        other => anyhow::bail!("unsupported dtype {other:?}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_safetensors(entries: &[(&str, Vec<usize>, Vec<f32>)]) -> NamedTempFile {
        use safetensors::tensor::TensorView;

        let mut tensors: HashMap<String, TensorView> = HashMap::new();
        for (name, shape, data) in entries {
            let view =
                TensorView::new(safetensors::Dtype::F32, shape.clone(), bytemuck::cast_slice(data))
                    .expect("valid tensor view");
            tensors.insert((*name).to_owned(), view);
        }

        let serialized = safetensors::serialize(&tensors, &None).expect("serialize");

        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(&serialized).expect("write");
        file
    }

    #[test]
    fn test_load_weights_roundtrip() {
        let file = write_safetensors(&[("w", vec![2, 2], vec![1.0, 2.0, 3.0, 4.0])]);
        let vb = load_weights(file.path(), &Device::Cpu).unwrap();
        let tensor = vb.get((2, 2), "w").unwrap();
        assert_eq!(tensor.dims(), &[2, 2]);
    }

    #[test]
    fn test_load_weights_missing_file() {
        let result = load_weights(Path::new("/nonexistent/model.safetensors"), &Device::Cpu);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_weights_rejects_garbage() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"definitely not safetensors").unwrap();
        assert!(load_weights(file.path(), &Device::Cpu).is_err());
    }
}
