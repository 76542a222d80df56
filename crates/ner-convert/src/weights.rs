//! Tensor loading from `model.safetensors`.

use crate::error::{ConvertError, Result};
use half::bf16;
use ner_format::{ElementType, TensorData, TensorEntry};
use safetensors::{Dtype, SafeTensors};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

pub const WEIGHTS_FILE: &str = "model.safetensors";

/// Read the whole checkpoint into memory.
pub fn read_checkpoint(path: &Path) -> Result<Vec<u8>> {
    info!("Loading SafeTensors file: {}", path.display());
    fs::read(path).map_err(|e| ConvertError::io(path, e))
}

/// Every tensor in the checkpoint, in the order their data is laid out.
///
/// F32 and F16 payloads borrow from `st`; other float and integer dtypes
/// are widened to f32.
pub fn collect_tensors<'a>(st: &SafeTensors<'a>) -> Result<Vec<TensorEntry<'a>>> {
    let mut views = st.tensors();
    views.sort_by(|(a_name, a), (b_name, b)| {
        let a_at = a.data().as_ptr() as usize;
        let b_at = b.data().as_ptr() as usize;
        a_at.cmp(&b_at).then_with(|| a_name.cmp(b_name))
    });

    let mut entries = Vec::with_capacity(views.len());
    for (name, view) in views {
        let data = load_payload(&name, view.dtype(), view.data())?;
        debug!(name = %name, dtype = ?view.dtype(), shape = ?view.shape(), "loaded tensor");
        entries.push(TensorEntry::new(name, view.shape().to_vec(), data));
    }
    Ok(entries)
}

/// Wrap or widen one tensor's raw bytes.
pub fn load_payload<'a>(name: &str, dtype: Dtype, data: &'a [u8]) -> Result<TensorData<'a>> {
    let widened: Vec<f32> = match dtype {
        Dtype::F32 => return Ok(TensorData::borrowed(ElementType::F32, data)),
        Dtype::F16 => return Ok(TensorData::borrowed(ElementType::F16, data)),
        Dtype::BF16 => {
            data.chunks_exact(2).map(|c| bf16::from_le_bytes([c[0], c[1]]).to_f32()).collect()
        }
        Dtype::F64 => data
            .chunks_exact(8)
            .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]) as f32)
            .collect(),
        Dtype::I8 => data.iter().map(|&b| b as i8 as f32).collect(),
        Dtype::U8 => data.iter().map(|&b| b as f32).collect(),
        Dtype::I16 => data.chunks_exact(2).map(|c| i16::from_le_bytes([c[0], c[1]]) as f32).collect(),
        Dtype::U16 => data.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]]) as f32).collect(),
        Dtype::I32 => data
            .chunks_exact(4)
            .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f32)
            .collect(),
        Dtype::U32 => data
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f32)
            .collect(),
        Dtype::I64 => data
            .chunks_exact(8)
            .map(|c| i64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]) as f32)
            .collect(),
        Dtype::U64 => data
            .chunks_exact(8)
            .map(|c| u64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]) as f32)
            .collect(),
        other => {
            return Err(ConvertError::UnsupportedDtype {
                name: name.to_string(),
                dtype: format!("{other:?}"),
            });
        }
    };
    Ok(TensorData::from_f32(&widened))
}
