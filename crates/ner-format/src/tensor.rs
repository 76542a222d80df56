//! Tensor payloads and element types.

use half::f16;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

// ---------------------------------------------------------------------------
// Element type
// ---------------------------------------------------------------------------

/// On-disk element type of a tensor payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ElementType {
    F32 = 0,
    F16 = 1,
}

impl ElementType {
    /// Code stored in the tensor record.
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Convert from the raw record code.
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::F32),
            1 => Some(Self::F16),
            _ => None,
        }
    }

    /// Bytes per element.
    pub const fn element_size(self) -> usize {
        match self {
            Self::F32 => 4,
            Self::F16 => 2,
        }
    }
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// Little-endian tensor payload tagged with its element type.
///
/// The bytes may borrow from a memory-mapped or fully-read checkpoint; they
/// are only copied when a conversion is needed.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorData<'a> {
    dtype: ElementType,
    bytes: Cow<'a, [u8]>,
}

/// Result of converting a payload to another element type.
#[derive(Debug)]
pub struct Converted<'a> {
    pub bytes: Cow<'a, [u8]>,
    /// Finite inputs that became infinite (f32 values beyond the f16 range).
    pub overflowed: usize,
}

impl<'a> TensorData<'a> {
    /// Borrow existing little-endian bytes.
    pub fn borrowed(dtype: ElementType, bytes: &'a [u8]) -> Self {
        Self { dtype, bytes: Cow::Borrowed(bytes) }
    }

    /// Take ownership of little-endian bytes.
    pub fn owned(dtype: ElementType, bytes: Vec<u8>) -> Self {
        Self { dtype, bytes: Cow::Owned(bytes) }
    }

    /// Pack f32 values.
    pub fn from_f32(values: &[f32]) -> TensorData<'static> {
        let bytes = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        TensorData::owned(ElementType::F32, bytes)
    }

    /// Pack f16 values.
    pub fn from_f16(values: &[f16]) -> TensorData<'static> {
        let bytes = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        TensorData::owned(ElementType::F16, bytes)
    }

    pub fn dtype(&self) -> ElementType {
        self.dtype
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of whole elements in the payload.
    pub fn num_elements(&self) -> usize {
        self.bytes.len() / self.dtype.element_size()
    }

    /// Re-encode the payload as `target`.
    ///
    /// Same-type conversions borrow; f32 -> f16 rounds to nearest and
    /// f16 -> f32 is exact.
    pub fn convert(&self, target: ElementType) -> Converted<'_> {
        match (self.dtype, target) {
            (ElementType::F32, ElementType::F16) => {
                let mut out = Vec::with_capacity(self.bytes.len() / 2);
                let mut overflowed = 0;
                // Read bytes manually; the source may not be 4-byte aligned.
                for chunk in self.bytes.chunks_exact(4) {
                    let v = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                    let h = f16::from_f32(v);
                    if v.is_finite() && h.is_infinite() {
                        overflowed += 1;
                    }
                    out.extend_from_slice(&h.to_le_bytes());
                }
                Converted { bytes: Cow::Owned(out), overflowed }
            }
            (ElementType::F16, ElementType::F32) => {
                let mut out = Vec::with_capacity(self.bytes.len() * 2);
                for chunk in self.bytes.chunks_exact(2) {
                    let v = f16::from_le_bytes([chunk[0], chunk[1]]).to_f32();
                    out.extend_from_slice(&v.to_le_bytes());
                }
                Converted { bytes: Cow::Owned(out), overflowed: 0 }
            }
            _ => Converted { bytes: Cow::Borrowed(self.bytes.as_ref()), overflowed: 0 },
        }
    }

    /// Decode the payload to f32 values.
    pub fn to_f32_vec(&self) -> Vec<f32> {
        decode_f32(self.dtype, &self.bytes)
    }
}

pub(crate) fn decode_f32(dtype: ElementType, bytes: &[u8]) -> Vec<f32> {
    match dtype {
        ElementType::F32 => bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
        ElementType::F16 => {
            bytes.chunks_exact(2).map(|c| f16::from_le_bytes([c[0], c[1]]).to_f32()).collect()
        }
    }
}

// ---------------------------------------------------------------------------
// Tensor entry
// ---------------------------------------------------------------------------

/// One named tensor handed to the encoder.
///
/// `name` is the source name (prefix not yet stripped) and `shape` the
/// logical row-major shape as stored in the source checkpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorEntry<'a> {
    pub name: String,
    pub shape: Vec<usize>,
    pub data: TensorData<'a>,
}

impl<'a> TensorEntry<'a> {
    pub fn new(name: impl Into<String>, shape: Vec<usize>, data: TensorData<'a>) -> Self {
        Self { name: name.into(), shape, data }
    }

    /// Convenience constructor for f32 values.
    pub fn from_f32(name: impl Into<String>, shape: Vec<usize>, values: &[f32]) -> TensorEntry<'static> {
        TensorEntry::new(name, shape, TensorData::from_f32(values))
    }

    /// Element count implied by the shape (1 for a scalar).
    pub fn num_elements(&self) -> usize {
        self.shape.iter().product()
    }
}

/// Drop every axis of size 1.
///
/// Memory order is unchanged, so the payload needs no rearranging.
///
/// ```
/// use ner_format::squeeze_shape;
///
/// assert_eq!(squeeze_shape(&[1, 512]), vec![512]);
/// assert_eq!(squeeze_shape(&[9, 1, 768]), vec![9, 768]);
/// assert!(squeeze_shape(&[1, 1]).is_empty());
/// ```
pub fn squeeze_shape(shape: &[usize]) -> Vec<usize> {
    shape.iter().copied().filter(|&d| d != 1).collect()
}

/// Encoded size of one tensor record.
pub fn record_len(rank: usize, name_len: usize, payload_len: usize) -> usize {
    3 * 4 + rank * 4 + name_len + payload_len
}
