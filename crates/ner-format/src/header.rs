//! Fixed-size model header.

use crate::error::{FormatError, Result};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic identifying the container family ("ggml" read as an integer).
///
/// Stored little-endian like every other field, so the first four bytes on
/// disk are `6c 6d 67 67`.
pub const FORMAT_MAGIC: u32 = 0x6767_6d6c;
/// Number of i32 fields in the header, magic included.
pub const HEADER_FIELDS: usize = 9;
/// Header size in bytes.
pub const HEADER_LEN: usize = HEADER_FIELDS * 4;

// ---------------------------------------------------------------------------
// Format type
// ---------------------------------------------------------------------------

/// Global precision flag stored in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(i32)]
pub enum FormatType {
    /// Every tensor is stored as f32.
    Full = 0,
    /// 2-D weight matrices are stored as f16, everything else as f32.
    #[default]
    Mixed = 1,
}

impl FormatType {
    /// Raw value written to the header.
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Convert from the raw header value.
    ///
    /// Legacy loaders also know `2` (Q4_0); no writer produces it, so it is
    /// rejected like any other unknown value.
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Full),
            1 => Some(Self::Mixed),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// Hyperparameters written at the start of every container.
///
/// Field order here is the on-disk order (after the magic).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelHeader {
    pub vocab_size: i32,
    pub max_position_embeddings: i32,
    pub hidden_size: i32,
    pub intermediate_size: i32,
    pub num_attention_heads: i32,
    pub num_hidden_layers: i32,
    pub format_type: FormatType,
    pub num_labels: i32,
}

impl ModelHeader {
    /// The nine header fields in on-disk order.
    pub fn fields(&self) -> [i32; HEADER_FIELDS] {
        [
            FORMAT_MAGIC as i32,
            self.vocab_size,
            self.max_position_embeddings,
            self.hidden_size,
            self.intermediate_size,
            self.num_attention_heads,
            self.num_hidden_layers,
            self.format_type.code(),
            self.num_labels,
        ]
    }

    /// Serialize to the 36-byte on-disk representation.
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        for (slot, field) in out.chunks_exact_mut(4).zip(self.fields()) {
            slot.copy_from_slice(&field.to_le_bytes());
        }
        out
    }

    /// Write the header to `w`.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.to_bytes())
    }

    /// Parse the first 36 bytes of a container.
    ///
    /// The magic is checked before anything else is looked at.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if let Some(magic) = read_magic(buf)
            && magic != FORMAT_MAGIC
        {
            return Err(FormatError::BadMagic(magic));
        }
        if buf.len() < HEADER_LEN {
            return Err(FormatError::ShortHeader(buf.len()));
        }

        let field = |i: usize| {
            let at = i * 4;
            i32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
        };

        let format_code = field(7);
        let format_type = FormatType::from_code(format_code)
            .ok_or(FormatError::UnsupportedFormatType(format_code))?;

        let header = Self {
            vocab_size: field(1),
            max_position_embeddings: field(2),
            hidden_size: field(3),
            intermediate_size: field(4),
            num_attention_heads: field(5),
            num_hidden_layers: field(6),
            format_type,
            num_labels: field(8),
        };
        if header.vocab_size < 0 {
            return Err(FormatError::NegativeField { what: "vocab_size", value: header.vocab_size });
        }
        Ok(header)
    }

    /// `vocab_size` as a length.
    pub fn vocab_len(&self) -> Result<usize> {
        usize::try_from(self.vocab_size)
            .map_err(|_| FormatError::NegativeField { what: "vocab_size", value: self.vocab_size })
    }
}

/// Returns `true` if `data` starts with the container magic.
#[inline]
pub fn check_magic(data: &[u8]) -> bool {
    read_magic(data) == Some(FORMAT_MAGIC)
}

fn read_magic(data: &[u8]) -> Option<u32> {
    let bytes: [u8; 4] = data.get(0..4)?.try_into().ok()?;
    Some(u32::from_le_bytes(bytes))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
