use std::io;
use thiserror::Error;

/// Errors raised while writing or reading a model container.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("bad magic: {0:#010x}")]
    BadMagic(u32),
    #[error("short header: read {0} bytes, need 36")]
    ShortHeader(usize),
    #[error("unsupported format type: {0}")]
    UnsupportedFormatType(i32),
    #[error("tensor `{name}`: unknown element type code {code}")]
    UnknownElementType { name: String, code: i32 },
    #[error("vocab has {actual} entries but the header declares {expected}")]
    VocabSizeMismatch { expected: usize, actual: usize },
    #[error("vocab ids are not dense: no token has id {0}")]
    VocabNotDense(usize),
    #[error("token id {id} is assigned to both `{first}` and `{second}`")]
    DuplicateTokenId { id: u32, first: String, second: String },
    #[error("tensor `{name}`: payload is {actual} bytes, shape implies {expected}")]
    PayloadSizeMismatch { name: String, expected: usize, actual: usize },
    #[error("{what} = {value} does not fit in an i32 field")]
    FieldOverflow { what: String, value: usize },
    #[error("negative {what}: {value}")]
    NegativeField { what: &'static str, value: i32 },
    #[error("string too large: {0} bytes")]
    StringTooLarge(u64),
    #[error("tensor rank {0} exceeds the supported maximum")]
    RankTooLarge(i32),
    #[error("invalid UTF-8 in {0}")]
    InvalidUtf8(String),
    #[error("truncated container: unexpected end of file in {0}")]
    Truncated(&'static str),
    #[error("malformed container: {0}")]
    Malformed(&'static str),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, FormatError>;

/// Narrow a length or dimension to the i32 used on disk.
pub(crate) fn to_i32(value: usize, what: &str) -> Result<i32> {
    i32::try_from(value).map_err(|_| FormatError::FieldOverflow { what: what.to_string(), value })
}
