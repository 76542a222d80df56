use ner_format::FormatError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while converting a checkpoint directory.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("only BERT models are supported, got model_type `{found}`")]
    UnsupportedArchitecture { found: String },
    #[error("required input not found: {}", .0.display())]
    MissingInput(PathBuf),
    #[error("no vocabulary in {} (looked for tokenizer.json and vocab.txt)", .0.display())]
    MissingVocab(PathBuf),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("failed to parse {}: {source}", path.display())]
    Json { path: PathBuf, source: serde_json::Error },
    #[error("tensor `{name}` has unsupported dtype {dtype}")]
    UnsupportedDtype { name: String, dtype: String },
    #[error("layout mismatch: {0}")]
    LayoutMismatch(String),
    #[error("verification of {} failed: {reason}", path.display())]
    VerificationFailed { path: PathBuf, reason: String },
    #[error("invalid safetensors checkpoint: {0}")]
    Weights(#[from] safetensors::SafeTensorError),
    #[error("I/O error on {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Format(#[from] FormatError),
}

pub type Result<T> = std::result::Result<T, ConvertError>;

impl ConvertError {
    /// Attach a path to an I/O error; a missing file becomes `MissingInput`.
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            Self::MissingInput(path)
        } else {
            Self::Io { path, source }
        }
    }
}
