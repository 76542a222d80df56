//! Model hyperparameters and conversion settings.

use crate::error::{ConvertError, Result};
use ner_format::{FormatType, ModelHeader};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Only architecture the container layout describes.
pub const SUPPORTED_MODEL_TYPE: &str = "bert";
/// Labels assumed when the config names none.
pub const DEFAULT_NUM_LABELS: usize = 2;
/// Default directory for converted models.
pub const DEFAULT_OUTPUT_DIR: &str = "models";

// ---------------------------------------------------------------------------
// config.json
// ---------------------------------------------------------------------------

/// The subset of a Hugging Face `config.json` the converter needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub model_type: String,
    pub vocab_size: usize,
    pub max_position_embeddings: usize,
    pub hidden_size: usize,
    pub intermediate_size: usize,
    pub num_attention_heads: usize,
    pub num_hidden_layers: usize,
    #[serde(default)]
    pub num_labels: Option<usize>,
    #[serde(default)]
    pub id2label: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub type_vocab_size: Option<usize>,
}

impl ModelConfig {
    /// Read and parse `config.json`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| ConvertError::io(path, e))?;
        Self::from_json(&text).map_err(|source| ConvertError::Json { path: path.to_path_buf(), source })
    }

    pub fn from_json(text: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Reject anything that is not a BERT encoder.
    pub fn ensure_supported(&self) -> Result<()> {
        if self.model_type != SUPPORTED_MODEL_TYPE {
            return Err(ConvertError::UnsupportedArchitecture { found: self.model_type.clone() });
        }
        Ok(())
    }

    /// Label count: explicit `num_labels`, else the size of `id2label`, else 2.
    pub fn num_labels(&self) -> usize {
        self.num_labels
            .or_else(|| self.id2label.as_ref().map(BTreeMap::len))
            .unwrap_or(DEFAULT_NUM_LABELS)
    }

    /// Token type vocabulary (segment embeddings); BERT uses 2.
    pub fn type_vocab_size(&self) -> usize {
        self.type_vocab_size.unwrap_or(2)
    }

    /// Build the container header for `format_type`.
    pub fn to_header(&self, format_type: FormatType) -> Result<ModelHeader> {
        Ok(ModelHeader {
            vocab_size: field(self.vocab_size, "vocab_size")?,
            max_position_embeddings: field(self.max_position_embeddings, "max_position_embeddings")?,
            hidden_size: field(self.hidden_size, "hidden_size")?,
            intermediate_size: field(self.intermediate_size, "intermediate_size")?,
            num_attention_heads: field(self.num_attention_heads, "num_attention_heads")?,
            num_hidden_layers: field(self.num_hidden_layers, "num_hidden_layers")?,
            format_type,
            num_labels: field(self.num_labels(), "num_labels")?,
        })
    }
}

fn field(value: usize, name: &str) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| ConvertError::InvalidConfig(format!("{name} = {value} does not fit in an i32")))
}

// ---------------------------------------------------------------------------
// Conversion settings
// ---------------------------------------------------------------------------

/// Settings for one conversion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertConfig {
    /// Directory holding `config.json`, the tokenizer files and `model.safetensors`.
    pub model_dir: PathBuf,
    /// Identifier used to name the output; defaults to the directory name.
    pub model_id: Option<String>,
    pub format_type: FormatType,
    /// Directory for the derived output name.
    pub output_dir: PathBuf,
    /// Explicit output path, overriding `output_dir` and `model_id`.
    pub output: Option<PathBuf>,
    /// Check the tensor dictionary against the BERT layout before writing.
    pub strict: bool,
    /// Re-read the container once written.
    pub verify: bool,
}

impl ConvertConfig {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            model_id: None,
            format_type: FormatType::default(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            output: None,
            strict: false,
            verify: false,
        }
    }

    /// The model identifier, falling back to the last component of `model_dir`.
    pub fn model_id(&self) -> String {
        if let Some(id) = &self.model_id {
            return id.clone();
        }
        self.model_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_string())
    }

    /// Where the container will be written.
    pub fn output_path(&self) -> PathBuf {
        match &self.output {
            Some(path) => path.clone(),
            None => self.output_dir.join(output_file_name(&self.model_id())),
        }
    }
}

/// `org/name` becomes `org_name_ner.bin`.
///
/// ```
/// use ner_convert::output_file_name;
///
/// assert_eq!(output_file_name("dslim/bert-base-NER"), "dslim_bert-base-NER_ner.bin");
/// ```
pub fn output_file_name(model_id: &str) -> String {
    format!("{}_ner.bin", model_id.replace(['/', '\\'], "_"))
}
