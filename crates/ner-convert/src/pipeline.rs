//! End-to-end conversion: model directory in, container file out.

use crate::config::{ConvertConfig, ModelConfig};
use crate::error::{ConvertError, Result};
use crate::layout::{check_layout, order_tensors};
use crate::vocab::load_vocab;
use crate::weights::{WEIGHTS_FILE, collect_tensors, read_checkpoint};
use ner_format::{Container, EncodeSummary, FormatError, ModelHeader, TensorEntry, Vocab, encode};
use safetensors::SafeTensors;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

pub const CONFIG_FILE: &str = "config.json";

/// Outcome of a successful conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertReport {
    pub output: PathBuf,
    pub header: ModelHeader,
    pub summary: EncodeSummary,
    pub verified: bool,
}

/// Convert the model directory named in `cfg`.
///
/// The architecture check, vocabulary and weights are all loaded before the
/// output file is created.
pub fn convert(cfg: &ConvertConfig) -> Result<ConvertReport> {
    let model = ModelConfig::load(&cfg.model_dir.join(CONFIG_FILE))?;
    model.ensure_supported()?;
    let header = model.to_header(cfg.format_type)?;

    let vocab = load_vocab(&cfg.model_dir)?;
    let expected = header.vocab_len()?;
    if vocab.len() != expected {
        return Err(FormatError::VocabSizeMismatch { expected, actual: vocab.len() }.into());
    }
    info!(vocab_size = vocab.len(), "vocabulary loaded");

    let buffer = read_checkpoint(&cfg.model_dir.join(WEIGHTS_FILE))?;
    let st = SafeTensors::deserialize(&buffer)?;
    let mut tensors = collect_tensors(&st)?;
    order_tensors(&model, &mut tensors);
    info!(tensors = tensors.len(), "checkpoint loaded");

    if cfg.strict {
        check_layout(&model, &tensors)?;
        info!("Strict layout validation passed");
    }

    let output = cfg.output_path();
    let summary = write_container(&output, &header, &vocab, &tensors)?;
    info!(
        output = %output.display(),
        bytes = summary.bytes_written,
        tensors = summary.tensors_written,
        f16 = summary.f16_tensors,
        skipped = summary.tensors_skipped,
        "container written"
    );

    if cfg.verify {
        verify_container(&output, &header, summary.tensors_written)?;
        info!("Verification passed");
    }

    Ok(ConvertReport { output, header, summary, verified: cfg.verify })
}

/// Create `path` (and its parent directory) and encode the container into it.
pub fn write_container(
    path: &Path,
    header: &ModelHeader,
    vocab: &Vocab,
    tensors: &[TensorEntry<'_>],
) -> Result<EncodeSummary> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .map_err(|source| ConvertError::Io { path: parent.to_path_buf(), source })?;
    }

    let file = File::create(path)
        .map_err(|source| ConvertError::Io { path: path.to_path_buf(), source })?;
    encode(header, vocab, tensors, BufWriter::new(file)).map_err(|e| match e {
        FormatError::Io(source) => ConvertError::Io { path: path.to_path_buf(), source },
        other => other.into(),
    })
}

/// Re-read a written container and compare it with what was meant to be written.
pub fn verify_container(path: &Path, header: &ModelHeader, records: usize) -> Result<()> {
    let failed = |reason: String| ConvertError::VerificationFailed { path: path.to_path_buf(), reason };

    let container = Container::open(path).map_err(|e| failed(e.to_string()))?;
    if container.header != *header {
        return Err(failed(format!("header reads back as {:?}", container.header)));
    }
    if container.vocab.len() != header.vocab_len()? {
        return Err(failed(format!("vocab has {} entries", container.vocab.len())));
    }
    if container.tensors.len() != records {
        return Err(failed(format!(
            "{} tensor records, expected {records}",
            container.tensors.len()
        )));
    }
    Ok(())
}
