//! BERT NER checkpoint to model container converter
//!
//! # Usage
//!
//! ```bash
//! # Convert to models/dslim_bert-base-NER_ner.bin with mixed precision
//! ner-convert ./bert-base-NER --model-id dslim/bert-base-NER
//!
//! # Keep every tensor in f32
//! ner-convert ./bert-base-NER --ftype 0
//!
//! # Check the BERT layout first and re-read the result afterwards
//! ner-convert ./bert-base-NER --strict --verify -o ner.bin
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use ner_convert::config::DEFAULT_OUTPUT_DIR;
use ner_convert::{ConvertConfig, convert};
use ner_format::FormatType;
use std::path::PathBuf;

/// Convert a BERT token-classification checkpoint into a NER model container
#[derive(Parser, Debug)]
#[command(name = "ner-convert")]
#[command(version)]
struct Args {
    /// Directory with config.json, tokenizer.json or vocab.txt, and model.safetensors
    model_dir: PathBuf,

    /// Model identifier used to name the output file (default: directory name)
    #[arg(long)]
    model_id: Option<String>,

    /// 0 = all f32, 1 = 2-D weight matrices as f16
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(i32).range(0..=1))]
    ftype: i32,

    /// Directory for the derived output file name
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Explicit output path (overrides --output-dir and --model-id)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Fail unless the checkpoint matches the BERT token-classification layout
    #[arg(short, long)]
    strict: bool,

    /// Re-read the written file and check header, vocab and record count
    #[arg(long)]
    verify: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    let format_type = FormatType::from_code(args.ftype).context("ftype must be 0 or 1")?;

    let cfg = ConvertConfig {
        model_dir: args.model_dir,
        model_id: args.model_id,
        format_type,
        output_dir: args.output_dir,
        output: args.output,
        strict: args.strict,
        verify: args.verify,
    };

    tracing::info!("Model: {}", cfg.model_dir.display());
    tracing::info!("Output: {}", cfg.output_path().display());
    tracing::info!("Format type: {:?}", cfg.format_type);

    let report = convert(&cfg)
        .with_context(|| format!("Failed to convert {}", cfg.model_dir.display()))?;

    tracing::info!("Done! Model saved to {}", report.output.display());
    tracing::info!(
        "  Tensors: {} ({} f16, {} skipped), {} bytes",
        report.summary.tensors_written,
        report.summary.f16_tensors,
        report.summary.tensors_skipped,
        report.summary.bytes_written
    );

    Ok(())
}
