//! Generate a C/C++ header that embeds a model file
//!
//! ```bash
//! # Writes src/include/default_model.hpp
//! ner-header models/dslim_bert-base-NER_ner.bin
//!
//! ner-header model.bin include/ner_model.h --guard NER_MODEL_H --array-name ner_model
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use ner_header::{
    DEFAULT_ARRAY_NAME, DEFAULT_GUARD, DEFAULT_OUTPUT, DEFAULT_SIZE_NAME, HeaderOptions,
    generate_header_file,
};
use std::path::PathBuf;

/// Embed a binary model file in a C/C++ header
#[derive(Parser, Debug)]
#[command(name = "ner-header")]
#[command(version)]
struct Args {
    /// Model file to embed
    input: PathBuf,

    /// Header to write
    #[arg(default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Include guard macro
    #[arg(long, default_value = DEFAULT_GUARD)]
    guard: String,

    /// Name of the byte array
    #[arg(long, default_value = DEFAULT_ARRAY_NAME)]
    array_name: String,

    /// Name of the size constant
    #[arg(long, default_value = DEFAULT_SIZE_NAME)]
    size_name: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    let opts = HeaderOptions {
        guard: args.guard,
        array_name: args.array_name,
        size_name: args.size_name,
    };

    let bytes = generate_header_file(&args.input, &args.output, &opts)
        .with_context(|| format!("Failed to generate header from {}", args.input.display()))?;

    tracing::info!("Done! Header generated at {} ({} bytes embedded)", args.output.display(), bytes);
    Ok(())
}
