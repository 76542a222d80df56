//! Byte file to C/C++ header transcoder.
//!
//! Turns any file (typically a NER model container) into a header declaring
//! a `static const uint8_t` array with the file's bytes and a `size_t`
//! holding its length, so the model can be compiled into a binary. The
//! input is never interpreted.
//!
//! ```
//! use ner_header::{HeaderOptions, transcode};
//!
//! let text = transcode(&[0x00, 0xff, 0x10], "tiny.bin", &HeaderOptions::default());
//! assert!(text.contains("    0x00, 0xff, 0x10\n};"));
//! assert!(text.contains("// Original size: 3 bytes"));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Bytes emitted per line of the array literal.
pub const BYTES_PER_LINE: usize = 12;
/// Output path used when none is given.
pub const DEFAULT_OUTPUT: &str = "src/include/default_model.hpp";

pub const DEFAULT_GUARD: &str = "DEFAULT_MODEL_HPP";
pub const DEFAULT_ARRAY_NAME: &str = "DEFAULT_MODEL_DATA";
pub const DEFAULT_SIZE_NAME: &str = "DEFAULT_MODEL_SIZE";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum HeaderError {
    #[error("input not found: {}", .0.display())]
    MissingInput(PathBuf),
    #[error("input is empty: {}", .0.display())]
    EmptyInput(PathBuf),
    #[error("{what} `{value}` is not a valid C identifier")]
    InvalidIdentifier { what: &'static str, value: String },
    #[error("I/O error on {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

pub type Result<T> = std::result::Result<T, HeaderError>;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Identifiers used in the generated header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderOptions {
    /// Include guard macro.
    pub guard: String,
    /// Name of the byte array.
    pub array_name: String,
    /// Name of the size constant.
    pub size_name: String,
}

impl Default for HeaderOptions {
    fn default() -> Self {
        Self {
            guard: DEFAULT_GUARD.to_string(),
            array_name: DEFAULT_ARRAY_NAME.to_string(),
            size_name: DEFAULT_SIZE_NAME.to_string(),
        }
    }
}

impl HeaderOptions {
    /// Check that every name is a usable C identifier.
    pub fn validate(&self) -> Result<()> {
        for (what, value) in [
            ("include guard", &self.guard),
            ("array name", &self.array_name),
            ("size name", &self.size_name),
        ] {
            if !is_c_identifier(value) {
                return Err(HeaderError::InvalidIdentifier { what, value: value.clone() });
            }
        }
        Ok(())
    }
}

fn is_c_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// ---------------------------------------------------------------------------
// Transcoding
// ---------------------------------------------------------------------------

/// Render `data` as a header.
///
/// `source_name` only appears in a comment. Bytes are written as lowercase
/// `0x??` literals, [`BYTES_PER_LINE`] per line, with a comma after every
/// line except the last.
pub fn transcode(data: &[u8], source_name: &str, opts: &HeaderOptions) -> String {
    // "0x??, " per byte plus indentation and line ends.
    let mut out = String::with_capacity(data.len() * 6 + data.len() / BYTES_PER_LINE * 6 + 512);

    out.push_str(&format!("#ifndef {}\n#define {}\n\n", opts.guard, opts.guard));
    out.push_str("#include <stdint.h>\n#include <stddef.h>\n\n");
    out.push_str(&format!("// Bundled model from {source_name}\n"));
    out.push_str(&format!("// Original size: {} bytes\n", data.len()));
    out.push_str(&format!("static const uint8_t {}[] = {{\n", opts.array_name));

    let lines = data.len().div_ceil(BYTES_PER_LINE);
    for (i, chunk) in data.chunks(BYTES_PER_LINE).enumerate() {
        out.push_str("    ");
        for (j, &b) in chunk.iter().enumerate() {
            if j > 0 {
                out.push_str(", ");
            }
            // Writing to a String cannot fail.
            let _ = write!(out, "0x{b:02x}");
        }
        if i + 1 < lines {
            out.push(',');
        }
        out.push('\n');
    }

    out.push_str("};\n\n");
    out.push_str(&format!(
        "static const size_t {} = sizeof({});\n\n",
        opts.size_name, opts.array_name
    ));
    out.push_str(&format!("#endif // {}\n", opts.guard));
    out
}

/// Read `input`, transcode it and write the header to `output`.
///
/// The output's parent directory is created if needed. Nothing is written
/// when the input is missing or empty. Returns the number of bytes embedded.
pub fn generate_header_file(input: &Path, output: &Path, opts: &HeaderOptions) -> Result<usize> {
    opts.validate()?;

    let data = fs::read(input).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => HeaderError::MissingInput(input.to_path_buf()),
        _ => HeaderError::Io { path: input.to_path_buf(), source },
    })?;
    if data.is_empty() {
        return Err(HeaderError::EmptyInput(input.to_path_buf()));
    }
    debug!(bytes = data.len(), input = %input.display(), "read input");

    let source_name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.display().to_string());
    let text = transcode(&data, &source_name, opts);

    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .map_err(|source| HeaderError::Io { path: parent.to_path_buf(), source })?;
    }
    fs::write(output, text).map_err(|source| HeaderError::Io { path: output.to_path_buf(), source })?;

    info!(bytes = data.len(), output = %output.display(), "header generated");
    Ok(data.len())
}
