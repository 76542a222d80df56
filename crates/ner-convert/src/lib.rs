//! Hugging Face BERT token-classification export to NER model container.
//!
//! A model directory holds `config.json`, `tokenizer.json` (or `vocab.txt`)
//! and `model.safetensors`. [`convert`] reads all three, builds the header
//! and vocabulary, and streams every tensor through
//! [`ner_format::encode`] in the model's definition order.
//!
//! ```no_run
//! use ner_convert::{ConvertConfig, convert};
//!
//! let mut cfg = ConvertConfig::new("checkpoints/bert-base-NER");
//! cfg.model_id = Some("dslim/bert-base-NER".into());
//! let report = convert(&cfg)?;
//! println!("wrote {}", report.output.display());
//! # Ok::<(), ner_convert::ConvertError>(())
//! ```

pub mod config;
pub mod error;
pub mod layout;
pub mod pipeline;
pub mod vocab;
pub mod weights;

pub use config::{ConvertConfig, ModelConfig, output_file_name};
pub use error::{ConvertError, Result};
pub use layout::{check_layout, expected_tensors, order_tensors};
pub use pipeline::{ConvertReport, convert, verify_container, write_container};
pub use vocab::load_vocab;
