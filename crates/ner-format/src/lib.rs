//! Binary container for BERT token-classification models.
//!
//! A container holds everything a minimal inference engine needs to run the
//! model without touching the training framework: the hyperparameters, the
//! WordPiece vocabulary and every weight tensor. The layout is fixed and
//! little-endian with no padding anywhere:
//!
//! ```text
//! ModelHeader   9 x i32   magic, vocab_size, max_position_embeddings,
//!                         hidden_size, intermediate_size, num_attention_heads,
//!                         num_hidden_layers, format_type, num_labels
//! Vocab         vocab_size x { i32 byte_len; u8[byte_len] utf8 }   (id order)
//! Tensors       until EOF: { i32 n_dims; i32 name_len; i32 element_type;
//!                            i32 dims[n_dims] (innermost first);
//!                            u8[name_len] name; payload }
//! ```
//!
//! Writing goes through [`encode`] (or the staged [`ModelWriter`]); which
//! tensors are stored as f16 is decided by [`policy::select_element_type`].
//! [`ModelReader`] and [`Container`] read a container back.
//!
//! # Example
//!
//! ```
//! use ner_format::{FormatType, ModelHeader, TensorEntry, Vocab, encode};
//!
//! let header = ModelHeader {
//!     vocab_size: 2,
//!     max_position_embeddings: 8,
//!     hidden_size: 4,
//!     intermediate_size: 16,
//!     num_attention_heads: 1,
//!     num_hidden_layers: 1,
//!     format_type: FormatType::Mixed,
//!     num_labels: 2,
//! };
//! let vocab = Vocab::from_token_ids([("a", 0), ("b", 1)]).unwrap();
//! let bias = TensorEntry::from_f32("bert.classifier.bias", vec![2], &[0.5, -0.5]);
//!
//! let mut out = Vec::new();
//! let summary = encode(&header, &vocab, [&bias], &mut out).unwrap();
//! assert_eq!(summary.bytes_written as usize, out.len());
//! ```

pub mod encoder;
pub mod error;
pub mod header;
pub mod names;
pub mod policy;
pub mod reader;
pub mod tensor;
pub mod vocab;

pub use encoder::{EncodeSummary, ModelWriter, WrittenRecord, encode};
pub use error::{FormatError, Result};
pub use header::{FORMAT_MAGIC, FormatType, HEADER_LEN, ModelHeader, check_magic};
pub use reader::{Container, ModelReader, TensorRecord};
pub use tensor::{ElementType, TensorData, TensorEntry, squeeze_shape};
pub use vocab::Vocab;
