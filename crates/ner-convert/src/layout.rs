//! Expected BERT token-classification tensor layout.
//!
//! Names are the cleaned ones stored in the container; shapes are logical
//! (outermost first) and compared after squeezing, as the encoder stores them.

use crate::config::ModelConfig;
use crate::error::{ConvertError, Result};
use ner_format::names::{clean_tensor_name, is_excluded_tensor};
use ner_format::{TensorEntry, squeeze_shape};
use std::collections::HashMap;
use tracing::warn;

/// Tensors of one encoder layer, as `(suffix, shape)` builders.
const LAYER_TENSORS: &[(&str, Dim, Dim)] = &[
    ("attention.self.query.weight", Dim::Hidden, Dim::Hidden),
    ("attention.self.query.bias", Dim::Hidden, Dim::One),
    ("attention.self.key.weight", Dim::Hidden, Dim::Hidden),
    ("attention.self.key.bias", Dim::Hidden, Dim::One),
    ("attention.self.value.weight", Dim::Hidden, Dim::Hidden),
    ("attention.self.value.bias", Dim::Hidden, Dim::One),
    ("attention.output.dense.weight", Dim::Hidden, Dim::Hidden),
    ("attention.output.dense.bias", Dim::Hidden, Dim::One),
    ("attention.output.LayerNorm.weight", Dim::Hidden, Dim::One),
    ("attention.output.LayerNorm.bias", Dim::Hidden, Dim::One),
    ("intermediate.dense.weight", Dim::Intermediate, Dim::Hidden),
    ("intermediate.dense.bias", Dim::Intermediate, Dim::One),
    ("output.dense.weight", Dim::Hidden, Dim::Intermediate),
    ("output.dense.bias", Dim::Hidden, Dim::One),
    ("output.LayerNorm.weight", Dim::Hidden, Dim::One),
    ("output.LayerNorm.bias", Dim::Hidden, Dim::One),
];

#[derive(Clone, Copy)]
enum Dim {
    One,
    Hidden,
    Intermediate,
}

impl Dim {
    fn size(self, cfg: &ModelConfig) -> usize {
        match self {
            Dim::One => 1,
            Dim::Hidden => cfg.hidden_size,
            Dim::Intermediate => cfg.intermediate_size,
        }
    }
}

/// Every tensor the loader looks up, with its squeezed shape.
pub fn expected_tensors(cfg: &ModelConfig) -> Vec<(String, Vec<usize>)> {
    let h = cfg.hidden_size;
    let labels = cfg.num_labels();
    let mut expected = vec![
        ("embeddings.word_embeddings.weight".to_string(), vec![cfg.vocab_size, h]),
        ("embeddings.position_embeddings.weight".to_string(), vec![cfg.max_position_embeddings, h]),
        ("embeddings.token_type_embeddings.weight".to_string(), vec![cfg.type_vocab_size(), h]),
        ("embeddings.LayerNorm.weight".to_string(), vec![h]),
        ("embeddings.LayerNorm.bias".to_string(), vec![h]),
    ];
    for layer in 0..cfg.num_hidden_layers {
        for &(suffix, rows, cols) in LAYER_TENSORS {
            let shape = vec![rows.size(cfg), cols.size(cfg)];
            expected.push((format!("encoder.layer.{layer}.{suffix}"), shape));
        }
    }
    expected.push(("classifier.weight".to_string(), vec![labels, h]));
    expected.push(("classifier.bias".to_string(), vec![labels]));

    for (_, shape) in &mut expected {
        *shape = squeeze_shape(shape);
    }
    expected
}

/// Put tensors in the model's definition order.
///
/// `position_ids` comes first, then the [`expected_tensors`] list (layers in
/// numeric order, not name order). Tensors outside the layout keep their
/// relative order and go last.
pub fn order_tensors(cfg: &ModelConfig, tensors: &mut [TensorEntry<'_>]) {
    let rank: HashMap<String, usize> = expected_tensors(cfg)
        .into_iter()
        .enumerate()
        .map(|(i, (name, _))| (name, i + 1))
        .collect();
    tensors.sort_by_cached_key(|t| {
        let name = clean_tensor_name(&t.name);
        if is_excluded_tensor(name) {
            0
        } else {
            rank.get(name).copied().unwrap_or(usize::MAX)
        }
    });
}

/// Check the checkpoint against [`expected_tensors`].
///
/// Missing tensors and shape mismatches are errors; unknown tensors are
/// ignored by the loader and only logged.
pub fn check_layout(cfg: &ModelConfig, tensors: &[TensorEntry<'_>]) -> Result<()> {
    let found: HashMap<&str, Vec<usize>> = tensors
        .iter()
        .map(|t| (clean_tensor_name(&t.name), squeeze_shape(&t.shape)))
        .filter(|(name, _)| !is_excluded_tensor(name))
        .collect();

    let expected = expected_tensors(cfg);
    let mut problems = Vec::new();
    for (name, shape) in &expected {
        match found.get(name.as_str()) {
            None => problems.push(format!("missing tensor `{name}`")),
            Some(actual) if actual != shape => {
                problems.push(format!("`{name}` has shape {actual:?}, expected {shape:?}"))
            }
            Some(_) => {}
        }
    }

    for name in found.keys() {
        if !expected.iter().any(|(e, _)| e == name) {
            warn!(name, "tensor is not part of the BERT layout and will be ignored by the loader");
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(ConvertError::LayoutMismatch(problems.join("; ")))
    }
}
