//! Tensor naming predicates.
//!
//! Source checkpoints name encoder tensors relative to the full
//! token-classification model (`bert.encoder.layer.0...`), while containers
//! store them relative to the encoder root (`encoder.layer.0...`). The
//! classifier head already lives at the root and is left alone.
//!
//! # Examples
//!
//! ```
//! use ner_format::names::{clean_tensor_name, is_excluded_tensor, is_weight_matrix};
//!
//! assert_eq!(clean_tensor_name("bert.embeddings.LayerNorm.bias"), "embeddings.LayerNorm.bias");
//! assert_eq!(clean_tensor_name("classifier.weight"), "classifier.weight");
//! assert!(is_excluded_tensor("embeddings.position_ids"));
//! assert!(is_weight_matrix("encoder.layer.0.attention.self.query.weight"));
//! assert!(!is_weight_matrix("encoder.layer.0.attention.self.query.bias"));
//! ```

/// Prefix of the base encoder submodule.
pub const ENCODER_PREFIX: &str = "bert.";

/// Position-index buffer; it carries nothing a reader needs.
pub const POSITION_IDS: &str = "embeddings.position_ids";

/// Suffix of trainable weight tensors (as opposed to `.bias`).
pub const WEIGHT_SUFFIX: &str = ".weight";

/// Strip the encoder prefix, if present. Only one level is removed.
pub fn clean_tensor_name(name: &str) -> &str {
    name.strip_prefix(ENCODER_PREFIX).unwrap_or(name)
}

/// Whether a cleaned tensor name is dropped from the container.
pub fn is_excluded_tensor(clean_name: &str) -> bool {
    clean_name == POSITION_IDS
}

/// Whether a cleaned tensor name denotes a weight (never a bias).
pub fn is_weight_matrix(clean_name: &str) -> bool {
    clean_name.ends_with(WEIGHT_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_single_prefix_level() {
        assert_eq!(clean_tensor_name("bert.bert.pooler.dense.weight"), "bert.pooler.dense.weight");
        assert_eq!(clean_tensor_name("bert."), "");
    }

    #[test]
    fn prefix_must_be_leading() {
        assert_eq!(clean_tensor_name("xbert.classifier.bias"), "xbert.classifier.bias");
        assert_eq!(clean_tensor_name("classifier.bert.weight"), "classifier.bert.weight");
    }

    #[test]
    fn exclusion_uses_cleaned_name() {
        assert!(is_excluded_tensor(clean_tensor_name("bert.embeddings.position_ids")));
        assert!(!is_excluded_tensor("bert.embeddings.position_ids"));
        assert!(!is_excluded_tensor("embeddings.position_embeddings.weight"));
    }

    #[test]
    fn weight_suffix() {
        assert!(is_weight_matrix("classifier.weight"));
        assert!(is_weight_matrix("embeddings.LayerNorm.weight"));
        assert!(!is_weight_matrix("classifier.bias"));
        assert!(!is_weight_matrix("weight"));
        assert!(!is_weight_matrix("classifier.weights"));
    }
}
