//! Per-tensor storage precision.

use crate::header::FormatType;
use crate::names::is_weight_matrix;
use crate::tensor::ElementType;

/// Decide the on-disk element type of one tensor.
///
/// Under [`FormatType::Mixed`] a tensor is stored as f16 when its cleaned
/// name ends in `.weight` and its squeezed rank is 2; every other tensor
/// (biases, LayerNorm vectors, anything not 2-D) stays f32. Under
/// [`FormatType::Full`] everything is f32.
///
/// The rule is literal: a 2-D embedding table named `*.weight` is halved too.
///
/// ```
/// use ner_format::{ElementType, FormatType, policy::select_element_type};
///
/// assert_eq!(select_element_type("classifier.weight", 2, FormatType::Mixed), ElementType::F16);
/// assert_eq!(select_element_type("classifier.bias", 1, FormatType::Mixed), ElementType::F32);
/// assert_eq!(select_element_type("classifier.weight", 2, FormatType::Full), ElementType::F32);
/// ```
pub fn select_element_type(clean_name: &str, rank: usize, format_type: FormatType) -> ElementType {
    match format_type {
        FormatType::Mixed if rank == 2 && is_weight_matrix(clean_name) => ElementType::F16,
        _ => ElementType::F32,
    }
}
