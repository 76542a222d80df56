//! Vocabulary loading from `tokenizer.json` or `vocab.txt`.

use crate::error::{ConvertError, Result};
use ner_format::Vocab;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const VOCAB_TXT_FILE: &str = "vocab.txt";

#[derive(Debug, Deserialize)]
struct TokenizerJson {
    model: TokenizerModel,
    #[serde(default)]
    added_tokens: Vec<AddedToken>,
}

#[derive(Debug, Deserialize)]
struct TokenizerModel {
    vocab: HashMap<String, u32>,
}

#[derive(Debug, Deserialize)]
struct AddedToken {
    id: u32,
    content: String,
}

/// Load the token vocabulary from a model directory.
///
/// `tokenizer.json` is preferred; `vocab.txt` (one token per line, line
/// number = id) is the fallback.
pub fn load_vocab(model_dir: &Path) -> Result<Vocab> {
    let tokenizer_path = model_dir.join(TOKENIZER_FILE);
    if tokenizer_path.is_file() {
        let text = fs::read_to_string(&tokenizer_path)
            .map_err(|e| ConvertError::io(&tokenizer_path, e))?;
        let ids = token_ids_from_tokenizer_json(&text)
            .map_err(|source| ConvertError::Json { path: tokenizer_path, source })?;
        return Ok(Vocab::from_token_ids(ids)?);
    }

    let txt_path = model_dir.join(VOCAB_TXT_FILE);
    if txt_path.is_file() {
        warn!(dir = %model_dir.display(), "no tokenizer.json, falling back to vocab.txt");
        let text = fs::read_to_string(&txt_path).map_err(|e| ConvertError::io(&txt_path, e))?;
        return Ok(vocab_from_lines(&text));
    }

    Err(ConvertError::MissingVocab(model_dir.to_path_buf()))
}

/// Token ids from a `tokenizer.json`: `model.vocab` merged with `added_tokens`.
pub fn token_ids_from_tokenizer_json(text: &str) -> serde_json::Result<HashMap<String, u32>> {
    let parsed: TokenizerJson = serde_json::from_str(text)?;
    let mut ids = parsed.model.vocab;
    let base = ids.len();
    for token in parsed.added_tokens {
        ids.insert(token.content, token.id);
    }
    debug!(base, total = ids.len(), "parsed tokenizer vocab");
    Ok(ids)
}

/// One token per line; the line index is the id.
pub fn vocab_from_lines(text: &str) -> Vocab {
    Vocab::from_ordered(text.lines().map(str::to_string).collect())
}
