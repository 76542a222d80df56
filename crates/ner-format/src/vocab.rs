//! Token vocabulary in id order.

use crate::error::{FormatError, Result, to_i32};
use std::io::Write;

/// Vocabulary whose position `i` holds the token with id `i`.
///
/// Tokenizers hand out a `token -> id` map whose iteration order has nothing
/// to do with the ids; [`Vocab::from_token_ids`] sorts by id and checks that
/// the ids cover `0..len` exactly once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocab {
    tokens: Vec<String>,
}

impl Vocab {
    /// Build from `(token, id)` pairs in any order.
    ///
    /// ```
    /// use ner_format::Vocab;
    ///
    /// let vocab = Vocab::from_token_ids([("b", 1), ("[PAD]", 0), ("c", 2)]).unwrap();
    /// assert_eq!(vocab.tokens(), ["[PAD]", "b", "c"]);
    ///
    /// assert!(Vocab::from_token_ids([("a", 0), ("c", 2)]).is_err());
    /// ```
    pub fn from_token_ids<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        let mut by_id: Vec<(u32, String)> =
            pairs.into_iter().map(|(token, id)| (id, token.into())).collect();
        by_id.sort_by_key(|(id, _)| *id);

        for (i, (id, token)) in by_id.iter().enumerate() {
            if i > 0 && by_id[i - 1].0 == *id {
                return Err(FormatError::DuplicateTokenId {
                    id: *id,
                    first: by_id[i - 1].1.clone(),
                    second: token.clone(),
                });
            }
            if *id as usize != i {
                return Err(FormatError::VocabNotDense(i));
            }
        }

        Ok(Self { tokens: by_id.into_iter().map(|(_, tok)| tok).collect() })
    }

    /// Wrap tokens that are already in id order (e.g. the lines of `vocab.txt`).
    pub fn from_ordered(tokens: Vec<String>) -> Self {
        Self { tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Token for `id`, if in range.
    pub fn get(&self, id: usize) -> Option<&str> {
        self.tokens.get(id).map(String::as_str)
    }

    /// Encoded size of the vocab section.
    pub fn encoded_len(&self) -> usize {
        self.tokens.iter().map(|t| 4 + t.len()).sum()
    }

    /// Write every entry as `i32 byte_len` + UTF-8 bytes. Returns bytes written.
    pub(crate) fn write_to<W: Write>(&self, w: &mut W) -> Result<usize> {
        let mut written = 0;
        for token in &self.tokens {
            let bytes = token.as_bytes();
            let len = to_i32(bytes.len(), "token byte length")?;
            w.write_all(&len.to_le_bytes())?;
            w.write_all(bytes)?;
            written += 4 + bytes.len();
        }
        Ok(written)
    }
}
