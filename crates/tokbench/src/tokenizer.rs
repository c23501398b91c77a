//! Tokenizer collaborator.
//!
//! The harness only needs batched, left-padded encoding and batched decoding.
//! [`HfTokenizer`] provides both on top of a Hugging Face `tokenizer.json`.

use std::path::Path;

use tokenizers::{PaddingDirection, PaddingParams, PaddingStrategy};
use tracing::{debug, warn};

use crate::error::{BenchError, Result};

/// Token names tried, in order, when no end-of-sequence token is configured
pub const EOS_CANDIDATES: &[&str] = &["</s>", "<|endoftext|>", "<eos>", "<|end_of_text|>"];

/// Token names tried, in order, for the padding token
pub const PAD_CANDIDATES: &[&str] = &["[PAD]", "<pad>", "<|pad|>"];

/// A left-padded batch of token ids with its attention mask.
///
/// Every row of `ids` and `attention_mask` has the same length. Mask entries
/// are `1` for real tokens and `0` for padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    pub ids: Vec<Vec<u32>>,
    pub attention_mask: Vec<Vec<u32>>,
}

/// # Tokenizer
///
/// Text to token id mapping used by the input builder and the session.
///
/// ## Implementation Notes
///
/// - `encode_batch` pads every row on the left to the longest row, so the
///   most recent tokens line up across the batch
/// - `pad_token_id` falls back to `eos_token_id` when the vocabulary has no
///   padding token
pub trait Tokenizer: Send + Sync {
    /// Encodes `texts` as one batch, padding shorter sequences on the left.
    fn encode_batch(&self, texts: &[String]) -> Result<Encoded>;

    /// Decodes every row of `ids`, skipping special tokens.
    ///
    /// # Returns
    ///
    /// One string per row, in row order.
    fn decode_batch(&self, ids: &[Vec<u32>]) -> Result<Vec<String>>;

    fn eos_token_id(&self) -> u32;

    fn pad_token_id(&self) -> u32;
}

/// [`Tokenizer`] backed by the `tokenizers` crate.
pub struct HfTokenizer {
    inner: tokenizers::Tokenizer,
    eos_token_id: u32,
    pad_token_id: u32,
}

impl HfTokenizer {
    /// Loads a `tokenizer.json` file.
    ///
    /// `eos_token` names the end-of-sequence token explicitly; when `None` the
    /// first of [`EOS_CANDIDATES`] known to the vocabulary is used.
    pub fn from_file(path: impl AsRef<Path>, eos_token: Option<&str>) -> Result<Self> {
        let path = path.as_ref();
        let inner = tokenizers::Tokenizer::from_file(path).map_err(|err| {
            BenchError::Tokenization(format!("failed to load tokenizer {}: {err}", path.display()))
        })?;
        Self::new(inner, eos_token)
    }

    /// Wraps an already constructed tokenizer and switches it to left padding.
    pub fn new(mut inner: tokenizers::Tokenizer, eos_token: Option<&str>) -> Result<Self> {
        let eos_token_id = match eos_token {
            Some(token) => inner.token_to_id(token).ok_or_else(|| {
                BenchError::Tokenization(format!("end-of-sequence token `{token}` is not in the vocabulary"))
            })?,
            None => EOS_CANDIDATES
                .iter()
                .find_map(|token| inner.token_to_id(token))
                .ok_or_else(|| {
                    BenchError::Tokenization("no end-of-sequence token found in the vocabulary".into())
                })?,
        };

        let (pad_token, pad_token_id) = match PAD_CANDIDATES
            .iter()
            .find_map(|token| inner.token_to_id(token).map(|id| (token.to_string(), id)))
        {
            Some(found) => found,
            None => {
                // no dedicated pad token, so pad with end-of-sequence
                warn!(eos_token_id, "tokenizer has no padding token, padding with the end-of-sequence token");
                let token = inner.id_to_token(eos_token_id).unwrap_or_default();
                (token, eos_token_id)
            }
        };

        inner.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            direction: PaddingDirection::Left,
            pad_id: pad_token_id,
            pad_token,
            ..Default::default()
        }));
        debug!(eos_token_id, pad_token_id, "tokenizer ready");

        Ok(Self { inner, eos_token_id, pad_token_id })
    }
}

impl Tokenizer for HfTokenizer {
    fn encode_batch(&self, texts: &[String]) -> Result<Encoded> {
        let inputs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let encodings = self
            .inner
            .encode_batch(inputs, true)
            .map_err(|err| BenchError::Tokenization(err.to_string()))?;

        let ids = encodings.iter().map(|enc| enc.get_ids().to_vec()).collect();
        let attention_mask = encodings
            .iter()
            .map(|enc| enc.get_attention_mask().to_vec())
            .collect();
        Ok(Encoded { ids, attention_mask })
    }

    fn decode_batch(&self, ids: &[Vec<u32>]) -> Result<Vec<String>> {
        let rows: Vec<&[u32]> = ids.iter().map(Vec::as_slice).collect();
        self.inner
            .decode_batch(&rows, true)
            .map_err(|err| BenchError::Tokenization(err.to_string()))
    }

    fn eos_token_id(&self) -> u32 {
        self.eos_token_id
    }

    fn pad_token_id(&self) -> u32 {
        self.pad_token_id
    }
}
