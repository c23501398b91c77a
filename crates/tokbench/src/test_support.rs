//! Test doubles shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use candle_core::Device;

use crate::engine::{DecodeEngine, DecodeParams, Decoded};
use crate::error::{BenchError, Result};
use crate::input::PreparedInput;
use crate::latency::LatencySample;
use crate::tensor::constant::SEQ_DIM;
use crate::tensor::operations::{matrix_from_rows, rows_of};
use crate::tokenizer::{Encoded, Tokenizer};

/// Whitespace word-level tokenizer.
///
/// Id `0` is `</s>`, used for both end-of-sequence and padding; the supplied
/// words take ids `1..`.
pub(crate) struct MockTokenizer {
    vocab: Vec<String>,
}

impl MockTokenizer {
    pub(crate) fn new(words: &[&str]) -> Self {
        Self { vocab: words.iter().map(|w| w.to_string()).collect() }
    }

    fn id_of(&self, word: &str) -> Result<u32> {
        self.vocab
            .iter()
            .position(|w| w == word)
            .map(|idx| idx as u32 + 1)
            .ok_or_else(|| BenchError::Tokenization(format!("unknown word `{word}`")))
    }
}

impl Tokenizer for MockTokenizer {
    fn encode_batch(&self, texts: &[String]) -> Result<Encoded> {
        let rows = texts
            .iter()
            .map(|text| text.split_whitespace().map(|w| self.id_of(w)).collect::<Result<Vec<_>>>())
            .collect::<Result<Vec<_>>>()?;
        let longest = rows.iter().map(Vec::len).max().unwrap_or(0);

        let mut ids = Vec::with_capacity(rows.len());
        let mut attention_mask = Vec::with_capacity(rows.len());
        for row in rows {
            let padding = longest - row.len();
            let mut padded = vec![0; padding];
            padded.extend(&row);
            let mut mask = vec![0; padding];
            mask.extend(std::iter::repeat(1).take(row.len()));
            ids.push(padded);
            attention_mask.push(mask);
        }
        Ok(Encoded { ids, attention_mask })
    }

    fn decode_batch(&self, ids: &[Vec<u32>]) -> Result<Vec<String>> {
        ids.iter()
            .map(|row| {
                row.iter()
                    .filter(|id| **id != 0)
                    .map(|id| {
                        self.vocab
                            .get(*id as usize - 1)
                            .cloned()
                            .ok_or_else(|| BenchError::Tokenization(format!("unknown id {id}")))
                    })
                    .collect::<Result<Vec<_>>>()
                    .map(|words| words.join(" "))
            })
            .collect()
    }

    fn eos_token_id(&self) -> u32 {
        0
    }

    fn pad_token_id(&self) -> u32 {
        0
    }
}

enum Script {
    Append(Vec<u32>),
    Truncate,
    Fail(String),
}

/// Decode engine replaying a fixed continuation and latency sample.
///
/// Every call sleeps for the sum of its sample, so on a paused tokio clock the
/// measured wall-clock total matches the sample exactly.
pub(crate) struct ScriptedEngine {
    script: Script,
    steps: Vec<f64>,
    calls: AtomicUsize,
}

impl ScriptedEngine {
    /// Appends `tokens` to every input row
    pub(crate) fn new(tokens: Vec<u32>, steps: Vec<f64>) -> Self {
        Self { script: Script::Append(tokens), steps, calls: AtomicUsize::new(0) }
    }

    /// Returns only the first input column, shorter than any multi-token input
    pub(crate) fn truncating(steps: Vec<f64>) -> Self {
        Self { script: Script::Truncate, steps, calls: AtomicUsize::new(0) }
    }

    pub(crate) fn failing(message: &str) -> Self {
        Self { script: Script::Fail(message.to_string()), steps: vec![], calls: AtomicUsize::new(0) }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DecodeEngine for ScriptedEngine {
    fn name(&self) -> String {
        "scripted".to_string()
    }

    async fn decode(&self, input: &PreparedInput, _params: &DecodeParams) -> Result<Decoded> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let latency = LatencySample::new(self.steps.clone());
        tokio::time::sleep(Duration::from_secs_f64(latency.total())).await;

        let output_ids = match &self.script {
            Script::Append(tokens) => {
                let rows: Vec<Vec<u32>> = rows_of(&input.input_ids)?
                    .into_iter()
                    .map(|mut row| {
                        row.extend(tokens);
                        row
                    })
                    .collect();
                matrix_from_rows(&rows, &Device::Cpu)?
            }
            Script::Truncate => input.input_ids.narrow(SEQ_DIM, 0, 1)?,
            Script::Fail(message) => return Err(BenchError::Decode(message.clone())),
        };
        Ok(Decoded { output_ids, latency })
    }
}
