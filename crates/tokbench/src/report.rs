//! Console reporting with output deduplication.
//!
//! Every round prints its latency line. Generated text is printed only when it
//! differs from what the same input batch produced last time, so identical
//! repeat rounds do not flood the console. Records are built every round
//! regardless of what was printed.

use std::collections::HashMap;
use std::io::Write;

use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::latency::Measurement;
use crate::record::BenchmarkRecord;

/// Outputs longer than this many characters are truncated on the console
pub const TRUNCATE_ABOVE_CHARS: usize = 160;

/// Characters kept from a truncated output
pub const TRUNCATED_PREFIX_CHARS: usize = 80;

/// Identity of an input batch: the ordered prompt texts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputKey(Vec<String>);

impl From<&[String]> for OutputKey {
    fn from(texts: &[String]) -> Self {
        Self(texts.to_vec())
    }
}

/// Last decoded batch seen for every input batch.
///
/// Owned by one reporter for the lifetime of a session; it only decides what
/// gets printed and never influences recorded data.
#[derive(Debug, Default)]
pub struct OutputCache {
    last: HashMap<OutputKey, Vec<String>>,
}

impl OutputCache {
    /// Stores `outputs` for `key`, returning `true` if they differ from the
    /// previously stored outputs or the key is new.
    pub fn update(&mut self, key: OutputKey, outputs: &[String]) -> bool {
        match self.last.get(&key) {
            Some(previous) if previous.as_slice() == outputs => false,
            _ => {
                self.last.insert(key, outputs.to_vec());
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.last.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_empty()
    }
}

/// Removes `prompt` from the start of `output` when the model echoed it.
pub fn strip_prompt_echo<'a>(output: &'a str, prompt: &str) -> &'a str {
    output.strip_prefix(prompt).unwrap_or(output)
}

/// Lowercase hex SHA-256 of `text`.
pub fn fingerprint(text: &str) -> String {
    Sha256::digest(text.as_bytes())
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

/// Text shown on the console for one decoded output.
///
/// The prompt echo is stripped; anything longer than
/// [`TRUNCATE_ABOVE_CHARS`] is cut to [`TRUNCATED_PREFIX_CHARS`] followed by
/// `...` and the fingerprint of the full decoded output.
pub fn console_text(decoded: &str, prompt: &str) -> String {
    let shown = strip_prompt_echo(decoded, prompt);
    if shown.chars().count() > TRUNCATE_ABOVE_CHARS {
        let prefix: String = shown.chars().take(TRUNCATED_PREFIX_CHARS).collect();
        format!("{prefix}...{}", fingerprint(decoded))
    } else {
        shown.to_string()
    }
}

/// Writes round summaries to `sink` and builds records.
pub struct Reporter<W> {
    sink: W,
    cache: OutputCache,
}

impl<W: Write> Reporter<W> {
    pub fn new(sink: W) -> Self {
        Self { sink, cache: OutputCache::default() }
    }

    pub fn round_header(&mut self, round: usize) -> Result<()> {
        writeln!(self.sink, "round {round}:")?;
        Ok(())
    }

    /// Prints the latency line, prints outputs if they changed, and returns the
    /// record for this call.
    ///
    /// The record's `output` is the first decoded row with its prompt echo
    /// stripped.
    pub fn report(
        &mut self,
        texts_in: &[String],
        texts_out: &[String],
        measurement: &Measurement,
    ) -> Result<BenchmarkRecord> {
        writeln!(self.sink, "  {measurement}")?;

        if self.cache.update(OutputKey::from(texts_in), texts_out) {
            for (i, out) in texts_out.iter().enumerate() {
                let prompt = texts_in.get(i).map(String::as_str).unwrap_or_default();
                writeln!(self.sink, "\t{i}. {:?}", console_text(out, prompt))?;
            }
        }

        let output = match (texts_out.first(), texts_in.first()) {
            (Some(out), Some(prompt)) => strip_prompt_echo(out, prompt).to_string(),
            (Some(out), None) => out.clone(),
            (None, _) => String::new(),
        };
        Ok(measurement.record(output))
    }

    pub fn cache(&self) -> &OutputCache {
        &self.cache
    }

    pub fn sink(&self) -> &W {
        &self.sink
    }

    pub fn into_sink(self) -> W {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::latency::{LatencyBreakdown, LatencySample};
    use candle_core::{DType, Device, Tensor};

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn measurement() -> Measurement {
        let sample = LatencySample::new(vec![0.1, 0.02, 0.02]);
        Measurement {
            output_ids: Tensor::zeros((1, 4), DType::U32, &Device::Cpu).unwrap(),
            breakdown: LatencyBreakdown::decompose(0.15, &sample),
            input_batch_size: 1,
            input_token_length: 1,
            generated_sequence_length: 3,
            diagnostics: Vec::new(),
        }
    }

    fn printed(reporter: &Reporter<Vec<u8>>) -> String {
        String::from_utf8(reporter.sink().clone()).unwrap()
    }

    #[test]
    fn test_strip_prompt_echo() {
        assert_eq!(strip_prompt_echo("Hi there", "Hi"), " there");
        assert_eq!(strip_prompt_echo("Hello", "Hi"), "Hello");
        assert_eq!(strip_prompt_echo("Hi", "Hi there"), "Hi");
        assert_eq!(strip_prompt_echo("anything", ""), "anything");
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        assert_eq!(fingerprint("abc"), fingerprint("abc"));
        assert_ne!(fingerprint("abc"), fingerprint("abd"));
        assert_eq!(
            fingerprint("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_console_text_truncates_long_outputs() {
        let long: String = "x".repeat(161);
        let shown = console_text(&long, "");
        assert_eq!(shown, format!("{}...{}", "x".repeat(80), fingerprint(&long)));

        let edge: String = "y".repeat(160);
        assert_eq!(console_text(&edge, ""), edge);
    }

    #[test]
    fn test_console_text_counts_characters_not_bytes() {
        let long: String = "é".repeat(200);
        let shown = console_text(&long, "");
        assert!(shown.starts_with(&"é".repeat(80)));
        assert!(shown.ends_with(&fingerprint(&long)));
    }

    #[test]
    fn test_console_text_strips_before_truncating() {
        let prompt = "p".repeat(50);
        let decoded = format!("{prompt}{}", "z".repeat(150));
        assert_eq!(console_text(&decoded, &prompt), "z".repeat(150));
    }

    #[test]
    fn test_cache_keys_do_not_collide_on_delimiters() {
        let mut cache = OutputCache::default();
        assert!(cache.update(OutputKey::from(texts(&["a,b"]).as_slice()), &texts(&["x"])));
        assert!(cache.update(OutputKey::from(texts(&["a", "b"]).as_slice()), &texts(&["x"])));
        assert_eq!(cache.len(), 2);
        assert!(!cache.update(OutputKey::from(texts(&["a,b"]).as_slice()), &texts(&["x"])));
        assert!(cache.update(OutputKey::from(texts(&["a,b"]).as_slice()), &texts(&["y"])));
    }

    #[test]
    fn test_identical_rounds_print_once_but_record_twice() {
        let mut reporter = Reporter::new(Vec::<u8>::new());
        let input = texts(&["Hi"]);
        let output = texts(&["Hi there"]);

        let first = reporter.report(&input, &output, &measurement()).unwrap();
        let after_first = printed(&reporter);
        assert!(after_first.contains("\t0. \" there\""));

        let second = reporter.report(&input, &output, &measurement()).unwrap();
        let after_second = printed(&reporter);
        let new_text = &after_second[after_first.len()..];
        assert!(!new_text.contains("\t0."));
        assert!(new_text.contains("150.0ms"));

        assert_eq!(first, second);
        assert_eq!(first.output, " there");
        assert_eq!(first.generated_sequence_length, 3);
    }

    #[test]
    fn test_changed_output_is_printed_again() {
        let mut reporter = Reporter::new(Vec::<u8>::new());
        let input = texts(&["Hi", "Yo"]);
        reporter.report(&input, &texts(&["Hi a", "Yo b"]), &measurement()).unwrap();
        reporter.report(&input, &texts(&["Hi a", "Yo c"]), &measurement()).unwrap();

        let out = printed(&reporter);
        assert_eq!(out.matches("\t0. ").count(), 2);
        assert_eq!(out.matches("\t1. ").count(), 2);
        assert!(out.contains("\t1. \" c\""));
    }

    #[test]
    fn test_record_output_keeps_text_without_echo() {
        let mut reporter = Reporter::new(Vec::<u8>::new());
        let record = reporter
            .report(&texts(&["Hi"]), &texts(&["Completely new"]), &measurement())
            .unwrap();
        assert_eq!(record.output, "Completely new");
    }

    #[test]
    fn test_round_header() {
        let mut reporter = Reporter::new(Vec::<u8>::new());
        reporter.round_header(3).unwrap();
        assert_eq!(printed(&reporter), "round 3:\n");
    }
}
