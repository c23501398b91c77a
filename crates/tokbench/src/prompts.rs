//! Prompt files and the plan of generation requests for a session.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{BenchError, Result};
use crate::input::GenerationRequest;

/// Text used when a requested prompt length has to be forged
pub const FORGED_PROMPT: &str = "Hi";

/// One prompt file entry: a single prompt or a batch of prompts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PromptEntry {
    Single(String),
    Batch(Vec<String>),
}

impl PromptEntry {
    pub fn texts(&self) -> Vec<String> {
        match self {
            PromptEntry::Single(text) => vec![text.clone()],
            PromptEntry::Batch(texts) => texts.clone(),
        }
    }
}

/// Prompts keyed by their string-encoded token length.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct PromptFile {
    entries: BTreeMap<String, PromptEntry>,
}

impl PromptFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            BenchError::Configuration(format!("cannot read prompts file {}: {err}", path.display()))
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn get(&self, length: usize) -> Option<&PromptEntry> {
        self.entries.get(&length.to_string())
    }

    /// Entries ordered by numeric length, non-numeric keys last.
    pub fn entries(&self) -> Vec<(&str, &PromptEntry)> {
        let mut entries: Vec<_> = self.entries.iter().map(|(k, v)| (k.as_str(), v)).collect();
        entries.sort_by_key(|(key, _)| (key.parse::<usize>().unwrap_or(usize::MAX), *key));
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Where a session's prompts come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptSource {
    /// Prompts given directly, run together as one batch
    Literal(Vec<String>),
    /// Every entry of the prompt file
    File,
    /// The prompt file entries for these token lengths
    Lengths(Vec<usize>),
}

/// Resolves `source` into the ordered list of generation requests.
///
/// For [`PromptSource::Lengths`], a length missing from `file` switches the
/// whole plan to forged mode: every requested length becomes a
/// [`FORGED_PROMPT`] request tiled to that length, so all rows of the session
/// are measured the same way.
pub fn plan_requests(source: &PromptSource, file: &PromptFile) -> Result<Vec<GenerationRequest>> {
    let requests = match source {
        PromptSource::Literal(texts) => {
            if texts.is_empty() {
                return Err(BenchError::Configuration("no prompt given".into()));
            }
            vec![GenerationRequest::new(texts.clone())]
        }
        PromptSource::File => {
            if file.is_empty() {
                return Err(BenchError::Configuration("prompts file has no entries".into()));
            }
            file.entries()
                .into_iter()
                .map(|(_, entry)| GenerationRequest::new(entry.texts()))
                .collect()
        }
        PromptSource::Lengths(lengths) => plan_lengths(lengths, file)?,
    };
    info!(requests = requests.len(), "prompt plan ready");
    Ok(requests)
}

fn plan_lengths(lengths: &[usize], file: &PromptFile) -> Result<Vec<GenerationRequest>> {
    if lengths.is_empty() {
        return Err(BenchError::Configuration("no prompt length given".into()));
    }
    if let Some(zero) = lengths.iter().find(|len| **len == 0) {
        return Err(BenchError::Configuration(format!("prompt length {zero} is not allowed")));
    }

    let missing: Vec<usize> = lengths.iter().copied().filter(|len| file.get(*len).is_none()).collect();
    if missing.is_empty() {
        return Ok(lengths
            .iter()
            .filter_map(|len| file.get(*len))
            .map(|entry| GenerationRequest::new(entry.texts()))
            .collect());
    }

    warn!(?missing, "prompt lengths not in prompts file, forging inputs for every length");
    Ok(lengths
        .iter()
        .map(|len| GenerationRequest::forced(vec![FORGED_PROMPT.to_string()], *len))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file() -> PromptFile {
        PromptFile::from_json(
            r#"{"1024": "long prompt", "32": "short prompt", "64": ["batch one", "batch two"]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_entries_are_in_numeric_order() {
        let file = file();
        let keys: Vec<&str> = file.entries().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["32", "64", "1024"]);
    }

    #[test]
    fn test_literal_prompts_form_one_batch() {
        let requests = plan_requests(
            &PromptSource::Literal(vec!["a".into(), "b".into()]),
            &PromptFile::default(),
        )
        .unwrap();
        assert_eq!(requests, vec![GenerationRequest::new(vec!["a".into(), "b".into()])]);
    }

    #[test]
    fn test_file_source_uses_every_entry() {
        let requests = plan_requests(&PromptSource::File, &file()).unwrap();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].texts, vec!["short prompt".to_string()]);
        assert_eq!(requests[1].texts, vec!["batch one".to_string(), "batch two".to_string()]);
        assert!(requests.iter().all(|r| r.forced_token_length.is_none()));
    }

    #[test]
    fn test_lengths_found_in_file() {
        let requests = plan_requests(&PromptSource::Lengths(vec![1024, 32]), &file()).unwrap();
        assert_eq!(requests[0].texts, vec!["long prompt".to_string()]);
        assert_eq!(requests[1].texts, vec!["short prompt".to_string()]);
    }

    #[test]
    fn test_missing_length_forges_every_length() {
        let requests = plan_requests(&PromptSource::Lengths(vec![32, 100, 64]), &file()).unwrap();
        assert_eq!(
            requests,
            vec![
                GenerationRequest::forced(vec![FORGED_PROMPT.to_string()], 32),
                GenerationRequest::forced(vec![FORGED_PROMPT.to_string()], 100),
                GenerationRequest::forced(vec![FORGED_PROMPT.to_string()], 64),
            ]
        );
    }

    #[test]
    fn test_empty_sources_are_configuration_errors() {
        let empty = PromptFile::default();
        assert!(matches!(
            plan_requests(&PromptSource::Literal(vec![]), &empty),
            Err(BenchError::Configuration(_))
        ));
        assert!(plan_requests(&PromptSource::File, &empty).is_err());
        assert!(plan_requests(&PromptSource::Lengths(vec![]), &empty).is_err());
        assert!(plan_requests(&PromptSource::Lengths(vec![0]), &empty).is_err());
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompts.json");
        std::fs::write(&path, r#"{"8": "eight tokens"}"#).unwrap();
        let loaded = PromptFile::load(&path).unwrap();
        assert_eq!(loaded.get(8), Some(&PromptEntry::Single("eight tokens".into())));
        assert!(PromptFile::load(dir.path().join("missing.json")).is_err());
    }
}
