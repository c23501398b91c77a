use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tokbench::config::{BenchConfig, Precision, RuntimeConfig};
use tokbench::logging::{init_logging, LogFormat};
use tokbench::prompts::{plan_requests, PromptFile, PromptSource};
use tokbench::runtime::{LoadedModel, ModelManifest, SyntheticRuntime, MANIFEST_FILE};
use tokbench::tokenizer::HfTokenizer;
use tokbench::{BenchmarkRecord, CsvResults, DecodeStrategy, RecordSink, Session};
use tracing::{error, info, warn};

const TOKENIZER_FILE: &str = "tokenizer.json";
const DEFAULT_PROMPTS_FILE: &str = "prompts.json";

#[derive(Parser, Debug)]
#[command(name = "tokbench", version)]
#[command(about = "Measure generation latency of a compiled causal language model", long_about = None)]
struct Cli {
    /// Model directory containing tokenizer.json and model.json
    #[arg(short, long)]
    model: PathBuf,

    /// Prompt token lengths to benchmark, looked up in the prompts file
    #[arg(long, num_args = 1.., default_values_t = [32])]
    prompt_length: Vec<usize>,

    /// Prompts run together as one batch, overriding lengths and files
    #[arg(short, long, num_args = 1..)]
    prompt: Vec<String>,

    /// Maximum number of generated tokens
    #[arg(long, default_value_t = 32)]
    answer_length: usize,

    /// Use greedy search instead of beam search
    #[arg(long)]
    greedy: bool,

    /// Run inference and the key/value cache in bf16
    #[arg(long)]
    bf16: bool,

    #[arg(long, default_value_t = 4)]
    beam_size: usize,

    /// Rounds per prompt batch
    #[arg(short, long, default_value_t = 1)]
    repeat: usize,

    /// Run every entry of this prompts file
    #[arg(long)]
    prompts: Option<PathBuf>,

    /// Write one CSV row per round to this file
    #[arg(long)]
    output_results: Option<PathBuf>,

    /// End-of-sequence token, detected from the vocabulary when omitted
    #[arg(long)]
    eos_token: Option<String>,

    /// Diagnostics format: human or json
    #[arg(long)]
    log_format: Option<LogFormat>,
}

impl Cli {
    fn bench_config(&self) -> BenchConfig {
        BenchConfig {
            answer_length: self.answer_length,
            strategy: if self.greedy {
                DecodeStrategy::Greedy
            } else {
                DecodeStrategy::Beam { beam_size: self.beam_size }
            },
            repeat: self.repeat,
            precision: if self.bf16 { Precision::Bf16 } else { Precision::F32 },
            ..Default::default()
        }
    }

    /// Literal prompts win over an explicit prompts file, which wins over
    /// prompt lengths looked up in `default_prompts`.
    fn prompt_plan(&self, default_prompts: &Path) -> anyhow::Result<(PromptSource, PromptFile)> {
        if !self.prompt.is_empty() {
            return Ok((PromptSource::Literal(self.prompt.clone()), PromptFile::default()));
        }
        if let Some(path) = &self.prompts {
            let file = PromptFile::load(path)?;
            return Ok((PromptSource::File, file));
        }
        let file = if default_prompts.exists() {
            PromptFile::load(default_prompts)?
        } else {
            warn!(path = %default_prompts.display(), "prompts file not found");
            PromptFile::default()
        };
        Ok((PromptSource::Lengths(self.prompt_length.clone()), file))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.log_format.or_else(LogFormat::from_env).unwrap_or_default());

    let Some(extension) = RuntimeConfig::extension_path() else {
        error!(os = std::env::consts::OS, "unsupported platform");
        return Ok(ExitCode::FAILURE);
    };
    info!(extension = %extension.display(), "runtime extension");

    let config = cli.bench_config();
    config.validate()?;

    let tokenizer = HfTokenizer::from_file(cli.model.join(TOKENIZER_FILE), cli.eos_token.as_deref())?;
    let manifest = ModelManifest::load(cli.model.join(MANIFEST_FILE))?;
    let runtime = SyntheticRuntime::compile(manifest, config.runtime_config())?;
    let model = LoadedModel::new(runtime)?;
    info!(topology = %model.topology(), precision = %config.precision, "model loaded");
    let engine = model.engine(config.strategy)?;

    let (source, prompts) = cli.prompt_plan(Path::new(DEFAULT_PROMPTS_FILE))?;
    let requests = plan_requests(&source, &prompts)?;

    let mut sink: Box<dyn RecordSink> = match &cli.output_results {
        Some(path) => Box::new(
            CsvResults::create(path).with_context(|| format!("cannot create {}", path.display()))?,
        ),
        None => Box::new(Vec::<BenchmarkRecord>::new()),
    };

    println!("Start test ...");
    let mut session = Session::new(&config, &tokenizer, engine.as_ref(), std::io::stdout())?;
    let records = session.run(&requests, sink.as_mut()).await?;
    info!(records = records.len(), "benchmark complete");

    Ok(ExitCode::SUCCESS)
}
