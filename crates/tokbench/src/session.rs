//! Session driver: prompts × repeat rounds through build, decode, account and report.

use std::io::Write;

use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

use crate::config::BenchConfig;
use crate::engine::{DecodeEngine, DecodeParams};
use crate::error::Result;
use crate::input::{GenerationRequest, InputBuilder};
use crate::latency::LatencyAccountant;
use crate::record::{BenchmarkRecord, RecordSink};
use crate::report::Reporter;
use crate::tensor::operations::rows_of;
use crate::tokenizer::Tokenizer;

/// # Session
///
/// One benchmark session over a tokenizer and a decode engine.
///
/// Every round runs the same pipeline:
/// 1. Tokenize the request into a [`PreparedInput`](crate::PreparedInput)
/// 2. Derive [`DecodeParams`] from the input length and answer length
/// 3. Time one [`DecodeEngine::decode`] call and split its latency
/// 4. Decode the output ids and report the round
///
/// ## Type Parameters
///
/// * `W` - Console sink receiving round headers, latency lines and outputs
///   (stdout in the binary, a byte buffer in tests)
///
/// ## Implementation Notes
///
/// - Rounds run strictly one after another; nothing overlaps
/// - The reporter, and with it the output deduplication cache, lives exactly
///   as long as the session
/// - Any error ends the session; there is no retry
pub struct Session<'a, W> {
    tokenizer: &'a dyn Tokenizer,
    engine: &'a dyn DecodeEngine,
    builder: InputBuilder,
    accountant: LatencyAccountant,
    reporter: Reporter<W>,
    answer_length: usize,
    repeat: usize,
}

impl<'a, W: Write> Session<'a, W> {
    /// # Errors
    ///
    /// [`BenchError::Configuration`](crate::BenchError::Configuration) when
    /// `config` does not validate.
    pub fn new(
        config: &BenchConfig,
        tokenizer: &'a dyn Tokenizer,
        engine: &'a dyn DecodeEngine,
        console: W,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            tokenizer,
            engine,
            builder: InputBuilder::default(),
            accountant: LatencyAccountant::new(config.overhead_warn_ms),
            reporter: Reporter::new(console),
            answer_length: config.answer_length,
            repeat: config.repeat,
        })
    }

    /// Runs every request `repeat` times and returns the records in order.
    ///
    /// # Parameters
    ///
    /// * `requests` - Prompt batches, run in the given order.
    /// * `sink` - Receives each record as soon as it exists.
    ///
    /// # Returns
    ///
    /// One record per request per round, request-major.
    ///
    /// The first failing round ends the session with its error; records
    /// already pushed to `sink` stay there.
    pub async fn run(
        &mut self,
        requests: &[GenerationRequest],
        sink: &mut dyn RecordSink,
    ) -> Result<Vec<BenchmarkRecord>> {
        let span = info_span!("session", id = %Uuid::new_v4());
        async move {
            info!(
                requests = requests.len(),
                repeat = self.repeat,
                engine = %self.engine.name(),
                "session started"
            );
            let mut records = Vec::new();
            for request in requests {
                for round in 0..self.repeat {
                    self.reporter.round_header(round)?;
                    let record = self.run_round(request).await?;
                    sink.push(&record)?;
                    records.push(record);
                }
            }
            info!(records = records.len(), "session finished");
            Ok(records)
        }
        .instrument(span)
        .await
    }

    async fn run_round(&mut self, request: &GenerationRequest) -> Result<BenchmarkRecord> {
        let input = self
            .builder
            .prepare(&request.texts, request.forced_token_length, self.tokenizer)?;
        let params = DecodeParams::new(
            input.token_length(),
            self.answer_length,
            self.tokenizer.eos_token_id(),
            self.tokenizer.pad_token_id(),
        )?;
        debug!(max_kv_len = params.max_kv_len, "decoding");

        let measurement = self.accountant.measure(self.engine, &input, &params).await?;
        let texts_out = self.tokenizer.decode_batch(&rows_of(&measurement.output_ids)?)?;
        self.reporter.report(&request.texts, &texts_out, &measurement)
    }

    /// Ends the session, returning the console sink.
    pub fn finish(self) -> W {
        self.reporter.into_sink()
    }
}
