//! Tree-summarize response synthesis.
//!
//! Round 0 answers the question from each batch of passages. Every later
//! round batches the previous answers and asks the model to merge them, until
//! a single answer is left. Every call's cost is added to one per-call total.

use rayon::prelude::*;
use tracing::{debug, info, instrument, trace, warn};

use treesum_shared::{
    Result, RoundKind, RoundSummary, SynthesisError, SynthesisReport, SynthesizerConfig,
};

use crate::batching::{self, Batch};
use crate::invoker::Invoker;
use crate::template::{DEFAULT_QA_PROMPT, DEFAULT_SUMMARY_PROMPT, PromptTemplate};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Construction-time options for [`TreeSummarizer`].
#[derive(Debug, Clone)]
pub struct SynthesizerOptions {
    /// Model identifier handed to the invoker.
    pub model: String,
    /// Units per prompt. Must be at least 2.
    pub batch_size: usize,
    /// Question-answering template (`{question}`, `{context}`).
    pub qa_prompt: String,
    /// Summary template (`{question}`, `{answers}`).
    pub summary_prompt: String,
    /// Dispatch the batches of a round concurrently.
    pub parallel: bool,
}

impl Default for SynthesizerOptions {
    fn default() -> Self {
        Self::from(&SynthesizerConfig::default())
    }
}

impl From<&SynthesizerConfig> for SynthesizerOptions {
    fn from(config: &SynthesizerConfig) -> Self {
        Self {
            model: config.model.clone(),
            batch_size: config.batch_size,
            qa_prompt: config
                .qa_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_QA_PROMPT.to_string()),
            summary_prompt: config
                .summary_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SUMMARY_PROMPT.to_string()),
            parallel: config.parallel,
        }
    }
}

// ---------------------------------------------------------------------------
// TreeSummarizer
// ---------------------------------------------------------------------------

/// Answers a question over many passages by repeated batch-wise reduction.
#[derive(Debug)]
pub struct TreeSummarizer<I> {
    invoker: I,
    model: String,
    batch_size: usize,
    qa_prompt: PromptTemplate,
    summary_prompt: PromptTemplate,
    parallel: bool,
}

impl<I: Invoker> TreeSummarizer<I> {
    /// Validate `options` and build a summarizer around `invoker`.
    ///
    /// A batch size below 2 is rejected: with single-unit batches a reduce
    /// round never combines answers and only drops the trailing one.
    pub fn new(invoker: I, options: SynthesizerOptions) -> Result<Self> {
        if options.batch_size < 2 {
            return Err(SynthesisError::config(format!(
                "batch_size must be at least 2 (got {})",
                options.batch_size
            )));
        }

        if options.model.trim().is_empty() {
            return Err(SynthesisError::config("model identifier is empty"));
        }

        Ok(Self {
            invoker,
            model: options.model,
            batch_size: options.batch_size,
            qa_prompt: PromptTemplate::qa(options.qa_prompt)?,
            summary_prompt: PromptTemplate::summary(options.summary_prompt)?,
            parallel: options.parallel,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn invoker(&self) -> &I {
        &self.invoker
    }

    /// Reduce `context` to a single answer to `question`.
    pub fn synthesize<S>(&self, question: &str, context: &[S]) -> Result<SynthesisReport>
    where
        S: AsRef<str> + Sync,
    {
        self.synthesize_with_progress(question, context, &SilentProgress)
    }

    /// [`synthesize`](Self::synthesize) with progress callbacks.
    ///
    /// The call is all-or-nothing: the first failed invocation aborts it and
    /// no answer or cost is returned.
    #[instrument(
        skip_all,
        fields(
            question_len = question.len(),
            passages = context.len(),
            batch_size = self.batch_size,
            model = %self.model,
        )
    )]
    pub fn synthesize_with_progress<S>(
        &self,
        question: &str,
        context: &[S],
        progress: &dyn SynthesisProgress,
    ) -> Result<SynthesisReport>
    where
        S: AsRef<str> + Sync,
    {
        if context.is_empty() {
            return Err(SynthesisError::config("no passages to synthesize from"));
        }

        let mut total_cost = 0.0;
        let mut rounds = Vec::new();

        let (mut answers, summary) =
            self.run_round(0, RoundKind::Map, question, context, progress)?;
        total_cost += summary.cost;
        rounds.push(summary);

        while answers.len() > 1 {
            let (next, summary) =
                self.run_round(rounds.len(), RoundKind::Reduce, question, &answers, progress)?;

            if next.is_empty() || next.len() >= answers.len() {
                return Err(SynthesisError::config(format!(
                    "reduction stalled at {} answers with batch_size {}",
                    answers.len(),
                    self.batch_size
                )));
            }

            total_cost += summary.cost;
            rounds.push(summary);
            answers = next;
        }

        let Some(answer) = answers.pop() else {
            return Err(SynthesisError::malformed("map round produced no answers"));
        };

        let invocations = rounds.iter().map(|r| r.invocations).sum();

        info!(
            rounds = rounds.len(),
            invocations, total_cost, "synthesis complete"
        );

        Ok(SynthesisReport {
            answer,
            total_cost,
            invocations,
            rounds,
        })
    }

    /// Run one map or reduce round over `units`.
    ///
    /// Reduce rounds skip a batch that starts at the last unit.
    fn run_round<S>(
        &self,
        round: usize,
        kind: RoundKind,
        question: &str,
        units: &[S],
        progress: &dyn SynthesisProgress,
    ) -> Result<(Vec<String>, RoundSummary)>
    where
        S: AsRef<str> + Sync,
    {
        let all: Vec<Batch> = batching::batches(units.len(), self.batch_size).collect();
        let batch_count = all.len();

        let planned: Vec<Batch> = all
            .into_iter()
            .filter(|batch| {
                let skip = kind == RoundKind::Reduce && batch.is_trailing_single(units.len());
                if skip {
                    warn!(
                        round,
                        batch = batch.index,
                        unit = batch.start(),
                        "dropping trailing single answer"
                    );
                }
                !skip
            })
            .collect();
        let skipped = batch_count - planned.len();

        debug!(
            round,
            kind = %kind,
            units = units.len(),
            batches = batch_count,
            skipped,
            parallel = self.parallel,
            "starting round"
        );
        progress.round_started(round, kind, units.len(), batch_count);

        let call = |batch: &Batch| -> Result<(String, f64)> {
            let (answer, cost) = self.answer_batch(kind, question, &units[batch.range.clone()])?;
            trace!(round, batch = batch.index, cost, "invocation finished");
            progress.invocation_finished(round, batch.index, cost);
            Ok((answer, cost))
        };

        let results: Vec<(String, f64)> = if self.parallel {
            planned.par_iter().map(call).collect::<Result<_>>()?
        } else {
            planned.iter().map(call).collect::<Result<_>>()?
        };

        let mut round_cost = 0.0;
        let mut answers = Vec::with_capacity(results.len());
        for (answer, cost) in results {
            round_cost += cost;
            answers.push(answer);
        }

        let summary = RoundSummary {
            round,
            kind,
            input_units: units.len(),
            batches: batch_count,
            invocations: answers.len(),
            skipped,
            cost: round_cost,
        };
        progress.round_finished(&summary);

        Ok((answers, summary))
    }

    /// Render the prompt for one batch, invoke the model, and extract the answer.
    fn answer_batch<S: AsRef<str>>(
        &self,
        kind: RoundKind,
        question: &str,
        batch: &[S],
    ) -> Result<(String, f64)> {
        let joined = batch
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<&str>>()
            .join("\n");

        let prompt = match kind {
            RoundKind::Map => self
                .qa_prompt
                .render(&[("question", question), ("context", &joined)]),
            RoundKind::Reduce => self
                .summary_prompt
                .render(&[("question", question), ("answers", &joined)]),
        };

        let invocation = self.invoker.invoke(&self.model, &prompt)?;
        let answer = invocation.payload.primary_text()?.to_string();

        Ok((answer, invocation.cost))
    }
}

// ---------------------------------------------------------------------------
// Progress trait
// ---------------------------------------------------------------------------

/// Progress callback for synthesis calls.
pub trait SynthesisProgress: Send + Sync {
    /// Called before a round issues its first invocation.
    fn round_started(&self, round: usize, kind: RoundKind, units: usize, batches: usize);
    /// Called after each successful invocation, with the cost it charged.
    fn invocation_finished(&self, round: usize, batch: usize, cost: f64);
    /// Called once all invocations of a round have succeeded.
    fn round_finished(&self, summary: &RoundSummary);
}

/// No-op synthesis progress.
pub struct SilentProgress;

impl SynthesisProgress for SilentProgress {
    fn round_started(&self, _round: usize, _kind: RoundKind, _units: usize, _batches: usize) {}
    fn invocation_finished(&self, _round: usize, _batch: usize, _cost: f64) {}
    fn round_finished(&self, _summary: &RoundSummary) {}
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
