//! Batch scheduler
//!
//! Drives conversion jobs in consecutive groups of at most
//! `concurrency_limit` jobs. Jobs inside a group run concurrently; the next
//! group starts only after every job of the current one has settled and the
//! inter-batch pause has elapsed.
//!
//! Reading and decoding happen in spawned tasks (decoding on the blocking
//! pool). Everything else happens on the task that called [`BatchScheduler::run`]
//! as results are joined: encoding, the terminal transition, the processed
//! counter and the observer callback. Shared state touched from the observer
//! therefore needs no locking.
//!
//! Completion order inside a group depends on decode latency, so observers
//! see jobs, and category stores receive files, in a nondeterministic order.
//! Cross-group order is strict.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use serde::Serialize;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::audio::{AudioBuffer, AudioDecoder, DecoderContext, EncodedContainer};
use crate::config::ConverterConfig;
use crate::job::{
    encode_file, ConversionJob, ConversionOutcome, FailureKind, JobStatus, OutputNaming,
    SourceFile,
};

/// Progress notification sent after each job settles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    /// Jobs settled so far, including this one
    pub processed: usize,
    pub total: usize,
    /// Category or batch label the run was started with
    pub context: String,
    pub source_name: String,
    pub status: JobStatus,
}

impl Progress {
    pub fn is_complete(&self) -> bool {
        self.processed == self.total
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}/{}", self.context, self.processed, self.total)
    }
}

/// Serializable per-job line of a [`BatchReport`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobRecord {
    pub id: Uuid,
    pub source_name: String,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl JobRecord {
    fn from_job(job: &ConversionJob) -> Self {
        let mut record = JobRecord {
            id: job.id(),
            source_name: job.source_name().to_string(),
            status: job.status(),
            output_name: None,
            bytes: None,
            sha256: None,
            failure: None,
            detail: None,
        };
        match job.outcome() {
            Some(ConversionOutcome::Done(file)) => {
                record.output_name = Some(file.output_name.clone());
                record.bytes = Some(file.container.len());
                record.sha256 = Some(file.container.sha256());
            }
            Some(ConversionOutcome::Failed { kind, detail }) => {
                record.failure = Some(*kind);
                record.detail = Some(detail.clone());
            }
            None => {}
        }
        record
    }
}

/// Completion report of one scheduler run
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub context: String,
    pub total: usize,
    pub processed: usize,
    pub done: usize,
    pub failed: usize,
    pub group_sizes: Vec<usize>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Records in completion order
    pub jobs: Vec<JobRecord>,
    /// Settled jobs in completion order
    #[serde(skip)]
    pub settled: Vec<ConversionJob>,
}

impl BatchReport {
    /// Every container produced by the run, in completion order
    pub fn containers(&self) -> Vec<&EncodedContainer> {
        self.settled
            .iter()
            .filter_map(|job| job.outcome().and_then(ConversionOutcome::converted))
            .map(|file| &file.container)
            .collect()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

type DecodeResult = std::result::Result<AudioBuffer, (FailureKind, String)>;

/// Bounded-concurrency, group-paced job runner
#[derive(Debug, Clone)]
pub struct BatchScheduler {
    concurrency_limit: usize,
    inter_batch_pause: Duration,
    naming: OutputNaming,
}

impl BatchScheduler {
    /// A limit of 0 is treated as 1.
    pub fn new(concurrency_limit: usize, inter_batch_pause: Duration) -> Self {
        Self {
            concurrency_limit: concurrency_limit.max(1),
            inter_batch_pause,
            naming: OutputNaming::default(),
        }
    }

    pub fn from_config(config: &ConverterConfig) -> Self {
        Self::new(config.concurrency_limit, config.inter_batch_pause())
            .with_naming(OutputNaming::from_config(config))
    }

    pub fn with_naming(mut self, naming: OutputNaming) -> Self {
        self.naming = naming;
        self
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    pub fn inter_batch_pause(&self) -> Duration {
        self.inter_batch_pause
    }

    /// Sizes of the consecutive groups `total` jobs are split into
    pub fn group_sizes(&self, total: usize) -> Vec<usize> {
        let limit = self.concurrency_limit;
        (0..total)
            .step_by(limit)
            .map(|start| limit.min(total - start))
            .collect()
    }

    /// Convenience wrapper building jobs from sources
    pub async fn run_sources<F>(
        &self,
        sources: Vec<SourceFile>,
        context: &str,
        decoders: &DecoderContext,
        observer: F,
    ) -> BatchReport
    where
        F: FnMut(&ConversionJob, &Progress),
    {
        let jobs = sources.into_iter().map(ConversionJob::new).collect();
        self.run(jobs, context, decoders, observer).await
    }

    /// Drive every job to a terminal state.
    ///
    /// Never fails as a whole: per-job failures are recorded on the job and
    /// counted in the report. `observer` is called exactly once per job,
    /// right after it settles.
    pub async fn run<F>(
        &self,
        jobs: Vec<ConversionJob>,
        context: &str,
        decoders: &DecoderContext,
        mut observer: F,
    ) -> BatchReport
    where
        F: FnMut(&ConversionJob, &Progress),
    {
        let started_at = Utc::now();
        let run_id = Uuid::new_v4();
        let total = jobs.len();
        let group_sizes = self.group_sizes(total);

        info!(
            "[{}] starting {} jobs in {} groups (limit {})",
            context,
            total,
            group_sizes.len(),
            self.concurrency_limit
        );

        let mut processed = 0usize;
        let mut done = 0usize;
        let mut failed = 0usize;
        let mut settled = Vec::with_capacity(total);
        let mut pending = jobs.into_iter();

        for (group_index, &group_size) in group_sizes.iter().enumerate() {
            if group_index > 0 && !self.inter_batch_pause.is_zero() {
                tokio::time::sleep(self.inter_batch_pause).await;
            }

            let mut group: Vec<Option<ConversionJob>> =
                pending.by_ref().take(group_size).map(Some).collect();
            debug!(
                "[{}] group {} with {} jobs",
                context,
                group_index + 1,
                group.len()
            );

            let decoder = decoders.get();
            let mut tasks = JoinSet::new();
            for (slot, job) in group.iter_mut().enumerate() {
                if let Some(job) = job.as_mut() {
                    job.advance(JobStatus::Decoding);
                    tasks.spawn(decode_task(slot, job.source().clone(), Arc::clone(&decoder)));
                }
            }

            while let Some(joined) = tasks.join_next().await {
                let (slot, decoded) = match joined {
                    Ok(result) => result,
                    Err(e) => {
                        // Slot is unknown here; the sweep below settles it
                        error!("[{}] conversion task ended abnormally: {}", context, e);
                        continue;
                    }
                };
                let Some(mut job) = group[slot].take() else {
                    continue;
                };

                let outcome = match decoded {
                    Ok(buffer) => {
                        job.advance(JobStatus::Encoding);
                        ConversionOutcome::Done(encode_file(job.source_name(), &buffer, &self.naming))
                    }
                    Err((kind, detail)) => ConversionOutcome::Failed { kind, detail },
                };

                self.settle(
                    job,
                    outcome,
                    context,
                    total,
                    &mut processed,
                    &mut done,
                    &mut failed,
                    &mut settled,
                    &mut observer,
                );
            }

            for job in group.into_iter().flatten() {
                let outcome = ConversionOutcome::Failed {
                    kind: FailureKind::Aborted,
                    detail: "conversion task did not report a result".to_string(),
                };
                self.settle(
                    job,
                    outcome,
                    context,
                    total,
                    &mut processed,
                    &mut done,
                    &mut failed,
                    &mut settled,
                    &mut observer,
                );
            }
        }

        let finished_at = Utc::now();
        info!(
            "[{}] finished: {} done, {} failed of {}",
            context, done, failed, total
        );

        BatchReport {
            run_id,
            context: context.to_string(),
            total,
            processed,
            done,
            failed,
            group_sizes,
            started_at,
            finished_at,
            jobs: settled.iter().map(JobRecord::from_job).collect(),
            settled,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn settle<F>(
        &self,
        mut job: ConversionJob,
        outcome: ConversionOutcome,
        context: &str,
        total: usize,
        processed: &mut usize,
        done: &mut usize,
        failed: &mut usize,
        settled: &mut Vec<ConversionJob>,
        observer: &mut F,
    ) where
        F: FnMut(&ConversionJob, &Progress),
    {
        if let ConversionOutcome::Failed { kind, detail } = &outcome {
            warn!(
                "[{}] {} failed ({}): {}",
                context,
                job.source_name(),
                kind,
                detail
            );
        }
        if !job.settle(outcome) {
            return;
        }

        *processed += 1;
        match job.status() {
            JobStatus::Done => *done += 1,
            _ => *failed += 1,
        }

        let progress = Progress {
            processed: *processed,
            total,
            context: context.to_string(),
            source_name: job.source_name().to_string(),
            status: job.status(),
        };
        debug!("{} ({})", progress, progress.source_name);
        observer(&job, &progress);
        settled.push(job);
    }
}

impl Default for BatchScheduler {
    fn default() -> Self {
        Self::from_config(&ConverterConfig::default())
    }
}

/// Read and decode one source. Runs inside the group's task set.
async fn decode_task(
    slot: usize,
    source: SourceFile,
    decoder: Arc<dyn AudioDecoder>,
) -> (usize, DecodeResult) {
    let bytes = match source.read().await {
        Ok(bytes) => bytes,
        Err(e) => return (slot, Err((FailureKind::Read, e.to_string()))),
    };

    let name = source.name().to_string();
    let decoded = tokio::task::spawn_blocking(move || decoder.decode(&name, &bytes)).await;

    let result = match decoded {
        Ok(Ok(buffer)) => Ok(buffer),
        Ok(Err(e)) => Err((FailureKind::Decode, e.to_string())),
        Err(e) => Err((FailureKind::Decode, format!("decoder panicked: {}", e))),
    };
    (slot, result)
}
