use crate::{template::TemplateVariant, util::format_duration};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    UnknownTemplate,
    ExtractionFailed,
    PersistenceFailed,
    Duplicate,
}

/// What happened to one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentOutcome {
    Recorded(TemplateVariant),
    Skipped(SkipReason),
}

/// Counters for the current run. Rebuilt on every invocation.
#[derive(Debug, Clone)]
pub struct RunStats {
    started: Instant,
    pub files_seen: usize,
    pub skipped_by_checkpoint: usize,
    pub pending: usize,
    pub attempted: usize,
    pub per_template: BTreeMap<TemplateVariant, u64>,
    pub skips: BTreeMap<SkipReason, u64>,
    pub checkpoint_failures: u64,
}

impl RunStats {
    pub fn new(files_seen: usize, skipped_by_checkpoint: usize, pending: usize) -> Self {
        Self {
            started: Instant::now(),
            files_seen,
            skipped_by_checkpoint,
            pending,
            attempted: 0,
            per_template: TemplateVariant::ALL.into_iter().map(|v| (v, 0)).collect(),
            skips: BTreeMap::new(),
            checkpoint_failures: 0,
        }
    }

    pub fn record(&mut self, outcome: DocumentOutcome) {
        self.attempted += 1;
        match outcome {
            DocumentOutcome::Recorded(v) => *self.per_template.entry(v).or_insert(0) += 1,
            DocumentOutcome::Skipped(r) => *self.skips.entry(r).or_insert(0) += 1,
        }
    }

    pub fn recorded(&self) -> u64 {
        self.per_template.values().sum()
    }

    pub fn skipped(&self, reason: SkipReason) -> u64 {
        self.skips.get(&reason).copied().unwrap_or(0)
    }

    pub fn remaining(&self) -> usize {
        self.pending.saturating_sub(self.attempted)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn eta(&self) -> Option<Duration> {
        eta(self.elapsed(), self.attempted, self.remaining())
    }

    pub fn progress_line(&self) -> String {
        let counts = self
            .per_template
            .iter()
            .map(|(v, n)| format!("{v}={n}"))
            .collect::<Vec<_>>()
            .join(" ");
        let skipped: u64 = self.skips.values().sum();
        let eta = self
            .eta()
            .map(format_duration)
            .unwrap_or_else(|| "?".to_string());
        format!(
            "[{}/{}] {} skipped={} eta={}",
            self.attempted, self.pending, counts, skipped, eta
        )
    }
}

/// `(elapsed / done) * remaining`; `None` until something was done.
pub fn eta(elapsed: Duration, done: usize, remaining: usize) -> Option<Duration> {
    if done == 0 {
        return None;
    }
    Some(elapsed.div_f64(done as f64).mul_f64(remaining as f64))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub folder: String,
    pub started: String,
    pub finished: String,
    pub files_seen: usize,
    pub skipped_by_checkpoint: usize,
    pub attempted: usize,
    pub recorded: u64,
    pub per_template: BTreeMap<TemplateVariant, u64>,
    pub unknown_template: u64,
    pub extraction_failures: u64,
    pub persistence_failures: u64,
    pub duplicates: u64,
    pub checkpoint_failures: u64,
    pub last_checkpoint: Option<String>,
    pub elapsed_seconds: f64,
}

impl RunReport {
    pub fn from_stats(
        stats: &RunStats,
        folder: String,
        started: String,
        finished: String,
        last_checkpoint: Option<String>,
    ) -> Self {
        Self {
            folder,
            started,
            finished,
            files_seen: stats.files_seen,
            skipped_by_checkpoint: stats.skipped_by_checkpoint,
            attempted: stats.attempted,
            recorded: stats.recorded(),
            per_template: stats.per_template.clone(),
            unknown_template: stats.skipped(SkipReason::UnknownTemplate),
            extraction_failures: stats.skipped(SkipReason::ExtractionFailed),
            persistence_failures: stats.skipped(SkipReason::PersistenceFailed),
            duplicates: stats.skipped(SkipReason::Duplicate),
            checkpoint_failures: stats.checkpoint_failures,
            last_checkpoint,
            elapsed_seconds: stats.elapsed().as_secs_f64(),
        }
    }

    pub fn count(&self, variant: TemplateVariant) -> u64 {
        self.per_template.get(&variant).copied().unwrap_or(0)
    }
}
