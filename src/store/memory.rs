use super::{Checkpoint, CheckpointStore, RecordStore};
use crate::{
    error::{IngestError, Result},
    record::ExtractedRecord,
};
use std::collections::HashSet;

/// Process-local store used by `--dry-run`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Vec<ExtractedRecord>,
    checkpoint: Option<Checkpoint>,
    failing_inserts: HashSet<String>,
    failing_checkpoint: bool,
    failing_lookups: bool,
}

impl MemoryStore {
    pub fn with_checkpoint(checkpoint: Checkpoint) -> Self {
        Self {
            checkpoint: Some(checkpoint),
            ..Self::default()
        }
    }

    /// Makes inserts for `source_file` fail, to exercise write-failure paths.
    pub fn fail_inserts_for(&mut self, source_file: &str) {
        self.failing_inserts.insert(source_file.to_string());
    }

    /// Makes every `advance` and `reset` fail.
    pub fn fail_checkpoint_writes(&mut self) {
        self.failing_checkpoint = true;
    }

    /// Makes every fingerprint lookup fail.
    pub fn fail_lookups(&mut self) {
        self.failing_lookups = true;
    }

    fn check_checkpoint_write(&self) -> Result<()> {
        if self.failing_checkpoint {
            return Err(IngestError::CheckpointFailed(
                "checkpoint table is read-only".into(),
            ));
        }
        Ok(())
    }

    pub fn records(&self) -> &[ExtractedRecord] {
        &self.records
    }

    pub fn checkpoint(&self) -> Option<&Checkpoint> {
        self.checkpoint.as_ref()
    }
}

impl RecordStore for MemoryStore {
    fn insert(&mut self, record: &ExtractedRecord) -> Result<()> {
        if self.failing_inserts.contains(&record.source_file) {
            return Err(IngestError::PersistenceWriteFailed(format!(
                "insert rejected for {}",
                record.source_file
            )));
        }
        self.records.push(record.clone());
        Ok(())
    }

    fn contains_fingerprint(&mut self, sha256: &str) -> Result<bool> {
        if self.failing_lookups {
            return Err(IngestError::PersistenceReadFailed(
                "fingerprint index unavailable".into(),
            ));
        }
        Ok(self
            .records
            .iter()
            .any(|r| r.source_sha256.as_deref() == Some(sha256)))
    }
}

impl CheckpointStore for MemoryStore {
    fn load(&mut self) -> Result<Option<Checkpoint>> {
        Ok(self.checkpoint.clone())
    }

    fn advance(&mut self, folder: &str, identifier: &str) -> Result<()> {
        self.check_checkpoint_write()?;
        self.checkpoint = Some(Checkpoint {
            folder: Some(folder.to_string()),
            last_processed: identifier.to_string(),
        });
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        self.check_checkpoint_write()?;
        self.checkpoint = None;
        Ok(())
    }
}
