//! Durable state of a batch: one row per extracted record and a single
//! checkpoint row.

pub mod memory;
pub mod postgres;
mod schema;

use crate::{error::Result, record::ExtractedRecord};
use serde::{Deserialize, Serialize};

pub use memory::MemoryStore;
pub use postgres::{DbSettings, PgStore};

pub trait RecordStore {
    fn insert(&mut self, record: &ExtractedRecord) -> Result<()>;

    /// Whether a record with this content fingerprint was already stored.
    fn contains_fingerprint(&mut self, sha256: &str) -> Result<bool>;
}

/// The stored checkpoint row. `folder` is `None` for rows written before
/// checkpoints were folder-scoped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub folder: Option<String>,
    pub last_processed: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckpointLookup {
    Absent,
    Matches(String),
    /// The row belongs to another folder (or to no folder at all) and must be
    /// reset before this folder is processed.
    Foreign {
        folder: Option<String>,
        last_processed: String,
    },
}

pub trait CheckpointStore {
    fn load(&mut self) -> Result<Option<Checkpoint>>;

    /// Replaces the single checkpoint row.
    fn advance(&mut self, folder: &str, identifier: &str) -> Result<()>;

    fn reset(&mut self) -> Result<()>;

    fn last_processed(&mut self, folder: &str) -> Result<CheckpointLookup> {
        Ok(match self.load()? {
            None => CheckpointLookup::Absent,
            Some(cp) if cp.folder.as_deref() == Some(folder) => {
                CheckpointLookup::Matches(cp.last_processed)
            }
            Some(cp) => CheckpointLookup::Foreign {
                folder: cp.folder,
                last_processed: cp.last_processed,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_scopes_checkpoint_to_folder() {
        let mut store = MemoryStore::default();
        assert_eq!(store.last_processed("/a").unwrap(), CheckpointLookup::Absent);

        store.advance("/a", "01.pdf").unwrap();
        store.advance("/a", "02.pdf").unwrap();
        assert_eq!(
            store.last_processed("/a").unwrap(),
            CheckpointLookup::Matches("02.pdf".into())
        );
        assert_eq!(
            store.last_processed("/b").unwrap(),
            CheckpointLookup::Foreign {
                folder: Some("/a".into()),
                last_processed: "02.pdf".into()
            }
        );

        store.reset().unwrap();
        assert_eq!(store.last_processed("/a").unwrap(), CheckpointLookup::Absent);
    }

    #[test]
    fn legacy_row_without_folder_is_foreign() {
        let mut store = MemoryStore::with_checkpoint(Checkpoint {
            folder: None,
            last_processed: "x.pdf".into(),
        });
        assert!(matches!(
            store.last_processed("/a").unwrap(),
            CheckpointLookup::Foreign { folder: None, .. }
        ));
    }
}
