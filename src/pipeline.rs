use crate::{
    classify::Classification,
    config::SkipPolicy,
    context::RunContext,
    engine::{PageRenderer, TextRecognizer},
    error::{IngestError, Result},
    extract::document_id,
    report::{DocumentOutcome, RunReport, RunStats, SkipReason},
    store::{CheckpointLookup, CheckpointStore, RecordStore},
    util::{self, now_rfc3339},
};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// A candidate document in the source folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub name: String,
    pub path: PathBuf,
}

/// Regular files whose extension matches `extension` (case-insensitive),
/// sorted by file name.
pub fn list_documents(folder: &Path, extension: &str) -> Result<Vec<Document>> {
    let wanted = extension.trim_start_matches('.');
    let mut docs = Vec::new();

    for entry in std::fs::read_dir(folder)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        // Scanners emit both `.pdf` and `.PDF`.
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(wanted));
        if matches {
            docs.push(Document {
                name: document_id(&path),
                path,
            });
        }
    }

    docs.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(docs)
}

/// Drives one folder through classification, extraction and persistence,
/// one document at a time.
pub struct BatchRunner<'a, S> {
    ctx: &'a RunContext,
    renderer: &'a dyn PageRenderer,
    recognizer: &'a dyn TextRecognizer,
    store: &'a mut S,
}

impl<'a, S: RecordStore + CheckpointStore> BatchRunner<'a, S> {
    pub fn new(
        ctx: &'a RunContext,
        renderer: &'a dyn PageRenderer,
        recognizer: &'a dyn TextRecognizer,
        store: &'a mut S,
    ) -> Self {
        Self {
            ctx,
            renderer,
            recognizer,
            store,
        }
    }

    pub fn run(&mut self, folder: &Path) -> Result<RunReport> {
        if !folder.is_dir() {
            return Err(IngestError::FolderNotFound(folder.to_path_buf()));
        }
        let started = now_rfc3339();
        let identity = util::folder_identity(folder)?;

        let docs = list_documents(folder, &self.ctx.cfg.batch.extension)?;
        let resume_after = self.resolve_resume_point(&identity)?;

        let (done, pending): (Vec<&Document>, Vec<&Document>) = docs
            .iter()
            .partition(|d| resume_after.as_deref().is_some_and(|last| d.name.as_str() <= last));

        info!(
            "folder={} documents={} already_processed={} pending={}",
            identity,
            docs.len(),
            done.len(),
            pending.len()
        );

        let mut stats = RunStats::new(docs.len(), done.len(), pending.len());
        let mut last_checkpoint = resume_after;

        for doc in pending {
            let outcome = self.process_document(doc);
            stats.record(outcome);

            if self.should_advance(outcome) {
                match self.store.advance(&identity, &doc.name) {
                    Ok(()) => last_checkpoint = Some(doc.name.clone()),
                    Err(err) => {
                        stats.checkpoint_failures += 1;
                        error!("{}: {err}", doc.name);
                    }
                }
            }

            info!("{} {}", stats.progress_line(), doc.name);
        }

        let report = RunReport::from_stats(
            &stats,
            identity,
            started,
            now_rfc3339(),
            last_checkpoint,
        );
        info!(
            "finished: attempted={} recorded={} unknown={} extraction_failures={} persistence_failures={} duplicates={} elapsed={}",
            report.attempted,
            report.recorded,
            report.unknown_template,
            report.extraction_failures,
            report.persistence_failures,
            report.duplicates,
            util::format_duration(stats.elapsed())
        );
        Ok(report)
    }

    /// The identifier after which this run starts. A checkpoint left by
    /// another folder is cleared first.
    fn resolve_resume_point(&mut self, identity: &str) -> Result<Option<String>> {
        match self.store.last_processed(identity)? {
            CheckpointLookup::Absent => Ok(None),
            CheckpointLookup::Matches(last) => {
                info!("resuming after {last}");
                Ok(Some(last))
            }
            CheckpointLookup::Foreign {
                folder,
                last_processed,
            } => {
                warn!(
                    "checkpoint {} belongs to folder {}; starting over",
                    last_processed,
                    folder.as_deref().unwrap_or("<none>")
                );
                self.store.reset()?;
                Ok(None)
            }
        }
    }

    fn process_document(&mut self, doc: &Document) -> DocumentOutcome {
        let ctx = self.ctx;
        debug!("processing {}", doc.path.display());

        let fingerprint = match util::hash_file(&ctx.cfg.hashing, &doc.path) {
            Ok(h) => Some(h),
            Err(err) => {
                warn!("{}: hashing failed: {err}", doc.name);
                None
            }
        };

        if ctx.cfg.batch.dedupe_by_content {
            if let Some(fp) = fingerprint.as_deref() {
                match self.store.contains_fingerprint(fp) {
                    Ok(true) => {
                        info!("{}: content already recorded, skipping", doc.name);
                        return DocumentOutcome::Skipped(SkipReason::Duplicate);
                    }
                    Ok(false) => {}
                    Err(err) => warn!("{}: duplicate lookup failed: {err}", doc.name),
                }
            }
        }

        let classified = ctx
            .page
            .prepare(self.renderer, &doc.path)
            .and_then(|page| {
                let c = ctx.classifier.classify_page(self.recognizer, &page)?;
                Ok((page, c))
            });

        let (page, variant) = match classified {
            Ok((page, Classification::Known { template })) => (page, template),
            Ok((_, Classification::Unknown { reason })) => {
                warn!("{}: unknown template: {reason}", doc.name);
                return DocumentOutcome::Skipped(SkipReason::UnknownTemplate);
            }
            Err(err) => {
                let err = IngestError::ClassificationFailed {
                    path: doc.path.clone(),
                    reason: err.to_string(),
                };
                warn!("{err}");
                return DocumentOutcome::Skipped(SkipReason::UnknownTemplate);
            }
        };
        debug!("{}: template {}", doc.name, variant);

        let record = match ctx
            .extractor()
            .extract_page(self.recognizer, &page, variant, &doc.name)
        {
            Ok(r) => r.with_fingerprint(fingerprint),
            Err(err) => {
                let err = IngestError::ExtractionFailed {
                    path: doc.path.clone(),
                    reason: err.to_string(),
                };
                error!("{err}");
                return DocumentOutcome::Skipped(SkipReason::ExtractionFailed);
            }
        };

        if let Err(err) = self.store.insert(&record) {
            error!("{}: {err}", doc.name);
            return DocumentOutcome::Skipped(SkipReason::PersistenceFailed);
        }

        DocumentOutcome::Recorded(variant)
    }

    fn should_advance(&self, outcome: DocumentOutcome) -> bool {
        match outcome {
            DocumentOutcome::Recorded(_) => true,
            DocumentOutcome::Skipped(SkipReason::Duplicate) => true,
            DocumentOutcome::Skipped(SkipReason::PersistenceFailed) => false,
            DocumentOutcome::Skipped(SkipReason::UnknownTemplate)
            | DocumentOutcome::Skipped(SkipReason::ExtractionFailed) => {
                self.ctx.cfg.batch.skip_policy == SkipPolicy::Advance
            }
        }
    }
}
