use crate::{
    config::{Config, Postprocess},
    engine::{PageRenderer, TextRecognizer},
    error::{IngestError, Result},
    imaging::{self, PageSettings, PreparedPage},
    postprocess,
    record::ExtractedRecord,
    registry::RegionRegistry,
    template::TemplateVariant,
};
use std::path::Path;
use tracing::debug;

/// Reads every registered region of one template off a prepared page.
pub struct FieldExtractor<'a> {
    registry: &'a RegionRegistry,
    page: PageSettings,
    postprocess: Postprocess,
}

impl<'a> FieldExtractor<'a> {
    pub fn new(registry: &'a RegionRegistry, cfg: &Config) -> Self {
        Self {
            registry,
            page: PageSettings::from_config(cfg),
            postprocess: cfg.postprocess.clone(),
        }
    }

    pub fn extract(
        &self,
        renderer: &dyn PageRenderer,
        recognizer: &dyn TextRecognizer,
        path: &Path,
        variant: TemplateVariant,
    ) -> Result<ExtractedRecord> {
        self.registry.regions_for(variant)?;
        let page = self
            .page
            .prepare(renderer, path)
            .map_err(|e| IngestError::ExtractionFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        self.extract_page(recognizer, &page, variant, &document_id(path))
            .map_err(|e| IngestError::ExtractionFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }

    /// Fields are read independently: an empty region yields an empty value
    /// and never stops the remaining fields from being read.
    pub fn extract_page(
        &self,
        recognizer: &dyn TextRecognizer,
        page: &PreparedPage,
        variant: TemplateVariant,
        source_file: &str,
    ) -> Result<ExtractedRecord> {
        let regions = self.registry.regions_for(variant)?;
        let mut record = ExtractedRecord::new(variant, source_file);

        for region in regions {
            let bbox = region.bbox.to_pixels(page.dpi);
            let value = match imaging::crop(&page.image, bbox) {
                Some(cropped) => {
                    let raw = recognizer.recognize(&cropped, &region.options)?;
                    postprocess::normalize_text(&self.postprocess, &raw)
                }
                None => {
                    debug!("{} region {:?} is outside the page", region.field, bbox);
                    String::new()
                }
            };
            record.fields.set(region.field, value);
        }

        Ok(record)
    }
}

/// Identifier used for checkpoints and the `source_file` column.
pub fn document_id(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
