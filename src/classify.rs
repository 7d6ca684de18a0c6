use crate::{
    config::Config,
    engine::{PageRenderer, RecognitionOptions, TextRecognizer},
    error::{IngestError, Result},
    imaging::{self, PageSettings, PreparedPage},
    postprocess,
    registry::{PageBox, PixelBox},
    template::TemplateVariant,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Classification {
    Known { template: TemplateVariant },
    Unknown { reason: String },
}

impl Classification {
    pub fn template(&self) -> Option<TemplateVariant> {
        match self {
            Classification::Known { template } => Some(*template),
            Classification::Unknown { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Marker {
    needle: String,
    template: TemplateVariant,
}

/// Decides a document's template from the text of one header region.
#[derive(Debug, Clone)]
pub struct Classifier {
    header: PageBox,
    options: RecognitionOptions,
    markers: Vec<Marker>,
    fallback: Option<TemplateVariant>,
    page: PageSettings,
}

impl Classifier {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let c = &cfg.classifier;
        let header = PageBox::from_reference_pixels(PixelBox::from(c.header_region))
            .map_err(|e| IngestError::Config(format!("classifier.header_region: {e}")))?;

        let mut markers = Vec::with_capacity(c.markers.len());
        for rule in &c.markers {
            let needle = postprocess::marker_text(&rule.marker);
            if needle.is_empty() {
                return Err(IngestError::Config(format!(
                    "empty classifier marker for template {}",
                    rule.template
                )));
            }
            markers.push(Marker {
                needle,
                template: rule.template,
            });
        }

        Ok(Self {
            header,
            options: RecognitionOptions::new(c.engine_mode, c.segmentation_mode),
            markers,
            fallback: c.fallback,
            page: PageSettings::from_config(cfg),
        })
    }

    pub fn header_box(&self) -> PageBox {
        self.header
    }

    /// First marker contained in the recognized header text wins.
    pub fn match_text(&self, text: &str) -> Classification {
        let text = postprocess::marker_text(text);
        if let Some(m) = self.markers.iter().find(|m| text.contains(&m.needle)) {
            return Classification::Known {
                template: m.template,
            };
        }
        match self.fallback {
            Some(template) => {
                debug!("no marker in header {:?}; falling back to {}", text, template);
                Classification::Known { template }
            }
            None => Classification::Unknown {
                reason: format!("no known marker in header text {text:?}"),
            },
        }
    }

    pub fn classify_page(
        &self,
        recognizer: &dyn TextRecognizer,
        page: &PreparedPage,
    ) -> Result<Classification> {
        let bbox = self.header.to_pixels(page.dpi);
        let Some(region) = imaging::crop(&page.image, bbox) else {
            return Ok(Classification::Unknown {
                reason: format!("header region {bbox:?} is outside the page"),
            });
        };
        let text = recognizer.recognize(&region, &self.options)?;
        Ok(self.match_text(&text))
    }

    /// Renders the first page and classifies it. Never fails: render or
    /// recognition errors are logged and reported as `Unknown`.
    pub fn classify(
        &self,
        renderer: &dyn PageRenderer,
        recognizer: &dyn TextRecognizer,
        path: &Path,
    ) -> Classification {
        let attempt = self
            .page
            .prepare(renderer, path)
            .and_then(|page| self.classify_page(recognizer, &page));

        match attempt {
            Ok(c) => c,
            Err(err) => {
                let err = IngestError::ClassificationFailed {
                    path: path.to_path_buf(),
                    reason: err.to_string(),
                };
                warn!("{err}");
                Classification::Unknown {
                    reason: err.to_string(),
                }
            }
        }
    }
}
