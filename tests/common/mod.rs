#![allow(dead_code)]

use image::{DynamicImage, GrayImage};
use lab_ingest::{
    config::Config,
    context::RunContext,
    engine::{PageRenderer, RecognitionOptions, TextRecognizer, ToolDiag},
    error::{IngestError, Result},
    imaging,
    registry::{REFERENCE_DPI, REFERENCE_PAGE_PX},
};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::rc::Rc;

/// Small pages keep the fakes fast.
pub const TEST_DPI: u32 = 30;

pub const FIELD_TEXT: &str = "  some\n  value\t ";

pub fn test_config() -> Config {
    let mut cfg = Config::default();
    cfg.render.dpi = TEST_DPI;
    cfg
}

pub fn context(cfg: Config) -> RunContext {
    RunContext::new(cfg).expect("run context")
}

fn diag(tool: &str) -> ToolDiag {
    ToolDiag {
        tool: tool.into(),
        executable: "fake".into(),
        version: Some("0".into()),
        ok: true,
        error: None,
    }
}

/// Returns a blank Letter page and remembers which document it rendered.
pub struct FakeRenderer {
    current: Rc<RefCell<String>>,
    failing: HashSet<String>,
}

impl FakeRenderer {
    pub fn fail_for(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }
}

impl PageRenderer for FakeRenderer {
    fn render_first_page(&self, path: &Path, dpi: u32) -> Result<DynamicImage> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.failing.contains(&name) {
            return Err(IngestError::Render(format!("{name}: corrupt document")));
        }
        *self.current.borrow_mut() = name;
        let w = REFERENCE_PAGE_PX.0 * dpi / REFERENCE_DPI;
        let h = REFERENCE_PAGE_PX.1 * dpi / REFERENCE_DPI;
        Ok(imaging::blank_page(w, h, 255))
    }

    fn diagnose(&self) -> ToolDiag {
        diag("renderer")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognizeCall {
    pub document: String,
    pub dims: (u32, u32),
    pub options: RecognitionOptions,
}

/// Answers header reads from a per-document script and every other region
/// with [`FIELD_TEXT`].
pub struct ScriptedRecognizer {
    current: Rc<RefCell<String>>,
    headers: HashMap<String, String>,
    failing_fields: HashSet<String>,
    header_psm: u8,
    pub calls: RefCell<Vec<RecognizeCall>>,
}

impl ScriptedRecognizer {
    pub fn header(mut self, document: &str, text: &str) -> Self {
        self.headers.insert(document.to_string(), text.to_string());
        self
    }

    pub fn fail_fields_for(mut self, document: &str) -> Self {
        self.failing_fields.insert(document.to_string());
        self
    }

    /// Field reads (everything but the header) made so far.
    pub fn field_calls(&self) -> Vec<RecognizeCall> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.options.segmentation_mode != self.header_psm)
            .cloned()
            .collect()
    }
}

impl TextRecognizer for ScriptedRecognizer {
    fn recognize(&self, region: &GrayImage, options: &RecognitionOptions) -> Result<String> {
        let document = self.current.borrow().clone();
        self.calls.borrow_mut().push(RecognizeCall {
            document: document.clone(),
            dims: region.dimensions(),
            options: options.clone(),
        });

        if options.segmentation_mode == self.header_psm {
            return Ok(self.headers.get(&document).cloned().unwrap_or_default());
        }
        if self.failing_fields.contains(&document) {
            return Err(IngestError::Recognition(format!("{document}: engine crashed")));
        }
        Ok(FIELD_TEXT.to_string())
    }

    fn diagnose(&self) -> ToolDiag {
        diag("recognizer")
    }
}

/// A renderer/recognizer pair sharing the "current document" slot.
pub fn fakes(cfg: &Config) -> (FakeRenderer, ScriptedRecognizer) {
    let current = Rc::new(RefCell::new(String::new()));
    (
        FakeRenderer {
            current: Rc::clone(&current),
            failing: HashSet::new(),
        },
        ScriptedRecognizer {
            current,
            headers: HashMap::new(),
            failing_fields: HashSet::new(),
            header_psm: cfg.classifier.segmentation_mode,
            calls: RefCell::new(Vec::new()),
        },
    )
}

/// Writes one file per name; contents differ so fingerprints differ.
pub fn write_docs(dir: &Path, names: &[&str]) {
    for name in names {
        std::fs::write(dir.join(name), format!("%PDF-1.4 {name}")).expect("write doc");
    }
}
