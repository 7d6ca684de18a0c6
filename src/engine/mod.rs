pub mod poppler;
pub mod process;
pub mod tesseract;
pub mod types;

use crate::error::Result;
use image::{DynamicImage, GrayImage};
use std::path::Path;

pub use types::{EngineDiag, RecognitionOptions, ToolDiag};

/// Rasterizes documents. Only the first page is ever needed.
pub trait PageRenderer {
    fn render_first_page(&self, path: &Path, dpi: u32) -> Result<DynamicImage>;

    fn diagnose(&self) -> ToolDiag;
}

/// Reads text out of an already cropped page region.
pub trait TextRecognizer {
    fn recognize(&self, region: &GrayImage, options: &RecognitionOptions) -> Result<String>;

    fn diagnose(&self) -> ToolDiag;
}

pub fn doctor(renderer: &dyn PageRenderer, recognizer: &dyn TextRecognizer) -> EngineDiag {
    let renderer = renderer.diagnose();
    let recognizer = recognizer.diagnose();
    let ok = renderer.ok && recognizer.ok;
    EngineDiag {
        renderer,
        recognizer,
        ok,
    }
}
