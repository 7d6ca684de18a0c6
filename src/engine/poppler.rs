use super::{PageRenderer, ToolDiag, process};
use crate::{
    config::Render,
    error::{IngestError, Result},
};
use image::{DynamicImage, GenericImageView};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tracing::debug;

/// Renders pages through poppler's `pdftoppm`.
pub struct PopplerRenderer {
    exe: PathBuf,
    timeout: Option<Duration>,
}

impl PopplerRenderer {
    pub fn new(cfg: &Render) -> Self {
        Self {
            exe: PathBuf::from(&cfg.pdftoppm_exe),
            timeout: (cfg.timeout_seconds > 0).then(|| Duration::from_secs(cfg.timeout_seconds)),
        }
    }
}

impl PageRenderer for PopplerRenderer {
    fn render_first_page(&self, path: &Path, dpi: u32) -> Result<DynamicImage> {
        let scratch = tempfile::tempdir()?;
        let root = scratch.path().join("page");

        let mut cmd = Command::new(&self.exe);
        cmd.args(["-png", "-singlefile", "-f", "1", "-l", "1", "-r"])
            .arg(dpi.to_string())
            .arg(path)
            .arg(&root);

        process::run_tool(cmd, None, self.timeout)
            .map_err(|e| IngestError::Render(format!("{}: {e}", path.display())))?;

        let png = root.with_extension("png");
        let bytes = std::fs::read(&png)
            .map_err(|e| IngestError::Render(format!("reading {}: {e}", png.display())))?;
        let page = image::load_from_memory(&bytes)
            .map_err(|e| IngestError::Render(format!("decoding {}: {e}", png.display())))?;

        debug!(
            "rendered {} at {dpi} dpi: {}x{}",
            path.display(),
            page.width(),
            page.height()
        );
        Ok(page)
    }

    fn diagnose(&self) -> ToolDiag {
        process::probe_version("pdftoppm", &self.exe, "-v")
    }
}
