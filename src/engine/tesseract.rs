use super::{RecognitionOptions, TextRecognizer, ToolDiag, process};
use crate::{
    config::Ocr,
    error::{IngestError, Result},
    imaging,
};
use image::GrayImage;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

/// Recognizes text through the `tesseract` command line, piping each region
/// in as PNG and reading plain text back from stdout.
pub struct TesseractCli {
    exe: PathBuf,
    lang: String,
    tessdata_dir: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl TesseractCli {
    pub fn new(cfg: &Ocr) -> Self {
        Self {
            exe: PathBuf::from(&cfg.tesseract_exe),
            lang: cfg.lang.clone(),
            tessdata_dir: (!cfg.tessdata_dir.is_empty()).then(|| PathBuf::from(&cfg.tessdata_dir)),
            timeout: (cfg.timeout_seconds > 0).then(|| Duration::from_secs(cfg.timeout_seconds)),
        }
    }

    pub fn args(&self, options: &RecognitionOptions) -> Vec<String> {
        let mut args = vec!["stdin".to_string(), "stdout".to_string()];
        if let Some(dir) = &self.tessdata_dir {
            args.push("--tessdata-dir".into());
            args.push(dir.display().to_string());
        }
        args.extend([
            "-l".to_string(),
            self.lang.clone(),
            "--oem".to_string(),
            options.engine_mode.to_string(),
            "--psm".to_string(),
            options.segmentation_mode.to_string(),
        ]);
        if let Some(chars) = &options.char_whitelist {
            args.push("-c".into());
            args.push(format!("tessedit_char_whitelist={chars}"));
        }
        args
    }
}

impl TextRecognizer for TesseractCli {
    fn recognize(&self, region: &GrayImage, options: &RecognitionOptions) -> Result<String> {
        let png = imaging::encode_png(region)?;

        let mut cmd = Command::new(&self.exe);
        cmd.args(self.args(options));

        let output = process::run_tool(cmd, Some(&png), self.timeout)
            .map_err(|e| IngestError::Recognition(e.to_string()))?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn diagnose(&self) -> ToolDiag {
        process::probe_version("tesseract", &self.exe, "--version")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gender_whitelist_becomes_config_variable() {
        let engine = TesseractCli::new(&Ocr::default());
        let args = engine.args(&RecognitionOptions::block().with_whitelist("FM"));
        assert_eq!(&args[..2], ["stdin", "stdout"]);
        assert!(args.windows(2).any(|w| w == ["--psm", "6"]));
        assert!(args.windows(2).any(|w| w == ["--oem", "3"]));
        assert_eq!(args.last().unwrap(), "tessedit_char_whitelist=FM");
    }

    #[test]
    fn tessdata_dir_is_passed_when_configured() {
        let mut cfg = Ocr::default();
        cfg.tessdata_dir = "/opt/tessdata".into();
        let args = TesseractCli::new(&cfg).args(&RecognitionOptions::new(3, 3));
        assert!(args.windows(2).any(|w| w == ["--tessdata-dir", "/opt/tessdata"]));
        assert!(!args.iter().any(|a| a == "-c"));
    }
}
