use crate::template::TemplateVariant;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: Global,
    #[serde(default)]
    pub batch: Batch,
    #[serde(default)]
    pub hashing: Hashing,
    #[serde(default)]
    pub render: Render,
    #[serde(default)]
    pub preprocess: Preprocess,
    #[serde(default)]
    pub ocr: Ocr,
    #[serde(default)]
    pub classifier: Classifier,
    #[serde(default)]
    pub postprocess: Postprocess,
    #[serde(default)]
    pub database: Database,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub debug: Debug,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.render.dpi == 0 {
            anyhow::bail!("render.dpi must be positive");
        }
        if self.preprocess.contrast_factor < 0.0 {
            anyhow::bail!("preprocess.contrast_factor must not be negative");
        }
        if self.batch.extension.trim_start_matches('.').is_empty() {
            anyhow::bail!("batch.extension must not be empty");
        }
        Ok(())
    }

    pub fn to_toml(&self) -> String {
        toml::to_string(self).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Global {
    pub dry_run: bool,
    pub print_summary: bool,
}
impl Default for Global {
    fn default() -> Self {
        Self {
            dry_run: false,
            print_summary: true,
        }
    }
}

/// What happens to the checkpoint when a document is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipPolicy {
    /// Leave the checkpoint where it is; a restart re-attempts the document
    /// unless a later document succeeds first.
    #[default]
    Hold,
    /// Move the checkpoint past unknown-template and extraction-failure
    /// skips. Persistence failures never move it.
    Advance,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Batch {
    pub extension: String,
    pub skip_policy: SkipPolicy,
    pub dedupe_by_content: bool,
}
impl Default for Batch {
    fn default() -> Self {
        Self {
            extension: "pdf".into(),
            skip_policy: SkipPolicy::Hold,
            dedupe_by_content: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Hashing {
    pub mode: String,
    pub fast_window_bytes: u64,
}
impl Default for Hashing {
    fn default() -> Self {
        Self {
            mode: "fast_2x16mb".into(),
            fast_window_bytes: 16 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Render {
    pub pdftoppm_exe: String,
    pub dpi: u32,
    pub timeout_seconds: u64,
}
impl Default for Render {
    fn default() -> Self {
        Self {
            pdftoppm_exe: "pdftoppm".into(),
            dpi: 300,
            timeout_seconds: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Preprocess {
    pub contrast_factor: f32,
    pub threshold: u8,
}
impl Default for Preprocess {
    fn default() -> Self {
        Self {
            contrast_factor: 2.0,
            threshold: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Ocr {
    pub tesseract_exe: String,
    pub lang: String,
    pub tessdata_dir: String,
    pub timeout_seconds: u64,
}
impl Default for Ocr {
    fn default() -> Self {
        Self {
            tesseract_exe: "tesseract".into(),
            lang: "eng".into(),
            tessdata_dir: "".into(),
            timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerRule {
    pub marker: String,
    pub template: TemplateVariant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Classifier {
    /// `[x0, y0, x1, y1]` at 300 DPI.
    pub header_region: [u32; 4],
    pub engine_mode: u8,
    pub segmentation_mode: u8,
    /// Template used when no marker matches. Unset means `Unknown`.
    pub fallback: Option<TemplateVariant>,
    pub markers: Vec<MarkerRule>,
}
impl Default for Classifier {
    fn default() -> Self {
        Self {
            header_region: [1746, 68, 2465, 158],
            engine_mode: 3,
            segmentation_mode: 3,
            fallback: None,
            markers: vec![
                MarkerRule {
                    marker: "MEDICAL RECORD".into(),
                    template: TemplateVariant::Cc,
                },
                MarkerRule {
                    marker: "MEDLAB".into(),
                    template: TemplateVariant::MedLab,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Postprocess {
    /// Apply NFKC before whitespace collapsing. Off by default so stored
    /// values keep characters such as `½` or `²`.
    pub normalize_unicode: bool,
}
impl Default for Postprocess {
    fn default() -> Self {
        Self {
            normalize_unicode: false,
        }
    }
}

/// Non-secret connection defaults. `DB_HOST`, `DB_NAME`, `DB_USER`,
/// `DB_PORT` override them; the password only ever comes from
/// `DB_PASSWORD`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Database {
    pub host: String,
    pub name: String,
    pub user: String,
    pub port: u16,
    pub connect_timeout_seconds: u64,
}
impl Default for Database {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            name: "".into(),
            user: "".into(),
            port: 5432,
            connect_timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Debug {
    pub dump_effective_config: bool,
}
