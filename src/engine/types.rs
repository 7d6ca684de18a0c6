use serde::{Deserialize, Serialize};

/// Settings handed to the text recognizer for one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognitionOptions {
    /// Tesseract `--oem`.
    pub engine_mode: u8,
    /// Tesseract `--psm`.
    pub segmentation_mode: u8,
    /// Restricts recognition to these characters when set.
    #[serde(default)]
    pub char_whitelist: Option<String>,
}

impl RecognitionOptions {
    pub fn new(engine_mode: u8, segmentation_mode: u8) -> Self {
        Self {
            engine_mode,
            segmentation_mode,
            char_whitelist: None,
        }
    }

    /// LSTM engine, single uniform block of text.
    pub fn block() -> Self {
        Self::new(3, 6)
    }

    pub fn with_whitelist(mut self, chars: &str) -> Self {
        self.char_whitelist = Some(chars.to_string());
        self
    }
}

impl Default for RecognitionOptions {
    fn default() -> Self {
        Self::block()
    }
}

/// Result of probing one external tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDiag {
    pub tool: String,
    pub executable: String,
    pub version: Option<String>,
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineDiag {
    pub renderer: ToolDiag,
    pub recognizer: ToolDiag,
    pub ok: bool,
}
