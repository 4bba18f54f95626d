//! Generator configuration.
//!
//! One [`GeneratorConfig`] is built per process (or loaded from JSON) and
//! handed to the composer and packager. It also carries the result of the
//! startup capability probe, so rendering code never checks for the
//! drawing backend itself.

use serde::{Deserialize, Serialize};

use crate::error::TaxFormError;
use crate::font::{FontFamily, Typography};
use crate::model::PageSize;

/// Whether the PDF drawing backend is usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Available,
    Unavailable,
}

impl Capability {
    /// Probe the build for the drawing backend.
    pub fn probe() -> Self {
        if cfg!(feature = "pdf") {
            Capability::Available
        } else {
            Capability::Unavailable
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Capability::Available)
    }
}

impl Default for Capability {
    fn default() -> Self {
        Self::probe()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeneratorConfig {
    pub page_size: PageSize,
    /// X position of every drawn line, in points.
    pub left_margin: f64,
    /// Baseline of the page header (PDF coordinates, origin bottom-left).
    pub header_baseline: f64,
    /// Baseline of the first body line.
    pub body_baseline: f64,
    /// Distance the cursor moves down after each body line.
    pub line_step: f64,
    pub font_family: FontFamily,
    pub header_size: f64,
    pub body_size: f64,
    /// Header text is `"<title_prefix> <kind>"`.
    pub title_prefix: String,
    pub author: Option<String>,
    /// Archive files are named `<archive_prefix>_<timestamp>.zip`.
    pub archive_prefix: String,
    /// Deflate level (0-10) for content streams and archive entries.
    pub compression_level: u8,
    /// Append `manifest.csv` as the last archive entry.
    pub embed_manifest: bool,
    #[serde(skip)]
    pub capability: Capability,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            page_size: PageSize::Letter,
            left_margin: 72.0,
            header_baseline: 750.0,
            body_baseline: 700.0,
            line_step: 20.0,
            font_family: FontFamily::Helvetica,
            header_size: 16.0,
            body_size: 12.0,
            title_prefix: "Tax Form".to_string(),
            author: None,
            archive_prefix: "tax_forms".to_string(),
            compression_level: 6,
            embed_manifest: true,
            capability: Capability::probe(),
        }
    }
}

impl GeneratorConfig {
    /// Load a config from JSON. Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self, TaxFormError> {
        let config: GeneratorConfig = serde_json::from_str(json)?;
        if config.compression_level > 10 {
            return Err(TaxFormError::InvalidRequest(format!(
                "compression level {} is out of range 0-10",
                config.compression_level
            )));
        }
        Ok(config)
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capability = capability;
        self
    }

    pub fn typography(&self) -> Typography {
        Typography::new(self.font_family, self.header_size, self.body_size)
    }
}
