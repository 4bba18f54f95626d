//! # Fonts
//!
//! Forms only use the standard PDF Type1 fonts, which every viewer ships
//! and which therefore need no embedding. Typography is two-tier and fixed
//! across all kinds: an emphasized header face and a regular body face.

use serde::{Deserialize, Serialize};

/// The standard PDF fonts we draw with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    TimesRoman,
    TimesBold,
    Courier,
    CourierBold,
}

impl StandardFont {
    /// The PDF name for this font.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
            Self::TimesRoman => "Times-Roman",
            Self::TimesBold => "Times-Bold",
            Self::Courier => "Courier",
            Self::CourierBold => "Courier-Bold",
        }
    }
}

/// Font family selectable in config.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FontFamily {
    #[default]
    Helvetica,
    Times,
    Courier,
}

impl FontFamily {
    /// Resolve the family + weight to a standard font.
    pub fn resolve(&self, bold: bool) -> StandardFont {
        match (self, bold) {
            (FontFamily::Helvetica, false) => StandardFont::Helvetica,
            (FontFamily::Helvetica, true) => StandardFont::HelveticaBold,
            (FontFamily::Times, false) => StandardFont::TimesRoman,
            (FontFamily::Times, true) => StandardFont::TimesBold,
            (FontFamily::Courier, false) => StandardFont::Courier,
            (FontFamily::Courier, true) => StandardFont::CourierBold,
        }
    }
}

/// Which tier of the two-tier convention a line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTier {
    Header,
    Body,
}

/// A concrete face: font plus size in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Typeface {
    pub font: StandardFont,
    pub size: f64,
}

/// The resolved header and body faces for one render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Typography {
    pub header: Typeface,
    pub body: Typeface,
}

impl Typography {
    pub fn new(family: FontFamily, header_size: f64, body_size: f64) -> Self {
        Self {
            header: Typeface {
                font: family.resolve(true),
                size: header_size,
            },
            body: Typeface {
                font: family.resolve(false),
                size: body_size,
            },
        }
    }

    pub fn face(&self, tier: TypeTier) -> Typeface {
        match tier {
            TypeTier::Header => self.header,
            TypeTier::Body => self.body,
        }
    }
}

impl Default for Typography {
    fn default() -> Self {
        Self::new(FontFamily::Helvetica, 16.0, 12.0)
    }
}
