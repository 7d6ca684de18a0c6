//! Per-template field regions.
//!
//! Regions are calibrated as absolute pixel boxes on a US Letter page
//! rendered at [`REFERENCE_DPI`] and stored as fractions of that reference
//! page, so they can be projected onto a page rendered at any DPI.

use crate::{
    engine::RecognitionOptions,
    error::{IngestError, Result},
    template::{Field, TemplateVariant},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const REFERENCE_DPI: u32 = 300;
/// US Letter at the reference DPI.
pub const REFERENCE_PAGE_PX: (u32, u32) = (2550, 3300);

/// Absolute pixel box, `x1`/`y1` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelBox {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl PixelBox {
    pub const fn new(x0: u32, y0: u32, x1: u32, y1: u32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> u32 {
        self.x1.saturating_sub(self.x0)
    }

    pub fn height(&self) -> u32 {
        self.y1.saturating_sub(self.y0)
    }
}

impl From<[u32; 4]> for PixelBox {
    fn from([x0, y0, x1, y1]: [u32; 4]) -> Self {
        Self::new(x0, y0, x1, y1)
    }
}

/// Box in page-fraction coordinates of the reference page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl PageBox {
    /// Converts a box calibrated at the reference DPI, rejecting empty boxes
    /// and boxes that leave the reference page.
    pub fn from_reference_pixels(px: PixelBox) -> Result<Self> {
        let (w, h) = REFERENCE_PAGE_PX;
        if px.x1 <= px.x0 || px.y1 <= px.y0 {
            return Err(IngestError::InvalidRegistry(format!("empty box {px:?}")));
        }
        if px.x1 > w || px.y1 > h {
            return Err(IngestError::InvalidRegistry(format!(
                "box {px:?} exceeds the {w}x{h} reference page"
            )));
        }
        Ok(Self {
            x0: f64::from(px.x0) / f64::from(w),
            y0: f64::from(px.y0) / f64::from(h),
            x1: f64::from(px.x1) / f64::from(w),
            y1: f64::from(px.y1) / f64::from(h),
        })
    }

    /// Projects the box onto a page rendered at `dpi`.
    pub fn to_pixels(&self, dpi: u32) -> PixelBox {
        let scale = f64::from(dpi) / f64::from(REFERENCE_DPI);
        let w = f64::from(REFERENCE_PAGE_PX.0) * scale;
        let h = f64::from(REFERENCE_PAGE_PX.1) * scale;
        PixelBox {
            x0: (self.x0 * w).round() as u32,
            y0: (self.y0 * h).round() as u32,
            x1: (self.x1 * w).round() as u32,
            y1: (self.y1 * h).round() as u32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldRegion {
    pub field: Field,
    pub bbox: PageBox,
    pub options: RecognitionOptions,
}

/// Immutable template → regions map.
#[derive(Debug, Clone)]
pub struct RegionRegistry {
    templates: BTreeMap<TemplateVariant, Vec<FieldRegion>>,
}

impl RegionRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// The calibrated CC and MedLab layouts.
    pub fn builtin() -> Result<Self> {
        let block = RecognitionOptions::block();
        let gender = RecognitionOptions::block().with_whitelist("FM");

        Self::builder()
            .region(TemplateVariant::Cc, Field::PatientName, [655, 361, 1130, 429])
            .region(TemplateVariant::Cc, Field::DateOfBirth, [651, 446, 987, 522])
            .region_with(TemplateVariant::Cc, Field::Gender, [655, 541, 968, 608], gender.clone())
            .region(TemplateVariant::Cc, Field::Mrn, [650, 1276, 928, 1337])
            .region(TemplateVariant::Cc, Field::TestName, [649, 1352, 1278, 1405])
            .region(TemplateVariant::Cc, Field::CollectionDate, [650, 1493, 1214, 1556])
            .region(TemplateVariant::Cc, Field::TestedPathogen, [256, 1719, 633, 1776])
            .region(TemplateVariant::Cc, Field::TestResult, [651, 1721, 1196, 1779])
            .region(TemplateVariant::Cc, Field::ReportedDate, [647, 1565, 1137, 1628])
            .region(TemplateVariant::MedLab, Field::PatientName, [296, 472, 862, 529])
            .region(TemplateVariant::MedLab, Field::DateOfBirth, [394, 526, 609, 575])
            .region_with(TemplateVariant::MedLab, Field::Gender, [178, 571, 359, 628], gender)
            .region(TemplateVariant::MedLab, Field::Mrn, [380, 634, 656, 678])
            .region(TemplateVariant::MedLab, Field::TestName, [433, 1001, 1500, 1055])
            .region(TemplateVariant::MedLab, Field::SpecimenType, [1199, 477, 1608, 527])
            .region(TemplateVariant::MedLab, Field::CollectionDate, [1198, 523, 1607, 577])
            .region(TemplateVariant::MedLab, Field::TestedPathogen, [175, 1123, 764, 1167])
            .region(TemplateVariant::MedLab, Field::TestResult, [1295, 1119, 2087, 1172])
            .region(TemplateVariant::MedLab, Field::ReportedDate, [1192, 574, 1618, 627])
            .default_options(block)
            .build()
    }

    pub fn regions_for(&self, variant: TemplateVariant) -> Result<&[FieldRegion]> {
        self.templates
            .get(&variant)
            .map(Vec::as_slice)
            .ok_or(IngestError::UnknownVariant(variant))
    }

    pub fn variants(&self) -> impl Iterator<Item = TemplateVariant> + '_ {
        self.templates.keys().copied()
    }
}

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    entries: Vec<(TemplateVariant, Field, PixelBox, Option<RecognitionOptions>)>,
    default_options: Option<RecognitionOptions>,
}

impl RegistryBuilder {
    pub fn region(mut self, variant: TemplateVariant, field: Field, bbox: [u32; 4]) -> Self {
        self.entries.push((variant, field, bbox.into(), None));
        self
    }

    pub fn region_with(
        mut self,
        variant: TemplateVariant,
        field: Field,
        bbox: [u32; 4],
        options: RecognitionOptions,
    ) -> Self {
        self.entries.push((variant, field, bbox.into(), Some(options)));
        self
    }

    /// Options for regions added without explicit ones.
    pub fn default_options(mut self, options: RecognitionOptions) -> Self {
        self.default_options = Some(options);
        self
    }

    /// Validates every entry; a duplicate field within one template or a box
    /// outside the reference page fails the whole registry.
    pub fn build(self) -> Result<RegionRegistry> {
        let default_options = self.default_options.unwrap_or_default();
        let mut templates: BTreeMap<TemplateVariant, Vec<FieldRegion>> = BTreeMap::new();

        for (variant, field, px, options) in self.entries {
            let regions = templates.entry(variant).or_default();
            if regions.iter().any(|r| r.field == field) {
                return Err(IngestError::InvalidRegistry(format!(
                    "duplicate field {field} in template {variant}"
                )));
            }
            let bbox = match PageBox::from_reference_pixels(px) {
                Ok(bbox) => bbox,
                Err(IngestError::InvalidRegistry(msg)) => {
                    return Err(IngestError::InvalidRegistry(format!(
                        "{variant}.{field}: {msg}"
                    )));
                }
                Err(e) => return Err(e),
            };
            regions.push(FieldRegion {
                field,
                bbox,
                options: options.unwrap_or_else(|| default_options.clone()),
            });
        }

        Ok(RegionRegistry { templates })
    }
}
