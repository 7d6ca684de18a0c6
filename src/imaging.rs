//! Page normalization shared by classification and extraction.
//!
//! A rendered page is converted to grayscale, its contrast is stretched
//! around the mean intensity and it is binarized at a fixed threshold. The
//! result is computed once per document and every region crop reads from it.

use crate::{
    config::Config,
    engine::PageRenderer,
    error::{IngestError, Result},
    registry::PixelBox,
};
use image::{DynamicImage, GrayImage, ImageOutputFormat, Luma, Rgb, RgbImage};
use std::io::Cursor;
use std::path::Path;

/// A normalized first page, plus the DPI it was rendered at.
#[derive(Debug, Clone)]
pub struct PreparedPage {
    pub image: GrayImage,
    pub dpi: u32,
}

/// Everything needed to turn a document path into a [`PreparedPage`].
#[derive(Debug, Clone, Copy)]
pub struct PageSettings {
    pub dpi: u32,
    pub contrast_factor: f32,
    pub threshold: u8,
}

impl PageSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            dpi: cfg.render.dpi,
            contrast_factor: cfg.preprocess.contrast_factor,
            threshold: cfg.preprocess.threshold,
        }
    }

    pub fn prepare(&self, renderer: &dyn PageRenderer, path: &Path) -> Result<PreparedPage> {
        let page = renderer.render_first_page(path, self.dpi)?;
        Ok(PreparedPage {
            image: self.normalize(&page),
            dpi: self.dpi,
        })
    }

    pub fn normalize(&self, page: &DynamicImage) -> GrayImage {
        let mut gray = page.to_luma8();
        enhance_contrast(&mut gray, self.contrast_factor);
        binarize(&mut gray, self.threshold);
        gray
    }
}

/// Scales every pixel's distance from the mean intensity by `factor`,
/// truncating the result like PIL's `ImageEnhance.Contrast`. A factor of
/// 1.0 leaves the image unchanged.
pub fn enhance_contrast(gray: &mut GrayImage, factor: f32) {
    let (w, h) = gray.dimensions();
    let count = u64::from(w) * u64::from(h);
    if count == 0 {
        return;
    }
    let sum: u64 = gray.pixels().map(|p| u64::from(p.0[0])).sum();
    let mean = (sum as f64 / count as f64 + 0.5).floor() as f32;

    for p in gray.pixels_mut() {
        let v = mean + factor * (f32::from(p.0[0]) - mean);
        p.0[0] = v.clamp(0.0, 255.0) as u8;
    }
}

/// Pixels strictly above `threshold` become white, everything else black.
pub fn binarize(gray: &mut GrayImage, threshold: u8) {
    for p in gray.pixels_mut() {
        p.0[0] = if p.0[0] > threshold { 255 } else { 0 };
    }
}

/// Crops `bbox` out of `page`, clipped to the page bounds. Returns `None`
/// when nothing of the box lies on the page.
pub fn crop(page: &GrayImage, bbox: PixelBox) -> Option<GrayImage> {
    let (w, h) = page.dimensions();
    let x0 = bbox.x0.min(w);
    let y0 = bbox.y0.min(h);
    let x1 = bbox.x1.min(w);
    let y1 = bbox.y1.min(h);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some(image::imageops::crop_imm(page, x0, y0, x1 - x0, y1 - y0).to_image())
}

pub fn encode_png(img: &GrayImage) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(img.clone())
        .write_to(&mut buf, ImageOutputFormat::Png)
        .map_err(|e| IngestError::Recognition(format!("encoding region as PNG: {e}")))?;
    Ok(buf.into_inner())
}

/// Draws a hollow rectangle, clipped to the image.
pub fn draw_box(img: &mut RgbImage, bbox: PixelBox, color: [u8; 3], thickness: u32) {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return;
    }
    let x1 = bbox.x1.min(w - 1);
    let y1 = bbox.y1.min(h - 1);
    for t in 0..thickness {
        let (left, top) = (bbox.x0 + t, bbox.y0 + t);
        let (right, bottom) = (x1.saturating_sub(t), y1.saturating_sub(t));
        if left > right || top > bottom {
            break;
        }
        for x in left..=right {
            img.put_pixel(x, top, Rgb(color));
            img.put_pixel(x, bottom, Rgb(color));
        }
        for y in top..=bottom {
            img.put_pixel(left, y, Rgb(color));
            img.put_pixel(right, y, Rgb(color));
        }
    }
}

/// Solid page of one intensity, mostly useful for fakes.
pub fn blank_page(width: u32, height: u32, value: u8) -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_pixel(width, height, Luma([value])))
}
