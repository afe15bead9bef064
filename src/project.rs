use ab_glyph::FontArc;
use image::RgbaImage;
use image::imageops::{self, FilterType};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::canvas::{PREVIEW_HEIGHT, PREVIEW_WIDTH, fit_to_canvas};
use crate::error::Result;
use crate::io::load_image;
use crate::ops::watermark::{self, WatermarkLayer, WatermarkSettings, composite, place_watermark, render_overlay};

/// Single open image and its watermark.
pub struct Project {
    pub id: Uuid,
    pub path: PathBuf,
    /// Display name (file name of `path`).
    pub name: String,
    /// Untouched source pixels, used for export.
    pub original: RgbaImage,
    /// `original` fitted to the preview canvas. Watermark coordinates live here.
    pub base: RgbaImage,
    /// Present while the watermark panel is open.
    pub watermark: Option<WatermarkSettings>,
    overlay: Option<WatermarkLayer>,
    pub is_dirty: bool,
}

impl Project {
    /// Load `path` and fit it to the preview canvas.
    pub fn open(path: &Path) -> Result<Self> {
        let original = load_image(path)?;
        Ok(Self::from_image(path.to_path_buf(), original))
    }

    pub fn from_image(path: PathBuf, original: RgbaImage) -> Self {
        let (w, h) = fit_to_canvas(original.width(), original.height(), PREVIEW_WIDTH, PREVIEW_HEIGHT);
        let base = imageops::resize(&original, w, h, FilterType::Lanczos3);
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "Unknown".to_string());

        Self {
            id: Uuid::new_v4(),
            path,
            name,
            original,
            base,
            watermark: None,
            overlay: None,
            is_dirty: false,
        }
    }

    pub fn base_size(&self) -> (u32, u32) {
        self.base.dimensions()
    }

    pub fn has_watermark(&self) -> bool {
        self.watermark.is_some()
    }

    pub fn overlay(&self) -> Option<&WatermarkLayer> {
        self.overlay.as_ref()
    }

    /// Start a watermark with default settings centred on the image.
    /// Does nothing when one already exists.
    pub fn add_watermark(&mut self, font: &FontArc) {
        if self.watermark.is_some() {
            return;
        }
        let (w, h) = self.base_size();
        self.update_watermark(WatermarkSettings::centered(w, h), font);
    }

    /// Replace the watermark settings and regenerate the overlay from scratch.
    pub fn update_watermark(&mut self, mut settings: WatermarkSettings, font: &FontArc) {
        let (w, h) = self.base_size();
        settings.font_size = watermark::clamp_font_size(settings.font_size as i64);
        settings.anchor = (
            settings.anchor.0.clamp(0.0, w as f32),
            settings.anchor.1.clamp(0.0, h as f32),
        );
        self.overlay = Some(place_watermark(&self.base, &settings, font));
        self.watermark = Some(settings);
        self.is_dirty = true;
    }

    /// Drop the watermark and its overlay.
    pub fn remove_watermark(&mut self) {
        self.watermark = None;
        self.overlay = None;
        self.is_dirty = false;
    }

    /// Base image with the overlay composited on top.
    pub fn preview(&self) -> RgbaImage {
        match &self.overlay {
            Some(layer) => composite(&self.base, &layer.image),
            None => self.base.clone(),
        }
    }

    /// Ratio from base-image coordinates to original pixels.
    pub fn export_scale(&self) -> f32 {
        self.original.width() as f32 / self.base.width().max(1) as f32
    }

    /// Composite the watermark at full resolution and write it to `destination`.
    /// The overlay is re-rendered at the original size instead of upscaling the
    /// preview overlay, so text stays sharp.
    pub fn export(&mut self, destination: &Path, font: &FontArc) -> Result<PathBuf> {
        self.export_with_quality(destination, font, crate::io::DEFAULT_JPEG_QUALITY)
    }

    pub fn export_with_quality(&mut self, destination: &Path, font: &FontArc, quality: u8) -> Result<PathBuf> {
        let (w, h) = self.original.dimensions();
        let overlay = match &self.watermark {
            Some(settings) => render_overlay(w, h, settings, self.export_scale(), font).image,
            None => RgbaImage::new(w, h),
        };
        let written = watermark::export_with_quality(&self.original, &overlay, destination, quality)?;
        log_info!("Session {} exported to {}", self.id, written.display());
        self.is_dirty = false;
        Ok(written)
    }

    /// Get the display title (name with dirty indicator)
    pub fn display_title(&self) -> String {
        if self.is_dirty {
            format!("{}*", self.name)
        } else {
            self.name.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::text::builtin_font;
    use image::Rgba;

    fn project(w: u32, h: u32) -> Project {
        Project::from_image(PathBuf::from("/tmp/photo.jpg"), RgbaImage::from_pixel(w, h, Rgba([50, 50, 50, 255])))
    }

    #[test]
    fn base_fits_preview_canvas() {
        let p = project(800, 600);
        assert_eq!(p.base_size(), (640, 480));
        assert_eq!(p.original.dimensions(), (800, 600));
        assert!((p.export_scale() - 1.25).abs() < 1e-6);
        assert_eq!(p.name, "photo.jpg");
    }

    #[test]
    fn each_opened_image_gets_its_own_session_id() {
        let a = project(40, 30);
        let b = project(40, 30);
        assert_ne!(a.id, b.id);
        assert!(!a.id.is_nil());
    }

    #[test]
    fn add_watermark_centres_anchor_once() {
        let font = builtin_font().unwrap();
        let mut p = project(800, 600);
        p.add_watermark(&font);
        assert_eq!(p.watermark.as_ref().unwrap().anchor, (320.0, 240.0));

        let mut moved = p.watermark.clone().unwrap();
        moved.anchor = (10.0, 10.0);
        p.update_watermark(moved, &font);
        p.add_watermark(&font);
        assert_eq!(p.watermark.as_ref().unwrap().anchor, (10.0, 10.0));
    }

    #[test]
    fn overlay_always_matches_base() {
        let font = builtin_font().unwrap();
        let mut p = project(1000, 300);
        p.add_watermark(&font);
        assert_eq!(p.overlay().unwrap().image.dimensions(), p.base_size());
        assert_eq!(p.preview().dimensions(), p.base_size());
    }

    #[test]
    fn update_clamps_out_of_range_settings() {
        let font = builtin_font().unwrap();
        let mut p = project(800, 600);
        p.add_watermark(&font);
        let mut s = p.watermark.clone().unwrap();
        s.font_size = 400;
        s.anchor = (-20.0, 9000.0);
        p.update_watermark(s, &font);
        let s = p.watermark.as_ref().unwrap();
        assert_eq!(s.font_size, watermark::FONT_SIZE_MAX);
        assert_eq!(s.anchor, (0.0, 480.0));
    }

    #[test]
    fn removing_watermark_restores_plain_preview() {
        let font = builtin_font().unwrap();
        let mut p = project(400, 400);
        p.add_watermark(&font);
        assert!(p.is_dirty);
        p.remove_watermark();
        assert!(p.overlay().is_none());
        assert_eq!(p.preview(), p.base);
        assert_eq!(p.display_title(), "photo.jpg");
    }
}
