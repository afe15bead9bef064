//! Watermark placement and compositing.
//!
//! A watermark is a transparent layer, the same size as the image it is
//! composited onto, carrying only the rendered text. The layer is always
//! regenerated from scratch from [`WatermarkSettings`]; nothing is edited
//! in place.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use ab_glyph::FontArc;
use image::RgbaImage;
use image::imageops::{self, FilterType};
use rayon::prelude::*;

use crate::error::{Result, WatermarkError};
use crate::io::{SaveFormat, encode_and_write, with_default_extension};
use crate::ops::text::{draw_text, text_pixel_bounds};

pub const FONT_SIZE_MIN: u32 = 12;
pub const FONT_SIZE_MAX: u32 = 72;
pub const DEFAULT_FONT_SIZE: u32 = 36;
pub const DEFAULT_TEXT: &str = "Watermark";
pub const DEFAULT_COLOR: [u8; 3] = [255, 255, 255];
pub const DEFAULT_OPACITY: u8 = 100;

/// User-facing watermark parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct WatermarkSettings {
    pub text: String,
    pub color: [u8; 3],
    /// 0–100 percent.
    pub opacity: u8,
    /// Always within `FONT_SIZE_MIN..=FONT_SIZE_MAX`.
    pub font_size: u32,
    /// Centre of the text, in base-image coordinates.
    pub anchor: (f32, f32),
}

impl WatermarkSettings {
    /// Default watermark centred on an image of the given size.
    pub fn centered(width: u32, height: u32) -> Self {
        Self {
            text: DEFAULT_TEXT.to_string(),
            color: DEFAULT_COLOR,
            opacity: DEFAULT_OPACITY,
            font_size: DEFAULT_FONT_SIZE,
            anchor: ((width / 2) as f32, (height / 2) as f32),
        }
    }

    pub fn alpha(&self) -> u8 {
        opacity_to_alpha(self.opacity)
    }

    pub fn rgba(&self) -> [u8; 4] {
        [self.color[0], self.color[1], self.color[2], self.alpha()]
    }

    pub fn color_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.color[0], self.color[1], self.color[2])
    }
}

/// Where the text ended up inside a [`WatermarkLayer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl TextRect {
    pub fn center(&self) -> (f32, f32) {
        (
            self.x as f32 + self.width as f32 / 2.0,
            self.y as f32 + self.height as f32 / 2.0,
        )
    }
}

/// Rendered watermark: transparent everywhere except the text.
#[derive(Clone, Debug)]
pub struct WatermarkLayer {
    pub image: RgbaImage,
    /// `None` when the text renders nothing (empty, whitespace, zero alpha).
    pub text_rect: Option<TextRect>,
}

// ============================================================================
// PARAMETER PARSING
// ============================================================================

/// Parse `#RRGGBB`, `RRGGBB` or `#RGB`.
pub fn parse_hex_color(input: &str) -> Option<[u8; 3]> {
    let hex = input.trim();
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        6 => Some([
            u8::from_str_radix(&hex[0..2], 16).ok()?,
            u8::from_str_radix(&hex[2..4], 16).ok()?,
            u8::from_str_radix(&hex[4..6], 16).ok()?,
        ]),
        3 => {
            let mut out = [0u8; 3];
            for (i, c) in hex.chars().enumerate() {
                let v = c.to_digit(16)? as u8;
                out[i] = v * 16 + v;
            }
            Some(out)
        }
        _ => None,
    }
}

/// Parse a color string, falling back to [`DEFAULT_COLOR`].
pub fn color_or_default(input: &str) -> [u8; 3] {
    parse_hex_color(input).unwrap_or_else(|| {
        log_warn!("Malformed color '{}', using default", input);
        DEFAULT_COLOR
    })
}

/// Map a 0–100 opacity percentage onto 0–255 alpha.
pub fn opacity_to_alpha(opacity: u8) -> u8 {
    (opacity.min(100) as u32 * 255 / 100) as u8
}

pub fn clamp_font_size(size: i64) -> u32 {
    size.clamp(FONT_SIZE_MIN as i64, FONT_SIZE_MAX as i64) as u32
}

/// Outcome of validating a font size entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FontSizeEntry {
    /// Nothing typed; keep the current size and leave the field alone.
    Empty,
    /// Number accepted; `clamped` is true when it had to be pulled into range.
    Accepted { size: u32, clamped: bool },
    /// Not a number; the field should show `previous` again.
    Rejected { previous: u32 },
}

impl FontSizeEntry {
    /// The size in effect after this entry.
    pub fn effective(&self, current: u32) -> u32 {
        match *self {
            FontSizeEntry::Accepted { size, .. } => size,
            FontSizeEntry::Empty => current,
            FontSizeEntry::Rejected { previous } => previous,
        }
    }
}

pub fn parse_font_size(input: &str, current: u32) -> FontSizeEntry {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return FontSizeEntry::Empty;
    }
    match trimmed.parse::<i64>() {
        Ok(n) => {
            let size = clamp_font_size(n);
            FontSizeEntry::Accepted { size, clamped: size as i64 != n }
        }
        Err(_) => FontSizeEntry::Rejected { previous: current },
    }
}

// ============================================================================
// PLACEMENT
// ============================================================================

/// Render the watermark for `base_image`. The returned layer has exactly
/// the base image's dimensions.
pub fn place_watermark(
    base_image: &RgbaImage,
    settings: &WatermarkSettings,
    font: &FontArc,
) -> WatermarkLayer {
    render_overlay(base_image.width(), base_image.height(), settings, 1.0, font)
}

/// Render the watermark onto a fresh `width × height` transparent layer.
///
/// `scale` converts from base-image coordinates to the target resolution:
/// both the anchor and the font size are multiplied by it.
pub fn render_overlay(
    width: u32,
    height: u32,
    settings: &WatermarkSettings,
    scale: f32,
    font: &FontArc,
) -> WatermarkLayer {
    let mut image = RgbaImage::new(width, height);
    let font_px = settings.font_size as f32 * scale;

    let Some(bounds) = text_pixel_bounds(font, &settings.text, font_px) else {
        return WatermarkLayer { image, text_rect: None };
    };
    let (tw, th) = (bounds.width() as i64, bounds.height() as i64);

    let cx = (settings.anchor.0 * scale) as i64;
    let cy = (settings.anchor.1 * scale) as i64;
    let x = (cx - tw / 2).min(width as i64 - tw).max(0);
    let y = (cy - th / 2).min(height as i64 - th).max(0);

    let alpha = settings.alpha();
    if alpha == 0 {
        return WatermarkLayer { image, text_rect: None };
    }

    let placed = draw_text(&mut image, font, &settings.text, font_px, (x as i32, y as i32), settings.rgba());
    let text_rect = placed.map(|p| TextRect {
        x: p.min_x as u32,
        y: p.min_y as u32,
        width: p.width().min(width.saturating_sub(p.min_x as u32)),
        height: p.height().min(height.saturating_sub(p.min_y as u32)),
    });

    WatermarkLayer { image, text_rect }
}

// ============================================================================
// COMPOSITING
// ============================================================================

/// Porter–Duff "over" for one straight-alpha RGBA pixel.
#[inline]
fn blend_over(dst: &mut [u8], src: &[u8]) {
    let ta = src[3] as f32 / 255.0;
    if ta <= 0.0 {
        return;
    }
    if src[3] == 255 {
        dst.copy_from_slice(src);
        return;
    }
    let ba = dst[3] as f32 / 255.0;
    let out_a = ta + ba * (1.0 - ta);
    for c in 0..3 {
        let v = (src[c] as f32 * ta + dst[c] as f32 * ba * (1.0 - ta)) / out_a;
        dst[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

/// Alpha-blend `overlay` over `base`.
///
/// The overlay is resized (Lanczos3) to the base dimensions when they differ.
pub fn composite(base: &RgbaImage, overlay: &RgbaImage) -> RgbaImage {
    let (w, h) = base.dimensions();
    let mut out = base.clone();
    if w == 0 || h == 0 {
        return out;
    }

    let overlay: Cow<'_, RgbaImage> = if overlay.dimensions() == (w, h) {
        Cow::Borrowed(overlay)
    } else {
        log_info!(
            "Resizing overlay {}x{} -> {}x{} before compositing",
            overlay.width(),
            overlay.height(),
            w,
            h
        );
        Cow::Owned(imageops::resize(overlay, w, h, FilterType::Lanczos3))
    };

    let row_len = w as usize * 4;
    let dst: &mut [u8] = &mut out;
    dst.par_chunks_mut(row_len)
        .zip(overlay.as_raw().par_chunks(row_len))
        .for_each(|(dst_row, src_row)| {
            for (d, s) in dst_row.chunks_exact_mut(4).zip(src_row.chunks_exact(4)) {
                blend_over(d, s);
            }
        });

    out
}

/// Composite `overlay` onto `original` at the original's resolution and write
/// it to `destination`. The format follows the destination extension; a path
/// without an extension gets `.png`. Returns the path actually written.
pub fn export(original: &RgbaImage, overlay: &RgbaImage, destination: &Path) -> Result<PathBuf> {
    export_with_quality(original, overlay, destination, crate::io::DEFAULT_JPEG_QUALITY)
}

/// [`export`] with an explicit JPEG quality (1-100). Ignored by lossless formats.
pub fn export_with_quality(
    original: &RgbaImage,
    overlay: &RgbaImage,
    destination: &Path,
    quality: u8,
) -> Result<PathBuf> {
    if original.width() == 0 || original.height() == 0 {
        return Err(WatermarkError::EmptyImage);
    }
    let path = with_default_extension(destination);
    let format = SaveFormat::from_path(&path).ok_or_else(|| {
        WatermarkError::UnsupportedFormat(
            path.extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_default(),
        )
    })?;

    let output = composite(original, overlay);
    encode_and_write(&output, &path, format, quality.clamp(1, 100))?;
    log_info!("Exported {}x{} image to {}", output.width(), output.height(), path.display());
    Ok(path)
}
