use ab_glyph::{Font, FontArc, GlyphId, ScaleFont, point};
use image::{Rgba, RgbaImage};
use std::path::Path;

use crate::error::{Result, WatermarkError};

/// Font files tried, in order, before asking the system font database.
const SYSTEM_FONT_PATHS: &[&str] = &[
    "C:/Windows/Fonts/arial.ttf",
    "C:/Windows/Fonts/segoeui.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Helvetica.ttc",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/arial.ttf",
];

/// Name of the proportional font bundled with egui, used as the last fallback.
const BUILTIN_FONT_NAME: &str = "Ubuntu-Light";

/// Integer pixel bounds of rendered text. `max_*` are exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelBounds {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl PixelBounds {
    pub fn width(&self) -> u32 {
        (self.max_x - self.min_x).max(0) as u32
    }

    pub fn height(&self) -> u32 {
        (self.max_y - self.min_y).max(0) as u32
    }

    fn union(self, other: PixelBounds) -> PixelBounds {
        PixelBounds {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    fn translate(self, dx: i32, dy: i32) -> PixelBounds {
        PixelBounds {
            min_x: self.min_x + dx,
            min_y: self.min_y + dy,
            max_x: self.max_x + dx,
            max_y: self.max_y + dy,
        }
    }
}

// ============================================================================
// FONT RESOLUTION
// ============================================================================

/// Load a TrueType/OpenType font file.
pub fn load_font_file(path: &Path) -> Result<FontArc> {
    let bytes = std::fs::read(path)?;
    FontArc::try_from_vec(bytes)
        .map_err(|e| WatermarkError::Font(format!("{}: {}", path.display(), e)))
}

/// The font bundled with egui. Always available, whatever is installed.
pub fn builtin_font() -> Result<FontArc> {
    let defs = egui::FontDefinitions::default();
    let data = defs.font_data.get(BUILTIN_FONT_NAME).ok_or_else(|| {
        WatermarkError::Font(format!("built-in font '{}' missing", BUILTIN_FONT_NAME))
    })?;
    FontArc::try_from_vec(data.font.to_vec())
        .map_err(|e| WatermarkError::Font(format!("built-in font: {}", e)))
}

/// Ask the platform font database for its default sans-serif face.
pub fn load_system_sans() -> Option<FontArc> {
    use font_kit::family_name::FamilyName;
    use font_kit::properties::Properties;
    use font_kit::source::SystemSource;

    let handle = SystemSource::new()
        .select_best_match(&[FamilyName::SansSerif], &Properties::new())
        .ok()?;
    let font = handle.load().ok()?;
    let bytes: Vec<u8> = (*font.copy_font_data()?).clone();
    FontArc::try_from_vec(bytes).ok()
}

/// Resolve the font used to draw watermarks.
///
/// Order: `preferred` file, well-known system font files, the system
/// sans-serif family, then the built-in font. Missing fonts are only logged.
pub fn load_watermark_font(preferred: Option<&Path>) -> Result<FontArc> {
    if let Some(path) = preferred {
        match load_font_file(path) {
            Ok(font) => return Ok(font),
            Err(e) => {
                log_warn!("Preferred font unavailable: {}", e);
            }
        }
    }

    for candidate in SYSTEM_FONT_PATHS {
        let path = Path::new(candidate);
        if !path.exists() {
            continue;
        }
        match load_font_file(path) {
            Ok(font) => {
                log_info!("Using font {}", path.display());
                return Ok(font);
            }
            Err(e) => {
                log_warn!("Skipping font {}: {}", path.display(), e);
            }
        }
    }

    if let Some(font) = load_system_sans() {
        log_info!("Using system sans-serif font");
        return Ok(font);
    }

    log_warn!("No system font found, using built-in font");
    builtin_font()
}

// ============================================================================
// LAYOUT
// ============================================================================

/// Lay out a single line of text starting at x = 0.
/// Returns glyph ids with their pen x positions, and the total advance width.
pub fn layout_line(font: &FontArc, text: &str, font_size: f32) -> (Vec<(GlyphId, f32)>, f32) {
    let scaled = font.as_scaled(font_size);
    let mut glyphs = Vec::with_capacity(text.len());
    let mut cursor_x = 0.0f32;
    let mut last_glyph: Option<GlyphId> = None;

    for ch in text.chars() {
        let glyph_id = font.glyph_id(ch);
        if let Some(prev) = last_glyph {
            cursor_x += scaled.kern(prev, glyph_id);
        }
        glyphs.push((glyph_id, cursor_x));
        cursor_x += scaled.h_advance(glyph_id);
        last_glyph = Some(glyph_id);
    }

    (glyphs, cursor_x)
}

/// Lay out (possibly multi-line) text. Lines are centred on the widest one;
/// each glyph gets its pen position with the baseline at `ascent + line * line_height`.
fn layout_block(font: &FontArc, text: &str, font_size: f32) -> Vec<(GlyphId, f32, f32)> {
    let scaled = font.as_scaled(font_size);
    let ascent = scaled.ascent();
    let line_height = scaled.height() + scaled.line_gap();

    let lines: Vec<(Vec<(GlyphId, f32)>, f32)> = text
        .split('\n')
        .map(|line| layout_line(font, line, font_size))
        .collect();
    let widest = lines.iter().map(|(_, w)| *w).fold(0.0f32, f32::max);

    let mut out = Vec::new();
    for (line_idx, (glyphs, width)) in lines.into_iter().enumerate() {
        let offset_x = (widest - width) * 0.5;
        let baseline = ascent + line_idx as f32 * line_height;
        out.extend(glyphs.into_iter().map(|(id, x)| (id, x + offset_x, baseline)));
    }
    out
}

/// Tight pixel bounds of the rendered text, laid out at the origin.
/// `None` when nothing visible would be drawn (empty or whitespace-only text).
pub fn text_pixel_bounds(font: &FontArc, text: &str, font_size: f32) -> Option<PixelBounds> {
    if font_size <= 0.0 {
        return None;
    }
    layout_block(font, text, font_size)
        .into_iter()
        .filter_map(|(id, x, y)| {
            let outlined = font.outline_glyph(id.with_scale_and_position(font_size, point(x, y)))?;
            let b = outlined.px_bounds();
            Some(PixelBounds {
                min_x: b.min.x.floor() as i32,
                min_y: b.min.y.floor() as i32,
                max_x: b.max.x.ceil() as i32,
                max_y: b.max.y.ceil() as i32,
            })
        })
        .reduce(PixelBounds::union)
}

// ============================================================================
// RASTERIZATION
// ============================================================================

/// Rasterize `text` into `target` so that its pixel bounding box starts at `top_left`.
///
/// Coverage is multiplied into `color[3]`; pixels outside the glyphs are left
/// untouched. Returns the drawn bounds in target coordinates.
pub fn draw_text(
    target: &mut RgbaImage,
    font: &FontArc,
    text: &str,
    font_size: f32,
    top_left: (i32, i32),
    color: [u8; 4],
) -> Option<PixelBounds> {
    let bounds = text_pixel_bounds(font, text, font_size)?;
    // Integer shift keeps every glyph's sub-pixel phase, so the coverage
    // lands exactly inside the measured bounds.
    let dx = top_left.0 - bounds.min_x;
    let dy = top_left.1 - bounds.min_y;
    let placed = bounds.translate(dx, dy);

    let buf_w = placed.width() as usize;
    let buf_h = placed.height() as usize;
    let mut coverage = vec![0.0f32; buf_w * buf_h];

    for (id, x, y) in layout_block(font, text, font_size) {
        let glyph = id.with_scale_and_position(font_size, point(x + dx as f32, y + dy as f32));
        let Some(outlined) = font.outline_glyph(glyph) else { continue };
        let pb = outlined.px_bounds();
        let gx0 = pb.min.x.floor() as i32 - placed.min_x;
        let gy0 = pb.min.y.floor() as i32 - placed.min_y;
        outlined.draw(|px, py, cov| {
            let cx = gx0 + px as i32;
            let cy = gy0 + py as i32;
            if cx >= 0 && cy >= 0 && (cx as usize) < buf_w && (cy as usize) < buf_h {
                let idx = cy as usize * buf_w + cx as usize;
                coverage[idx] = coverage[idx].max(cov.clamp(0.0, 1.0));
            }
        });
    }

    let (tw, th) = (target.width() as i32, target.height() as i32);
    for (i, &cov) in coverage.iter().enumerate() {
        if cov <= 0.001 {
            continue;
        }
        let tx = placed.min_x + (i % buf_w) as i32;
        let ty = placed.min_y + (i / buf_w) as i32;
        if tx < 0 || ty < 0 || tx >= tw || ty >= th {
            continue;
        }
        let a = (color[3] as f32 * cov).round().min(255.0) as u8;
        if a > 0 {
            target.put_pixel(tx as u32, ty as u32, Rgba([color[0], color[1], color[2], a]));
        }
    }

    Some(placed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_font_always_loads() {
        assert!(builtin_font().is_ok());
    }

    #[test]
    fn missing_preferred_font_falls_back() {
        let font = load_watermark_font(Some(Path::new("/no/such/font.ttf"))).unwrap();
        assert!(text_pixel_bounds(&font, "Mark", 24.0).is_some());
    }

    #[test]
    fn bounds_grow_with_font_size() {
        let font = builtin_font().unwrap();
        let small = text_pixel_bounds(&font, "Watermark", 12.0).unwrap();
        let large = text_pixel_bounds(&font, "Watermark", 72.0).unwrap();
        assert!(large.width() > small.width());
        assert!(large.height() > small.height());
    }

    #[test]
    fn whitespace_has_no_bounds() {
        let font = builtin_font().unwrap();
        assert!(text_pixel_bounds(&font, "", 24.0).is_none());
        assert!(text_pixel_bounds(&font, "   ", 24.0).is_none());
    }

    #[test]
    fn multiline_text_is_taller_than_one_line() {
        let font = builtin_font().unwrap();
        let one = text_pixel_bounds(&font, "Copy", 24.0).unwrap();
        let two = text_pixel_bounds(&font, "Copy\nright", 24.0).unwrap();
        assert!(two.height() > one.height());
    }

    #[test]
    fn draw_text_stays_inside_reported_bounds() {
        let font = builtin_font().unwrap();
        let mut img = RgbaImage::new(200, 100);
        let placed = draw_text(&mut img, &font, "Hg", 40.0, (30, 20), [255, 0, 0, 255]).unwrap();
        assert_eq!((placed.min_x, placed.min_y), (30, 20));

        let mut painted = 0;
        for (x, y, p) in img.enumerate_pixels() {
            if p[3] > 0 {
                painted += 1;
                assert!((x as i32) >= placed.min_x && (x as i32) < placed.max_x);
                assert!((y as i32) >= placed.min_y && (y as i32) < placed.max_y);
                assert_eq!([p[0], p[1], p[2]], [255, 0, 0]);
            }
        }
        assert!(painted > 0);
    }

    #[test]
    fn layout_advances_left_to_right() {
        let font = builtin_font().unwrap();
        let (glyphs, width) = layout_line(&font, "abc", 20.0);
        assert_eq!(glyphs.len(), 3);
        assert!(glyphs[0].1 < glyphs[1].1 && glyphs[1].1 < glyphs[2].1);
        assert!(width > glyphs[2].1);
    }
}
