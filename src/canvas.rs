use eframe::egui::{self, Color32, CursorIcon, Pos2, Rect, Sense, TextureHandle, TextureOptions, Vec2, pos2, vec2};
use image::RgbaImage;

/// Fixed preview canvas the loaded image is fitted into.
pub const PREVIEW_WIDTH: u32 = 800;
pub const PREVIEW_HEIGHT: u32 = 480;

pub const MIN_ZOOM: f32 = 0.5;
pub const MAX_ZOOM: f32 = 2.0;
/// Zoom factor per wheel notch.
pub const ZOOM_IN_STEP: f32 = 1.1;
pub const ZOOM_OUT_STEP: f32 = 0.9;

/// A press within this many screen pixels of the watermark anchor grabs the watermark.
pub const WATERMARK_GRAB_RADIUS: f32 = 50.0;

/// Resize `width × height` to fit inside `canvas_w × canvas_h`, keeping aspect ratio.
/// Wide images fill the canvas width, tall ones its height.
pub fn fit_to_canvas(width: u32, height: u32, canvas_w: u32, canvas_h: u32) -> (u32, u32) {
    if width == 0 || height == 0 || canvas_w == 0 || canvas_h == 0 {
        return (width.max(1), height.max(1));
    }
    let canvas_ratio = canvas_w as f32 / canvas_h as f32;
    let img_ratio = width as f32 / height as f32;
    if img_ratio > canvas_ratio {
        (canvas_w, ((canvas_w as f32 / img_ratio) as u32).max(1))
    } else {
        (((canvas_h as f32 * img_ratio) as u32).max(1), canvas_h)
    }
}

/// Move a watermark anchor by a screen-space drag delta and keep it on the image.
pub fn drag_anchor(anchor: (f32, f32), screen_delta: Vec2, zoom: f32, image_size: (u32, u32)) -> (f32, f32) {
    let zoom = zoom.max(f32::EPSILON);
    (
        (anchor.0 + screen_delta.x / zoom).clamp(0.0, image_size.0 as f32),
        (anchor.1 + screen_delta.y / zoom).clamp(0.0, image_size.1 as f32),
    )
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DragMode {
    None,
    Pan,
    Watermark,
}

/// What happened on the canvas during one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CanvasResponse {
    /// New watermark anchor (base-image coordinates) after a drag.
    pub anchor_moved: Option<(f32, f32)>,
    pub zoom_changed: bool,
}

/// Preview viewport: zoom, pan and the uploaded preview texture.
pub struct Canvas {
    pub zoom: f32,
    pan_offset: Vec2,
    drag: DragMode,
    texture: Option<TextureHandle>,
    /// Pixel size of the image behind `texture`.
    image_size: (u32, u32),
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

impl Canvas {
    pub fn new() -> Self {
        Self {
            zoom: 1.0,
            pan_offset: Vec2::ZERO,
            drag: DragMode::None,
            texture: None,
            image_size: (0, 0),
        }
    }

    pub fn reset_zoom(&mut self) {
        self.zoom = 1.0;
        self.pan_offset = Vec2::ZERO;
    }

    /// Multiply the zoom by `factor`, clamped to `[MIN_ZOOM, MAX_ZOOM]`.
    /// Returns false when the zoom is already at the bound.
    pub fn apply_zoom(&mut self, factor: f32) -> bool {
        let new_zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        if (new_zoom - self.zoom).abs() <= f32::EPSILON {
            return false;
        }
        self.zoom = new_zoom;
        true
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        self.pan_offset += delta;
    }

    pub fn pan_offset(&self) -> Vec2 {
        self.pan_offset
    }

    pub fn zoom_label(&self) -> String {
        format!("Zoom: {}%", (self.zoom * 100.0).round() as i32)
    }

    /// Screen rectangle covered by an image of `image_size` pixels.
    pub fn image_rect(&self, canvas_rect: Rect, image_size: (u32, u32)) -> Rect {
        Rect::from_center_size(
            canvas_rect.center() + self.pan_offset,
            vec2(image_size.0 as f32 * self.zoom, image_size.1 as f32 * self.zoom),
        )
    }

    pub fn screen_to_image(&self, screen_pos: Pos2, image_rect: Rect) -> Pos2 {
        pos2(
            (screen_pos.x - image_rect.min.x) / self.zoom,
            (screen_pos.y - image_rect.min.y) / self.zoom,
        )
    }

    pub fn image_to_screen(&self, image_pos: (f32, f32), image_rect: Rect) -> Pos2 {
        pos2(
            image_rect.min.x + image_pos.0 * self.zoom,
            image_rect.min.y + image_pos.1 * self.zoom,
        )
    }

    /// True when `pointer` is close enough to the watermark anchor to grab it.
    pub fn hits_watermark(&self, pointer: Pos2, anchor: (f32, f32), image_rect: Rect) -> bool {
        let anchor_screen = self.image_to_screen(anchor, image_rect);
        (pointer.x - anchor_screen.x).abs() < WATERMARK_GRAB_RADIUS
            && (pointer.y - anchor_screen.y).abs() < WATERMARK_GRAB_RADIUS
    }

    /// Upload (or replace) the preview texture.
    pub fn set_image(&mut self, ctx: &egui::Context, image: &RgbaImage) {
        let size = [image.width() as usize, image.height() as usize];
        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, image.as_raw());
        match &mut self.texture {
            Some(texture) => texture.set(color_image, TextureOptions::LINEAR),
            None => {
                self.texture = Some(ctx.load_texture("watermark-preview", color_image, TextureOptions::LINEAR));
            }
        }
        self.image_size = image.dimensions();
    }

    pub fn clear_image(&mut self) {
        self.texture = None;
        self.image_size = (0, 0);
        self.drag = DragMode::None;
    }

    /// Draw the preview and handle wheel zoom, panning and watermark dragging.
    ///
    /// `watermark_anchor` is `Some` while a watermark is being edited; zoom is
    /// ignored while `zoom_locked` is set.
    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        watermark_anchor: Option<(f32, f32)>,
        zoom_locked: bool,
        background: Color32,
    ) -> CanvasResponse {
        let mut out = CanvasResponse::default();
        let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
        let canvas_rect = response.rect;
        painter.rect_filled(canvas_rect, 0.0, background);

        let Some(texture) = self.texture.as_ref().map(|t| t.id()) else {
            return out;
        };

        // -- Wheel zoom --------------------------------------------------
        if response.hovered() && !zoom_locked {
            let scroll: f32 = ui.input(|i| {
                i.events
                    .iter()
                    .filter_map(|e| match e {
                        egui::Event::Scroll(delta) => Some(delta.y),
                        _ => None,
                    })
                    .sum()
            });
            if scroll > 0.0 {
                out.zoom_changed = self.apply_zoom(ZOOM_IN_STEP);
            } else if scroll < 0.0 {
                out.zoom_changed = self.apply_zoom(ZOOM_OUT_STEP);
            }
        }

        // -- Drag: watermark if the press started on it, otherwise pan ---
        let image_rect = self.image_rect(canvas_rect, self.image_size);
        if response.drag_started() {
            let press = ui
                .input(|i| i.pointer.press_origin())
                .or_else(|| response.interact_pointer_pos());
            self.drag = match (watermark_anchor, press) {
                (Some(anchor), Some(pos)) if self.hits_watermark(pos, anchor, image_rect) => DragMode::Watermark,
                _ => DragMode::Pan,
            };
        }
        if response.dragged() {
            let delta = response.drag_delta();
            match (self.drag, watermark_anchor) {
                (DragMode::Pan, _) => self.pan_by(delta),
                (DragMode::Watermark, Some(anchor)) => {
                    out.anchor_moved = Some(drag_anchor(anchor, delta, self.zoom, self.image_size));
                }
                _ => {}
            }
        }
        if response.drag_released() {
            self.drag = DragMode::None;
        }

        if self.drag != DragMode::None {
            ui.ctx().set_cursor_icon(CursorIcon::Grabbing);
        } else if response.hovered() {
            ui.ctx().set_cursor_icon(CursorIcon::Grab);
        }

        // Pan may have moved the image this frame
        let image_rect = self.image_rect(canvas_rect, self.image_size);
        painter.with_clip_rect(canvas_rect).image(
            texture,
            image_rect,
            Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0)),
            Color32::WHITE,
        );

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_keeps_aspect_ratio() {
        assert_eq!(fit_to_canvas(800, 600, PREVIEW_WIDTH, PREVIEW_HEIGHT), (640, 480));
        assert_eq!(fit_to_canvas(1600, 400, PREVIEW_WIDTH, PREVIEW_HEIGHT), (800, 200));
        assert_eq!(fit_to_canvas(300, 900, PREVIEW_WIDTH, PREVIEW_HEIGHT), (160, 480));
        assert_eq!(fit_to_canvas(120, 60, PREVIEW_WIDTH, PREVIEW_HEIGHT), (800, 400));
    }

    #[test]
    fn zoom_in_stops_at_upper_bound() {
        let mut canvas = Canvas::new();
        for _ in 0..20 {
            canvas.apply_zoom(ZOOM_IN_STEP);
        }
        assert_eq!(canvas.zoom, MAX_ZOOM);
        assert!(!canvas.apply_zoom(ZOOM_IN_STEP));
        assert_eq!(canvas.zoom, MAX_ZOOM);
        assert_eq!(canvas.zoom_label(), "Zoom: 200%");
    }

    #[test]
    fn zoom_out_stops_at_lower_bound() {
        let mut canvas = Canvas::new();
        for _ in 0..20 {
            canvas.apply_zoom(ZOOM_OUT_STEP);
        }
        assert_eq!(canvas.zoom, MIN_ZOOM);
        assert!(!canvas.apply_zoom(ZOOM_OUT_STEP));
    }

    #[test]
    fn reset_clears_zoom_and_pan() {
        let mut canvas = Canvas::new();
        canvas.apply_zoom(ZOOM_IN_STEP);
        canvas.pan_by(vec2(30.0, -10.0));
        canvas.reset_zoom();
        assert_eq!(canvas.zoom, 1.0);
        assert_eq!(canvas.pan_offset(), Vec2::ZERO);
    }

    #[test]
    fn image_rect_follows_pan_and_zoom() {
        let mut canvas = Canvas::new();
        let viewport = Rect::from_min_size(Pos2::ZERO, vec2(800.0, 480.0));
        let rect = canvas.image_rect(viewport, (640, 480));
        assert_eq!(rect.min, pos2(80.0, 0.0));

        canvas.pan_by(vec2(10.0, 20.0));
        canvas.zoom = 0.5;
        let rect = canvas.image_rect(viewport, (640, 480));
        assert_eq!(rect.center(), pos2(410.0, 260.0));
        assert_eq!(rect.width(), 320.0);
    }

    #[test]
    fn screen_and_image_coordinates_round_trip() {
        let mut canvas = Canvas::new();
        canvas.zoom = 2.0;
        let viewport = Rect::from_min_size(Pos2::ZERO, vec2(800.0, 480.0));
        let rect = canvas.image_rect(viewport, (200, 100));
        let screen = canvas.image_to_screen((25.0, 40.0), rect);
        let back = canvas.screen_to_image(screen, rect);
        assert!((back.x - 25.0).abs() < 1e-4 && (back.y - 40.0).abs() < 1e-4);
    }

    #[test]
    fn watermark_grab_radius() {
        let canvas = Canvas::new();
        let rect = Rect::from_min_size(Pos2::ZERO, vec2(640.0, 480.0));
        assert!(canvas.hits_watermark(pos2(320.0 + 49.0, 240.0 - 49.0), (320.0, 240.0), rect));
        assert!(!canvas.hits_watermark(pos2(320.0 + 51.0, 240.0), (320.0, 240.0), rect));
    }

    #[test]
    fn dragged_anchor_is_scaled_and_clamped() {
        assert_eq!(drag_anchor((100.0, 100.0), vec2(20.0, -40.0), 2.0, (640, 480)), (110.0, 80.0));
        assert_eq!(drag_anchor((630.0, 5.0), vec2(500.0, -500.0), 1.0, (640, 480)), (640.0, 0.0));
    }
}
