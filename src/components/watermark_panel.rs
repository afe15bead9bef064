use eframe::egui;

use crate::ops::watermark::{FontSizeEntry, WatermarkSettings, color_or_default, parse_font_size};

/// Font size entry box. Keeps the last valid value so bad input can be reverted.
pub struct FontSizeField {
    pub text: String,
    value: u32,
}

impl FontSizeField {
    pub fn new(value: u32) -> Self {
        Self {
            text: value.to_string(),
            value,
        }
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    /// Validate the typed text. Out-of-range numbers are clamped and written
    /// back; non-numbers revert to the previous value. Returns true when the
    /// effective size changed.
    pub fn commit(&mut self) -> bool {
        match parse_font_size(&self.text, self.value) {
            FontSizeEntry::Empty => false,
            FontSizeEntry::Accepted { size, clamped } => {
                if clamped {
                    log_info!("Font size {} clamped to {}", self.text.trim(), size);
                }
                self.text = size.to_string();
                let changed = size != self.value;
                self.value = size;
                changed
            }
            FontSizeEntry::Rejected { previous } => {
                log_warn!("Rejected font size '{}'", self.text);
                self.text = previous.to_string();
                false
            }
        }
    }
}

#[derive(Default)]
pub struct PanelResponse {
    /// Settings after an edit; regenerate the overlay from these.
    pub changed: Option<WatermarkSettings>,
    pub save_clicked: bool,
    pub closed: bool,
}

/// Floating watermark control panel: opacity, font size, text, color, save.
pub struct WatermarkPanel {
    pub open: bool,
    text: String,
    color: String,
    size: FontSizeField,
}

impl Default for WatermarkPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl WatermarkPanel {
    pub fn new() -> Self {
        let defaults = WatermarkSettings::centered(0, 0);
        Self {
            open: false,
            text: defaults.text.clone(),
            color: defaults.color_hex(),
            size: FontSizeField::new(defaults.font_size),
        }
    }

    /// Open the panel with fields mirroring `settings`.
    pub fn open_with(&mut self, settings: &WatermarkSettings) {
        self.open = true;
        self.text = settings.text.clone();
        self.color = settings.color_hex();
        self.size = FontSizeField::new(settings.font_size);
    }

    pub fn show(&mut self, ctx: &egui::Context, settings: &WatermarkSettings) -> PanelResponse {
        let mut response = PanelResponse::default();
        if !self.open {
            return response;
        }

        let mut next = settings.clone();
        let mut edited = false;
        let mut open = self.open;

        egui::Window::new("Watermark")
            .id(egui::Id::new("watermark_panel"))
            .collapsible(false)
            .resizable(false)
            .default_pos(egui::pos2(20.0, 60.0))
            .default_width(180.0)
            .open(&mut open)
            .show(ctx, |ui| {
                ui.label("Watermark Opacity");
                if ui.add(egui::Slider::new(&mut next.opacity, 0..=100)).changed() {
                    edited = true;
                }
                ui.add_space(6.0);

                ui.label("Font Size");
                let size_resp = ui.add(egui::TextEdit::singleline(&mut self.size.text).desired_width(150.0));
                if size_resp.lost_focus() && self.size.commit() {
                    next.font_size = self.size.value();
                    edited = true;
                }
                ui.add_space(6.0);

                ui.label("Watermark Text");
                let text_resp = ui.add(egui::TextEdit::singleline(&mut self.text).desired_width(150.0));
                if text_resp.lost_focus() && self.text != next.text {
                    next.text = self.text.clone();
                    edited = true;
                }
                ui.add_space(6.0);

                ui.label("Watermark Color");
                let color_resp = ui.add(egui::TextEdit::singleline(&mut self.color).desired_width(150.0));
                if color_resp.lost_focus() {
                    let color = color_or_default(&self.color);
                    if color != next.color {
                        next.color = color;
                        edited = true;
                    }
                    self.color = next.color_hex();
                }
                ui.add_space(10.0);

                let save = egui::Button::new(egui::RichText::new("Save Image").color(egui::Color32::WHITE))
                    .fill(egui::Color32::from_rgb(0x4C, 0xAF, 0x50));
                if ui.add_sized([150.0, 28.0], save).clicked() {
                    response.save_clicked = true;
                }
            });

        if edited {
            response.changed = Some(next);
        }
        if !open {
            self.open = false;
            response.closed = true;
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_sizes_clamp_up() {
        let mut field = FontSizeField::new(36);
        field.text = "5".into();
        assert!(field.commit());
        assert_eq!(field.value(), 12);
        assert_eq!(field.text, "12");
    }

    #[test]
    fn large_sizes_clamp_down() {
        let mut field = FontSizeField::new(36);
        field.text = "500".into();
        assert!(field.commit());
        assert_eq!(field.value(), 72);
        assert_eq!(field.text, "72");
    }

    #[test]
    fn non_numeric_reverts_field() {
        let mut field = FontSizeField::new(24);
        field.text = "abc".into();
        assert!(!field.commit());
        assert_eq!(field.value(), 24);
        assert_eq!(field.text, "24");
    }

    #[test]
    fn empty_entry_is_left_alone() {
        let mut field = FontSizeField::new(24);
        field.text = "  ".into();
        assert!(!field.commit());
        assert_eq!(field.value(), 24);
        assert_eq!(field.text, "  ");
    }

    #[test]
    fn open_with_mirrors_settings() {
        let mut panel = WatermarkPanel::new();
        let settings = WatermarkSettings {
            text: "Copyright".into(),
            color: [0x12, 0xAB, 0xEF],
            opacity: 50,
            font_size: 24,
            anchor: (1.0, 2.0),
        };
        panel.open_with(&settings);
        assert!(panel.open);
        assert_eq!(panel.text, "Copyright");
        assert_eq!(panel.color, "#12ABEF");
        assert_eq!(panel.size.value(), 24);
    }
}
