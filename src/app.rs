use ab_glyph::FontArc;
use eframe::egui;
use std::path::PathBuf;

use crate::canvas::Canvas;
use crate::components::dialogs::{show_error, show_info, show_warning};
use crate::components::watermark_panel::WatermarkPanel;
use crate::error::WatermarkError;
use crate::io::{FileHandler, default_save_name};
use crate::ops::text::load_watermark_font;
use crate::ops::watermark::WatermarkSettings;
use crate::project::Project;
use crate::settings::AppSettings;

pub struct WatermarkerApp {
    project: Option<Project>,
    canvas: Canvas,
    panel: WatermarkPanel,
    settings: AppSettings,
    file_handler: FileHandler,
    /// `None` only when no font at all could be loaded; watermarking is then unavailable.
    font: Option<FontArc>,
    /// Preview texture needs re-uploading.
    preview_dirty: bool,
}

impl WatermarkerApp {
    pub fn new(cc: &eframe::CreationContext<'_>, settings: AppSettings) -> Self {
        cc.egui_ctx.set_visuals(settings.theme_mode.visuals());

        let font = match load_watermark_font(None) {
            Ok(f) => Some(f),
            Err(e) => {
                log_err!("No usable watermark font: {}", e);
                None
            }
        };

        Self {
            project: None,
            canvas: Canvas::new(),
            panel: WatermarkPanel::new(),
            file_handler: FileHandler::new(settings.last_save_dir.clone()),
            settings,
            font,
            preview_dirty: false,
        }
    }

    // ========================================================================
    // ACTIONS
    // ========================================================================

    fn open_image(&mut self) {
        let Some(path) = self.file_handler.pick_image_path() else {
            return;
        };
        self.open_image_path(path);
    }

    fn open_image_path(&mut self, path: PathBuf) {
        match Project::open(&path) {
            Ok(project) => {
                log_info!(
                    "Opened {} as session {} ({}x{}, preview {}x{})",
                    path.display(),
                    project.id,
                    project.original.width(),
                    project.original.height(),
                    project.base.width(),
                    project.base.height()
                );
                self.settings.last_selected_file = Some(path);
                self.project = Some(project);
                self.panel.open = false;
                self.canvas.reset_zoom();
                self.preview_dirty = true;
            }
            Err(e) => {
                log_warn!("Open failed: {}", e);
                show_warning("Invalid File", "Please select a valid image file.");
            }
        }
    }

    fn add_watermark(&mut self) {
        let Some(project) = self.project.as_mut() else {
            show_warning("No Image", "Please select an image first.");
            return;
        };
        let Some(font) = self.font.as_ref() else {
            show_error("Error", "No font is available to draw the watermark.");
            return;
        };

        self.canvas.reset_zoom();
        project.add_watermark(font);
        if let Some(settings) = &project.watermark {
            self.panel.open_with(settings);
        }
        self.preview_dirty = true;
    }

    fn update_watermark(&mut self, settings: WatermarkSettings) {
        if let (Some(project), Some(font)) = (self.project.as_mut(), self.font.as_ref()) {
            project.update_watermark(settings, font);
            self.preview_dirty = true;
        }
    }

    fn remove_watermark(&mut self) {
        if let Some(project) = self.project.as_mut() {
            project.remove_watermark();
            self.preview_dirty = true;
        }
    }

    fn save_image(&mut self) {
        let Some(project) = self.project.as_mut() else {
            show_warning("No Image", "Please select an image first.");
            return;
        };
        if !project.has_watermark() {
            show_warning("No Watermark", "Please add a watermark first.");
            return;
        }
        let Some(font) = self.font.as_ref() else {
            return;
        };

        let Some(destination) = self.file_handler.pick_save_path(&default_save_name(&project.path)) else {
            return;
        };

        match project.export(&destination, font) {
            Ok(written) => {
                self.file_handler.remember_save(&written);
                self.settings.last_save_dir = self.file_handler.last_save_dir.clone();
                self.settings.save();
                show_info("Success", &format!("Image saved successfully to:\n{}", written.display()));
            }
            Err(WatermarkError::UnsupportedFormat(ext)) => {
                show_error("Error", &format!("Cannot save images as '.{}'. Use PNG or JPEG.", ext));
            }
            Err(e) => {
                show_error("Error", &format!("Failed to save image: {}", e));
            }
        }
    }

    // ========================================================================
    // UI
    // ========================================================================

    fn toolbar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                if ui.button("Open Image…").clicked() {
                    self.open_image();
                }
                if ui.button("Add Watermark").clicked() {
                    self.add_watermark();
                }
                if ui.button("Save Image…").clicked() {
                    self.save_image();
                }
                ui.separator();
                ui.label(self.canvas.zoom_label());
                if let Some(project) = &self.project {
                    ui.separator();
                    ui.label(&project.name);
                }
            });
            ui.add_space(4.0);
        });
    }

    fn refresh_preview(&mut self, ctx: &egui::Context) {
        if !self.preview_dirty {
            return;
        }
        self.preview_dirty = false;
        match &self.project {
            Some(project) => self.canvas.set_image(ctx, &project.preview()),
            None => self.canvas.clear_image(),
        }
    }
}

impl eframe::App for WatermarkerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // --- Dynamic window title: "Watermarker - <file name>[*]" ---
        let title = match &self.project {
            Some(project) => format!("Watermarker - {}", project.display_title()),
            None => "Watermarker".to_string(),
        };
        ctx.send_viewport_cmd(egui::ViewportCommand::Title(title));

        self.toolbar(ctx);

        // --- Floating watermark panel ---
        if let Some(settings) = self.project.as_ref().and_then(|p| p.watermark.clone()) {
            let response = self.panel.show(ctx, &settings);
            if let Some(next) = response.changed {
                self.update_watermark(next);
            }
            if response.save_clicked {
                self.save_image();
            }
            if response.closed {
                self.remove_watermark();
            }
        }

        self.refresh_preview(ctx);

        // --- Canvas ---
        let background = self.settings.theme_mode.canvas_background();
        let anchor = self.project.as_ref().and_then(|p| p.watermark.as_ref()).map(|w| w.anchor);
        let zoom_locked = self.panel.open;
        let response = egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(background))
            .show(ctx, |ui| self.canvas.show(ui, anchor, zoom_locked, background))
            .inner;

        if let Some(new_anchor) = response.anchor_moved
            && let Some(mut settings) = self.project.as_ref().and_then(|p| p.watermark.clone())
        {
            settings.anchor = new_anchor;
            self.update_watermark(settings);
        }
        if response.zoom_changed {
            log_info!("{}", self.canvas.zoom_label());
        }
        if self.preview_dirty {
            ctx.request_repaint();
        }
    }
}
