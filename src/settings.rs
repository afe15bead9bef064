use eframe::egui::Color32;
use std::path::{Path, PathBuf};

/// Canvas background in dark mode.
pub const BG_COLOR_DARK: Color32 = Color32::from_rgb(0x2b, 0x2b, 0x2b);
/// Canvas background in light mode.
pub const BG_COLOR_LIGHT: Color32 = Color32::from_rgb(0xFF, 0xFF, 0xFF);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ThemeMode {
    #[default]
    Dark,
    Light,
}

impl ThemeMode {
    pub fn canvas_background(&self) -> Color32 {
        match self {
            ThemeMode::Dark => BG_COLOR_DARK,
            ThemeMode::Light => BG_COLOR_LIGHT,
        }
    }

    pub fn visuals(&self) -> eframe::egui::Visuals {
        match self {
            ThemeMode::Dark => eframe::egui::Visuals::dark(),
            ThemeMode::Light => eframe::egui::Visuals::light(),
        }
    }
}

/// Process-wide configuration. Only `theme_mode` and `last_save_dir` are
/// written to disk; `last_selected_file` lives for the session.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AppSettings {
    pub theme_mode: ThemeMode,
    pub last_save_dir: Option<PathBuf>,
    pub last_selected_file: Option<PathBuf>,
}

impl AppSettings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/watermarker/watermarker_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\Watermarker\watermarker_settings.cfg
    /// On macOS:   ~/Library/Application Support/Watermarker/watermarker_settings.cfg
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA")
                .or_else(|_| std::env::var("USERPROFILE"))
                .ok()?;
            return Some(PathBuf::from(appdata).join("Watermarker").join("watermarker_settings.cfg"));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").ok()?;
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("Watermarker")
                    .join("watermarker_settings.cfg"),
            );
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .or_else(|_| std::env::var("HOME").map(|home| PathBuf::from(home).join(".config")))
                .ok()?;
            Some(config_dir.join("watermarker").join("watermarker_settings.cfg"))
        }
    }

    /// Load settings from the default location (defaults if missing or unreadable).
    pub fn load() -> Self {
        match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn save(&self) {
        if let Some(path) = Self::settings_path()
            && let Err(e) = self.save_to(&path)
        {
            log_warn!("Could not write settings {}: {}", path.display(), e);
        }
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_config())
    }

    /// Parse `key=value` lines. Unknown keys and malformed lines are skipped.
    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let Some((key, val)) = line.split_once('=') else { continue };
            let val = val.trim();
            match key.trim() {
                "theme_mode" => {
                    s.theme_mode = match val {
                        "light" => ThemeMode::Light,
                        _ => ThemeMode::Dark,
                    };
                }
                "last_save_dir" if !val.is_empty() => {
                    s.last_save_dir = Some(PathBuf::from(val));
                }
                _ => {}
            }
        }
        s
    }

    pub fn to_config(&self) -> String {
        let mode_str = match self.theme_mode {
            ThemeMode::Dark => "dark",
            ThemeMode::Light => "light",
        };
        let save_dir = self
            .last_save_dir
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        format!("theme_mode={mode_str}\nlast_save_dir={save_dir}\n")
    }
}
