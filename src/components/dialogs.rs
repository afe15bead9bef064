use rfd::{MessageButtons, MessageDialog, MessageLevel};
use std::path::Path;

/// Raster formats the exporter can write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SaveFormat {
    #[default]
    Png,
    Jpeg,
    Gif,
    Bmp,
    Tiff,
}

impl SaveFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            SaveFormat::Png => "png",
            SaveFormat::Jpeg => "jpg",
            SaveFormat::Gif => "gif",
            SaveFormat::Bmp => "bmp",
            SaveFormat::Tiff => "tiff",
        }
    }

    /// Parse a format name or file extension (`"jpg"`, `"TIFF"`, ...).
    pub fn from_extension(ext: &str) -> Option<SaveFormat> {
        match ext.to_lowercase().as_str() {
            "png" => Some(SaveFormat::Png),
            "jpg" | "jpeg" => Some(SaveFormat::Jpeg),
            "gif" => Some(SaveFormat::Gif),
            "bmp" => Some(SaveFormat::Bmp),
            "tiff" | "tif" => Some(SaveFormat::Tiff),
            _ => None,
        }
    }

    /// Format implied by the path's extension.
    pub fn from_path(path: &Path) -> Option<SaveFormat> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(SaveFormat::from_extension)
    }

    pub fn all() -> &'static [SaveFormat] {
        &[
            SaveFormat::Png,
            SaveFormat::Jpeg,
            SaveFormat::Gif,
            SaveFormat::Bmp,
            SaveFormat::Tiff,
        ]
    }
}

// ============================================================================
// MESSAGE BOXES
// ============================================================================

fn show_message(level: MessageLevel, title: &str, description: &str) {
    let _ = MessageDialog::new()
        .set_level(level)
        .set_title(title)
        .set_description(description)
        .set_buttons(MessageButtons::Ok)
        .show();
}

pub fn show_info(title: &str, description: &str) {
    log_info!("{}: {}", title, description);
    show_message(MessageLevel::Info, title, description);
}

pub fn show_warning(title: &str, description: &str) {
    log_warn!("{}: {}", title, description);
    show_message(MessageLevel::Warning, title, description);
}

pub fn show_error(title: &str, description: &str) {
    log_err!("{}: {}", title, description);
    show_message(MessageLevel::Error, title, description);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_path() {
        assert_eq!(SaveFormat::from_path(Path::new("a/b.JPEG")), Some(SaveFormat::Jpeg));
        assert_eq!(SaveFormat::from_path(Path::new("scan.tif")), Some(SaveFormat::Tiff));
        assert_eq!(SaveFormat::from_path(Path::new("noext")), None);
        assert_eq!(SaveFormat::from_path(Path::new("x.webp")), None);
    }

    #[test]
    fn extension_round_trips_through_parser() {
        for format in SaveFormat::all() {
            assert_eq!(SaveFormat::from_extension(format.extension()), Some(*format));
        }
    }
}
