use image::codecs::bmp::BmpEncoder;
use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::tiff::TiffEncoder;
use image::{DynamicImage, ImageError, RgbaImage};
use rfd::FileDialog;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

pub use crate::components::dialogs::SaveFormat;
use crate::error::{Result, WatermarkError};

/// Extensions accepted by the open dialog and the CLI.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "tiff", "tif"];

/// JPEG quality used when the caller does not pick one.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

pub fn is_supported_extension(ext: &str) -> bool {
    SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str())
}

// ============================================================================
// LOADING
// ============================================================================

/// Load an image file as RGBA.
pub fn load_image(path: &Path) -> Result<RgbaImage> {
    if !path.is_file() {
        return Err(WatermarkError::Load {
            path: path.to_path_buf(),
            source: ImageError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "file does not exist",
            )),
        });
    }

    let img = image::open(path).map_err(|source| WatermarkError::Load {
        path: path.to_path_buf(),
        source,
    })?;
    let rgba = img.to_rgba8();
    if rgba.width() == 0 || rgba.height() == 0 {
        return Err(WatermarkError::EmptyImage);
    }
    log_info!("Loaded {} ({}x{})", path.display(), rgba.width(), rgba.height());
    Ok(rgba)
}

// ============================================================================
// SAVING
// ============================================================================

/// Append `.png` to a path that has no extension (or an empty one, `out.`).
pub fn with_default_extension(path: &Path) -> PathBuf {
    if path.extension().is_some_and(|e| !e.is_empty()) {
        path.to_path_buf()
    } else {
        path.with_extension(SaveFormat::Png.extension())
    }
}

/// Encode `image` in `format` and write it to `path`.
pub fn encode_and_write(image: &RgbaImage, path: &Path, format: SaveFormat, quality: u8) -> Result<()> {
    write_encoded(image, path, format, quality).map_err(|source| WatermarkError::Save {
        path: path.to_path_buf(),
        source,
    })
}

fn write_encoded(
    image: &RgbaImage,
    path: &Path,
    format: SaveFormat,
    quality: u8,
) -> std::result::Result<(), ImageError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    match format {
        SaveFormat::Png => {
            let encoder = PngEncoder::new(&mut writer);
            #[allow(deprecated)]
            encoder.encode(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ColorType::Rgba8,
            )?;
        }
        SaveFormat::Jpeg => {
            // No alpha channel in JPEG
            let rgb_image = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100));
            encoder.encode(
                rgb_image.as_raw(),
                rgb_image.width(),
                rgb_image.height(),
                image::ColorType::Rgb8,
            )?;
        }
        SaveFormat::Gif => {
            let mut encoder = GifEncoder::new(&mut writer);
            encoder.encode(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ColorType::Rgba8,
            )?;
        }
        SaveFormat::Bmp => {
            let mut encoder = BmpEncoder::new(&mut writer);
            encoder.encode(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ColorType::Rgba8,
            )?;
        }
        SaveFormat::Tiff => {
            let encoder = TiffEncoder::new(&mut writer);
            encoder.encode(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ColorType::Rgba8,
            )?;
        }
    }

    Ok(())
}

// ============================================================================
// FILE HANDLER
// ============================================================================

/// `~/Pictures` (or `%USERPROFILE%\Pictures`), when it can be determined.
pub fn pictures_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        if let Ok(profile) = std::env::var("USERPROFILE") {
            return Some(PathBuf::from(profile).join("Pictures"));
        }
    }
    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join("Pictures"))
}

/// Suggested output name for a watermarked copy of `source`.
pub fn default_save_name(source: &Path) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    format!("{}_watermarked.{}", stem, SaveFormat::Png.extension())
}

/// Native open/save dialogs plus the directories they start in.
#[derive(Default)]
pub struct FileHandler {
    /// Directory of the most recently opened image.
    pub last_open_dir: Option<PathBuf>,
    /// Directory of the most recent successful save.
    pub last_save_dir: Option<PathBuf>,
}

impl FileHandler {
    pub fn new(last_save_dir: Option<PathBuf>) -> Self {
        Self {
            last_open_dir: None,
            last_save_dir,
        }
    }

    /// Show the native open dialog.
    pub fn pick_image_path(&mut self) -> Option<PathBuf> {
        let mut dialog = FileDialog::new()
            .set_title("Select Image")
            .add_filter("Image Files", SUPPORTED_EXTENSIONS)
            .add_filter("All Files", &["*"]);
        if let Some(dir) = self.last_open_dir.as_ref().or(self.last_save_dir.as_ref()) {
            dialog = dialog.set_directory(dir);
        }
        let path = dialog.pick_file()?;
        self.last_open_dir = path.parent().map(Path::to_path_buf);
        Some(path)
    }

    /// Show the native save dialog. A chosen path without an extension gets `.png`.
    pub fn pick_save_path(&self, suggested_name: &str) -> Option<PathBuf> {
        let mut dialog = FileDialog::new()
            .set_title("Save Watermarked Image")
            .set_file_name(suggested_name)
            .add_filter("PNG files", &["png"])
            .add_filter("JPEG files", &["jpg", "jpeg"])
            .add_filter("All files", &["*"]);
        if let Some(dir) = self.last_save_dir.clone().or_else(pictures_dir) {
            dialog = dialog.set_directory(dir);
        }
        dialog.save_file().map(|p| with_default_extension(&p))
    }

    pub fn remember_save(&mut self, path: &Path) {
        self.last_save_dir = path.parent().map(Path::to_path_buf);
    }
}
