use std::path::PathBuf;

use image::{Rgba, RgbaImage};
use watermarker::WatermarkError;
use watermarker::ops::text::builtin_font;
use watermarker::ops::watermark::WatermarkSettings;
use watermarker::project::Project;

const PHOTO: [u8; 4] = [40, 60, 80, 255];

fn write_photo(dir: &std::path::Path, name: &str, w: u32, h: u32) -> PathBuf {
    let path = dir.join(name);
    let rgb = image::DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba(PHOTO))).to_rgb8();
    rgb.save(&path).unwrap();
    path
}

#[test]
fn copyright_watermark_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_photo(dir.path(), "photo.jpg", 800, 600);
    let font = builtin_font().unwrap();

    let mut project = Project::open(&input).unwrap();
    assert_eq!(project.base_size(), (640, 480));

    let settings = WatermarkSettings {
        text: "Copyright".into(),
        color: [255, 255, 255],
        opacity: 50,
        font_size: 24,
        anchor: (320.0, 240.0),
    };
    project.update_watermark(settings, &font);

    let written = project.export(&dir.path().join("out.png"), &font).unwrap();
    assert_eq!(written, dir.path().join("out.png"));

    let out = image::open(&written).unwrap().to_rgba8();
    assert_eq!(out.dimensions(), (800, 600));

    // Semi-transparent white text near the centre, never fully white.
    let mut lit = 0;
    for y in 260..340 {
        for x in 250..550 {
            let p = out.get_pixel(x, y).0;
            if p[0] > 110 {
                lit += 1;
            }
        }
    }
    assert!(lit > 50, "expected watermark pixels near the centre, found {lit}");
    assert!(out.pixels().all(|p| p.0[0] < 250));

    // Far corners are untouched photo pixels.
    let corner = out.get_pixel(5, 5).0;
    assert!(corner[0] < 60 && corner[2] > 60);
}

#[test]
fn plain_export_keeps_dimensions_in_every_format() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_photo(dir.path(), "small.png", 96, 64);
    let font = builtin_font().unwrap();

    for ext in ["png", "jpg", "bmp", "gif", "tiff"] {
        let mut project = Project::open(&input).unwrap();
        let written = project.export(&dir.path().join(format!("out.{ext}")), &font).unwrap();
        let reloaded = image::open(&written).unwrap();
        assert_eq!((reloaded.width(), reloaded.height()), (96, 64), "format {ext}");
    }
}

#[test]
fn destination_without_extension_becomes_png() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_photo(dir.path(), "a.png", 40, 30);
    let font = builtin_font().unwrap();

    let mut project = Project::open(&input).unwrap();
    let written = project.export(&dir.path().join("result"), &font).unwrap();
    assert_eq!(written.extension().unwrap(), "png");
    assert!(written.is_file());
}

#[test]
fn unwritable_destination_is_a_save_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_photo(dir.path(), "a.png", 40, 30);
    let font = builtin_font().unwrap();

    let mut project = Project::open(&input).unwrap();
    let dest = dir.path().join("missing").join("deeper").join("out.png");
    match project.export(&dest, &font) {
        Err(WatermarkError::Save { path, .. }) => assert_eq!(path, dest),
        other => panic!("expected a save error, got {other:?}"),
    }
}

#[test]
fn unknown_extension_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_photo(dir.path(), "a.png", 40, 30);
    let font = builtin_font().unwrap();

    let mut project = Project::open(&input).unwrap();
    let result = project.export(&dir.path().join("out.xyz"), &font);
    assert!(matches!(result, Err(WatermarkError::UnsupportedFormat(ext)) if ext == "xyz"));
}

#[test]
fn opening_non_image_fails_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.png");
    std::fs::write(&path, b"definitely not a png").unwrap();
    assert!(matches!(Project::open(&path), Err(WatermarkError::Load { .. })));
    assert!(matches!(
        Project::open(&dir.path().join("absent.jpg")),
        Err(WatermarkError::Load { .. })
    ));
}
