// ============================================================================
// Watermarker CLI — headless batch watermarking via command-line arguments
// ============================================================================
//
// Usage examples:
//   watermarker -i photo.jpg -o out.png --text Copyright --opacity 50 --font-size 24
//   watermarker -i *.jpg --output-dir marked/ --text "© 2024" --x 0.9 --y 0.9
//   watermarker -i scan.tiff --format png                 (plain re-export)
//
// No GUI is opened in CLI mode. Each file is fitted to the preview canvas so
// font size and placement mean exactly what they mean in the GUI, then the
// watermark is rendered again at the original resolution for export.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use ab_glyph::FontArc;
use clap::Parser;

use crate::io::{SaveFormat, is_supported_extension};
use crate::ops::text::load_watermark_font;
use crate::ops::watermark::{DEFAULT_COLOR, DEFAULT_FONT_SIZE, WatermarkSettings, parse_hex_color};
use crate::project::Project;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// Watermarker headless image processor.
#[derive(Parser, Debug)]
#[command(
    name = "watermarker",
    about = "Watermarker headless batch watermarking",
    long_about = "Stamp a text watermark onto image files without opening the GUI.\n\
                  Supports PNG, JPEG, GIF, BMP and TIFF.\n\n\
                  Example:\n  \
                  watermarker -i photo.jpg -o out.png --text Copyright --opacity 50\n  \
                  watermarker -i *.jpg --output-dir marked/ --text Copyright"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.png", "shots/*.jpg").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Output file path. Only valid for single-file input.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format: png, jpeg, gif, bmp, tiff.
    /// When omitted, the input's format is kept (png if unknown).
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// Watermark text. Without it images are re-exported unchanged.
    #[arg(short, long)]
    pub text: Option<String>,

    /// Text colour as #RRGGBB.
    #[arg(short, long, default_value = "#FFFFFF")]
    pub color: String,

    /// Opacity in percent.
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub opacity: u8,

    /// Font size in preview pixels (12–72).
    #[arg(long, default_value_t = DEFAULT_FONT_SIZE)]
    pub font_size: u32,

    /// Horizontal anchor as a fraction of the image width.
    #[arg(long, default_value_t = 0.5)]
    pub x: f32,

    /// Vertical anchor as a fraction of the image height.
    #[arg(long, default_value_t = 0.5)]
    pub y: f32,

    /// TrueType/OpenType font file to use instead of the system sans-serif.
    #[arg(long, value_name = "FONT")]
    pub font: Option<PathBuf>,

    /// JPEG quality (1–100, default 90).
    #[arg(short, long, default_value_t = 90, value_name = "1-100")]
    pub quality: u8,

    /// Print per-file timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// Returns `true` when any CLI-mode flag is present in the real process arguments.
    /// Used by `main()` to route before creating an eframe window.
    pub fn is_cli_mode() -> bool {
        std::env::args().any(|a| a == "--input" || a == "-i")
    }

    /// Watermark described by the flags for an image whose preview is `base_w × base_h`.
    fn watermark_for(&self, base_w: u32, base_h: u32) -> Option<WatermarkSettings> {
        let text = self.text.as_ref()?;
        let mut settings = WatermarkSettings::centered(base_w, base_h);
        settings.text = text.clone();
        settings.opacity = self.opacity;
        settings.font_size = self.font_size;
        settings.color = parse_hex_color(&self.color).unwrap_or_else(|| {
            eprintln!("warning: invalid colour '{}', using white.", self.color);
            DEFAULT_COLOR
        });
        settings.anchor = (
            self.x.clamp(0.0, 1.0) * base_w as f32,
            self.y.clamp(0.0, 1.0) * base_h as f32,
        );
        Some(settings)
    }
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs) -> ExitCode {
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    // Multiple inputs require --output-dir, not --output
    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    let format = match args.format.as_deref() {
        Some(f) => match SaveFormat::from_extension(f) {
            Some(fmt) => Some(fmt),
            None => {
                eprintln!("error: unsupported output format '{}'.", f);
                return ExitCode::FAILURE;
            }
        },
        None => None,
    };

    let font = match load_watermark_font(args.font.as_deref()) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(dir) = &args.output_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!("error: could not create output directory '{}': {}", dir.display(), e);
        return ExitCode::FAILURE;
    }

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }

        let file_start = Instant::now();

        let Some(output_path) =
            build_output_path(input_path, args.output.as_deref(), args.output_dir.as_deref(), format)
        else {
            eprintln!("  error: cannot determine output path for '{}'.", input_path.display());
            any_failure = true;
            continue;
        };

        match run_one(input_path, &output_path, &args, &font) {
            Ok(written) => {
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        written.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                eprintln!("  error: {}", e);
                log_err!("CLI: {} failed: {}", input_path.display(), e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

// ============================================================================
// Per-file processing pipeline
// ============================================================================

fn run_one(input: &Path, output: &Path, args: &CliArgs, font: &FontArc) -> crate::error::Result<PathBuf> {
    let mut project = Project::open(input)?;

    let (bw, bh) = project.base_size();
    if let Some(settings) = args.watermark_for(bw, bh) {
        project.update_watermark(settings, font);
    }

    project.export_with_quality(output, font, args.quality)
}

// ============================================================================
// Helpers
// ============================================================================

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// Compute the output path for a single input file.
///
/// Priority:
/// 1. `--output` (explicit path, used for single-file input)
/// 2. `--output-dir` (batch directory, `<stem>_watermarked.<ext>`)
/// 3. Fallback: next to the input as `<stem>_watermarked.<ext>`
///
/// `<ext>` comes from `format`, else the input's own extension when it is
/// writable, else png.
fn build_output_path(
    input: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    format: Option<SaveFormat>,
) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let ext = match format {
        Some(f) => f.extension().to_string(),
        None => input
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .filter(|e| is_supported_extension(e))
            .unwrap_or_else(|| SaveFormat::Png.extension().to_string()),
    };
    let stem = input.file_stem()?.to_string_lossy().into_owned();
    let name = format!("{}_watermarked.{}", stem, ext);

    match output_dir {
        Some(dir) => Some(dir.join(name)),
        None => Some(input.parent().unwrap_or(Path::new(".")).join(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn explicit_output_wins() {
        let out = build_output_path(
            Path::new("shots/a.jpg"),
            Some(Path::new("x/out.bmp")),
            Some(Path::new("dir")),
            Some(SaveFormat::Png),
        );
        assert_eq!(out, Some(PathBuf::from("x/out.bmp")));
    }

    #[test]
    fn default_name_keeps_input_format() {
        let out = build_output_path(Path::new("shots/a.jpg"), None, None, None);
        assert_eq!(out, Some(PathBuf::from("shots/a_watermarked.jpg")));
    }

    #[test]
    fn output_dir_with_forced_format() {
        let out = build_output_path(Path::new("shots/a.jpg"), None, Some(Path::new("out")), Some(SaveFormat::Png));
        assert_eq!(out, Some(PathBuf::from("out/a_watermarked.png")));
    }

    #[test]
    fn unknown_input_extension_falls_back_to_png() {
        let out = build_output_path(Path::new("a.webp"), None, None, None);
        assert_eq!(out, Some(PathBuf::from("a_watermarked.png")));
    }

    #[test]
    fn parses_full_command_line() {
        let args = CliArgs::try_parse_from([
            "watermarker", "-i", "photo.jpg", "-o", "out.png", "--text", "Copyright", "--color", "#FF0000",
            "--opacity", "50", "--font-size", "24",
        ])
        .unwrap();
        assert_eq!(args.input, vec!["photo.jpg".to_string()]);
        assert_eq!(args.opacity, 50);
        assert_eq!(args.font_size, 24);

        let wm = args.watermark_for(640, 480).unwrap();
        assert_eq!(wm.text, "Copyright");
        assert_eq!(wm.color, [255, 0, 0]);
        assert_eq!(wm.anchor, (320.0, 240.0));
    }

    #[test]
    fn opacity_above_hundred_is_rejected() {
        let parsed = CliArgs::try_parse_from(["watermarker", "-i", "a.png", "--opacity", "150"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn no_text_means_no_watermark() {
        let args = CliArgs::try_parse_from(["watermarker", "-i", "a.png"]).unwrap();
        assert!(args.watermark_for(100, 100).is_none());
    }

    #[test]
    fn anchor_fractions_are_clamped() {
        let args = CliArgs::try_parse_from(["watermarker", "-i", "a.png", "--text", "x", "--x", "1.5", "--y", "-0.5"])
            .unwrap();
        let wm = args.watermark_for(200, 100).unwrap();
        assert_eq!(wm.anchor, (200.0, 0.0));
    }

    #[test]
    fn resolves_globs_without_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.png", "b.png", "c.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let literal = dir.path().join("a.png").to_string_lossy().into_owned();
        let pattern = dir.path().join("*.png").to_string_lossy().into_owned();
        let found = resolve_inputs(&[literal, pattern]);
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|p| p.extension().unwrap() == "png"));
    }

    #[test]
    fn run_one_writes_watermarked_copy() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("photo.png");
        RgbaImage::from_pixel(400, 300, Rgba([0, 0, 0, 255])).save(&input).unwrap();
        let output = dir.path().join("photo_out.png");

        let args = CliArgs::try_parse_from([
            "watermarker", "-i", input.to_str().unwrap(), "--text", "Hi", "--font-size", "48",
        ])
        .unwrap();
        let font = crate::ops::text::builtin_font().unwrap();
        let written = run_one(&input, &output, &args, &font).unwrap();

        let img = image::open(&written).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (400, 300));
        assert!(img.pixels().any(|p| p.0[0] > 200));
    }

    #[test]
    fn missing_font_file_still_exports() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("photo.png");
        RgbaImage::from_pixel(200, 100, Rgba([0, 0, 0, 255])).save(&input).unwrap();
        let output = dir.path().join("marked.png");

        let args = CliArgs::try_parse_from([
            "watermarker", "-i", input.to_str().unwrap(), "--text", "Mark", "--font", "/missing.ttf",
        ])
        .unwrap();
        let font = load_watermark_font(args.font.as_deref()).unwrap();
        let written = run_one(&input, &output, &args, &font).unwrap();

        let img = image::open(&written).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (200, 100));
        assert!(img.pixels().any(|p| p.0[0] > 200));
    }
}
