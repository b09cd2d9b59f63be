use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use logostamp::{
    default_output_path, is_supported_video, load_logo, scan_logo_directory, Anchor, CanvasPolicy,
    ProcessOptions, ProcessResult, StampEngine, WatermarkConfig,
};

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum Position {
    BottomRight,
    BottomLeft,
    TopRight,
    TopLeft,
    Center,
}

impl From<Position> for Anchor {
    fn from(value: Position) -> Self {
        match value {
            Position::BottomRight => Anchor::BottomRight,
            Position::BottomLeft => Anchor::BottomLeft,
            Position::TopRight => Anchor::TopRight,
            Position::TopLeft => Anchor::TopLeft,
            Position::Center => Anchor::Center,
        }
    }
}

#[derive(Parser)]
#[command(
    name = "logostamp",
    about = "Overlay a logo onto batches of photos and videos",
    version,
    after_help = "Simple usage: logostamp photo.jpg --logo brand.png\n\n\
                  Video output requires ffmpeg/ffprobe on PATH; photos do not."
)]
struct Cli {
    /// Input media file or directory
    input: String,

    /// Output file or directory (default: {name}_logo.{ext})
    #[arg(short, long)]
    output: Option<String>,

    /// Logo image file (PNG with transparency works best)
    #[arg(short, long)]
    logo: Option<String>,

    /// Pick the logo from a library directory instead of --logo
    #[arg(long, conflicts_with = "logo")]
    logo_dir: Option<String>,

    /// Logo file name within --logo-dir (default: first readable logo)
    #[arg(long, requires = "logo_dir")]
    logo_name: Option<String>,

    /// Anchor position for the logo
    #[arg(short, long, value_enum, default_value = "bottom-right")]
    position: Position,

    /// Logo width as a percentage of the canvas width (0-100)
    #[arg(short, long, default_value = "20")]
    scale: f32,

    /// Logo opacity (0.0-1.0)
    #[arg(long, default_value = "0.9")]
    opacity: f32,

    /// Margin from the canvas edges in pixels (ignored for center)
    #[arg(short, long, default_value = "50")]
    margin: u32,

    /// Downscale photos whose longest side exceeds this (0 disables)
    #[arg(long, default_value = "2500")]
    max_dimension: u32,

    /// Downscale videos to fit this longest side instead of keeping the
    /// input dimensions exactly
    #[arg(long)]
    fit: Option<u32>,

    /// JPEG output quality (1-100)
    #[arg(long, default_value = "95")]
    jpeg_quality: u8,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();

    if cli.scale <= 0.0 || cli.scale > 100.0 {
        eprintln!("Error: Scale must be greater than 0 and at most 100");
        process::exit(1);
    }
    if !(0.0..=1.0).contains(&cli.opacity) {
        eprintln!("Error: Opacity must be between 0.0 and 1.0");
        process::exit(1);
    }
    if cli.jpeg_quality == 0 || cli.jpeg_quality > 100 {
        eprintln!("Error: JPEG quality must be between 1 and 100");
        process::exit(1);
    }

    let logo = match resolve_logo(&cli) {
        Ok(logo) => logo,
        Err(msg) => {
            eprintln!("Error: {msg}");
            process::exit(1);
        }
    };

    let config = WatermarkConfig::default()
        .with_anchor(cli.position.into())
        .with_scale_percent(cli.scale)
        .with_opacity(cli.opacity)
        .with_margin(cli.margin);

    let opts = ProcessOptions {
        max_photo_dimension: (cli.max_dimension > 0).then_some(cli.max_dimension),
        jpeg_quality: cli.jpeg_quality,
        video_policy: match cli.fit {
            Some(max_dimension) => CanvasPolicy::ScaledToFit { max_dimension },
            None => CanvasPolicy::Strict,
        },
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    let engine = match StampEngine::new(logo, config) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Fatal: {e}");
            process::exit(1);
        }
    };

    let input_path = Path::new(&cli.input);
    if !input_path.exists() {
        eprintln!("Error: Input path does not exist: {}", cli.input);
        process::exit(1);
    }

    let results = if input_path.is_dir() {
        let output_dir = if let Some(o) = &cli.output {
            PathBuf::from(o)
        } else {
            eprintln!("Error: Output directory is required for batch processing");
            eprintln!("Usage: logostamp <input_dir> --logo <logo> -o <output_dir>");
            process::exit(1);
        };
        engine.process_directory(input_path, &output_dir, &opts)
    } else {
        let output_path = match &cli.output {
            Some(o) => PathBuf::from(o),
            None => default_output_path(input_path),
        };
        if is_supported_video(input_path) {
            vec![engine.process_video(input_path, &output_path, &opts)]
        } else {
            vec![engine.process_file(input_path, &output_path, &opts)]
        }
    };

    let mut success_count = 0u32;
    let mut skip_count = 0u32;
    let mut fail_count = 0u32;

    for r in &results {
        print_result(r, &opts);
        if r.skipped {
            skip_count += 1;
        } else if r.success {
            success_count += 1;
        } else {
            fail_count += 1;
        }
    }

    if results.len() > 1 && !opts.quiet {
        eprintln!();
        eprint!("[Summary] Stamped: {success_count}");
        if skip_count > 0 {
            eprint!(", Unstamped: {skip_count}");
        }
        if fail_count > 0 {
            eprint!(", Failed: {fail_count}");
        }
        eprintln!(" (Total: {})", results.len());
    }

    if fail_count > 0 {
        process::exit(1);
    }
}

fn resolve_logo(cli: &Cli) -> Result<image::RgbaImage, String> {
    if let Some(path) = &cli.logo {
        return load_logo(Path::new(path)).map_err(|e| format!("Failed to load logo: {e}"));
    }

    let Some(dir) = &cli.logo_dir else {
        return Err("A logo is required: pass --logo <file> or --logo-dir <dir>".to_string());
    };

    let entries = scan_logo_directory(Path::new(dir))
        .map_err(|e| format!("Failed to scan logo directory: {e}"))?;
    if entries.is_empty() {
        return Err(format!("No logo files (png/jpg/jpeg) found in '{dir}'"));
    }

    let mut first_error = None;
    for entry in entries {
        if let Some(wanted) = &cli.logo_name {
            if &entry.name != wanted {
                continue;
            }
        }
        match entry.result {
            Ok(logo) => {
                if cli.verbose && !cli.quiet {
                    eprintln!("Using logo '{}' from '{dir}'", entry.name);
                }
                return Ok(logo);
            }
            Err(e) => {
                if !cli.quiet {
                    eprintln!("[WARN] {}: {e}", entry.name);
                }
                first_error.get_or_insert(format!("'{}': {e}", entry.name));
            }
        }
    }

    match (&cli.logo_name, first_error) {
        (Some(name), None) => Err(format!("Logo '{name}' not found in '{dir}'")),
        (_, Some(err)) => Err(format!("No usable logo in '{dir}': {err}")),
        (None, None) => Err(format!("No usable logo in '{dir}'")),
    }
}

fn print_result(result: &ProcessResult, opts: &ProcessOptions) {
    if opts.quiet && result.success {
        return;
    }

    let filename = result.path.file_name().map_or_else(
        || result.path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    );

    if result.skipped {
        if !opts.quiet {
            eprintln!("[SKIP] {filename}: {}", result.message);
        }
    } else if result.success {
        if !opts.quiet {
            eprintln!("[OK] {filename}");
        }
    } else {
        eprintln!("[FAIL] {filename}: {}", result.message);
    }

    if opts.verbose && !result.message.is_empty() {
        eprintln!("  -> {}", result.message);
    }
}
