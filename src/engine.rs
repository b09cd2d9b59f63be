//! Batch stamping engine: per-item processing with partial-failure semantics.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, RgbImage, RgbaImage};

use crate::archive::ArchiveWriter;
use crate::compositing::{PreparedStamp, WatermarkConfig};
use crate::error::{Error, Result};
use crate::ffmpeg::{FfmpegFrameSink, FfmpegFrameSource};
use crate::video::{stamp_video, CanvasPolicy, FrameSink, FrameSource};

/// Options controlling batch processing behavior.
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Downscale photos whose longest side exceeds this before stamping.
    pub max_photo_dimension: Option<u32>,
    /// JPEG encoder quality for photo output.
    pub jpeg_quality: u8,
    /// Output canvas policy for videos.
    pub video_policy: CanvasPolicy,
    /// Enable verbose logging.
    pub verbose: bool,
    /// Suppress non-error output.
    pub quiet: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            max_photo_dimension: Some(2500),
            jpeg_quality: 95,
            video_policy: CanvasPolicy::Strict,
            verbose: false,
            quiet: false,
        }
    }
}

/// Result of processing a single media item.
#[derive(Debug)]
pub struct ProcessResult {
    /// Path of the processed item.
    pub path: PathBuf,
    /// Whether processing succeeded (including degenerate passthrough).
    pub success: bool,
    /// Whether the logo was not applied (degenerate scale passthrough).
    pub skipped: bool,
    /// Human-readable status message.
    pub message: String,
}

impl ProcessResult {
    fn pending(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            success: false,
            skipped: false,
            message: String::new(),
        }
    }
}

/// The stamping engine holding the logo and overlay configuration.
///
/// Create once per batch and reuse across items; the logo is read-only and
/// safe to share across parallel workers.
#[derive(Debug)]
pub struct StampEngine {
    logo: RgbaImage,
    config: WatermarkConfig,
}

impl StampEngine {
    /// Create an engine from a decoded logo and an overlay configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLogoAspect`] if the logo has a zero width or
    /// height.
    pub fn new(logo: RgbaImage, config: WatermarkConfig) -> Result<Self> {
        let (width, height) = logo.dimensions();
        if width == 0 || height == 0 {
            return Err(Error::InvalidLogoAspect { width, height });
        }
        Ok(Self { logo, config })
    }

    /// The overlay configuration this engine applies.
    #[must_use]
    pub fn config(&self) -> &WatermarkConfig {
        &self.config
    }

    /// Stamp a single decoded photo.
    ///
    /// Applies the safety downscale first when `max_dimension` is set, then
    /// blends the logo. The returned flag is `false` when the configured
    /// scale was degenerate and the (possibly downscaled) photo passed
    /// through without a logo.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLogoAspect`] for a zero-dimension logo.
    pub fn stamp_photo(
        &self,
        base: &RgbImage,
        max_dimension: Option<u32>,
    ) -> Result<(RgbImage, bool)> {
        let mut frame = match max_dimension {
            Some(limit) if base.width() > limit || base.height() > limit => {
                DynamicImage::ImageRgb8(base.clone())
                    .resize(limit, limit, image::imageops::FilterType::Lanczos3)
                    .to_rgb8()
            }
            _ => base.clone(),
        };

        let stamp =
            PreparedStamp::prepare(frame.width(), frame.height(), &self.logo, &self.config)?;
        match stamp {
            Some(stamp) => {
                stamp.apply(&mut frame);
                Ok((frame, true))
            }
            None => Ok((frame, false)),
        }
    }

    /// Stamp every frame of an already-open video stream.
    ///
    /// Useful when the caller injects its own [`FrameSource`]/[`FrameSink`]
    /// backend instead of the bundled ffmpeg one. Returns the number of
    /// frames written and whether the logo was applied; `false` means the
    /// scale was degenerate and frames passed through untouched.
    ///
    /// # Errors
    ///
    /// Propagates source/sink failures unchanged.
    pub fn stamp_video_stream(
        &self,
        source: &mut dyn FrameSource,
        sink: &mut dyn FrameSink,
        policy: CanvasPolicy,
    ) -> Result<(u64, bool)> {
        stamp_video(source, sink, &self.logo, &self.config, policy)
    }

    /// Process a single photo file: load, stamp, save.
    ///
    /// Never aborts a batch; failures are reported in the result.
    #[must_use]
    pub fn process_file(
        &self,
        input: &Path,
        output: &Path,
        opts: &ProcessOptions,
    ) -> ProcessResult {
        let mut result = ProcessResult::pending(input);

        let base = match image::open(input) {
            Ok(img) => img.to_rgb8(),
            Err(e) => {
                result.message = format!("Failed to load: {e}");
                return result;
            }
        };

        let (stamped, applied) = match self.stamp_photo(&base, opts.max_photo_dimension) {
            Ok(out) => out,
            Err(e) => {
                result.message = format!("Failed to stamp: {e}");
                return result;
            }
        };

        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    result.message = format!("Failed to create output directory: {e}");
                    return result;
                }
            }
        }

        match save_image(&stamped, output, opts.jpeg_quality) {
            Ok(()) => {
                result.success = true;
                if applied {
                    result.message = "Logo applied".to_string();
                } else {
                    result.skipped = true;
                    result.message = format!(
                        "Logo scale degenerate for {}x{}, copied without logo",
                        stamped.width(),
                        stamped.height()
                    );
                }
            }
            Err(e) => {
                result.message = format!("Failed to save: {e}");
            }
        }

        result
    }

    /// Process a single video file through the ffmpeg backend.
    ///
    /// Output dimensions follow `opts.video_policy`; frame rate and the
    /// audio track are carried over from the input.
    #[must_use]
    pub fn process_video(
        &self,
        input: &Path,
        output: &Path,
        opts: &ProcessOptions,
    ) -> ProcessResult {
        let mut result = ProcessResult::pending(input);

        let mut source = match FfmpegFrameSource::open(input) {
            Ok(s) => s,
            Err(e) => {
                result.message = format!("Failed to open video: {e}");
                return result;
            }
        };

        let meta = source.meta().clone();
        let (out_w, out_h) = opts.video_policy.output_dimensions(meta.width, meta.height);
        let audio_from = meta.has_audio.then_some(input);

        let mut sink = match FfmpegFrameSink::create(output, out_w, out_h, meta.fps, audio_from) {
            Ok(s) => s,
            Err(e) => {
                result.message = format!("Failed to start encoder: {e}");
                return result;
            }
        };

        match stamp_video(&mut source, &mut sink, &self.logo, &self.config, opts.video_policy) {
            Ok((frames, applied)) => {
                result.success = true;
                if applied {
                    result.message = format!("Logo applied to {frames} frames");
                } else {
                    result.skipped = true;
                    result.message = format!(
                        "Logo scale degenerate for {out_w}x{out_h}, copied without logo"
                    );
                }
            }
            Err(e) => {
                result.message = format!("Failed to process video: {e}");
            }
        }

        result
    }

    /// Process all supported media in a directory.
    ///
    /// Photos and videos are both picked up; outputs land in `output_dir`
    /// as `logo_<input-name>` so input/output correspondence is preserved
    /// by name. Uses parallel iteration when the `cli` feature is enabled
    /// (via rayon). A failing item never stops the rest of the batch.
    #[must_use]
    pub fn process_directory(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        opts: &ProcessOptions,
    ) -> Vec<ProcessResult> {
        let entries = match list_media_files(input_dir) {
            Ok(entries) => entries,
            Err(e) => {
                return vec![ProcessResult {
                    path: input_dir.to_path_buf(),
                    success: false,
                    skipped: false,
                    message: format!("Failed to read directory: {e}"),
                }];
            }
        };

        if !output_dir.exists() {
            if let Err(e) = std::fs::create_dir_all(output_dir) {
                return vec![ProcessResult {
                    path: output_dir.to_path_buf(),
                    success: false,
                    skipped: false,
                    message: format!("Failed to create output directory: {e}"),
                }];
            }
        }

        let process_one = |input_path: &PathBuf| {
            let name = batch_output_name(input_path);
            let output_path = output_dir.join(name);
            if is_supported_video(input_path) {
                self.process_video(input_path, &output_path, opts)
            } else {
                self.process_file(input_path, &output_path, opts)
            }
        };

        #[cfg(feature = "cli")]
        {
            use rayon::prelude::*;
            entries.par_iter().map(process_one).collect()
        }

        #[cfg(not(feature = "cli"))]
        {
            entries.iter().map(process_one).collect()
        }
    }

    /// Process a directory of media into an archive writer.
    ///
    /// Photos are encoded in memory; videos are encoded to a scratch file,
    /// read back, and removed. Archive entry names carry the `logo_`
    /// prefix. Packaging and finalization stay with the caller.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the input directory cannot be read;
    /// per-item failures are reported in the results instead.
    pub fn process_directory_to_archive(
        &self,
        input_dir: &Path,
        archive: &mut dyn ArchiveWriter,
        opts: &ProcessOptions,
    ) -> Result<Vec<ProcessResult>> {
        let entries = list_media_files(input_dir)?;
        let mut results = Vec::with_capacity(entries.len());

        for input_path in &entries {
            let name = batch_output_name(input_path);
            let result = if is_supported_video(input_path) {
                self.archive_video(input_path, &name, archive, opts)
            } else {
                self.archive_photo(input_path, &name, archive, opts)
            };
            results.push(result);
        }

        Ok(results)
    }

    fn archive_photo(
        &self,
        input: &Path,
        name: &str,
        archive: &mut dyn ArchiveWriter,
        opts: &ProcessOptions,
    ) -> ProcessResult {
        let mut result = ProcessResult::pending(input);

        let base = match image::open(input) {
            Ok(img) => img.to_rgb8(),
            Err(e) => {
                result.message = format!("Failed to load: {e}");
                return result;
            }
        };

        let stamped = match self.stamp_photo(&base, opts.max_photo_dimension) {
            Ok((img, applied)) => {
                result.skipped = !applied;
                img
            }
            Err(e) => {
                result.message = format!("Failed to stamp: {e}");
                return result;
            }
        };

        let bytes = match encode_image(&stamped, input, opts.jpeg_quality) {
            Ok(bytes) => bytes,
            Err(e) => {
                result.message = format!("Failed to encode: {e}");
                return result;
            }
        };

        match archive.add(name, &bytes) {
            Ok(()) => {
                result.success = true;
                result.message = "Logo applied".to_string();
            }
            Err(e) => {
                result.message = format!("Failed to archive: {e}");
            }
        }

        result
    }

    fn archive_video(
        &self,
        input: &Path,
        name: &str,
        archive: &mut dyn ArchiveWriter,
        opts: &ProcessOptions,
    ) -> ProcessResult {
        let scratch = std::env::temp_dir().join(format!("logostamp_{}_{name}", std::process::id()));

        let mut result = self.process_video(input, &scratch, opts);
        if !result.success {
            let _ = std::fs::remove_file(&scratch);
            return result;
        }

        let added = std::fs::read(&scratch)
            .map_err(Error::from)
            .and_then(|bytes| archive.add(name, &bytes));
        let _ = std::fs::remove_file(&scratch);

        if let Err(e) = added {
            result.success = false;
            result.message = format!("Failed to archive: {e}");
        }
        result
    }
}

/// Check if a file has a supported photo extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "webp" | "bmp"
        ),
        None => false,
    }
}

/// Check if a file has a supported video extension.
#[must_use]
pub fn is_supported_video(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "mp4" | "mov" | "m4v" | "avi" | "mkv" | "webm"
        ),
        None => false,
    }
}

fn list_media_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
        .map(|e| e.path())
        .filter(|p| is_supported_image(p) || is_supported_video(p))
        .collect();
    entries.sort();
    Ok(entries)
}

fn batch_output_name(input: &Path) -> String {
    // Video output is always MP4 (the sink encodes libx264/aac); naming a
    // webm/mkv output after the input would make ffmpeg pick a muxer that
    // rejects those codecs.
    if is_supported_video(input) {
        let stem = input.file_stem().unwrap_or_default().to_string_lossy();
        return format!("logo_{stem}.mp4");
    }
    let file_name = input.file_name().map_or_else(
        || input.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    );
    format!("logo_{file_name}")
}

/// Save an RGB image with format-specific quality settings.
///
/// # Errors
///
/// Returns an error if the format is unsupported or writing fails.
pub fn save_image(img: &RgbImage, path: &Path, jpeg_quality: u8) -> Result<()> {
    let format =
        ImageFormat::from_path(path).map_err(|e| Error::UnsupportedFormat(e.to_string()))?;

    let dyn_img = DynamicImage::ImageRgb8(img.clone());

    match format {
        ImageFormat::Jpeg => {
            let file = std::fs::File::create(path)?;
            let mut encoder =
                image::codecs::jpeg::JpegEncoder::new_with_quality(file, jpeg_quality);
            encoder.encode_image(&dyn_img)?;
        }
        ImageFormat::Png | ImageFormat::WebP | ImageFormat::Bmp => {
            dyn_img.save(path)?;
        }
        _ => {
            return Err(Error::UnsupportedFormat(format!("{format:?}")));
        }
    }

    Ok(())
}

/// Encode an RGB image to in-memory bytes in the source file's format.
///
/// # Errors
///
/// Returns an error if the format is unsupported or encoding fails.
pub fn encode_image(img: &RgbImage, source_path: &Path, jpeg_quality: u8) -> Result<Vec<u8>> {
    let format = ImageFormat::from_path(source_path)
        .map_err(|e| Error::UnsupportedFormat(e.to_string()))?;

    let dyn_img = DynamicImage::ImageRgb8(img.clone());
    let mut bytes = Vec::new();

    match format {
        ImageFormat::Jpeg => {
            let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
                Cursor::new(&mut bytes),
                jpeg_quality,
            );
            encoder.encode_image(&dyn_img)?;
        }
        ImageFormat::Png | ImageFormat::WebP | ImageFormat::Bmp => {
            dyn_img.write_to(&mut Cursor::new(&mut bytes), format)?;
        }
        _ => {
            return Err(Error::UnsupportedFormat(format!("{format:?}")));
        }
    }

    Ok(bytes)
}

/// Generate a default output path from an input path.
///
/// Photos keep their format: `"photo.jpg"` becomes `"photo_logo.jpg"`.
/// Videos always get an `.mp4` output (the encoder produces libx264/aac
/// regardless of the input container), so `"clip.webm"` becomes
/// `"clip_logo.mp4"`.
#[must_use]
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let parent = input.parent().unwrap_or(Path::new("."));
    if is_supported_video(input) {
        return parent.join(format!("{stem}_logo.mp4"));
    }
    let ext = input.extension().unwrap_or_default().to_string_lossy();
    parent.join(format!("{stem}_logo.{ext}"))
}
