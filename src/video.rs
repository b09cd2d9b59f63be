//! Per-frame video watermarking over abstract decode/encode collaborators.
//!
//! The core never touches containers or codecs: it pulls opaque RGB frames
//! from a [`FrameSource`], stamps each one, and pushes them to a
//! [`FrameSink`]. Frames are streamed one at a time, so a long video never
//! lives in memory as a whole. The concrete ffmpeg backend lives in
//! [`crate::ffmpeg`] and is constructed only when video processing is
//! actually invoked.

use image::{imageops, RgbImage, RgbaImage};

use crate::compositing::{PreparedStamp, WatermarkConfig};
use crate::error::Result;

/// Stream metadata reported by a [`FrameSource`].
#[derive(Debug, Clone)]
pub struct VideoMeta {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frames per second.
    pub fps: f64,
    /// Stream duration in seconds, when the container reports one.
    pub duration_secs: Option<f64>,
    /// Whether the stream carries an audio track.
    pub has_audio: bool,
}

/// How the output canvas relates to the input video's dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanvasPolicy {
    /// Output dimensions equal input dimensions exactly, except that an odd
    /// width or height is cropped by one pixel from the trailing edge
    /// (right/bottom). Encoders targeting yuv420p require even dimensions.
    Strict,
    /// Downscale to fit within `max_dimension` on the longest side before
    /// watermarking, then force even dimensions.
    ScaledToFit {
        /// Longest-side pixel limit.
        max_dimension: u32,
    },
}

impl CanvasPolicy {
    /// Compute the output canvas size for a given input size.
    ///
    /// Always returns even dimensions, never larger than the input.
    #[must_use]
    pub fn output_dimensions(self, in_w: u32, in_h: u32) -> (u32, u32) {
        match self {
            Self::Strict => (in_w - in_w % 2, in_h - in_h % 2),
            Self::ScaledToFit { max_dimension } => {
                let longest = in_w.max(in_h);
                let (w, h) = if longest > max_dimension && longest > 0 {
                    let scale = f64::from(max_dimension) / f64::from(longest);
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    (
                        (f64::from(in_w) * scale).round() as u32,
                        (f64::from(in_h) * scale).round() as u32,
                    )
                } else {
                    (in_w, in_h)
                };
                (w - w % 2, h - h % 2)
            }
        }
    }
}

/// Lazy, finite, non-restartable sequence of decoded frames.
pub trait FrameSource {
    /// Stream metadata, available before the first frame.
    fn meta(&self) -> &VideoMeta;

    /// Pull the next frame, or `None` once the stream is exhausted.
    ///
    /// # Errors
    ///
    /// Propagates decode failures from the underlying pipeline unchanged.
    fn next_frame(&mut self) -> Result<Option<RgbImage>>;
}

/// Ordered frame consumer; deterministic for identical frames/parameters.
pub trait FrameSink {
    /// Write one frame. Frames must match the sink's configured dimensions.
    ///
    /// # Errors
    ///
    /// Propagates encode failures from the underlying pipeline unchanged.
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()>;

    /// Flush and close the sink.
    ///
    /// # Errors
    ///
    /// Propagates encode failures raised while finalizing the output.
    fn finish(&mut self) -> Result<()>;
}

/// Fit a decoded frame to the output canvas.
///
/// Equal sizes pass through untouched; a same-or-smaller target crops from
/// the trailing edge (the strict-mode odd-pixel correction); anything else
/// is a Lanczos downscale to the exact target.
#[must_use]
pub fn conform_frame(frame: RgbImage, out_w: u32, out_h: u32) -> RgbImage {
    let (w, h) = frame.dimensions();
    if (w, h) == (out_w, out_h) {
        frame
    } else if out_w <= w && out_h <= h && (w - out_w) <= 1 && (h - out_h) <= 1 {
        imageops::crop_imm(&frame, 0, 0, out_w, out_h).to_image()
    } else {
        imageops::resize(&frame, out_w, out_h, imageops::FilterType::Lanczos3)
    }
}

/// Stamp every frame of a video stream.
///
/// Prepares the logo once against the output canvas, then per frame:
/// conform to the canvas policy, blend the stamp in-place, hand the frame
/// to the sink, and drop it. Frame rate and duration are the source's
/// concern; no frames are dropped or duplicated here.
///
/// Returns the number of frames written plus whether the stamp was
/// actually applied; `false` means the configured scale was degenerate and
/// the frames passed through without a logo.
///
/// # Errors
///
/// Returns [`crate::Error::InvalidLogoAspect`] for a zero-dimension logo,
/// and propagates source/sink failures unchanged.
pub fn stamp_video(
    source: &mut dyn FrameSource,
    sink: &mut dyn FrameSink,
    logo: &RgbaImage,
    config: &WatermarkConfig,
    policy: CanvasPolicy,
) -> Result<(u64, bool)> {
    let meta = source.meta().clone();
    let (out_w, out_h) = policy.output_dimensions(meta.width, meta.height);

    let stamp = PreparedStamp::prepare(out_w, out_h, logo, config)?;

    let mut written = 0u64;
    while let Some(frame) = source.next_frame()? {
        let mut frame = conform_frame(frame, out_w, out_h);
        if let Some(stamp) = &stamp {
            stamp.apply(&mut frame);
        }
        sink.write_frame(&frame)?;
        written += 1;
    }

    sink.finish()?;
    Ok((written, stamp.is_some()))
}
