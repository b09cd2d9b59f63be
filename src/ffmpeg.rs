//! Frame source/sink backed by the system `ffmpeg`/`ffprobe` binaries.
//!
//! Raw rgb24 frames are piped over stdout (decode) and stdin (encode); the
//! encoder targets libx264 + yuv420p with the audio track mapped straight
//! from the source file. We intentionally shell out to the system binaries
//! rather than bind native FFmpeg libraries, which keeps the build free of
//! dev header/lib requirements. A missing binary surfaces as
//! [`Error::VideoBackendUnavailable`] at construction time.

use std::io::{Read, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use image::RgbImage;

use crate::error::{Error, Result};
use crate::video::{FrameSink, FrameSource, VideoMeta};

fn binary_on_path(name: &str) -> bool {
    Command::new(name)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Check whether both `ffmpeg` and `ffprobe` are on PATH.
#[must_use]
pub fn is_ffmpeg_available() -> bool {
    binary_on_path("ffmpeg") && binary_on_path("ffprobe")
}

fn backend_unavailable() -> Error {
    Error::VideoBackendUnavailable(
        "ffmpeg and ffprobe must be installed and on PATH for video processing".to_string(),
    )
}

fn parse_frame_rate(text: &str) -> Result<f64> {
    let parsed = match text.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().unwrap_or(f64::NAN);
            let den: f64 = den.trim().parse().unwrap_or(f64::NAN);
            num / den
        }
        None => text.trim().parse().unwrap_or(f64::NAN),
    };
    if parsed.is_finite() && parsed > 0.0 {
        Ok(parsed)
    } else {
        Err(Error::VideoDecode(format!(
            "ffprobe reported an unusable frame rate: {text:?}"
        )))
    }
}

fn probe_has_audio(path: &Path) -> bool {
    Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "a",
            "-show_entries",
            "stream=codec_type",
            "-of",
            "csv=p=0",
        ])
        .arg(path)
        .output()
        .map(|o| o.status.success() && !o.stdout.is_empty())
        .unwrap_or(false)
}

fn probe_meta(path: &Path) -> Result<VideoMeta> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,r_frame_rate",
            "-show_entries",
            "format=duration",
            "-of",
            "csv=p=0",
        ])
        .arg(path)
        .output()
        .map_err(|e| Error::VideoDecode(format!("failed to run ffprobe: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::VideoDecode(format!(
            "ffprobe failed for '{}': {}",
            path.display(),
            stderr.trim()
        )));
    }

    let text = String::from_utf8_lossy(&output.stdout);
    let mut lines = text.lines();
    let stream_line = lines.next().unwrap_or("").trim();
    let fields: Vec<&str> = stream_line.split(',').collect();
    if fields.len() < 3 {
        return Err(Error::VideoDecode(format!(
            "'{}' has no decodable video stream",
            path.display()
        )));
    }

    let width: u32 = fields[0]
        .parse()
        .map_err(|_| Error::VideoDecode(format!("bad stream width: {:?}", fields[0])))?;
    let height: u32 = fields[1]
        .parse()
        .map_err(|_| Error::VideoDecode(format!("bad stream height: {:?}", fields[1])))?;
    let fps = parse_frame_rate(fields[2])?;
    let duration_secs = lines.next().and_then(|l| l.trim().parse::<f64>().ok());

    Ok(VideoMeta {
        width,
        height,
        fps,
        duration_secs,
        has_audio: probe_has_audio(path),
    })
}

/// Decoded frame stream produced by an `ffmpeg` child process.
pub struct FfmpegFrameSource {
    meta: VideoMeta,
    child: Child,
    stdout: Option<ChildStdout>,
    frame_len: usize,
}

impl FfmpegFrameSource {
    /// Probe a video file and start decoding it frame by frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::VideoBackendUnavailable`] when ffmpeg/ffprobe is not
    /// on PATH, or [`Error::VideoDecode`] when the file cannot be probed or
    /// the decoder cannot be spawned.
    pub fn open(path: &Path) -> Result<Self> {
        if !is_ffmpeg_available() {
            return Err(backend_unavailable());
        }

        let meta = probe_meta(path)?;
        let frame_len = meta.width as usize * meta.height as usize * 3;

        let mut child = Command::new("ffmpeg")
            .args(["-loglevel", "error", "-i"])
            .arg(path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-an", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::VideoDecode(format!("failed to spawn ffmpeg: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::VideoDecode("failed to open ffmpeg stdout".to_string()))?;

        Ok(Self {
            meta,
            child,
            stdout: Some(stdout),
            frame_len,
        })
    }

    fn wait_decoder(&mut self) -> Result<()> {
        let mut stderr_text = String::new();
        if let Some(mut stderr) = self.child.stderr.take() {
            let _ = stderr.read_to_string(&mut stderr_text);
        }
        let status = self
            .child
            .wait()
            .map_err(|e| Error::VideoDecode(format!("failed to wait for ffmpeg: {e}")))?;
        if !status.success() {
            return Err(Error::VideoDecode(format!(
                "ffmpeg exited with status {status}: {}",
                stderr_text.trim()
            )));
        }
        Ok(())
    }
}

impl FrameSource for FfmpegFrameSource {
    fn meta(&self) -> &VideoMeta {
        &self.meta
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(None);
        };

        let mut buf = vec![0u8; self.frame_len];
        let mut filled = 0usize;
        while filled < buf.len() {
            match stdout.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => {
                    return Err(Error::VideoDecode(format!(
                        "failed to read frame from ffmpeg: {e}"
                    )))
                }
            }
        }

        if filled == 0 {
            // Clean end of stream; surface any decoder failure now.
            self.stdout = None;
            self.wait_decoder()?;
            return Ok(None);
        }
        if filled < self.frame_len {
            return Err(Error::VideoDecode(format!(
                "truncated frame from decoder ({filled} of {} bytes)",
                self.frame_len
            )));
        }

        RgbImage::from_raw(self.meta.width, self.meta.height, buf)
            .map(Some)
            .ok_or_else(|| Error::VideoDecode("frame buffer size mismatch".to_string()))
    }
}

impl Drop for FfmpegFrameSource {
    fn drop(&mut self) {
        if self.stdout.is_some() {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }
}

/// MP4 encoder fed raw frames over an `ffmpeg` child's stdin.
#[derive(Debug)]
pub struct FfmpegFrameSink {
    width: u32,
    height: u32,
    child: Child,
    stdin: Option<ChildStdin>,
}

impl FfmpegFrameSink {
    /// Start an encoder writing to `out_path`.
    ///
    /// `audio_from` maps the audio track of the given file into the output
    /// unchanged in timing (stream-copied to AAC); pass `None` for silent
    /// output. Dimensions must be even and non-zero (yuv420p requirement);
    /// `fps` must match the source so duration is preserved.
    ///
    /// # Errors
    ///
    /// Returns [`Error::VideoEncode`] for invalid parameters and
    /// [`Error::VideoBackendUnavailable`] when ffmpeg is not on PATH.
    pub fn create(
        out_path: &Path,
        width: u32,
        height: u32,
        fps: f64,
        audio_from: Option<&Path>,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::VideoEncode(
                "encode width/height must be non-zero".to_string(),
            ));
        }
        if width % 2 != 0 || height % 2 != 0 {
            return Err(Error::VideoEncode(format!(
                "encode dimensions {width}x{height} must be even (required for yuv420p output)"
            )));
        }
        if !(fps.is_finite() && fps > 0.0) {
            return Err(Error::VideoEncode(format!("invalid frame rate: {fps}")));
        }
        // The muxer is picked from the output extension and must accept
        // the libx264/aac streams this sink produces.
        let ext = out_path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);
        if !matches!(ext.as_deref(), Some("mp4" | "m4v" | "mov")) {
            return Err(Error::VideoEncode(format!(
                "output '{}' must be an mp4/m4v/mov file (this encoder produces libx264/aac)",
                out_path.display()
            )));
        }
        if !is_ffmpeg_available() {
            return Err(backend_unavailable());
        }

        if let Some(parent) = out_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        cmd.args([
            "-y",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
            "-s",
            &format!("{width}x{height}"),
            "-r",
            &format!("{fps}"),
            "-i",
            "pipe:0",
        ]);

        if let Some(audio) = audio_from {
            cmd.arg("-i").arg(audio);
            cmd.args(["-map", "0:v", "-map", "1:a?", "-c:a", "aac", "-shortest"]);
        } else {
            cmd.arg("-an");
        }

        cmd.args([
            "-c:v",
            "libx264",
            "-preset",
            "medium",
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
        ])
        .arg(out_path);

        let mut child = cmd
            .spawn()
            .map_err(|e| Error::VideoEncode(format!("failed to spawn ffmpeg: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::VideoEncode("failed to open ffmpeg stdin".to_string()))?;

        Ok(Self {
            width,
            height,
            child,
            stdin: Some(stdin),
        })
    }
}

impl FrameSink for FfmpegFrameSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(Error::VideoEncode(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )));
        }

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(Error::VideoEncode(
                "ffmpeg encoder is already finalized".to_string(),
            ));
        };

        stdin
            .write_all(frame.as_raw())
            .map_err(|e| Error::VideoEncode(format!("failed to write frame to ffmpeg: {e}")))
    }

    fn finish(&mut self) -> Result<()> {
        drop(self.stdin.take());

        let mut stderr_text = String::new();
        if let Some(mut stderr) = self.child.stderr.take() {
            let _ = stderr.read_to_string(&mut stderr_text);
        }
        let status = self
            .child
            .wait()
            .map_err(|e| Error::VideoEncode(format!("failed to wait for ffmpeg: {e}")))?;
        if !status.success() {
            return Err(Error::VideoEncode(format!(
                "ffmpeg exited with status {status}: {}",
                stderr_text.trim()
            )));
        }
        Ok(())
    }
}

impl Drop for FfmpegFrameSink {
    fn drop(&mut self) {
        if self.stdin.is_some() {
            drop(self.stdin.take());
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_rate_parses_rational_and_decimal_forms() {
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("25").unwrap() - 25.0).abs() < f64::EPSILON);
        assert!((parse_frame_rate("24/1").unwrap() - 24.0).abs() < f64::EPSILON);
    }

    #[test]
    fn frame_rate_rejects_zero_and_garbage() {
        assert!(parse_frame_rate("0/0").is_err());
        assert!(parse_frame_rate("0").is_err());
        assert!(parse_frame_rate("not-a-rate").is_err());
    }

    #[test]
    fn sink_rejects_odd_dimensions_before_spawning() {
        let err = FfmpegFrameSink::create(Path::new("out.mp4"), 101, 100, 30.0, None).unwrap_err();
        assert!(matches!(err, Error::VideoEncode(_)));

        let err = FfmpegFrameSink::create(Path::new("out.mp4"), 100, 0, 30.0, None).unwrap_err();
        assert!(matches!(err, Error::VideoEncode(_)));
    }

    #[test]
    fn sink_rejects_bad_frame_rate() {
        let err = FfmpegFrameSink::create(Path::new("out.mp4"), 100, 100, 0.0, None).unwrap_err();
        assert!(matches!(err, Error::VideoEncode(_)));
    }

    #[test]
    fn sink_rejects_non_mp4_output_names() {
        let err = FfmpegFrameSink::create(Path::new("out.webm"), 100, 100, 30.0, None).unwrap_err();
        assert!(matches!(err, Error::VideoEncode(_)));

        let err = FfmpegFrameSink::create(Path::new("out.mkv"), 100, 100, 30.0, None).unwrap_err();
        assert!(matches!(err, Error::VideoEncode(_)));

        let err = FfmpegFrameSink::create(Path::new("out"), 100, 100, 30.0, None).unwrap_err();
        assert!(matches!(err, Error::VideoEncode(_)));
    }
}
