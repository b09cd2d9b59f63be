//! Error types for the logostamp crate.

/// Errors that can occur while stamping logos onto media.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The logo image has a zero width or height and cannot be scaled.
    #[error("logo has invalid dimensions ({width}x{height}), cannot compute aspect ratio")]
    InvalidLogoAspect {
        /// Logo width in pixels.
        width: u32,
        /// Logo height in pixels.
        height: u32,
    },

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The image format is not supported.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// An error occurred during image processing (load, save, encode).
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// ffmpeg/ffprobe is not installed or not on PATH.
    #[error("video backend unavailable: {0}")]
    VideoBackendUnavailable(String),

    /// The video decode pipeline reported a failure.
    #[error("video decode failed: {0}")]
    VideoDecode(String),

    /// The video encode pipeline reported a failure.
    #[error("video encode failed: {0}")]
    VideoEncode(String),
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let io_err = Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(io_err.to_string().contains("gone"));

        let unsupported = Error::UnsupportedFormat("tiff".to_string());
        assert!(unsupported.to_string().contains("tiff"));

        let bad_logo = Error::InvalidLogoAspect {
            width: 0,
            height: 20,
        };
        let msg = bad_logo.to_string();
        assert!(msg.contains("0x20"));

        let no_backend = Error::VideoBackendUnavailable("ffmpeg not found".to_string());
        assert!(no_backend.to_string().contains("ffmpeg"));
    }
}
