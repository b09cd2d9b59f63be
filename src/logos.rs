//! Logo loading and library discovery.
//!
//! Directory scans report a per-file outcome instead of silently dropping
//! files that fail to decode: the caller decides what to surface.

use std::path::Path;

use image::RgbaImage;

use crate::error::Result;

/// Load a logo image from disk, converting to RGBA.
///
/// # Errors
///
/// Returns [`crate::Error::Image`] if the file cannot be opened or decoded.
pub fn load_logo(path: &Path) -> Result<RgbaImage> {
    Ok(image::open(path)?.to_rgba8())
}

/// Decode an uploaded logo from raw bytes, converting to RGBA.
///
/// # Errors
///
/// Returns [`crate::Error::Image`] if the bytes cannot be decoded.
pub fn load_logo_bytes(bytes: &[u8]) -> Result<RgbaImage> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

/// One file found during a logo library scan.
#[derive(Debug)]
pub struct LogoScanEntry {
    /// File name within the scanned directory.
    pub name: String,
    /// The decoded logo, or the reason it could not be loaded.
    pub result: Result<RgbaImage>,
}

/// Check if a file has a logo-library extension (png/jpg/jpeg).
#[must_use]
pub fn is_logo_file(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(ext.to_lowercase().as_str(), "png" | "jpg" | "jpeg"),
        None => false,
    }
}

/// Scan a directory for logo images.
///
/// Returns one entry per candidate file, sorted by name, each carrying
/// either the decoded image or its individual load error. A file that fails
/// to decode never hides the rest of the library.
///
/// # Errors
///
/// Returns [`crate::Error::Io`] if the directory itself cannot be read.
pub fn scan_logo_directory(dir: &Path) -> Result<Vec<LogoScanEntry>> {
    let mut paths: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
        .map(|e| e.path())
        .filter(|p| is_logo_file(p))
        .collect();
    paths.sort();

    Ok(paths
        .into_iter()
        .map(|path| {
            let name = path
                .file_name()
                .map_or_else(|| path.display().to_string(), |f| f.to_string_lossy().to_string());
            LogoScanEntry {
                result: load_logo(&path),
                name,
            }
        })
        .collect())
}
