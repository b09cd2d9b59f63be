//! Archive collaborator contract for multi-file downloads.
//!
//! The packaging format (zip, tar, whatever the caller serves) is not this
//! crate's concern; the engine only needs somewhere to put named output
//! bytes. See [`crate::StampEngine::process_directory_to_archive`].

use crate::error::Result;

/// Receives named output files and packages them for download.
pub trait ArchiveWriter {
    /// Add one output file. May be called any number of times; names are
    /// taken as-is (the engine guarantees uniqueness within a batch).
    ///
    /// # Errors
    ///
    /// Propagates packaging failures unchanged.
    fn add(&mut self, name: &str, bytes: &[u8]) -> Result<()>;

    /// Finalize the archive and return its bytes.
    ///
    /// # Errors
    ///
    /// Propagates packaging failures unchanged.
    fn finalize(&mut self) -> Result<Vec<u8>>;
}
