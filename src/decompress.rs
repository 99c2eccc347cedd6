//! Snapshot decompression with atomic installation.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use flate2::read::GzDecoder;
use log::info;
use tempfile::NamedTempFile;

use crate::error_handling::DecompressError;

/// Decompresses the gzip file at `src` and installs it at `dest`.
///
/// The decompressed stream goes to a temporary file in `dest`'s directory
/// and is renamed onto `dest` only on full success. Readers mid-query keep
/// the old inode; a truncated or corrupt archive leaves the prior dataset
/// exactly as it was.
///
/// This is blocking file I/O; callers on the async runtime wrap it in
/// `spawn_blocking`.
pub fn decompress_snapshot(src: &Path, dest: &Path) -> Result<(), DecompressError> {
    let reader = File::open(src)?;
    let mut decoder = GzDecoder::new(BufReader::new(reader));

    // Same directory as dest so the final rename stays on one filesystem.
    let dir = dest.parent().unwrap_or_else(|| Path::new("."));
    let mut staging = NamedTempFile::new_in(dir)?;

    let written = io::copy(&mut decoder, staging.as_file_mut())?;
    staging.as_file().sync_all()?;
    staging.persist(dest)?;

    info!("Decompressed snapshot ({} bytes) to {}", written, dest.display());
    Ok(())
}
