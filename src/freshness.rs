//! Staleness decision for the local snapshot.

use std::fs;
use std::io::{self, ErrorKind};
use std::path::Path;
use std::time::{Duration, SystemTime};

/// Outcome of the freshness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// No snapshot exists locally.
    Missing,
    /// The snapshot exists but is older than the staleness threshold.
    Stale,
    /// The snapshot is recent enough to serve from.
    Fresh,
}

/// Evaluates whether the snapshot at `path` needs a refresh.
///
/// Creates the containing directory if it does not exist yet, since the
/// downloader stages its files there. Wall-clock comparison is fine here:
/// the source republishes on a daily cadence, so strict ordering is not
/// required.
pub fn evaluate(path: &Path, threshold: Duration) -> io::Result<Freshness> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }

    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Freshness::Missing),
        Err(e) => return Err(e),
    };

    let modified = metadata.modified()?;
    match SystemTime::now().duration_since(modified) {
        Ok(age) if age > threshold => Ok(Freshness::Stale),
        // A modification time in the future (clock skew) counts as fresh.
        _ => Ok(Freshness::Fresh),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    const DAY: Duration = Duration::from_secs(24 * 3600);

    fn file_with_age(dir: &TempDir, age: Duration) -> std::path::PathBuf {
        let path = dir.path().join("latest.db");
        let file = File::create(&path).expect("create snapshot file");
        file.set_modified(SystemTime::now() - age)
            .expect("set mtime");
        path
    }

    #[test]
    fn missing_file_reports_missing() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("latest.db");
        assert_eq!(evaluate(&path, DAY).unwrap(), Freshness::Missing);
    }

    #[test]
    fn missing_file_creates_parent_directory() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("files").join("latest.db");
        assert_eq!(evaluate(&path, DAY).unwrap(), Freshness::Missing);
        assert!(dir.path().join("files").is_dir());
    }

    #[test]
    fn file_just_inside_threshold_is_fresh() {
        let dir = TempDir::new().expect("temp dir");
        let path = file_with_age(&dir, DAY - Duration::from_secs(60));
        assert_eq!(evaluate(&path, DAY).unwrap(), Freshness::Fresh);
    }

    #[test]
    fn file_just_past_threshold_is_stale() {
        let dir = TempDir::new().expect("temp dir");
        let path = file_with_age(&dir, DAY + Duration::from_secs(60));
        assert_eq!(evaluate(&path, DAY).unwrap(), Freshness::Stale);
    }

    #[test]
    fn future_mtime_is_fresh() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("latest.db");
        let file = File::create(&path).expect("create snapshot file");
        file.set_modified(SystemTime::now() + Duration::from_secs(3600))
            .expect("set mtime");
        assert_eq!(evaluate(&path, DAY).unwrap(), Freshness::Fresh);
    }
}
