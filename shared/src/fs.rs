//! Filesystem helpers shared across the pipeline tools.

use std::path::Path;
use std::time::SystemTime;

use anyhow::{Context, Result};

/// Modification time of a file.
pub fn modified_time(path: &Path) -> Result<SystemTime> {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .with_context(|| format!("Failed to read modification time: {}", path.display()))
}

/// Newest modification time among `paths`, or `None` for an empty set.
///
/// Fails if any of the files cannot be inspected.
pub fn newest_modified<'a, I>(paths: I) -> Result<Option<SystemTime>>
where
    I: IntoIterator<Item = &'a Path>,
{
    let mut newest: Option<SystemTime> = None;
    for path in paths {
        let mtime = modified_time(path)?;
        if newest.is_none_or(|n| mtime > n) {
            newest = Some(mtime);
        }
    }
    Ok(newest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_newest_modified_picks_latest() {
        let dir = tempdir().unwrap();
        let old = dir.path().join("old.txt");
        let new = dir.path().join("new.txt");
        std::fs::write(&old, b"a").unwrap();
        std::fs::write(&new, b"b").unwrap();

        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        std::fs::File::options()
            .write(true)
            .open(&old)
            .unwrap()
            .set_modified(base)
            .unwrap();
        std::fs::File::options()
            .write(true)
            .open(&new)
            .unwrap()
            .set_modified(base + Duration::from_secs(60))
            .unwrap();

        let newest = newest_modified([old.as_path(), new.as_path()]).unwrap();
        assert_eq!(newest, Some(base + Duration::from_secs(60)));
    }

    #[test]
    fn test_newest_modified_empty() {
        assert_eq!(newest_modified(std::iter::empty()).unwrap(), None);
    }

    #[test]
    fn test_modified_time_missing_file() {
        let dir = tempdir().unwrap();
        let err = modified_time(&dir.path().join("missing")).unwrap_err();
        assert!(err.to_string().contains("modification time"));
    }
}
