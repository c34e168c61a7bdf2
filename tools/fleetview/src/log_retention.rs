use crate::errors::FleetviewError;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

/// Deletes the oldest logs belonging to `log_path` until their combined size
/// fits within `budget_bytes`. Returns the deleted paths, oldest first.
///
/// A file belongs to the log when it sits in the same directory, shares its
/// extension and its name starts with the log's file stem
/// (`fleetview.jsonl`, `fleetview.1.jsonl`, ...). Anything else in the
/// directory is neither counted nor deleted.
pub fn enforce_total_budget(log_path: &Path, budget_bytes: u64) -> Result<Vec<PathBuf>, FleetviewError> {
    let Some(stem) = log_path.file_stem().and_then(OsStr::to_str) else {
        return Ok(Vec::new());
    };
    let extension = log_path.extension();
    let dir = log_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut files = fs::read_dir(dir)
        .map_err(|e| FleetviewError::Io(format!("{}: {e}", dir.display())))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && owned_by_log(path, stem, extension))
        .filter_map(|path| {
            let meta = fs::metadata(&path).ok()?;
            Some((meta.modified().ok(), meta.len(), path))
        })
        .collect::<Vec<_>>();

    files.sort_by(|a, b| a.0.cmp(&b.0));

    let mut total = files.iter().map(|(_, len, _)| *len).sum::<u64>();
    let mut deleted = Vec::new();
    for (_, len, path) in files {
        if total <= budget_bytes {
            break;
        }
        fs::remove_file(&path).map_err(|e| FleetviewError::Io(format!("{}: {e}", path.display())))?;
        total = total.saturating_sub(len);
        deleted.push(path);
    }

    Ok(deleted)
}

fn owned_by_log(path: &Path, stem: &str, extension: Option<&OsStr>) -> bool {
    if path.extension() != extension {
        return false;
    }
    path.file_name()
        .and_then(OsStr::to_str)
        .is_some_and(|name| name.starts_with(stem))
}

#[cfg(test)]
mod tests {
    use super::enforce_total_budget;
    use std::fs;

    #[test]
    fn prunes_oldest_files_until_budget_is_met() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("fleetview.1.jsonl"), vec![0u8; 40]).expect("old");
        std::thread::sleep(std::time::Duration::from_millis(20));
        fs::write(dir.path().join("fleetview.jsonl"), vec![0u8; 40]).expect("current");

        let deleted = enforce_total_budget(&dir.path().join("fleetview.jsonl"), 50).expect("pruned");
        assert_eq!(deleted.len(), 1);
        assert!(deleted[0].ends_with("fleetview.1.jsonl"));
        assert!(dir.path().join("fleetview.jsonl").exists());
    }

    #[test]
    fn under_budget_keeps_everything() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("fleetview.jsonl"), vec![0u8; 10]).expect("log");
        assert!(enforce_total_budget(&dir.path().join("fleetview.jsonl"), 50)
            .expect("pruned")
            .is_empty());
    }

    #[test]
    fn files_the_log_does_not_own_are_never_counted_or_deleted() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("operator-notes.txt"), vec![0u8; 200]).expect("notes");
        fs::write(dir.path().join("other.jsonl"), vec![0u8; 200]).expect("other");
        fs::write(dir.path().join("fleetview.txt"), vec![0u8; 200]).expect("same stem");
        std::thread::sleep(std::time::Duration::from_millis(20));
        fs::write(dir.path().join("fleetview.jsonl"), vec![0u8; 10]).expect("log");

        let deleted = enforce_total_budget(&dir.path().join("fleetview.jsonl"), 100).expect("pruned");
        assert!(deleted.is_empty());
        assert!(dir.path().join("operator-notes.txt").exists());
        assert!(dir.path().join("other.jsonl").exists());
        assert!(dir.path().join("fleetview.txt").exists());
    }
}
