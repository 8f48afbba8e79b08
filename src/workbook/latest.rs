use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};

/// A file seen in an input folder, for diagnostics when inputs are missing
#[derive(Debug, Clone)]
pub struct FolderEntry {
    pub name: String,
    pub modified: Option<DateTime<Local>>,
}

/// Up to `count` files with `extension`, newest first. Excel lock files
/// (`~$name.xlsx`) are skipped; a missing folder yields nothing.
pub fn latest_files(dir: &Path, extension: &str, count: usize) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut files: Vec<(SystemTime, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && has_extension(path, extension) && !is_lock_file(path))
        .map(|path| {
            let modified = fs::metadata(&path)
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, path)
        })
        .collect();

    files.sort_by(|(a_time, a_path), (b_time, b_path)| {
        b_time.cmp(a_time).then_with(|| b_path.cmp(a_path))
    });
    files.into_iter().take(count).map(|(_, path)| path).collect()
}

pub fn latest_file(dir: &Path, extension: &str) -> Option<PathBuf> {
    latest_files(dir, extension, 1).into_iter().next()
}

/// Every entry of `dir` with its modification time; `None` if the folder is missing
pub fn describe_folder(dir: &Path) -> Option<Vec<FolderEntry>> {
    let entries = fs::read_dir(dir).ok()?;
    let mut listing: Vec<FolderEntry> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| FolderEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            modified: entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .map(DateTime::<Local>::from),
        })
        .collect();
    listing.sort_by(|a, b| a.name.cmp(&b.name));
    Some(listing)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    let wanted = extension.trim_start_matches('.');
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(wanted))
}

fn is_lock_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with("~$"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn tmp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ozon_toolkit_latest_{name}"));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn touch(dir: &Path, name: &str, age_secs: u64) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"x").unwrap();
        let when = SystemTime::now() - Duration::from_secs(age_secs);
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(when)
            .unwrap();
        path
    }

    #[test]
    fn newest_first_and_filtered_by_extension() {
        let dir = tmp_dir("order");
        touch(&dir, "old.xlsx", 300);
        let newest = touch(&dir, "new.XLSX", 10);
        let middle = touch(&dir, "mid.xlsx", 100);
        touch(&dir, "notes.txt", 1);
        touch(&dir, "~$new.xlsx", 0);

        assert_eq!(latest_files(&dir, ".xlsx", 2), vec![newest.clone(), middle]);
        assert_eq!(latest_file(&dir, "xlsx"), Some(newest));
        assert_eq!(latest_file(&dir, ".xlsm"), None);
    }

    #[test]
    fn missing_folder_is_empty_not_an_error() {
        let dir = std::env::temp_dir().join("ozon_toolkit_latest_absent_folder");
        let _ = fs::remove_dir_all(&dir);
        assert!(latest_files(&dir, ".xlsx", 2).is_empty());
        assert!(describe_folder(&dir).is_none());
    }

    #[test]
    fn describe_lists_names_sorted() {
        let dir = tmp_dir("describe");
        touch(&dir, "b.xlsx", 5);
        touch(&dir, "a.csv", 5);
        let names: Vec<String> = describe_folder(&dir)
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["a.csv".to_string(), "b.xlsx".to_string()]);
    }
}
