use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Find files recursively in a directory that match a predicate.
///
/// A missing path yields no files. Entries are visited in name order so
/// results are stable across platforms.
pub fn find_files<P, F>(path: P, predicate: &F) -> io::Result<Vec<PathBuf>>
where
    P: AsRef<Path>,
    F: Fn(&Path) -> bool + ?Sized,
{
    let path = path.as_ref();
    let mut result = Vec::new();

    if !path.exists() {
        return Ok(result);
    }

    if path.is_file() {
        if predicate(path) {
            result.push(path.to_path_buf());
        }
        return Ok(result);
    }

    let mut entries = fs::read_dir(path)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;
    entries.sort();

    for entry_path in entries {
        if entry_path.is_file() {
            if predicate(&entry_path) {
                result.push(entry_path);
            }
        } else if entry_path.is_dir() {
            let mut sub_results = find_files(&entry_path, predicate)?;
            result.append(&mut sub_results);
        }
    }

    Ok(result)
}

/// Find files with a specific extension, compared case-insensitively
pub fn find_files_with_extension<P: AsRef<Path>>(path: P, extension: &str) -> io::Result<Vec<PathBuf>> {
    let extension_lower = extension.to_lowercase();
    find_files(path, &move |p: &Path| match p.extension() {
        Some(ext) => ext.to_string_lossy().to_lowercase() == extension_lower,
        None => false,
    })
}

/// Last modification time of a file
pub fn modified_time<P: AsRef<Path>>(path: P) -> io::Result<SystemTime> {
    fs::metadata(path)?.modified()
}
