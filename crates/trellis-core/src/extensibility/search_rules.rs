//! Module and resource probing relative to a plugin's base directory.
use std::path::{Path, PathBuf};

const BIN_DIRECTORY: &str = "bin";

/// The directories searched for a plugin's files, in order: the base
/// directory, its `bin` subdirectory, then `P` and `bin/P` for each probing
/// path `P`. When `relative` is given it is appended to every directory.
pub fn search_paths(base_directory: &Path, probing_paths: &[String], relative: Option<&Path>) -> Vec<PathBuf> {
    let bin = base_directory.join(BIN_DIRECTORY);
    let mut directories = vec![base_directory.to_path_buf(), bin.clone()];
    for probing_path in probing_paths {
        directories.push(base_directory.join(probing_path));
        directories.push(bin.join(probing_path));
    }
    match relative {
        Some(relative) => directories.into_iter().map(|dir| dir.join(relative)).collect(),
        None => directories,
    }
}

/// Locates the file `location`, returning every attempted path when no
/// candidate is a file. Directories never satisfy the probe.
///
/// Absolute locations are tried as-is.
pub fn probe(base_directory: &Path, probing_paths: &[String], location: &Path) -> Result<PathBuf, Vec<PathBuf>> {
    probe_matching(base_directory, probing_paths, location, Path::is_file)
}

/// Like [`probe`], but any existing entry, file or directory, is accepted.
pub fn probe_resource(
    base_directory: &Path,
    probing_paths: &[String],
    location: &Path,
) -> Result<PathBuf, Vec<PathBuf>> {
    probe_matching(base_directory, probing_paths, location, Path::exists)
}

fn probe_matching(
    base_directory: &Path,
    probing_paths: &[String],
    location: &Path,
    accept: fn(&Path) -> bool,
) -> Result<PathBuf, Vec<PathBuf>> {
    let candidates = if location.is_absolute() {
        vec![location.to_path_buf()]
    } else {
        search_paths(base_directory, probing_paths, Some(location))
    };
    match candidates.iter().find(|candidate| accept(candidate.as_path())) {
        Some(found) => Ok(found.clone()),
        None => Err(candidates),
    }
}

pub fn probing_failure_message(module_name: &str, attempted: &[PathBuf]) -> String {
    let attempted = attempted
        .iter()
        .map(|path| format!("'{}'", path.display()))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Could not find module '{}' after probing for its location in {}.",
        module_name, attempted
    )
}
