#![cfg(test)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::tempdir;

use crate::extensibility::search_rules::{probe, probe_resource, probing_failure_message, search_paths};

#[test]
fn test_search_paths_order() {
    let base = Path::new("/plugins/acme");
    let paths = search_paths(base, &["lib".to_string(), "x64".to_string()], None);

    assert_eq!(
        paths,
        vec![
            PathBuf::from("/plugins/acme"),
            PathBuf::from("/plugins/acme/bin"),
            PathBuf::from("/plugins/acme/lib"),
            PathBuf::from("/plugins/acme/bin/lib"),
            PathBuf::from("/plugins/acme/x64"),
            PathBuf::from("/plugins/acme/bin/x64"),
        ]
    );
}

#[test]
fn test_search_paths_with_relative_suffix() {
    let paths = search_paths(Path::new("/p"), &[], Some(Path::new("m.dll")));
    assert_eq!(paths, vec![PathBuf::from("/p/m.dll"), PathBuf::from("/p/bin/m.dll")]);
}

#[test]
fn test_probe_returns_first_existing_candidate() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("bin")).unwrap();
    fs::write(dir.path().join("bin").join("m.dll"), b"").unwrap();

    let found = probe(dir.path(), &[], Path::new("m.dll")).unwrap();
    assert_eq!(found, dir.path().join("bin").join("m.dll"));

    fs::write(dir.path().join("m.dll"), b"").unwrap();
    let found = probe(dir.path(), &[], Path::new("m.dll")).unwrap();
    assert_eq!(found, dir.path().join("m.dll"));
}

#[test]
fn test_module_search_skips_directories() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("m.dll")).unwrap();

    let attempted = probe(dir.path(), &[], Path::new("m.dll")).unwrap_err();
    assert_eq!(attempted, vec![dir.path().join("m.dll"), dir.path().join("bin").join("m.dll")]);

    fs::create_dir_all(dir.path().join("bin")).unwrap();
    fs::write(dir.path().join("bin").join("m.dll"), b"").unwrap();
    let found = probe(dir.path(), &[], Path::new("m.dll")).unwrap();
    assert_eq!(found, dir.path().join("bin").join("m.dll"));
}

#[test]
fn test_resource_search_accepts_directories() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("bin").join("icons")).unwrap();

    let found = probe_resource(dir.path(), &[], Path::new("icons")).unwrap();
    assert_eq!(found, dir.path().join("bin").join("icons"));
}

#[test]
fn test_probe_reports_attempted_paths() {
    let dir = tempdir().unwrap();
    let attempted = probe(dir.path(), &["extra".to_string()], Path::new("gone.dll")).unwrap_err();
    assert_eq!(attempted.len(), 4);

    let absolute = dir.path().join("absent.dll");
    let attempted = probe(Path::new("/unused"), &[], &absolute).unwrap_err();
    assert_eq!(attempted, vec![absolute]);
}

#[test]
fn test_probing_failure_message() {
    let message = probing_failure_message("Acme", &[PathBuf::from("/a/x"), PathBuf::from("/a/bin/x")]);
    assert_eq!(
        message,
        "Could not find module 'Acme' after probing for its location in '/a/x', '/a/bin/x'."
    );
}
