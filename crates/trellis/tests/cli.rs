use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn trellis(cwd: &Path) -> Result<Command, Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("trellis")?;
    cmd.current_dir(cwd).env_remove("RUST_LOG");
    Ok(cmd)
}

fn write_plugin(dir: &Path, file: &str, contents: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(file), contents).unwrap();
}

#[test]
fn test_list_shows_builtin_plugin() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;

    trellis(dir.path())?
        .args(["--no-cache", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("BuiltIn"))
        .stdout(predicate::str::contains("service BuiltIn.ServiceLocator"))
        .stdout(predicate::str::contains("component BuiltIn.ResourceLocator"));

    Ok(())
}

#[test]
fn test_list_groups_components_under_their_plugin() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let plugins = dir.path().join("descriptors");
    write_plugin(
        &plugins,
        "provider.plugin",
        r#"{
  "plugin_id": "Provider",
  "services": [{ "service_id": "Provider.Service", "service_type": "Provider.IService, provider" }],
  "components": [{ "component_id": "Provider.Main", "service_id": "Provider.Service", "component_type": "Provider.Main, provider" }]
}"#,
    );
    write_plugin(
        &plugins,
        "extension.plugin",
        r#"{
  "plugin_id": "Extension",
  "dependencies": ["Provider"],
  "components": [{ "component_id": "Extension.Extra", "service_id": "Provider.Service", "component_type": "Extension.Extra, extension" }]
}"#,
    );

    let output = trellis(dir.path())?
        .args(["--no-cache", "list", "-p"])
        .arg(&plugins)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8(output)?;
    let position = |needle: &str| stdout.find(needle).ok_or_else(|| format!("'{}' missing from:\n{}", needle, stdout));

    assert!(position("\nProvider\n")? < position("component Provider.Main -> Provider.Service")?);
    assert!(position("component Provider.Main")? < position("\nExtension\n")?);
    assert!(position("\nExtension\n")? < position("component Extension.Extra -> Provider.Service")?);

    Ok(())
}

#[test]
fn test_list_reports_disabled_plugins() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let plugins = dir.path().join("descriptors");
    write_plugin(
        &plugins,
        "broken.plugin",
        r#"{ "plugin_id": "Broken", "modules": [{ "name": "Native", "location": "native.so" }] }"#,
    );

    trellis(dir.path())?
        .args(["--no-cache", "list", "--plugin-path"])
        .arg(&plugins)
        .assert()
        .success()
        .stdout(predicate::str::contains("Broken (disabled: Could not find module 'Native'"));

    Ok(())
}

#[test]
fn test_scans_default_plugins_directory() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write_plugin(&dir.path().join("plugins"), "local.plugin", r#"{ "plugin_id": "Local" }"#);

    trellis(dir.path())?
        .args(["--no-cache", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Local"));

    Ok(())
}

#[test]
fn test_define_selects_descriptor_content() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let plugins = dir.path().join("descriptors");
    write_plugin(
        &plugins,
        "variant.plugin",
        "{\n#if NIGHTLY\n  \"plugin_id\": \"Nightly\"\n#else\n  \"plugin_id\": \"Stable\"\n#endif\n}\n",
    );

    trellis(dir.path())?
        .args(["--no-cache", "-D", "NIGHTLY", "list", "-p"])
        .arg(&plugins)
        .assert()
        .success()
        .stdout(predicate::str::contains("Nightly"))
        .stdout(predicate::str::contains("Stable").not());

    Ok(())
}

#[test]
fn test_config_file_names_plugin_directories() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write_plugin(&dir.path().join("setup").join("extra"), "extra.plugin", r#"{ "plugin_id": "Extra" }"#);
    fs::write(
        dir.path().join("setup").join("trellis.json"),
        r#"{ "plugin_directories": ["extra"], "cache": { "enabled": false } }"#,
    )?;

    trellis(dir.path())?
        .args(["list", "--config"])
        .arg(dir.path().join("setup").join("trellis.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Extra"));

    Ok(())
}

#[test]
fn test_missing_config_file_fails() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;

    trellis(dir.path())?
        .args(["list", "--config", "absent.json"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Error:"));

    Ok(())
}

#[test]
fn test_cache_dir_receives_snapshot() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let plugins = dir.path().join("descriptors");
    let cache = dir.path().join("cache");
    write_plugin(&plugins, "cached.plugin", r#"{ "plugin_id": "Cached" }"#);

    for _ in 0..2 {
        trellis(dir.path())?
            .args(["list", "-p"])
            .arg(&plugins)
            .arg("--cache-dir")
            .arg(&cache)
            .assert()
            .success()
            .stdout(predicate::str::contains("Cached"));
    }

    let snapshots = fs::read_dir(&cache)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "json"))
        .count();
    assert_eq!(snapshots, 1);

    Ok(())
}

#[test]
fn test_verify_builtins_succeeds() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;

    trellis(dir.path())?
        .args(["--no-cache", "verify"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Installation verified."));

    Ok(())
}

#[test]
fn test_verify_fails_for_unknown_component_type() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let plugins = dir.path().join("descriptors");
    write_plugin(
        &plugins,
        "unknown.plugin",
        r#"{
  "plugin_id": "Unknown",
  "services": [{ "service_id": "Unknown.Service", "service_type": "Unknown.IService, unknown" }],
  "components": [{ "component_id": "Unknown.Component", "service_id": "Unknown.Service", "component_type": "Unknown.Impl, unknown" }]
}"#,
    );

    trellis(dir.path())?
        .args(["--no-cache", "verify", "-p"])
        .arg(&plugins)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Installation has errors."))
        .stderr(predicate::str::contains("Unknown.Component"));

    Ok(())
}
