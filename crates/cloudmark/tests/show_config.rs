use std::fs;
use std::process::Command;

use tempfile::TempDir;

fn cloudmark(config_dir: &std::path::Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_cloudmark"));
    command
        .env("CLOUDMARK_CONFIG_DIR", config_dir)
        .env_remove("CLOUDMARK_CONFIG")
        .env("RUST_LOG", "off");
    command
}

fn show_config(command: &mut Command) -> toml::Value {
    let output = command.output().expect("failed to run cloudmark show-config");
    assert!(
        output.status.success(),
        "show-config failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8(output.stdout).expect("utf-8 output");
    toml::from_str(&stdout).expect("show-config prints TOML")
}

#[test]
fn show_config_prints_defaults_without_a_file() {
    let root = TempDir::new().unwrap();
    let value = show_config(cloudmark(root.path()).arg("show-config"));

    assert_eq!(value["label"]["text"].as_str(), Some("Абоба"));
    assert_eq!(value["window"]["width"].as_integer(), Some(1280));
    assert_eq!(value["window"]["height"].as_integer(), Some(720));
    assert_eq!(value["gpu"]["color_space"].as_str(), Some("auto"));
}

#[test]
fn default_config_file_is_layered_under_flags() {
    let root = TempDir::new().unwrap();
    fs::write(
        root.path().join("config.toml"),
        concat!(
            "[label]\ntext = \"from file\"\n\n",
            "[window]\nwidth = 640\nheight = 480\n\n",
            "[palette]\nseed = 11\n",
        ),
    )
    .unwrap();

    let value = show_config(cloudmark(root.path()).args(["--size", "800x600", "show-config"]));

    assert_eq!(value["label"]["text"].as_str(), Some("from file"));
    assert_eq!(value["window"]["width"].as_integer(), Some(800));
    assert_eq!(value["window"]["height"].as_integer(), Some(600));
    assert_eq!(value["palette"]["seed"].as_integer(), Some(11));
}

#[test]
fn explicit_config_path_wins_over_default_location() {
    let root = TempDir::new().unwrap();
    fs::write(root.path().join("config.toml"), "[label]\ntext = \"default\"\n").unwrap();
    let explicit = root.path().join("other.toml");
    fs::write(&explicit, "[label]\ntext = \"explicit\"\n").unwrap();

    let value = show_config(
        cloudmark(root.path())
            .arg("--config")
            .arg(&explicit)
            .arg("show-config"),
    );

    assert_eq!(value["label"]["text"].as_str(), Some("explicit"));
}

#[test]
fn invalid_config_file_fails_before_rendering() {
    let root = TempDir::new().unwrap();
    fs::write(root.path().join("config.toml"), "[window]\nwidth = 0\n").unwrap();

    let output = cloudmark(root.path())
        .arg("show-config")
        .output()
        .expect("failed to run cloudmark");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid"));
}

#[test]
fn missing_explicit_config_is_an_error() {
    let root = TempDir::new().unwrap();
    let output = cloudmark(root.path())
        .arg("--config")
        .arg(root.path().join("absent.toml"))
        .arg("show-config")
        .output()
        .expect("failed to run cloudmark");

    assert!(!output.status.success());
}
