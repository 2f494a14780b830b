use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn framelink(config_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_framelink"))
        .env("FRAMELINK_CONFIG_DIR", config_dir)
        .env_remove("FRAMELINK_CONFIG")
        .env("RUST_LOG", "error")
        .args(args)
        .output()
        .expect("failed to run framelink")
}

#[test]
fn cpu_run_exports_upright_png() {
    let root = TempDir::new().unwrap();
    let export = root.path().join("frame.png");
    let output = framelink(
        root.path(),
        &[
            "run",
            "--backend",
            "software",
            "--path",
            "cpu",
            "--frames",
            "2",
            "--size",
            "24x16",
            "--export",
            export.to_str().unwrap(),
        ],
    );
    assert!(output.status.success(), "{output:?}");

    let png = image::open(&export).unwrap().to_rgba8();
    assert_eq!(png.dimensions(), (24, 16));
    assert_eq!(png.get_pixel(23, 0).0, [255, 255, 255, 255]);
    assert_ne!(png.get_pixel(23, 15).0, [255, 255, 255, 255]);
}

#[test]
fn config_file_drives_the_run() {
    let root = TempDir::new().unwrap();
    let captures = root.path().join("captures");
    fs::create_dir_all(&captures).unwrap();
    fs::write(
        root.path().join("framelink.toml"),
        format!(
            r#"
version = 1

[receiver]
path = "gpu"
backend = "software"
poll_interval = "1ms"
frames = 2

[producer]
app_name = "Configured"
server_name = "Visuals"
width = 8
height = 8

[export]
path = "{}"
"#,
            captures.display()
        ),
    )
    .unwrap();

    let output = framelink(root.path(), &[]);
    assert!(output.status.success(), "{output:?}");

    let exported: Vec<_> = fs::read_dir(&captures).unwrap().collect();
    assert_eq!(exported.len(), 1);
    let name = exported[0].as_ref().unwrap().file_name();
    assert!(name.to_string_lossy().starts_with("framelink-"));
}

#[test]
fn describe_prints_json() {
    let root = TempDir::new().unwrap();
    let output = framelink(root.path(), &["describe", "framelink", "--json"]);
    assert!(output.status.success(), "{output:?}");

    let description: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(description["app_name"], "framelink");
    assert_eq!(description["server_name"], "Test Pattern");
    assert!(description["uuid"].as_str().is_some());
}

#[test]
fn describe_unknown_server_fails() {
    let root = TempDir::new().unwrap();
    let output = framelink(root.path(), &["describe", "Nobody"]);
    assert!(!output.status.success());
}

#[test]
fn list_shows_the_pattern_server() {
    let root = TempDir::new().unwrap();
    let output = framelink(root.path(), &["list"]);
    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("framelink / Test Pattern"), "{stdout}");
}

#[test]
fn invalid_config_is_reported() {
    let root = TempDir::new().unwrap();
    let config = root.path().join("broken.toml");
    fs::write(&config, "version = 7").unwrap();
    let output = framelink(root.path(), &["--config", config.to_str().unwrap(), "list"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("unsupported config version"), "{stderr}");
}
