use assert_cmd::prelude::*;
use predicates::str::contains;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

const SCENE: &str = r#"<scene>
  <render>
    <width>8</width>
    <height>6</height>
  </render>
  <object>
    <name>Camera</name>
    <type>camera</type>
    <position>0 -5 0</position>
    <rotation>90 0 0</rotation>
  </object>
  <object>
    <name>Cube</name>
    <type>mesh</type>
  </object>
  <object>
    <name>Lamp</name>
    <type>lamp</type>
    <position>2 -2 4</position>
  </object>
</scene>
"#;

fn scene_dir(scene: &str) -> TempDir {
    let dir = tempfile::tempdir().expect("temp dir");
    fs::write(dir.path().join("scene.xml"), scene).expect("write scene");
    dir
}

fn bridge() -> Command {
    Command::cargo_bin("rendergirl-bridge").expect("binary exists")
}

#[test]
fn cli_renders_scene_and_reports_through_session() {
    let dir = scene_dir(SCENE);
    bridge()
        .arg(dir.path().join("scene.xml"))
        .assert()
        .success()
        .stdout(contains("Loaded scene with 3 objects (1 lamps)"))
        .stdout(contains(" - Cube (MESH)"))
        .stdout(contains(" - Lamp (LAMP)"))
        .stdout(contains("[INFO] Rendering 8x6 with 1 group(s)"))
        .stdout(contains("Rendered 8x6 frame"));
}

#[test]
fn cli_writes_png_at_requested_size() {
    let dir = scene_dir(SCENE);
    let output = dir.path().join("frame.png");
    bridge()
        .arg(dir.path().join("scene.xml"))
        .args(["--width", "5", "--height", "3", "--output"])
        .arg(&output)
        .assert()
        .success()
        .stdout(contains("Rendered 5x3 frame"));

    let image = image::open(&output).expect("png written").to_rgba8();
    assert_eq!(image.dimensions(), (5, 3));
    assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0, 255]);
}

#[test]
fn cli_config_resolution_overrides_scene() {
    let dir = scene_dir(SCENE);
    let config = dir.path().join("bridge.toml");
    fs::write(&config, "[resolution]\nx = 40\ny = 20\npercentage = 50\n").expect("write config");
    bridge()
        .arg(dir.path().join("scene.xml"))
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(contains("Rendered 20x10 frame"));
}

#[test]
fn cli_lists_devices() {
    let dir = scene_dir(SCENE);
    bridge()
        .arg(dir.path().join("scene.xml"))
        .arg("--list-devices")
        .assert()
        .success()
        .stdout(contains("1 device(s) available"))
        .stdout(contains(" - Recording device"));
}

#[test]
fn cli_fails_without_camera() {
    let dir = scene_dir("<scene><object><name>Cube</name></object></scene>");
    bridge()
        .arg(dir.path().join("scene.xml"))
        .assert()
        .failure()
        .stdout(contains("[ERROR] invalid input: scene has no camera"))
        .stderr(contains("scene has no camera"));
}

#[test]
fn cli_rejects_unknown_argument() {
    let dir = scene_dir(SCENE);
    bridge()
        .arg(dir.path().join("scene.xml"))
        .arg("--bogus")
        .assert()
        .failure()
        .stderr(contains("Unknown argument: --bogus"));
}

#[cfg(not(feature = "native-engine"))]
#[test]
fn cli_native_requires_feature() {
    let dir = scene_dir(SCENE);
    bridge()
        .arg(dir.path().join("scene.xml"))
        .arg("--native")
        .assert()
        .failure()
        .stderr(contains("native engine unavailable"));
}
