#![cfg(feature = "cli")]

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

fn write_png(path: &Path) {
    let mut img = image::RgbImage::from_pixel(6, 4, image::Rgb([20, 20, 20]));
    img.put_pixel(3, 2, image::Rgb([250, 10, 12]));
    img.save(path).expect("write png");
}

fn colorwatch() -> Command {
    let mut cmd = Command::cargo_bin("colorwatch").expect("binary");
    cmd.env_remove("COLORWATCH_PREFS");
    cmd
}

#[test]
fn check_reports_first_match() {
    let dir = tempfile::tempdir().unwrap();
    let img = dir.path().join("frame.png");
    let prefs = dir.path().join("prefs.json");
    write_png(&img);

    colorwatch()
        .arg("check")
        .arg(&img)
        .args(["--color", "#ff0000", "--tolerance", "12"])
        .arg("--prefs")
        .arg(&prefs)
        .assert()
        .success()
        .stdout(predicate::str::contains("match at (3, 2)"));

    colorwatch()
        .arg("check")
        .arg(&img)
        .args(["--color", "#ff0000", "--tolerance", "4"])
        .arg("--prefs")
        .arg(&prefs)
        .assert()
        .success()
        .stdout(predicate::str::contains("no match"));
}

#[test]
fn check_rejects_invalid_inputs() {
    let dir = tempfile::tempdir().unwrap();
    let img = dir.path().join("frame.png");
    write_png(&img);

    colorwatch()
        .arg("check")
        .arg(&img)
        .args(["--color", "red"])
        .arg("--prefs")
        .arg(dir.path().join("prefs.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid target color"));

    colorwatch()
        .arg("check")
        .arg(&img)
        .args(["--tolerance", "-1"])
        .arg("--prefs")
        .arg(dir.path().join("prefs.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid tolerance"));
}

#[test]
fn pick_from_image_persists_target_color() {
    let dir = tempfile::tempdir().unwrap();
    let img = dir.path().join("frame.png");
    let prefs = dir.path().join("nested").join("prefs.json");
    write_png(&img);

    colorwatch()
        .args(["pick", "--x", "3", "--y", "2", "--image"])
        .arg(&img)
        .arg("--prefs")
        .arg(&prefs)
        .assert()
        .success()
        .stdout(predicate::str::contains("#fa0a0c"));

    let saved = std::fs::read_to_string(&prefs).unwrap();
    let map: std::collections::BTreeMap<String, String> = serde_json::from_str(&saved).unwrap();
    assert_eq!(map.get("colorwatch.targetColor").map(String::as_str), Some("#fa0a0c"));

    // the stored color is picked up by later checks
    colorwatch()
        .arg("check")
        .arg(&img)
        .arg("--prefs")
        .arg(&prefs)
        .assert()
        .success()
        .stdout(predicate::str::contains("match at (3, 2)"));
}

#[test]
fn pick_outside_image_fails() {
    let dir = tempfile::tempdir().unwrap();
    let img = dir.path().join("frame.png");
    write_png(&img);

    colorwatch()
        .args(["pick", "--x", "6", "--y", "0", "--image"])
        .arg(&img)
        .arg("--prefs")
        .arg(dir.path().join("prefs.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("outside the 6x4 image"));
}
