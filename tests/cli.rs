use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;

mod common;

fn stripcut() -> Command {
    let mut cmd = Command::cargo_bin("stripcut").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd.env_remove("STRIPCUT_SETTINGS");
    cmd
}

#[test]
fn runs() {
    let mut cmd = stripcut();
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("stripcut --help"));
}

#[test]
fn outputs_tool_name() {
    let mut cmd = stripcut();
    cmd.arg("-V");
    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("stripcut "));
}

#[test]
fn run_on_missing_root_fails() {
    let temp = tempfile::tempdir().unwrap();
    let mut cmd = stripcut();
    cmd.args(["-q", "run"]).arg(temp.path().join("missing"));
    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Not a directory"));
}

#[test]
fn run_rejects_unknown_strategy() {
    let temp = tempfile::tempdir().unwrap();
    let mut cmd = stripcut();
    cmd.args(["run", "--strategy", "magic"]).arg(temp.path());
    cmd.assert().failure();
}

#[test]
fn run_prints_text_summary() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path().join("books");
    common::write_png(&root.join("ep1").join("1.png"), &common::textured(120, 200));

    let mut cmd = stripcut();
    cmd.args(["-q", "run"]).arg(&root);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("1 project(s): 1 succeeded, 0 failed"));

    assert!(root.join("books_pdfs").join("ep1.pdf").is_file());
    assert!(root.join("IMG").join("ep1").is_dir());
}

#[test]
fn run_json_output_is_parseable() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path().join("books");
    common::write_png(&root.join("ep1").join("1.png"), &common::textured(120, 200));

    let mut cmd = stripcut();
    cmd.args(["-q", "run", "--output", "json", "--strategy", "histogram"])
        .arg(&root);
    let output = cmd.assert().success().get_output().stdout.clone();

    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["projects"][0]["name"], "ep1");
    assert_eq!(json["projects"][0]["status"], "succeeded");
    assert_eq!(json["projects"][0]["strategy"], "histogram");
}

#[test]
fn strict_run_fails_when_a_project_fails() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path().join("books");
    fs::create_dir_all(root.join("empty")).unwrap();

    let mut cmd = stripcut();
    cmd.args(["-q", "run"]).arg(&root);
    cmd.assert().success();

    let mut cmd = stripcut();
    cmd.args(["-q", "run", "--strict"]).arg(&root);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("1 of 1 project(s) failed"));
}

#[test]
fn run_uses_work_dir_from_settings() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path().join("books");
    common::write_png(&root.join("ep1").join("1.png"), &common::textured(60, 90));
    let settings = temp.path().join("settings.json");

    let mut cmd = stripcut();
    cmd.args(["config", "set-work-dir"])
        .arg(&root)
        .arg("--settings")
        .arg(&settings);
    cmd.assert().success();

    let mut cmd = stripcut();
    cmd.args(["-q", "run", "--settings"]).arg(&settings);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("1 succeeded"));
}

#[test]
fn config_show_masks_api_key() {
    let temp = tempfile::tempdir().unwrap();
    let settings = temp.path().join("settings.json");
    fs::write(
        &settings,
        r#"{"default_work_dir": "/comics", "ai_config": {"api_key": "sk-secret-1234"}}"#,
    )
    .unwrap();

    let mut cmd = stripcut();
    cmd.args(["config", "show", "--settings"]).arg(&settings);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("default_work_dir: /comics"))
        .stdout(predicate::str::contains("1234"))
        .stdout(predicate::str::contains("sk-secret").not());
}

#[test]
fn config_set_work_dir_rejects_missing_dir() {
    let temp = tempfile::tempdir().unwrap();
    let mut cmd = stripcut();
    cmd.args(["config", "set-work-dir"])
        .arg(temp.path().join("nope"))
        .arg("--settings")
        .arg(temp.path().join("settings.json"));
    cmd.assert().failure();
    assert!(!temp.path().join("settings.json").exists());
}

#[test]
fn stitch_writes_merged_output() {
    let temp = tempfile::tempdir().unwrap();
    common::write_png(&temp.path().join("1.png"), &common::textured(30, 40));
    common::write_png(&temp.path().join("2.png"), &common::textured(20, 10));

    let mut cmd = stripcut();
    cmd.args(["-q", "stitch"]).arg(temp.path());
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Stitched 2 image(s)"))
        .stdout(predicate::str::contains("(30x50)"));
    assert!(temp
        .path()
        .join("merged_output")
        .join("stitched_long_image.png")
        .is_file());
}

#[test]
fn convert_then_merge_pdfs() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path().join("scans");
    common::write_png(&root.join("vol 1").join("1.png"), &common::textured(40, 40));
    common::write_png(&root.join("vol 1").join("2.png"), &common::textured(40, 40));

    let mut cmd = stripcut();
    cmd.args(["-q", "convert"]).arg(&root);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("1 succeeded"));
    let pdf = root.join("scans_pdfs").join("vol1.pdf");
    assert_eq!(common::pdf_page_count(&pdf), 2);

    let mut cmd = stripcut();
    cmd.args(["-q", "merge-pdfs"]).arg(&root);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("scans_pdfs: 1 file(s), 2 page(s)"));
    assert!(root.join("merged_pdf").join("scans_pdfs.pdf").is_file());
}
