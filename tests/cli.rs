//! Tests for the `bam` binary.

mod common;

use std::fs::{self, File};
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use common::{project, stored_paths};
use scenepack::pack::{pack, PackMode, PackOptions};
use scenepack::walk::Trace;
use scenepack::wire;

/// A `bam` command isolated from the user's configuration.
fn bam(temp: &Path) -> Command {
    let home = temp.join("home");
    fs::create_dir_all(&home).unwrap();
    let mut cmd = Command::cargo_bin("bam").unwrap();
    cmd.env("HOME", &home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("BAM_CONFIG")
        .arg("--cwd")
        .arg(temp);
    cmd
}

#[test]
fn help_flag_works() {
    let temp = TempDir::new().unwrap();
    bam(temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("scene files"));
}

#[test]
fn version_flag_works() {
    let temp = TempDir::new().unwrap();
    bam(temp.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("bam"));
}

#[test]
fn deps_lists_references() {
    let temp = TempDir::new().unwrap();
    project(temp.path());

    bam(temp.path())
        .args(["deps", "src/root.blend"])
        .assert()
        .success()
        .stdout(predicate::str::contains("//tex/sky.png"))
        .stdout(predicate::str::contains("//libs/lib.blend"))
        .stdout(predicate::str::contains("//tex/wood.png").not());
}

#[test]
fn deps_recursive_json() {
    let temp = TempDir::new().unwrap();
    project(temp.path());

    let output = bam(temp.path())
        .args(["deps", "--recursive", "--json", "src/root.blend"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let deps: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let deps = deps.as_array().unwrap();
    assert_eq!(deps.len(), 3);
    assert_eq!(deps[2]["stored"], "//tex/wood.png");
    assert_eq!(deps[2]["level"], 1);
    assert_eq!(deps[1]["is_library"], true);
}

#[test]
fn deps_of_missing_file_fails() {
    let temp = TempDir::new().unwrap();
    bam(temp.path())
        .args(["deps", "nope.blend"])
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("error:"));
}

#[test]
fn pack_writes_flat_directory() {
    let temp = TempDir::new().unwrap();
    project(temp.path());

    bam(temp.path())
        .args(["pack", "src/root.blend", "out/shot.blend"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Packed 4 file(s)"));

    let out = temp.path().join("out");
    assert_eq!(
        stored_paths(&out.join("shot.blend")),
        vec!["//data/sky.png", "//data/lib.blend"]
    );

    bam(temp.path())
        .args(["pack", "src/root.blend", "out/shot.blend"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn pack_archive_with_trace() {
    let temp = TempDir::new().unwrap();
    project(temp.path());

    bam(temp.path())
        .args(["-q", "--trace", "trace.log", "pack", "--archive", "src/root.blend", "shot.zip"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    assert!(temp.path().join("shot.zip").is_file());
    let trace = fs::read_to_string(temp.path().join("trace.log")).unwrap();
    assert!(trace.contains("root.blend"));
    assert!(trace.contains("lib.blend"));
}

#[test]
fn pack_rejects_bad_subdir() {
    let temp = TempDir::new().unwrap();
    project(temp.path());

    bam(temp.path())
        .args(["pack", "--subdir", "../up", "src/root.blend", "out/shot.blend"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("subdir"));
    assert!(!temp.path().join("out").exists());
}

#[test]
fn project_config_sets_pack_defaults() {
    let temp = TempDir::new().unwrap();
    project(temp.path());

    bam(temp.path())
        .args(["init", "http://localhost:5000/shots"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized"));

    let config_path = temp.path().join(".bam/config.toml");
    let mut config = fs::read_to_string(&config_path).unwrap();
    assert!(config.contains("http://localhost:5000/shots"));
    config.push_str("\n[pack]\nsubdir = \"assets\"\n");
    fs::write(&config_path, config).unwrap();

    bam(temp.path())
        .args(["pack", "src/root.blend", "out/shot.blend"])
        .assert()
        .success();
    assert!(temp.path().join("out/assets/lib.blend").is_file());

    bam(temp.path())
        .args(["init", "http://elsewhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already a bam project"));
}

#[test]
fn remap_writes_copy() {
    let temp = TempDir::new().unwrap();
    let root = project(temp.path());
    fs::write(
        temp.path().join("map.json"),
        r#"{"//tex/sky.png": "//textures/sky.png"}"#,
    )
    .unwrap();

    bam(temp.path())
        .args(["remap", "src/root.blend", "map.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rewrote 1 path(s)"));

    assert_eq!(
        stored_paths(&temp.path().join("src/root_remap.blend")),
        vec!["//textures/sky.png", "//libs/lib.blend"]
    );
    assert_eq!(stored_paths(&root)[0], "//tex/sky.png");
}

#[test]
fn unpack_status_commit() {
    let temp = TempDir::new().unwrap();
    let root = project(temp.path());
    let zip_path = temp.path().join("checkout.zip");
    let options = PackOptions {
        mode: PackMode::Archive,
        manifests: true,
        ..PackOptions::default()
    };
    pack(&root, &zip_path, &options, &mut Trace::silent()).unwrap();

    let stream_path = temp.path().join("checkout.bam");
    let mut stream = File::create(&stream_path).unwrap();
    wire::write_magic(&mut stream).unwrap();
    wire::write_message(&mut stream, "ready").unwrap();
    wire::write_payload(&mut stream, &mut File::open(&zip_path).unwrap()).unwrap();
    drop(stream);

    bam(temp.path())
        .args(["unpack", "checkout.bam", "session"])
        .assert()
        .success()
        .stdout(predicate::str::contains("server: ready"));

    bam(temp.path())
        .args(["status", "session"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing changed"));

    bam(temp.path())
        .args(["commit", "session", "-m", "noop"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothing to commit"));

    fs::write(temp.path().join("session/data/sky.png"), b"repainted").unwrap();

    bam(temp.path())
        .args(["status", "session"])
        .assert()
        .success()
        .stdout(predicate::str::contains("modified  data/sky.png"));

    bam(temp.path())
        .args(["commit", "session", "-m", "repaint sky"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Staged 1 file(s)"));
    assert!(temp.path().join("session/.bam_commit.zip").is_file());
}

#[test]
fn unpack_rejects_garbage() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("garbage.bam"), b"<html>oops</html>").unwrap();

    bam(temp.path())
        .args(["unpack", "garbage.bam", "session"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a checkout stream"));
    assert!(!temp.path().join("session").exists());
}

#[test]
fn completion_generates_script() {
    let temp = TempDir::new().unwrap();
    bam(temp.path())
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("bam"));
}
