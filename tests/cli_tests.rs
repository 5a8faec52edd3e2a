//! Integration tests for the remaining commands and top-level CLI behavior

mod common;

use common::{TestEnv, read_file};
use predicates::prelude::*;
use serde_json::Value;

fn manifest(project: &std::path::Path) -> Value {
    serde_json::from_str(&read_file(&project.join("package.json"))).unwrap()
}

#[test]
fn test_help() {
    let env = TestEnv::new();
    env.bpm()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("fetch"))
        .stdout(predicate::str::contains("build"));
}

#[test]
fn test_version() {
    let env = TestEnv::new();
    env.bpm()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_unknown_command() {
    let env = TestEnv::new();
    env.bpm().arg("frobnicate").assert().failure();
}

#[test]
fn test_list_empty_project() {
    let env = TestEnv::with_standard_registry();
    let project = env.project(
        "empty",
        &serde_json::json!({"name": "empty", "version": "1.0.0"}),
    );

    env.bpm()
        .current_dir(&project)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No packages installed."));
}

#[test]
fn test_list_fetched_and_vendored() {
    let env = TestEnv::with_standard_registry();
    let project = env.hello_world();
    env.bpm()
        .current_dir(&project)
        .arg("fetch")
        .assert()
        .success();

    env.bpm()
        .current_dir(&project)
        .args(["list", "--detailed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Installed packages (5):"))
        .stdout(predicate::str::contains("spade"))
        .stdout(predicate::str::contains("(0.5.0)"))
        .stdout(predicate::str::contains("(vendored)"))
        .stdout(predicate::str::contains("Path:"));
}

#[test]
fn test_list_outside_project() {
    let env = TestEnv::new();
    env.bpm()
        .current_dir(&env.home)
        .arg("list")
        .assert()
        .failure();
}

#[test]
fn test_add_records_dependency() {
    let env = TestEnv::with_standard_registry();
    let project = env.hello_world();

    env.bpm()
        .current_dir(&project)
        .args(["add", "rake"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added rake (0.8.7)"));

    assert!(TestEnv::is_installed(&project, "rake", "0.8.7"));
    assert!(TestEnv::is_installed(&project, "core-test", "0.4.9"));
    let manifest = manifest(&project);
    assert_eq!(manifest["dependencies"]["rake"], ">= 0.8.7");
    assert_eq!(manifest["dependencies"]["core-test"], "= 0.4.9");
}

#[test]
fn test_add_with_version() {
    let env = TestEnv::with_standard_registry();
    let project = env.hello_world();

    env.bpm()
        .current_dir(&project)
        .args(["add", "rake", "--version", "0.8.6"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added rake (0.8.6)"));

    assert!(TestEnv::is_installed(&project, "rake", "0.8.6"));
    assert_eq!(manifest(&project)["dependencies"]["rake"], "= 0.8.6");
}

#[test]
fn test_add_unknown_package() {
    let env = TestEnv::with_standard_registry();
    let project = env.hello_world();

    env.bpm()
        .current_dir(&project)
        .args(["add", "fake"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Can't find package fake"));

    assert!(manifest(&project)["dependencies"].get("fake").is_none());
}

#[test]
fn test_remove_dependency() {
    let env = TestEnv::with_standard_registry();
    let project = env.hello_world();
    env.bpm()
        .current_dir(&project)
        .args(["add", "rake"])
        .assert()
        .success();

    env.bpm()
        .current_dir(&project)
        .args(["remove", "rake"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed rake"));

    assert!(!project.join(".bpm/packages/rake").exists());
    assert!(manifest(&project)["dependencies"].get("rake").is_none());
}

#[test]
fn test_remove_vendored_package_keeps_copy() {
    let env = TestEnv::with_standard_registry();
    let project = env.hello_world();

    env.bpm()
        .current_dir(&project)
        .args(["remove", "custom_package"])
        .assert()
        .success()
        .stderr(predicate::str::contains("vendored"));

    assert!(project.join("packages/custom_package/package.json").is_file());
    assert!(
        manifest(&project)["dependencies"]
            .get("custom_package")
            .is_none()
    );
}

#[test]
fn test_remove_unknown_package() {
    let env = TestEnv::with_standard_registry();
    let project = env.hello_world();

    env.bpm()
        .current_dir(&project)
        .args(["remove", "rake"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Package 'rake' is not installed"));
}

#[test]
fn test_completions() {
    let env = TestEnv::new();
    env.bpm()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("bpm"));
}

#[test]
fn test_completions_unknown_shell() {
    let env = TestEnv::new();
    env.bpm()
        .args(["completions", "tcsh"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("called incorrectly"));
}
