use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn vdx() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("vdx"))
}

#[test]
fn doctor_reports_every_vault() {
    let tmp = tempdir().unwrap();
    let notes = tmp.path().join("notes");
    write_file(&notes.join("a.md"), "# A");
    write_file(&notes.join("b.md"), "# B");
    let cfg = tmp.path().join("config.toml");
    write_file(
        &cfg,
        &format!(
            r#"
version = 1
default_vault = "notes"

[vaults.notes]
root = "{}"

[cache]
dir = "{}"
"#,
            notes.display(),
            tmp.path().join("cache").display()
        ),
    );

    vdx()
        .args(["doctor", "--config", cfg.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("OK   vdx doctor"))
        .stdout(predicate::str::contains("default vault: notes"))
        .stdout(predicate::str::contains("vault notes: ready (2 documents, 0 errors)"));
}

#[test]
fn doctor_fails_when_a_vault_root_is_missing() {
    let tmp = tempdir().unwrap();
    let good = tmp.path().join("good");
    fs::create_dir_all(&good).unwrap();
    let cfg = tmp.path().join("config.toml");
    write_file(
        &cfg,
        &format!(
            r#"
version = 1
[vaults.good]
root = "{}"
use_cache = false

[vaults.gone]
root = "{}"
use_cache = false
"#,
            good.display(),
            tmp.path().join("gone").display()
        ),
    );

    vdx()
        .args(["doctor", "--config", cfg.to_str().unwrap()])
        .assert()
        .failure()
        .stdout(predicate::str::contains("vault good: ready"))
        .stdout(predicate::str::contains("vault gone: error"))
        .stdout(predicate::str::contains("FAIL vdx doctor"));
}

#[test]
fn doctor_fails_on_missing_config() {
    let tmp = tempdir().unwrap();
    let missing = tmp.path().join("nope.toml");

    vdx()
        .args(["doctor", "--config", missing.to_str().unwrap()])
        .assert()
        .failure()
        .stdout(predicate::str::contains("FAIL vdx doctor"))
        .stdout(predicate::str::contains("config file not found"));
}

#[test]
fn doctor_uses_xdg_default_when_present() {
    let tmp = tempdir().unwrap();
    let vault = tmp.path().join("v");
    fs::create_dir_all(&vault).unwrap();
    write_file(
        &tmp.path().join("vaultdex").join("config.toml"),
        &format!("version = 1\n[vaults.main]\nroot = \"{}\"\nuse_cache = false\n", vault.display()),
    );

    vdx()
        .env("XDG_CONFIG_HOME", tmp.path())
        .arg("doctor")
        .assert()
        .success()
        .stdout(predicate::str::contains("default vault: main"));
}
