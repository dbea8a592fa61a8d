use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::{TempDir, tempdir};

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// A vault with a config file; the cache lives inside the temp dir.
fn setup() -> (TempDir, PathBuf) {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("vault");
    write_file(&root.join("a.md"), "---\ntitle: Alpha\nstatus: draft\ntags: [x]\n---\nSee [[b]]");
    write_file(&root.join("b.md"), "---\nstatus: published\n---\nBody #y and [[a]]");
    write_file(&root.join("posts/c.md"), "# Gamma\n[[missing]] #x");
    write_file(&root.join("templates/t.md"), "#x template");

    let cfg = tmp.path().join("config.toml");
    write_file(
        &cfg,
        &format!(
            r#"
version = 1
[vaults.main]
root = "{}"
excluded_folders = ["templates"]

[cache]
dir = "{}"
"#,
            root.display(),
            tmp.path().join("cache").display()
        ),
    );
    (tmp, cfg)
}

fn vdx(cfg: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("vdx"));
    cmd.arg("--config").arg(cfg);
    cmd
}

#[test]
fn reindex_reports_and_writes_cache() {
    let (tmp, cfg) = setup();

    vdx(&cfg)
        .arg("reindex")
        .assert()
        .success()
        .stdout(predicate::str::contains("Indexing complete:"))
        .stdout(predicate::str::contains("Files found:    3"))
        .stdout(predicate::str::contains("Cache stored at:"));

    let cached = fs::read_dir(tmp.path().join("cache"))
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "db"))
        .count();
    assert_eq!(cached, 1);

    vdx(&cfg)
        .args(["reindex", "--verbose"])
        .assert()
        .success()
        .stdout(predicate::str::contains("From cache:     3"));
}

#[test]
fn list_filters_by_tag_and_folder() {
    let (_tmp, cfg) = setup();

    vdx(&cfg)
        .args(["list", "--quiet"])
        .assert()
        .success()
        .stdout("a.md\nb.md\nposts/c.md\n");

    vdx(&cfg)
        .args(["list", "--tag", "x", "--quiet"])
        .assert()
        .success()
        .stdout("a.md\nposts/c.md\n");

    vdx(&cfg)
        .args(["list", "--folder", "posts", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"path\": \"posts/c.md\""))
        .stdout(predicate::str::contains("\"title\": \"c\""));
}

#[test]
fn query_text_json_and_filters() {
    let (_tmp, cfg) = setup();

    vdx(&cfg)
        .args(["query", "fm:status=draft", "--quiet"])
        .assert()
        .success()
        .stdout("a.md\n");

    vdx(&cfg)
        .args(["query", r#"{"inline.tags": {"$contains": "y"}}"#, "--quiet"])
        .assert()
        .success()
        .stdout("b.md\n");

    vdx(&cfg)
        .args([
            "query",
            "--filters",
            r#"{"logic": "and", "conditions": [{"field": "tags", "operator": "contains", "value": "x"}]}"#,
            "--quiet",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("a.md"))
        .stdout(predicate::str::contains("posts/c.md"))
        .stdout(predicate::str::contains("b.md").not());
}

#[test]
fn query_rejects_bad_input() {
    let (_tmp, cfg) = setup();

    vdx(&cfg)
        .args(["query", "fm:title=\"open"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error parsing query"));

    vdx(&cfg)
        .args(["query", "", "--limit", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn query_limit_truncates() {
    let (_tmp, cfg) = setup();

    let output = vdx(&cfg).args(["query", "--limit", "2", "--quiet"]).output().unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stdout).unwrap().lines().count(), 2);
}

#[test]
fn tags_are_counted() {
    let (_tmp, cfg) = setup();

    vdx(&cfg)
        .args(["tags", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"tag\": \"x\""))
        .stdout(predicate::str::contains("\"pages\": 2"));
}

#[test]
fn links_show_both_directions() {
    let (_tmp, cfg) = setup();

    vdx(&cfg)
        .args(["links", "a.md"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Backlinks"))
        .stdout(predicate::str::contains("b -> b.md"));

    vdx(&cfg)
        .args(["links", "posts/c", "--outgoing"])
        .assert()
        .success()
        .stdout(predicate::str::contains("missing (unresolved)"));

    vdx(&cfg)
        .args(["links", "b", "--backlinks", "--quiet"])
        .assert()
        .success()
        .stdout("a.md\n");

    vdx(&cfg)
        .args(["links", "nope.md"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Page not found"));
}

#[test]
fn stats_report_counts_and_errors() {
    let (tmp, cfg) = setup();
    write_file(&tmp.path().join("vault/bad.md"), "---\ntitle: [unclosed\n---\nbody");

    vdx(&cfg)
        .args(["stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Documents:       3"))
        .stdout(predicate::str::contains("Dangling links:  1"))
        .stdout(predicate::str::contains("Indexing errors: 1"))
        .stdout(predicate::str::contains("bad.md"));

    vdx(&cfg)
        .args(["stats", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"totalDocuments\": 3"));
}

#[test]
fn unknown_vault_is_a_config_error() {
    let (_tmp, cfg) = setup();

    vdx(&cfg)
        .args(["--vault", "other", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error loading config"))
        .stderr(predicate::str::contains("vault 'other' not found"));
}

#[test]
fn watch_runs_until_timeout() {
    let (_tmp, cfg) = setup();

    vdx(&cfg)
        .args(["watch", "--timeout", "1", "--debounce-ms", "50"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Watching vault:"))
        .stdout(predicate::str::contains("(3 pages)"));
}

#[test]
fn logging_to_file() {
    let (tmp, _) = setup();
    let log_file = tmp.path().join("logs/vdx.log");
    let cfg = tmp.path().join("logging.toml");
    write_file(
        &cfg,
        &format!(
            "version = 1\n[vaults.main]\nroot = \"{}\"\nuse_cache = false\n\n[logging]\nlevel = \"warn\"\nfile_level = \"debug\"\nfile = \"{}\"\n",
            tmp.path().join("vault").display(),
            log_file.display()
        ),
    );

    vdx(&cfg).arg("stats").assert().success();

    assert!(log_file.exists(), "log file should be created");
}
