use assert_cmd::prelude::*;
use std::path::Path;
use std::process::Command;

fn write_config(dir: &Path) -> std::path::PathBuf {
    let cookies = dir.join("cookies.json");
    std::fs::write(&cookies, r#"[{"name":"sid","value":"abc"}]"#).unwrap();
    let config = dir.join("config.yaml");
    std::fs::write(
        &config,
        format!(
            "strategy: fixed\n\
             pacing:\n  min_delay_ms: 1\n  base_delay_ms: 10\n\
             auth:\n  cookie_path: {}\n\
             storage:\n  ledger_path: {}\n  stats_path: {}\n",
            cookies.display(),
            dir.join("processed.jsonl").display(),
            dir.join("stats.json").display(),
        ),
    )
    .unwrap();
    config
}

fn write_feed(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("feed.json");
    std::fs::write(
        &path,
        r#"[{"id":"3","position":3,"liked":false},{"id":"2","position":2,"liked":false}]"#,
    )
    .unwrap();
    path
}

#[test]
fn help_lists_the_run_command() {
    let bin = assert_cmd::cargo::cargo_bin!("anilike");
    let mut cmd = Command::new(bin);
    let assert = cmd.arg("--help").assert().success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 output");
    assert!(stdout.contains("run"));
    assert!(stdout.contains("--config"));
}

#[test]
fn run_completes_a_fixture_feed_in_dry_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());
    let feed = write_feed(dir.path());

    let bin = assert_cmd::cargo::cargo_bin!("anilike");
    let mut cmd = Command::new(bin);
    let assert = cmd
        .env("RUST_LOG", "info")
        .args([
            "run",
            "--config",
            config.to_str().unwrap(),
            "--feed-fixture",
            feed.to_str().unwrap(),
            "--dry-run",
        ])
        .assert()
        .success();

    let stderr = String::from_utf8(assert.get_output().stderr.clone()).expect("utf8 output");
    assert!(stderr.contains("run finished"), "stderr was: {stderr}");
    assert!(
        !dir.path().join("processed.jsonl").exists(),
        "dry run must not write the ledger"
    );
}

#[test]
fn run_without_cookies_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());
    let feed = write_feed(dir.path());
    std::fs::remove_file(dir.path().join("cookies.json")).unwrap();

    let bin = assert_cmd::cargo::cargo_bin!("anilike");
    let mut cmd = Command::new(bin);
    let assert = cmd
        .env("RUST_LOG", "info")
        .args([
            "run",
            "--config",
            config.to_str().unwrap(),
            "--feed-fixture",
            feed.to_str().unwrap(),
        ])
        .assert()
        .code(1);

    let stderr = String::from_utf8(assert.get_output().stderr.clone()).expect("utf8 output");
    assert!(stderr.contains("cookie"), "stderr was: {stderr}");
}
