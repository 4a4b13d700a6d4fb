//! Binary smoke tests for the commands that need no daemon.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn parse_prints_json_lines() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(
        file,
        "19538:M 31 Dec 2024 19:04:28.665 * Ready to accept connections tcp"
    )
    .expect("write line");

    Command::cargo_bin("affogato")
        .expect("binary built")
        .arg("parse")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""pid":19538"#))
        .stdout(predicate::str::contains(r#""role":"master""#))
        .stdout(predicate::str::contains(r#""severity":"info""#))
        .stdout(predicate::str::contains(r#""time":"2024-12-31T19:04:28.665""#))
        .stdout(predicate::str::contains(
            r#""message":"Ready to accept connections tcp""#,
        ));
}

#[test]
fn parse_reads_stdin_and_fails_on_bad_lines() {
    Command::cargo_bin("affogato")
        .expect("binary built")
        .arg("parse")
        .write_stdin("19538:X 31 Dec 2024 19:04:28.665 * x\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("1 line(s) failed to parse"));
}

#[test]
fn init_config_writes_loadable_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("affogato.toml");

    Command::cargo_bin("affogato")
        .expect("binary built")
        .arg("init-config")
        .arg("--output")
        .arg(&path)
        .assert()
        .success();

    let config = affogato_cli::AffogatoConfig::from_file(&path);
    assert_eq!(config.ok(), Some(affogato_cli::AffogatoConfig::default()));
}
