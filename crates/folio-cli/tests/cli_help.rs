use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_help_shows_all_commands() {
    cargo_bin_cmd!("folio")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("catalog"))
        .stdout(predicate::str::contains("config"))
        .stdout(predicate::str::contains("state"));
}

#[test]
fn test_catalog_help_shows_subcommands() {
    cargo_bin_cmd!("folio")
        .args(["catalog", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("preload"));
}

#[test]
fn test_state_help_shows_subcommands() {
    cargo_bin_cmd!("folio")
        .args(["state", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("reset"));
}

#[test]
fn test_version_flag() {
    cargo_bin_cmd!("folio")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.3"));
}
