use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn test_catalog_list_shows_categories_and_pages() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("folio")
        .env("FOLIO_HOME", dir.path())
        .args(["catalog", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("about"))
        .stdout(predicate::str::contains("leftbrain"))
        .stdout(predicate::str::contains("rightbrain"))
        .stdout(predicate::str::contains("tools"))
        .stdout(predicate::str::contains("about-me"))
        .stdout(predicate::str::contains("dsa-big-o"))
        .stdout(predicate::str::contains("music"));
}

#[test]
fn test_catalog_show_resolves_page() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("folio")
        .env("FOLIO_HOME", dir.path())
        .args(["catalog", "show", "about-me"])
        .assert()
        .success()
        .stdout(predicate::str::contains("# Hello"));
}

#[test]
fn test_catalog_show_resolves_deferred_page() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("folio")
        .env("FOLIO_HOME", dir.path())
        .args(["catalog", "show", "dsa-big-o"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Big-O Cheatsheet"));
}

#[test]
fn test_catalog_show_unknown_id_fails_gracefully() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("folio")
        .env("FOLIO_HOME", dir.path())
        .args(["catalog", "show", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no page registered under 'ghost'"));
}

#[test]
fn test_catalog_preload_reports_outcomes() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("folio")
        .env("FOLIO_HOME", dir.path())
        .args(["catalog", "preload", "tools"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ascii-table"))
        .stdout(predicate::str::contains("ok"));
}

#[test]
fn test_catalog_preload_unknown_category_fails() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("folio")
        .env("FOLIO_HOME", dir.path())
        .args(["catalog", "preload", "basement"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no category 'basement'"));
}
