//! Shared test utilities: the fixture dataset, in memory or on disk, and a
//! runner for the `mojiq` binary.
#![allow(dead_code)]

use std::path::Path;
use std::process::{Command, Output};

use mojiq::dataset::Dataset;

pub const FIXTURE_SQL: &str = include_str!("../fixtures/mojidata.sql");

pub fn dataset() -> Dataset {
    Dataset::in_memory(FIXTURE_SQL).expect("fixture dataset")
}

/// Write the fixture to a database file inside a fresh temporary directory.
pub fn database_file() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("temp dir");
    let conn = rusqlite::Connection::open(dir.path().join("moji.db")).expect("create db");
    conn.execute_batch(FIXTURE_SQL).expect("load fixture");
    dir
}

/// Run `mojiq --db <dir>/moji.db <args>`.
pub fn mojiq(db_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_mojiq"))
        .arg("--db")
        .arg(db_dir.join("moji.db"))
        .args(args)
        .env_remove("MOJIQ_DB")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run mojiq")
}

/// Parse a process's stdout as one JSON document.
pub fn stdout_json(output: &Output) -> serde_json::Value {
    let text = String::from_utf8(output.stdout.clone()).expect("stdout was not valid UTF-8");
    assert!(text.ends_with('\n'), "missing trailing newline: {text:?}");
    serde_json::from_str(&text).unwrap_or_else(|e| panic!("invalid JSON {text:?}: {e}"))
}
