//! End-to-end tests: run the `mojiq` binary against a fixture database file.
mod common;

use serde_json::json;

#[test]
fn search_with_limit() {
    let db = common::database_file();
    let out = common::mojiq(
        db.path(),
        &["search", "-p", "mji.総画数", "-q", "8", "--limit", "2"],
    );
    assert!(
        out.status.success(),
        "stderr={}",
        String::from_utf8_lossy(&out.stderr)
    );
    let v = common::stdout_json(&out);
    assert_eq!(v["query"], json!({"p": ["mji.総画数"], "q": ["8"], "limit": 2}));
    assert_eq!(v["results"].as_array().unwrap().len(), 2);
    assert_eq!(v["done"], false);
}

#[test]
fn search_intersection() {
    let db = common::database_file();
    let out = common::mojiq(
        db.path(),
        &["search", "-p", "mji.総画数", "-q", "8", "-p", "mji.読み", "-q", "ア"],
    );
    assert!(out.status.success());
    let v = common::stdout_json(&out);
    assert_eq!(v["results"], json!(["阿"]));
    assert_eq!(v["total"], 1);
}

#[test]
fn missing_predicate_is_client_error() {
    let db = common::database_file();
    let out = common::mojiq(db.path(), &["search"]);
    assert_eq!(out.status.code(), Some(2));
    assert_eq!(
        common::stdout_json(&out),
        json!({"error": {"message": "p is required"}})
    );
}

#[test]
fn unknown_key_is_client_error() {
    let db = common::database_file();
    let out = common::mojiq(db.path(), &["search", "-p", "radical", "-q", "1"]);
    assert_eq!(out.status.code(), Some(2));
    assert_eq!(
        common::stdout_json(&out)["error"]["message"],
        "Unknown query key: radical"
    );
}

#[test]
fn idsfind_with_predicate() {
    let db = common::database_file();
    let out = common::mojiq(
        db.path(),
        &["idsfind", "--ids", "日", "-p", "totalStrokes", "-q", "8"],
    );
    assert!(out.status.success());
    let v = common::stdout_json(&out);
    assert_eq!(v["results"], json!(["明"]));
}

#[test]
fn lookup_selected_fields() {
    let db = common::database_file();
    let out = common::mojiq(db.path(), &["lookup", "明", "--select", "UCS"]);
    assert!(out.status.success());
    assert_eq!(
        String::from_utf8(out.stdout).unwrap(),
        "{\"query\":{\"char\":\"明\",\"select\":[\"UCS\"]},\"results\":{\"UCS\":\"U+660E\"}}\n"
    );
}

#[test]
fn lookup_rejects_multiple_characters() {
    let db = common::database_file();
    let out = common::mojiq(db.path(), &["lookup", "明日"]);
    assert_eq!(out.status.code(), Some(2));
    assert_eq!(
        common::stdout_json(&out)["error"]["message"],
        "char must be a single character"
    );
}

#[test]
fn predicates_lists_registry() {
    let dir = tempfile::tempdir().unwrap();
    // No database needed to list keys.
    let out = common::mojiq(dir.path(), &["predicates"]);
    assert!(out.status.success());
    let keys = common::stdout_json(&out);
    let keys = keys.as_array().unwrap();
    assert_eq!(keys.len(), 19);
    assert!(keys.contains(&json!("totalStrokes.ge")));
}

#[test]
fn missing_database_fails() {
    let dir = tempfile::tempdir().unwrap();
    let out = common::mojiq(dir.path(), &["search", "-p", "UCS", "-q", "660e"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());
    assert!(String::from_utf8_lossy(&out.stderr).contains("failed to open dataset"));
}
