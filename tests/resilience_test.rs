mod helpers;

use mnemos::db;
use mnemos::memory::Strata;
use tempfile::TempDir;

#[test]
fn open_creates_new_db_at_nonexistent_path() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("subdir").join("new.db");

    assert!(!db_path.exists());

    let conn = db::open_database(&db_path).unwrap();

    assert!(db_path.exists());

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn health_check_passes_on_valid_db() {
    let conn = helpers::test_db();

    let report = db::check_database_health(&conn).unwrap();
    assert!(report.integrity_ok);
    assert_eq!(report.integrity_details, "ok");
    assert_eq!(report.schema_version, db::migrations::CURRENT_SCHEMA_VERSION);
    assert_eq!(report.node_count, 0);
    assert_eq!(report.log_count, 0);
}

#[test]
fn busy_timeout_is_set() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("test.db");

    let conn = db::open_database(&db_path).unwrap();

    let timeout: i64 = conn
        .pragma_query_value(None, "busy_timeout", |row| row.get(0))
        .unwrap();
    assert_eq!(timeout, 5000);
}

#[test]
fn corrupt_node_file_is_skipped_on_reload() {
    let tmp = TempDir::new().unwrap();
    {
        let mut engine = helpers::fs_engine(tmp.path());
        engine
            .create_memory(helpers::node("/notes/good", &["kept"], Strata::Somatic))
            .unwrap();
    }
    helpers::write_file(tmp.path(), "notes/bad.node.json", "{ not json");

    let engine = helpers::fs_engine(tmp.path());
    assert_eq!(engine.all_paths(), vec!["/notes/good".to_string()]);
    assert_eq!(engine.find_memories_by_keyword("kept"), vec!["/notes/good".to_string()]);
}

#[test]
fn missing_tool_directory_tree_is_a_hard_error() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("nowhere");
    let mut registry = helpers::registry_for(&[missing.as_path()]);
    let mut engine = helpers::sqlite_engine();

    let err = registry.index_all_tools(&mut engine, false).unwrap_err();
    assert!(err.to_string().contains("no tool directory exists"));
    assert!(engine.is_empty());
}

#[test]
fn one_missing_directory_among_several_is_tolerated() {
    let tmp = TempDir::new().unwrap();
    let present = tmp.path().join("tools");
    helpers::write_file(
        &present,
        "grep.luciform",
        &helpers::tool_document("grep_file", "divination", "search a file", &["regex"], "fondamental"),
    );
    let missing = tmp.path().join("nowhere");
    let mut registry = helpers::registry_for(&[missing.as_path(), present.as_path()]);
    let mut engine = helpers::sqlite_engine();

    let report = registry.index_all_tools(&mut engine, false).unwrap();
    assert_eq!(report.indexed, 1);
}

#[test]
fn unreadable_python_file_does_not_abort_analysis() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().canonicalize().unwrap();
    let main = helpers::write_file(&root, "main.py", "import broken\nimport ok\n");
    helpers::write_file(&root, "broken.py", "def f(:\n    x = (1, 2\n");
    helpers::write_file(&root, "ok.py", "X = 1\n");

    let resolver = mnemos::imports::ImportResolver::new(&root, mnemos::imports::InterpreterInfo::builtin());
    let mut analyzer = mnemos::deps::DependencyAnalyzer::new(resolver);
    let graph = analyzer.analyze_recursive_dependencies(&[main], 5);

    assert!(graph.node(&root.join("ok.py")).is_some());
    assert_eq!(graph.skipped().len(), 1);
    assert_eq!(graph.skipped()[0].file_path, root.join("broken.py"));
}
