//! End-to-end tests through the handle-level bridge
//!
//! These run against real in-memory and file-backed DuckDB databases and
//! check the exact JSON a host receives.

use duckbridge::{bridge, BridgeError, Database, DatabaseManager, HandleKind, OpenOptions};
use tempfile::tempdir;

fn open_memory() -> (u64, u64) {
    let db = bridge::open_database_with_options(None, &OpenOptions::without_extensions()).unwrap();
    let conn = bridge::connect(db).unwrap();
    (db, conn)
}

#[test]
fn test_create_insert_select() {
    let (db, conn) = open_memory();

    assert_eq!(bridge::execute(conn, "CREATE TABLE t(a INT, b TEXT)").unwrap(), 0);
    assert_eq!(
        bridge::execute(conn, "INSERT INTO t VALUES (1,'x'),(2,NULL)").unwrap(),
        2
    );
    assert_eq!(
        bridge::query(conn, "SELECT a,b FROM t ORDER BY a").unwrap(),
        r#"[{"a":1,"b":"x"},{"a":2,"b":null}]"#
    );
    assert_eq!(
        bridge::execute_json(conn, "DELETE FROM t WHERE a = 1").unwrap(),
        r#"{"changes":1}"#
    );

    bridge::close_database(db);
}

#[test]
fn test_empty_result_is_empty_array() {
    let (db, conn) = open_memory();
    bridge::execute(conn, "CREATE TABLE e(v INT)").unwrap();
    assert_eq!(bridge::query(conn, "SELECT * FROM e").unwrap(), "[]");
    bridge::close_database(db);
}

#[test]
fn test_value_encoding_across_types() {
    let (db, conn) = open_memory();
    let rows = bridge::query(
        conn,
        "SELECT 1::TINYINT AS i8, 300::SMALLINT AS i16, 9007199254740993::BIGINT AS i64, \
         1.5::DOUBLE AS f, true AS t, 'a\"b\\c\n' AS s, NULL::INTEGER AS n, \
         DATE '2024-01-02' AS d",
    )
    .unwrap();

    let parsed: serde_json::Value = serde_json::from_str(&rows).unwrap();
    let row = &parsed[0];
    assert_eq!(row["i8"], 1);
    assert_eq!(row["i16"], 300);
    assert_eq!(row["i64"].as_i64(), Some(9_007_199_254_740_993));
    assert_eq!(row["f"], 1.5);
    assert_eq!(row["t"], true);
    assert_eq!(row["s"], "a\"b\\c\n");
    assert!(row["n"].is_null());
    assert_eq!(row["d"], "2024-01-02");

    bridge::close_database(db);
}

/// Bridge rendering of `expr` next to the engine's own VARCHAR cast
fn rendered_and_cast(conn: u64, expr: &str) -> (String, String) {
    let rows = bridge::query(conn, &format!("SELECT {expr} AS v, ({expr})::VARCHAR AS s")).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&rows).unwrap();
    let row = &parsed[0];
    let rendered = row["v"]
        .as_str()
        .unwrap_or_else(|| panic!("{expr} did not render as a string: {rows}"));
    (rendered.to_string(), row["s"].as_str().unwrap().to_string())
}

#[test]
fn test_string_forms_match_engine_cast() {
    let (db, conn) = open_memory();
    let cases = [
        ("TIMESTAMPTZ '2024-01-01 12:00:00+00'", Some("2024-01-01 12:00:00+00")),
        ("TIMESTAMPTZ '2024-06-01 08:00:00+02'", None),
        ("TIMESTAMP '2024-01-01 12:00:00.5'", Some("2024-01-01 12:00:00.5")),
        ("TIMESTAMP '2024-01-01 12:00:00'", Some("2024-01-01 12:00:00")),
        ("TIME '01:02:03.25'", Some("01:02:03.25")),
        ("DATE '2024-01-02'", Some("2024-01-02")),
        ("INTERVAL 1 DAY", Some("1 day")),
        ("INTERVAL '1 year 2 months 3 days 04:05:06.5'", None),
        ("'\\xAA\\x01abc'::BLOB", Some("\\xAA\\x01abc")),
        ("{'a': 1, 'b': 'x'}", Some("{'a': 1, 'b': x}")),
        ("MAP {'k': 1}", Some("{k=1}")),
        ("[1, 2, NULL]", Some("[1, 2, NULL]")),
        ("1.50::DECIMAL(5,2)", Some("1.50")),
        ("-0.05::DECIMAL(4,2)", Some("-0.05")),
        ("'123e4567-e89b-12d3-a456-426614174000'::UUID", Some("123e4567-e89b-12d3-a456-426614174000")),
        (
            "170141183460469231731687303715884105727::HUGEINT",
            Some("170141183460469231731687303715884105727"),
        ),
        (
            "-170141183460469231731687303715884105727::HUGEINT",
            Some("-170141183460469231731687303715884105727"),
        ),
        (
            "340282366920938463463374607431768211455::UHUGEINT",
            Some("340282366920938463463374607431768211455"),
        ),
        ("0::UHUGEINT", Some("0")),
    ];

    for (expr, expected) in cases {
        let (rendered, cast) = rendered_and_cast(conn, expr);
        assert_eq!(rendered, cast, "{expr}");
        if let Some(expected) = expected {
            assert_eq!(rendered, expected, "{expr}");
        }
    }

    bridge::close_database(db);
}

#[test]
fn test_wide_integers_survive_tables_and_prepared_statements() {
    let (db, conn) = open_memory();
    bridge::execute_batch(
        conn,
        "CREATE TABLE wide(h HUGEINT, u UHUGEINT); \
         INSERT INTO wide VALUES \
         (170141183460469231731687303715884105727, 340282366920938463463374607431768211455), \
         (-170141183460469231731687303715884105727, 0)",
    )
    .unwrap();

    let expected = r#"[{"h":"170141183460469231731687303715884105727","u":"340282366920938463463374607431768211455"},{"h":"-170141183460469231731687303715884105727","u":"0"}]"#;
    assert_eq!(bridge::query(conn, "SELECT h, u FROM wide ORDER BY h DESC").unwrap(), expected);

    let stmt = bridge::prepare(conn, "SELECT h, u FROM wide WHERE u >= ? ORDER BY h DESC").unwrap();
    bridge::bind(stmt, 1, 0i64).unwrap();
    assert_eq!(bridge::execute_prepared(stmt).unwrap(), expected);

    bridge::close_database(db);
}

#[test]
fn test_large_result_spans_chunks() {
    let (db, conn) = open_memory();
    let rows = bridge::query(conn, "SELECT range AS i FROM range(5000)").unwrap();
    let parsed: Vec<serde_json::Value> = serde_json::from_str(&rows).unwrap();
    assert_eq!(parsed.len(), 5000);
    assert_eq!(parsed[4999]["i"], 4999);

    let stmt = bridge::prepare(conn, "SELECT range AS i FROM range(5000) WHERE range >= ?").unwrap();
    bridge::bind(stmt, 1, 0i64).unwrap();
    assert_eq!(bridge::execute_prepared(stmt).unwrap(), rows);

    bridge::close_database(db);
}

#[test]
fn test_prepared_statement_reuse() {
    let (db, conn) = open_memory();
    bridge::execute_batch(conn, "CREATE TABLE kv(k TEXT, v DOUBLE)").unwrap();

    let insert = bridge::prepare(conn, "INSERT INTO kv VALUES (?, ?)").unwrap();
    for (k, v) in [("a", 1.0), ("b", 2.5), ("c", -0.25)] {
        bridge::bind(insert, 1, k).unwrap();
        bridge::bind(insert, 2, v).unwrap();
        assert_eq!(bridge::run_prepared(insert).unwrap(), 1);
    }

    // Bindings persist between executions
    bridge::bind(insert, 1, "d").unwrap();
    assert_eq!(bridge::run_prepared_json(insert).unwrap(), r#"{"changes":1}"#);

    let select = bridge::prepare(conn, "SELECT k, v FROM kv WHERE v > ? ORDER BY k").unwrap();
    assert_eq!(bridge::bind_json_params(select, "[-1]").unwrap(), 1);
    assert_eq!(
        bridge::execute_prepared(select).unwrap(),
        r#"[{"k":"a","v":1},{"k":"b","v":2.5},{"k":"c","v":-0.25},{"k":"d","v":-0.25}]"#
    );

    bridge::clear_bindings(select).unwrap();
    bridge::bind_null(select, 1).unwrap();
    assert_eq!(bridge::execute_prepared(select).unwrap(), "[]");

    bridge::destroy_prepared(insert);
    bridge::destroy_prepared(select);
    bridge::close_database(db);
}

#[test]
fn test_handles_invalid_after_close() {
    let (db, conn) = open_memory();
    let stmt = bridge::prepare(conn, "SELECT 1 AS one").unwrap();
    bridge::close_database(db);

    assert!(matches!(
        bridge::execute_prepared(stmt),
        Err(BridgeError::InvalidHandle(HandleKind::Statement))
    ));
    assert!(matches!(
        bridge::query(conn, "SELECT 1"),
        Err(BridgeError::InvalidHandle(HandleKind::Connection))
    ));
    assert!(matches!(
        bridge::connect(db),
        Err(BridgeError::InvalidHandle(HandleKind::Database))
    ));

    // Handles of one kind are rejected where another is expected
    let (db2, conn2) = open_memory();
    assert!(matches!(
        bridge::query(db2, "SELECT 1"),
        Err(BridgeError::InvalidHandle(HandleKind::Connection))
    ));
    assert!(matches!(
        bridge::execute_prepared(conn2),
        Err(BridgeError::InvalidHandle(HandleKind::Statement))
    ));
    bridge::close_database(db2);
}

#[test]
fn test_engine_errors_pass_through() {
    let (db, conn) = open_memory();
    let err = bridge::query(conn, "SELECT * FROM nowhere").unwrap_err();
    assert!(matches!(err, BridgeError::Engine(_)));
    assert!(err.to_string().contains("nowhere"));

    assert!(bridge::prepare(conn, "SELEC").is_err());
    // The session is still usable
    assert_eq!(bridge::query(conn, "SELECT 2 AS two").unwrap(), r#"[{"two":2}]"#);
    bridge::close_database(db);
}

#[test]
fn test_file_database_persists() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("persist.duckdb");
    let path = path.to_str().unwrap();
    let options = OpenOptions::without_extensions();

    let db = bridge::open_database_with_options(Some(path), &options).unwrap();
    let conn = bridge::connect(db).unwrap();
    bridge::execute_batch(conn, "CREATE TABLE p(v INT); INSERT INTO p VALUES (7)").unwrap();
    bridge::close_database(db);

    let db = Database::open(Some(path), &options).unwrap();
    let session = db.connect().unwrap();
    assert_eq!(session.query("SELECT v FROM p").unwrap(), r#"[{"v":7}]"#);
}

#[test]
fn test_read_only_rejects_writes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ro.duckdb");
    let path = path.to_str().unwrap();

    {
        let db = Database::open(Some(path), &OpenOptions::without_extensions()).unwrap();
        db.connect().unwrap().execute_batch("CREATE TABLE r(v INT)").unwrap();
    }

    let db = bridge::open_database_with_config(
        Some(path),
        r#"{"extensions": [], "read_only": true}"#,
    )
    .unwrap();
    let conn = bridge::connect(db).unwrap();
    assert_eq!(bridge::query(conn, "SELECT count(*) AS c FROM r").unwrap(), r#"[{"c":0}]"#);
    assert!(bridge::execute(conn, "INSERT INTO r VALUES (1)").is_err());
    bridge::close_database(db);
}

#[test]
fn test_manager_round_trip() {
    let dir = tempdir().unwrap();
    let mut manager = DatabaseManager::with_options(dir.path(), OpenOptions::without_extensions());

    manager.open("alpha").unwrap();
    manager.open("beta.db").unwrap();
    assert_eq!(manager.open_names(), vec!["alpha", "beta.db"]);

    manager.execute_batch("alpha", "CREATE TABLE a(v INT)").unwrap();
    manager.execute_batch("beta.db", "CREATE TABLE b(v INT)").unwrap();
    assert_eq!(manager.list_tables("alpha").unwrap(), vec!["a"]);
    assert_eq!(manager.list_tables("beta.db").unwrap(), vec!["b"]);
    assert!(!manager.has_extension("alpha", "spatial").unwrap());

    let export = manager
        .export_parquet("alpha", "a", &dir.path().join("a.parquet"), Some("gzip"))
        .unwrap();
    assert_eq!(export.row_count, 0);
    assert!(export.path.exists());

    assert!(matches!(
        manager.export_parquet("alpha", "a", dir.path(), Some("bogus")),
        Err(BridgeError::Params(_))
    ));

    manager.delete_database("beta.db").unwrap();
    assert_eq!(manager.open_names(), vec!["alpha"]);
    assert!(!manager.database_exists("beta.db"));
}
