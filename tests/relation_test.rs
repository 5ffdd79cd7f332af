use duck_plus::config::IN_MEMORY;
use duck_plus::{ConnectedRelation, Connection, DuckPlusError, EngineConfig, Joinable, RelationJoins};
use polars::prelude::*;

fn sample_connection() -> Result<Connection, DuckPlusError> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch(
        "CREATE TABLE t1 (id INTEGER, value TEXT, ts TIMESTAMP, score DOUBLE, flag BOOLEAN, day DATE);
         INSERT INTO t1 VALUES
            (1, 'a', '2023-01-01 10:00:00', 1.5, true, '2023-01-01'),
            (2, NULL, '2023-01-01 11:00:00', NULL, false, '2023-01-02'),
            (3, 'c', NULL, 3.0, NULL, NULL);
         CREATE TABLE t2 (id INTEGER, value2 TEXT);
         INSERT INTO t2 VALUES (1, 'x'), (2, 'y');",
    )?;
    Ok(conn)
}

#[test]
fn test_repr() {
    let conn = sample_connection().unwrap();
    let rel = conn.sql("SELECT id, value FROM t1").unwrap();
    let repr = rel.to_string();
    assert!(repr.contains("Relation(source="));
    assert!(repr.contains("columns="));
    assert_eq!(repr, "Relation(source=:memory:, columns=['id', 'value'])");
}

#[test]
fn test_sql_accepts_trailing_semicolon() {
    let conn = sample_connection().unwrap();
    let rel = conn.sql("  SELECT id FROM t1 WHERE id > 1;  ").unwrap();
    assert_eq!(rel.columns(), ["id"]);
    assert_eq!(rel.row_count().unwrap(), 2);
}

#[test]
fn test_invalid_query_is_an_engine_error() {
    let conn = sample_connection().unwrap();
    let err = conn.sql("SELECT missing FROM t1").unwrap_err();
    assert!(matches!(err, DuckPlusError::DuckDb(_)));
    assert!(!err.is_caller_error());
}

#[test]
fn test_fields_report_engine_types() {
    let conn = sample_connection().unwrap();
    let rel = conn.table("t1").unwrap();
    assert!(rel.field("TS").unwrap().is_temporal());
    assert!(rel.field("day").unwrap().is_temporal());
    assert!(!rel.field("id").unwrap().is_temporal());
    assert!(rel.field("nope").is_none());
}

#[test]
fn test_to_dataframe() {
    let conn = sample_connection().unwrap();
    let df = conn.table("t1").unwrap().to_dataframe().unwrap();
    assert_eq!(df.shape(), (3, 6));
    assert_eq!(df.column("id").unwrap().dtype(), &DataType::Int64);
    assert_eq!(df.column("value").unwrap().null_count(), 1);
    assert_eq!(
        df.column("ts").unwrap().dtype(),
        &DataType::Datetime(TimeUnit::Microseconds, None)
    );
    assert_eq!(df.column("score").unwrap().dtype(), &DataType::Float64);
    assert_eq!(df.column("flag").unwrap().dtype(), &DataType::Boolean);
    assert_eq!(df.column("day").unwrap().dtype(), &DataType::Date);
}

#[test]
fn test_to_dataframe_numeric_and_time_types() {
    let conn = sample_connection().unwrap();
    let df = conn
        .sql(
            "SELECT 1.5 AS price, CAST(12.25 AS DECIMAL(18, 3)) AS amount, \
             INTERVAL 5 MINUTE AS gap, TIME '10:00:00' AS tod, \
             CAST(42 AS UBIGINT) AS count, CAST(7 AS HUGEINT) AS huge",
        )
        .unwrap()
        .to_dataframe()
        .unwrap();

    assert_eq!(df.column("price").unwrap().dtype(), &DataType::Float64);
    assert_eq!(df.column("price").unwrap().f64().unwrap().get(0), Some(1.5));
    assert_eq!(df.column("amount").unwrap().f64().unwrap().get(0), Some(12.25));

    let gap = df.column("gap").unwrap();
    assert_eq!(gap.dtype(), &DataType::Duration(TimeUnit::Microseconds));
    let gap = gap.cast(&DataType::Int64).unwrap();
    assert_eq!(gap.i64().unwrap().get(0), Some(300_000_000));

    let tod = df.column("tod").unwrap();
    assert_eq!(tod.dtype(), &DataType::Time);
    let tod = tod.cast(&DataType::Int64).unwrap();
    assert_eq!(tod.i64().unwrap().get(0), Some(36_000_000_000_000));

    assert_eq!(df.column("count").unwrap().u64().unwrap().get(0), Some(42));
    assert_eq!(df.column("huge").unwrap().f64().unwrap().get(0), Some(7.0));
}

#[test]
fn test_joined_relation_to_lazy() {
    let conn = sample_connection().unwrap();
    let t1 = conn.table("t1").unwrap();
    let t2 = conn.table("t2").unwrap();
    let joined = t1.using_join(&t2, "inner", &["id"]).unwrap();

    let df = joined
        .to_lazy()
        .unwrap()
        .filter(col("value2").eq(lit("y")))
        .select([col("id")])
        .collect()
        .unwrap();
    assert_eq!(df.height(), 1);
    assert_eq!(df.column("id").unwrap().i64().unwrap().get(0), Some(2));
}

#[test]
fn test_connected_relation_in_memory() {
    let conn = sample_connection().unwrap();
    let connected = ConnectedRelation::new(conn.table("t2").unwrap()).unwrap();
    assert_eq!(connected.conn_path(), IN_MEMORY);
    assert_eq!(Joinable::columns(&connected), ["id", "value2"]);
    assert!(connected.is_joinable_with(&conn.table("t1").unwrap()));
    assert!(connected.connection().same_as(&conn));
}

#[test]
fn test_connected_relation_file_backed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("joins.duckdb");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("CREATE TABLE t (id INTEGER); INSERT INTO t VALUES (1);")
        .unwrap();

    let connected = ConnectedRelation::new(conn.table("t").unwrap()).unwrap();
    assert_eq!(connected.conn_path(), path.to_string_lossy());
    assert_eq!(connected.into_relation().row_count().unwrap(), 1);
}

#[test]
fn test_open_with_config() {
    let config = EngineConfig {
        threads: Some(2),
        memory_limit: Some("256MB".to_string()),
        ..EngineConfig::default()
    };
    let conn = Connection::open_with(&config).unwrap();
    assert!(conn.is_in_memory());
    assert_eq!(conn.sql("SELECT 42 AS answer").unwrap().row_count().unwrap(), 1);

    let invalid = EngineConfig {
        memory_limit: Some("lots".to_string()),
        ..EngineConfig::default()
    };
    assert!(matches!(
        Connection::open_with(&invalid),
        Err(DuckPlusError::InvalidConfig(_))
    ));
}
