//! Integration tests for cursor fetch against the in-memory engine.
//!
//! Each test scripts a result set, drives it through `Rows`, and checks both
//! the delivered values and the sequence of native calls.

use rowlink_core::native::{
    CallLog, Cell, ColumnDescription, NativeCall, ScriptedStatement, SqlDataType,
};
use rowlink_core::{
    BindingStrategy, ChunkTermination, DiagnosticRecord, FetchConfig, FetchStatus, OdbcError,
    Rows, Value, ValueKind,
};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// `(id INTEGER, name VARCHAR(16), score DOUBLE, raw LONGVARBINARY)`
fn scores_statement() -> ScriptedStatement {
    ScriptedStatement::new(vec![
        ColumnDescription::new("id", SqlDataType::INTEGER, 10),
        ColumnDescription::new("name", SqlDataType::VARCHAR, 16),
        ColumnDescription::new("score", SqlDataType::DOUBLE, 15),
        ColumnDescription::new("raw", SqlDataType::LONGVARBINARY, 0),
    ])
    .with_row(vec![
        Cell::long(1),
        Cell::text("alice"),
        Cell::double(3.5),
        Cell::binary(&[0xDE, 0xAD]),
    ])
    .with_row(vec![
        Cell::long(2),
        Cell::text("bob"),
        Cell::null(),
        Cell::binary(&[0xBE, 0xEF, 0x00]),
    ])
}

fn text_columns(count: u16) -> Vec<ColumnDescription> {
    (0..count)
        .map(|i| ColumnDescription::new(format!("c{}", i), SqlDataType::LONGVARCHAR, 0))
        .collect()
}

#[test]
fn test_end_to_end_two_rows() {
    init_tracing();
    let mut stmt = scores_statement();
    let log = stmt.call_log();
    let mut rows = Rows::open(&mut stmt, FetchConfig::default()).unwrap();

    assert_eq!(rows.column_names(), ["id", "name", "score", "raw"]);
    let mut row = vec![Value::Null; 4];

    assert_eq!(rows.next(&mut row).unwrap(), FetchStatus::Row);
    assert_eq!(
        row,
        vec![
            Value::Int(1),
            Value::text("alice"),
            Value::Float(3.5),
            Value::bytes(&[0xDE, 0xAD]),
        ]
    );

    assert_eq!(rows.next(&mut row).unwrap(), FetchStatus::Row);
    assert_eq!(
        row,
        vec![
            Value::Int(2),
            Value::text("bob"),
            Value::Null,
            Value::bytes(&[0xBE, 0xEF, 0x00]),
        ]
    );

    assert_eq!(rows.next(&mut row).unwrap(), FetchStatus::EndOfData);
    assert_eq!(rows.rows_fetched(), 2);
    rows.close().unwrap();

    assert_eq!(log.count(NativeCall::Fetch), 3);
    assert_eq!(log.count(NativeCall::CloseCursor), 1);
}

#[test]
fn test_scan_kinds_and_type_names() {
    let mut stmt = scores_statement();
    let rows = Rows::open(&mut stmt, FetchConfig::default()).unwrap();

    let kinds: Vec<ValueKind> = (0..4).map(|i| rows.scan_value_kind(i).unwrap()).collect();
    assert_eq!(
        kinds,
        vec![
            ValueKind::NullableInt64,
            ValueKind::RawBytes,
            ValueKind::NullableFloat64,
            ValueKind::RawBytes,
        ]
    );

    let names: Vec<&str> = (0..4).map(|i| rows.database_type_name(i).unwrap()).collect();
    assert_eq!(names, vec!["SQL_C_LONG", "SQL_C_CHAR", "SQL_C_DOUBLE", "SQL_C_BINARY"]);

    assert!(matches!(
        rows.scan_value_kind(4),
        Err(OdbcError::ColumnIndexOutOfRange { index: 4, count: 4 })
    ));
}

#[test]
fn test_end_of_data_is_sticky() {
    let mut stmt = scores_statement();
    let log = stmt.call_log();
    let mut rows = Rows::open(&mut stmt, FetchConfig::default()).unwrap();
    let mut row = vec![Value::Null; 4];

    while rows.next(&mut row).unwrap() == FetchStatus::Row {}
    let fetches = log.count(NativeCall::Fetch);

    for _ in 0..3 {
        assert_eq!(rows.next(&mut row).unwrap(), FetchStatus::EndOfData);
    }
    assert_eq!(log.count(NativeCall::Fetch), fetches);
}

#[test]
fn test_close_twice_is_a_no_op() {
    let mut stmt = scores_statement();
    let log = stmt.call_log();
    let mut rows = Rows::open(&mut stmt, FetchConfig::default()).unwrap();

    rows.close().unwrap();
    let calls = log.len();
    rows.close().unwrap();
    assert_eq!(log.len(), calls);

    let mut row = vec![Value::Null; 4];
    assert!(matches!(rows.next(&mut row), Err(OdbcError::CursorClosed)));
    drop(rows);

    assert_eq!(log.count(NativeCall::UnbindCols), 1);
    assert_eq!(log.count(NativeCall::CloseCursor), 1);
}

#[test]
fn test_five_non_bindable_columns_in_order() {
    let rows_data: Vec<Vec<Cell>> = (0..3)
        .map(|r| (0..5).map(|c| Cell::text(&format!("r{}c{}", r, c))).collect())
        .collect();
    let mut stmt = ScriptedStatement::new(text_columns(5)).with_rows(rows_data);
    let log = stmt.call_log();
    let mut rows = Rows::open(&mut stmt, FetchConfig::default()).unwrap();
    assert!(rows
        .columns()
        .iter()
        .all(|c| c.strategy() == BindingStrategy::NonBindable));

    let mut row = vec![Value::Null; 5];
    let mut seen = 0;
    while rows.next(&mut row).unwrap() == FetchStatus::Row {
        for (c, value) in row.iter().enumerate() {
            assert_eq!(value.as_str(), Some(format!("r{}c{}", seen, c).as_str()));
        }
        seen += 1;
    }
    assert_eq!(seen, 3);

    let expected: Vec<u16> = (0..3).flat_map(|_| 1..=5).collect();
    assert_eq!(log.get_data_columns(), expected);
}

#[test]
fn test_multi_chunk_values_through_cursor() {
    let long_text = "lorem ipsum dolor sit amet ".repeat(20);
    let long_blob: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
    let mut stmt = ScriptedStatement::new(vec![
        ColumnDescription::new("body", SqlDataType::LONGVARCHAR, 0),
        ColumnDescription::new("blob", SqlDataType::LONGVARBINARY, 0),
    ])
    .with_row(vec![Cell::text(&long_text), Cell::binary(&long_blob)]);
    let log = stmt.call_log();

    let mut rows = Rows::open(&mut stmt, FetchConfig::for_testing()).unwrap();
    let row = rows.fetch_row().unwrap().unwrap();

    assert_eq!(row.get(0).and_then(Value::as_str), Some(long_text.as_str()));
    assert_eq!(row.get(1).and_then(Value::as_bytes), Some(long_blob.as_slice()));
    assert!(log.count(NativeCall::GetData(1)) > 1);
    assert!(log.count(NativeCall::GetData(2)) > 1);
}

#[test]
fn test_no_total_engine() {
    let text = "abcdefghijklmnopqrstuvwxyz".repeat(4);
    let mut stmt = ScriptedStatement::new(text_columns(1))
        .with_row(vec![Cell::text(&text)])
        .with_no_total(true);

    let mut rows = Rows::open(&mut stmt, FetchConfig::for_testing()).unwrap();
    let row = rows.fetch_row().unwrap().unwrap();
    assert_eq!(row.get(0).and_then(Value::as_str), Some(text.as_str()));
}

#[test]
fn test_confirm_with_no_data_policy() {
    let log = CallLog::new();
    let mut stmt = ScriptedStatement::new(text_columns(2))
        .with_row(vec![Cell::text("a"), Cell::text("b")])
        .with_call_log(log.clone());
    let config = FetchConfig::builder()
        .chunk_termination(ChunkTermination::ConfirmWithNoData)
        .build();

    let mut rows = Rows::open(&mut stmt, config).unwrap();
    let row = rows.fetch_row().unwrap().unwrap();
    assert_eq!(row.values(), [Value::text("a"), Value::text("b")]);
    assert_eq!(log.get_data_columns(), vec![1, 1, 2, 2]);
}

#[test]
fn test_bindable_after_non_bindable_is_read_explicitly() {
    let mut stmt = ScriptedStatement::new(vec![
        ColumnDescription::new("id", SqlDataType::INTEGER, 10),
        ColumnDescription::new("body", SqlDataType::LONGVARCHAR, 0),
        ColumnDescription::new("rank", SqlDataType::SMALLINT, 5),
    ])
    .with_row(vec![Cell::long(7), Cell::text("text"), Cell::long(3)])
    .with_row(vec![Cell::long(8), Cell::null(), Cell::null()]);
    let log = stmt.call_log();

    let mut rows = Rows::open(&mut stmt, FetchConfig::default()).unwrap();
    assert!(rows.columns()[0].is_bound());
    assert!(!rows.columns()[2].is_bound());

    let first = rows.fetch_row().unwrap().unwrap();
    assert_eq!(first.values(), [Value::Int(7), Value::text("text"), Value::Int(3)]);
    let second = rows.fetch_row().unwrap().unwrap();
    assert_eq!(second.values(), [Value::Int(8), Value::Null, Value::Null]);

    assert_eq!(log.count(NativeCall::BindCol(1)), 1);
    assert_eq!(log.count(NativeCall::BindCol(3)), 0);
    assert_eq!(log.get_data_columns(), vec![2, 3, 2, 3]);
}

#[test]
fn test_temporal_guid_and_wide_values() {
    let id = Uuid::parse_str("a1a2a3a4-b1b2-c1c2-d1d2-d3d4d5d6d7d8").unwrap();
    let mut stmt = ScriptedStatement::new(vec![
        ColumnDescription::new("at", SqlDataType::TYPE_TIMESTAMP, 27),
        ColumnDescription::new("day", SqlDataType::TYPE_DATE, 10),
        ColumnDescription::new("uid", SqlDataType::GUID, 36),
        ColumnDescription::new("flag", SqlDataType::BIT, 1),
        ColumnDescription::new("label", SqlDataType::WVARCHAR, 8),
    ])
    .with_row(vec![
        Cell::timestamp((2024, 3, 9), (14, 5, 0), 500_000_000),
        Cell::date(1970, 1, 1),
        Cell::guid(id),
        Cell::bit(true),
        Cell::wide("héllo"),
    ]);

    let mut rows = Rows::open(&mut stmt, FetchConfig::default()).unwrap();
    assert_eq!(rows.scan_value_kind(2).unwrap(), ValueKind::NullableInt64);
    let row = rows.fetch_row().unwrap().unwrap();

    assert_eq!(
        row.get(0).and_then(Value::as_str),
        Some("2024-03-09 14:05:00.500000000")
    );
    assert_eq!(row.get(1).and_then(Value::as_str), Some("1970-01-01"));
    assert_eq!(
        row.get(2).and_then(Value::as_str),
        Some("a1a2a3a4-b1b2-c1c2-d1d2-d3d4d5d6d7d8")
    );
    assert_eq!(row.get(3).and_then(Value::as_str), Some("1"));
    assert_eq!(row.get(4).and_then(Value::as_str), Some("héllo"));
}

#[test]
fn test_bound_truncation_poisons_cursor() {
    let mut stmt = ScriptedStatement::new(vec![ColumnDescription::new(
        "code",
        SqlDataType::VARCHAR,
        4,
    )])
    .with_row(vec![Cell::text("too long")]);

    let mut rows = Rows::open(&mut stmt, FetchConfig::default()).unwrap();
    let err = rows.fetch_row().unwrap_err();
    assert!(matches!(
        err,
        OdbcError::Truncated {
            column: 0,
            indicator: 8,
            capacity: 4
        }
    ));
    assert!(matches!(rows.fetch_row(), Err(OdbcError::CursorUnusable)));
}

#[test]
fn test_fetch_failure_mid_stream() {
    let mut stmt = scores_statement().fail_after(
        NativeCall::Fetch,
        1,
        DiagnosticRecord::new("HYT00", 0, "Timeout expired"),
    );
    let mut rows = Rows::open(&mut stmt, FetchConfig::default()).unwrap();

    assert!(rows.fetch_row().unwrap().is_some());
    let err = rows.fetch_row().unwrap_err();
    assert!(err.is_native());
    assert!(!err.is_retryable());
    assert_eq!(err.sqlstate(), Some("HYT00"));
    assert_eq!(err.to_string(), "SQLFetch failed: [HYT00] Timeout expired");
}

#[test]
fn test_unsupported_column_type() {
    let mut stmt = ScriptedStatement::new(vec![
        ColumnDescription::new("id", SqlDataType::INTEGER, 10),
        ColumnDescription::new("shape", SqlDataType(-151), 0),
    ]);

    let err = Rows::open(&mut stmt, FetchConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        OdbcError::UnsupportedColumnType {
            column: 1,
            sql_type: -151
        }
    ));
}

#[test]
fn test_empty_result_set() {
    let mut stmt = ScriptedStatement::new(vec![ColumnDescription::new(
        "id",
        SqlDataType::INTEGER,
        10,
    )]);
    let mut rows = Rows::open(&mut stmt, FetchConfig::default()).unwrap();

    assert!(rows.fetch_row().unwrap().is_none());
    assert_eq!(rows.rows_fetched(), 0);
}
