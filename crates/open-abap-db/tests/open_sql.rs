//! End-to-end Open SQL flows against an in-memory backend.

use open_abap_db::{
    Condition, DbError, DeleteOptions, DynamicOsqlSemantics, FaultKind, InsertOptions,
    MutationOutcome, SelectOptions, Session, SessionConfig, SqlValue, TransactionState,
    UpdateOptions,
};

fn connected() -> Session {
    let mut session: Session = Session::new(SessionConfig::in_memory());
    session.connect().unwrap();
    session
        .execute(vec![
            "CREATE TABLE zflight (carrid TEXT, connid INTEGER, price REAL, \
             PRIMARY KEY (carrid, connid))",
            "CREATE TABLE zcarrier (carrid TEXT PRIMARY KEY, name TEXT)",
        ])
        .unwrap();
    session
}

fn seed_flights(session: &mut Session, count: i64) {
    for connid in 0..count {
        let outcome = session
            .insert(&InsertOptions::new(
                "zflight",
                ["CARRID", "CONNID", "PRICE"],
                ["'LH'".to_string(), connid.to_string(), "100.5".to_string()],
            ))
            .unwrap();
        assert!(outcome.is_ok());
    }
}

fn connids(rows: &[open_abap_db::SqlRow]) -> Vec<i64> {
    rows.iter()
        .map(|r| r.get_by_name("connid").and_then(SqlValue::as_integer).unwrap())
        .collect()
}

/// Test: UP TO n ROWS limits the result, trailing clauses still apply.
#[test]
fn up_to_rows_limits_result() {
    let mut session = connected();
    seed_flights(&mut session, 10);

    let result = session
        .select(&SelectOptions::new(
            "SELECT * FROM zflight UP TO 5 ROWS WHERE connid >= 3 ORDER BY connid DESCENDING",
        ))
        .unwrap();
    assert_eq!(connids(&result.rows), vec![9, 8, 7, 6, 5]);
}

/// Test: ORDER BY PRIMARY KEY expands to the supplied key columns.
#[test]
fn order_by_primary_key() {
    let mut session = connected();
    session
        .execute("INSERT INTO zflight VALUES ('UA', 2, 1.0), ('AA', 9, 1.0), ('UA', 1, 1.0)")
        .unwrap();

    let result = session
        .select(
            &SelectOptions::new("SELECT zflight~carrid, zflight~connid FROM zflight ORDER BY PRIMARY KEY")
                .with_primary_key(["CARRID", "CONNID"]),
        )
        .unwrap();
    assert_eq!(connids(&result.rows), vec![9, 1, 2]);

    // Without a key list the clause is dropped and the query still runs
    let result = session
        .select(&SelectOptions::new(
            "SELECT * FROM zflight ORDER BY PRIMARY KEY",
        ))
        .unwrap();
    assert_eq!(result.rows.len(), 3);
}

/// Test: a duplicate insert reports subrc 4 instead of failing.
#[test]
fn duplicate_insert_reports_status() {
    let mut session = connected();
    let options = InsertOptions::new("zcarrier", ["CARRID", "NAME"], ["'LH'", "'Lufthansa'"]);

    assert_eq!(
        session.insert(&options).unwrap(),
        MutationOutcome { subrc: 0, dbcnt: 1 }
    );
    assert_eq!(
        session.insert(&options).unwrap(),
        MutationOutcome { subrc: 4, dbcnt: 0 }
    );
}

/// Test: insert into a missing table is folded into a status, not raised.
#[test]
fn insert_into_missing_table() {
    let mut session = connected();
    let outcome = session
        .insert(&InsertOptions::new("zmissing", ["A"], ["1"]))
        .unwrap();
    assert!(outcome.is_not_found());
}

/// Test: delete reports affected rows, or subrc 4 when nothing matched.
#[test]
fn delete_row_counts() {
    let mut session = connected();
    seed_flights(&mut session, 5);

    assert_eq!(
        session
            .delete(&DeleteOptions::new("zflight", "connid > 100"))
            .unwrap(),
        MutationOutcome { subrc: 4, dbcnt: 0 }
    );
    assert_eq!(
        session
            .delete(&DeleteOptions::new("zflight", "connid < 3"))
            .unwrap(),
        MutationOutcome { subrc: 0, dbcnt: 3 }
    );
}

/// Test: update reports affected rows and swallows backend faults.
#[test]
fn update_row_counts() {
    let mut session = connected();
    seed_flights(&mut session, 4);

    let outcome = session
        .update(&UpdateOptions::new(
            "zflight",
            ["price = price * 2", "carrid = 'LX'"],
            "connid IN (1, 2)",
        ))
        .unwrap();
    assert_eq!(outcome, MutationOutcome { subrc: 0, dbcnt: 2 });

    let outcome = session
        .update(&UpdateOptions::new("zflight", ["nosuchcol = 1"], "1 = 1"))
        .unwrap();
    assert_eq!(outcome, MutationOutcome::not_found());
}

/// Test: cursor pages through a 7-row result three rows at a time.
#[test]
fn cursor_pagination() {
    let mut session = connected();
    seed_flights(&mut session, 7);

    let mut cursor = session
        .open_cursor(
            &SelectOptions::new("SELECT * FROM zflight ORDER BY PRIMARY KEY")
                .with_primary_key(["CARRID", "CONNID"]),
        )
        .unwrap();

    assert_eq!(connids(&cursor.fetch_next_cursor(3).unwrap().rows), vec![0, 1, 2]);
    assert_eq!(connids(&cursor.fetch_next_cursor(3).unwrap().rows), vec![3, 4, 5]);
    assert_eq!(connids(&cursor.fetch_next_cursor(3).unwrap().rows), vec![6]);
    assert!(cursor.fetch_next_cursor(3).unwrap().is_empty());
    assert!(cursor.fetch_next_cursor(3).unwrap().is_empty());

    cursor.close_cursor().unwrap();
    assert!(matches!(cursor.fetch_next_cursor(3), Err(DbError::CursorClosed)));
}

/// Test: the cursor is a snapshot; later writes do not show up in it.
#[test]
fn cursor_is_materialized() {
    let mut session = connected();
    seed_flights(&mut session, 2);

    let mut cursor = session
        .open_cursor(&SelectOptions::new("SELECT * FROM zflight"))
        .unwrap();
    session
        .delete(&DeleteOptions::new("zflight", "1 = 1"))
        .unwrap();

    assert_eq!(cursor.fetch_next_cursor(10).unwrap().len(), 2);
}

/// Test: querying a missing table raises the mapped condition.
#[test]
fn missing_table_with_condition_mapper() {
    let mut session: Session =
        Session::new(SessionConfig::in_memory()).with_condition_mapper(DynamicOsqlSemantics);
    session.connect().unwrap();

    let err = session
        .select(&SelectOptions::new("SELECT * FROM zmissing"))
        .unwrap_err();
    let Some(condition) = err.as_condition() else {
        panic!("expected a condition, got {err:?}");
    };
    assert_eq!(condition.class, "CX_SY_DYNAMIC_OSQL_SEMANTICS");
    assert_eq!(condition.sqlmsg, "no such table: zmissing");
    assert_eq!(condition.kind, FaultKind::UndefinedObject);
    assert_eq!(condition.sqlcode, -204);
}

/// Test: without a mapper the raw backend fault propagates.
#[test]
fn missing_table_without_condition_mapper() {
    let mut session = connected();
    let err = session
        .select(&SelectOptions::new("SELECT * FROM zmissing"))
        .unwrap_err();

    let fault = err.as_backend().expect("backend fault");
    assert_eq!(fault.kind(), FaultKind::UndefinedObject);
    assert!(fault.downcast_ref::<rusqlite::Error>().is_some());
}

/// Test: a closure works as a condition mapper.
#[test]
fn closure_condition_mapper() {
    let mut session: Session = Session::new(SessionConfig::in_memory())
        .with_condition_mapper(|fault: &open_abap_db::BackendError| {
            Condition::from_fault("ZCX_FLIGHT", fault)
        });
    session.connect().unwrap();

    let err = session
        .select(&SelectOptions::new("SELEC nonsense"))
        .unwrap_err();
    let condition = err.as_condition().unwrap();
    assert!(condition.is_class("zcx_flight"));
    assert_eq!(condition.sqlcode, -104);
    assert_eq!(condition.sqlmsg, r#"near "SELEC": syntax error"#);
}

/// Test: rolled back statements are not visible afterwards.
#[test]
fn rollback_discards_changes() {
    let mut session = connected();
    seed_flights(&mut session, 1);

    session.begin_transaction().unwrap();
    assert_eq!(session.transaction_state(), TransactionState::Active);
    seed_flights_from(&mut session, 10, 3);
    session
        .delete(&DeleteOptions::new("zflight", "connid = 0"))
        .unwrap();
    assert_eq!(session.transactions().statement_count(), 4);
    session.rollback().unwrap();

    let result = session
        .select(&SelectOptions::new("SELECT * FROM zflight"))
        .unwrap();
    assert_eq!(connids(&result.rows), vec![0]);
    assert_eq!(session.transaction_state(), TransactionState::Inactive);
}

/// Test: committed statements stay visible.
#[test]
fn commit_keeps_changes() {
    let mut session = connected();

    session.begin_transaction().unwrap();
    seed_flights(&mut session, 2);
    session.commit().unwrap();
    session.rollback().unwrap();

    let result = session
        .select(&SelectOptions::new("SELECT * FROM zflight"))
        .unwrap();
    assert_eq!(result.rows.len(), 2);
}

/// Test: a failing statement inside a transaction leaves it open.
#[test]
fn failed_insert_keeps_transaction_open() {
    let mut session = connected();
    let options = InsertOptions::new("zcarrier", ["CARRID"], ["'LH'"]);

    session.begin_transaction().unwrap();
    assert!(session.insert(&options).unwrap().is_ok());
    assert!(session.insert(&options).unwrap().is_not_found());
    assert_eq!(session.transaction_state(), TransactionState::Active);
    session.commit().unwrap();

    let result = session
        .select(&SelectOptions::new("SELECT * FROM zcarrier"))
        .unwrap();
    assert_eq!(result.rows.len(), 1);
}

/// Test: a batch stops at the first failing script.
#[test]
fn batch_execute_stops_at_failure() {
    let mut session = connected();

    let err = session
        .execute(vec![
            "INSERT INTO zcarrier VALUES ('AA', 'American')",
            "INSERT INTO zmissing VALUES (1)",
            "INSERT INTO zcarrier VALUES ('UA', 'United')",
        ])
        .unwrap_err();
    assert!(matches!(err, DbError::Backend(_)));

    let result = session
        .select(&SelectOptions::new("SELECT carrid FROM zcarrier"))
        .unwrap();
    assert_eq!(result.rows.len(), 1);
}

/// Test: one script may hold several statements; empty scripts are skipped.
#[test]
fn execute_multi_statement_script() {
    let mut session = connected();
    session
        .execute(
            "INSERT INTO zcarrier VALUES ('AA', 'American'); \
             INSERT INTO zcarrier VALUES ('UA', 'United');",
        )
        .unwrap();
    session.execute(vec!["", ""]).unwrap();

    let result = session
        .select(&SelectOptions::new("SELECT * FROM zcarrier"))
        .unwrap();
    assert_eq!(result.rows.len(), 2);
}

/// Test: disconnect rolls back and later statements are programming faults.
#[test]
fn disconnect_rolls_back_and_blocks_statements() {
    let dir = tempfile::tempdir().unwrap();
    let database = dir.path().join("osql.db");
    let config = SessionConfig::new(database.to_str().unwrap());

    let mut session: Session = Session::new(config.clone());
    session.connect().unwrap();
    session
        .execute("CREATE TABLE zcarrier (carrid TEXT PRIMARY KEY)")
        .unwrap();
    session.begin_transaction().unwrap();
    session
        .insert(&InsertOptions::new("zcarrier", ["CARRID"], ["'LH'"]))
        .unwrap();
    session.disconnect().unwrap();

    let err = session
        .insert(&InsertOptions::new("zcarrier", ["CARRID"], ["'LH'"]))
        .unwrap_err();
    assert!(matches!(err, DbError::NotConnected { ref context } if context == "DEFAULT"));

    // Reopen: the uncommitted insert is gone
    let mut reopened: Session = Session::new(config);
    reopened.connect().unwrap();
    let result = reopened
        .select(&SelectOptions::new("SELECT * FROM zcarrier"))
        .unwrap();
    assert!(result.rows.is_empty());
}

/// Test: connecting again replaces the handle.
#[test]
fn reconnect_replaces_handle() {
    let mut session = connected();
    session.begin_transaction().unwrap();
    session.connect().unwrap();

    assert_eq!(session.transaction_state(), TransactionState::Inactive);
    // Fresh in-memory database
    assert!(session
        .select(&SelectOptions::new("SELECT * FROM zflight"))
        .is_err());
}

/// Test: raw BEGIN/COMMIT keep the transaction state in step.
#[test]
fn raw_transaction_statements() {
    let mut session = connected();
    session.execute("BEGIN").unwrap();
    assert_eq!(session.transaction_state(), TransactionState::Active);
    session.execute("COMMIT").unwrap();
    assert_eq!(session.transaction_state(), TransactionState::Inactive);
}

fn seed_flights_from(session: &mut Session, start: i64, count: i64) {
    for connid in start..start + count {
        session
            .insert(&InsertOptions::new(
                "zflight",
                ["CARRID", "CONNID"],
                ["'LH'".to_string(), connid.to_string()],
            ))
            .unwrap();
    }
}

/// Test: tracing is a side effect only; outcomes are unchanged.
#[test]
fn trace_does_not_change_outcomes() {
    let mut session: Session = Session::new(SessionConfig::in_memory().with_trace(true));
    assert!(session.trace_enabled());
    session.connect().unwrap();
    session
        .execute("CREATE TABLE zcarrier (carrid TEXT PRIMARY KEY)")
        .unwrap();

    let options = InsertOptions::new("zcarrier", ["CARRID"], ["'LH'"]);
    assert!(session.insert(&options).unwrap().is_ok());
    assert!(session.insert(&options).unwrap().is_not_found());
    assert_eq!(
        session
            .select(&SelectOptions::new("SELECT * FROM zcarrier UP TO 1 ROWS"))
            .unwrap()
            .rows
            .len(),
        1
    );
}
