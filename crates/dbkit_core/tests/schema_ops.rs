use dbkit_core::{
    open_db_in_memory, AlterOp, ColumnDef, ColumnType, DbClient, DbError, Filter, TableDef,
};
use rusqlite::types::Value;

fn table_exists(db: &DbClient, name: &str) -> bool {
    let rows = db
        .query(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            &[Value::Text(name.to_string())],
        )
        .unwrap();
    !rows.is_empty()
}

fn column_names(db: &DbClient, table: &str) -> Vec<String> {
    let rows = db
        .query(&format!("SELECT name FROM pragma_table_info('{table}')"), &[])
        .unwrap();
    rows.into_iter()
        .map(|record| match record.get("name") {
            Some(Value::Text(name)) => name.clone(),
            other => panic!("unexpected column name value: {other:?}"),
        })
        .collect()
}

#[test]
fn create_table_then_insert_works() {
    let db = open_db_in_memory().unwrap();
    db.create_table(
        &TableDef::new("notes")
            .column(ColumnDef::new("id", ColumnType::Integer).primary_key())
            .column(ColumnDef::new("body", ColumnType::Text).not_null()),
    )
    .unwrap();

    assert!(table_exists(&db, "notes"));
    db.insert("notes", &[("body", Value::Text("hello".to_string()))])
        .unwrap();
    assert_eq!(db.count("notes", &Filter::new()).unwrap(), 1);
}

#[test]
fn create_table_if_not_exists_tolerates_reruns() {
    let db = open_db_in_memory().unwrap();
    let def = TableDef::new("notes")
        .column(ColumnDef::new("id", ColumnType::Integer).primary_key())
        .if_not_exists();

    db.create_table(&def).unwrap();
    db.create_table(&def).unwrap();

    // Without the flag the rerun fails and the error is retrievable.
    let strict = TableDef::new("notes").column(ColumnDef::new("id", ColumnType::Integer));
    let err = db.create_table(&strict).unwrap_err();
    assert!(matches!(err, DbError::Sqlite(_)));
    assert!(db.last_error().is_some());
}

#[test]
fn alter_table_add_drop_and_rename_column() {
    let db = open_db_in_memory().unwrap();
    db.create_table(
        &TableDef::new("people")
            .column(ColumnDef::new("id", ColumnType::Integer).primary_key())
            .column(ColumnDef::new("name", ColumnType::Text)),
    )
    .unwrap();

    db.alter_table(
        "people",
        &AlterOp::AddColumn(ColumnDef::new("age", ColumnType::Integer)),
    )
    .unwrap();
    assert!(column_names(&db, "people").contains(&"age".to_string()));

    db.alter_table(
        "people",
        &AlterOp::RenameColumn {
            from: "name".to_string(),
            to: "full_name".to_string(),
        },
    )
    .unwrap();
    let names = column_names(&db, "people");
    assert!(names.contains(&"full_name".to_string()));
    assert!(!names.contains(&"name".to_string()));

    db.alter_table("people", &AlterOp::DropColumn("age".to_string()))
        .unwrap();
    assert!(!column_names(&db, "people").contains(&"age".to_string()));
}

#[test]
fn alter_table_rename_table() {
    let db = open_db_in_memory().unwrap();
    db.create_table(
        &TableDef::new("tmp").column(ColumnDef::new("id", ColumnType::Integer)),
    )
    .unwrap();

    db.alter_table("tmp", &AlterOp::RenameTo("permanent".to_string()))
        .unwrap();
    assert!(!table_exists(&db, "tmp"));
    assert!(table_exists(&db, "permanent"));
}

#[test]
fn drop_table_with_and_without_if_exists() {
    let db = open_db_in_memory().unwrap();
    db.create_table(
        &TableDef::new("gone").column(ColumnDef::new("id", ColumnType::Integer)),
    )
    .unwrap();

    db.drop_table("gone", false).unwrap();
    assert!(!table_exists(&db, "gone"));

    db.drop_table("gone", true).unwrap();
    assert!(matches!(
        db.drop_table("gone", false).unwrap_err(),
        DbError::Sqlite(_)
    ));
}

#[test]
fn truncate_clears_rows_and_resets_autoincrement() {
    let db = open_db_in_memory().unwrap();
    db.create_table(
        &TableDef::new("events")
            .column(
                ColumnDef::new("id", ColumnType::Integer)
                    .primary_key()
                    .autoincrement(),
            )
            .column(ColumnDef::new("label", ColumnType::Text)),
    )
    .unwrap();

    for label in ["a", "b", "c"] {
        db.insert("events", &[("label", Value::Text(label.to_string()))])
            .unwrap();
    }

    let deleted = db.truncate_table("events").unwrap();
    assert_eq!(deleted, 3);
    assert_eq!(db.count("events", &Filter::new()).unwrap(), 0);

    // Counter restarted: the next row gets id 1 again.
    let id = db
        .insert("events", &[("label", Value::Text("d".to_string()))])
        .unwrap();
    assert_eq!(id, 1);
}

#[test]
fn truncate_works_without_an_autoincrement_catalog() {
    let db = open_db_in_memory().unwrap();
    db.create_table(
        &TableDef::new("plain").column(ColumnDef::new("v", ColumnType::Integer)),
    )
    .unwrap();
    db.insert("plain", &[("v", Value::Integer(1))]).unwrap();

    assert_eq!(db.truncate_table("plain").unwrap(), 1);
    assert_eq!(db.count("plain", &Filter::new()).unwrap(), 0);
}

#[test]
fn schema_ops_reject_hostile_identifiers() {
    let db = open_db_in_memory().unwrap();
    let err = db.drop_table("users; --", false).unwrap_err();
    assert!(matches!(err, DbError::InvalidIdentifier(_)));

    let def = TableDef::new("ok").column(ColumnDef::new("bad name", ColumnType::Text));
    assert!(matches!(
        db.create_table(&def).unwrap_err(),
        DbError::InvalidIdentifier(_)
    ));
}
