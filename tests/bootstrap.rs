use sqlboot::testing::MemorySession;
use sqlboot::{
    BootstrapError, ColumnDefault, ColumnSpec, ColumnType, DbError, SchemaBootstrapper, SeedSpec,
    SeedValue, TableState, TableSpec,
};

fn widgets_v1() -> TableSpec {
    TableSpec::with_id(
        "widgets",
        vec![ColumnSpec::new("name", ColumnType::VarChar { length: 50 })],
    )
}

fn widgets_v2() -> TableSpec {
    TableSpec::with_id(
        "widgets",
        vec![
            ColumnSpec::new("name", ColumnType::VarChar { length: 50 }),
            ColumnSpec::new(
                "status",
                ColumnType::Enum {
                    values: vec!["Active".to_string(), "Inactive".to_string()],
                },
            )
            .default_value(ColumnDefault::Text("Active".to_string())),
        ],
    )
}

fn widget_seed() -> SeedSpec {
    SeedSpec::new(
        "widgets",
        &["name"],
        vec![
            vec![SeedValue::Text("sprocket".to_string())],
            vec![SeedValue::Text("flange".to_string())],
        ],
    )
}

#[tokio::test]
async fn test_create_then_evolve_scenario() {
    let mut db = MemorySession::new();

    let report = SchemaBootstrapper::new(vec![widgets_v1()])
        .unwrap()
        .with_seeds(vec![widget_seed()])
        .unwrap()
        .ensure(&mut db)
        .await
        .unwrap();

    assert_eq!(report.tables_created, vec!["widgets".to_string()]);
    assert_eq!(report.table_state("widgets"), Some(TableState::Created));
    assert_eq!(db.columns_of("widgets"), vec!["id", "name"]);
    assert_eq!(db.rows_in("widgets"), 2);

    // Grow the declaration by one column and run again.
    let report = SchemaBootstrapper::new(vec![widgets_v2()])
        .unwrap()
        .ensure(&mut db)
        .await
        .unwrap();

    assert_eq!(report.columns_added.len(), 1);
    assert_eq!(report.columns_added[0].column, "status");
    assert_eq!(report.table_state("widgets"), Some(TableState::Altered));
    // Rows that predate the column read its default.
    assert_eq!(
        db.value("widgets", 0, "status"),
        Some(&SeedValue::Text("Active".to_string()))
    );
    assert_eq!(
        db.value("widgets", 1, "status"),
        Some(&SeedValue::Text("Active".to_string()))
    );
}

#[tokio::test]
async fn test_second_ensure_is_a_noop() {
    let mut db = MemorySession::new();
    let boot = SchemaBootstrapper::new(vec![widgets_v2()])
        .unwrap()
        .with_seeds(vec![widget_seed()])
        .unwrap();

    let first = boot.ensure(&mut db).await.unwrap();
    assert!(!first.is_noop());

    let second = boot.ensure(&mut db).await.unwrap();
    assert!(second.is_noop());
    assert_eq!(second.table_state("widgets"), Some(TableState::UpToDate));
    assert_eq!(db.rows_in("widgets"), 2);
}

#[tokio::test]
async fn test_additive_evolution_preserves_existing_data() {
    let mut db = MemorySession::new();
    let boot = SchemaBootstrapper::new(vec![widgets_v1()])
        .unwrap()
        .with_seeds(vec![widget_seed()])
        .unwrap();
    boot.ensure(&mut db).await.unwrap();

    let boot = SchemaBootstrapper::new(vec![widgets_v2()]).unwrap();
    boot.ensure(&mut db).await.unwrap();

    assert_eq!(db.columns_of("widgets"), vec!["id", "name", "status"]);
    assert_eq!(db.rows_in("widgets"), 2);
    assert_eq!(
        db.value("widgets", 0, "name"),
        Some(&SeedValue::Text("sprocket".to_string()))
    );
}

#[tokio::test]
async fn test_seed_runs_exactly_once() {
    let mut db = MemorySession::new();
    let boot = SchemaBootstrapper::new(vec![widgets_v1()])
        .unwrap()
        .with_seeds(vec![widget_seed()])
        .unwrap();

    let first = boot.ensure(&mut db).await.unwrap();
    assert_eq!(first.seeds_applied.len(), 1);
    assert_eq!(first.seeds_applied[0].rows_inserted, 2);
    assert_eq!(db.rows_in("widgets"), 2);

    let second = boot.ensure(&mut db).await.unwrap();
    assert!(second.seeds_applied.is_empty());
    assert_eq!(db.rows_in("widgets"), 2);
}

#[tokio::test]
async fn test_seed_skipped_when_table_has_any_row() {
    let mut db = MemorySession::new();
    db.insert_manual_row(
        "widgets",
        &[
            ("id", SeedValue::Int(99)),
            ("name", SeedValue::Text("handmade".to_string())),
        ],
    );

    let boot = SchemaBootstrapper::new(vec![widgets_v1()])
        .unwrap()
        .with_seeds(vec![widget_seed()])
        .unwrap();
    let report = boot.ensure(&mut db).await.unwrap();

    assert!(report.seeds_applied.is_empty());
    assert_eq!(db.rows_in("widgets"), 1);
}

#[tokio::test]
async fn test_failed_column_does_not_abort_siblings() {
    let mut db = MemorySession::new();
    let boot = SchemaBootstrapper::new(vec![widgets_v1()]).unwrap();
    boot.ensure(&mut db).await.unwrap();

    let spec = TableSpec::with_id(
        "widgets",
        vec![
            ColumnSpec::new("name", ColumnType::VarChar { length: 50 }),
            ColumnSpec::new("weight", ColumnType::Decimal {
                precision: 10,
                scale: 2,
            })
            .nullable(),
            ColumnSpec::new("color", ColumnType::VarChar { length: 20 }).nullable(),
            ColumnSpec::new("notes", ColumnType::Text).nullable(),
        ],
    );
    db.deny_column("widgets", "color");

    let report = SchemaBootstrapper::new(vec![spec])
        .unwrap()
        .ensure(&mut db)
        .await
        .unwrap();

    let added: Vec<_> = report
        .columns_added
        .iter()
        .map(|a| a.column.as_str())
        .collect();
    assert_eq!(added, vec!["weight", "notes"]);
    assert_eq!(report.errors.len(), 1);
    assert!(matches!(
        report.errors[0],
        BootstrapError::ColumnAddFailed { ref column, .. } if column == "color"
    ));
    assert_eq!(
        report.table_state("widgets"),
        Some(TableState::PartiallyAltered)
    );
}

#[tokio::test]
async fn test_failed_table_does_not_abort_remaining_tables() {
    let mut db = MemorySession::new();
    db.deny_table("widgets");

    let gadgets = TableSpec::with_id(
        "gadgets",
        vec![ColumnSpec::new("label", ColumnType::VarChar { length: 30 })],
    );
    let report = SchemaBootstrapper::new(vec![widgets_v1(), gadgets])
        .unwrap()
        .ensure(&mut db)
        .await
        .unwrap();

    assert_eq!(report.table_state("widgets"), Some(TableState::CreateFailed));
    assert_eq!(report.table_state("gadgets"), Some(TableState::Created));
    assert!(matches!(
        report.errors[0],
        BootstrapError::TableCreateFailed { ref table, .. } if table == "widgets"
    ));
    assert!(db.has_table("gadgets"));
    assert!(!db.has_table("widgets"));
}

#[tokio::test]
async fn test_duplicate_column_race_is_swallowed() {
    let mut db = MemorySession::new();
    SchemaBootstrapper::new(vec![widgets_v1()])
        .unwrap()
        .ensure(&mut db)
        .await
        .unwrap();

    db.race_column("widgets", "status");
    let report = SchemaBootstrapper::new(vec![widgets_v2()])
        .unwrap()
        .ensure(&mut db)
        .await
        .unwrap();

    // The losing ALTER surfaces nowhere: not an addition, not an error.
    assert!(report.columns_added.is_empty());
    assert!(report.errors.is_empty());
    assert_eq!(report.table_state("widgets"), Some(TableState::UpToDate));
    assert!(db.columns_of("widgets").contains(&"status".to_string()));
}

#[tokio::test]
async fn test_connection_loss_propagates_as_driver_error() {
    let mut db = MemorySession::new();
    db.drop_connection("gadgets");

    let gadgets = TableSpec::with_id(
        "gadgets",
        vec![ColumnSpec::new("label", ColumnType::VarChar { length: 30 })],
    );
    let result = SchemaBootstrapper::new(vec![widgets_v1(), gadgets])
        .unwrap()
        .with_seeds(vec![widget_seed()])
        .unwrap()
        .ensure(&mut db)
        .await;

    // A dead connection is the one failure that is not report data.
    match result {
        Err(e @ DbError::Connection(_)) => assert!(e.is_fatal()),
        other => panic!("expected connection error, got {:?}", other),
    }
    // Work before the outage landed; nothing after it ran.
    assert!(db.has_table("widgets"));
    assert!(!db.has_table("gadgets"));
    assert_eq!(db.rows_in("widgets"), 0);
}

#[tokio::test]
async fn test_seed_failure_is_recorded_not_raised() {
    let mut db = MemorySession::new();
    db.deny_seed("widgets");

    let report = SchemaBootstrapper::new(vec![widgets_v1()])
        .unwrap()
        .with_seeds(vec![widget_seed()])
        .unwrap()
        .ensure(&mut db)
        .await
        .unwrap();

    assert_eq!(report.table_state("widgets"), Some(TableState::Created));
    assert!(report.seeds_applied.is_empty());
    assert!(matches!(
        report.errors[0],
        BootstrapError::SeedInsertFailed { ref table, .. } if table == "widgets"
    ));
    assert_eq!(db.rows_in("widgets"), 0);
}
