use std::collections::BTreeSet;

use labinv_core::normalize::clean;
use labinv_core::{InventoryKind, InventorySchema, RecordSet, Submission};
use labinv_engine::{EngineError, load_records};
use labinv_harness::TestInstance;
use labinv_harness::fixtures::{freezer20_table, freezer80_table, grid_dewar_table, rack_box_schema, rack_box_table};
use labinv_storage::workbook;

fn spatial_keys(records: &RecordSet, schema: &InventorySchema) -> Vec<Vec<String>> {
    let fields = schema.spatial_key_fields();
    records
        .records()
        .iter()
        .map(|r| fields.iter().map(|f| r.key(f)).collect())
        .collect()
}

// ============================================================================
// Cleaning
// ============================================================================

#[test]
fn cleaning_is_idempotent_for_every_sample() -> Result<(), Box<dyn std::error::Error>> {
    let samples = [
        (InventoryKind::Freezer80.schema(), freezer80_table()),
        (InventoryKind::Freezer20.schema(), freezer20_table()),
        (InventoryKind::GridDewar.schema(), grid_dewar_table()),
        (rack_box_schema(), rack_box_table()),
    ];
    for (schema, table) in samples {
        let once = clean(&table, &schema);
        let twice = clean(&once.to_table(), &schema);
        assert_eq!(once, twice, "{}", schema.title);
    }
    Ok(())
}

#[test]
fn workbook_round_trip_preserves_records() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let schema = InventoryKind::Freezer80.schema();
    let path = dir.path().join("80_Inventory.xlsx");
    workbook::write_replacing_sheet(&path, &schema.sheet_name, &freezer80_table())?;

    let loaded = load_records(&path, &schema)?;
    workbook::write_replacing_sheet(&path, &schema.sheet_name, &loaded.to_table())?;
    let reloaded = load_records(&path, &schema)?;
    assert_eq!(loaded, reloaded);
    Ok(())
}

#[test]
fn other_sheets_survive_a_rewrite() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("book.xlsx");
    workbook::write_replacing_sheet(&path, "Notes", &rack_box_table())?;
    workbook::write_replacing_sheet(&path, "Details", &freezer20_table())?;
    workbook::write_replacing_sheet(&path, "Details", &rack_box_table())?;

    let sheets = workbook::read_all(&path)?;
    let names: BTreeSet<_> = sheets.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, BTreeSet::from(["Details", "Notes"]));
    let notes = workbook::read_sheet(&path, "Notes")?;
    assert_eq!(notes.columns, rack_box_table().columns);
    assert_eq!(notes.len(), 2);
    Ok(())
}

// ============================================================================
// Slot uniqueness
// ============================================================================

#[test]
fn slots_stay_unique_through_a_sequence_of_edits() -> Result<(), Box<dyn std::error::Error>> {
    let mut lab = TestInstance::new()?;
    let schema = rack_box_schema();
    lab.seed(&schema, &rack_box_table())?;
    let mut session = lab.open(schema.clone())?;

    let steps: [(&str, &str); 8] = [
        ("add", "A3, B1"),
        ("add", "A1"),
        ("add", "b1, C1"),
        ("remove", "A2"),
        ("add", "A2, A2"),
        ("remove", "C3"),
        ("add", "c2, C3"),
        ("remove", "A1, B1"),
    ];
    let mut accepted = 0;
    for (action, locations) in steps {
        let before = session.records().clone();
        let result = if action == "add" {
            session
                .submit_add(&Submission::from([
                    ("Rack Number", "1"),
                    ("Box Position", locations),
                    ("Box Name", "s"),
                ]))
                .map(|_| ())
        } else {
            session
                .submit_remove(&Submission::from([("Rack Number", "1"), ("Box Position", locations)]))
                .and_then(|_| session.confirm_remove().map(|_| ()))
        };

        match result {
            Ok(()) => accepted += 1,
            Err(EngineError::Conflict(_)) => assert_eq!(session.records(), &before),
            Err(other) => return Err(other.into()),
        }

        let keys = spatial_keys(session.records(), &schema);
        let unique: BTreeSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len(), "duplicate slot after {action} {locations}");
    }

    assert_eq!(accepted, 5);
    let positions: Vec<_> = session.records().records().iter().map(|r| r.key("Box Position")).collect();
    assert_eq!(positions, vec!["A2", "A3", "C2", "C3"]);
    Ok(())
}

#[test]
fn legacy_duplicates_still_load() -> Result<(), Box<dyn std::error::Error>> {
    let mut lab = TestInstance::new()?;
    let schema = rack_box_schema();
    let mut table = rack_box_table();
    table.rows.push(table.rows[0].clone());
    lab.seed(&schema, &table)?;

    let session = lab.open(schema.clone())?;
    assert_eq!(session.records().len(), 3);
    assert_eq!(session.records().duplicate_slots(&schema).len(), 1);
    Ok(())
}
