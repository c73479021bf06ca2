use labinv_core::occupancy::constraints;
use labinv_core::{FieldValue, Intent, InventoryKind, Submission, ValidationError};
use labinv_engine::{ConflictError, EngineError, SyncState, UploadOutcome};
use labinv_harness::TestInstance;
use labinv_harness::fixtures::{
    freezer20_table, freezer80_add, freezer80_remove, freezer80_table, grid_dewar_table,
    rack_box_schema, rack_box_table,
};

// ============================================================================
// Opening inventories
// ============================================================================

#[test]
fn open_cleans_and_sorts_the_remote_sheet() -> Result<(), Box<dyn std::error::Error>> {
    let mut lab = TestInstance::new()?;
    let schema = InventoryKind::Freezer80.schema();
    lab.seed(&schema, &freezer80_table())?;

    let session = lab.open(schema)?;
    assert_eq!(session.state(), SyncState::Loaded);
    let records = session.records().records();
    assert_eq!(records.len(), 3);

    // Sorted by shelf, rack, box, vial: A1/A1, A1/A2, B3/C4.
    assert_eq!(records[0].key("Vial Position"), "A1");
    assert_eq!(records[1].key("Vial Position"), "A2");
    assert_eq!(records[2].key("Box Position"), "B3");
    assert_eq!(records[2].key("Vial Position"), "C4");
    assert_eq!(records[0].get("Shelf Number"), Some(&FieldValue::Integer(1)));
    assert_eq!(records[0].key("Date Frozen"), "03/14/2024");
    assert_eq!(records[2].key("Date Frozen"), "05/01/2024");
    Ok(())
}

#[test]
fn unregistered_inventory_asks_for_an_identifier() -> Result<(), Box<dyn std::error::Error>> {
    let mut lab = TestInstance::new()?;
    let err = lab.open(InventoryKind::Freezer20.schema()).err().ok_or("open should fail")?;
    match err {
        EngineError::Remote(e) => {
            assert_eq!(e.code(), "MISSING_ID");
            assert_eq!(e.recovery(), labinv_storage::Recovery::ReplaceIdentifier);
        }
        other => panic!("unexpected error: {other}"),
    }
    Ok(())
}

#[test]
fn replacing_a_bad_identifier_recovers() -> Result<(), Box<dyn std::error::Error>> {
    let mut lab = TestInstance::new()?;
    let schema = InventoryKind::Freezer20.schema();
    let good = lab.seed(&schema, &freezer20_table())?;

    lab.services
        .replace_identifier(&schema.registry_key, &"no-such-file".into())?;
    let err = lab.open(schema.clone()).err().ok_or("open should fail")?;
    assert!(matches!(err, EngineError::Remote(ref e) if e.code() == "NOT_FOUND"));

    lab.services.replace_identifier(&schema.registry_key, &good)?;
    let session = lab.open(schema)?;
    assert_eq!(session.records().len(), 3);
    Ok(())
}

#[test]
fn empty_identifier_is_refused() -> Result<(), Box<dyn std::error::Error>> {
    let mut lab = TestInstance::new()?;
    let err = lab
        .services
        .replace_identifier("20_Inventory", &"   ".into())
        .err()
        .ok_or("empty id should be refused")?;
    assert!(matches!(err, EngineError::Remote(ref e) if e.code() == "MISSING_ID"));
    Ok(())
}

// ============================================================================
// Adding
// ============================================================================

#[test]
fn add_into_empty_slot_uploads() -> Result<(), Box<dyn std::error::Error>> {
    let mut lab = TestInstance::new()?;
    let schema = rack_box_schema();
    lab.seed(&schema, &rack_box_table())?;

    {
        let mut session = lab.open(schema.clone())?;
        let outcome = session.submit_add(&Submission::from([
            ("Rack Number", "1"),
            ("Box Position", "a3"),
            ("Box Name", "z"),
        ]))?;
        assert_eq!(outcome.locations, vec!["A3".to_string()]);
        assert!(matches!(outcome.upload, UploadOutcome::Updated { .. }));
        assert_eq!(session.records().len(), 3);
        assert_eq!(session.generation(), 1);
        assert_eq!(session.state(), SyncState::Idle);
    }

    let remote = lab.remote_table(&schema)?;
    assert_eq!(remote.len(), 3);
    assert_eq!(remote.cell(2, "Box Position"), &FieldValue::Text("A3".into()));
    assert_eq!(remote.cell(2, "Box Name"), &FieldValue::Text("z".into()));
    Ok(())
}

#[test]
fn add_batch_with_one_occupied_slot_changes_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let mut lab = TestInstance::new()?;
    let schema = rack_box_schema();
    lab.seed(&schema, &rack_box_table())?;
    let before = lab.remote_bytes(&schema)?;

    {
        let mut session = lab.open(schema.clone())?;
        let err = session
            .submit_add(&Submission::from([
                ("Rack Number", "1"),
                ("Box Position", "A2, A3"),
                ("Box Name", "z"),
            ]))
            .err()
            .ok_or("occupied slot should be rejected")?;
        match err {
            EngineError::Conflict(conflict) => {
                assert_eq!(conflict.locations(), ["A2".to_string()]);
                assert_eq!(conflict.to_string(), "Error: Box Position(s) A2 already occupied.");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(session.records().len(), 2);
        assert_eq!(session.generation(), 0);
    }

    assert_eq!(lab.remote_bytes(&schema)?, before);
    Ok(())
}

#[test]
fn add_fills_columns_the_form_left_out() -> Result<(), Box<dyn std::error::Error>> {
    let mut lab = TestInstance::new()?;
    let schema = InventoryKind::Freezer80.schema();
    lab.seed(&schema, &freezer80_table())?;

    let mut session = lab.open(schema)?;
    session.submit_add(&freezer80_add("a3, A4", "pUC19 #3"))?;

    let added: Vec<_> = session
        .records()
        .records()
        .iter()
        .filter(|r| r.key("Vial Label") == "pUC19 #3")
        .collect();
    assert_eq!(added.len(), 2);
    assert_eq!(added[0].key("Vial Position"), "A3");
    assert_eq!(added[1].key("Vial Position"), "A4");
    assert_eq!(added[0].key("Date Frozen"), "06/03/2025");
    assert_eq!(added[0].get("Rack Number"), Some(&FieldValue::Integer(2)));
    Ok(())
}

#[test]
fn invalid_entry_is_reported_before_any_change() -> Result<(), Box<dyn std::error::Error>> {
    let mut lab = TestInstance::new()?;
    let schema = InventoryKind::Freezer80.schema();
    lab.seed(&schema, &freezer80_table())?;

    let mut session = lab.open(schema)?;
    let mut submission = freezer80_add("A5", "x");
    submission.set("Date Frozen", "13/40/2024");
    let err = session.submit_add(&submission).err().ok_or("bad date should fail")?;
    assert!(matches!(
        err,
        EngineError::Validation(ValidationError::InvalidDate { ref value, .. }) if value == "13/40/2024"
    ));

    let err = session
        .submit_add(&Submission::from([("Shelf Number", "1")]))
        .err()
        .ok_or("incomplete form should fail")?;
    match err {
        EngineError::Validation(ValidationError::MissingRequired { missing }) => {
            assert!(missing.contains(&"Vial Label".to_string()));
            assert!(!missing.contains(&"Shelf Number".to_string()));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(session.records().len(), 3);
    Ok(())
}

// ============================================================================
// Removing
// ============================================================================

#[test]
fn removal_is_previewed_then_confirmed() -> Result<(), Box<dyn std::error::Error>> {
    let mut lab = TestInstance::new()?;
    let schema = InventoryKind::Freezer80.schema();
    lab.seed(&schema, &freezer80_table())?;

    {
        let mut session = lab.open(schema.clone())?;
        let plan = session.submit_remove(&freezer80_remove("A1"))?;
        assert_eq!(plan.indices.len(), 1);
        let preview = plan.preview();
        assert!(preview.contains("Vial Position: A1"));
        assert!(preview.contains("Vial Label: pUC19 #1"));
        assert_eq!(session.records().len(), 3);

        let outcome = session.confirm_remove()?;
        assert_eq!(outcome.removed, 1);
        assert_eq!(outcome.locations, vec!["A1".to_string()]);
        assert_eq!(session.records().len(), 2);
    }

    let remote = lab.remote_table(&schema)?;
    assert_eq!(remote.len(), 2);
    assert_eq!(remote.cell(0, "Vial Position"), &FieldValue::Text("A2".into()));
    Ok(())
}

#[test]
fn removal_of_missing_slot_lists_it() -> Result<(), Box<dyn std::error::Error>> {
    let mut lab = TestInstance::new()?;
    let schema = rack_box_schema();
    lab.seed(&schema, &rack_box_table())?;

    let mut session = lab.open(schema)?;
    let err = session
        .submit_remove(&Submission::from([("Rack Number", "1"), ("Box Position", "A1, A3")]))
        .err()
        .ok_or("missing slot should be rejected")?;
    assert!(matches!(
        err,
        EngineError::Conflict(ConflictError::Missing { ref locations, .. }) if locations == &["A3".to_string()]
    ));
    assert_eq!(session.records().len(), 2);
    assert!(matches!(session.confirm_remove(), Err(EngineError::NoPendingRemoval)));
    Ok(())
}

#[test]
fn plan_goes_stale_after_another_mutation() -> Result<(), Box<dyn std::error::Error>> {
    let mut lab = TestInstance::new()?;
    let schema = rack_box_schema();
    lab.seed(&schema, &rack_box_table())?;

    let mut session = lab.open(schema)?;
    session.submit_remove(&Submission::from([("Rack Number", "1"), ("Box Position", "A1")]))?;
    session.submit_add(&Submission::from([
        ("Rack Number", "1"),
        ("Box Position", "B1"),
        ("Box Name", "w"),
    ]))?;

    assert!(matches!(session.confirm_remove(), Err(EngineError::StalePlan)));
    assert_eq!(session.records().len(), 3);
    Ok(())
}

#[test]
fn cancelled_removal_cannot_be_confirmed() -> Result<(), Box<dyn std::error::Error>> {
    let mut lab = TestInstance::new()?;
    let schema = rack_box_schema();
    lab.seed(&schema, &rack_box_table())?;

    let mut session = lab.open(schema)?;
    session.submit_remove(&Submission::from([("Rack Number", "1"), ("Box Position", "A2")]))?;
    session.cancel_remove();
    assert!(matches!(session.confirm_remove(), Err(EngineError::NoPendingRemoval)));
    assert_eq!(session.records().len(), 2);
    Ok(())
}

// ============================================================================
// Occupancy, picker, suggestions
// ============================================================================

#[test]
fn occupancy_of_one_box() -> Result<(), Box<dyn std::error::Error>> {
    let mut lab = TestInstance::new()?;
    let schema = InventoryKind::Freezer80.schema();
    lab.seed(&schema, &freezer80_table())?;

    let session = lab.open(schema)?;
    let occupied = session.occupied(&constraints(&[
        ("Shelf Number", "1"),
        ("Rack Number", "2.0"),
        ("Box Position", "A1"),
    ]));
    assert_eq!(occupied.into_iter().collect::<Vec<_>>(), vec!["A1", "A2"]);

    let elsewhere = session.occupied(&constraints(&[("Shelf Number", "4")]));
    assert!(elsewhere.is_empty());
    Ok(())
}

#[test]
fn picker_sizes_box_from_its_dimensions() -> Result<(), Box<dyn std::error::Error>> {
    let mut lab = TestInstance::new()?;
    let schema = InventoryKind::Freezer80.schema();
    lab.seed(&schema, &freezer80_table())?;

    let session = lab.open(schema)?;
    let entries = Submission::from([
        ("Shelf Number", "1"),
        ("Rack Number", "2"),
        ("Box Position", "A1"),
        ("Vial Position", "b1"),
    ]);
    let mut view = session.picker(&entries, Intent::Add)?;
    assert_eq!(view.grid, Some((9, 9)));
    assert_eq!(view.slots.len(), 81);
    assert!(view.slot("A1").is_some_and(|s| s.occupied && !s.selectable(Intent::Add)));
    assert!(view.slot("B1").is_some_and(|s| s.selected));

    assert!(view.toggle("A2").is_err());
    view.toggle("c9")?;
    assert_eq!(view.selection(), "B1, C9");

    let small = session.picker(
        &Submission::from([("Shelf Number", "1"), ("Rack Number", "2"), ("Box Position", "B3")]),
        Intent::Remove,
    )?;
    assert_eq!(small.grid, Some((5, 5)));
    let removable: Vec<_> = small
        .slots
        .iter()
        .filter(|s| s.selectable(Intent::Remove))
        .map(|s| s.code.as_str())
        .collect();
    assert_eq!(removable, vec!["C4"]);
    Ok(())
}

#[test]
fn picker_needs_the_container_named() -> Result<(), Box<dyn std::error::Error>> {
    let mut lab = TestInstance::new()?;
    let schema = InventoryKind::GridDewar.schema();
    lab.seed(&schema, &grid_dewar_table())?;

    let session = lab.open(schema)?;
    let err = session
        .picker(&Submission::from([("Cane Number", "1")]), Intent::Add)
        .err()
        .ok_or("puck is required")?;
    assert_eq!(err.to_string(), "core error: Puck Number is required.");

    let view = session.picker(
        &Submission::from([("Cane Number", "1"), ("Puck Number", "3")]),
        Intent::Add,
    )?;
    assert_eq!(view.grid, None);
    assert_eq!(view.slots.len(), 12);
    assert!(view.slot("1").is_some_and(|s| s.occupied));
    assert!(view.slot("5").is_some_and(|s| s.occupied));
    assert!(view.slot("2").is_some_and(|s| !s.occupied));
    Ok(())
}

#[test]
fn suggestions_narrow_with_typed_entries() -> Result<(), Box<dyn std::error::Error>> {
    let mut lab = TestInstance::new()?;
    let schema = InventoryKind::Freezer80.schema();
    lab.seed(&schema, &freezer80_table())?;

    let session = lab.open(schema)?;
    let all = session.suggestions(&Submission::new());
    assert_eq!(all["Project"], vec!["", "Cloning", "Kinase"]);

    let narrowed = session.suggestions(&Submission::from([("Box Position", "B3")]));
    assert_eq!(narrowed["Vial Label"], vec!["", "HEK lysate"]);

    let nothing_matches = session.suggestions(&Submission::from([("Project", "Unknown")]));
    assert_eq!(nothing_matches["Project"], all["Project"]);
    Ok(())
}

// ============================================================================
// Import
// ============================================================================

#[test]
fn imported_workbook_is_created_on_publish() -> Result<(), Box<dyn std::error::Error>> {
    let mut lab = TestInstance::new()?;
    let root = lab.create_archive_root()?;
    let schema = InventoryKind::Freezer20.schema();
    let source = lab.dir.path().join("local.xlsx");
    labinv_storage::workbook::write_replacing_sheet(&source, &schema.sheet_name, &freezer20_table())?;

    let created = {
        let mut session = labinv_engine::InventorySession::import(&mut lab.services, schema.clone(), &source)?;
        assert!(session.remote_id().is_none());
        match session.publish()? {
            UploadOutcome::Created { id, .. } => id,
            other => panic!("expected a new remote file, got {other:?}"),
        }
    };

    assert_eq!(lab.remote_id(&schema), Some(created.clone()));
    let children = labinv_storage::RemoteStore::list_children(
        &lab.services.store,
        &root,
        &regex_any(),
    )?;
    assert!(children.iter().any(|c| c.id == created));
    assert_eq!(lab.remote_table(&schema)?.len(), 3);
    Ok(())
}

fn regex_any() -> regex::Regex {
    regex::Regex::new(".*").unwrap()
}
