//! Sample sheets shaped like the lab's real inventory workbooks.

use labinv_core::{Intent, InventorySchema, PickerLayout, RawTable, Submission};

pub const FREEZER80_COLUMNS: [&str; 11] = [
    "Shelf Number",
    "Rack Number",
    "Box Position",
    "Box Name",
    "Vial Position",
    "Vial Label",
    "Vial Contents",
    "Date Frozen",
    "Person/Initials",
    "Project",
    "Box Dimensions",
];

/// Shelf 1, rack 2, box A1 (a 9x9 box) holds vials A1 and A2; box B3 (5x5)
/// holds C4.
pub fn freezer80_table() -> RawTable {
    RawTable::from_strings(
        &FREEZER80_COLUMNS,
        &[
            &["1", "2", "A1", "Plasmids", "A2", "pUC19 #2", "DNA", "3/14/2024", "JD", "Cloning", "9x9"],
            &["1", "2", "A1", "Plasmids", "A1", "pUC19 #1", "DNA", "03/14/2024", "JD", "Cloning", "9x9"],
            &["1", "2", "b3", "Lysates", "c4", "HEK lysate", "Protein", "2024-05-01", "MK", "Kinase", "5x5"],
        ],
    )
}

/// A complete add for the freezer80 sample box.
pub fn freezer80_add(vial_positions: &str, label: &str) -> Submission {
    Submission::from([
        ("Shelf Number", "1"),
        ("Rack Number", "2"),
        ("Box Position", "A1"),
        ("Box Name", "Plasmids"),
        ("Vial Position", vial_positions),
        ("Vial Label", label),
        ("Vial Contents", "DNA"),
        ("Date Frozen", "6/3/2025"),
        ("Person/Initials", "JD"),
        ("Project", "Cloning"),
        ("Box Dimensions", "9x9"),
    ])
}

pub fn freezer80_remove(vial_positions: &str) -> Submission {
    Submission::from([
        ("Shelf Number", "1"),
        ("Rack Number", "2"),
        ("Box Position", "A1"),
        ("Box Name", "Plasmids"),
        ("Vial Position", vial_positions),
    ])
}

pub fn freezer20_table() -> RawTable {
    RawTable::from_strings(
        &["Shelf Number", "Rack Number", "Box Position", "Box Name", "Person/Initials", "Project/Group"],
        &[
            &["1", "1", "A1", "Antibodies", "MK", "Signaling"],
            &["1", "1", "B2", "Buffers", "JD", "Core"],
            &["2", "1", "A1", "Enzymes", "JD", "Cloning"],
        ],
    )
}

pub fn grid_dewar_table() -> RawTable {
    RawTable::from_strings(
        &[
            "Cane Number",
            "Puck Number",
            "Slot Number",
            "Box Name",
            "Grid Numbers",
            "Box Contents",
            "Date Frozen",
            "Person/Initials",
            "Project",
            "Grid Type",
            "Blot Time",
            "Blot Force",
            "Drain Time",
        ],
        &[
            &["1", "3", "1", "Apo", "1-4", "Ribosome", "01/10/2025", "AL", "Translation", "Quantifoil", "3", "0", "1"],
            &["1", "3", "5", "Holo", "1-4", "Ribosome+tRNA", "01/11/2025", "AL", "Translation", "C-flat", "4", "1", "1"],
        ],
    )
}

/// The two-row rack/box inventory used for conflict scenarios.
pub fn rack_box_schema() -> InventorySchema {
    InventorySchema::new("Racks", "Box Position")
        .with_registry_key("Rack_Inventory")
        .with_sheet_name("Details")
        .with_sort_fields(&["Rack Number", "Box Position"])
        .with_occupancy_keys(&["Rack Number"])
        .with_integer_fields(&["Rack Number"])
        .with_letter_number_fields(&["Box Position"])
        .with_removal_keys(&["Rack Number", "Box Position"])
        .with_label_field("Box Name")
        .with_required(Intent::Add, &["Rack Number", "Box Position", "Box Name"])
        .with_required(Intent::Remove, &["Rack Number", "Box Position"])
        .with_picker(PickerLayout::Grid { rows: 3, cols: 3 })
}

pub fn rack_box_table() -> RawTable {
    RawTable::from_strings(
        &["Rack Number", "Box Position", "Box Name"],
        &[&["1", "A1", "x"], &["1", "A2", "y"]],
    )
}
