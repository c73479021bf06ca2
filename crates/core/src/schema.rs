use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// The four inventories the lab tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InventoryKind {
    GridDewar,
    Freezer80,
    Freezer20,
    CellDewar,
}

impl InventoryKind {
    pub const ALL: [InventoryKind; 4] = [
        InventoryKind::GridDewar,
        InventoryKind::Freezer80,
        InventoryKind::Freezer20,
        InventoryKind::CellDewar,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GridDewar => "grid-dewar",
            Self::Freezer80 => "freezer80",
            Self::Freezer20 => "freezer20",
            Self::CellDewar => "cell-dewar",
        }
    }

    pub fn schema(&self) -> InventorySchema {
        match self {
            Self::GridDewar => InventorySchema::grid_dewar(),
            Self::Freezer80 => InventorySchema::freezer80(),
            Self::Freezer20 => InventorySchema::freezer20(),
            Self::CellDewar => InventorySchema::cell_dewar(),
        }
    }
}

impl fmt::Display for InventoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InventoryKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grid-dewar" | "grid" => Ok(Self::GridDewar),
            "freezer80" | "-80" | "80" => Ok(Self::Freezer80),
            "freezer20" | "-20" | "20" => Ok(Self::Freezer20),
            "cell-dewar" | "cell" => Ok(Self::CellDewar),
            other => Err(CoreError::InvalidData(format!("unknown inventory: {other}"))),
        }
    }
}

/// How the spatial picker lays out the slots of one container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickerLayout {
    /// Fixed rows x columns, rows lettered from `A`.
    Grid { rows: u32, cols: u32 },
    /// Read `RxC` from the named column of the selected container's rows.
    FromColumn(String),
    /// Numbered slots arranged in a circle (puck positions).
    Circular { slots: u32 },
}

/// Whether a submission adds units or removes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Add,
    Remove,
}

/// Field-role declarations for one inventory spreadsheet.
///
/// One generic engine consumes this; the presets below differ only in data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySchema {
    pub title: String,
    /// Identifier-registry key of the row workbook.
    pub registry_key: String,
    pub sheet_name: String,
    pub sort_fields: Vec<String>,
    pub occupancy_key_fields: Vec<String>,
    pub location_field: String,
    pub integer_fields: Vec<String>,
    pub letter_number_fields: Vec<String>,
    pub date_field: Option<String>,
    pub removal_key_fields: Vec<String>,
    pub label_field: String,
    pub required_add_fields: Vec<String>,
    pub required_remove_fields: Vec<String>,
    pub hidden_fields: Vec<String>,
    pub picker: PickerLayout,
}

fn names(fields: &[&str]) -> Vec<String> {
    fields.iter().map(|f| f.to_string()).collect()
}

impl InventorySchema {
    /// A bare schema: everything empty except the location field.
    /// Fill in the rest with the `with_*` builders.
    pub fn new(title: &str, location_field: &str) -> Self {
        Self {
            title: title.to_string(),
            registry_key: String::new(),
            sheet_name: "Sheet1".to_string(),
            sort_fields: Vec::new(),
            occupancy_key_fields: Vec::new(),
            location_field: location_field.to_string(),
            integer_fields: Vec::new(),
            letter_number_fields: Vec::new(),
            date_field: None,
            removal_key_fields: Vec::new(),
            label_field: String::new(),
            required_add_fields: Vec::new(),
            required_remove_fields: Vec::new(),
            hidden_fields: Vec::new(),
            picker: PickerLayout::Grid { rows: 9, cols: 9 },
        }
    }

    pub fn with_integer_fields(mut self, fields: &[&str]) -> Self {
        self.integer_fields = names(fields);
        self
    }

    pub fn with_letter_number_fields(mut self, fields: &[&str]) -> Self {
        self.letter_number_fields = names(fields);
        self
    }

    pub fn with_occupancy_keys(mut self, fields: &[&str]) -> Self {
        self.occupancy_key_fields = names(fields);
        self
    }

    pub fn with_removal_keys(mut self, fields: &[&str]) -> Self {
        self.removal_key_fields = names(fields);
        self
    }

    pub fn with_sort_fields(mut self, fields: &[&str]) -> Self {
        self.sort_fields = names(fields);
        self
    }

    pub fn with_date_field(mut self, field: &str) -> Self {
        self.date_field = Some(field.to_string());
        self
    }

    pub fn with_label_field(mut self, field: &str) -> Self {
        self.label_field = field.to_string();
        self
    }

    pub fn with_required(mut self, intent: Intent, fields: &[&str]) -> Self {
        match intent {
            Intent::Add => self.required_add_fields = names(fields),
            Intent::Remove => self.required_remove_fields = names(fields),
        }
        self
    }

    pub fn with_registry_key(mut self, key: &str) -> Self {
        self.registry_key = key.to_string();
        self
    }

    pub fn with_sheet_name(mut self, sheet: &str) -> Self {
        self.sheet_name = sheet.to_string();
        self
    }

    pub fn with_picker(mut self, picker: PickerLayout) -> Self {
        self.picker = picker;
        self
    }

    pub fn grid_dewar() -> Self {
        let keys = ["Cane Number", "Puck Number", "Slot Number"];
        Self::new("Grid Dewar", "Slot Number")
            .with_registry_key("Grid_Dewar_Inventory")
            .with_sheet_name("Details")
            .with_sort_fields(&keys)
            .with_occupancy_keys(&["Cane Number", "Puck Number"])
            .with_integer_fields(&keys)
            .with_removal_keys(&keys)
            .with_label_field("Box Name")
            .with_date_field("Date Frozen")
            .with_required(
                Intent::Add,
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
            )
            .with_required(Intent::Remove, &keys)
            .with_picker(PickerLayout::Circular { slots: 12 })
            .with_hidden(&["Unnamed: 6"])
    }

    pub fn freezer80() -> Self {
        Self::new("-80 Freezer", "Vial Position")
            .with_registry_key("80_Inventory")
            .with_sheet_name("Details")
            .with_sort_fields(&["Shelf Number", "Rack Number", "Box Position", "Vial Position"])
            .with_occupancy_keys(&["Shelf Number", "Rack Number", "Box Position"])
            .with_integer_fields(&["Shelf Number", "Rack Number"])
            .with_letter_number_fields(&["Box Position", "Vial Position"])
            .with_removal_keys(&[
                "Shelf Number",
                "Rack Number",
                "Box Position",
                "Box Name",
                "Vial Position",
            ])
            .with_label_field("Vial Label")
            .with_date_field("Date Frozen")
            .with_required(
                Intent::Add,
                &[
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
                ],
            )
            .with_required(
                Intent::Remove,
                &["Shelf Number", "Rack Number", "Box Position", "Box Name", "Vial Position"],
            )
            .with_picker(PickerLayout::FromColumn("Box Dimensions".to_string()))
            .with_hidden(&["Unnamed: 6"])
    }

    pub fn freezer20() -> Self {
        let keys = ["Shelf Number", "Rack Number", "Box Position"];
        Self::new("-20 Freezer", "Box Position")
            .with_registry_key("20_Inventory")
            .with_sheet_name("Details")
            .with_sort_fields(&keys)
            .with_occupancy_keys(&["Shelf Number", "Rack Number"])
            .with_integer_fields(&["Shelf Number", "Rack Number"])
            .with_letter_number_fields(&["Box Position"])
            .with_removal_keys(&keys)
            .with_label_field("Box Name")
            .with_required(
                Intent::Add,
                &[
                    "Shelf Number",
                    "Rack Number",
                    "Box Position",
                    "Box Name",
                    "Person/Initials",
                    "Project/Group",
                ],
            )
            .with_required(Intent::Remove, &keys)
            .with_picker(PickerLayout::Grid { rows: 5, cols: 3 })
    }

    pub fn cell_dewar() -> Self {
        let keys = ["Rack Number", "Box Number", "Vial Position"];
        Self::new("Cell Dewar", "Vial Position")
            .with_registry_key("Cell_Culture_Inventory_Rows")
            .with_sheet_name("Details")
            .with_sort_fields(&keys)
            .with_occupancy_keys(&["Rack Number", "Box Number"])
            .with_integer_fields(&["Rack Number", "Box Number"])
            .with_letter_number_fields(&["Vial Position", "Passage Number"])
            .with_removal_keys(&keys)
            .with_label_field("Vial Label")
            .with_date_field("Date Frozen")
            .with_required(
                Intent::Add,
                &[
                    "Rack Number",
                    "Box Number",
                    "Vial Position",
                    "Vial Label",
                    "Cell Type",
                    "Passage Number",
                    "Date Frozen",
                    "Person/Initials",
                    "Project",
                ],
            )
            .with_required(Intent::Remove, &keys)
            .with_picker(PickerLayout::Grid { rows: 9, cols: 9 })
            .with_hidden(&["Unnamed: 4", "Original Box"])
    }

    pub fn with_hidden(mut self, fields: &[&str]) -> Self {
        self.hidden_fields = names(fields);
        self
    }

    pub fn is_integer_field(&self, field: &str) -> bool {
        self.integer_fields.iter().any(|f| f == field)
    }

    pub fn is_letter_number_field(&self, field: &str) -> bool {
        self.letter_number_fields.iter().any(|f| f == field)
    }

    pub fn is_date_field(&self, field: &str) -> bool {
        self.date_field.as_deref() == Some(field)
    }

    pub fn is_location_field(&self, field: &str) -> bool {
        self.location_field == field
    }

    /// Occupancy keys followed by the location field: the composite key
    /// that must be unique across a record set.
    pub fn spatial_key_fields(&self) -> Vec<&str> {
        self.occupancy_key_fields
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.location_field.as_str()))
            .collect()
    }

    pub fn required_fields(&self, intent: Intent) -> &[String] {
        match intent {
            Intent::Add => &self.required_add_fields,
            Intent::Remove => &self.required_remove_fields,
        }
    }

    /// Human hint shown next to an entry field.
    pub fn format_hint(&self, field: &str) -> Option<&'static str> {
        if self.is_integer_field(field) {
            Some("integer")
        } else if self.is_letter_number_field(field) {
            if self.is_location_field(field) {
                Some("format: A8, B1; comma separated for multiple")
            } else {
                Some("format: A8, P23")
            }
        } else if self.is_date_field(field) {
            Some("MM/DD/YYYY")
        } else {
            None
        }
    }
}
