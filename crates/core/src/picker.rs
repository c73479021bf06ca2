//! Data side of the spatial location picker: which slots a container has,
//! which are taken, and which may be selected for the current intent.

use crate::error::CoreError;
use crate::occupancy::{Constraint, matching_indices, occupied_locations};
use crate::record::RecordSet;
use crate::schema::{Intent, InventorySchema, PickerLayout};
use crate::validate::Submission;

/// Grid rows are lettered `A..=Z`.
pub const MAX_GRID_ROWS: u32 = 26;

/// Row-major slot codes of a lettered grid: `A1, A2, .., B1, ..`.
pub fn slot_codes(rows: u32, cols: u32) -> Vec<String> {
    (0..rows.min(MAX_GRID_ROWS))
        .filter_map(|r| char::from_u32('A' as u32 + r))
        .flat_map(|letter| (1..=cols).map(move |c| format!("{letter}{c}")))
        .collect()
}

/// Numbered positions of a circular puck: `1..=slots`.
pub fn circular_codes(slots: u32) -> Vec<String> {
    (1..=slots).map(|n| n.to_string()).collect()
}

/// Parse an `RxC` dimensions cell (`"9x9"`, `" 10 X 10 "`). More rows than
/// there are row letters is rejected.
pub fn parse_dimensions(text: &str) -> Option<(u32, u32)> {
    let lower = text.trim().to_lowercase();
    let (rows, cols) = lower.split_once('x')?;
    let rows = rows.trim().parse::<u32>().ok()?;
    let cols = cols.trim().parse::<u32>().ok()?;
    (rows > 0 && rows <= MAX_GRID_ROWS && cols > 0).then_some((rows, cols))
}

/// Dimensions stored on the first record of the container `constraints`
/// selects, read from `column`.
pub fn box_dimensions(records: &RecordSet, column: &str, constraints: &[Constraint]) -> Option<(u32, u32)> {
    let first = matching_indices(records, constraints).into_iter().next()?;
    let record = records.get(first)?;
    parse_dimensions(&record.key(column))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerSlot {
    pub code: String,
    pub occupied: bool,
    pub selected: bool,
}

impl PickerSlot {
    /// Empty slots are selectable when adding, occupied ones when removing.
    pub fn selectable(&self, intent: Intent) -> bool {
        match intent {
            Intent::Add => !self.occupied,
            Intent::Remove => self.occupied,
        }
    }
}

/// One container's slots, ready to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerView {
    pub title: String,
    pub intent: Intent,
    /// `(rows, cols)` for rectangular layouts, `None` for circular ones.
    pub grid: Option<(u32, u32)>,
    pub slots: Vec<PickerSlot>,
}

impl PickerView {
    /// Build the view for the container named by the occupancy-key entries
    /// of `entries`. Previously typed locations start out selected.
    pub fn open(
        records: &RecordSet,
        schema: &InventorySchema,
        entries: &Submission,
        intent: Intent,
    ) -> Result<Self, CoreError> {
        let mut constraints = Vec::with_capacity(schema.occupancy_key_fields.len());
        for field in &schema.occupancy_key_fields {
            let value = entries.get(field).map(str::trim).unwrap_or_default();
            if value.is_empty() {
                return Err(CoreError::MissingConstraint(field.clone()));
            }
            constraints.push(Constraint::new(field, value));
        }

        let (grid, codes) = match &schema.picker {
            PickerLayout::Grid { rows, cols } => (Some((*rows, *cols)), slot_codes(*rows, *cols)),
            PickerLayout::FromColumn(column) => {
                let (rows, cols) = box_dimensions(records, column, &constraints)
                    .ok_or(CoreError::InvalidBoxDimensions)?;
                (Some((rows, cols)), slot_codes(rows, cols))
            }
            PickerLayout::Circular { slots } => (None, circular_codes(*slots)),
        };

        let occupied = occupied_locations(records, schema, &constraints);
        let typed: Vec<String> = entries
            .get(&schema.location_field)
            .unwrap_or_default()
            .split(',')
            .map(|t| t.trim().to_uppercase())
            .filter(|t| !t.is_empty())
            .collect();

        let slots = codes
            .into_iter()
            .map(|code| PickerSlot {
                occupied: occupied.contains(&code),
                selected: typed.contains(&code),
                code,
            })
            .collect();

        let title = constraints
            .iter()
            .map(|c| format!("{}: {}", c.field, c.value))
            .collect::<Vec<_>>()
            .join(", ");

        Ok(Self {
            title: format!("Selection ({title})"),
            intent,
            grid,
            slots,
        })
    }

    pub fn slot(&self, code: &str) -> Option<&PickerSlot> {
        self.slots.iter().find(|s| s.code == code)
    }

    /// Flip one slot's selection, refusing slots the intent cannot use.
    pub fn toggle(&mut self, code: &str) -> Result<(), CoreError> {
        let code = code.trim().to_uppercase();
        let intent = self.intent;
        let slot = self
            .slots
            .iter_mut()
            .find(|s| s.code == code)
            .ok_or_else(|| CoreError::SlotUnknown(code.clone()))?;
        if !slot.selectable(intent) {
            return Err(match intent {
                Intent::Add => CoreError::SlotOccupied(code),
                Intent::Remove => CoreError::SlotEmpty(code),
            });
        }
        slot.selected = !slot.selected;
        Ok(())
    }

    /// Select every usable slot, or clear them all if they already are.
    pub fn toggle_all(&mut self) {
        let intent = self.intent;
        let all_selected = self
            .slots
            .iter()
            .filter(|s| s.selectable(intent))
            .all(|s| s.selected);
        for slot in self.slots.iter_mut().filter(|s| s.selectable(intent)) {
            slot.selected = !all_selected;
        }
    }

    /// Selected codes in layout order, comma separated, as typed into the
    /// location entry.
    pub fn selection(&self) -> String {
        self.slots
            .iter()
            .filter(|s| s.selected)
            .map(|s| s.code.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
