pub mod dates;
pub mod error;
pub mod field_value;
pub mod normalize;
pub mod occupancy;
pub mod picker;
pub mod record;
pub mod schema;
pub mod suggest;
pub mod table;
pub mod validate;

pub use error::{CoreError, ValidationError};
pub use field_value::{FieldValue, MISSING_INTEGER};
pub use occupancy::Constraint;
pub use record::{Record, RecordSet};
pub use schema::{Intent, InventoryKind, InventorySchema, PickerLayout};
pub use table::RawTable;
pub use validate::{CleanedEntries, Submission};
