use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("{0} is required.")]
    MissingConstraint(String),

    #[error("Invalid box dimensions")]
    InvalidBoxDimensions,

    #[error("Location {0} is already occupied. You can't add there.")]
    SlotOccupied(String),

    #[error("Location {0} is empty. You can't remove from there.")]
    SlotEmpty(String),

    #[error("Location {0} is not available.")]
    SlotUnknown(String),
}

/// A single-record submission was rejected before touching the record set.
///
/// Field errors are reported one at a time; only the required-field
/// pre-check lists every missing field at once.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please fill in: {}", .missing.join(", "))]
    MissingRequired { missing: Vec<String> },

    #[error("Invalid value for {field}: '{value}' must be an integer")]
    NotInteger { field: String, value: String },

    #[error("Invalid format for {field}: '{value}' must be one letter followed by a number (e.g., A1)")]
    NotLetterNumber { field: String, value: String },

    #[error("Invalid format for {field}: '{value}'. Please use MM/DD/YYYY (e.g., 06/30/2025).")]
    InvalidDate { field: String, value: String },
}

impl ValidationError {
    /// The field(s) the message is about.
    pub fn fields(&self) -> Vec<&str> {
        match self {
            Self::MissingRequired { missing } => missing.iter().map(String::as_str).collect(),
            Self::NotInteger { field, .. }
            | Self::NotLetterNumber { field, .. }
            | Self::InvalidDate { field, .. } => vec![field.as_str()],
        }
    }
}
