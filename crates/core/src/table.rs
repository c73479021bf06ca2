use crate::field_value::FieldValue;

/// Rows as read from (or written to) one spreadsheet sheet: a header row of
/// column names followed by untyped cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<FieldValue>>,
}

impl RawTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from string literals. Handy for fixtures and tests.
    pub fn from_strings(columns: &[&str], rows: &[&[&str]]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|cell| {
                            if cell.is_empty() {
                                FieldValue::Null
                            } else {
                                FieldValue::Text(cell.to_string())
                            }
                        })
                        .collect()
                })
                .collect(),
        }
    }

    pub fn push_row(&mut self, row: Vec<FieldValue>) {
        self.rows.push(row);
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell at (`row`, column `name`); short rows read as `Null`.
    pub fn cell(&self, row: usize, name: &str) -> &FieldValue {
        static NULL: FieldValue = FieldValue::Null;
        self.column_index(name)
            .and_then(|col| self.rows.get(row).and_then(|r| r.get(col)))
            .unwrap_or(&NULL)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
