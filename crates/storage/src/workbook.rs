//! Tabular persistence: one header row plus data rows per named sheet.
//!
//! Reads go through calamine, writes through rust_xlsxwriter. Writing a
//! sheet rebuilds the whole file from what calamine can see of the others:
//! values, formulas and merged ranges survive, styling does not.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use calamine::{CellType, Data, Dimensions, Range, Reader, Xlsx, open_workbook, open_workbook_auto};
use labinv_core::{FieldValue, RawTable};
use rust_xlsxwriter::{Format, Formula, Workbook, Worksheet};
use tracing::debug;

use crate::error::StorageError;

const DATE_FORMAT: &str = "mm/dd/yyyy";

fn cell_value(cell: &Data) -> FieldValue {
    match cell {
        Data::Empty | Data::Error(_) => FieldValue::Null,
        Data::String(s) => FieldValue::Text(s.clone()),
        Data::Int(i) => FieldValue::Integer(*i),
        Data::Float(f) => FieldValue::Float(*f),
        Data::Bool(b) => FieldValue::Boolean(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ts) => FieldValue::Timestamp(ts),
            None => FieldValue::Float(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => FieldValue::Text(s.clone()),
    }
}

fn range_to_table(range: &Range<Data>) -> RawTable {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return RawTable::default();
    };
    let columns = header
        .iter()
        .enumerate()
        .map(|(i, cell)| match cell_value(cell).key() {
            name if name.is_empty() => format!("Unnamed: {i}"),
            name => name,
        })
        .collect();

    let mut table = RawTable::new(columns);
    for row in rows {
        let values: Vec<FieldValue> = row.iter().map(cell_value).collect();
        if values.iter().all(FieldValue::is_blank) {
            continue;
        }
        table.push_row(values);
    }
    table
}

/// Read `sheet` of the workbook at `path`.
pub fn read_sheet(path: &Path, sheet: &str) -> Result<RawTable, StorageError> {
    let mut workbook = open_workbook_auto(path)?;
    if !workbook.sheet_names().iter().any(|name| name == sheet) {
        return Err(StorageError::SheetNotFound {
            sheet: sheet.to_string(),
            path: path.display().to_string(),
        });
    }
    let range = workbook.worksheet_range(sheet)?;
    let table = range_to_table(&range);
    debug!(path = %path.display(), sheet, rows = table.len(), "read sheet");
    Ok(table)
}

/// Every sheet of the workbook, in workbook order.
pub fn read_all(path: &Path) -> Result<Vec<(String, RawTable)>, StorageError> {
    let mut workbook = open_workbook_auto(path)?;
    let names = workbook.sheet_names().to_vec();
    let mut sheets = Vec::with_capacity(names.len());
    for name in names {
        let range = workbook.worksheet_range(&name)?;
        sheets.push((name, range_to_table(&range)));
    }
    Ok(sheets)
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    cell: &FieldValue,
    date_format: &Format,
) -> Result<(), StorageError> {
    match cell {
        FieldValue::Null => {}
        FieldValue::Text(s) if s.is_empty() => {}
        FieldValue::Text(s) => {
            worksheet.write_string(row, col, s)?;
        }
        FieldValue::Integer(i) => {
            worksheet.write_number(row, col, *i as f64)?;
        }
        FieldValue::Float(f) => {
            worksheet.write_number(row, col, *f)?;
        }
        FieldValue::Boolean(b) => {
            worksheet.write_boolean(row, col, *b)?;
        }
        FieldValue::Timestamp(ts) => {
            worksheet.write_datetime_with_format(row, col, ts, date_format)?;
        }
    }
    Ok(())
}

fn write_table(worksheet: &mut Worksheet, table: &RawTable) -> Result<(), StorageError> {
    let date_format = Format::new().set_num_format(DATE_FORMAT);
    for (col, name) in table.columns.iter().enumerate() {
        worksheet.write_string(0, col as u16, name)?;
    }
    for (r, row) in table.rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            write_cell(worksheet, r as u32 + 1, c as u16, cell, &date_format)?;
        }
    }
    Ok(())
}

/// A sheet that is not being replaced, cell by cell at its original
/// positions.
struct CarriedSheet {
    name: String,
    values: Vec<(u32, u16, FieldValue)>,
    formulas: Vec<(u32, u16, String)>,
    merges: Vec<Dimensions>,
}

enum SheetPlan {
    Replaced(String),
    Carried(CarriedSheet),
}

fn absolute_cells<T: CellType>(range: &Range<T>) -> impl Iterator<Item = (u32, u16, &T)> {
    let (row0, col0) = range.start().unwrap_or((0, 0));
    range
        .used_cells()
        .map(move |(r, c, v)| (row0 + r as u32, (col0 + c as u32) as u16, v))
}

fn carry_sheet(workbook: &mut Xlsx<BufReader<File>>, name: &str) -> Result<CarriedSheet, StorageError> {
    let values = absolute_cells(&workbook.worksheet_range(name).map_err(calamine::Error::Xlsx)?)
        .map(|(r, c, v)| (r, c, cell_value(v)))
        .collect();
    let formulas = absolute_cells(&workbook.worksheet_formula(name).map_err(calamine::Error::Xlsx)?)
        .map(|(r, c, f)| (r, c, f.clone()))
        .collect();
    let merges = match workbook.worksheet_merge_cells(name) {
        Some(merges) => merges.map_err(calamine::Error::Xlsx)?,
        None => Vec::new(),
    };
    Ok(CarriedSheet {
        name: name.to_string(),
        values,
        formulas,
        merges,
    })
}

fn write_carried(worksheet: &mut Worksheet, sheet: &CarriedSheet) -> Result<(), StorageError> {
    let date_format = Format::new().set_num_format(DATE_FORMAT);
    let cached = |row: u32, col: u16| {
        sheet
            .values
            .iter()
            .find(|(r, c, _)| *r == row && *c == col)
            .map(|(_, _, v)| v)
    };

    for merge in &sheet.merges {
        let (first_row, first_col) = merge.start;
        let (last_row, last_col) = merge.end;
        if (first_row, first_col) == (last_row, last_col) {
            continue;
        }
        let text = cached(first_row, first_col as u16).map(FieldValue::display).unwrap_or_default();
        worksheet.merge_range(
            first_row,
            first_col as u16,
            last_row,
            last_col as u16,
            &text,
            &Format::new(),
        )?;
    }
    for (row, col, value) in &sheet.values {
        write_cell(worksheet, *row, *col, value, &date_format)?;
    }
    for (row, col, formula) in &sheet.formulas {
        let result = cached(*row, *col).map(FieldValue::display).unwrap_or_default();
        worksheet.write_formula(*row, *col, Formula::new(formula).set_result(result))?;
    }
    Ok(())
}

/// Replace the content of `sheet` with `table`, creating the workbook or
/// the sheet as needed. Every other sheet is carried over with its values,
/// formulas and merged ranges in place; cell styling is not kept.
pub fn write_replacing_sheet(path: &Path, sheet: &str, table: &RawTable) -> Result<(), StorageError> {
    let mut plan = Vec::new();
    if path.exists() {
        let mut existing: Xlsx<_> = open_workbook(path).map_err(calamine::Error::Xlsx)?;
        for name in existing.sheet_names().to_vec() {
            if name == sheet {
                plan.push(SheetPlan::Replaced(name));
            } else {
                plan.push(SheetPlan::Carried(carry_sheet(&mut existing, &name)?));
            }
        }
    }
    if !plan.iter().any(|p| matches!(p, SheetPlan::Replaced(_))) {
        plan.push(SheetPlan::Replaced(sheet.to_string()));
    }

    let mut workbook = Workbook::new();
    for entry in &plan {
        let worksheet = workbook.add_worksheet();
        match entry {
            SheetPlan::Replaced(name) => {
                worksheet.set_name(name)?;
                write_table(worksheet, table)?;
            }
            SheetPlan::Carried(carried) => {
                worksheet.set_name(&carried.name)?;
                write_carried(worksheet, carried)?;
            }
        }
    }
    workbook.save(path)?;
    debug!(path = %path.display(), sheet, rows = table.len(), "wrote sheet");
    Ok(())
}
