use rust_xlsxwriter::{Format, Workbook, XlsxError};

use crate::tenders::{FieldValue, OutputRow, COLUMNS};

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Longest string Excel accepts in a single cell.
const MAX_CELL_CHARS: usize = 32_767;

/// Render rows as a single-sheet workbook: one bold header row in
/// [`COLUMNS`] order, then one row per tender. Null fields stay empty.
pub fn write_workbook(rows: &[OutputRow]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    let sheet = workbook.add_worksheet();
    sheet.set_name("Tenders")?;
    for (col, name) in COLUMNS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *name, &header)?;
    }
    sheet.set_freeze_panes(1, 0)?;

    for (i, row) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        for (col, cell) in row.cells().iter().enumerate() {
            let c = col as u16;
            match cell {
                None => {}
                Some(FieldValue::Text(s)) if s.chars().count() > MAX_CELL_CHARS => {
                    let clipped: String = s.chars().take(MAX_CELL_CHARS).collect();
                    sheet.write_string(r, c, clipped)?;
                }
                Some(FieldValue::Text(s)) => {
                    sheet.write_string(r, c, s)?;
                }
                Some(FieldValue::Integer(n)) => {
                    sheet.write_number(r, c, *n as f64)?;
                }
                Some(FieldValue::Float(x)) => {
                    sheet.write_number(r, c, *x)?;
                }
                Some(FieldValue::Bool(b)) => {
                    sheet.write_boolean(r, c, *b)?;
                }
            }
        }
    }

    workbook.save_to_buffer()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tenders::RawItem;
    use serde_json::json;

    #[test]
    fn test_empty_listing_still_has_header() {
        let bytes = write_workbook(&[]).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn test_rows_with_mixed_values() {
        let rows = vec![
            RawItem::new(json!({
                "ProjectID": 12,
                "UniqueID": "GGGI-12",
                "Title": "Solar mini-grids",
                "DateDocsAvailableUntil": "/Date(1700000000000)/",
                "Category": null
            }))
            .to_row(),
            RawItem::new(json!({"UniqueID": "GGGI-13", "ProjectID": 1.5})).to_row(),
        ];
        let bytes = write_workbook(&rows).unwrap();
        assert!(bytes.starts_with(b"PK"));
        assert!(bytes.len() > 1000);
    }

    #[test]
    fn test_oversized_text_is_clipped() {
        let long = "x".repeat(MAX_CELL_CHARS + 10);
        let rows = vec![RawItem::new(json!({"Description": long})).to_row()];
        assert!(write_workbook(&rows).is_ok());
    }
}
