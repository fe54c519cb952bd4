//! Spreadsheet output for aggregated tender rows.

mod xlsx;

pub use xlsx::{write_workbook, XLSX_CONTENT_TYPE};
