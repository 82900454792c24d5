use rust_xlsxwriter::Workbook;

use crate::error::Result;
use crate::fetch::broker_trades::{Metric, SymbolSummary, FAILED_MARKER, SUMMARY_FIELDS};

/// Serializes the ordered summaries into a single-sheet workbook buffer:
/// field names in the first row, one row per summary in input order.
/// Failed metrics are written as the literal marker string so a reader
/// can tell them apart from a genuine zero.
pub fn write_workbook(summaries: &[SymbolSummary]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Sheet1")?;

    for (col, name) in SUMMARY_FIELDS.iter().enumerate() {
        sheet.write_string(0, col as u16, *name)?;
    }

    for (row, summary) in summaries.iter().enumerate() {
        let row = row as u32 + 1;
        sheet.write_string(row, 0, summary.symbol.as_str())?;

        for (col, metric) in summary.metrics().iter().enumerate() {
            let col = col as u16 + 1;
            match metric {
                Metric::Value(value) => sheet.write_number(row, col, *value)?,
                Metric::Failed => sheet.write_string(row, col, FAILED_MARKER)?,
            };
        }
    }

    Ok(workbook.save_to_buffer()?)
}
