use csv::{QuoteStyle, WriterBuilder};

use super::ExportError;
use crate::model::{PaymentColumn, PaymentRecord};
use crate::view::payment_cell;

pub const DEFAULT_CSV_NAME: &str = "rider_payments.csv";

/// Every cell quoted, embedded quotes doubled, header row of raw field names.
pub fn encode_csv(rows: &[PaymentRecord]) -> Result<Vec<u8>, ExportError> {
    if rows.is_empty() {
        return Err(ExportError::NoData);
    }

    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .double_quote(true)
        .from_writer(Vec::new());

    writer.write_record(PaymentColumn::ALL.iter().map(|c| c.key()))?;
    for (i, row) in rows.iter().enumerate() {
        writer.write_record(PaymentColumn::ALL.iter().map(|c| payment_cell(row, *c, i)))?;
    }

    writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))
}
