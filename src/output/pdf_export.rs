use std::path::PathBuf;

use genpdf::{elements, style, Element, Size};

use super::ExportError;
use crate::model::{PaymentColumn, PaymentRecord};
use crate::view::payment_cell;

pub const DEFAULT_PDF_NAME: &str = "rider_payments.pdf";
pub const REPORT_TITLE: &str = "Rider Payments Report";

/// Where genpdf finds its TrueType files (`<family>-Regular.ttf`, `-Bold`, ...).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PdfFonts {
    pub dir: PathBuf,
    pub family: String,
}

impl Default for PdfFonts {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./fonts"),
            family: "LiberationSans".to_string(),
        }
    }
}

fn column_weight(column: PaymentColumn) -> usize {
    match column {
        PaymentColumn::Remarks => 4,
        PaymentColumn::Name => 3,
        PaymentColumn::Designation => 2,
        _ => 1,
    }
}

/// Landscape A4, one table, same columns as the CSV with readable headers.
pub fn encode_pdf(rows: &[PaymentRecord], fonts: &PdfFonts) -> Result<Vec<u8>, ExportError> {
    if rows.is_empty() {
        return Err(ExportError::NoData);
    }

    let font_family = genpdf::fonts::from_files(&fonts.dir, &fonts.family, None).map_err(|e| {
        ExportError::FontLoad {
            dir: fonts.dir.display().to_string(),
            message: e.to_string(),
        }
    })?;

    let mut doc = genpdf::Document::new(font_family);
    doc.set_title(REPORT_TITLE);
    doc.set_paper_size(Size::new(297, 210));
    doc.set_font_size(6);
    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(8);
    doc.set_page_decorator(decorator);

    doc.push(
        elements::Paragraph::new(REPORT_TITLE)
            .styled(style::Style::new().bold().with_font_size(14)),
    );
    doc.push(elements::Break::new(1));

    let weights = PaymentColumn::ALL.iter().map(|c| column_weight(*c)).collect();
    let mut table = elements::TableLayout::new(weights);
    table.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));

    let bold = style::Style::new().bold();
    PaymentColumn::ALL
        .iter()
        .fold(table.row(), |row, column| {
            row.element(elements::Paragraph::new(column.label()).styled(bold))
        })
        .push()
        .map_err(|e| ExportError::Pdf(e.to_string()))?;

    for (i, record) in rows.iter().enumerate() {
        PaymentColumn::ALL
            .iter()
            .fold(table.row(), |row, column| {
                row.element(elements::Paragraph::new(payment_cell(record, *column, i)))
            })
            .push()
            .map_err(|e| ExportError::Pdf(e.to_string()))?;
    }

    doc.push(table);

    let mut buffer = Vec::new();
    doc.render(&mut buffer)
        .map_err(|e| ExportError::Pdf(e.to_string()))?;
    Ok(buffer)
}
