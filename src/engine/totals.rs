use super::coerce::to_number;
use crate::model::{NumericField, PaymentRecord};

/// Column sums over a row set, one per [`NumericField`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GrandTotals {
    sums: [f64; NumericField::COUNT],
}

impl GrandTotals {
    pub fn get(&self, field: NumericField) -> f64 {
        self.sums[field.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (NumericField, f64)> + '_ {
        NumericField::ALL.iter().map(|f| (*f, self.sums[f.index()]))
    }
}

pub fn compute_grand_totals(rows: &[PaymentRecord]) -> GrandTotals {
    let mut totals = GrandTotals::default();
    for row in rows {
        for field in NumericField::ALL {
            totals.sums[field.index()] += to_number(row.numeric(field));
        }
    }
    totals
}
