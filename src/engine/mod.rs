//! Client-side filtering and aggregation over the payments row set.
//!
//! Everything here is a pure function of its arguments. Malformed cells
//! degrade to zero, an empty string, or "no match"; there is no error path.

mod coerce;
mod filters;
mod totals;

pub use coerce::{display_text, format_date, parse_timestamp, to_number};
pub use filters::{apply_filter, parse_date_bound, FilterCriteria};
pub use totals::{compute_grand_totals, GrandTotals};
