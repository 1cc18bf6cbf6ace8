pub mod coerce;
pub mod record;
pub mod rows;

pub use record::{normalize_header, parse_table, Record};
