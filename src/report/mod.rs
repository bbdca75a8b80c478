//! Output table generation.

pub mod csv;

pub use csv::{render_csv, write_summary};
