//! Load a table from a spreadsheet or CSV file, filter it by per-column
//! criteria, sort it, and export the result.
//!
//! ```no_run
//! use rusty_roster::data::{exporter, filter, loader};
//! use rusty_roster::data::filter::{Criterion, FilterSpec, SortSpec};
//! use rusty_roster::data::loader::DataFormat;
//!
//! # fn main() -> anyhow::Result<()> {
//! let bytes = std::fs::read("schools.xlsx")?;
//! let table = loader::load(&bytes, None)?;
//! let spec = FilterSpec::new().with("Grade", Criterion::one_of([5.0]));
//! let result = filter::apply(&table, &spec, Some(&SortSpec::ascending("Name")))?;
//! std::fs::write("filtered.csv", exporter::serialize(&result, DataFormat::Csv)?)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod state;

pub use data::model::{Column, ColumnKind, Table, Value};
pub use error::{ApplyError, SortError, TableError};
