/// Data layer: core types, loading, filtering and export.
///
/// Architecture:
/// ```text
///  .xlsx / .csv bytes
///        │
///        ▼
///   ┌──────────┐
///   │  loader  │  parse bytes → Table (column kinds inferred once)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Table   │  Vec<Column>, Vec<Row>
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter  │  FilterSpec + SortSpec → new Table
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ exporter │  Table → .xlsx / .csv bytes
///   └──────────┘
/// ```

pub mod exporter;
pub mod filter;
pub mod loader;
pub mod model;
