use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};
use std::fmt;

use chrono::{NaiveDateTime, NaiveTime};

use crate::error::{Result, TableError};

// ---------------------------------------------------------------------------
// Value – a single cell
// ---------------------------------------------------------------------------

/// A tagged scalar cell value.
///
/// Equality and ordering are total (numbers compare with `f64::total_cmp`)
/// so values can be stored in `BTreeSet`s for membership filters.
#[derive(Debug, Clone)]
pub enum Value {
    Missing,
    Number(f64),
    Text(String),
    Date(NaiveDateTime),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Missing => 0,
            Value::Number(_) => 1,
            Value::Date(_) => 2,
            Value::Text(_) => 3,
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Number(v as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(d: NaiveDateTime) -> Self {
        Value::Date(d)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Missing, Value::Missing) => Ordering::Equal,
            (Value::Number(a), Value::Number(b)) => a.total_cmp(b),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::Missing => {}
            Value::Number(v) => v.to_bits().hash(state),
            Value::Date(d) => d.hash(state),
            Value::Text(s) => s.hash(state),
        }
    }
}

/// The display text used for substring matching and CSV output.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => Ok(()),
            Value::Number(v) => write!(f, "{v}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Date(d) if d.time() == NaiveTime::MIN => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

// ---------------------------------------------------------------------------
// Columns
// ---------------------------------------------------------------------------

/// Scalar type of a column, inferred once when the table is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Number,
    Text,
    Date,
    /// Non-missing cells of more than one type.
    Mixed,
}

impl ColumnKind {
    /// Infer the kind shared by all non-missing values.
    /// A column with no values at all is `Text`.
    pub fn infer<'a>(values: impl IntoIterator<Item = &'a Value>) -> ColumnKind {
        let mut kind = None;
        for value in values {
            let this = match value {
                Value::Missing => continue,
                Value::Number(_) => ColumnKind::Number,
                Value::Text(_) => ColumnKind::Text,
                Value::Date(_) => ColumnKind::Date,
            };
            match kind {
                None => kind = Some(this),
                Some(k) if k != this => return ColumnKind::Mixed,
                Some(_) => {}
            }
        }
        kind.unwrap_or(ColumnKind::Text)
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnKind::Number => "number",
            ColumnKind::Text => "text",
            ColumnKind::Date => "date",
            ColumnKind::Mixed => "mixed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Column {
            name: name.into(),
            kind,
        }
    }
}

// ---------------------------------------------------------------------------
// Table – named columns plus ordered rows
// ---------------------------------------------------------------------------

/// One value per column, in column order.
pub type Row = Vec<Value>;

/// An immutable in-memory table.
///
/// Every row has exactly one value per column and column names are unique.
/// Transformations never mutate a table; they build a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl Table {
    /// Build a table, checking name uniqueness and row width.
    pub fn new(columns: Vec<Column>, rows: Vec<Row>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(columns.len());
        for col in &columns {
            if !seen.insert(col.name.as_str()) {
                return Err(TableError::InvalidTable(format!(
                    "duplicate column name '{}'",
                    col.name
                )));
            }
        }
        if let Some((i, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(TableError::InvalidTable(format!(
                "row {i} has {} values but the table has {} columns",
                row.len(),
                columns.len()
            )));
        }
        Ok(Table { columns, rows })
    }

    /// Build a table from column names, inferring each column's kind from its values.
    pub fn from_rows(names: Vec<String>, rows: Vec<Row>) -> Result<Self> {
        let columns = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                let kind = ColumnKind::infer(rows.iter().filter_map(|row| row.get(i)));
                Column { name, kind }
            })
            .collect();
        Table::new(columns, rows)
    }

    /// A table with the same header and the given rows.
    pub(crate) fn with_rows(&self, rows: Vec<Row>) -> Table {
        debug_assert!(rows.iter().all(|r| r.len() == self.columns.len()));
        Table {
            columns: self.columns.clone(),
            rows,
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let col = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[col])
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows (columns may still exist).
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sorted set of the non-missing values in a column.
    pub fn distinct_values(&self, column: &str) -> Option<BTreeSet<Value>> {
        let col = self.column_index(column)?;
        Some(
            self.rows
                .iter()
                .map(|r| &r[col])
                .filter(|v| !v.is_missing())
                .cloned()
                .collect(),
        )
    }

    /// Distinct values worth offering as a pick list: `None` when the column
    /// is unknown or has `limit` or more distinct values.
    pub fn membership_options(&self, column: &str, limit: usize) -> Option<BTreeSet<Value>> {
        self.distinct_values(column).filter(|vals| vals.len() < limit)
    }
}
