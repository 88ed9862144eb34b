use std::collections::HashSet;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, DataType, Reader, Sheets};

use super::model::{Column, ColumnKind, Row, Table, Value};
use crate::error::{Result, TableError};

// ---------------------------------------------------------------------------
// Formats
// ---------------------------------------------------------------------------

/// The two container families a table can be read from or written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataFormat {
    /// A workbook (`.xlsx` and friends); only the first sheet is used.
    Spreadsheet,
    /// Comma-separated text with a header row.
    Csv,
}

impl DataFormat {
    /// Pick a format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match ext.as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(DataFormat::Spreadsheet),
            "csv" | "txt" => Ok(DataFormat::Csv),
            "" => Err(TableError::UnsupportedFormat(format!(
                "'{}' has no file extension",
                path.display()
            ))),
            other => Err(TableError::UnsupportedFormat(format!(
                "unsupported file extension: .{other}"
            ))),
        }
    }

    /// Guess the format from the leading bytes.
    pub fn sniff(bytes: &[u8]) -> Result<Self> {
        const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
        const CFB_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

        if bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(CFB_MAGIC) {
            return Ok(DataFormat::Spreadsheet);
        }
        if !bytes.contains(&0) && std::str::from_utf8(bytes).is_ok() {
            return Ok(DataFormat::Csv);
        }
        Err(TableError::UnsupportedFormat(
            "input is neither a spreadsheet nor delimited text".to_string(),
        ))
    }

    pub fn extension(&self) -> &'static str {
        match self {
            DataFormat::Spreadsheet => "xlsx",
            DataFormat::Csv => "csv",
        }
    }

    pub(crate) fn label(&self) -> &'static str {
        match self {
            DataFormat::Spreadsheet => "spreadsheet",
            DataFormat::Csv => "CSV",
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a table from a file. The format is chosen by extension.
pub fn load_file(path: &Path) -> Result<Table> {
    let format = DataFormat::from_path(path)?;
    let bytes = std::fs::read(path)?;
    let table = load(&bytes, Some(format))?;
    log::info!(
        "Loaded {} rows x {} columns from {}",
        table.len(),
        table.columns().len(),
        path.display()
    );
    Ok(table)
}

/// Load a table from raw bytes.
///
/// The first row holds the column names; every further row becomes a table
/// row. Without a `hint` the format is sniffed from the content.
pub fn load(bytes: &[u8], hint: Option<DataFormat>) -> Result<Table> {
    let format = match hint {
        Some(f) => f,
        None => DataFormat::sniff(bytes)?,
    };
    log::debug!("Reading {} bytes as {}", bytes.len(), format.label());

    match format {
        DataFormat::Spreadsheet => load_spreadsheet(bytes),
        DataFormat::Csv => load_csv(bytes),
    }
}

// ---------------------------------------------------------------------------
// Spreadsheet loader
// ---------------------------------------------------------------------------

fn load_spreadsheet(bytes: &[u8]) -> Result<Table> {
    let spreadsheet = |e: calamine::Error| TableError::parse("spreadsheet", e.to_string());

    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(spreadsheet)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| TableError::parse("spreadsheet", "workbook contains no sheets"))?
        .map_err(spreadsheet)?;

    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| TableError::parse("spreadsheet", "missing header row"))?;
    // Header names are taken verbatim; NA tokens only apply to data cells.
    let names = normalize_headers(header.iter().map(|cell| match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => cell_value(other).to_string(),
    }));

    let mut rows: Vec<Row> = rows
        .map(|cells| {
            let mut row: Row = cells.iter().map(cell_value).collect();
            row.resize(names.len(), Value::Missing);
            row
        })
        .collect();

    let header_row = range.start().map_or(0, |(row, _)| row);
    if let Some(last_row) = declared_last_row(&mut workbook) {
        let declared = last_row.saturating_sub(header_row) as usize;
        if declared > rows.len() {
            rows.resize(declared, vec![Value::Missing; names.len()]);
        }
    }

    Table::from_rows(names, rows)
}

/// Last row of the first sheet according to its `<dimension>` element.
///
/// Blank cells never reach the cell range, so trailing rows with no values
/// are only visible here. Only xlsx workbooks carry the element.
fn declared_last_row<RS: Read + Seek>(workbook: &mut Sheets<RS>) -> Option<u32> {
    let Sheets::Xlsx(xlsx) = workbook else {
        return None;
    };
    let name = xlsx.sheet_names().first()?.clone();
    let cells = xlsx.worksheet_cells_reader(&name).ok()?;
    Some(cells.dimensions().end.0)
}

/// Map a native workbook cell onto a [`Value`].
fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Missing,
        Data::Int(i) => Value::Number(*i as f64),
        Data::Float(f) if f.is_nan() => Value::Missing,
        Data::Float(f) => Value::Number(*f),
        Data::Bool(b) => Value::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::String(s) if is_na_token(s) => Value::Missing,
        Data::String(s) => Value::Text(s.clone()),
        Data::DateTime(_) | Data::DateTimeIso(_) => match cell.as_datetime() {
            Some(dt) => Value::Date(dt),
            None => Value::Text(cell.to_string()),
        },
        Data::DurationIso(s) => Value::Text(s.clone()),
        Data::Error(e) => Value::Text(e.to_string()),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row, then data rows of the same width.
/// A column becomes numeric only if every non-missing cell parses as a number.
fn load_csv(bytes: &[u8]) -> Result<Table> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(TableError::parse("CSV", "no columns to parse from file"));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| TableError::parse("CSV", e.to_string()))?;
    let names = normalize_headers(headers.iter().map(str::to_string));

    let mut raw: Vec<Vec<String>> = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| TableError::parse("CSV", csv_error_message(&e)))?;
        raw.push(record.iter().map(str::to_string).collect());
    }

    let numeric: Vec<bool> = (0..names.len())
        .map(|col| {
            raw.iter()
                .map(|r| r[col].trim())
                .filter(|s| !is_na_token(s))
                .all(|s| parse_number(s).is_some())
        })
        .collect();

    let rows: Vec<Row> = raw
        .into_iter()
        .map(|record| {
            record
                .into_iter()
                .enumerate()
                .map(|(col, s)| guess_value(s, numeric[col]))
                .collect()
        })
        .collect();

    // A column with no values at all stays text.
    let columns = names
        .into_iter()
        .enumerate()
        .map(|(col, name)| {
            let kind = if numeric[col] && rows.iter().any(|r| !r[col].is_missing()) {
                ColumnKind::Number
            } else {
                ColumnKind::Text
            };
            Column::new(name, kind)
        })
        .collect();

    Table::new(columns, rows)
}

fn csv_error_message(err: &csv::Error) -> String {
    match err.kind() {
        csv::ErrorKind::UnequalLengths {
            pos,
            expected_len,
            len,
        } => {
            let line = pos.as_ref().map(|p| p.line()).unwrap_or(0);
            format!("expected {expected_len} fields in line {line}, saw {len}")
        }
        _ => err.to_string(),
    }
}

fn guess_value(s: String, numeric: bool) -> Value {
    let trimmed = s.trim();
    if is_na_token(trimmed) {
        return Value::Missing;
    }
    if numeric {
        if let Some(v) = parse_number(trimmed) {
            return Value::Number(v);
        }
    }
    Value::Text(s)
}

/// Finite numbers only: `inf`, `infinity` and friends stay text.
fn parse_number(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Cell contents treated as "no value", matching common data-frame defaults.
const NA_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

fn is_na_token(s: &str) -> bool {
    NA_TOKENS.contains(&s)
}

// ---------------------------------------------------------------------------
// Header helpers
// ---------------------------------------------------------------------------

/// Make header names usable as unique column keys: blank names become
/// `Unnamed: <index>`, repeats get a `.1`, `.2`, ... suffix.
fn normalize_headers(raw: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut names = Vec::new();

    for (i, name) in raw.enumerate() {
        let base = if name.trim().is_empty() {
            format!("Unnamed: {i}")
        } else {
            name
        };
        let mut candidate = base.clone();
        let mut n = 1;
        while seen.contains(&candidate) {
            candidate = format!("{base}.{n}");
            n += 1;
        }
        seen.insert(candidate.clone());
        names.push(candidate);
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_numeric_column_inference() {
        let t = load(b"Name,Grade,Room\nAnn,5,A1\nBo,3,12\n", None).unwrap();
        assert_eq!(t.column("Grade").unwrap().kind, ColumnKind::Number);
        assert_eq!(t.column("Room").unwrap().kind, ColumnKind::Text);
        assert_eq!(t.value(1, "Room"), Some(&Value::from("12")));
        assert_eq!(t.value(0, "Grade"), Some(&Value::from(5.0)));
    }

    #[test]
    fn csv_missing_cells() {
        let t = load(b"Name,Grade\nAnn,\nBo,NA\nCy,4.5\n", Some(DataFormat::Csv)).unwrap();
        assert_eq!(t.column("Grade").unwrap().kind, ColumnKind::Number);
        assert!(t.value(0, "Grade").unwrap().is_missing());
        assert!(t.value(1, "Grade").unwrap().is_missing());
        assert_eq!(t.value(2, "Grade"), Some(&Value::from(4.5)));
    }

    #[test]
    fn csv_infinity_is_text() {
        let t = load(b"Ratio,Score\n1.5,2\ninf,-Infinity\n", None).unwrap();
        assert_eq!(t.column("Ratio").unwrap().kind, ColumnKind::Text);
        assert_eq!(t.column("Score").unwrap().kind, ColumnKind::Text);
        assert_eq!(t.value(1, "Ratio"), Some(&Value::from("inf")));
        assert_eq!(t.value(0, "Ratio"), Some(&Value::from("1.5")));
    }

    #[test]
    fn csv_ragged_rows_are_parse_errors() {
        let err = load(b"A,B\n1,2\n3\n", None).unwrap_err();
        match err {
            TableError::Parse { format, message } => {
                assert_eq!(format, "CSV");
                assert!(message.contains("line 3"), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn csv_header_only_gives_empty_table() {
        let t = load(b"Name,Grade\n", None).unwrap();
        assert!(t.is_empty());
        assert_eq!(t.column_names().collect::<Vec<_>>(), vec!["Name", "Grade"]);
    }

    #[test]
    fn csv_empty_input_is_parse_error() {
        assert!(matches!(load(b"", Some(DataFormat::Csv)), Err(TableError::Parse { .. })));
    }

    #[test]
    fn csv_strips_bom() {
        let t = load(b"\xEF\xBB\xBFName\nAnn\n", None).unwrap();
        assert_eq!(t.columns()[0].name, "Name");
    }

    #[test]
    fn headers_are_made_unique() {
        let t = load(b"A,,A,A\n1,2,3,4\n", None).unwrap();
        assert_eq!(
            t.column_names().collect::<Vec<_>>(),
            vec!["A", "Unnamed: 1", "A.1", "A.2"]
        );
    }

    #[test]
    fn binary_input_is_unsupported() {
        let err = load(&[0x00, 0xFF, 0x10, 0x80], None).unwrap_err();
        assert!(matches!(err, TableError::UnsupportedFormat(_)));
    }

    #[test]
    fn truncated_spreadsheet_is_parse_error() {
        let err = load(b"PK\x03\x04garbage", None).unwrap_err();
        assert!(matches!(err, TableError::Parse { format: "spreadsheet", .. }));
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(
            DataFormat::from_path(Path::new("a/schools.XLSX")).unwrap(),
            DataFormat::Spreadsheet
        );
        assert_eq!(DataFormat::from_path(Path::new("s.csv")).unwrap(), DataFormat::Csv);
        assert!(matches!(
            DataFormat::from_path(Path::new("s.json")),
            Err(TableError::UnsupportedFormat(_))
        ));
    }
}
