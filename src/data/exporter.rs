use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use rust_xlsxwriter::{Format, Workbook};

use super::loader::DataFormat;
use super::model::{Table, Value};
use crate::error::{Result, TableError};

/// File name offered when the caller does not pick one.
pub const DEFAULT_EXPORT_NAME: &str = "filtered_school_data.xlsx";

const DATE_FORMAT: &str = "yyyy-mm-dd";
const DATETIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

/// Serialize a table: header row first, then every row in table order.
///
/// Refuses zero-row tables with [`TableError::EmptyExport`].
pub fn serialize(table: &Table, format: DataFormat) -> Result<Vec<u8>> {
    if table.is_empty() {
        return Err(TableError::EmptyExport);
    }
    let bytes = match format {
        DataFormat::Spreadsheet => write_spreadsheet(table)?,
        DataFormat::Csv => write_csv(table)?,
    };
    log::debug!(
        "Serialized {} rows as {} ({} bytes)",
        table.len(),
        format.label(),
        bytes.len()
    );
    Ok(bytes)
}

/// Write a table to `path` and return the path actually written.
///
/// `.xlsx` and `.csv` are supported; a path without an extension gets `.xlsx`.
pub fn export_file(table: &Table, path: &Path) -> Result<PathBuf> {
    let path = match path.extension() {
        Some(_) => path.to_path_buf(),
        None => path.with_extension(DataFormat::Spreadsheet.extension()),
    };
    let format = export_format(&path)?;
    let bytes = serialize(table, format)?;
    std::fs::write(&path, bytes)?;
    log::info!("Exported {} rows to {}", table.len(), path.display());
    Ok(path)
}

fn export_format(path: &Path) -> Result<DataFormat> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "xlsx" => Ok(DataFormat::Spreadsheet),
        "csv" => Ok(DataFormat::Csv),
        other => Err(TableError::UnsupportedFormat(format!(
            "cannot export to .{other} (use .xlsx or .csv)"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Spreadsheet writer
// ---------------------------------------------------------------------------

fn write_spreadsheet(table: &Table) -> Result<Vec<u8>> {
    let err = |e: rust_xlsxwriter::XlsxError| TableError::write("spreadsheet", e);

    let header_format = Format::new().set_bold();
    let date_format = Format::new().set_num_format(DATE_FORMAT);
    let datetime_format = Format::new().set_num_format(DATETIME_FORMAT);
    let blank_format = Format::new();

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for (col, column) in table.columns().iter().enumerate() {
        let col = sheet_col(col)?;
        sheet
            .write_string_with_format(0, col, column.name.as_str(), &header_format)
            .map_err(err)?;
    }

    for (i, row) in table.rows().iter().enumerate() {
        let r = u32::try_from(i + 1)
            .map_err(|_| TableError::write("spreadsheet", "too many rows for one sheet"))?;
        for (col, value) in row.iter().enumerate() {
            let col = sheet_col(col)?;
            match value {
                // Blank cells keep all-missing rows inside the sheet dimension.
                Value::Missing => {
                    sheet.write_blank(r, col, &blank_format).map_err(err)?;
                }
                Value::Number(v) if !v.is_finite() => {
                    sheet.write_string(r, col, value.to_string()).map_err(err)?;
                }
                Value::Number(v) => {
                    sheet.write_number(r, col, *v).map_err(err)?;
                }
                Value::Text(s) => {
                    sheet.write_string(r, col, s.as_str()).map_err(err)?;
                }
                Value::Date(d) => match excel_serial(d) {
                    Some(serial) => {
                        let fmt = if serial.fract() == 0.0 {
                            &date_format
                        } else {
                            &datetime_format
                        };
                        sheet
                            .write_number_with_format(r, col, serial, fmt)
                            .map_err(err)?;
                    }
                    None => {
                        sheet.write_string(r, col, value.to_string()).map_err(err)?;
                    }
                },
            }
        }
    }

    workbook.save_to_buffer().map_err(err)
}

fn sheet_col(col: usize) -> Result<u16> {
    u16::try_from(col).map_err(|_| TableError::write("spreadsheet", "too many columns for one sheet"))
}

/// Days since the 1900 date system epoch, with the time as a fraction.
fn excel_serial(dt: &NaiveDateTime) -> Option<f64> {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = dt.signed_duration_since(epoch).num_milliseconds();
    Some(millis as f64 / 86_400_000.0)
}

// ---------------------------------------------------------------------------
// CSV writer
// ---------------------------------------------------------------------------

fn write_csv(table: &Table) -> Result<Vec<u8>> {
    let err = |e: csv::Error| TableError::write("CSV", e);

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(table.column_names()).map_err(err)?;
    for row in table.rows() {
        writer
            .write_record(row.iter().map(|v| v.to_string()))
            .map_err(err)?;
    }
    writer
        .into_inner()
        .map_err(|e| TableError::write("CSV", e.error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Column;
    use crate::data::model::ColumnKind;

    fn small() -> Table {
        Table::from_rows(
            vec!["Name".into(), "Grade".into()],
            vec![
                vec!["Ann".into(), 5i64.into()],
                vec!["O'Neil, B".into(), Value::Missing],
            ],
        )
        .unwrap()
    }

    #[test]
    fn csv_output_quotes_and_blanks() {
        let bytes = serialize(&small(), DataFormat::Csv).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, "Name,Grade\nAnn,5\n\"O'Neil, B\",\n");
    }

    #[test]
    fn empty_tables_are_not_exported() {
        let empty = Table::new(vec![Column::new("Name", ColumnKind::Text)], vec![]).unwrap();
        assert!(matches!(serialize(&empty, DataFormat::Csv), Err(TableError::EmptyExport)));
        assert!(matches!(
            serialize(&empty, DataFormat::Spreadsheet),
            Err(TableError::EmptyExport)
        ));
    }

    #[test]
    fn spreadsheet_output_is_a_zip_container() {
        let bytes = serialize(&small(), DataFormat::Spreadsheet).unwrap();
        assert!(bytes.starts_with(b"PK\x03\x04"));
    }

    #[test]
    fn non_finite_numbers_are_written_as_text() {
        let table = Table::from_rows(
            vec!["Ratio".into()],
            vec![vec![f64::INFINITY.into()], vec![2.5.into()]],
        )
        .unwrap();
        let bytes = serialize(&table, DataFormat::Spreadsheet).unwrap();
        let loaded = crate::data::loader::load(&bytes, None).unwrap();
        assert_eq!(loaded.value(0, "Ratio"), Some(&Value::from("inf")));
        assert_eq!(loaded.value(1, "Ratio"), Some(&Value::from(2.5)));
    }

    #[test]
    fn excel_serial_numbers() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(excel_serial(&d.and_hms_opt(0, 0, 0).unwrap()), Some(45292.0));
        assert_eq!(excel_serial(&d.and_hms_opt(12, 0, 0).unwrap()), Some(45292.5));
    }

    #[test]
    fn export_format_by_extension() {
        assert_eq!(export_format(Path::new("out.XLSX")).unwrap(), DataFormat::Spreadsheet);
        assert_eq!(export_format(Path::new("out.csv")).unwrap(), DataFormat::Csv);
        assert!(matches!(
            export_format(Path::new("out.ods")),
            Err(TableError::UnsupportedFormat(_))
        ));
    }
}
