//! File decoding: raw upload bytes -> `RawTable`
//!
//! Supports delimited text (CSV/TSV/semicolon, any common encoding) and
//! spreadsheets (XLSX/XLS/ODS via calamine). Exports often carry a preamble
//! (client id, report period...) above the real header, so the header row is
//! located by scanning, the same way for both formats.

use anyhow::{anyhow, Context, Result};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use csv::ReaderBuilder;
use encoding_rs::{Encoding, WINDOWS_1252};
use std::borrow::Cow;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info};

use super::columns::{resolve_columns, Schema};
use crate::models::{CellValue, RawRow, RawTable};

/// How many leading rows are searched for a header
const HEADER_SCAN_LIMIT: usize = 30;

/// Detected container format of an upload
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileFormat {
    Delimited,
    Workbook,
}

impl FileFormat {
    pub fn from_name(name: &str) -> Result<Self> {
        let extension = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| anyhow!("File has no extension: {}", name))?
            .to_lowercase();

        match extension.as_str() {
            "csv" | "txt" | "tsv" => Ok(FileFormat::Delimited),
            "xlsx" | "xlsm" | "xls" | "ods" => Ok(FileFormat::Workbook),
            _ => Err(anyhow!(
                "Unsupported file format: {}. Supported formats: .csv, .txt, .tsv, .xlsx, .xls, .ods",
                extension
            )),
        }
    }
}

/// Decode file bytes into a table
///
/// `name` selects the format by extension and becomes the table name. When a
/// schema is given, the header is the first row that satisfies it; otherwise
/// the first row made of at least two text cells.
pub fn decode_bytes(name: &str, bytes: &[u8], schema: Option<&Schema>) -> Result<RawTable> {
    let grid = match FileFormat::from_name(name)? {
        FileFormat::Delimited => read_delimited(bytes)
            .with_context(|| format!("Failed to read delimited file {}", name))?,
        FileFormat::Workbook => {
            read_workbook(bytes).with_context(|| format!("Failed to read workbook {}", name))?
        }
    };

    let table = into_table(name, grid, schema)?;
    info!(
        "Decoded {}: {} columns, {} rows",
        name,
        table.headers.len(),
        table.rows.len()
    );
    Ok(table)
}

/// Decode text bytes, honoring a BOM and falling back to Windows-1252
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return text;
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            debug!("Input is not UTF-8, decoding as Windows-1252");
            let (text, _, _) = WINDOWS_1252.decode(bytes);
            text
        }
    }
}

/// Pick the delimiter that appears most often across the leading lines
pub fn detect_delimiter(content: &str) -> u8 {
    let sample: Vec<&str> = content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(10)
        .collect();

    let mut best = (b',', 0usize);
    for delimiter in [b',', b';', b'\t', b'|'] {
        let count: usize = sample
            .iter()
            .map(|line| line.matches(delimiter as char).count())
            .sum();
        // Strictly greater: ties keep the earlier candidate
        if count > best.1 {
            best = (delimiter, count);
        }
    }
    best.0
}

fn read_delimited(bytes: &[u8]) -> Result<Vec<Vec<CellValue>>> {
    let text = decode_text(bytes);
    let delimiter = detect_delimiter(&text);
    debug!("Detected delimiter: {:?}", delimiter as char);

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut grid = Vec::new();
    for result in reader.records() {
        let record = result.context("Failed to read CSV record")?;
        grid.push(record.iter().map(CellValue::from).collect());
    }
    Ok(grid)
}

fn read_workbook(bytes: &[u8]) -> Result<Vec<Vec<CellValue>>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .context("Failed to open workbook")?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| anyhow!("Workbook has no sheets"))?;
    debug!("Reading sheet: {}", sheet_name);

    let range = workbook
        .worksheet_range(&sheet_name)
        .with_context(|| format!("Failed to read sheet '{}'", sheet_name))?;

    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_from_data).collect())
        .collect())
}

fn cell_from_data(data: &Data) -> CellValue {
    match data {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::from(s.as_str()),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        other => CellValue::from(other.to_string().as_str()),
    }
}

fn into_table(name: &str, grid: Vec<Vec<CellValue>>, schema: Option<&Schema>) -> Result<RawTable> {
    let header_idx = find_header_row(&grid, schema).ok_or_else(|| match schema {
        Some(_) => anyhow!(
            "No header row with the expected columns found in the first {} rows of {}",
            HEADER_SCAN_LIMIT,
            name
        ),
        None => anyhow!("No header row found in {}", name),
    })?;

    let mut rows = grid.into_iter().skip(header_idx);
    let headers: Vec<String> = rows
        .next()
        .unwrap_or_default()
        .iter()
        .map(|c| c.as_text().trim().to_string())
        .collect();

    let rows: Vec<RawRow> = rows.map(RawRow::new).collect();
    Ok(RawTable::new(name, headers, rows))
}

fn find_header_row(grid: &[Vec<CellValue>], schema: Option<&Schema>) -> Option<usize> {
    grid.iter().take(HEADER_SCAN_LIMIT).position(|row| {
        let labels: Vec<String> = row.iter().map(|c| c.as_text().into_owned()).collect();
        match schema {
            Some(schema) => resolve_columns(&labels, schema, "").is_ok(),
            None => {
                row.iter()
                    .filter(|c| matches!(c, CellValue::Text(t) if !t.trim().is_empty()))
                    .count()
                    >= 2
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_name() {
        assert_eq!(FileFormat::from_name("pnl.XLSX").unwrap(), FileFormat::Workbook);
        assert_eq!(FileFormat::from_name("INFY.csv").unwrap(), FileFormat::Delimited);
        assert!(FileFormat::from_name("notes.pdf").is_err());
        assert!(FileFormat::from_name("README").is_err());
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), b',');
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), b';');
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), b'\t');
        assert_eq!(detect_delimiter("single"), b',');
    }

    #[test]
    fn test_decode_text_handles_bom_and_latin1() {
        let with_bom = b"\xEF\xBB\xBFSymbol";
        assert_eq!(decode_text(with_bom), "Symbol");

        let latin1 = b"Pre\xE7o";
        assert_eq!(decode_text(latin1), "Preço");
    }

    #[test]
    fn test_decode_csv_skips_preamble() {
        let csv = "Client ID,ZX1234\n\nSymbol,Quantity,Buy Value,Sell Value,Realized P&L\nINFY,1,100,110,10\n";
        let table = decode_bytes("pnl.csv", csv.as_bytes(), Some(&Schema::brokerage())).unwrap();
        assert_eq!(table.headers[0], "Symbol");
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].get(0), &CellValue::Text("INFY".to_string()));
    }

    #[test]
    fn test_decode_csv_without_schema_uses_first_text_row() {
        let csv = "Date;Action;Quantity;Price\n2024-01-01;Buy;1;10\n";
        let table = decode_bytes("TCS.csv", csv.as_bytes(), None).unwrap();
        assert_eq!(table.name, "TCS.csv");
        assert_eq!(table.headers, vec!["Date", "Action", "Quantity", "Price"]);
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn test_decode_csv_missing_header_is_error() {
        let csv = "just,one\n1,2\n";
        let err = decode_bytes("pnl.csv", csv.as_bytes(), Some(&Schema::brokerage())).unwrap_err();
        assert!(err.to_string().contains("No header row"));
    }
}
