//! Turning uploaded CSV / XLSX bytes into header-keyed rows.

use std::collections::BTreeMap;
use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};

use super::error::ImportError;

/// ZIP local file header; every XLSX file starts with it.
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Raw cell content before validation.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Empty,
}

impl CellValue {
    /// Trimmed text, or `None` when the cell is blank.
    ///
    /// Whole numbers print without a fractional part so that NIS or phone
    /// columns typed as numbers in Excel still read as digits.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                Some(format!("{}", *n as i64))
            }
            CellValue::Number(n) => Some(n.to_string()),
            CellValue::Empty => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.as_text().is_none()
    }
}

/// One data row, keyed by normalized header name.
#[derive(Debug, Clone)]
pub struct RawRow {
    /// Spreadsheet row number; the header is row 1
    pub number: usize,
    pub cells: BTreeMap<String, CellValue>,
}

impl RawRow {
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells.get(column)
    }

    /// Trimmed text of a column, `None` when absent or blank.
    pub fn text(&self, column: &str) -> Option<String> {
        self.get(column).and_then(CellValue::as_text)
    }

    pub fn is_blank(&self) -> bool {
        self.cells.values().all(CellValue::is_blank)
    }

    /// Every cell as text, for echoing back in failure reports.
    pub fn values(&self) -> BTreeMap<String, String> {
        self.cells
            .iter()
            .map(|(k, v)| (k.clone(), v.as_text().unwrap_or_default()))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct Sheet {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Csv,
    Xlsx,
}

impl SheetFormat {
    /// Work out the format from the file name, then the declared content
    /// type, then the leading bytes.
    pub fn detect(file_name: Option<&str>, content_type: Option<&str>, bytes: &[u8]) -> Option<Self> {
        if let Some(name) = file_name {
            let lower = name.to_lowercase();
            if lower.ends_with(".csv") {
                return Some(SheetFormat::Csv);
            }
            if lower.ends_with(".xlsx") {
                return Some(SheetFormat::Xlsx);
            }
        }

        match content_type.map(|c| c.split(';').next().unwrap_or(c).trim().to_lowercase()) {
            Some(ct) if ct == "text/csv" || ct == "application/csv" => return Some(SheetFormat::Csv),
            Some(ct) if ct == "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => {
                return Some(SheetFormat::Xlsx)
            }
            _ => {}
        }

        if bytes.starts_with(ZIP_MAGIC) {
            return Some(SheetFormat::Xlsx);
        }
        if file_name.is_none() && std::str::from_utf8(bytes).is_ok() {
            return Some(SheetFormat::Csv);
        }
        None
    }
}

/// Header normalization: trimmed, lowercased, spaces become underscores.
pub fn normalize_header(raw: &str) -> String {
    raw.trim()
        .trim_start_matches('\u{feff}')
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

pub fn read_sheet(format: SheetFormat, bytes: &[u8]) -> Result<Sheet, ImportError> {
    match format {
        SheetFormat::Csv => read_csv(bytes),
        SheetFormat::Xlsx => read_xlsx(bytes),
    }
}

/// Semicolon-separated exports are common from Indonesian-locale Excel.
fn sniff_delimiter(bytes: &[u8]) -> u8 {
    let first_line = bytes.split(|b| *b == b'\n').next().unwrap_or_default();
    let semicolons = first_line.iter().filter(|b| **b == b';').count();
    let commas = first_line.iter().filter(|b| **b == b',').count();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}

fn read_csv(bytes: &[u8]) -> Result<Sheet, ImportError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let unreadable = |e: csv::Error| ImportError::Unreadable(e.to_string());

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(bytes))
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut record = csv::StringRecord::new();
    if !reader.read_record(&mut record).map_err(unreadable)? {
        return Err(ImportError::MissingHeader);
    }
    let headers: Vec<String> = record.iter().map(normalize_header).collect();
    if headers.iter().all(String::is_empty) {
        return Err(ImportError::MissingHeader);
    }

    // The reader drops empty lines and lets quoted cells span lines, so its
    // own line counter is not the spreadsheet row. Rows are counted from the
    // line breaks between the starts of consecutive records instead.
    let mut previous = record_start(bytes, &record);
    let mut number = 1 + line_breaks(&bytes[..previous]);

    let mut rows = Vec::new();
    while reader.read_record(&mut record).map_err(unreadable)? {
        let start = record_start(bytes, &record);
        number += bytes.get(previous..start).map_or(1, line_breaks);
        previous = start;

        let cells = keyed_cells(
            &headers,
            record.iter().map(|field| CellValue::Text(field.to_string())),
        );
        rows.push(RawRow { number, cells });
    }

    Ok(Sheet { headers, rows })
}

/// Offset of the first byte of `record`, past any empty lines the reader
/// skipped on its way there.
fn record_start(bytes: &[u8], record: &csv::StringRecord) -> usize {
    let reported = record
        .position()
        .map(|p| p.byte() as usize)
        .unwrap_or(0)
        .min(bytes.len());
    reported
        + bytes[reported..]
            .iter()
            .take_while(|b| matches!(**b, b'\n' | b'\r'))
            .count()
}

/// Line breaks outside quoted cells. A doubled quote flips the state twice,
/// which leaves it unchanged.
fn line_breaks(chunk: &[u8]) -> usize {
    let mut quoted = false;
    let mut breaks = 0;
    for &byte in chunk {
        match byte {
            b'"' => quoted = !quoted,
            b'\n' if !quoted => breaks += 1,
            _ => {}
        }
    }
    breaks
}

fn read_xlsx(bytes: &[u8]) -> Result<Sheet, ImportError> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
        .map_err(|e| ImportError::Unreadable(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ImportError::MissingHeader)?
        .map_err(|e| ImportError::Unreadable(e.to_string()))?;

    // Ranges start at the first used cell, not necessarily A1
    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    let mut sheet_rows = range.rows();

    let headers: Vec<String> = match sheet_rows.next() {
        Some(row) => row
            .iter()
            .map(|cell| normalize_header(&cell_from_data(cell).as_text().unwrap_or_default()))
            .collect(),
        None => return Err(ImportError::MissingHeader),
    };
    if headers.iter().all(String::is_empty) {
        return Err(ImportError::MissingHeader);
    }

    let rows = sheet_rows
        .enumerate()
        .map(|(index, row)| RawRow {
            number: first_row + index + 2,
            cells: keyed_cells(&headers, row.iter().map(cell_from_data)),
        })
        .collect();

    Ok(Sheet { headers, rows })
}

fn keyed_cells(
    headers: &[String],
    values: impl Iterator<Item = CellValue>,
) -> BTreeMap<String, CellValue> {
    let mut cells: BTreeMap<String, CellValue> = headers
        .iter()
        .filter(|h| !h.is_empty())
        .map(|h| (h.clone(), CellValue::Empty))
        .collect();

    for (header, value) in headers.iter().zip(values) {
        if !header.is_empty() {
            cells.insert(header.clone(), value);
        }
    }
    cells
}

fn cell_from_data(data: &Data) -> CellValue {
    match data {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_prefers_extension() {
        assert_eq!(
            SheetFormat::detect(Some("Santri.CSV"), Some("application/octet-stream"), b""),
            Some(SheetFormat::Csv)
        );
        assert_eq!(
            SheetFormat::detect(Some("guru.xlsx"), None, b""),
            Some(SheetFormat::Xlsx)
        );
    }

    #[test]
    fn test_detect_falls_back_to_content_type_and_magic() {
        assert_eq!(
            SheetFormat::detect(Some("upload"), Some("text/csv; charset=utf-8"), b"name"),
            Some(SheetFormat::Csv)
        );
        assert_eq!(
            SheetFormat::detect(Some("upload"), None, b"PK\x03\x04rest"),
            Some(SheetFormat::Xlsx)
        );
        assert_eq!(SheetFormat::detect(Some("laporan.pdf"), None, b"%PDF-1.7"), None);
    }

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("  Birth Date "), "birth_date");
        assert_eq!(normalize_header("\u{feff}name"), "name");
        assert_eq!(normalize_header("Guardian  Email"), "guardian_email");
    }

    #[test]
    fn test_number_cells_print_as_digits() {
        assert_eq!(CellValue::Number(2024010001.0).as_text().as_deref(), Some("2024010001"));
        assert_eq!(CellValue::Number(1.5).as_text().as_deref(), Some("1.5"));
        assert_eq!(CellValue::Text("   ".into()).as_text(), None);
    }

    #[test]
    fn test_read_csv_with_bom_and_row_numbers() {
        let csv = "\u{feff}Name,Email,Birth Date\nAhmad,ahmad@x.com,2012-01-01\n\nFatimah,fatimah@x.com,2011-05-02\n";
        let sheet = read_sheet(SheetFormat::Csv, csv.as_bytes()).unwrap();

        assert_eq!(sheet.headers, vec!["name", "email", "birth_date"]);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0].number, 2);
        assert_eq!(sheet.rows[0].text("name").as_deref(), Some("Ahmad"));
        // The blank line still occupies row 3
        assert_eq!(sheet.rows[1].number, 4);
    }

    #[test]
    fn test_quoted_line_break_stays_in_one_row() {
        let csv = "name,address,email\nAhmad,\"Jl. Pesantren\nNo. 1\",ahmad@x.com\nHasan,,hasan@x.com\n";
        let sheet = read_sheet(SheetFormat::Csv, csv.as_bytes()).unwrap();

        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(
            sheet.rows[0].text("address").as_deref(),
            Some("Jl. Pesantren\nNo. 1")
        );
        assert_eq!(sheet.rows[0].number, 2);
        assert_eq!(sheet.rows[1].number, 3);
    }

    #[test]
    fn test_crlf_rows_after_leading_blank_line() {
        let csv = "\r\nname,email\r\nAhmad,a@x.com\r\n\r\nHasan,h@x.com\r\n";
        let sheet = read_sheet(SheetFormat::Csv, csv.as_bytes()).unwrap();

        assert_eq!(sheet.headers, vec!["name", "email"]);
        assert_eq!(sheet.rows[0].number, 3);
        assert_eq!(sheet.rows[1].number, 5);
    }

    #[test]
    fn test_read_csv_semicolon_delimited() {
        let csv = "name;email;phone\nBudi;budi@x.com;0812\n";
        let sheet = read_sheet(SheetFormat::Csv, csv.as_bytes()).unwrap();

        assert_eq!(sheet.rows[0].text("phone").as_deref(), Some("0812"));
    }

    #[test]
    fn test_short_rows_are_padded() {
        let csv = "name,email,phone\nBudi\n";
        let sheet = read_sheet(SheetFormat::Csv, csv.as_bytes()).unwrap();
        let row = &sheet.rows[0];

        assert_eq!(row.get("phone"), Some(&CellValue::Empty));
        assert_eq!(row.values().get("email").map(String::as_str), Some(""));
    }

    #[test]
    fn test_blank_row_detection() {
        let csv = "name,email\n , \n";
        let sheet = read_sheet(SheetFormat::Csv, csv.as_bytes()).unwrap();
        assert!(sheet.rows[0].is_blank());
    }

    #[test]
    fn test_empty_csv_has_no_header() {
        assert!(matches!(
            read_sheet(SheetFormat::Csv, b""),
            Err(ImportError::MissingHeader)
        ));
    }

    #[test]
    fn test_garbage_xlsx_is_unreadable() {
        assert!(matches!(
            read_sheet(SheetFormat::Xlsx, b"PK\x03\x04not really a zip"),
            Err(ImportError::Unreadable(_))
        ));
    }
}
