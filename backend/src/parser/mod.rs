//! Spreadsheet input parser with encoding and delimiter auto-detection.
//!
//! Turns CSV exports, Excel workbooks (or JSON arrays) into [`RawRow`]s. No
//! cadastro-specific logic here: column names are kept exactly as found in
//! the header line.

pub mod workbook;

use serde_json::Value;
use std::path::Path;

use crate::models::{RawRow, RawValue};

pub use workbook::{parse_workbook_bytes, workbook_format};

/// CSV parsing error with context
#[derive(Debug, Clone)]
pub struct CsvError {
    pub line: usize,
    pub column: Option<String>,
    pub value: Option<String>,
    pub message: String,
}

impl std::fmt::Display for CsvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.column, &self.value) {
            (Some(col), Some(val)) => {
                write!(f, "Line {}, column '{}' (value '{}'): {}", self.line, col, val, self.message)
            }
            (Some(col), None) => {
                write!(f, "Line {}, column '{}': {}", self.line, col, self.message)
            }
            _ => {
                write!(f, "Line {}: {}", self.line, self.message)
            }
        }
    }
}

impl std::error::Error for CsvError {}

impl CsvError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column: None,
            value: None,
            message: message.into(),
        }
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

impl From<csv::Error> for CsvError {
    fn from(err: csv::Error) -> Self {
        let line = err
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(0);
        CsvError::new(line, err.to_string())
    }
}

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed rows, one per non-blank data line
    pub rows: Vec<RawRow>,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
    /// Column headers, in file order
    pub headers: Vec<String>,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding.
///
/// A leading UTF-8 byte order mark (common in spreadsheet exports) is dropped.
pub fn decode_content(bytes: &[u8], encoding: &str) -> Result<String, CsvError> {
    let decoded = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => String::from_utf8_lossy(bytes).into_owned(),
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        other => match encoding_rs::Encoding::for_label(other.as_bytes()) {
            Some(enc) => enc.decode(bytes).0.into_owned(),
            None => String::from_utf8_lossy(bytes).into_owned(),
        },
    };

    match decoded.strip_prefix('\u{feff}') {
        Some(rest) => Ok(rest.to_string()),
        None => Ok(decoded),
    }
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [';', ',', '\t', '|'];
    let mut best_sep = ';';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse CSV text into rows with an explicit delimiter.
///
/// # Example
/// ```
/// use cadastro::parser::csv_to_rows;
///
/// let rows = csv_to_rows("xNome;CPF\nAna;123", ';').unwrap();
/// assert_eq!(rows.len(), 1);
/// assert_eq!(rows[0].get("xNome").to_text(), "Ana");
/// ```
pub fn csv_to_rows(csv: &str, delimiter: char) -> Result<Vec<RawRow>, CsvError> {
    parse_string_with_metadata(csv, delimiter, "utf-8".to_string()).map(|r| r.rows)
}

/// Parse a CSV or workbook file with auto-detection of format, encoding and
/// delimiter.
pub fn parse_csv_file_auto<P: AsRef<Path>>(path: P) -> Result<ParseResult, CsvError> {
    let bytes = std::fs::read(path.as_ref())
        .map_err(|e| CsvError::new(0, format!("Cannot read file: {}", e)))?;

    parse_bytes_auto(&bytes)
}

/// Parse bytes with auto-detection of encoding and delimiter.
///
/// Workbooks (.xlsx / .xls) are recognized by their signature and read
/// from their first worksheet instead of being decoded as text.
pub fn parse_bytes_auto(bytes: &[u8]) -> Result<ParseResult, CsvError> {
    if workbook_format(bytes).is_some() {
        return parse_workbook_bytes(bytes);
    }

    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = detect_delimiter(&content);

    parse_string_with_metadata(&content, delimiter, encoding)
}

/// Parse CSV string with explicit delimiter and return metadata.
///
/// Every cell becomes [`RawValue::Text`] (trimmed). Missing trailing cells
/// are empty text, extra cells are ignored, blank lines are skipped.
pub fn parse_string_with_metadata(
    content: &str,
    delimiter: char,
    encoding: String,
) -> Result<ParseResult, CsvError> {
    if content.trim().is_empty() {
        return Err(CsvError::new(1, "Empty CSV file"));
    }
    if !delimiter.is_ascii() {
        return Err(CsvError::new(0, format!("Unsupported delimiter '{}'", delimiter)));
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(str::to_string)
        .collect();

    if headers.iter().all(String::is_empty) {
        return Err(CsvError::new(1, "No headers found"));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }

        let row: RawRow = headers
            .iter()
            .enumerate()
            .filter(|(_, header)| !header.is_empty())
            .map(|(i, header)| {
                let cell = record.get(i).unwrap_or("");
                (header.clone(), RawValue::Text(cell.to_string()))
            })
            .collect();
        rows.push(row);
    }

    Ok(ParseResult {
        rows,
        encoding,
        delimiter,
        headers,
    })
}

/// Rows from a JSON array of objects. Unlike CSV, numeric cells stay numbers.
pub fn rows_from_json(value: &Value) -> Result<Vec<RawRow>, CsvError> {
    let items = value
        .as_array()
        .ok_or_else(|| CsvError::new(0, "Expected a JSON array of objects"))?;

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            RawRow::from_json(item)
                .ok_or_else(|| CsvError::new(i + 1, "Expected a JSON object"))
        })
        .collect()
}

/// Union of the keys of every row, sorted.
pub fn json_headers(rows: &[RawRow]) -> Vec<String> {
    let mut headers: Vec<String> = rows
        .iter()
        .flat_map(|r| r.keys().map(str::to_string))
        .collect();
    headers.sort();
    headers.dedup();
    headers
}

#[cfg(test)]
mod tests {
    use super::workbook::XLS_MAGIC;
    use super::*;
    use serde_json::json;

    fn text(row: &RawRow, key: &str) -> String {
        row.get(key).to_text()
    }

    #[test]
    fn test_simple_csv() {
        let rows = csv_to_rows("xNome;CPF\nAlice;111\nBob;222", ';').unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(text(&rows[0], "xNome"), "Alice");
        assert_eq!(text(&rows[0], "CPF"), "111");
        assert_eq!(text(&rows[1], "xNome"), "Bob");
    }

    #[test]
    fn test_cells_are_text() {
        let rows = csv_to_rows("dtNascto\n45000", ';').unwrap();
        assert_eq!(rows[0].get("dtNascto"), &RawValue::Text("45000".into()));
    }

    #[test]
    fn test_quoted_values() {
        let csv = "xNome;xLgr\n\"Ana\";\"Rua A; 10\"";
        let rows = csv_to_rows(csv, ';').unwrap();

        assert_eq!(text(&rows[0], "xNome"), "Ana");
        assert_eq!(text(&rows[0], "xLgr"), "Rua A; 10");
    }

    #[test]
    fn test_empty_lines_skipped() {
        let rows = csv_to_rows("a;b\n1;2\n\n;\n3;4\n", ';').unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_missing_values() {
        let rows = csv_to_rows("a;b;c\n1;;3\n4", ';').unwrap();

        assert_eq!(text(&rows[0], "b"), "");
        assert_eq!(text(&rows[0], "c"), "3");
        assert!(rows[1].contains("c"));
        assert_eq!(text(&rows[1], "c"), "");
    }

    #[test]
    fn test_extra_columns_ignored() {
        let rows = csv_to_rows("a;b\n1;2;3;4", ';').unwrap();

        assert_eq!(rows[0].len(), 2);
        assert_eq!(text(&rows[0], "b"), "2");
    }

    #[test]
    fn test_error_message_format() {
        let err = CsvError::new(5, "Invalid value")
            .with_column("dtNascto")
            .with_value("abc");

        let msg = err.to_string();
        assert!(msg.contains("Line 5"));
        assert!(msg.contains("column 'dtNascto'"));
        assert!(msg.contains("value 'abc'"));
    }

    #[test]
    fn test_empty_csv_error() {
        let err = csv_to_rows("", ';').unwrap_err();
        assert!(err.message.contains("Empty"));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), '\t');
        assert_eq!(detect_delimiter("a|b|c\n1|2|3"), '|');
        assert_eq!(detect_delimiter("single"), ';');
    }

    #[test]
    fn test_auto_parse() {
        let csv = "xNome,CPF\nAlice,111\nBob,222";
        let result = parse_bytes_auto(csv.as_bytes()).unwrap();

        assert_eq!(result.delimiter, ',');
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.headers, vec!["xNome", "CPF"]);
    }

    #[test]
    fn test_auto_parse_reads_workbooks() {
        let bytes = include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/motoristas.xlsx"));
        let result = parse_bytes_auto(bytes).unwrap();

        assert_eq!(result.encoding, "xlsx");
        assert_eq!(result.rows[0].get("xNome"), &RawValue::Text("Ana".into()));
    }

    #[test]
    fn test_auto_parse_rejects_broken_workbook() {
        let mut bytes = XLS_MAGIC.to_vec();
        bytes.extend_from_slice(b"garbage");
        assert!(parse_bytes_auto(&bytes).is_err());
    }

    #[test]
    fn test_bom_stripped_from_first_header() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"xNome;CPF\nAna;1");
        let result = parse_bytes_auto(&bytes).unwrap();
        assert_eq!(result.headers[0], "xNome");
    }

    #[test]
    fn test_latin1_decoding() {
        // "São" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0xE3, 0x6F];
        let decoded = decode_content(bytes, "iso-8859-1").unwrap();
        assert_eq!(decoded, "São");
    }

    #[test]
    fn test_parse_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "placa;RENAVAM\nABC1D23;123").unwrap();

        let result = parse_csv_file_auto(file.path()).unwrap();
        assert_eq!(text(&result.rows[0], "placa"), "ABC1D23");
    }

    #[test]
    fn test_rows_from_json_keeps_numbers() {
        let rows = rows_from_json(&json!([{"tipoPessoa": 2, "xNome": "ACME"}])).unwrap();
        assert_eq!(rows[0].get("tipoPessoa"), &RawValue::Number(2.0));

        let err = rows_from_json(&json!([{"a": 1}, 3])).unwrap_err();
        assert_eq!(err.line, 2);
        assert!(rows_from_json(&json!({"a": 1})).is_err());
    }

    #[test]
    fn test_json_headers_union() {
        let rows = rows_from_json(&json!([{"b": 1}, {"a": 1, "b": 2}])).unwrap();
        assert_eq!(json_headers(&rows), vec!["a", "b"]);
    }
}
