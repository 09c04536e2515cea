//! High-level pipeline API for spreadsheet to cadastro XML conversion.
//!
//! This module combines all steps: parsing, column coverage check,
//! row mapping and XML serialization.
//!
//! # Example
//!
//! ```rust,no_run
//! use cadastro::{convert_csv, Auth, RecordType};
//! use std::path::Path;
//!
//! let auth = Auth::new("11.222.333/0001-44", "token").unwrap();
//! let result = convert_csv(Path::new("motoristas.csv"), RecordType::Driver, &auth).unwrap();
//! println!("Converted {} documents", result.documents.len());
//! ```

use serde::Serialize;
use serde_json::Value;
use std::path::Path;

use super::mapper::RowMapper;
use super::municipality::{municipalities, MunicipalityTable};
use crate::api::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::error::PipelineError;
use crate::models::{column_coverage, Auth, ColumnCoverage, RawRow, RecordType};
use crate::parser::{json_headers, parse_bytes_auto, parse_csv_file_auto, rows_from_json, ParseResult};
use crate::xml::serialize;

/// Result of a complete conversion
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    /// Record type every document was built for
    pub record_type: RecordType,

    /// One XML document per input row, in row order
    pub documents: Vec<String>,

    /// Input metadata
    pub csv_info: CsvInfo,

    /// Expected columns missing from the input, and unknown columns
    pub coverage: ColumnCoverage,
}

/// Input file information
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvInfo {
    pub encoding: String,
    pub delimiter: char,
    pub headers: Vec<String>,
    pub row_count: usize,
}

/// Map and serialize a single row against the process-wide municipality table.
pub fn convert_row(row: &RawRow, record_type: RecordType, auth: &Auth) -> String {
    convert_row_with(municipalities(), row, record_type, auth)
}

/// Map and serialize a single row against an explicit municipality table.
pub fn convert_row_with(
    table: &MunicipalityTable,
    row: &RawRow,
    record_type: RecordType,
    auth: &Auth,
) -> String {
    let record = RowMapper::new(table).map(row, record_type);
    serialize(&record, record_type, auth.cnpj(), auth.token())
}

/// Convert every row; the output has one document per row, same order.
pub fn convert_rows(rows: &[RawRow], record_type: RecordType, auth: &Auth) -> Vec<String> {
    convert_rows_with(municipalities(), rows, record_type, auth)
}

pub fn convert_rows_with(
    table: &MunicipalityTable,
    rows: &[RawRow],
    record_type: RecordType,
    auth: &Auth,
) -> Vec<String> {
    let mapper = RowMapper::new(table);
    rows.iter()
        .map(|row| serialize(&mapper.map(row, record_type), record_type, auth.cnpj(), auth.token()))
        .collect()
}

/// Convert a CSV file.
///
/// 1. Parses the CSV with encoding and delimiter auto-detection
/// 2. Reports expected columns that are missing and unknown columns
/// 3. Maps and serializes every row
pub fn convert_csv(
    path: &Path,
    record_type: RecordType,
    auth: &Auth,
) -> Result<ConversionResult, PipelineError> {
    log_info(format!("📖 Reading {}...", path.display()));
    let parse_result = parse_csv_file_auto(path)?;
    convert_parsed(parse_result, record_type, auth)
}

/// Same as [`convert_csv`] but accepts raw bytes instead of a file path.
pub fn convert_bytes(
    bytes: &[u8],
    record_type: RecordType,
    auth: &Auth,
) -> Result<ConversionResult, PipelineError> {
    let parse_result = parse_bytes_auto(bytes)?;
    convert_parsed(parse_result, record_type, auth)
}

/// Convert a JSON array of row objects. Numeric cells stay numeric, so
/// spreadsheet date serials are normalized.
pub fn convert_json(
    value: &Value,
    record_type: RecordType,
    auth: &Auth,
) -> Result<ConversionResult, PipelineError> {
    let rows = rows_from_json(value)?;
    let headers = json_headers(&rows);
    let parse_result = ParseResult {
        rows,
        encoding: "utf-8".to_string(),
        delimiter: ',',
        headers,
    };
    convert_parsed(parse_result, record_type, auth)
}

fn convert_parsed(
    parse_result: ParseResult,
    record_type: RecordType,
    auth: &Auth,
) -> Result<ConversionResult, PipelineError> {
    log_success(format!("Detected encoding: {}", parse_result.encoding));
    log_success(format!("Detected separator: '{}'", format_delimiter(parse_result.delimiter)));
    log_success(format!("Read {} rows", parse_result.rows.len()));

    if parse_result.rows.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let coverage = column_coverage(record_type, &parse_result.headers);
    report_coverage(&coverage);

    log_info(format!("⚙️  Converting rows to {} ({})...", record_type.label(), record_type.envelope_tag()));
    let documents = convert_rows(&parse_result.rows, record_type, auth);
    log_success(format!("Generated {} XML documents", documents.len()));

    Ok(ConversionResult {
        record_type,
        documents,
        csv_info: CsvInfo {
            encoding: parse_result.encoding,
            delimiter: parse_result.delimiter,
            row_count: parse_result.rows.len(),
            headers: parse_result.headers,
        },
        coverage,
    })
}

fn report_coverage(coverage: &ColumnCoverage) {
    if coverage.is_complete() {
        log_success("All expected columns present");
        return;
    }
    if !coverage.missing.is_empty() {
        log_warning(format!("{} expected columns missing (emitted empty):", coverage.missing.len()));
        for col in coverage.missing.iter().take(10) {
            log_info_indent(col.clone(), 1);
        }
    }
    if !coverage.unexpected.is_empty() {
        log_warning(format!("{} unknown columns ignored:", coverage.unexpected.len()));
        for col in coverage.unexpected.iter().take(10) {
            log_info_indent(col.clone(), 1);
        }
    }
}

/// Format delimiter for display
fn format_delimiter(d: char) -> &'static str {
    match d {
        ';' => ";",
        ',' => ",",
        '\t' => "TAB",
        '|' => "|",
        _ => "?",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn auth() -> Auth {
        Auth::new("11222333000144", "tok").unwrap()
    }

    #[test]
    fn test_convert_rows_one_document_per_row() {
        let rows = vec![
            RawRow::new().with("xNome", "Ana"),
            RawRow::new().with("xNome", "Bia"),
        ];
        let docs = convert_rows(&rows, RecordType::Individual, &auth());

        assert_eq!(docs.len(), 2);
        assert!(docs[0].contains("<xNome>Ana</xNome>"));
        assert!(docs[1].contains("<xNome>Bia</xNome>"));
        assert!(docs[0].contains("<xCNPJ>11222333000144</xCNPJ>"));
        assert!(docs[0].contains("<xToken>tok</xToken>"));
    }

    #[test]
    fn test_convert_rows_empty() {
        assert!(convert_rows(&[], RecordType::Driver, &auth()).is_empty());
    }

    #[test]
    fn test_convert_bytes_reports_coverage() {
        let csv = "xNome;CPF;Extra\nAna;123.456.789-00;x";
        let result = convert_bytes(csv.as_bytes(), RecordType::Driver, &auth()).unwrap();

        assert_eq!(result.documents.len(), 1);
        assert_eq!(result.csv_info.row_count, 1);
        assert_eq!(result.csv_info.delimiter, ';');
        assert!(result.coverage.unexpected.contains(&"Extra".to_string()));
        assert!(result.coverage.missing.contains(&"dtNascto".to_string()));
        assert!(!result.coverage.missing.contains(&"xNome".to_string()));
    }

    #[test]
    fn test_convert_bytes_reads_workbook() {
        let bytes = include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/motoristas.xlsx"));
        let result = convert_bytes(bytes, RecordType::Driver, &auth()).unwrap();

        assert_eq!(result.documents.len(), 2);
        assert_eq!(result.csv_info.encoding, "xlsx");
        assert!(result.documents[0].contains("<xNome>Ana</xNome>"));
        assert!(result.documents[0].contains("<dtNascto>2023-03-15</dtNascto>"));
        assert!(result.documents[1].contains("<xNome>Bia</xNome>"));
    }

    #[test]
    fn test_convert_bytes_broken_workbook_is_csv_error() {
        let err = convert_bytes(b"PK\x03\x04\x00\x00", RecordType::Driver, &auth()).unwrap_err();
        assert!(matches!(err, PipelineError::Csv(_)));
    }

    #[test]
    fn test_convert_bytes_header_only_is_empty_input() {
        let err = convert_bytes(b"xNome;CPF\n", RecordType::Driver, &auth()).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyInput));
    }

    #[test]
    fn test_convert_bytes_empty_file_is_csv_error() {
        let err = convert_bytes(b"", RecordType::Driver, &auth()).unwrap_err();
        assert!(matches!(err, PipelineError::Csv(_)));
    }

    #[test]
    fn test_convert_json_normalizes_serial_dates() {
        let value = json!([{"xNome": "Ana", "dtNascto": 45000}]);
        let result = convert_json(&value, RecordType::Driver, &auth()).unwrap();

        assert!(result.documents[0].contains("<dtNascto>2023-03-15</dtNascto>"));
        assert_eq!(result.record_type, RecordType::Driver);
    }

    #[test]
    fn test_convert_csv_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "placa,RENAVAM\nABC1D23,123\nXYZ9A87,456\n").unwrap();

        let result = convert_csv(file.path(), RecordType::Vehicle, &auth()).unwrap();
        assert_eq!(result.documents.len(), 2);
        assert!(result.documents[1].starts_with("<?xml"));
        assert!(result.documents[1].contains("<placa>XYZ9A87</placa>"));
    }

    #[test]
    fn test_convert_row_with_custom_table() {
        use crate::transform::municipality::Municipality;
        let table = MunicipalityTable::new(vec![Municipality {
            nome: "Vila Nova".into(),
            uf: None,
            codigo_ibge: 9999999,
        }]);
        let row = RawRow::new().with("xNome", "Ana").with("cMun", "vila nova");
        let doc = convert_row_with(&table, &row, RecordType::Driver, &auth());
        assert!(doc.contains("<cMun>9999999</cMun>"));
    }
}
