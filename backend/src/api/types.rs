//! REST API types for frontend integration.
//!
//! Documents are returned as ready-to-send XML strings; the frontend only
//! displays or forwards them.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::models::{expected_fields, ColumnCoverage, RecordType};
use crate::transform::pipeline::ConversionResult;

/// Response sent to frontend after upload and conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResponse {
    /// Unique job identifier
    pub job_id: String,

    /// Status: "ready", "warning", "error"
    pub status: String,

    /// Record type the documents were built for
    pub record_type: RecordType,

    /// One XML document per row
    pub documents: Vec<String>,

    /// Metadata about the conversion
    pub metadata: ResponseMetadata,
}

/// Metadata about the conversion
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    /// Number of documents
    pub total_documents: usize,

    /// Envelope root element
    pub envelope: String,

    /// Upstream route the documents belong to
    pub route: String,

    /// CSV info
    pub csv_info: CsvMetadata,

    /// Expected columns missing from the file
    pub missing_columns: Vec<String>,

    /// Columns no mapping reads
    pub unexpected_columns: Vec<String>,
}

/// CSV file metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvMetadata {
    pub encoding: String,
    pub delimiter: String,
    pub row_count: usize,
    pub columns: Vec<String>,
}

/// Body of `POST /api/submit`
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitRequest {
    #[serde(rename = "type")]
    pub record_type: RecordType,
    pub documents: Vec<String>,
}

/// Body of `GET /api/types/{type}/fields`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldsResponse {
    pub record_type: RecordType,
    pub label: &'static str,
    pub envelope: &'static str,
    pub route: &'static str,
    pub fields: &'static [&'static str],
}

impl From<RecordType> for FieldsResponse {
    fn from(record_type: RecordType) -> Self {
        Self {
            record_type,
            label: record_type.label(),
            envelope: record_type.envelope_tag(),
            route: record_type.route(),
            fields: expected_fields(record_type),
        }
    }
}

impl From<ConversionResult> for ConvertResponse {
    fn from(result: ConversionResult) -> Self {
        let ColumnCoverage { missing, unexpected } = result.coverage;
        let status = if missing.is_empty() { "ready" } else { "warning" };

        ConvertResponse {
            job_id: Uuid::new_v4().to_string(),
            status: status.to_string(),
            record_type: result.record_type,
            metadata: ResponseMetadata {
                total_documents: result.documents.len(),
                envelope: result.record_type.envelope_tag().to_string(),
                route: result.record_type.route().to_string(),
                csv_info: CsvMetadata {
                    encoding: result.csv_info.encoding,
                    delimiter: result.csv_info.delimiter.to_string(),
                    row_count: result.csv_info.row_count,
                    columns: result.csv_info.headers,
                },
                missing_columns: missing,
                unexpected_columns: unexpected,
            },
            documents: result.documents,
        }
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
        "documents": [],
        "metadata": {
            "totalDocuments": 0
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::pipeline::CsvInfo;

    fn result(missing: Vec<String>) -> ConversionResult {
        ConversionResult {
            record_type: RecordType::Vehicle,
            documents: vec!["<envVeic/>".to_string()],
            csv_info: CsvInfo {
                encoding: "utf-8".into(),
                delimiter: ';',
                headers: vec!["placa".into()],
                row_count: 1,
            },
            coverage: ColumnCoverage {
                missing,
                unexpected: vec![],
            },
        }
    }

    #[test]
    fn test_convert_response_shape() {
        let response = ConvertResponse::from(result(vec!["RENAVAM".into()]));
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["status"], "warning");
        assert_eq!(value["recordType"], "vehicle");
        assert_eq!(value["documents"][0], "<envVeic/>");
        assert_eq!(value["metadata"]["totalDocuments"], 1);
        assert_eq!(value["metadata"]["envelope"], "envVeic");
        assert_eq!(value["metadata"]["csvInfo"]["delimiter"], ";");
        assert_eq!(value["metadata"]["missingColumns"][0], "RENAVAM");
        assert_eq!(value["jobId"].as_str().unwrap().len(), 36);
    }

    #[test]
    fn test_complete_coverage_is_ready() {
        let response = ConvertResponse::from(result(vec![]));
        assert_eq!(response.status, "ready");
    }

    #[test]
    fn test_submit_request_accepts_aliases() {
        let req: SubmitRequest =
            serde_json::from_value(json!({"type": "motorista", "documents": ["<a/>"]})).unwrap();
        assert_eq!(req.record_type, RecordType::Driver);
        assert_eq!(req.documents.len(), 1);
    }

    #[test]
    fn test_fields_response() {
        let value = serde_json::to_value(FieldsResponse::from(RecordType::Company)).unwrap();
        assert_eq!(value["envelope"], "envParticipante");
        assert_eq!(value["fields"][1], "xCNPJ");
    }

    #[test]
    fn test_error_response() {
        let value = error_response("boom");
        assert_eq!(value["status"], "error");
        assert_eq!(value["error"], "boom");
    }
}
