//! # Cadastro - spreadsheet to cadastro XML conversion
//!
//! Converts spreadsheet exports describing drivers, vehicles, carriers,
//! individuals and companies into the XML envelopes accepted by the
//! cadastro API, and optionally sends them.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  CSV / JSON │────▶│   Parser    │────▶│   Mapper    │────▶│ XML envelope│
//! │  (ISO/UTF8) │     │  (auto-enc) │     │ (dates/IBGE)│     │  (per row)  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └──────┬──────┘
//!                                                                    │
//!                                                             ┌──────▼──────┐
//!                                                             │   Submit    │
//!                                                             │  (upstream) │
//!                                                             └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use cadastro::{convert_rows, Auth, RawRow, RecordType};
//!
//! let auth = Auth::new("11.222.333/0001-44", "token").unwrap();
//! let rows = vec![RawRow::new().with("xNome", "Ana").with("dtNascto", 45000.0)];
//! let docs = convert_rows(&rows, RecordType::Driver, &auth);
//!
//! assert!(docs[0].contains("<dtNascto>2023-03-15</dtNascto>"));
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Record types, raw rows, mapped records, credentials
//! - [`parser`] - CSV parsing with auto-detection
//! - [`transform`] - Normalization, municipality lookup, mapping, pipeline
//! - [`xml`] - Envelope serialization
//! - [`submit`] - Upstream API client
//! - [`config`] - Environment configuration
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Transformation
pub mod transform;
pub mod xml;

// Transmission
pub mod submit;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    AuthError, ConfigError, MunicipalityError, PipelineError, RecordTypeError, ServerError,
    SubmitError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    column_coverage, expected_fields, format_cnpj, Auth, ColumnCoverage, Field, MappedRecord,
    RawRow, RawValue, RecordType,
};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    csv_to_rows, decode_content, detect_delimiter, detect_encoding, parse_bytes_auto,
    parse_csv_file_auto, rows_from_json, CsvError, ParseResult,
};

// =============================================================================
// Re-exports - Transformation
// =============================================================================

pub use transform::{
    clean_document, excel_date_to_iso, init_municipalities, map_row, municipalities,
    resolve_municipality, Municipality, MunicipalityTable, RowMapper,
};

pub use transform::pipeline::{
    convert_bytes, convert_csv, convert_json, convert_row, convert_rows, ConversionResult,
    CsvInfo,
};

pub use xml::{escape_xml, serialize};

// =============================================================================
// Re-exports - Submission, config, API
// =============================================================================

pub use submit::{SubmitClient, SubmitReport};

pub use config::Config;

pub use api::types::{error_response, ConvertResponse, CsvMetadata, ResponseMetadata};

// Server
pub mod server {
    pub use crate::api::server::{router, start_server, AppState};
}
