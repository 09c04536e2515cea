//! Error types for the cadastro conversion pipeline.
//!
//! Mapping and serialization are total and have no error type. Everything
//! around them can fail:
//!
//! - [`CsvError`] - CSV parsing errors (defined in [`crate::parser`])
//! - [`RecordTypeError`] - Unknown record type selector
//! - [`AuthError`] - Invalid batch credentials
//! - [`MunicipalityError`] - External municipality dataset problems
//! - [`ConfigError`] - Invalid environment configuration
//! - [`SubmitError`] - Transmission to the upstream API
//! - [`PipelineError`] - Top-level orchestration errors
//! - [`ServerError`] - HTTP API errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

pub use crate::parser::CsvError;

// =============================================================================
// Record Type Errors
// =============================================================================

/// A record type selector that matches none of the five cadastro types.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown record type '{0}' (expected driver, vehicle, carrier, individual or company)")]
pub struct RecordTypeError(pub String);

// =============================================================================
// Authentication Errors
// =============================================================================

/// Errors validating the batch authentication block.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// CNPJ does not have exactly 14 digits.
    #[error("CNPJ must have 14 digits, got {0}")]
    InvalidCnpj(usize),

    /// Token is empty or blank.
    #[error("Access token is empty")]
    MissingToken,
}

// =============================================================================
// Municipality Errors
// =============================================================================

/// Errors loading an external municipality dataset.
#[derive(Debug, Error)]
pub enum MunicipalityError {
    /// Failed to read the dataset file.
    #[error("Failed to read municipality dataset: {0}")]
    IoError(#[from] std::io::Error),

    /// Dataset is not a JSON array of `{nome, codigo_ibge}` objects.
    #[error("Invalid municipality dataset: {0}")]
    JsonError(#[from] serde_json::Error),

    /// The global table was already initialized.
    #[error("Municipality table already loaded")]
    AlreadyLoaded,
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors reading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable is present but cannot be parsed.
    #[error("Invalid value for {name}: '{value}'")]
    InvalidValue { name: String, value: String },
}

// =============================================================================
// Submission Errors
// =============================================================================

/// Errors while sending documents to the upstream API.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Transport-level failure (DNS, connection, timeout).
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// Upstream answered with a non-success status.
    #[error("Upstream returned HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Nothing to send.
    #[error("No documents to submit")]
    NoDocuments,
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the main error type returned by [`crate::transform::pipeline::convert_csv`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// CSV parsing error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Unknown record type.
    #[error("{0}")]
    RecordType(#[from] RecordTypeError),

    /// Invalid credentials.
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Municipality dataset error.
    #[error("Municipality error: {0}")]
    Municipality(#[from] MunicipalityError),

    /// Submission error.
    #[error("Submit error: {0}")]
    Submit(#[from] SubmitError),

    /// JSON input error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No rows to convert.
    #[error("No rows to convert")]
    EmptyInput,
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Relay to upstream failed.
    #[error("Upstream relay failed: {0}")]
    Upstream(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for submission operations.
pub type SubmitResult<T> = Result<T, SubmitError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
