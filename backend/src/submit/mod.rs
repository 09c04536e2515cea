//! Transmission of generated documents to the cadastro API.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cadastro::submit::SubmitClient;
//!
//! let client = SubmitClient::new("http://homolog.controleembarque.com.br");
//! let report = client.submit_all(RecordType::Driver, &documents).await?;
//! println!("{}/{} accepted", report.succeeded, report.total);
//! ```
//!
//! Documents are posted one at a time, in order, with no retry.

use serde::Serialize;

use crate::api::logs::{log_error, log_info, log_success, log_warning};
use crate::error::{SubmitError, SubmitResult};
use crate::models::RecordType;

/// Content type expected by the upstream API.
pub const XML_CONTENT_TYPE: &str = "text/xml; charset=utf-8";

/// Longest upstream body kept in a failure entry.
const MAX_BODY_CHARS: usize = 500;

/// Upstream API client
#[derive(Debug, Clone)]
pub struct SubmitClient {
    base_url: String,
    http: reqwest::Client,
}

/// Outcome of a batch submission
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReport {
    /// Documents sent
    pub total: usize,
    /// Documents answered with a 2xx status
    pub succeeded: usize,
    /// Rejected documents
    pub failures: Vec<SubmitFailure>,
}

/// A document the upstream API rejected
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubmitFailure {
    /// Position of the document in the batch
    pub index: usize,
    pub status: u16,
    pub body: String,
}

impl SubmitReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.total > 0 && self.succeeded == self.total
    }
}

impl SubmitClient {
    /// Create a client for an API base URL (trailing slashes ignored).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full endpoint URL for a record type.
    pub fn endpoint(&self, record_type: RecordType) -> String {
        join_url(&self.base_url, record_type.route())
    }

    /// Post one document. Returns the upstream response body on success.
    pub async fn submit_one(&self, record_type: RecordType, xml: &str) -> SubmitResult<String> {
        let response = self
            .http
            .post(self.endpoint(record_type))
            .header(reqwest::header::CONTENT_TYPE, XML_CONTENT_TYPE)
            .body(xml.to_string())
            .send()
            .await
            .map_err(|e| SubmitError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SubmitError::Request(e.to_string()))?;

        if !status.is_success() {
            return Err(SubmitError::Rejected {
                status: status.as_u16(),
                body: truncate(&body, MAX_BODY_CHARS),
            });
        }

        Ok(body)
    }

    /// Post every document in order.
    ///
    /// Rejections are collected in the report; a transport failure aborts
    /// the batch.
    pub async fn submit_all(
        &self,
        record_type: RecordType,
        documents: &[String],
    ) -> SubmitResult<SubmitReport> {
        if documents.is_empty() {
            return Err(SubmitError::NoDocuments);
        }

        log_info(format!(
            "📡 Sending {} documents to {}",
            documents.len(),
            self.endpoint(record_type)
        ));

        let mut report = SubmitReport {
            total: documents.len(),
            ..SubmitReport::default()
        };

        for (index, xml) in documents.iter().enumerate() {
            match self.submit_one(record_type, xml).await {
                Ok(_) => report.succeeded += 1,
                Err(SubmitError::Rejected { status, body }) => {
                    log_error(format!("Document {}: HTTP {}", index + 1, status));
                    report.failures.push(SubmitFailure { index, status, body });
                }
                Err(e) => {
                    log_error(format!("Document {}: {}", index + 1, e));
                    return Err(e);
                }
            }
        }

        if report.all_succeeded() {
            log_success(format!("All {} documents accepted", report.total));
        } else {
            log_warning(format!(
                "{} of {} documents accepted",
                report.succeeded, report.total
            ));
        }

        Ok(report)
    }
}

/// Join a base URL and a relative path with exactly one slash.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
