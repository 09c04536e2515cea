//! Batch authentication block (`Autentic`).

use serde::Serialize;

use crate::error::AuthError;

/// Number of digits in a CNPJ.
pub const CNPJ_DIGITS: usize = 14;

/// CNPJ + access token, injected into every document of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Auth {
    cnpj: String,
    token: String,
}

impl Auth {
    /// Validate credentials. The CNPJ may be formatted (`00.000.000/0000-00`);
    /// only its digits are kept.
    pub fn new(cnpj: &str, token: &str) -> Result<Self, AuthError> {
        let cnpj = digits_only(cnpj);
        if cnpj.len() != CNPJ_DIGITS {
            return Err(AuthError::InvalidCnpj(cnpj.len()));
        }
        if token.trim().is_empty() {
            return Err(AuthError::MissingToken);
        }
        Ok(Self {
            cnpj,
            token: token.to_string(),
        })
    }

    /// CNPJ digits.
    pub fn cnpj(&self) -> &str {
        &self.cnpj
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

/// Keep only ASCII digits.
pub fn digits_only(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Format a (possibly partial) CNPJ as `00.000.000/0000-00`.
///
/// Extra digits beyond 14 are dropped.
pub fn format_cnpj(value: &str) -> String {
    let digits: Vec<char> = digits_only(value).chars().take(CNPJ_DIGITS).collect();
    let mut out = String::with_capacity(18);
    for (i, d) in digits.iter().enumerate() {
        match i {
            2 | 5 => out.push('.'),
            8 => out.push('/'),
            12 => out.push('-'),
            _ => {}
        }
        out.push(*d);
    }
    out
}
