//! Value normalization applied by the row mapper.
//!
//! Every function here is total: unusable input degrades to an empty string
//! (or is passed through) instead of failing.

use chrono::{Datelike, Duration, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::RawValue;

/// Spreadsheet serial of 1970-01-01 (serials count days from 1899-12-30).
const UNIX_EPOCH_SERIAL: f64 = 25569.0;

/// Serials further than this from the Unix epoch are rejected.
const MAX_SERIAL_OFFSET_DAYS: f64 = 2_000_000.0;

static BR_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{2})/(\d{2})/(\d{4})$").expect("valid date pattern"));

static ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date pattern"));

/// Normalize a spreadsheet date to `yyyy-mm-dd`.
///
/// Accepts:
/// - a numeric serial (`45000` → `2023-03-15`); the fractional time part is
///   truncated
/// - `dd/mm/yyyy` text, reordered
/// - `yyyy-mm-dd` text, passed through
///
/// Anything else yields `""`.
///
/// # Example
/// ```
/// use cadastro::{excel_date_to_iso, RawValue};
///
/// assert_eq!(excel_date_to_iso(&RawValue::Number(45000.0)), "2023-03-15");
/// assert_eq!(excel_date_to_iso(&RawValue::from("15/03/2024")), "2024-03-15");
/// assert_eq!(excel_date_to_iso(&RawValue::from("garbage")), "");
/// ```
pub fn excel_date_to_iso(value: &RawValue) -> String {
    match value {
        RawValue::Number(serial) => serial_to_iso(*serial).unwrap_or_default(),
        RawValue::Text(text) => text_to_iso(text.trim()),
        RawValue::Empty => String::new(),
    }
}

fn serial_to_iso(serial: f64) -> Option<String> {
    if !serial.is_finite() {
        return None;
    }
    let offset = (serial - UNIX_EPOCH_SERIAL).floor();
    if offset.abs() > MAX_SERIAL_OFFSET_DAYS {
        return None;
    }

    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)?;
    let date = epoch.checked_add_signed(Duration::days(offset as i64))?;
    if !(0..=9999).contains(&date.year()) {
        return None;
    }
    Some(date.format("%Y-%m-%d").to_string())
}

fn text_to_iso(text: &str) -> String {
    if let Some(caps) = BR_DATE.captures(text) {
        return format!("{}-{}-{}", &caps[3], &caps[2], &caps[1]);
    }
    if ISO_DATE.is_match(text) {
        return text.to_string();
    }
    String::new()
}

/// Strip punctuation from a document number (CPF, CNPJ, phone).
///
/// Keeps ASCII letters and digits only. Non-text cells yield `""`.
pub fn clean_document(value: &RawValue) -> String {
    match value {
        RawValue::Text(text) => text.chars().filter(|c| c.is_ascii_alphanumeric()).collect(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_date() {
        assert_eq!(excel_date_to_iso(&RawValue::Number(45000.0)), "2023-03-15");
        assert_eq!(excel_date_to_iso(&RawValue::Number(25569.0)), "1970-01-01");
        assert_eq!(excel_date_to_iso(&RawValue::Number(1.0)), "1899-12-31");
    }

    #[test]
    fn test_serial_time_part_truncated() {
        assert_eq!(excel_date_to_iso(&RawValue::Number(45000.99)), "2023-03-15");
    }

    #[test]
    fn test_serial_shape() {
        let re = Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap();
        for serial in [0.0, 366.0, 30000.0, 45000.0, 60000.5] {
            let iso = excel_date_to_iso(&RawValue::Number(serial));
            assert!(re.is_match(&iso), "{serial} -> {iso}");
        }
    }

    #[test]
    fn test_unusable_serials() {
        assert_eq!(excel_date_to_iso(&RawValue::Number(f64::NAN)), "");
        assert_eq!(excel_date_to_iso(&RawValue::Number(f64::INFINITY)), "");
        assert_eq!(excel_date_to_iso(&RawValue::Number(1e12)), "");
    }

    #[test]
    fn test_brazilian_date_reordered() {
        assert_eq!(excel_date_to_iso(&RawValue::from("15/03/2024")), "2024-03-15");
        assert_eq!(excel_date_to_iso(&RawValue::from(" 01/12/1990 ")), "1990-12-01");
    }

    #[test]
    fn test_iso_passthrough() {
        assert_eq!(excel_date_to_iso(&RawValue::from("2024-03-15")), "2024-03-15");
    }

    #[test]
    fn test_other_shapes_are_empty() {
        assert_eq!(excel_date_to_iso(&RawValue::from("garbage")), "");
        assert_eq!(excel_date_to_iso(&RawValue::from("5/3/2024")), "");
        assert_eq!(excel_date_to_iso(&RawValue::from("2024-03-15T10:00:00")), "");
        assert_eq!(excel_date_to_iso(&RawValue::from("45000")), "");
        assert_eq!(excel_date_to_iso(&RawValue::Empty), "");
    }

    #[test]
    fn test_clean_document() {
        assert_eq!(clean_document(&RawValue::from("(11) 9999-8888")), "1199998888");
        assert_eq!(clean_document(&RawValue::from("12.345.678/0001-90")), "12345678000190");
        assert_eq!(clean_document(&RawValue::from("ABC-1234")), "ABC1234");
        assert_eq!(clean_document(&RawValue::from("São")), "So");
    }

    #[test]
    fn test_clean_document_non_text() {
        assert_eq!(clean_document(&RawValue::Number(11999988888.0)), "");
        assert_eq!(clean_document(&RawValue::Empty), "");
    }
}
