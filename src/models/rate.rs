//! # models::rate
//!
//! Defines [`RateObservation`], one recorded gold price for one calendar
//! date, plus the free-text validation that guards the entry form.
//!
//! The wire names (`goldRate`, `timestamp`) match the records already
//! stored in the realtime database, so existing data reads back unchanged.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

// ─── RateObservation ──────────────────────────────────────────────────────────

/// One gold-price sample for a calendar date.
///
/// The date doubles as the storage key (see [`RateObservation::storage_key`]),
/// so there is at most one observation per day — resubmitting the same date
/// overwrites the earlier record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateObservation {
    /// Normalized calendar date, always `YYYY-MM-DD`.
    pub date: String,

    /// Price in currency units per gram. Always positive.
    #[serde(rename = "goldRate")]
    pub rate: f64,

    /// UTC timestamp of the last write for this date.
    #[serde(rename = "timestamp")]
    pub recorded_at: DateTime<Utc>,
}

impl RateObservation {
    pub fn new(date: String, rate: f64) -> Self {
        Self {
            date,
            rate,
            recorded_at: Utc::now(),
        }
    }

    /// Store key ของวันที่นี้ — `YYYY-MM-DD` ตัด separator ออกเหลือ `YYYYMMDD`
    #[inline]
    pub fn storage_key(&self) -> String {
        storage_key(&self.date)
    }
}

/// The raw entry-form submission. Both fields arrive as free text and must
/// pass [`normalize_date`] / [`parse_rate`] before anything is written.
#[derive(Debug, Deserialize)]
pub struct RateSubmission {
    pub date: String,
    #[serde(rename = "goldRate")]
    pub rate: String,
}

// ─── Date Normalization ───────────────────────────────────────────────────────

/// Accepts `YYYY-MM-DD` or `DD-MM-YYYY` and returns the canonical
/// `YYYY-MM-DD` form.
///
/// After reordering, the string must parse to a **real** calendar date —
/// `31-02-2025` comes out shaped correctly but is still rejected.
pub fn normalize_date(input: &str) -> Result<String, AppError> {
    let raw = input.trim();

    let normalized = if is_date_shape(raw, false) {
        // DD-MM-YYYY → สลับเป็น YYYY-MM-DD
        let parts: Vec<&str> = raw.split('-').collect();
        format!("{}-{}-{}", parts[2], parts[1], parts[0])
    } else if is_date_shape(raw, true) {
        raw.to_string()
    } else {
        return Err(AppError::InvalidDate(format!(
            "expected DD-MM-YYYY or YYYY-MM-DD, got \"{raw}\""
        )));
    };

    // ตรวจกับปฏิทินจริง (chrono ปฏิเสธวันที่ไม่มีอยู่ เช่น 2025-02-31)
    match NaiveDate::parse_from_str(&normalized, "%Y-%m-%d") {
        Ok(_) => Ok(normalized),
        Err(_) => Err(AppError::InvalidDate(format!(
            "\"{raw}\" is not a real calendar date"
        ))),
    }
}

/// Shape check only — digits in the right slots, dashes in the right slots.
/// Calendar validity is chrono's job.
fn is_date_shape(s: &str, year_first: bool) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() != 10 {
        return false;
    }
    let (dash_a, dash_b) = if year_first { (4, 7) } else { (2, 5) };
    bytes.iter().enumerate().all(|(i, &c)| {
        if i == dash_a || i == dash_b {
            c == b'-'
        } else {
            c.is_ascii_digit()
        }
    })
}

// ─── Rate Parsing ─────────────────────────────────────────────────────────────

/// Parses the free-text rate field. Empty, non-numeric, non-finite and
/// non-positive values are all rejected before any write happens.
pub fn parse_rate(input: &str) -> Result<f64, AppError> {
    let raw = input.trim();
    if raw.is_empty() {
        return Err(AppError::InvalidRate("gold rate is required".to_string()));
    }

    let rate: f64 = raw
        .parse()
        .map_err(|_| AppError::InvalidRate(format!("\"{raw}\" is not a number")))?;

    if !rate.is_finite() || rate <= 0.0 {
        return Err(AppError::InvalidRate(format!(
            "gold rate must be a positive number, got {raw}"
        )));
    }

    Ok(rate)
}

// ─── Storage Key ──────────────────────────────────────────────────────────────

/// `YYYY-MM-DD` → `YYYYMMDD` — the unique per-date key under the rates path.
#[inline]
pub fn storage_key(date: &str) -> String {
    date.replace('-', "")
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dmy_is_rewritten() {
        assert_eq!(normalize_date("30-08-2025").unwrap(), "2025-08-30");
    }

    #[test]
    fn test_ymd_passes_unchanged() {
        assert_eq!(normalize_date("2025-08-30").unwrap(), "2025-08-30");
    }

    #[test]
    fn test_impossible_date_rejected() {
        // รูปแบบถูกต้อง แต่ไม่มีวันนี้ในปฏิทิน
        assert!(matches!(
            normalize_date("31-02-2025"),
            Err(AppError::InvalidDate(_))
        ));
        assert!(matches!(
            normalize_date("2025-02-31"),
            Err(AppError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_garbage_shapes_rejected() {
        for input in ["2025/08/30", "30-8-2025", "yesterday", "", "2025-08-30T00"] {
            assert!(
                matches!(normalize_date(input), Err(AppError::InvalidDate(_))),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_leap_day() {
        assert_eq!(normalize_date("29-02-2024").unwrap(), "2024-02-29");
        assert!(normalize_date("29-02-2025").is_err());
    }

    #[test]
    fn test_parse_rate_accepts_decimals() {
        assert_eq!(parse_rate("8450.50").unwrap(), 8450.50);
        assert_eq!(parse_rate(" 5000 ").unwrap(), 5000.0);
    }

    #[test]
    fn test_parse_rate_rejects_bad_values() {
        for input in ["", "abc", "NaN", "inf", "-5", "0"] {
            assert!(
                matches!(parse_rate(input), Err(AppError::InvalidRate(_))),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_storage_key_strips_separators() {
        assert_eq!(storage_key("2025-08-30"), "20250830");
    }
}
