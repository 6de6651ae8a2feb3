//! Validity windows embedded in account signatures
//!
//! The first 24 hex characters of a signature (after an optional `0x`)
//! carry two 48-bit big-endian timestamps: `validUntil` in `[0, 12)` and
//! `validAfter` in `[12, 24)`. An all-zero prefix means "no window".

use chrono::{DateTime, Months, Utc};
use kairos_primitives::{strip_hex_prefix, Timestamp};
use kairos_types::ValidityWindow;

use crate::error::{WindowError, WindowResult};

/// Hex characters holding the window
pub const WINDOW_HEX_LEN: usize = 24;

const FIELD_HEX_LEN: usize = 12;

/// Fallback cap when `now` is outside chrono's calendar range
const YEAR_SECS: u64 = 366 * 24 * 60 * 60;

/// Latest `validUntil` accepted at `now`: same month and day, next year
///
/// Feb 29 clamps to Feb 28.
pub fn one_year_after(now: Timestamp) -> Timestamp {
    i64::try_from(now)
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .and_then(|dt| dt.checked_add_months(Months::new(12)))
        .and_then(|dt| u64::try_from(dt.timestamp()).ok())
        .unwrap_or_else(|| now.saturating_add(YEAR_SECS))
}

/// Parse and validate the window carried by `signature` at time `now`
///
/// Checks run in order: expiry, the one-year cap, then bound ordering.
pub fn extract(signature: &str, now: Timestamp) -> WindowResult<Option<ValidityWindow>> {
    let digits = strip_hex_prefix(signature);
    if digits.len() < WINDOW_HEX_LEN {
        return Err(WindowError::MalformedInput(format!(
            "signature is too short: {} hex characters, need {WINDOW_HEX_LEN}",
            digits.len()
        )));
    }
    let prefix = digits
        .get(..WINDOW_HEX_LEN)
        .filter(|p| p.bytes().all(|b| b.is_ascii_hexdigit()))
        .ok_or_else(|| WindowError::MalformedInput("window prefix is not hex".to_string()))?;

    if prefix.bytes().all(|b| b == b'0') {
        return Ok(None);
    }

    let valid_until = parse_field(&prefix[..FIELD_HEX_LEN])?;
    let valid_after = parse_field(&prefix[FIELD_HEX_LEN..])?;

    if valid_until < now {
        return Err(WindowError::Expired { valid_until, now });
    }
    let limit = one_year_after(now);
    if valid_until > limit {
        return Err(WindowError::WindowTooLong { valid_until, limit });
    }
    if valid_until <= valid_after {
        return Err(WindowError::InvertedWindow {
            valid_after,
            valid_until,
        });
    }

    Ok(Some(ValidityWindow {
        valid_after,
        valid_until,
    }))
}

/// Whether `now` falls inside `window`; an absent window never matches
pub fn is_within_window(window: Option<&ValidityWindow>, now: Timestamp) -> bool {
    window.is_some_and(|w| w.contains(now))
}

/// Encode a window as the 24-character signature prefix
pub fn encode_prefix(valid_after: Timestamp, valid_until: Timestamp) -> String {
    format!("{valid_until:012x}{valid_after:012x}")
}

fn parse_field(field: &str) -> WindowResult<Timestamp> {
    u64::from_str_radix(field, 16)
        .map_err(|e| WindowError::MalformedInput(format!("bad window field {field:?}: {e}")))
}
