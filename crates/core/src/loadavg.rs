//! Load-average text parsing.
//!
//! Input is the single line found in `/proc/loadavg`, e.g.
//! `1.01 0.97 0.94 1/159 2795695`. The first three fields are the 1, 5 and
//! 15 minute load figures; trailing fields are tolerated and ignored.

use crate::error::CoreError;

/// Minimum number of whitespace-separated fields for a well-formed line.
const MIN_FIELDS: usize = 4;

/// Number of leading fields that carry load figures.
const LOAD_FIELDS: usize = 3;

/// Parse load-average text into `[1min, 5min, 15min]`.
///
/// Fails with [`CoreError::MalformedSignal`] if the line has fewer than four
/// fields or any of the first three is not a finite number.
pub fn parse_load_average(text: &str) -> Result<Vec<f64>, CoreError> {
    let fields: Vec<&str> = text.split_whitespace().collect();
    if fields.len() < MIN_FIELDS {
        return Err(CoreError::MalformedSignal(format!(
            "load average needs at least {MIN_FIELDS} fields, got {}",
            fields.len()
        )));
    }

    fields
        .iter()
        .take(LOAD_FIELDS)
        .map(|field| {
            field
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| {
                    CoreError::MalformedSignal(format!(
                        "load average field `{field}` is not a number"
                    ))
                })
        })
        .collect()
}
