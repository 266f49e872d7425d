//! Experiment validation utilities

use thiserror::Error;

/// Validation errors for experiment configuration
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExperimentValidationError {
    #[error("\"experiment-id\" attribute is required")]
    EmptyId,

    #[error("Unknown storage backend: '{0}'")]
    UnknownStorageBackend(String),
}

/// Validate an experiment ID.
///
/// Any non-empty string is accepted; the ID is opaque to the controller.
pub fn validate_experiment_id(id: &str) -> Result<(), ExperimentValidationError> {
    if id.is_empty() {
        return Err(ExperimentValidationError::EmptyId);
    }

    Ok(())
}

/// Clamp a selection weight into the valid range.
///
/// Negative, NaN and infinite weights all normalize to `0.0`.
pub fn normalize_weight(weight: f64) -> f64 {
    if weight.is_finite() && weight >= 0.0 {
        weight
    } else {
        0.0
    }
}

/// Parse a `weight` attribute value.
///
/// Reads the longest leading decimal number (so `"50px"` is `50`), the way
/// HTML attribute values are usually interpreted. Anything unparsable
/// normalizes to `0.0`.
pub fn parse_weight(raw: &str) -> f64 {
    let trimmed = raw.trim_start();
    let bytes = trimmed.as_bytes();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    let mut seen_exp = false;

    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
        end += 1;
    }

    let mut last_valid = 0;

    while end < bytes.len() {
        let b = bytes[end];

        if b.is_ascii_digit() {
            seen_digit = true;
            end += 1;
            last_valid = end;
        } else if b == b'.' && !seen_dot && !seen_exp {
            seen_dot = true;
            end += 1;
            if seen_digit {
                last_valid = end;
            }
        } else if (b == b'e' || b == b'E') && seen_digit && !seen_exp {
            // Only consume the exponent if at least one digit follows it.
            let mut probe = end + 1;
            if probe < bytes.len() && (bytes[probe] == b'+' || bytes[probe] == b'-') {
                probe += 1;
            }
            if probe < bytes.len() && bytes[probe].is_ascii_digit() {
                seen_exp = true;
                end = probe;
            } else {
                break;
            }
        } else {
            break;
        }
    }

    if !seen_digit {
        return 0.0;
    }

    trimmed[..last_valid]
        .parse::<f64>()
        .map(normalize_weight)
        .unwrap_or(0.0)
}
