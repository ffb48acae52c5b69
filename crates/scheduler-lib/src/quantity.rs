//! Kubernetes quantity parsing
//!
//! Converts resource quantities such as `500m`, `256Mi`, `2G` or `1e3` into
//! plain numbers in the base unit (cores for CPU, bytes for memory).

use crate::error::QuantityError;

const BINARY_SUFFIXES: &[(&str, f64)] = &[
    ("Ki", 1024.0),
    ("Mi", 1_048_576.0),
    ("Gi", 1_073_741_824.0),
    ("Ti", 1_099_511_627_776.0),
    ("Pi", 1_125_899_906_842_624.0),
    ("Ei", 1_152_921_504_606_846_976.0),
];

const DECIMAL_SUFFIXES: &[(&str, f64)] = &[
    ("n", 1e-9),
    ("u", 1e-6),
    ("m", 1e-3),
    ("", 1.0),
    ("k", 1e3),
    ("M", 1e6),
    ("G", 1e9),
    ("T", 1e12),
    ("P", 1e15),
    ("E", 1e18),
];

/// Parse a quantity string into its value in base units
pub fn parse_quantity(quantity: &str) -> Result<f64, QuantityError> {
    let quantity = quantity.trim();
    if quantity.is_empty() {
        return Err(QuantityError::Empty);
    }

    let number_end = quantity
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || (i == 0 && (c == '+' || c == '-'))))
        .map(|(i, _)| i)
        .unwrap_or(quantity.len());

    let (number, suffix) = quantity.split_at(number_end);
    let value: f64 = number
        .parse()
        .map_err(|_| QuantityError::MissingNumber(quantity.to_string()))?;

    Ok(value * multiplier(quantity, suffix)?)
}

fn multiplier(quantity: &str, suffix: &str) -> Result<f64, QuantityError> {
    if let Some(&(_, factor)) = BINARY_SUFFIXES
        .iter()
        .chain(DECIMAL_SUFFIXES)
        .find(|(s, _)| *s == suffix)
    {
        return Ok(factor);
    }

    // Decimal exponent form, e.g. `1e3` or `12E-2`. A bare `E` is exa and
    // was matched above.
    if let Some(exponent) = suffix.strip_prefix(['e', 'E']) {
        if let Ok(exponent) = exponent.parse::<i32>() {
            return Ok(10f64.powi(exponent));
        }
    }

    Err(QuantityError::UnknownSuffix {
        quantity: quantity.to_string(),
        suffix: suffix.to_string(),
    })
}
