//! Implicit-precision uncertainties.
//!
//! When a dataset quotes a value without an explicit uncertainty, the number
//! of digits it was written with still says something about how well it is
//! known. The convention used here is five units in the last written decimal
//! place:
//!
//! | text       | uncertainty |
//! |------------|-------------|
//! | `1400`     | 5           |
//! | `1400.5`   | 0.5         |
//! | `1400.52`  | 0.05        |
//! | `2E3`      | 5000        |
//! | `2.00E3`   | 50          |
//! | `1.5e+02`  | 50          |

/// Infer a symmetric uncertainty from the way `text` was written.
///
/// This looks only at the character pattern: it never fails, and text that
/// is not a number at all is treated like an integer.
pub fn infer_uncertainty(text: &str) -> f64 {
    let text = text.trim();
    let (mantissa, exponent) = split_exponent(text);
    5.0 * 10f64.powi(exponent.saturating_sub(decimal_places(mantissa)))
}

/// Split `"1.5e+02"` into `("1.5", 2)`. A malformed exponent counts as 0.
fn split_exponent(text: &str) -> (&str, i32) {
    match text.find(['e', 'E']) {
        Some(pos) => {
            let exp_text = text[pos + 1..].trim_start_matches('+');
            let exponent = exp_text.parse::<i32>().unwrap_or(0);
            (&text[..pos], exponent)
        }
        None => (text, 0),
    }
}

/// Count digits after the decimal point.
fn decimal_places(mantissa: &str) -> i32 {
    match mantissa.split_once('.') {
        Some((_, frac)) => {
            let digits = frac.chars().filter(|c| c.is_ascii_digit()).count();
            i32::try_from(digits).unwrap_or(i32::MAX)
        }
        None => 0,
    }
}
