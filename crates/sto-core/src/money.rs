//! # Money Display
//!
//! Rendering of order amounts for the operator.
//!
//! ## Why f64 Here?
//! Line arithmetic runs on `f64` exactly as the order form has always done it,
//! and the ERP receives those same values. Rounding to kopecks happens **only**
//! in [`format_amount`]; the rounded value is never fed back into a total.
//!
//! ```text
//! 1450.0      ──► "1 450,00 ₽"
//! 0.125       ──► "0,13 ₽"        (half away from zero)
//! -2500.5     ──► "-2 500,50 ₽"
//! ```

/// Currency suffix shown after every amount.
pub const CURRENCY_SUFFIX: &str = "₽";

/// Formats an amount as rubles with kopecks: `1 450,00 ₽`.
///
/// ## Rules
/// - Rounded half away from zero to two decimals.
/// - Thousands are grouped with a space, decimals follow a comma.
/// - Non-finite input renders as zero.
///
/// ## Example
/// ```rust
/// use sto_core::money::format_amount;
///
/// assert_eq!(format_amount(1450.0), "1 450,00 ₽");
/// assert_eq!(format_amount(0.0), "0,00 ₽");
/// ```
pub fn format_amount(amount: f64) -> String {
    let kopecks = to_kopecks(amount);
    let negative = kopecks < 0;
    let kopecks = kopecks.unsigned_abs();

    let rubles = group_thousands(kopecks / 100);
    let sign = if negative { "-" } else { "" };

    format!("{sign}{rubles},{:02} {CURRENCY_SUFFIX}", kopecks % 100)
}

/// Rounds an amount to whole kopecks, half away from zero.
pub fn to_kopecks(amount: f64) -> i64 {
    if !amount.is_finite() {
        return 0;
    }
    // `as` saturates on overflow
    (amount * 100.0).round() as i64
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(' ');
        }
        out.push(ch);
    }
    out
}
