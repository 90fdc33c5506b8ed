//! Utility functions for formatting and common operations
//!
//! Centralized formatting for the terminal output, so amounts and
//! percentages look the same in every table.

use rust_decimal::Decimal;

/// Currency symbol options for formatting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrencySymbol {
    /// Include "₹ " prefix (Indian Rupee)
    INR,
    /// No currency symbol (for table cells)
    None,
}

/// Group the integer digits the Indian way: last three, then pairs
fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }
    let (head, tail) = digits.split_at(digits.len() - 3);

    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();

    format!("{},{}", groups.join(","), tail)
}

/// Core formatting function with full control over output.
///
/// Formats a Decimal value using Indian digit grouping:
/// - Lakh/crore separators: `12,34,567`
/// - Decimal separator: `.` with two places (rounded)
///
/// # Arguments
/// * `value` - The decimal value to format
/// * `width` - Minimum width for padding (0 for no padding, right-aligned)
/// * `symbol` - Whether to include currency symbol
///
/// # Examples
/// ```
/// use tradecheck::utils::{format_currency_with_width, CurrencySymbol};
/// use rust_decimal_macros::dec;
///
/// assert_eq!(
///     format_currency_with_width(dec!(1234567.891), 0, CurrencySymbol::INR),
///     "₹ 12,34,567.89"
/// );
///
/// assert_eq!(
///     format_currency_with_width(dec!(1234), 12, CurrencySymbol::None),
///     "    1,234.00"
/// );
/// ```
pub fn format_currency_with_width(value: Decimal, width: usize, symbol: CurrencySymbol) -> String {
    let rounded = value.round_dp(2);
    let is_negative = rounded < Decimal::ZERO;

    let formatted = format!("{:.2}", rounded.abs());
    let (integer_part, decimal_part) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

    let sign = if is_negative { "-" } else { "" };
    let prefix = match symbol {
        CurrencySymbol::INR => "₹ ",
        CurrencySymbol::None => "",
    };

    let result = format!(
        "{}{}{}.{}",
        prefix,
        sign,
        group_indian(integer_part),
        decimal_part
    );

    let len = result.chars().count();
    if width > 0 && len < width {
        format!("{}{}", " ".repeat(width - len), result)
    } else {
        result
    }
}

// ============ Convenience functions ============

/// Format as rupees with symbol: "₹ 1,234.56"
///
/// # Examples
/// ```
/// use tradecheck::utils::format_currency;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_currency(dec!(1234.56)), "₹ 1,234.56");
/// assert_eq!(format_currency(dec!(-500)), "₹ -500.00");
/// ```
pub fn format_currency(value: Decimal) -> String {
    format_currency_with_width(value, 0, CurrencySymbol::INR)
}

/// Format number only (no symbol): "1,234.56"
pub fn format_amount(value: Decimal) -> String {
    format_currency_with_width(value, 0, CurrencySymbol::None)
}

/// Format a percentage, or a placeholder when it is undefined
///
/// # Examples
/// ```
/// use tradecheck::utils::format_percent;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_percent(Some(dec!(11.1111))), "11.11%");
/// assert_eq!(format_percent(None), "N/A");
/// ```
pub fn format_percent(value: Option<Decimal>) -> String {
    match value {
        Some(pct) => format!("{:.2}%", pct.round_dp(2)),
        None => "N/A".to_string(),
    }
}
