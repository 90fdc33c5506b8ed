// Cell value coercion shared by both source parsers

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::models::CellValue;

static CURRENCY_MARKERS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(₹|\$|€|£|\brs\.?|\binr\b|\busd\b)").expect("currency regex is valid")
});

/// Parse a numeric cell, tolerating currency symbols and thousands separators
///
/// `Ok(None)` means the cell is empty; `Err` carries a human-readable reason.
pub fn parse_decimal(cell: &CellValue) -> Result<Option<Decimal>, String> {
    match cell {
        CellValue::Empty => Ok(None),
        CellValue::Number(n) => Decimal::from_f64(*n)
            .map(Some)
            .ok_or_else(|| "is not a finite number".to_string()),
        CellValue::Text(text) => parse_decimal_text(text),
    }
}

fn parse_decimal_text(text: &str) -> Result<Option<Decimal>, String> {
    let mut s = text.trim().replace('\u{2212}', "-");
    if s.is_empty() || s == "-" || s == "--" {
        return Ok(None);
    }

    // Accounting negatives: (1,234.50)
    let mut negative = false;
    if s.starts_with('(') && s.ends_with(')') && s.len() > 2 {
        negative = true;
        s = s[1..s.len() - 1].to_string();
    }

    let cleaned: String = CURRENCY_MARKERS
        .replace_all(&s, "")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',' && *c != '_' && *c != '%')
        .collect();

    if cleaned.is_empty() {
        return Err("is not a number".to_string());
    }

    let value = Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .map_err(|_| "is not a number".to_string())?;

    Ok(Some(if negative { -value } else { value }))
}

const DATETIME_FORMATS: [&str; 7] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d", "%d %b %Y"];

/// Parse a trade timestamp from text or a spreadsheet serial number
pub fn parse_timestamp(cell: &CellValue) -> Result<NaiveDateTime, String> {
    match cell {
        CellValue::Empty => Err("is empty".to_string()),
        CellValue::Number(serial) => excel_serial_to_datetime(*serial),
        CellValue::Text(text) => {
            let text = text.trim();

            if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
                return Ok(dt.naive_local());
            }
            // Fractional seconds from platform exports
            if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f") {
                return Ok(dt);
            }
            for format in DATETIME_FORMATS {
                if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
                    return Ok(dt);
                }
            }
            for format in DATE_FORMATS {
                if let Ok(date) = NaiveDate::parse_from_str(text, format) {
                    return Ok(date.and_time(NaiveTime::MIN));
                }
            }
            // CSV round-trips of spreadsheet dates sometimes keep the serial
            if let Ok(serial) = text.parse::<f64>() {
                return excel_serial_to_datetime(serial);
            }

            Err("is not a recognized date/time".to_string())
        }
    }
}

fn excel_serial_to_datetime(serial: f64) -> Result<NaiveDateTime, String> {
    if !serial.is_finite() || serial < 1.0 {
        return Err("is not a valid spreadsheet date".to_string());
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)
        .ok_or_else(|| "invalid spreadsheet epoch".to_string())?
        .and_time(NaiveTime::MIN);
    let millis = (serial * 86_400_000.0).round() as i64;
    epoch
        .checked_add_signed(Duration::milliseconds(millis))
        .ok_or_else(|| "is out of range".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn test_parse_decimal_plain_and_separators() {
        assert_eq!(parse_decimal(&text("1,234.56")).unwrap(), Some(dec!(1234.56)));
        assert_eq!(parse_decimal(&text("12,34,567.5")).unwrap(), Some(dec!(1234567.5)));
        assert_eq!(parse_decimal(&text("-200")).unwrap(), Some(dec!(-200)));
    }

    #[test]
    fn test_parse_decimal_currency_symbols() {
        assert_eq!(parse_decimal(&text("₹ 10,500.25")).unwrap(), Some(dec!(10500.25)));
        assert_eq!(parse_decimal(&text("Rs. 99")).unwrap(), Some(dec!(99)));
        assert_eq!(parse_decimal(&text("$1,000")).unwrap(), Some(dec!(1000)));
        assert_eq!(parse_decimal(&text("INR 7.5")).unwrap(), Some(dec!(7.5)));
    }

    #[test]
    fn test_parse_decimal_accounting_negative_and_unicode_minus() {
        assert_eq!(parse_decimal(&text("(1,234.50)")).unwrap(), Some(dec!(-1234.50)));
        assert_eq!(parse_decimal(&text("\u{2212}42")).unwrap(), Some(dec!(-42)));
    }

    #[test]
    fn test_parse_decimal_percent_suffix() {
        assert_eq!(parse_decimal(&text("12.5%")).unwrap(), Some(dec!(12.5)));
    }

    #[test]
    fn test_parse_decimal_empty_and_invalid() {
        assert_eq!(parse_decimal(&CellValue::Empty).unwrap(), None);
        assert_eq!(parse_decimal(&text(" - ")).unwrap(), None);
        assert!(parse_decimal(&text("abc")).is_err());
        assert!(parse_decimal(&text("₹")).is_err());
    }

    #[test]
    fn test_parse_decimal_from_number_cell() {
        assert_eq!(parse_decimal(&CellValue::Number(500.25)).unwrap(), Some(dec!(500.25)));
        assert!(parse_decimal(&CellValue::Number(f64::NAN)).is_err());
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        assert_eq!(parse_timestamp(&text("2024-03-15 09:30:00")).unwrap(), expected);
        assert_eq!(parse_timestamp(&text("2024-03-15T09:30:00")).unwrap(), expected);
        assert_eq!(parse_timestamp(&text("2024-03-15T09:30:00+05:30")).unwrap(), expected);
        assert_eq!(parse_timestamp(&text("15/03/2024 09:30")).unwrap(), expected);
        assert_eq!(
            parse_timestamp(&text("15/03/2024")).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap().and_time(NaiveTime::MIN)
        );
    }

    #[test]
    fn test_parse_timestamp_spreadsheet_serial() {
        // 45366.5 = 2024-03-15 12:00
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        assert_eq!(parse_timestamp(&CellValue::Number(45366.5)).unwrap(), expected);
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp(&text("yesterday")).is_err());
        assert!(parse_timestamp(&CellValue::Empty).is_err());
    }
}
