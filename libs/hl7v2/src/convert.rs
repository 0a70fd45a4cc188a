//! Typed views over element values.
//!
//! HL7 v2 carries everything as delimited text; this module reads and
//! writes the common lexical forms: integers, decimals (`.` separator),
//! dates (`YYYYMMDD`, with `YYYY` and `YYYYMM` accepted leniently),
//! date-times (`YYYYMMDDHHMMSS` down to any truncation, optional
//! fractional seconds and timezone offset), `Y`/`N` flags, and escaped
//! text. Lax getters yield the neutral value on anything unparseable or
//! absent: zero for the numeric views, `None` for the optional ones.
//! The strict `try_` variants report a
//! [`ConversionFailure`](crate::Error) with the offending text.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

use crate::element::Element;
use crate::error::{Error, Result};

/// A typed converter bound to one element.
pub struct Converter<'a> {
    element: &'a dyn Element,
}

impl<'a> Converter<'a> {
    pub fn new(element: &'a dyn Element) -> Self {
        Self { element }
    }

    fn raw(&self) -> Option<String> {
        self.element.value()
    }

    fn required(&self) -> Result<String> {
        self.raw()
            .ok_or_else(|| Error::ConversionFailure("element has no value".into()))
    }

    /// Numeric views are never absent: anything unparseable reads as
    /// zero.
    pub fn int(&self) -> i64 {
        self.raw()
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(0)
    }

    pub fn try_int(&self) -> Result<i64> {
        let raw = self.required()?;
        raw.trim()
            .parse()
            .map_err(|_| Error::ConversionFailure(format!("not an integer: {raw:?}")))
    }

    pub fn set_int(&self, value: i64) -> Result<()> {
        self.element.set_value(&value.to_string())
    }

    pub fn decimal(&self) -> Decimal {
        self.raw()
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(Decimal::ZERO)
    }

    pub fn try_decimal(&self) -> Result<Decimal> {
        let raw = self.required()?;
        raw.trim()
            .parse()
            .map_err(|_| Error::ConversionFailure(format!("not a decimal: {raw:?}")))
    }

    pub fn set_decimal(&self, value: Decimal) -> Result<()> {
        self.element.set_value(&value.to_string())
    }

    pub fn date(&self) -> Option<NaiveDate> {
        parse_date(self.raw()?.trim())
    }

    pub fn try_date(&self) -> Result<NaiveDate> {
        let raw = self.required()?;
        parse_date(raw.trim())
            .ok_or_else(|| Error::ConversionFailure(format!("not a date: {raw:?}")))
    }

    pub fn set_date(&self, value: NaiveDate) -> Result<()> {
        self.element.set_value(&value.format("%Y%m%d").to_string())
    }

    pub fn datetime(&self) -> Option<NaiveDateTime> {
        parse_datetime(self.raw()?.trim())
    }

    pub fn try_datetime(&self) -> Result<NaiveDateTime> {
        let raw = self.required()?;
        parse_datetime(raw.trim())
            .ok_or_else(|| Error::ConversionFailure(format!("not a date-time: {raw:?}")))
    }

    pub fn set_datetime(&self, value: NaiveDateTime) -> Result<()> {
        self.element
            .set_value(&value.format("%Y%m%d%H%M%S").to_string())
    }

    /// The decoded text: the element's value with escape sequences
    /// resolved.
    pub fn text(&self) -> Option<String> {
        let raw = self.raw()?;
        Some(self.element.unescape(&raw))
    }

    /// Assign text, escaping literal delimiters on the way in.
    pub fn set_text(&self, value: &str) -> Result<()> {
        let escaped = self.element.escape(value);
        self.element.set_value(&escaped)
    }

    /// An HL7 `Y`/`N` flag.
    pub fn flag(&self) -> Option<bool> {
        parse_flag(self.raw()?.trim())
    }

    pub fn try_flag(&self) -> Result<bool> {
        let raw = self.required()?;
        parse_flag(raw.trim())
            .ok_or_else(|| Error::ConversionFailure(format!("not a Y/N flag: {raw:?}")))
    }

    pub fn set_flag(&self, value: bool) -> Result<()> {
        self.element.set_value(if value { "Y" } else { "N" })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value {
        "Y" | "y" => Some(true),
        "N" | "n" => Some(false),
        _ => None,
    }
}

/// Lenient `YYYY[MM[DD]]` parsing. Unspecified month and day fill with 1.
fn parse_date(value: &str) -> Option<NaiveDate> {
    if !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match value.len() {
        4 => NaiveDate::parse_from_str(&format!("{value}0101"), "%Y%m%d").ok(),
        6 => NaiveDate::parse_from_str(&format!("{value}01"), "%Y%m%d").ok(),
        8 => NaiveDate::parse_from_str(value, "%Y%m%d").ok(),
        _ => None,
    }
}

/// Lenient HL7 `TS` parsing: a date part, optional time digits, an
/// optional fractional part, and an optional `±HHMM` offset. The offset
/// and fraction are accepted and discarded; the result is naive.
fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value
        .find(['+', '-'])
        .map(|at| &value[..at])
        .unwrap_or(value);
    let trimmed = trimmed
        .split_once('.')
        .map(|(whole, _)| whole)
        .unwrap_or(trimmed);
    if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if trimmed.len() <= 8 {
        return parse_date(trimmed).and_then(|date| date.and_hms_opt(0, 0, 0));
    }
    let (date_part, time_part) = trimmed.split_at(8);
    let date = parse_date(date_part)?;
    if !matches!(time_part.len(), 2 | 4 | 6) {
        return None;
    }
    let pair = |at: usize| -> u32 {
        time_part
            .get(at..at + 2)
            .and_then(|digits| digits.parse().ok())
            .unwrap_or(0)
    };
    let time = NaiveTime::from_hms_opt(pair(0), pair(2), pair(4))?;
    Some(date.and_time(time))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_lenient_lengths() {
        assert_eq!(parse_date("1987"), NaiveDate::from_ymd_opt(1987, 1, 1));
        assert_eq!(parse_date("198706"), NaiveDate::from_ymd_opt(1987, 6, 1));
        assert_eq!(parse_date("19870612"), NaiveDate::from_ymd_opt(1987, 6, 12));
        assert_eq!(parse_date("1987061"), None);
        assert_eq!(parse_date("19871306"), None);
        assert_eq!(parse_date("nonsense"), None);
    }

    #[test]
    fn test_parse_datetime_truncations() {
        let full = parse_datetime("19870612083045").unwrap();
        assert_eq!(
            full,
            NaiveDate::from_ymd_opt(1987, 6, 12)
                .unwrap()
                .and_hms_opt(8, 30, 45)
                .unwrap()
        );
        assert_eq!(
            parse_datetime("198706120830").unwrap(),
            NaiveDate::from_ymd_opt(1987, 6, 12)
                .unwrap()
                .and_hms_opt(8, 30, 0)
                .unwrap()
        );
        assert_eq!(
            parse_datetime("19870612").unwrap(),
            NaiveDate::from_ymd_opt(1987, 6, 12)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_parse_datetime_fraction_and_offset() {
        assert_eq!(
            parse_datetime("19870612083045.1234"),
            parse_datetime("19870612083045")
        );
        assert_eq!(
            parse_datetime("19870612083045-0500"),
            parse_datetime("19870612083045")
        );
        assert_eq!(parse_datetime("19870612083099"), None);
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("Y"), Some(true));
        assert_eq!(parse_flag("n"), Some(false));
        assert_eq!(parse_flag("yes"), None);
    }
}
