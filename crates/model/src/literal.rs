//! Partial-precision date and arbitrary-precision decimal literals.
//!
//! FHIR requires the textual form of dates and decimals to survive storage
//! unchanged, while searches need comparable bounds. Both literal kinds keep
//! the original text and derive an inclusive/exclusive `[low, high)` range
//! from the stated precision.

use chrono::{DateTime, Days, FixedOffset, Local, Months, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::error::{ModelError, ModelResult};

/// Precision of a parsed date or dateTime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DatePrecision {
    Year,
    Month,
    Day,
    Minute,
    Second,
    Millisecond,
}

/// A FHIR `date` or `dateTime` with its original text and precision range.
#[derive(Debug, Clone)]
pub struct DateLiteral {
    text: String,
    low: DateTime<Utc>,
    high: DateTime<Utc>,
}

impl DateLiteral {
    /// Parses a FHIR date/dateTime. When no timezone is given the server's
    /// local offset applies.
    pub fn parse(text: &str) -> ModelResult<DateLiteral> {
        let bad = || ModelError::InvalidDate {
            kind: "date",
            path: String::new(),
            value: text.to_string(),
        };

        let (date_part, time_part) = match text.split_once('T') {
            Some((d, t)) => (d, Some(t)),
            None => (text, None),
        };

        let mut date_fields = date_part.split('-');
        let year: i32 = date_fields.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;
        let month: Option<u32> = date_fields
            .next()
            .map(|m| m.parse().map_err(|_| bad()))
            .transpose()?;
        let day: Option<u32> = date_fields
            .next()
            .map(|d| d.parse().map_err(|_| bad()))
            .transpose()?;
        if date_fields.next().is_some() {
            return Err(bad());
        }

        let naive_date = NaiveDate::from_ymd_opt(year, month.unwrap_or(1), day.unwrap_or(1))
            .ok_or_else(bad)?;

        let mut precision = match (month, day) {
            (None, _) => DatePrecision::Year,
            (Some(_), None) => DatePrecision::Month,
            (Some(_), Some(_)) => DatePrecision::Day,
        };

        let mut naive_time = NaiveTime::from_hms_opt(0, 0, 0).unwrap();
        let mut offset: Option<FixedOffset> = None;

        if let Some(time_text) = time_part {
            if precision != DatePrecision::Day {
                return Err(bad());
            }

            // split a trailing timezone designator off the clock part
            let (clock, tz) = if let Some(stripped) = time_text.strip_suffix('Z') {
                (stripped, Some("Z".to_string()))
            } else if let Some(pos) = time_text.rfind(['+', '-']).filter(|p| *p >= 5) {
                (&time_text[..pos], Some(time_text[pos..].to_string()))
            } else {
                (time_text, None)
            };

            if let Some(tz) = tz {
                offset = Some(parse_offset(&tz).ok_or_else(bad)?);
            }

            let mut clock_fields = clock.split(':');
            let hour: u32 = clock_fields.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;
            let minute: u32 = clock_fields.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;
            precision = DatePrecision::Minute;

            let mut second = 0u32;
            let mut millis = 0u32;
            if let Some(sec_text) = clock_fields.next() {
                precision = DatePrecision::Second;
                let (whole, frac) = match sec_text.split_once('.') {
                    Some((w, f)) => (w, Some(f)),
                    None => (sec_text, None),
                };
                second = whole.parse().map_err(|_| bad())?;
                if let Some(frac) = frac {
                    precision = DatePrecision::Millisecond;
                    let padded = format!("{frac:0<3}");
                    millis = padded[..3].parse().map_err(|_| bad())?;
                }
            }
            if clock_fields.next().is_some() {
                return Err(bad());
            }

            naive_time = NaiveTime::from_hms_milli_opt(hour, minute, second, millis)
                .ok_or_else(bad)?;
        }

        let naive = naive_date.and_time(naive_time);
        let low: DateTime<Utc> = match offset {
            Some(offset) => offset
                .from_local_datetime(&naive)
                .single()
                .ok_or_else(bad)?
                .with_timezone(&Utc),
            None => Local
                .from_local_datetime(&naive)
                .earliest()
                .ok_or_else(bad)?
                .with_timezone(&Utc),
        };

        let high = match precision {
            DatePrecision::Year => low + Months::new(12),
            DatePrecision::Month => low + Months::new(1),
            DatePrecision::Day => low + Days::new(1),
            DatePrecision::Minute => low + chrono::Duration::minutes(1),
            DatePrecision::Second => low + chrono::Duration::seconds(1),
            DatePrecision::Millisecond => low + chrono::Duration::milliseconds(1),
        };

        Ok(DateLiteral {
            text: text.to_string(),
            low,
            high,
        })
    }

    /// Original text, stored as `__strDate`.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Inclusive lower bound of the precision interval.
    pub fn range_low_incl(&self) -> DateTime<Utc> {
        self.low
    }

    /// Exclusive upper bound of the precision interval.
    pub fn range_high_excl(&self) -> DateTime<Utc> {
        self.high
    }
}

fn parse_offset(tz: &str) -> Option<FixedOffset> {
    if tz == "Z" {
        return FixedOffset::east_opt(0);
    }
    let (sign, rest) = tz.split_at(1);
    let (hours, minutes) = rest.split_once(':')?;
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    let seconds = hours * 3600 + minutes * 60;
    match sign {
        "+" => FixedOffset::east_opt(seconds),
        "-" => FixedOffset::west_opt(seconds),
        _ => None,
    }
}

/// Parses a FHIR `instant` (full timestamp with mandatory timezone).
pub fn parse_instant(text: &str) -> ModelResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| ModelError::InvalidDate {
            kind: "instant",
            path: String::new(),
            value: text.to_string(),
        })
}

/// A FHIR decimal with its original digits and half-ulp precision range.
///
/// The range inflates the value by half of its least significant digit, so
/// `185` covers `[184.5, 185.5)` and `1.50` covers `[1.495, 1.505)`.
#[derive(Debug, Clone)]
pub struct NumberLiteral {
    text: String,
    value: f64,
    low: f64,
    high: f64,
}

impl NumberLiteral {
    pub fn parse(text: &str) -> ModelResult<NumberLiteral> {
        let value: f64 = text.parse().map_err(|_| ModelError::InvalidNumber {
            path: String::new(),
            value: text.to_string(),
        })?;

        let fraction_digits = match text.split_once('.') {
            Some((_, frac)) => frac
                .find(['e', 'E'])
                .map(|pos| &frac[..pos])
                .unwrap_or(frac)
                .len() as i32,
            None => 0,
        };
        let half = 0.5 * 10f64.powi(-fraction_digits);

        Ok(NumberLiteral {
            text: text.to_string(),
            value,
            low: value - half,
            high: value + half,
        })
    }

    /// Original digits, stored as `__strNum`.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Numeric approximation, stored as `__num`.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Inclusive lower bound of the half-ulp interval.
    pub fn range_low_incl(&self) -> f64 {
        self.low
    }

    /// Exclusive upper bound of the half-ulp interval.
    pub fn range_high_excl(&self) -> f64 {
        self.high
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn year_precision_range() {
        let lit = DateLiteral::parse("2012").unwrap();
        assert_eq!(lit.text(), "2012");
        let span = lit.range_high_excl() - lit.range_low_incl();
        assert_eq!(span.num_days(), 366); // 2012 is a leap year
    }

    #[test]
    fn day_precision_range() {
        let lit = DateLiteral::parse("2012-03-01").unwrap();
        let span = lit.range_high_excl() - lit.range_low_incl();
        assert_eq!(span.num_hours(), 24);
    }

    #[test]
    fn minute_precision_with_offset() {
        let lit = DateLiteral::parse("2012-03-01T07:00-05:00").unwrap();
        let expected = FixedOffset::west_opt(5 * 3600)
            .unwrap()
            .with_ymd_and_hms(2012, 3, 1, 7, 0, 0)
            .unwrap();
        assert_eq!(lit.range_low_incl(), expected);
        assert_eq!(lit.range_high_excl() - lit.range_low_incl(), chrono::Duration::minutes(1));
    }

    #[test]
    fn second_precision_with_zulu() {
        let lit = DateLiteral::parse("2012-03-01T07:00:30Z").unwrap();
        assert_eq!(
            lit.range_high_excl() - lit.range_low_incl(),
            chrono::Duration::seconds(1)
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(DateLiteral::parse("notadate").is_err());
        assert!(DateLiteral::parse("2012-13-01").is_err());
        assert!(parse_instant("2012-03-01").is_err());
    }

    #[test]
    fn integer_half_ulp() {
        let n = NumberLiteral::parse("185").unwrap();
        assert_eq!(n.range_low_incl(), 184.5);
        assert_eq!(n.range_high_excl(), 185.5);
        assert_eq!(n.value(), 185.0);
    }

    #[test]
    fn fractional_half_ulp() {
        let n = NumberLiteral::parse("1.5").unwrap();
        assert!((n.range_low_incl() - 1.45).abs() < 1e-9);
        assert!((n.range_high_excl() - 1.55).abs() < 1e-9);
    }

    #[test]
    fn text_is_preserved_exactly() {
        let n = NumberLiteral::parse("185.00").unwrap();
        assert_eq!(n.text(), "185.00");
    }
}
