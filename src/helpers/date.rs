//! Date helper functions
//!
//! Timestamps from the CMS are rendered with date-fns style patterns
//! (`dd MMM yyyy`, quoted literals like `'às'`) and localized month and
//! weekday names.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, TimeZone, Timelike};
use chrono_tz::Tz;

/// Default display pattern for publication dates
pub const DEFAULT_DATE_FORMAT: &str = "dd MMM yyyy";

/// Pattern used for the "edited on" line of an article
pub const EDITED_DATE_FORMAT: &str = "'* editado em' dd MMM yyyy', às' HH:mm";

/// Errors raised while formatting a timestamp
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("invalid timestamp: {input:?}")]
    InvalidTimestamp { input: String },

    #[error("invalid date pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Month and weekday names for one locale
#[derive(Debug)]
pub struct Locale {
    pub code: &'static str,
    pub months_short: [&'static str; 12],
    pub months_long: [&'static str; 12],
    /// Sunday first
    pub weekdays_short: [&'static str; 7],
    pub weekdays_long: [&'static str; 7],
}

pub static PT_BR: Locale = Locale {
    code: "pt-BR",
    months_short: [
        "jan", "fev", "mar", "abr", "mai", "jun", "jul", "ago", "set", "out", "nov", "dez",
    ],
    months_long: [
        "janeiro",
        "fevereiro",
        "março",
        "abril",
        "maio",
        "junho",
        "julho",
        "agosto",
        "setembro",
        "outubro",
        "novembro",
        "dezembro",
    ],
    weekdays_short: ["dom", "seg", "ter", "qua", "qui", "sex", "sáb"],
    weekdays_long: [
        "domingo",
        "segunda-feira",
        "terça-feira",
        "quarta-feira",
        "quinta-feira",
        "sexta-feira",
        "sábado",
    ],
};

/// Formats CMS timestamps in a fixed timezone and locale
#[derive(Debug, Clone)]
pub struct DateFormatter {
    tz: Tz,
    locale: &'static Locale,
    default_pattern: String,
}

impl DateFormatter {
    pub fn new(tz: Tz, default_pattern: &str) -> Self {
        Self {
            tz,
            locale: &PT_BR,
            default_pattern: default_pattern.to_string(),
        }
    }

    pub fn locale(&self) -> &'static Locale {
        self.locale
    }

    /// Format a raw timestamp, falling back to the default pattern
    pub fn format(&self, input: &str, pattern: Option<&str>) -> Result<String, FormatError> {
        let date = parse_timestamp(input)?.with_timezone(&self.tz);
        render(&date, pattern.unwrap_or(&self.default_pattern), self.locale)
    }
}

impl Default for DateFormatter {
    fn default() -> Self {
        Self::new(Tz::UTC, DEFAULT_DATE_FORMAT)
    }
}

/// Format an ISO-8601 timestamp in the given timezone with the pt-BR locale
///
/// # Examples
/// ```ignore
/// format_date("2022-03-10T00:00:00Z", None, Tz::UTC) // -> "10 mar 2022"
/// ```
pub fn format_date(input: &str, pattern: Option<&str>, tz: Tz) -> Result<String, FormatError> {
    let date = parse_timestamp(input)?.with_timezone(&tz);
    render(&date, pattern.unwrap_or(DEFAULT_DATE_FORMAT), &PT_BR)
}

/// Parse the timestamp shapes the CMS emits
///
/// Accepts RFC 3339, offsets without a colon (`+0000`) and bare dates,
/// which are taken as midnight UTC.
pub fn parse_timestamp(input: &str) -> Result<DateTime<FixedOffset>, FormatError> {
    let trimmed = input.trim();

    if let Ok(date) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(date);
    }
    if let Ok(date) = DateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Ok(date);
    }
    if let Ok(day) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(midnight) = day.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc().fixed_offset());
        }
    }

    Err(invalid_timestamp(input))
}

fn invalid_timestamp(input: &str) -> FormatError {
    FormatError::InvalidTimestamp {
        input: input.to_string(),
    }
}

#[derive(Debug, PartialEq)]
enum Token {
    Literal(String),
    Field(char, usize),
}

/// Split a date-fns pattern into literal text and field tokens
fn tokenize(pattern: &str) -> Result<Vec<Token>, FormatError> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars().peekable();
    let mut literal = String::new();

    while let Some(c) = chars.next() {
        if c == '\'' {
            // '' is an escaped quote, anywhere
            if chars.peek() == Some(&'\'') {
                chars.next();
                literal.push('\'');
                continue;
            }

            let mut closed = false;
            while let Some(q) = chars.next() {
                if q == '\'' {
                    if chars.peek() == Some(&'\'') {
                        chars.next();
                        literal.push('\'');
                        continue;
                    }
                    closed = true;
                    break;
                }
                literal.push(q);
            }
            if !closed {
                return Err(FormatError::InvalidPattern {
                    pattern: pattern.to_string(),
                    reason: "unterminated quoted literal".to_string(),
                });
            }
        } else if c.is_ascii_alphabetic() {
            if !literal.is_empty() {
                tokens.push(Token::Literal(std::mem::take(&mut literal)));
            }
            let mut count = 1;
            while chars.peek() == Some(&c) {
                chars.next();
                count += 1;
            }
            tokens.push(Token::Field(c, count));
        } else {
            literal.push(c);
        }
    }

    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }

    Ok(tokens)
}

fn render<Z: TimeZone>(
    date: &DateTime<Z>,
    pattern: &str,
    locale: &Locale,
) -> Result<String, FormatError> {
    let mut out = String::new();

    for token in tokenize(pattern)? {
        match token {
            Token::Literal(text) => out.push_str(&text),
            Token::Field(field, count) => {
                let rendered = render_field(date, field, count, locale).ok_or_else(|| {
                    FormatError::InvalidPattern {
                        pattern: pattern.to_string(),
                        reason: format!("unsupported token `{}`", field.to_string().repeat(count)),
                    }
                })?;
                out.push_str(&rendered);
            }
        }
    }

    Ok(out)
}

fn render_field<Z: TimeZone>(
    date: &DateTime<Z>,
    field: char,
    count: usize,
    locale: &Locale,
) -> Option<String> {
    let month = date.month0() as usize;
    let weekday = date.weekday().num_days_from_sunday() as usize;

    let text = match (field, count) {
        ('y', 2) => format!("{:02}", date.year().rem_euclid(100)),
        ('y', n) => format!("{:0width$}", date.year(), width = n),
        ('M', 1) => date.month().to_string(),
        ('M', 2) => format!("{:02}", date.month()),
        ('M', 3) => locale.months_short[month].to_string(),
        ('M', 4) => locale.months_long[month].to_string(),
        ('d', 1) => date.day().to_string(),
        ('d', 2) => format!("{:02}", date.day()),
        ('E', 1..=3) => locale.weekdays_short[weekday].to_string(),
        ('E', 4) => locale.weekdays_long[weekday].to_string(),
        ('H', 1) => date.hour().to_string(),
        ('H', 2) => format!("{:02}", date.hour()),
        ('h', 1) => date.hour12().1.to_string(),
        ('h', 2) => format!("{:02}", date.hour12().1),
        ('m', 1) => date.minute().to_string(),
        ('m', 2) => format!("{:02}", date.minute()),
        ('s', 1) => date.second().to_string(),
        ('s', 2) => format!("{:02}", date.second()),
        ('a', 1..=3) => {
            if date.hour12().0 {
                "PM".to_string()
            } else {
                "AM".to_string()
            }
        }
        _ => return None,
    };

    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_date_default_pattern() {
        let formatted = format_date("2022-03-10T00:00:00Z", None, Tz::UTC).unwrap();
        assert_eq!(formatted, "10 mar 2022");
    }

    #[test]
    fn test_format_date_edited_pattern() {
        let formatted =
            format_date("2021-03-25T19:25:28+0000", Some(EDITED_DATE_FORMAT), Tz::UTC).unwrap();
        assert_eq!(formatted, "* editado em 25 mar 2021, às 19:25");
    }

    #[test]
    fn test_format_date_in_timezone() {
        let formatted = format_date(
            "2021-03-25T01:10:00+0000",
            None,
            chrono_tz::America::Sao_Paulo,
        )
        .unwrap();
        assert_eq!(formatted, "24 mar 2021");
    }

    #[test]
    fn test_long_names() {
        let formatted = format_date("2021-04-19T12:00:00Z", Some("EEEE, d 'de' MMMM"), Tz::UTC);
        assert_eq!(formatted.unwrap(), "segunda-feira, 19 de abril");
    }

    #[test]
    fn test_malformed_timestamp() {
        let err = format_date("not a date", None, Tz::UTC).unwrap_err();
        assert_eq!(
            err,
            FormatError::InvalidTimestamp {
                input: "not a date".to_string()
            }
        );
        assert!(format_date("", None, Tz::UTC).is_err());
    }

    #[test]
    fn test_unsupported_token() {
        let err = format_date("2022-03-10T00:00:00Z", Some("dd QQQ"), Tz::UTC).unwrap_err();
        assert!(matches!(err, FormatError::InvalidPattern { .. }));
    }

    #[test]
    fn test_tokenize_quotes() {
        assert_eq!(
            tokenize("'d''x' yy").unwrap(),
            vec![Token::Literal("d'x ".to_string()), Token::Field('y', 2)]
        );
        assert!(tokenize("'open").is_err());
    }

    #[test]
    fn test_parse_bare_date() {
        let date = parse_timestamp("2020-01-02").unwrap();
        assert_eq!(date.day(), 2);
        assert_eq!(date.hour(), 0);
    }
}
