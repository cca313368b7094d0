//! Custom date format strings used in archive naming templates.
//!
//! Templates spell dates the way log configuration files usually do:
//! `yyyy-MM-dd`, `yyyyMMdd_HHmmss`, `dd.MM.yy 'at' HH-mm`. Formats are
//! compiled once into chrono strftime pieces and second fractions.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, TimeZone, Timelike};

/// Characters that may appear unquoted between date tokens.
const LITERAL_CHARS: &str = "-_.,+()[]# ";

/// Single letters that stand for themselves, as in `yyyy-MM-ddTHH-mm-ss`.
const LITERAL_LETTERS: &str = "TZ";

/// Characters that cannot be part of a file name on common platforms.
const FORBIDDEN_CHARS: &str = "/\\:*?\"<>|";

/// Longest supported run of `f` (nanosecond precision).
const MAX_FRACTION_DIGITS: usize = 9;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Strftime(String),
    /// Leading digits of the second fraction, truncated.
    Fraction(usize),
}

/// A validated date format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFormat {
    source: String,
    pieces: Vec<Piece>,
}

impl DateFormat {
    /// Compile a custom format such as `yyyy-MM-dd_HH-mm-ss`.
    ///
    /// Returns `None` when the format contains an unknown token, an
    /// unterminated quote or a character that is not allowed in file names.
    pub fn parse(source: &str) -> Option<Self> {
        if source.trim().is_empty() {
            return None;
        }

        let chars: Vec<char> = source.chars().collect();
        let mut pieces = Vec::new();
        let mut strftime = String::new();
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            if c == '\'' {
                let close = chars[i + 1..].iter().position(|&q| q == '\'')? + i + 1;
                for &literal in &chars[i + 1..close] {
                    push_literal(&mut strftime, literal)?;
                }
                i = close + 1;
                continue;
            }

            let run = chars[i..].iter().take_while(|&&next| next == c).count();
            if c == 'f' {
                if run > MAX_FRACTION_DIGITS {
                    return None;
                }
                flush(&mut pieces, &mut strftime)?;
                pieces.push(Piece::Fraction(run));
            } else if run == 1 && LITERAL_LETTERS.contains(c) {
                strftime.push(c);
            } else if c.is_ascii_alphabetic() {
                strftime.push_str(token(c, run)?);
            } else if c.is_ascii_digit() || LITERAL_CHARS.contains(c) {
                for _ in 0..run {
                    push_literal(&mut strftime, c)?;
                }
            } else {
                return None;
            }
            i += run;
        }
        flush(&mut pieces, &mut strftime)?;

        Some(Self {
            source: source.to_string(),
            pieces,
        })
    }

    /// The format as written in the template.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn format<Tz>(&self, at: &DateTime<Tz>) -> String
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let mut out = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Strftime(spec) => out.push_str(&at.format(spec).to_string()),
                Piece::Fraction(digits) => {
                    // Leap seconds report nanoseconds past 1_000_000_000.
                    let nanos = format!("{:09}", at.nanosecond() % 1_000_000_000);
                    out.push_str(&nanos[..*digits]);
                }
            }
        }
        out
    }
}

/// Move the pending strftime text into `pieces` after checking it.
fn flush(pieces: &mut Vec<Piece>, strftime: &mut String) -> Option<()> {
    if strftime.is_empty() {
        return Some(());
    }
    if StrftimeItems::new(strftime).any(|item| matches!(item, Item::Error)) {
        return None;
    }
    pieces.push(Piece::Strftime(std::mem::take(strftime)));
    Some(())
}

fn push_literal(out: &mut String, c: char) -> Option<()> {
    if FORBIDDEN_CHARS.contains(c) || c.is_control() {
        return None;
    }
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
    Some(())
}

fn token(c: char, run: usize) -> Option<&'static str> {
    let spec = match (c, run) {
        ('y', 4) => "%Y",
        ('y', 2) => "%y",
        ('M', 1) => "%-m",
        ('M', 2) => "%m",
        ('M', 3) => "%b",
        ('M', 4) => "%B",
        ('d', 1) => "%-d",
        ('d', 2) => "%d",
        ('d', 3) => "%a",
        ('d', 4) => "%A",
        ('H', 1) => "%-H",
        ('H', 2) => "%H",
        ('h', 1) => "%-I",
        ('h', 2) => "%I",
        ('m', 1) => "%-M",
        ('m', 2) => "%M",
        ('s', 1) => "%-S",
        ('s', 2) => "%S",
        ('t', 2) => "%p",
        _ => return None,
    };
    Some(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample() -> DateTime<chrono::Utc> {
        NaiveDate::from_ymd_opt(2024, 3, 7)
            .unwrap()
            .and_hms_milli_opt(14, 5, 9, 42)
            .unwrap()
            .and_utc()
    }

    #[test]
    fn test_common_formats() {
        let cases = [
            ("yyyy-MM-dd", "2024-03-07"),
            ("yyyyMMdd_HHmmss", "20240307_140509"),
            ("yyyy-MM-dd_HH-mm-ss", "2024-03-07_14-05-09"),
            ("dd.MM.yy", "07.03.24"),
            ("yyyy-M-d H", "2024-3-7 14"),
            ("hh-mm tt", "02-05 PM"),
            ("HHmmss.fff", "140509.042"),
            ("yyyy-MM-ddTHH-mm-ss", "2024-03-07T14-05-09"),
            ("yyyy-MM-dd_HH-mm-ssZ", "2024-03-07_14-05-09Z"),
        ];
        for (source, expected) in cases {
            let format = DateFormat::parse(source).unwrap();
            assert_eq!(format.format(&sample()), expected, "format {source}");
        }
    }

    #[test]
    fn test_quoted_literals() {
        let format = DateFormat::parse("yyyy 'week' MM").unwrap();
        assert_eq!(format.format(&sample()), "2024 week 03");

        let format = DateFormat::parse("'100%' yyyy").unwrap();
        assert_eq!(format.format(&sample()), "100% 2024");
    }

    #[test]
    fn test_invalid_formats() {
        for source in ["", "  ", "yyy", "qq", "HH:mm", "yyyy/MM", "'open", "TT", "ffffffffff"] {
            assert!(DateFormat::parse(source).is_none(), "{source:?} should be invalid");
        }
    }

    #[test]
    fn test_source_is_preserved() {
        let format = DateFormat::parse("yyyy-MM").unwrap();
        assert_eq!(format.source(), "yyyy-MM");
        assert_eq!(format.format(&sample()), "2024-03");
    }

    #[test]
    fn test_fraction_runs_are_truncated() {
        let at = NaiveDate::from_ymd_opt(2024, 3, 7)
            .unwrap()
            .and_hms_nano_opt(14, 5, 9, 987_654_321)
            .unwrap()
            .and_utc();
        let cases = [
            ("HHmmss.f", "140509.9"),
            ("HHmmss.ff", "140509.98"),
            ("yyyy-MM-dd_HH-mm-ss.ffff", "2024-03-07_14-05-09.9876"),
            ("ss.fffffff", "09.9876543"),
            ("fffffffff", "987654321"),
        ];
        for (source, expected) in cases {
            let format = DateFormat::parse(source).unwrap();
            assert_eq!(format.format(&at), expected, "format {source}");
        }
    }

    #[test]
    fn test_fraction_keeps_leading_zeros() {
        let format = DateFormat::parse("ss.ff").unwrap();
        assert_eq!(format.format(&sample()), "09.04");
    }
}
