// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Date pattern suffixes such as `yyyy-MM-dd-HH-mm`.
//!
//! Patterns use `java.text.SimpleDateFormat` letters, since that is what
//! pipeline users write. Letters repeat to select width or text style;
//! text inside single quotes is literal and `''` is a quote. Times are
//! formatted in UTC.

use chrono::{DateTime, Datelike, Timelike, Utc};

use crate::error::{PluginError, Result};

const PATTERN_LETTERS: &str = "GyYMLwWDdFEuaHkKhmsSzZX";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Field { letter: char, count: usize },
}

/// A compiled date pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateSuffix {
    pattern: String,
    tokens: Vec<Token>,
}

impl DateSuffix {
    pub fn compile(pattern: &str) -> Result<Self> {
        let mut tokens = Vec::new();
        let mut literal = String::new();
        let mut chars = pattern.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '\'' {
                if chars.peek() == Some(&'\'') {
                    let _ = chars.next();
                    literal.push('\'');
                    continue;
                }
                let mut closed = false;
                while let Some(q) = chars.next() {
                    if q == '\'' {
                        if chars.peek() == Some(&'\'') {
                            let _ = chars.next();
                            literal.push('\'');
                        } else {
                            closed = true;
                            break;
                        }
                    } else {
                        literal.push(q);
                    }
                }
                if !closed {
                    return Err(PluginError::InvalidSuffix("Unterminated quote".to_string()));
                }
            } else if c.is_ascii_alphabetic() {
                if !PATTERN_LETTERS.contains(c) {
                    return Err(PluginError::InvalidSuffix(format!(
                        "Illegal pattern character '{}'",
                        c
                    )));
                }
                let mut count = 1;
                while chars.peek() == Some(&c) {
                    let _ = chars.next();
                    count += 1;
                }
                if !literal.is_empty() {
                    tokens.push(Token::Literal(std::mem::take(&mut literal)));
                }
                tokens.push(Token::Field { letter: c, count });
            } else {
                literal.push(c);
            }
        }
        if !literal.is_empty() {
            tokens.push(Token::Literal(literal));
        }

        Ok(Self {
            pattern: pattern.to_string(),
            tokens,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn format(&self, time: DateTime<Utc>) -> String {
        let mut out = String::new();
        for token in &self.tokens {
            match token {
                Token::Literal(text) => out.push_str(text),
                Token::Field { letter, count } => out.push_str(&field(*letter, *count, time)),
            }
        }
        out
    }
}

fn number(value: i64, width: usize) -> String {
    format!("{:0width$}", value, width = width)
}

fn year(value: i32, count: usize) -> String {
    if count == 2 {
        number(i64::from(value.rem_euclid(100)), 2)
    } else {
        number(i64::from(value), count)
    }
}

fn text(time: DateTime<Utc>, count: usize, full: &str, short: &str) -> String {
    let spec = if count >= 4 { full } else { short };
    time.format(spec).to_string()
}

fn field(letter: char, count: usize, time: DateTime<Utc>) -> String {
    let n = |value: u32| number(i64::from(value), count);
    match letter {
        'G' => (if time.year() > 0 { "AD" } else { "BC" }).to_string(),
        'y' => year(time.year(), count),
        'Y' => year(time.iso_week().year(), count),
        'M' | 'L' if count >= 3 => text(time, count, "%B", "%b"),
        'M' | 'L' => n(time.month()),
        'w' => n(time.iso_week().week()),
        'W' => {
            let first = time.with_day(1).unwrap_or(time);
            let offset = first.weekday().num_days_from_sunday();
            n((time.day() - 1 + offset) / 7 + 1)
        }
        'D' => n(time.ordinal()),
        'd' => n(time.day()),
        'F' => n((time.day() - 1) / 7 + 1),
        'E' => text(time, count, "%A", "%a"),
        'u' => n(time.weekday().number_from_monday()),
        'a' => (if time.hour() < 12 { "AM" } else { "PM" }).to_string(),
        'H' => n(time.hour()),
        'k' => n(if time.hour() == 0 { 24 } else { time.hour() }),
        'K' => n(time.hour() % 12),
        'h' => n(match time.hour() % 12 {
            0 => 12,
            h => h,
        }),
        'm' => n(time.minute()),
        's' => n(time.second()),
        'S' => n(time.timestamp_subsec_millis()),
        'z' if count >= 4 => "Coordinated Universal Time".to_string(),
        'z' => "UTC".to_string(),
        'Z' => "+0000".to_string(),
        'X' => "Z".to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_common_patterns() {
        let time = at(2015, 1, 1, 20, 42, 7);
        let format = |p: &str| DateSuffix::compile(p).unwrap().format(time);
        assert_eq!(format("yyyy-MM-dd-HH-mm"), "2015-01-01-20-42");
        assert_eq!(format("yy/M/d"), "15/1/1");
        assert_eq!(format("yyyyMMdd'T'HHmmss"), "20150101T204207");
        assert_eq!(format("EEE, MMM d hh:mm a"), "Thu, Jan 1 08:42 PM");
        assert_eq!(format("EEEE MMMM"), "Thursday January");
        assert_eq!(format("DDD u k K"), "001 4 20 8");
        assert_eq!(format("'it''s' z Z X"), "it's UTC +0000 Z");
        assert_eq!(format("'run-'yyyy/G"), "run-2015/AD");
    }

    #[test]
    fn test_week_fields() {
        // 2024-05-15 is a Wednesday; May 2024 starts on a Wednesday
        let time = at(2024, 5, 15, 0, 0, 0);
        let format = |p: &str| DateSuffix::compile(p).unwrap().format(time);
        assert_eq!(format("W F"), "3 3");
        assert_eq!(format("ww YYYY"), "20 2024");
        assert_eq!(format("k h"), "24 12");
    }

    #[test]
    fn test_invalid_patterns() {
        let err = DateSuffix::compile("yyyy-qq").unwrap_err();
        assert_eq!(err.to_string(), "Invalid suffix : Illegal pattern character 'q'");

        let err = DateSuffix::compile("yyyy'-MM").unwrap_err();
        assert_eq!(err.to_string(), "Invalid suffix : Unterminated quote");

        assert!(DateSuffix::compile("").is_ok());
        assert!(DateSuffix::compile("'literal ''q'''").is_ok());
    }
}
