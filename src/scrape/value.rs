//! Typed field values parsed from scraped text.

use serde::Serialize;
use std::fmt;

/// A scraped value. Text that carries no recognisable number stays as text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Percentage(f64),
    Currency(f64),
    Text(String),
}

impl FieldValue {
    /// Parse the first numeric token in `raw`.
    ///
    /// `"291,928 (100% urban)."` → `Number(291928)`, `"+54.5%"` →
    /// `Percentage(54.5)`, `"$1,341."` → `Currency(1341)`. Returns `None` for
    /// blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if text.is_empty() {
            return None;
        }
        let number = text
            .split(' ')
            .filter(|t| t.bytes().any(|b| b.is_ascii_digit()))
            .find_map(parse_token);
        Some(number.unwrap_or(Self::Text(text)))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(v) | Self::Percentage(v) | Self::Currency(v) => Some(*v),
            Self::Text(_) => None,
        }
    }
}

fn parse_token(token: &str) -> Option<FieldValue> {
    let t = token
        .trim_start_matches(['(', '+', '"'])
        .trim_end_matches([')', ',', ';', ':', '.', '"']);
    let (negative, t) = match t.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, t),
    };
    let (currency, t) = match t.strip_prefix('$') {
        Some(rest) => (true, rest),
        None => (false, t),
    };
    let (percent, t) = match t.strip_suffix('%') {
        Some(rest) => (true, rest),
        None => (false, t),
    };

    if t.is_empty() || !t.bytes().all(|b| b.is_ascii_digit() || b == b',' || b == b'.') {
        return None;
    }
    let v: f64 = t.replace(',', "").parse().ok()?;
    let v = if negative { -v } else { v };

    Some(if percent {
        FieldValue::Percentage(v)
    } else if currency {
        FieldValue::Currency(v)
    } else {
        FieldValue::Number(v)
    })
}

fn fmt_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{}", fmt_number(*v)),
            Self::Percentage(v) => write!(f, "{}%", fmt_number(*v)),
            Self::Currency(v) => write!(f, "${}", fmt_number(*v)),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_city_data_snippets() {
        assert_eq!(FieldValue::parse("291,928 (100% urban)."), Some(FieldValue::Number(291928.0)));
        assert_eq!(FieldValue::parse("+54.5%"), Some(FieldValue::Percentage(54.5)));
        assert_eq!(FieldValue::parse("$1,341."), Some(FieldValue::Currency(1341.0)));
        assert_eq!(FieldValue::parse("-3.2%"), Some(FieldValue::Percentage(-3.2)));
        assert_eq!(FieldValue::parse("  11.1%  (9.6% for White"), Some(FieldValue::Percentage(11.1)));
    }

    #[test]
    fn test_parse_text_and_blank() {
        assert_eq!(
            FieldValue::parse("White alone"),
            Some(FieldValue::Text("White alone".into()))
        );
        assert_eq!(FieldValue::parse(" \n "), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(FieldValue::Number(291928.0).to_string(), "291928");
        assert_eq!(FieldValue::Percentage(54.5).to_string(), "54.5%");
        assert_eq!(FieldValue::Currency(1341.0).to_string(), "$1341");
        assert_eq!(FieldValue::Text("Black".into()).to_string(), "Black");
        assert_eq!(FieldValue::Currency(12.0).as_f64(), Some(12.0));
        assert_eq!(FieldValue::Text("x".into()).as_f64(), None);
    }
}
