//! # Cell Text Tokenization
//!
//! The [`Tokenizer`] turns raw cell bytes into primitive values. It backs
//! both the leaf parsers and the typing engine's probes ("does this cell
//! look numeric / boolean / like a date-time?"), so a value accepted by a
//! probe is guaranteed to be accepted by the matching parser.
//!
//! Floating-point and time-zone leaf semantics are caller-replaceable
//! through [`CustomDoubleParser`] and [`CustomTimeZoneParser`]; everything
//! else is fixed.

pub mod datetime;

pub use datetime::CustomTimeZoneParser;

use std::sync::Arc;

/// Caller-replaceable floating-point leaf parser.
pub trait CustomDoubleParser: Send + Sync {
    /// Parse the full text as a double, or `None` to reject the cell.
    fn try_parse(&self, text: &str) -> Option<f64>;
}

/// Default double parser: the standard library's `FromStr` grammar
/// (decimal and scientific notation, `inf`/`NaN`, no surrounding space).
pub struct StandardDoubleParser;

impl CustomDoubleParser for StandardDoubleParser {
    fn try_parse(&self, text: &str) -> Option<f64> {
        text.parse::<f64>().ok()
    }
}

/// `true` for ASCII space and horizontal tab, the characters surrounding
/// trims remove.
#[inline]
pub(crate) fn is_space_or_tab(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

/// Trim spaces and tabs from both ends of a byte view.
pub(crate) fn trim_spaces(mut bytes: &[u8]) -> &[u8] {
    while let [first, rest @ ..] = bytes {
        if !is_space_or_tab(*first) {
            break;
        }
        bytes = rest;
    }
    while let [rest @ .., last] = bytes {
        if !is_space_or_tab(*last) {
            break;
        }
        bytes = rest;
    }
    bytes
}

/// Primitive-value scanner over cell bytes.
pub struct Tokenizer {
    double_parser: Arc<dyn CustomDoubleParser>,
    zone_parser: Option<Arc<dyn CustomTimeZoneParser>>,
}

impl Tokenizer {
    pub fn new(
        double_parser: Arc<dyn CustomDoubleParser>,
        zone_parser: Option<Arc<dyn CustomTimeZoneParser>>,
    ) -> Self {
        Self {
            double_parser,
            zone_parser,
        }
    }

    /// Strict optional-sign decimal integer. Surrounding spaces and tabs
    /// are tolerated (fixed-width cells keep their padding). Accumulates in
    /// the negative domain so `i64::MIN` parses without overflow.
    pub fn try_parse_long(&self, bytes: &[u8]) -> Option<i64> {
        let bytes = trim_spaces(bytes);
        let (negative, digits) = match *bytes.first()? {
            b'+' => (false, &bytes[1..]),
            b'-' => (true, &bytes[1..]),
            _ => (false, bytes),
        };
        if digits.is_empty() {
            return None;
        }
        let mut acc: i64 = 0;
        for &b in digits {
            if !b.is_ascii_digit() {
                return None;
            }
            acc = acc
                .checked_mul(10)?
                .checked_sub(i64::from(b - b'0'))?;
        }
        if negative {
            Some(acc)
        } else {
            acc.checked_neg()
        }
    }

    /// Floating-point scan via the installed double parser.
    pub fn try_parse_double(&self, bytes: &[u8]) -> Option<f64> {
        let text = std::str::from_utf8(trim_spaces(bytes)).ok()?;
        if text.is_empty() {
            return None;
        }
        self.double_parser.try_parse(text)
    }

    /// Case-insensitive `true` / `false`.
    pub fn try_parse_bool(&self, bytes: &[u8]) -> Option<bool> {
        let bytes = trim_spaces(bytes);
        if bytes.eq_ignore_ascii_case(b"true") {
            Some(true)
        } else if bytes.eq_ignore_ascii_case(b"false") {
            Some(false)
        } else {
            None
        }
    }

    /// ISO-8601 date-time to epoch nanoseconds; see [`datetime`].
    pub fn try_parse_datetime(&self, bytes: &[u8]) -> Option<i64> {
        let text = std::str::from_utf8(trim_spaces(bytes)).ok()?;
        datetime::parse_datetime_nanos(text, self.zone_parser.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenizer() -> Tokenizer {
        Tokenizer::new(Arc::new(StandardDoubleParser), None)
    }

    #[test]
    fn long_accepts_signs_and_extremes() {
        let t = tokenizer();
        assert_eq!(t.try_parse_long(b"0"), Some(0));
        assert_eq!(t.try_parse_long(b"+17"), Some(17));
        assert_eq!(t.try_parse_long(b"-300"), Some(-300));
        assert_eq!(
            t.try_parse_long(b"9223372036854775807"),
            Some(i64::MAX)
        );
        assert_eq!(
            t.try_parse_long(b"-9223372036854775808"),
            Some(i64::MIN)
        );
    }

    #[test]
    fn long_rejects_non_integers() {
        let t = tokenizer();
        assert_eq!(t.try_parse_long(b""), None);
        assert_eq!(t.try_parse_long(b"+"), None);
        assert_eq!(t.try_parse_long(b"1.5"), None);
        assert_eq!(t.try_parse_long(b"1 2"), None);
        assert_eq!(t.try_parse_long(b"9223372036854775808"), None);
        assert_eq!(t.try_parse_long(b"12a"), None);
    }

    #[test]
    fn long_tolerates_surrounding_padding() {
        let t = tokenizer();
        assert_eq!(t.try_parse_long(b" 1"), Some(1));
        assert_eq!(t.try_parse_long(b"42  "), Some(42));
    }

    #[test]
    fn double_accepts_common_shapes() {
        let t = tokenizer();
        assert_eq!(t.try_parse_double(b"3.25"), Some(3.25));
        assert_eq!(t.try_parse_double(b"-4e2"), Some(-400.0));
        assert_eq!(t.try_parse_double(b"7"), Some(7.0));
        assert_eq!(t.try_parse_double(b"hello"), None);
        assert_eq!(t.try_parse_double(b""), None);
    }

    #[test]
    fn bool_is_case_insensitive() {
        let t = tokenizer();
        assert_eq!(t.try_parse_bool(b"true"), Some(true));
        assert_eq!(t.try_parse_bool(b"FALSE"), Some(false));
        assert_eq!(t.try_parse_bool(b"True"), Some(true));
        assert_eq!(t.try_parse_bool(b"yes"), None);
    }

    #[test]
    fn trim_spaces_both_ends() {
        assert_eq!(trim_spaces(b"  a b\t"), b"a b");
        assert_eq!(trim_spaces(b"\t \t"), b"");
        assert_eq!(trim_spaces(b"x"), b"x");
    }
}
