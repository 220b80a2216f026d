//! Per-kind text encodings.
//!
//! Writes are strict: handing a serializer a value of the wrong type is a bug
//! and surfaces as [`FieldsError::TypeMismatch`]. Reads are forgiving: stored
//! text that cannot be decoded yields the type's zero value, because that text
//! is already persisted and must not take the reader down with it.

use chrono::{DateTime, Datelike, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::{FieldsError, Result};
use crate::types::{Value, ValueType};

/// The closed set of payload encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Serializer {
    Text,
    Bool,
    Integer,
    DateTime,
    Reference,
}

impl Serializer {
    /// The encoding used for values of `value_type`.
    pub fn for_type(value_type: ValueType) -> Self {
        match value_type {
            ValueType::Text => Serializer::Text,
            ValueType::Bool => Serializer::Bool,
            ValueType::Integer => Serializer::Integer,
            ValueType::DateTime => Serializer::DateTime,
            ValueType::Reference => Serializer::Reference,
        }
    }

    /// The runtime type this encoding reads and writes.
    pub fn value_type(self) -> ValueType {
        match self {
            Serializer::Text => ValueType::Text,
            Serializer::Bool => ValueType::Bool,
            Serializer::Integer => ValueType::Integer,
            Serializer::DateTime => ValueType::DateTime,
            Serializer::Reference => ValueType::Reference,
        }
    }

    /// Encode `value` as text. `kind` is only used to label a mismatch error.
    pub fn serialize(self, kind: &str, value: &Value) -> Result<String> {
        let text = match (self, value) {
            (Serializer::Text, Value::Text(s)) => s.clone(),
            (Serializer::Bool, Value::Bool(b)) => (if *b { "True" } else { "False" }).to_string(),
            (Serializer::Integer, Value::Integer(n)) => {
                n.map(|n| n.to_string()).unwrap_or_default()
            }
            (Serializer::DateTime, Value::DateTime(Some(t))) => {
                // RFC 3339 has four-digit years only
                if !(0..=9999).contains(&t.year()) {
                    return Err(FieldsError::YearOutOfRange {
                        kind: kind.to_string(),
                        year: t.year(),
                    });
                }
                t.to_rfc3339_opts(SecondsFormat::AutoSi, true)
            }
            (Serializer::DateTime, Value::DateTime(None)) => String::new(),
            (Serializer::Reference, Value::Reference(id)) => {
                id.map(|id| id.to_string()).unwrap_or_default()
            }
            _ => {
                return Err(FieldsError::TypeMismatch {
                    kind: kind.to_string(),
                    expected: self.value_type(),
                    actual: value.value_type(),
                })
            }
        };
        Ok(text)
    }

    /// Strict decode. `None` means the text is not a valid encoding.
    ///
    /// Empty text is valid for every type and decodes to the zero value.
    pub fn try_deserialize(self, text: &str) -> Option<Value> {
        match self {
            Serializer::Text => Some(Value::Text(text.to_string())),
            Serializer::Bool => {
                let t = text.trim();
                if t.is_empty() || t.eq_ignore_ascii_case("false") {
                    Some(Value::Bool(false))
                } else if t.eq_ignore_ascii_case("true") {
                    Some(Value::Bool(true))
                } else {
                    None
                }
            }
            Serializer::Integer => {
                let t = text.trim();
                if t.is_empty() {
                    return Some(Value::Integer(None));
                }
                t.parse::<i64>().ok().map(|n| Value::Integer(Some(n)))
            }
            Serializer::DateTime => {
                let t = text.trim();
                if t.is_empty() {
                    return Some(Value::DateTime(None));
                }
                parse_instant(t).map(|dt| Value::DateTime(Some(dt)))
            }
            Serializer::Reference => {
                let t = text.trim();
                if t.is_empty() {
                    return Some(Value::Reference(None));
                }
                Ulid::from_string(t)
                    .ok()
                    .map(|id| Value::Reference(Some(id)))
            }
        }
    }

    /// Forgiving decode. Never fails; malformed text yields the zero value.
    pub fn deserialize(self, text: &str) -> Value {
        self.try_deserialize(text)
            .unwrap_or_else(|| self.value_type().zero())
    }
}

fn parse_instant(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    #[test]
    fn text_passes_through_verbatim() {
        let s = Serializer::Text;
        assert_eq!(s.serialize("Text", &Value::from("hello")).unwrap(), "hello");
        assert_eq!(s.deserialize("hello"), Value::from("hello"));
    }

    #[test]
    fn bool_uses_capitalized_literals() {
        let s = Serializer::Bool;
        assert_eq!(s.serialize("CheckBox", &Value::Bool(true)).unwrap(), "True");
        assert_eq!(s.serialize("CheckBox", &Value::Bool(false)).unwrap(), "False");
        assert_eq!(s.deserialize("True"), Value::Bool(true));
        assert_eq!(s.deserialize(" true "), Value::Bool(true));
    }

    #[test]
    fn mismatched_value_is_an_error() {
        let err = Serializer::Bool
            .serialize("CheckBox", &Value::from("yes"))
            .unwrap_err();
        match err {
            FieldsError::TypeMismatch {
                kind,
                expected,
                actual,
            } => {
                assert_eq!(kind, "CheckBox");
                assert_eq!(expected, ValueType::Bool);
                assert_eq!(actual, ValueType::Text);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[rstest]
    #[case(Serializer::Text, Value::Text(String::new()))]
    #[case(Serializer::Bool, Value::Bool(false))]
    #[case(Serializer::Integer, Value::Integer(None))]
    #[case(Serializer::DateTime, Value::DateTime(None))]
    #[case(Serializer::Reference, Value::Reference(None))]
    fn empty_text_yields_zero(#[case] s: Serializer, #[case] zero: Value) {
        assert_eq!(s.deserialize(""), zero);
    }

    #[rstest]
    #[case(Serializer::Bool, "not-a-bool", Value::Bool(false))]
    #[case(Serializer::Integer, "12abc", Value::Integer(None))]
    #[case(Serializer::DateTime, "yesterday", Value::DateTime(None))]
    #[case(Serializer::Reference, "not-a-ulid", Value::Reference(None))]
    fn malformed_text_yields_zero(#[case] s: Serializer, #[case] raw: &str, #[case] zero: Value) {
        assert!(s.try_deserialize(raw).is_none());
        assert_eq!(s.deserialize(raw), zero);
    }

    #[test]
    fn dates_accept_bare_calendar_days() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(
            Serializer::DateTime.deserialize("2024-03-01"),
            Value::DateTime(Some(expected))
        );
    }

    #[test]
    fn dates_are_written_in_utc() {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        let text = Serializer::DateTime
            .serialize("Date", &Value::from(t))
            .unwrap();
        assert_eq!(text, "2024-03-01T12:30:00Z");
    }

    #[rstest]
    #[case(10000, 1, 1)]
    #[case(-1, 6, 1)]
    fn dates_outside_four_digit_years_are_rejected(
        #[case] year: i32,
        #[case] month: u32,
        #[case] day: u32,
    ) {
        let t = Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap();
        let err = Serializer::DateTime
            .serialize("Date", &Value::from(t))
            .unwrap_err();
        assert!(matches!(err, FieldsError::YearOutOfRange { year: y, .. } if y == year));
    }

    #[test]
    fn dates_at_the_year_bounds_round_trip() {
        for t in [
            Utc.with_ymd_and_hms(0, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59).unwrap(),
        ] {
            let text = Serializer::DateTime
                .serialize("Date", &Value::from(t))
                .unwrap();
            assert_eq!(Serializer::DateTime.deserialize(&text), Value::from(t));
        }
    }

    #[test]
    fn empty_optionals_serialize_to_empty_text() {
        assert_eq!(
            Serializer::Integer
                .serialize("Number", &Value::Integer(None))
                .unwrap(),
            ""
        );
        assert_eq!(
            Serializer::Reference
                .serialize("Image", &Value::Reference(None))
                .unwrap(),
            ""
        );
    }

    #[test]
    fn serializer_matches_value_type() {
        for vt in [
            ValueType::Text,
            ValueType::Bool,
            ValueType::Integer,
            ValueType::DateTime,
            ValueType::Reference,
        ] {
            assert_eq!(Serializer::for_type(vt).value_type(), vt);
        }
    }
}
