//! Property tests for the field kind serializers.
//!
//! Every registered kind must round-trip every value its runtime type can hold,
//! and must never fail on text it cannot decode.

use chrono::{DateTime, TimeZone, Utc};
use folio_fields::{FieldKindRegistry, FieldsError, StoredValue, Value, ValueType};
use proptest::prelude::*;
use ulid::Ulid;

fn instant_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    // Years 0000..=9999, nanosecond precision
    (MIN_STORABLE_SECS..=MAX_STORABLE_SECS, 0u32..1_000_000_000)
        .prop_map(|(secs, nanos)| Utc.timestamp_opt(secs, nanos).unwrap())
}

/// 0000-01-01T00:00:00Z
const MIN_STORABLE_SECS: i64 = -62_167_219_200;
/// 9999-12-31T23:59:59Z
const MAX_STORABLE_SECS: i64 = 253_402_300_799;

fn unstorable_instant_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    // About 200 years either side of the storable range
    let before = (MIN_STORABLE_SECS - 6_311_390_400..MIN_STORABLE_SECS).boxed();
    let after = (MAX_STORABLE_SECS + 1..=MAX_STORABLE_SECS + 6_311_390_400).boxed();
    prop_oneof![before, after].prop_map(|secs| Utc.timestamp_opt(secs, 0).unwrap())
}

fn value_strategy(value_type: ValueType) -> BoxedStrategy<Value> {
    match value_type {
        ValueType::Text => any::<String>().prop_map(Value::Text).boxed(),
        ValueType::Bool => any::<bool>().prop_map(Value::Bool).boxed(),
        ValueType::Integer => proptest::option::of(any::<i64>())
            .prop_map(Value::Integer)
            .boxed(),
        ValueType::DateTime => proptest::option::of(instant_strategy())
            .prop_map(Value::DateTime)
            .boxed(),
        ValueType::Reference => proptest::option::of(any::<u128>().prop_map(Ulid::from))
            .prop_map(Value::Reference)
            .boxed(),
    }
}

fn kind_and_value() -> impl Strategy<Value = (String, Value)> {
    let registry = FieldKindRegistry::with_defaults();
    let kinds: Vec<(String, ValueType)> = registry
        .kinds()
        .map(|d| (d.name.clone(), d.value_type))
        .collect();
    proptest::sample::select(kinds)
        .prop_flat_map(|(name, vt)| (Just(name), value_strategy(vt)))
}

proptest! {
    #[test]
    fn every_kind_round_trips((kind, value) in kind_and_value()) {
        let registry = FieldKindRegistry::with_defaults();
        let stored = registry.serialize_value(&kind, &value).unwrap();
        prop_assert_eq!(&stored.discriminator, &kind);
        let back = registry.deserialize_value(&stored).unwrap();
        prop_assert_eq!(back, value);
    }

    #[test]
    fn unstorable_years_are_rejected_on_write(instant in unstorable_instant_strategy()) {
        let registry = FieldKindRegistry::with_defaults();
        let err = registry
            .serialize_value("Date", &Value::from(instant))
            .unwrap_err();
        prop_assert!(matches!(err, FieldsError::YearOutOfRange { .. }), "{err:?}");
    }

    #[test]
    fn arbitrary_text_never_fails(text in any::<String>()) {
        let registry = FieldKindRegistry::with_defaults();
        for descriptor in registry.kinds() {
            let value = registry
                .deserialize_value(&StoredValue::new(descriptor.name.clone(), text.clone()))
                .unwrap();
            prop_assert_eq!(value.value_type(), descriptor.value_type);
        }
    }
}

#[test]
fn empty_and_garbage_decode_to_documented_zero_values() {
    let registry = FieldKindRegistry::with_defaults();
    for descriptor in registry.kinds() {
        for raw in ["", "\u{0}<not a valid encoding>\u{7f}"] {
            let value = descriptor.deserialize(raw);
            if descriptor.value_type == ValueType::Text {
                assert_eq!(value, Value::Text(raw.to_string()));
            } else {
                assert_eq!(value, descriptor.zero(), "kind {}", descriptor.name);
            }
        }
    }
}

#[test]
fn text_kind_scenario() {
    let registry = FieldKindRegistry::with_defaults();
    let text = registry.lookup("Text").unwrap();
    assert_eq!(text.serialize(&Value::from("hello")).unwrap(), "hello");
    assert_eq!(text.deserialize("hello"), Value::from("hello"));
}

#[test]
fn checkbox_kind_scenario() {
    let registry = FieldKindRegistry::with_defaults();
    let checkbox = registry.lookup("CheckBox").unwrap();
    assert_eq!(checkbox.serialize(&Value::Bool(true)).unwrap(), "True");
    assert_eq!(checkbox.deserialize("True"), Value::Bool(true));
    assert_eq!(checkbox.deserialize("not-a-bool"), Value::Bool(false));
}
