//! Fixed-width line decoding

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use super::builder::{Record, RecordBuilder};
use super::error::{RecordError, RecordResult};
use super::field::{FieldSpecification, FieldType};
use super::spec::RecordSpecification;
use super::value::{Decimal, FieldValue};

/// Decode one line into a record
///
/// The line must be exactly [`RecordSpecification::total_width`] characters.
/// Computed fields are not read from the line and ignored fields are skipped.
pub fn decode_line(line: &str, spec: &RecordSpecification) -> RecordResult<Record> {
    let chars: Vec<char> = line.chars().collect();
    let expected = spec.total_width();
    if chars.len() != expected {
        return Err(RecordError::LineLength {
            expected,
            actual: chars.len(),
        });
    }

    let mut builder = RecordBuilder::new(spec);
    let mut offset = 0;

    for field in spec.fields().iter().filter(|f| !f.is_computed()) {
        let end = offset + field.width();
        if !field.is_ignored() {
            let raw: String = chars[offset..end].iter().collect();
            let value = decode_value(field, offset, &raw)?;
            builder = builder.field(field.name(), value)?;
        }
        offset = end;
    }

    builder.build()
}

fn decode_value(field: &FieldSpecification, offset: usize, raw: &str) -> RecordResult<FieldValue> {
    let trimmed = raw.trim();
    let fail = |reason: &str| RecordError::field_parse(field.name(), offset, raw, reason);

    match field.field_type() {
        FieldType::Text => Ok(FieldValue::Text(trimmed.to_string())),
        FieldType::Integer => {
            if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
                return Err(fail("expected digits"));
            }
            trimmed
                .parse::<i64>()
                .map(FieldValue::Integer)
                .map_err(|_| fail("integer out of range"))
        }
        FieldType::Decimal => {
            if trimmed.is_empty() {
                return Err(fail("expected a decimal number"));
            }
            trimmed
                .parse::<Decimal>()
                .map(FieldValue::Decimal)
                .map_err(|_| fail("expected a decimal number"))
        }
        FieldType::DateTime => parse_timestamp(trimmed)
            .map(FieldValue::DateTime)
            .ok_or_else(|| fail("expected yyyyMMdd, yyyyMMddHHmm or yyyyMMddHHmmss")),
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let naive = match value.len() {
        8 => NaiveDate::parse_from_str(value, "%Y%m%d")
            .ok()?
            .and_hms_opt(0, 0, 0)?,
        12 => NaiveDateTime::parse_from_str(value, "%Y%m%d%H%M").ok()?,
        14 => NaiveDateTime::parse_from_str(value, "%Y%m%d%H%M%S").ok()?,
        _ => return None,
    };

    Some(naive.and_utc())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn two_field_spec() -> RecordSpecification {
        RecordSpecification::new(
            "Pair",
            "A",
            vec![
                FieldSpecification::field("A", 2),
                FieldSpecification::field("B", 5),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_wrong_length_is_rejected() {
        let spec = two_field_spec();

        for line in ["abc", "abcdefgh"] {
            assert_eq!(
                decode_line(line, &spec),
                Err(RecordError::LineLength {
                    expected: 7,
                    actual: line.len()
                })
            );
        }
    }

    #[test]
    fn test_splits_and_trims() {
        let spec = two_field_spec();
        let record = decode_line("x  yz  ", &spec).unwrap();

        assert_eq!(record.get("A"), Some(&FieldValue::from("x")));
        assert_eq!(record.get("B"), Some(&FieldValue::from("yz")));
    }

    #[test]
    fn test_typed_fields() {
        let spec = RecordSpecification::new(
            "Typed",
            "Id",
            vec![
                FieldSpecification::field("Id", 4).as_integer(),
                FieldSpecification::filler("Pad", 1),
                FieldSpecification::field("Amount", 9).as_decimal(),
                FieldSpecification::field("Born", 8).as_datetime(),
                FieldSpecification::field("Seen", 14).as_datetime(),
                FieldSpecification::field("Note", 3).computed(),
            ],
        )
        .unwrap();

        let record = decode_line("0042X  -12.5  1980010220240131235959", &spec).unwrap();

        assert_eq!(record.get("Id"), Some(&FieldValue::Integer(42)));
        assert!(!record.contains("Pad"));
        assert!(!record.contains("Note"));
        assert_eq!(
            record.get("Amount"),
            Some(&FieldValue::Decimal("-12.5".parse().unwrap()))
        );
        assert_eq!(
            record.get("Born"),
            Some(&FieldValue::DateTime(Utc.with_ymd_and_hms(1980, 1, 2, 0, 0, 0).unwrap()))
        );
        assert_eq!(
            record.get("Seen"),
            Some(&FieldValue::DateTime(Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap()))
        );
    }

    #[test]
    fn test_field_errors_name_field_and_offset() {
        let spec = RecordSpecification::new(
            "Typed",
            "Code",
            vec![
                FieldSpecification::field("Code", 2),
                FieldSpecification::field("Count", 3).as_integer(),
            ],
        )
        .unwrap();

        match decode_line("ab1x3", &spec) {
            Err(RecordError::FieldParse { field, offset, raw, .. }) => {
                assert_eq!(field, "Count");
                assert_eq!(offset, 2);
                assert_eq!(raw, "1x3");
            }
            other => panic!("unexpected result: {:?}", other),
        }

        assert!(matches!(
            decode_line("ab   ", &spec),
            Err(RecordError::FieldParse { .. })
        ));
    }

    #[test]
    fn test_invalid_datetime() {
        assert!(parse_timestamp("20241301").is_none());
        assert!(parse_timestamp("2024010").is_none());
        assert!(parse_timestamp("").is_none());
        assert_eq!(
            parse_timestamp("202401311230"),
            Utc.with_ymd_and_hms(2024, 1, 31, 12, 30, 0).single()
        );
    }

    #[test]
    fn test_width_counts_characters() {
        let spec = two_field_spec();
        let record = decode_line("æø Søre", &spec).unwrap();

        assert_eq!(record.get("A"), Some(&FieldValue::from("æø")));
        assert_eq!(record.get("B"), Some(&FieldValue::from("Søre")));
    }

    proptest! {
        #[test]
        fn prop_only_exact_width_decodes(line in "[a-z ]{0,12}") {
            let spec = two_field_spec();
            let result = decode_line(&line, &spec);
            prop_assert_eq!(result.is_ok(), line.len() == 7);
        }

        #[test]
        fn prop_fields_are_trimmed_slices(a in "[a-z]{0,2}", b in "[a-z]{0,5}") {
            let spec = two_field_spec();
            let line = format!("{:<2}{:>5}", a, b);
            let record = decode_line(&line, &spec).unwrap();
            prop_assert_eq!(record.get("A"), Some(&FieldValue::from(a.as_str())));
            prop_assert_eq!(record.get("B"), Some(&FieldValue::from(b.as_str())));
        }
    }
}
