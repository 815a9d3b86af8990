//! Raw configuration text to command literals.
//!
//! Rules, applied to every field of a record:
//!
//! - only decimal digits → integer literal
//! - the null marker `null` → null literal
//! - anything else → quoted string literal
//!
//! Fields that are already literals pass through untouched, which makes
//! transcription idempotent.

use crate::models::{FieldValue, Literal, ParameterRecord};

/// Classify one raw configuration value.
pub fn transcribe_value(raw: &str) -> Literal {
    if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
        // Oversized digit strings stay text rather than losing digits.
        if let Ok(n) = raw.parse::<u64>() {
            return Literal::Integer(n);
        }
    }
    if raw == Literal::NULL_MARKER {
        return Literal::Null;
    }
    Literal::Text(raw.to_string())
}

/// Transcribe every raw field of a record in place.
pub fn transcribe(record: &mut ParameterRecord) {
    for value in record.fields.values_mut() {
        if let FieldValue::Raw(raw) = value {
            *value = FieldValue::Literal(transcribe_value(raw));
        }
    }
}

/// Transcribe a whole record sequence, preserving order.
pub fn transcribe_all(records: &mut [ParameterRecord]) {
    records.iter_mut().for_each(transcribe);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Mode;
    use indexmap::IndexMap;

    fn record(fields: &[(&str, FieldValue)]) -> ParameterRecord {
        ParameterRecord {
            mode: Mode::SrcColumn,
            row: 0,
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect::<IndexMap<_, _>>(),
        }
    }

    #[test]
    fn test_value_classes() {
        assert_eq!(transcribe_value("38"), Literal::Integer(38));
        assert_eq!(transcribe_value("007"), Literal::Integer(7));
        assert_eq!(transcribe_value("null"), Literal::Null);
        assert_eq!(transcribe_value("NULL"), Literal::text("NULL"));
        assert_eq!(transcribe_value("varchar"), Literal::text("varchar"));
        assert_eq!(transcribe_value("-5"), Literal::text("-5"));
        assert_eq!(transcribe_value("1.5"), Literal::text("1.5"));
        assert_eq!(transcribe_value(""), Literal::text(""));
    }

    #[test]
    fn test_overflowing_digits_stay_text() {
        let big = "123456789012345678901234567890";
        assert_eq!(transcribe_value(big), Literal::text(big));
    }

    #[test]
    fn test_transcribe_record() {
        let mut r = record(&[
            ("column_name", "amount".into()),
            ("precision", "18".into()),
            ("scale", "null".into()),
        ]);
        transcribe(&mut r);

        assert_eq!(r.mode, Mode::SrcColumn);
        assert_eq!(r.get("column_name"), Some(&FieldValue::Literal(Literal::text("amount"))));
        assert_eq!(r.get("precision"), Some(&FieldValue::Literal(Literal::Integer(18))));
        assert_eq!(r.get("scale"), Some(&FieldValue::Literal(Literal::Null)));
    }

    #[test]
    fn test_transcription_is_idempotent() {
        let mut r = record(&[
            ("column_name", "amount".into()),
            ("precision", "18".into()),
            ("scale", "null".into()),
            ("key_flg", Literal::text("y").into()),
        ]);
        transcribe(&mut r);
        let once = r.clone();
        transcribe(&mut r);
        assert_eq!(r, once);
        assert_eq!(r.get("key_flg"), Some(&FieldValue::Literal(Literal::text("y"))));
    }

    #[test]
    fn test_transcribe_all_keeps_order() {
        let mut records = vec![
            record(&[("a", "1".into())]),
            record(&[("a", "x".into())]),
        ];
        transcribe_all(&mut records);
        assert_eq!(records[0].get("a"), Some(&FieldValue::Literal(Literal::Integer(1))));
        assert_eq!(records[1].get("a"), Some(&FieldValue::Literal(Literal::text("x"))));
    }
}
