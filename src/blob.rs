//! Wire form of a [`DiplomaRecord`] inside the carrier image.
//!
//! The blob is standard base64 over a JSON object with a fixed field order
//! (`title`, `recipient_name`, `date`, `average`, `signature`). Every
//! character is printable ASCII, so it passes through the 7-bit codec intact.

use base64::{engine::general_purpose, Engine as _};

use crate::error::Error;
use crate::types::diploma::DiplomaRecord;

/// Encode a record as a printable blob.
pub fn serialize(record: &DiplomaRecord) -> String {
    // Every field is a string or a finite number, so JSON encoding cannot fail.
    let json = serde_json::to_vec(record).unwrap_or_default();
    general_purpose::STANDARD.encode(json)
}

/// Decode a blob produced by [`serialize`].
///
/// # Errors
///
/// [`Error::MalformedBlob`] for anything that is not valid base64 of a
/// well-formed record.
pub fn deserialize(blob: &str) -> Result<DiplomaRecord, Error> {
    let json = general_purpose::STANDARD
        .decode(blob.as_bytes())
        .map_err(|e| Error::MalformedBlob(format!("base64: {}", e)))?;
    serde_json::from_slice(&json).map_err(|e| Error::MalformedBlob(format!("record: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::diploma::{DiplomaDraft, Grade};

    fn record(average: Grade) -> DiplomaRecord {
        DiplomaDraft::new("master en alchimie", "John Doe", "01/01/1970", average)
            .with_signature((0u8..72).collect())
    }

    #[test]
    fn test_roundtrip() {
        for average in [
            Grade::integer(15),
            Grade::integer(-3),
            Grade::decimal(15.0).unwrap(),
            Grade::decimal(12.345).unwrap(),
        ] {
            let r = record(average);
            assert_eq!(deserialize(&serialize(&r)).unwrap(), r);
        }
    }

    #[test]
    fn test_roundtrip_non_ascii_fields() {
        let r = DiplomaDraft::new("Diplôme", "Zoë Ünal", "31/12/1999", 20)
            .with_signature(vec![]);
        let blob = serialize(&r);
        assert!(blob.is_ascii());
        assert_eq!(deserialize(&blob).unwrap(), r);
    }

    #[test]
    fn test_blob_is_printable() {
        let blob = serialize(&record(Grade::integer(15)));
        assert!(blob.bytes().all(|b| b.is_ascii_graphic()));
    }

    #[test]
    fn test_deterministic() {
        let r = record(Grade::integer(15));
        assert_eq!(serialize(&r), serialize(&r));
    }

    #[test]
    fn test_malformed_inputs() {
        for input in ["", "!!!not base64!!!", "aGVsbG8=", "e30=", "W10="] {
            assert!(
                matches!(deserialize(input), Err(Error::MalformedBlob(_))),
                "input {:?} should be malformed",
                input
            );
        }
    }

    #[test]
    fn test_truncated_blob_is_malformed() {
        let blob = serialize(&record(Grade::integer(15)));
        let truncated = &blob[..blob.len() - 8];
        assert!(matches!(
            deserialize(truncated),
            Err(Error::MalformedBlob(_))
        ));
    }
}
