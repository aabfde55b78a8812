use sha2::{Digest, Sha256};

use crate::types::diploma::{DiplomaDraft, DiplomaRecord, Grade};

/// Lowercase a recipient name and drop every space character.
///
/// `"John Doe"` and `"john doe"` normalize to the same `"johndoe"`.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|&c| c != ' ')
        .flat_map(char::to_lowercase)
        .collect()
}

/// The exact string signed by the issuer:
/// `title ++ normalize(recipient_name) ++ date ++ average`.
pub fn canonicalize_draft(draft: &DiplomaDraft) -> String {
    canonical_parts(
        &draft.title,
        &draft.recipient_name,
        &draft.date,
        &draft.average,
    )
}

/// Canonical string of a decoded record. The signature is not part of it.
pub fn canonicalize_record(record: &DiplomaRecord) -> String {
    canonical_parts(
        &record.title,
        &record.recipient_name,
        &record.date,
        &record.average,
    )
}

fn canonical_parts(title: &str, recipient_name: &str, date: &str, average: &Grade) -> String {
    let mut out = String::with_capacity(title.len() + recipient_name.len() + date.len() + 8);
    out.push_str(title);
    out.push_str(&normalize_name(recipient_name));
    out.push_str(date);
    out.push_str(&average.to_string());
    out
}

/// SHA-256 of a canonical string, hex encoded. Used in logs to identify a
/// diploma without printing its contents.
pub fn canonical_digest(canonical: &str) -> String {
    hex::encode(Sha256::digest(canonical.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DiplomaDraft {
        DiplomaDraft::new("master en alchimie", "John Doe", "01/01/1970", 15)
    }

    #[test]
    fn test_reference_example_canonicalization() {
        assert_eq!(
            canonicalize_draft(&sample()),
            "master en alchimiejohndoe01/01/197015"
        );
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("John Doe"), "johndoe");
        assert_eq!(normalize_name("  Jean  Dupont "), "jeandupont");
        assert_eq!(normalize_name("ÉLODIE"), "élodie");
        // Only the space character is stripped.
        assert_eq!(normalize_name("A\tB"), "a\tb");
    }

    #[test]
    fn test_name_spacing_and_case_do_not_matter() {
        let mut other = sample();
        other.recipient_name = "john   DOE".to_string();
        assert_eq!(canonicalize_draft(&sample()), canonicalize_draft(&other));
    }

    #[test]
    fn test_title_is_not_normalized() {
        let mut other = sample();
        other.title = "Master en alchimie".to_string();
        assert_ne!(canonicalize_draft(&sample()), canonicalize_draft(&other));
    }

    #[test]
    fn test_average_formatting_matters() {
        let mut decimal = sample();
        decimal.average = Grade::decimal(15.0).unwrap();
        assert_eq!(
            canonicalize_draft(&decimal),
            "master en alchimiejohndoe01/01/197015.0"
        );
        assert_ne!(canonicalize_draft(&sample()), canonicalize_draft(&decimal));
    }

    #[test]
    fn test_record_ignores_signature() {
        let a = sample().with_signature(vec![1, 2, 3]);
        let b = sample().with_signature(vec![9]);
        assert_eq!(canonicalize_record(&a), canonicalize_record(&b));
        assert_eq!(canonicalize_record(&a), canonicalize_draft(&sample()));
    }

    #[test]
    fn test_canonical_digest() {
        let digest = canonical_digest("abc");
        assert_eq!(digest.len(), 64);
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
