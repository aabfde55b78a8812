//! End-to-end issuance and verification scenarios.

use diploseal::blob;
use diploseal::codec::{self, PixelGrid};
use diploseal::config::{Framing, ProtocolConfig};
use diploseal::keystore::KeyFiles;
use diploseal::protocol::{issue_diploma, verify_diploma, Outcome, PayloadLength};
use diploseal::signature::{EcdsaP256, NoPassphrase, PassphrasePrompt};
use diploseal::types::diploma::{DiplomaDraft, Grade};
use diploseal::Error;
use p256::SecretKey;
use rand::rngs::OsRng;

/// A carrier with varied pixel values, like a real background image.
fn background(width: u32, height: u32) -> PixelGrid {
    let raw = (0..width * height)
        .flat_map(|i| {
            let x = i % width;
            let y = i / width;
            [(x * 5 % 256) as u8, (y * 7 % 256) as u8, ((x + y) * 3 % 256) as u8]
        })
        .collect();
    PixelGrid::from_raw(width, height, raw).unwrap()
}

fn alchemy_draft() -> DiplomaDraft {
    DiplomaDraft::new("master en alchimie", "John Doe", "01/01/1970", 15)
}

#[test]
fn diploma_roundtrip_valid() {
    let key = SecretKey::random(&mut OsRng);
    let carrier = background(120, 80);

    let issued = issue_diploma(
        &carrier,
        alchemy_draft(),
        &EcdsaP256,
        &key,
        &ProtocolConfig::default(),
    )
    .unwrap();

    let outcome = verify_diploma(
        &issued.image,
        PayloadLength::Known(issued.embedded_length),
        &EcdsaP256,
        &key.public_key(),
    )
    .unwrap();

    match outcome {
        Outcome::Valid(record) => {
            assert_eq!(record.title, "master en alchimie");
            assert_eq!(record.recipient_name, "John Doe");
            assert_eq!(record.date, "01/01/1970");
            assert_eq!(record.average.to_string(), "15");
        }
        Outcome::Invalid(record) => panic!("expected valid diploma, got invalid {:?}", record),
    }
}

#[test]
fn diploma_only_touches_embedded_pixels() {
    let key = SecretKey::random(&mut OsRng);
    let carrier = background(64, 64);
    let issued = issue_diploma(
        &carrier,
        alchemy_draft(),
        &EcdsaP256,
        &key,
        &ProtocolConfig::default(),
    )
    .unwrap();

    let width = carrier.width();
    for i in issued.embedded_length..carrier.pixel_count() {
        let (x, y) = ((i as u32) % width, (i as u32) / width);
        assert_eq!(carrier.get(x, y), issued.image.get(x, y), "pixel {} changed", i);
    }
}

#[test]
fn diploma_bit_flip_detected() {
    let key = SecretKey::random(&mut OsRng);
    let carrier = background(120, 80);
    let issued = issue_diploma(
        &carrier,
        alchemy_draft(),
        &EcdsaP256,
        &key,
        &ProtocolConfig::default(),
    )
    .unwrap();

    for index in [5u32, 60, issued.embedded_length as u32 / 2, issued.embedded_length as u32 - 10] {
        let mut tampered = issued.image.clone();
        let (x, y) = (index % tampered.width(), index / tampered.width());
        let [r, g, b] = tampered.get(x, y).unwrap();
        tampered.set(x, y, [r, g, b ^ 0b001]);

        let result = verify_diploma(
            &tampered,
            PayloadLength::Known(issued.embedded_length),
            &EcdsaP256,
            &key.public_key(),
        );
        match result {
            Ok(Outcome::Invalid(_)) | Err(Error::CorruptPayload(_)) => {}
            other => panic!("bit flip at pixel {} not detected: {:?}", index, other),
        }
    }
}

#[test]
fn diploma_wrong_key_invalid() {
    let issuer = SecretKey::random(&mut OsRng);
    let impostor = SecretKey::random(&mut OsRng);
    let issued = issue_diploma(
        &background(120, 80),
        alchemy_draft(),
        &EcdsaP256,
        &issuer,
        &ProtocolConfig::default(),
    )
    .unwrap();

    let outcome = verify_diploma(
        &issued.image,
        PayloadLength::Known(issued.embedded_length),
        &EcdsaP256,
        &impostor.public_key(),
    )
    .unwrap();
    assert!(!outcome.is_valid());
}

#[test]
fn diploma_forged_record_with_copied_signature_invalid() {
    let key = SecretKey::random(&mut OsRng);
    let carrier = background(120, 80);
    let issued = issue_diploma(
        &carrier,
        alchemy_draft(),
        &EcdsaP256,
        &key,
        &ProtocolConfig::default(),
    )
    .unwrap();

    // Re-embed the record with a better average but the original signature.
    let mut forged = issued.record.clone();
    forged.average = Grade::integer(20);
    let payload = blob::serialize(&forged);
    let image = codec::embed(&carrier, &payload).unwrap();

    let outcome = verify_diploma(
        &image,
        PayloadLength::Known(payload.len()),
        &EcdsaP256,
        &key.public_key(),
    )
    .unwrap();
    assert!(!outcome.is_valid());
    assert_eq!(outcome.record().average.to_string(), "20");
}

#[test]
fn diploma_header_framing_needs_no_marker() {
    let key = SecretKey::random(&mut OsRng);
    let config = ProtocolConfig {
        framing: Framing::Header,
    };
    let issued =
        issue_diploma(&background(120, 80), alchemy_draft(), &EcdsaP256, &key, &config).unwrap();

    let length = PayloadLength::for_config(&config, None).unwrap();
    let outcome = verify_diploma(&issued.image, length, &EcdsaP256, &key.public_key()).unwrap();
    assert!(outcome.is_valid());
}

#[test]
fn diploma_with_key_files() {
    let dir = tempfile::tempdir().unwrap();
    let files = KeyFiles::in_dir(dir.path(), "university");

    let mut protect = |confirm: bool| {
        assert!(confirm, "new keys should ask for confirmation");
        Ok::<_, Error>("philosopher's stone".to_string())
    };
    files
        .generate(Some(&mut protect as &mut dyn PassphrasePrompt))
        .unwrap();

    // The encrypted key cannot be used without its passphrase.
    assert!(matches!(
        files.load_private(&mut NoPassphrase),
        Err(Error::InvalidKey(_))
    ));
    let mut wrong = |_confirm: bool| Ok::<_, Error>("lead".to_string());
    let err = files.load_private(&mut wrong).unwrap_err();
    assert!(matches!(err, Error::InvalidKey(_)));
    assert!(!err.to_string().contains("lead"));

    let mut right = |_confirm: bool| Ok::<_, Error>("philosopher's stone".to_string());
    let secret = files.load_private(&mut right).unwrap();
    let public = files.load_public().unwrap();

    let issued = issue_diploma(
        &background(120, 80),
        alchemy_draft(),
        &EcdsaP256,
        &secret,
        &ProtocolConfig::default(),
    )
    .unwrap();
    let outcome = verify_diploma(
        &issued.image,
        PayloadLength::Known(issued.embedded_length),
        &EcdsaP256,
        &public,
    )
    .unwrap();
    assert!(outcome.is_valid());
}

#[test]
fn diploma_capacity_boundary() {
    let key = SecretKey::random(&mut OsRng);
    let issued = issue_diploma(
        &background(120, 80),
        alchemy_draft(),
        &EcdsaP256,
        &key,
        &ProtocolConfig::default(),
    )
    .unwrap();
    let needed = issued.embedded_length as u32;

    // A carrier with exactly as many pixels as the blob needs still works,
    // one fewer does not. ECDSA DER signatures vary by a couple of bytes, so
    // embed the already-signed record directly.
    let payload = blob::serialize(&issued.record);
    let exact = background(needed, 1);
    assert!(codec::embed(&exact, &payload).is_ok());
    let short = background(needed - 1, 1);
    assert!(matches!(
        codec::embed(&short, &payload),
        Err(Error::CapacityExceeded { .. })
    ));
    assert!(matches!(
        verify_diploma(
            &exact,
            PayloadLength::Known(payload.len() + 1),
            &EcdsaP256,
            &key.public_key()
        ),
        Err(Error::OutOfRange { .. })
    ));
}
