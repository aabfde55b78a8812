//! Diploma issuance and verification.
//!
//! Issuance: draft → canonical string → signature → blob → pixels.
//! Verification runs the same chain backwards and re-signs nothing: it
//! recomputes the canonical string from the decoded fields and checks the
//! embedded signature against it.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::blob;
use crate::canonicalize::{canonical_digest, canonicalize_draft, canonicalize_record};
use crate::codec::{self, PixelGrid};
use crate::config::{Framing, ProtocolConfig};
use crate::error::{Error, ErrorCode};
use crate::signature::SignatureService;
use crate::types::diploma::{DiplomaDraft, DiplomaRecord, Grade};

/// Steps of the issue path. A failure in any step aborts issuance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueStage {
    Start,
    CanonicalComputed,
    Signed,
    Serialized,
    Embedded,
    Done,
}

/// Steps of the verify path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyStage {
    Start,
    Extracted,
    Deserialized,
    CanonicalRecomputed,
    Verified,
    Done,
}

impl fmt::Display for IssueStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IssueStage::Start => "start",
            IssueStage::CanonicalComputed => "canonical_computed",
            IssueStage::Signed => "signed",
            IssueStage::Serialized => "serialized",
            IssueStage::Embedded => "embedded",
            IssueStage::Done => "done",
        };
        f.write_str(s)
    }
}

impl fmt::Display for VerifyStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VerifyStage::Start => "start",
            VerifyStage::Extracted => "extracted",
            VerifyStage::Deserialized => "deserialized",
            VerifyStage::CanonicalRecomputed => "canonical_recomputed",
            VerifyStage::Verified => "verified",
            VerifyStage::Done => "done",
        };
        f.write_str(s)
    }
}

/// How the verifier learns the hidden payload length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadLength {
    /// Out-of-band length, e.g. read off the visible marker.
    Known(usize),
    /// Read from the embedded length header.
    Framed,
}

impl PayloadLength {
    /// The length source matching `config`, given a visible marker value.
    pub fn for_config(config: &ProtocolConfig, marker: Option<usize>) -> Result<Self, Error> {
        match (config.framing, marker) {
            (Framing::Header, _) => Ok(PayloadLength::Framed),
            (Framing::External, Some(n)) => Ok(PayloadLength::Known(n)),
            (Framing::External, None) => Err(Error::Config(
                "external framing needs the visible length marker".to_string(),
            )),
        }
    }
}

/// Result of a successful issuance.
#[derive(Debug, Clone)]
pub struct IssuedDiploma {
    pub image: PixelGrid,
    /// Blob length in characters; render or record it beside the image.
    pub embedded_length: usize,
    pub record: DiplomaRecord,
}

/// Terminal result of a completed verification. An invalid signature is an
/// ordinary outcome, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Valid(DiplomaRecord),
    Invalid(DiplomaRecord),
}

impl Outcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Outcome::Valid(_))
    }

    pub fn record(&self) -> &DiplomaRecord {
        match self {
            Outcome::Valid(r) | Outcome::Invalid(r) => r,
        }
    }
}

/// Sign `draft` and hide the signed record in a copy of `carrier`.
///
/// No image is produced if signing, serialization, or embedding fails.
pub fn issue_diploma<S: SignatureService>(
    carrier: &PixelGrid,
    draft: DiplomaDraft,
    service: &S,
    signing_key: &S::SigningKey,
    config: &ProtocolConfig,
) -> Result<IssuedDiploma, Error> {
    debug!(stage = %IssueStage::Start, "issuing diploma");

    let canonical = canonicalize_draft(&draft);
    let digest = canonical_digest(&canonical);
    debug!(stage = %IssueStage::CanonicalComputed, canonical_sha256 = %digest);

    let signature = service.sign(canonical.as_bytes(), signing_key)?;
    debug!(stage = %IssueStage::Signed, signature_len = signature.len());

    let record = draft.with_signature(signature);
    let payload = blob::serialize(&record);
    let embedded_length = payload.len();
    debug!(stage = %IssueStage::Serialized, embedded_length);

    let image = match config.framing {
        Framing::External => codec::embed(carrier, &payload)?,
        Framing::Header => codec::embed_framed(carrier, &payload)?,
    };
    debug!(stage = %IssueStage::Embedded, framing = ?config.framing);

    info!(
        stage = %IssueStage::Done,
        canonical_sha256 = %digest,
        embedded_length,
        "diploma issued"
    );
    Ok(IssuedDiploma {
        image,
        embedded_length,
        record,
    })
}

/// Extract the signed record from `image` and check its signature.
///
/// # Errors
///
/// - [`Error::OutOfRange`] if the length exceeds the image capacity.
/// - [`Error::CorruptPayload`] if the extracted characters do not decode to a
///   record.
pub fn verify_diploma<S: SignatureService>(
    image: &PixelGrid,
    length: PayloadLength,
    service: &S,
    verifying_key: &S::VerifyingKey,
) -> Result<Outcome, Error> {
    debug!(stage = %VerifyStage::Start, ?length, "verifying diploma");

    let payload = extract_payload(image, length)?;
    debug!(stage = %VerifyStage::Extracted, payload_len = payload.len());

    let record = blob::deserialize(&payload).map_err(|e| match e {
        Error::MalformedBlob(msg) => Error::CorruptPayload(msg),
        other => other,
    })?;
    debug!(stage = %VerifyStage::Deserialized);

    let canonical = canonicalize_record(&record);
    let digest = canonical_digest(&canonical);
    debug!(stage = %VerifyStage::CanonicalRecomputed, canonical_sha256 = %digest);

    let ok = service.verify(canonical.as_bytes(), &record.signature, verifying_key);
    debug!(stage = %VerifyStage::Verified, valid = ok);

    if ok {
        info!(stage = %VerifyStage::Done, canonical_sha256 = %digest, "diploma signature valid");
        Ok(Outcome::Valid(record))
    } else {
        warn!(stage = %VerifyStage::Done, canonical_sha256 = %digest, "diploma signature invalid");
        Ok(Outcome::Invalid(record))
    }
}

/// Hide a free-form message. Returns the image and the message length.
pub fn hide_message(
    grid: &PixelGrid,
    message: &str,
    config: &ProtocolConfig,
) -> Result<(PixelGrid, usize), Error> {
    let image = match config.framing {
        Framing::External => codec::embed(grid, message)?,
        Framing::Header => codec::embed_framed(grid, message)?,
    };
    Ok((image, message.chars().count()))
}

/// Recover a message hidden by [`hide_message`].
pub fn unveil_message(grid: &PixelGrid, length: PayloadLength) -> Result<String, Error> {
    extract_payload(grid, length)
}

fn extract_payload(image: &PixelGrid, length: PayloadLength) -> Result<String, Error> {
    match length {
        PayloadLength::Known(n) => codec::extract(image, n),
        PayloadLength::Framed => codec::extract_framed(image),
    }
}

/// Structured verification summary, suitable for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average: Option<Grade>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub checked_at: String,
}

impl VerificationReport {
    pub fn from_outcome(outcome: &Outcome, key_id: Option<&str>) -> Self {
        let record = outcome.record();
        let valid = outcome.is_valid();
        Self {
            valid,
            title: Some(record.title.clone()),
            recipient_name: Some(record.recipient_name.clone()),
            date: Some(record.date.clone()),
            average: Some(record.average),
            key_id: key_id.map(|s| s.to_string()),
            error_code: (!valid).then_some(ErrorCode::SignatureMismatch),
            error_message: (!valid).then(|| "Diploma signature is invalid".to_string()),
            checked_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn failure(error: &Error, key_id: Option<&str>) -> Self {
        Self {
            valid: false,
            title: None,
            recipient_name: None,
            date: None,
            average: None,
            key_id: key_id.map(|s| s.to_string()),
            error_code: Some(error.code()),
            error_message: Some(error.to_string()),
            checked_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn from_result(result: &Result<Outcome, Error>, key_id: Option<&str>) -> Self {
        match result {
            Ok(outcome) => Self::from_outcome(outcome, key_id),
            Err(e) => Self::failure(e, key_id),
        }
    }
}
