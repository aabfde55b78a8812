use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Payload of {required} characters exceeds carrier capacity of {available} pixels")]
    CapacityExceeded { required: usize, available: usize },

    #[error("Requested {requested} characters but carrier only holds {available} pixels")]
    OutOfRange { requested: usize, available: usize },

    #[error("Malformed blob: {0}")]
    MalformedBlob(String),

    #[error("Corrupt payload: {0}")]
    CorruptPayload(String),

    /// Key could not be parsed or unlocked. Never carries key material.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Average must be a finite number")]
    InvalidGrade,

    #[error("Pixel buffer of {len} bytes does not match {width}x{height} RGB image")]
    InvalidDimensions {
        width: u32,
        height: u32,
        len: usize,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable code for this error, used in structured reports.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::CapacityExceeded { .. } => ErrorCode::CapacityExceeded,
            Error::OutOfRange { .. } => ErrorCode::OutOfRange,
            Error::MalformedBlob(_) | Error::Base64(_) | Error::Json(_) => {
                ErrorCode::MalformedBlob
            }
            Error::CorruptPayload(_) => ErrorCode::CorruptPayload,
            Error::InvalidKey(_) => ErrorCode::InvalidKey,
            Error::InvalidGrade => ErrorCode::InvalidGrade,
            Error::InvalidDimensions { .. } => ErrorCode::InvalidDimensions,
            Error::Config(_) => ErrorCode::Config,
            Error::Io(_) => ErrorCode::Io,
        }
    }
}

impl From<p256::pkcs8::Error> for Error {
    fn from(err: p256::pkcs8::Error) -> Self {
        // The underlying message names only the failing structure (e.g. a
        // decryption or ASN.1 error), never the key bytes.
        Error::InvalidKey(err.to_string())
    }
}

impl From<p256::pkcs8::spki::Error> for Error {
    fn from(err: p256::pkcs8::spki::Error) -> Self {
        Error::InvalidKey(err.to_string())
    }
}

/// Error codes for structured verification results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    CapacityExceeded,
    OutOfRange,
    MalformedBlob,
    CorruptPayload,
    InvalidKey,
    InvalidGrade,
    InvalidDimensions,
    SignatureMismatch,
    Config,
    Io,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorCode::CapacityExceeded => "CAPACITY_EXCEEDED",
            ErrorCode::OutOfRange => "OUT_OF_RANGE",
            ErrorCode::MalformedBlob => "MALFORMED_BLOB",
            ErrorCode::CorruptPayload => "CORRUPT_PAYLOAD",
            ErrorCode::InvalidKey => "INVALID_KEY",
            ErrorCode::InvalidGrade => "INVALID_GRADE",
            ErrorCode::InvalidDimensions => "INVALID_DIMENSIONS",
            ErrorCode::SignatureMismatch => "SIGNATURE_MISMATCH",
            ErrorCode::Config => "CONFIG",
            ErrorCode::Io => "IO",
        };
        write!(f, "{}", s)
    }
}
