//! Protocol options shared by issuer and verifier.
//!
//! Both sides must agree on [`Framing`]: a diploma issued with an embedded
//! length header cannot be read with an out-of-band length and vice versa.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// How the hidden payload length is transmitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum Framing {
    /// Length travels beside the image (rendered on it or recorded by the
    /// caller). Compatible with the original layout.
    #[default]
    External,
    /// A fixed-width length header is embedded ahead of the payload.
    Header,
}

/// Configuration for issuing and verifying diplomas.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProtocolConfig {
    pub framing: Framing,
}

impl ProtocolConfig {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        Self::from_json(&data)
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
