//! Signature capability used by the diploma protocol.
//!
//! The protocol only needs `sign` and `verify`; [`SignatureService`] is the
//! seam, with [`EcdsaP256`] as the shipped implementation. Key material is
//! referenced through handles so callers decide where keys come from.

use std::path::PathBuf;

use p256::{PublicKey, SecretKey};

use crate::crypto;
use crate::error::Error;

/// Asymmetric sign/verify over raw message bytes.
pub trait SignatureService: Send + Sync {
    type SigningKey;
    type VerifyingKey;

    /// Sign `message`. Fails with [`Error::InvalidKey`] if the key is unusable.
    fn sign(&self, message: &[u8], key: &Self::SigningKey) -> Result<Vec<u8>, Error>;

    /// Check `signature` over `message`. Any mismatch, including a malformed
    /// signature, is `false`.
    fn verify(&self, message: &[u8], signature: &[u8], key: &Self::VerifyingKey) -> bool;
}

/// ECDSA over P-256 with SHA-256, DER signatures.
#[derive(Debug, Clone, Copy, Default)]
pub struct EcdsaP256;

impl SignatureService for EcdsaP256 {
    type SigningKey = SecretKey;
    type VerifyingKey = PublicKey;

    fn sign(&self, message: &[u8], key: &SecretKey) -> Result<Vec<u8>, Error> {
        Ok(crypto::sign_data(key, message))
    }

    fn verify(&self, message: &[u8], signature: &[u8], key: &PublicKey) -> bool {
        crypto::verify_signature(key, message, signature)
    }
}

/// Supplies passphrases for encrypted private keys.
///
/// `confirm` asks the source to collect the passphrase twice (used when a
/// new key is being protected).
pub trait PassphrasePrompt {
    fn acquire_passphrase(&mut self, confirm: bool) -> Result<String, Error>;
}

impl<F> PassphrasePrompt for F
where
    F: FnMut(bool) -> Result<String, Error>,
{
    fn acquire_passphrase(&mut self, confirm: bool) -> Result<String, Error> {
        self(confirm)
    }
}

/// Prompt for keys that are never encrypted. Asking it for a passphrase fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPassphrase;

impl PassphrasePrompt for NoPassphrase {
    fn acquire_passphrase(&mut self, _confirm: bool) -> Result<String, Error> {
        Err(Error::InvalidKey(
            "private key is encrypted and no passphrase source is available".to_string(),
        ))
    }
}

/// A private key still in PEM form, unlocked on demand.
#[derive(Clone)]
pub struct PrivateKeyHandle {
    pem: String,
}

impl PrivateKeyHandle {
    pub fn from_pem(pem: impl Into<String>) -> Self {
        Self { pem: pem.into() }
    }

    pub fn is_encrypted(&self) -> bool {
        crypto::is_encrypted_pem(&self.pem)
    }

    /// Parse the key, asking `prompt` for a passphrase only if the PEM is
    /// encrypted.
    pub fn unlock(&self, prompt: &mut dyn PassphrasePrompt) -> Result<SecretKey, Error> {
        if self.is_encrypted() {
            let passphrase = prompt.acquire_passphrase(false)?;
            crypto::load_private_key_pem(&self.pem, Some(&passphrase))
        } else {
            crypto::load_private_key_pem(&self.pem, None)
        }
    }
}

impl std::fmt::Debug for PrivateKeyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKeyHandle")
            .field("encrypted", &self.is_encrypted())
            .finish_non_exhaustive()
    }
}

/// Where a detached signature comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureSource {
    FilePath(PathBuf),
    Bytes(Vec<u8>),
}

impl SignatureSource {
    /// Load the signature bytes.
    pub fn resolve(self) -> Result<Vec<u8>, Error> {
        match self {
            SignatureSource::FilePath(path) => Ok(std::fs::read(path)?),
            SignatureSource::Bytes(bytes) => Ok(bytes),
        }
    }
}

impl From<Vec<u8>> for SignatureSource {
    fn from(bytes: Vec<u8>) -> Self {
        SignatureSource::Bytes(bytes)
    }
}

impl From<PathBuf> for SignatureSource {
    fn from(path: PathBuf) -> Self {
        SignatureSource::FilePath(path)
    }
}

/// Sign an arbitrary message with a detached signature.
pub fn sign_message<S: SignatureService>(
    service: &S,
    message: &str,
    key: &S::SigningKey,
) -> Result<Vec<u8>, Error> {
    service.sign(message.as_bytes(), key)
}

/// Verify a detached signature over an arbitrary message.
///
/// Only resolving the signature source can fail; a mismatch is `Ok(false)`.
pub fn verify_message<S: SignatureService>(
    service: &S,
    message: &str,
    signature: SignatureSource,
    key: &S::VerifyingKey,
) -> Result<bool, Error> {
    let signature = signature.resolve()?;
    Ok(service.verify(message.as_bytes(), &signature, key))
}
