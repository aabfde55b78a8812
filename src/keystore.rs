//! Key files on disk.
//!
//! A key pair lives in two PEM files next to each other: `<stem>.pem` holds
//! the PKCS#8 private key (encrypted when created with a passphrase) and
//! `<stem>.pub.pem` the SPKI public key.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use p256::{PublicKey, SecretKey};
use tracing::{debug, info};

use crate::crypto::{self, KeyPair};
use crate::error::Error;
use crate::signature::{PassphrasePrompt, PrivateKeyHandle};

/// Paths of a private/public key file pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyFiles {
    pub private_key: PathBuf,
    pub public_key: PathBuf,
}

impl KeyFiles {
    pub fn new(private_key: impl Into<PathBuf>, public_key: impl Into<PathBuf>) -> Self {
        Self {
            private_key: private_key.into(),
            public_key: public_key.into(),
        }
    }

    /// `<dir>/<stem>.pem` and `<dir>/<stem>.pub.pem`.
    pub fn in_dir(dir: &Path, stem: &str) -> Self {
        Self::new(
            dir.join(format!("{}.pem", stem)),
            dir.join(format!("{}.pub.pem", stem)),
        )
    }

    /// Generate a fresh key pair and write both files.
    ///
    /// When `prompt` is given, the passphrase it returns (asked with
    /// confirmation) encrypts the private key. An empty passphrase leaves the
    /// key unencrypted.
    pub fn generate(&self, prompt: Option<&mut dyn PassphrasePrompt>) -> Result<KeyPair, Error> {
        let passphrase = match prompt {
            Some(p) => Some(p.acquire_passphrase(true)?).filter(|s| !s.is_empty()),
            None => None,
        };
        let key_pair = crypto::generate_key_pair(passphrase.as_deref())?;

        write_private(&self.private_key, &key_pair.private_key_pem)?;
        fs::write(&self.public_key, &key_pair.public_key_pem)?;

        info!(
            private_key = %self.private_key.display(),
            public_key = %self.public_key.display(),
            encrypted = passphrase.is_some(),
            "generated key pair"
        );
        Ok(key_pair)
    }

    /// Read and unlock the private key.
    pub fn load_private(&self, prompt: &mut dyn PassphrasePrompt) -> Result<SecretKey, Error> {
        read_private_key(&self.private_key, prompt)
    }

    pub fn load_public(&self) -> Result<PublicKey, Error> {
        read_public_key(&self.public_key)
    }
}

/// Read a private key file, prompting for a passphrase if it is encrypted.
pub fn read_private_key(path: &Path, prompt: &mut dyn PassphrasePrompt) -> Result<SecretKey, Error> {
    let handle = PrivateKeyHandle::from_pem(fs::read_to_string(path)?);
    debug!(path = %path.display(), encrypted = handle.is_encrypted(), "loading private key");
    handle.unlock(prompt)
}

/// Read a public key file.
pub fn read_public_key(path: &Path) -> Result<PublicKey, Error> {
    let pem = fs::read_to_string(path)?;
    debug!(path = %path.display(), "loading public key");
    crypto::load_public_key_pem(&pem)
}

#[cfg(unix)]
fn write_private(path: &Path, pem: &str) -> Result<(), Error> {
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(pem.as_bytes())?;
    Ok(())
}

#[cfg(not(unix))]
fn write_private(path: &Path, pem: &str) -> Result<(), Error> {
    let mut file = fs::File::create(path)?;
    file.write_all(pem.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::NoPassphrase;

    #[test]
    fn test_in_dir_paths() {
        let files = KeyFiles::in_dir(Path::new("/keys"), "issuer");
        assert_eq!(files.private_key, PathBuf::from("/keys/issuer.pem"));
        assert_eq!(files.public_key, PathBuf::from("/keys/issuer.pub.pem"));
    }

    #[test]
    fn test_generate_and_load_plain() {
        let dir = tempfile::tempdir().unwrap();
        let files = KeyFiles::in_dir(dir.path(), "issuer");
        files.generate(None).unwrap();

        let secret = files.load_private(&mut NoPassphrase).unwrap();
        let public = files.load_public().unwrap();
        assert_eq!(secret.public_key(), public);
    }

    #[test]
    fn test_empty_passphrase_leaves_key_plain() {
        let dir = tempfile::tempdir().unwrap();
        let files = KeyFiles::in_dir(dir.path(), "issuer");
        let mut prompt = |_confirm: bool| Ok::<_, Error>(String::new());
        let kp = files.generate(Some(&mut prompt)).unwrap();
        assert!(!crypto::is_encrypted_pem(&kp.private_key_pem));
    }

    #[cfg(unix)]
    #[test]
    fn test_private_key_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let files = KeyFiles::in_dir(dir.path(), "issuer");
        files.generate(None).unwrap();
        let mode = fs::metadata(&files.private_key).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let files = KeyFiles::in_dir(dir.path(), "absent");
        assert!(matches!(files.load_public(), Err(Error::Io(_))));
        assert!(matches!(
            files.load_private(&mut NoPassphrase),
            Err(Error::Io(_))
        ));
    }
}
