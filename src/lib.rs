//! # diploseal
//!
//! Signed diplomas hidden inside their own image.
//!
//! A diploma's metadata (title, recipient, date, average) is signed with the
//! issuer's ECDSA P-256 key, serialized to a printable blob, and written into
//! the least significant bits of an RGB carrier image. Anyone holding the
//! image, the payload length, and the issuer's public key can recover the
//! record and check the signature.
//!
//! ## Modules
//!
//! - [`codec`]: 7-bit LSB embedding (`1 + 3 + 3` bits per pixel)
//! - [`canonicalize`]: the exact string that gets signed
//! - [`blob`]: record wire form (base64 over JSON)
//! - [`signature`] / [`crypto`]: signing capability and ECDSA P-256 primitives
//! - [`keystore`]: PEM key files, optionally passphrase-encrypted
//! - [`protocol`]: issuance and verification
//!
//! ## Quick Start
//!
//! ```rust
//! use diploseal::codec::PixelGrid;
//! use diploseal::config::ProtocolConfig;
//! use diploseal::protocol::{issue_diploma, verify_diploma, PayloadLength};
//! use diploseal::signature::EcdsaP256;
//! use diploseal::types::diploma::DiplomaDraft;
//! use p256::SecretKey;
//!
//! let key = SecretKey::random(&mut rand::rngs::OsRng);
//! let carrier = PixelGrid::filled(64, 64, [240, 235, 220]);
//! let draft = DiplomaDraft::new("master en alchimie", "John Doe", "01/01/1970", 15);
//!
//! let issued = issue_diploma(&carrier, draft, &EcdsaP256, &key, &ProtocolConfig::default()).unwrap();
//! let outcome = verify_diploma(
//!     &issued.image,
//!     PayloadLength::Known(issued.embedded_length),
//!     &EcdsaP256,
//!     &key.public_key(),
//! )
//! .unwrap();
//! assert!(outcome.is_valid());
//! ```
//!
//! ## Limits
//!
//! Pixel values must survive exactly: any lossy re-encoding destroys the
//! payload. Characters above 127 lose their top bit. The payload is signed,
//! not encrypted.

pub mod blob;
pub mod canonicalize;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod error;
pub mod keystore;
pub mod protocol;
pub mod signature;
pub mod types;

pub use error::{Error, ErrorCode};
pub use protocol::{issue_diploma, verify_diploma, Outcome, PayloadLength};
