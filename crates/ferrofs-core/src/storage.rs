//! Text encoding of private keys for the node configuration file.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// Converts serialized private key bytes to the text stored in the
/// configuration, and back.
///
/// This is the only place the at-rest form of a key is decided. An
/// encrypting implementation can replace [`PlaintextBase64`] without changes
/// to key generation or peer ID derivation.
pub trait PrivateKeyCodec {
    /// Encodes serialized private key bytes for storage.
    fn encode(&self, key_bytes: &[u8]) -> Result<String>;

    /// Recovers serialized private key bytes from their stored form.
    fn decode(&self, stored: &str) -> Result<Zeroizing<Vec<u8>>>;
}

/// Standard-alphabet base64 with no encryption.
///
/// Keys stored this way are readable by anyone who can read the
/// configuration file.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaintextBase64;

impl PrivateKeyCodec for PlaintextBase64 {
    fn encode(&self, key_bytes: &[u8]) -> Result<String> {
        Ok(STANDARD.encode(key_bytes))
    }

    fn decode(&self, stored: &str) -> Result<Zeroizing<Vec<u8>>> {
        STANDARD
            .decode(stored)
            .map(Zeroizing::new)
            .map_err(|e| Error::MalformedImportEncoding(format!("invalid base64 private key: {e}")))
    }
}
