//! Key material for node identities.
//!
//! A node identity is backed by one of four asymmetric algorithms. Each
//! [`KeyPair`] variant knows how to generate itself, serialize its private
//! half into the libp2p private key envelope, and derive its public key and
//! [`PeerId`].

use std::fmt;
use std::io::Write;

use libp2p::identity::{self, ecdsa, ed25519, secp256k1, KeyType, PeerId, PublicKey};
use prost::Message;
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey};
use rsa::pkcs8::EncodePublicKey;
use rsa::RsaPrivateKey;
use tracing::{debug, info, warn};
use zeroize::{Zeroize, Zeroizing};

use crate::error::{Error, Result};

/// Smallest key size accepted for fresh key generation.
pub const MIN_KEY_BITS: usize = 1024;

/// Asymmetric algorithms a node identity can be generated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAlgorithm {
    Rsa,
    Ed25519,
    Secp256k1,
    Ecdsa,
}

impl KeyAlgorithm {
    /// All supported algorithms.
    pub const ALL: [KeyAlgorithm; 4] = [
        KeyAlgorithm::Rsa,
        KeyAlgorithm::Ed25519,
        KeyAlgorithm::Secp256k1,
        KeyAlgorithm::Ecdsa,
    ];

    /// The algorithm used when a requested name is not recognized.
    pub const FALLBACK: KeyAlgorithm = KeyAlgorithm::Ecdsa;

    /// Looks up an algorithm by its exact, case-sensitive name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "RSA" => Some(KeyAlgorithm::Rsa),
            "Ed25519" => Some(KeyAlgorithm::Ed25519),
            "Secp256k1" => Some(KeyAlgorithm::Secp256k1),
            "ECDSA" => Some(KeyAlgorithm::Ecdsa),
            _ => None,
        }
    }

    /// Resolves a requested name, substituting [`KeyAlgorithm::FALLBACK`] for
    /// anything unrecognized.
    ///
    /// A substitution is flagged in the returned [`Resolution`] and logged as
    /// a warning. Callers that need to reject unknown names should use
    /// [`KeyAlgorithm::from_name`] instead.
    pub fn resolve(name: &str) -> Resolution {
        match Self::from_name(name) {
            Some(algorithm) => Resolution { algorithm, fell_back: false },
            None => {
                warn!(
                    requested = name,
                    resolved = Self::FALLBACK.name(),
                    "Unrecognized key type, falling back to default algorithm"
                );
                Resolution { algorithm: Self::FALLBACK, fell_back: true }
            }
        }
    }

    /// The canonical name of the algorithm.
    pub fn name(&self) -> &'static str {
        match self {
            KeyAlgorithm::Rsa => "RSA",
            KeyAlgorithm::Ed25519 => "Ed25519",
            KeyAlgorithm::Secp256k1 => "Secp256k1",
            KeyAlgorithm::Ecdsa => "ECDSA",
        }
    }

    /// Key type tag used in the private key envelope.
    fn envelope_tag(&self) -> i32 {
        match self {
            KeyAlgorithm::Rsa => 0,
            KeyAlgorithm::Ed25519 => 1,
            KeyAlgorithm::Secp256k1 => 2,
            KeyAlgorithm::Ecdsa => 3,
        }
    }

    fn from_envelope_tag(tag: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|algorithm| algorithm.envelope_tag() == tag)
    }
}

/// Outcome of resolving a requested algorithm name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// The algorithm that will be used
    pub algorithm: KeyAlgorithm,
    /// True when the requested name was not recognized
    pub fell_back: bool,
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The serialized form of a private key: `PrivateKey { Type = 1, Data = 2 }`.
#[derive(Clone, PartialEq, Message)]
#[prost(skip_debug)]
struct PrivateKeyEnvelope {
    #[prost(int32, required, tag = "1")]
    key_type: i32,
    #[prost(bytes = "vec", required, tag = "2")]
    data: Vec<u8>,
}

impl fmt::Debug for PrivateKeyEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKeyEnvelope")
            .field("key_type", &self.key_type)
            .finish_non_exhaustive()
    }
}

/// A public/private key pair under one of the supported algorithms.
#[derive(Clone)]
pub enum KeyPair {
    Rsa(Box<RsaPrivateKey>),
    Ed25519(ed25519::Keypair),
    Secp256k1(secp256k1::Keypair),
    Ecdsa(ecdsa::Keypair),
}

impl KeyPair {
    /// Generates a fresh key pair.
    ///
    /// `bits` is the modulus size for RSA. The curve-based algorithms have a
    /// fixed strength and ignore it. RSA generation at large sizes can take
    /// several seconds and blocks the calling thread.
    pub fn generate(algorithm: KeyAlgorithm, bits: usize) -> Result<Self> {
        match algorithm {
            KeyAlgorithm::Rsa => {
                let mut rng = rand::thread_rng();
                let secret = RsaPrivateKey::new(&mut rng, bits)
                    .map_err(|e| Error::GenerationFailure(format!("RSA-{bits}: {e}")))?;
                Ok(KeyPair::Rsa(Box::new(secret)))
            }
            KeyAlgorithm::Ed25519 => Ok(KeyPair::Ed25519(ed25519::Keypair::generate())),
            KeyAlgorithm::Secp256k1 => Ok(KeyPair::Secp256k1(secp256k1::Keypair::generate())),
            KeyAlgorithm::Ecdsa => Ok(KeyPair::Ecdsa(ecdsa::Keypair::generate())),
        }
    }

    /// Reconstructs a key pair from a raw 32-byte secp256k1 secret scalar.
    ///
    /// The input buffer is zeroed.
    pub fn from_secp256k1_bytes(secret: &mut [u8]) -> Result<Self> {
        let secret = secp256k1::SecretKey::try_from_bytes(secret).map_err(|e| {
            Error::MalformedKeyMaterial(format!("invalid secp256k1 private key: {e}"))
        })?;
        Ok(KeyPair::Secp256k1(secp256k1::Keypair::from(secret)))
    }

    /// Reconstructs a key pair from its serialized private key envelope,
    /// as produced by [`KeyPair::to_private_bytes`].
    pub fn from_private_bytes(bytes: &[u8]) -> Result<Self> {
        let mut envelope = PrivateKeyEnvelope::decode(bytes)
            .map_err(|e| Error::MalformedKeyMaterial(format!("invalid private key envelope: {e}")))?;

        let result = match KeyAlgorithm::from_envelope_tag(envelope.key_type) {
            Some(KeyAlgorithm::Rsa) => RsaPrivateKey::from_pkcs1_der(&envelope.data)
                .map(|secret| KeyPair::Rsa(Box::new(secret)))
                .map_err(|e| Error::MalformedKeyMaterial(format!("invalid RSA private key: {e}"))),
            Some(_) => identity::Keypair::from_protobuf_encoding(bytes)
                .map_err(|e| Error::MalformedKeyMaterial(e.to_string()))
                .and_then(Self::from_libp2p),
            None => Err(Error::MalformedKeyMaterial(format!(
                "unknown key type tag {}",
                envelope.key_type
            ))),
        };

        envelope.data.zeroize();
        result
    }

    fn from_libp2p(keypair: identity::Keypair) -> Result<Self> {
        let mismatch = |e: identity::OtherVariantError| Error::MalformedKeyMaterial(e.to_string());
        match keypair.key_type() {
            KeyType::Ed25519 => keypair.try_into_ed25519().map(KeyPair::Ed25519).map_err(mismatch),
            KeyType::Secp256k1 => keypair.try_into_secp256k1().map(KeyPair::Secp256k1).map_err(mismatch),
            KeyType::Ecdsa => keypair.try_into_ecdsa().map(KeyPair::Ecdsa).map_err(mismatch),
            _ => Err(Error::MalformedKeyMaterial(
                "RSA keys must be carried as PKCS#1".to_string(),
            )),
        }
    }

    /// The algorithm this key pair belongs to.
    pub fn algorithm(&self) -> KeyAlgorithm {
        match self {
            KeyPair::Rsa(_) => KeyAlgorithm::Rsa,
            KeyPair::Ed25519(_) => KeyAlgorithm::Ed25519,
            KeyPair::Secp256k1(_) => KeyAlgorithm::Secp256k1,
            KeyPair::Ecdsa(_) => KeyAlgorithm::Ecdsa,
        }
    }

    /// Serializes the private key into its canonical envelope bytes.
    pub fn to_private_bytes(&self) -> Result<Zeroizing<Vec<u8>>> {
        let algorithm = self.algorithm();
        match self {
            KeyPair::Rsa(secret) => {
                let der = secret.to_pkcs1_der().map_err(|e| serialization_failure(algorithm, e))?;
                let mut envelope = PrivateKeyEnvelope {
                    key_type: KeyAlgorithm::Rsa.envelope_tag(),
                    data: der.as_bytes().to_vec(),
                };
                let encoded = Zeroizing::new(envelope.encode_to_vec());
                envelope.data.zeroize();
                Ok(encoded)
            }
            KeyPair::Ed25519(keypair) => identity::Keypair::from(keypair.clone())
                .to_protobuf_encoding()
                .map(Zeroizing::new)
                .map_err(|e| serialization_failure(algorithm, e)),
            KeyPair::Secp256k1(keypair) => identity::Keypair::from(keypair.clone())
                .to_protobuf_encoding()
                .map(Zeroizing::new)
                .map_err(|e| serialization_failure(algorithm, e)),
            KeyPair::Ecdsa(keypair) => identity::Keypair::from(keypair.clone())
                .to_protobuf_encoding()
                .map(Zeroizing::new)
                .map_err(|e| serialization_failure(algorithm, e)),
        }
    }

    /// Derives the public half of the key pair.
    pub fn public(&self) -> Result<PublicKey> {
        match self {
            KeyPair::Rsa(secret) => {
                let spki = secret
                    .to_public_key()
                    .to_public_key_der()
                    .map_err(|e| Error::DerivationFailure(format!("RSA public key: {e}")))?;
                let public = identity::rsa::PublicKey::try_decode_x509(spki.as_bytes())
                    .map_err(|e| Error::DerivationFailure(format!("RSA public key: {e}")))?;
                Ok(PublicKey::from(public))
            }
            KeyPair::Ed25519(keypair) => Ok(keypair.public().into()),
            KeyPair::Secp256k1(keypair) => Ok(keypair.public().clone().into()),
            KeyPair::Ecdsa(keypair) => Ok(keypair.public().clone().into()),
        }
    }

    /// Derives the peer ID announced for this key pair.
    pub fn peer_id(&self) -> Result<PeerId> {
        Ok(self.public()?.to_peer_id())
    }
}

fn serialization_failure(algorithm: KeyAlgorithm, e: impl fmt::Display) -> Error {
    Error::SerializationFailure(format!("{algorithm} private key: {e}"))
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("algorithm", &self.algorithm())
            .finish_non_exhaustive()
    }
}

/// Produces the key pair for a new node.
///
/// With an empty `import_hex` a fresh key pair is generated for the named
/// algorithm (unknown names resolve to ECDSA) and `bits` must be at least
/// [`MIN_KEY_BITS`]. Otherwise `import_hex` is decoded as a raw secp256k1
/// private key and `algorithm` and `bits` are ignored.
///
/// Progress lines go to `out`. Requests rejected up front write nothing.
pub fn provide_key_material<W: Write + ?Sized>(
    out: &mut W,
    algorithm: &str,
    bits: usize,
    import_hex: &str,
) -> Result<KeyPair> {
    if !import_hex.is_empty() {
        return import_secp256k1(out, import_hex);
    }

    if bits < MIN_KEY_BITS {
        return Err(Error::UnsafeKeySize { requested: bits, minimum: MIN_KEY_BITS });
    }

    let Resolution { algorithm, .. } = KeyAlgorithm::resolve(algorithm);
    info!(%algorithm, bits, "Generating node keypair");

    progress(out, format_args!("generating {bits}-bit {algorithm} keypair..."));
    let key_pair = KeyPair::generate(algorithm, bits)?;
    progress(out, format_args!("done\n"));

    Ok(key_pair)
}

fn import_secp256k1<W: Write + ?Sized>(out: &mut W, import_hex: &str) -> Result<KeyPair> {
    let mut secret = Zeroizing::new(hex::decode(import_hex).map_err(|e| {
        Error::MalformedImportEncoding(format!("cannot decode import key from hex: {e}"))
    })?);

    let key_pair = KeyPair::from_secp256k1_bytes(secret.as_mut_slice())?;

    info!("Imported secp256k1 node keypair");
    progress(out, format_args!("generating node keypair with imported secp256k1 key..."));
    progress(out, format_args!("done\n"));

    Ok(key_pair)
}

/// Writes a progress notice. Sink failures never abort provisioning.
pub(crate) fn progress<W: Write + ?Sized>(out: &mut W, message: fmt::Arguments<'_>) {
    if let Err(e) = out.write_fmt(message).and_then(|_| out.flush()) {
        debug!("Failed to write progress notice: {}", e);
    }
}
