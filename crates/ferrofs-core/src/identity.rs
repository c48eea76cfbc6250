//! Node identity for the Ferrofs network.
//!
//! An [`Identity`] is the pair of fields persisted in the node
//! configuration: the encoded private key and the peer ID derived from its
//! public half. The peer ID must always be re-derivable from the stored
//! private key.

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use libp2p::PeerId;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::keys::{self, KeyPair};
use crate::storage::{PlaintextBase64, PrivateKeyCodec};

/// The persisted identity of a node.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(rename = "PeerID")]
    peer_id: String,
    #[serde(rename = "PrivKey")]
    priv_key: String,
}

impl Identity {
    /// Provisions a new identity: generates or imports the key pair, then
    /// encodes it.
    ///
    /// See [`keys::provide_key_material`] for how `key_type`, `bits` and
    /// `import_key` are interpreted.
    pub fn provision<W: Write + ?Sized>(
        out: &mut W,
        key_type: &str,
        bits: usize,
        import_key: &str,
    ) -> Result<Self> {
        let key_pair = keys::provide_key_material(out, key_type, bits, import_key)?;
        encode_identity(&key_pair, out)
    }

    /// The peer ID in its printable form.
    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }

    /// The stored private key text.
    pub fn priv_key(&self) -> &str {
        &self.priv_key
    }

    /// Decodes the stored private key with the default codec.
    pub fn decode_key_pair(&self) -> Result<KeyPair> {
        self.decode_key_pair_with(&PlaintextBase64)
    }

    /// Decodes the stored private key with the given codec.
    pub fn decode_key_pair_with<C: PrivateKeyCodec + ?Sized>(&self, codec: &C) -> Result<KeyPair> {
        let bytes = codec.decode(&self.priv_key)?;
        KeyPair::from_private_bytes(&bytes)
    }

    /// Re-derives the peer ID from the stored private key and checks it
    /// against the stored peer ID.
    pub fn verify(&self) -> Result<PeerId> {
        self.verify_with(&PlaintextBase64)
    }

    /// Same as [`Identity::verify`] with an explicit codec.
    pub fn verify_with<C: PrivateKeyCodec + ?Sized>(&self, codec: &C) -> Result<PeerId> {
        let derived = self.decode_key_pair_with(codec)?.peer_id()?;
        let stored = PeerId::from_str(&self.peer_id)
            .map_err(|e| Error::DerivationFailure(format!("stored peer ID is invalid: {e}")))?;

        if derived != stored {
            return Err(Error::DerivationFailure(format!(
                "stored peer ID {} does not match key (derived {})",
                stored, derived
            )));
        }
        Ok(derived)
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("peer_id", &self.peer_id)
            .finish_non_exhaustive()
    }
}

/// Encodes a key pair into an [`Identity`] using plaintext base64 storage.
pub fn encode_identity<W: Write + ?Sized>(key_pair: &KeyPair, out: &mut W) -> Result<Identity> {
    encode_identity_with(&PlaintextBase64, key_pair, out)
}

/// Encodes a key pair into an [`Identity`], storing the private key through
/// `codec`.
///
/// Writes the resulting peer ID to `out`.
pub fn encode_identity_with<C, W>(codec: &C, key_pair: &KeyPair, out: &mut W) -> Result<Identity>
where
    C: PrivateKeyCodec + ?Sized,
    W: Write + ?Sized,
{
    let key_bytes = key_pair.to_private_bytes()?;
    let priv_key = codec.encode(&key_bytes)?;
    let peer_id = key_pair.peer_id()?.to_base58();

    info!(peer_id = %peer_id, algorithm = %key_pair.algorithm(), "Node identity created");
    keys::progress(out, format_args!("peer identity: {peer_id}\n"));

    Ok(Identity { peer_id, priv_key })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{KeyAlgorithm, MIN_KEY_BITS};

    const SECP256K1_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_round_trip_for_every_algorithm() {
        for algorithm in KeyAlgorithm::ALL {
            let mut out = Vec::new();
            let identity = Identity::provision(&mut out, algorithm.name(), MIN_KEY_BITS, "").unwrap();

            let restored = identity.decode_key_pair().unwrap();
            assert_eq!(restored.algorithm(), algorithm);
            assert_eq!(restored.peer_id().unwrap().to_base58(), identity.peer_id());
            assert_eq!(identity.verify().unwrap().to_base58(), identity.peer_id());
        }
    }

    #[test]
    fn test_rsa_round_trip_sizes() {
        // Sizes above the floor, including one that is not a whole number of bytes
        for bits in [1025, 2048] {
            let mut out = Vec::new();
            let identity = Identity::provision(&mut out, "RSA", bits, "").unwrap();

            let restored = identity.decode_key_pair().unwrap();
            assert_eq!(restored.algorithm(), KeyAlgorithm::Rsa);
            assert_eq!(identity.verify().unwrap().to_base58(), identity.peer_id());
            // RSA public keys are too long for an identity multihash
            assert!(identity.peer_id().starts_with("Qm"));
        }
    }

    #[test]
    fn test_progress_output() {
        let mut out = Vec::new();
        let identity = Identity::provision(&mut out, "Ed25519", 2048, "").unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            format!(
                "generating 2048-bit Ed25519 keypair...done\npeer identity: {}\n",
                identity.peer_id()
            )
        );
    }

    #[test]
    fn test_unsafe_bits_produce_nothing() {
        let mut out = Vec::new();
        let result = Identity::provision(&mut out, "Ed25519", 1023, "");
        assert!(matches!(result, Err(Error::UnsafeKeySize { requested: 1023, .. })));
        assert!(out.is_empty());
    }

    #[test]
    fn test_unknown_algorithm_matches_ecdsa_structure() {
        let mut out = Vec::new();
        let fallback = Identity::provision(&mut out, "unknown", MIN_KEY_BITS, "").unwrap();
        let explicit = Identity::provision(&mut out, "ECDSA", MIN_KEY_BITS, "").unwrap();

        let fallback_pair = fallback.decode_key_pair().unwrap();
        let explicit_pair = explicit.decode_key_pair().unwrap();
        assert_eq!(fallback_pair.algorithm(), KeyAlgorithm::Ecdsa);
        assert_eq!(explicit_pair.algorithm(), KeyAlgorithm::Ecdsa);
        assert_eq!(fallback.priv_key().len(), explicit.priv_key().len());
        assert_eq!(fallback.peer_id().len(), explicit.peer_id().len());
    }

    #[test]
    fn test_import_is_deterministic() {
        let mut out = Vec::new();
        let identity1 = Identity::provision(&mut out, "", 0, SECP256K1_KEY).unwrap();
        let identity2 = Identity::provision(&mut out, "RSA", 4096, SECP256K1_KEY).unwrap();

        assert_eq!(identity1, identity2);
    }

    #[test]
    fn test_import_peer_id_matches_public_key() {
        let mut out = Vec::new();
        let identity = Identity::provision(&mut out, "", 0, SECP256K1_KEY).unwrap();

        let mut secret = hex::decode(SECP256K1_KEY).unwrap();
        let key_pair = KeyPair::from_secp256k1_bytes(&mut secret).unwrap();
        let expected = key_pair.public().unwrap().to_peer_id();

        assert_eq!(identity.peer_id(), expected.to_base58());
        // secp256k1 public keys are short enough for an identity multihash
        assert!(identity.peer_id().starts_with("16Uiu2"));
    }

    #[test]
    fn test_encoder_is_idempotent() {
        let key_pair = KeyPair::generate(KeyAlgorithm::Ed25519, MIN_KEY_BITS).unwrap();
        let mut out = Vec::new();

        let first = encode_identity(&key_pair, &mut out).unwrap();
        let second = encode_identity(&key_pair, &mut out).unwrap();

        assert_eq!(first.priv_key(), second.priv_key());
        assert_eq!(first.peer_id(), second.peer_id());
    }

    #[test]
    fn test_identity_uniqueness() {
        let mut out = Vec::new();
        let identity1 = Identity::provision(&mut out, "Ed25519", 2048, "").unwrap();
        let identity2 = Identity::provision(&mut out, "Ed25519", 2048, "").unwrap();

        assert_ne!(identity1.peer_id(), identity2.peer_id());
        assert_ne!(identity1.priv_key(), identity2.priv_key());
    }

    #[test]
    fn test_verify_detects_mismatch() {
        let mut out = Vec::new();
        let identity = Identity::provision(&mut out, "Ed25519", 2048, "").unwrap();
        let other = Identity::provision(&mut out, "Ed25519", 2048, "").unwrap();

        let tampered = Identity {
            peer_id: other.peer_id().to_string(),
            priv_key: identity.priv_key().to_string(),
        };
        assert!(matches!(tampered.verify(), Err(Error::DerivationFailure(_))));
    }

    #[test]
    fn test_decode_rejects_bad_priv_key() {
        let identity = Identity {
            peer_id: String::new(),
            priv_key: "%%%".to_string(),
        };
        assert!(matches!(identity.decode_key_pair(), Err(Error::MalformedImportEncoding(_))));
    }

    struct Reversed;

    impl PrivateKeyCodec for Reversed {
        fn encode(&self, key_bytes: &[u8]) -> Result<String> {
            let reversed: Vec<u8> = key_bytes.iter().rev().copied().collect();
            Ok(hex::encode(reversed))
        }

        fn decode(&self, stored: &str) -> Result<zeroize::Zeroizing<Vec<u8>>> {
            let mut bytes = hex::decode(stored)
                .map_err(|e| Error::MalformedImportEncoding(e.to_string()))?;
            bytes.reverse();
            Ok(zeroize::Zeroizing::new(bytes))
        }
    }

    #[test]
    fn test_custom_codec() {
        let key_pair = KeyPair::generate(KeyAlgorithm::Secp256k1, MIN_KEY_BITS).unwrap();
        let mut out = Vec::new();

        let identity = encode_identity_with(&Reversed, &key_pair, &mut out).unwrap();
        assert!(identity.verify_with(&Reversed).is_ok());
        assert!(identity.verify().is_err());
    }

    #[test]
    fn test_serialized_field_names() {
        let mut out = Vec::new();
        let identity = Identity::provision(&mut out, "Ed25519", 2048, "").unwrap();

        let value = serde_json::to_value(&identity).unwrap();
        assert_eq!(value["PeerID"], identity.peer_id());
        assert_eq!(value["PrivKey"], identity.priv_key());

        let parsed: Identity = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, identity);
    }

    #[test]
    fn test_debug_format() {
        let mut out = Vec::new();
        let identity = Identity::provision(&mut out, "Ed25519", 2048, "").unwrap();
        let debug_str = format!("{:?}", identity);

        assert!(debug_str.contains(identity.peer_id()));
        assert!(!debug_str.contains("priv_key"));
        assert!(!debug_str.contains(identity.priv_key()));
    }
}
