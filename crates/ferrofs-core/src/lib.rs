//! # Ferrofs Core
//!
//! This crate implements the bootstrap path of a Ferrofs storage node: it
//! produces the node's initial configuration and, within it, the node's
//! cryptographic identity.
//!
//! ## Core Components
//!
//! ### Key Material ([`keys`])
//!
//! Generates or imports the node key pair:
//! - RSA, Ed25519, Secp256k1 and ECDSA key generation
//! - Import of raw secp256k1 private keys given as hex
//! - A 1024-bit floor on requested key sizes
//!
//! ### Identity ([`identity`])
//!
//! Encodes a key pair into the persisted [`Identity`]:
//! - Private key serialized to the libp2p key envelope and base64-encoded
//! - Peer ID derived from the public key
//! - Re-derivation and verification of stored identities
//!
//! ### Private Key Storage ([`storage`])
//!
//! The [`PrivateKeyCodec`] boundary between serialized keys and the text kept
//! in the configuration file.
//!
//! ### Node Configuration ([`config`], [`bootstrap`])
//!
//! The default node configuration with the identity embedded, and the
//! default bootstrap peer list.
//!
//! ## Usage Examples
//!
//! ```rust
//! use ferrofs_core::Config;
//!
//! let mut out = Vec::new();
//! let config = Config::init(&mut out, 2048, "Ed25519", "")?;
//! println!("PeerId: {}", config.identity.peer_id());
//!
//! // The stored private key always re-derives the stored peer ID
//! config.identity.verify()?;
//! # Ok::<(), ferrofs_core::Error>(())
//! ```
//!
//! Progress lines are written to the sink passed in; nothing is written for
//! requests that fail.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod identity;
pub mod keys;
pub mod settings;
pub mod storage;

pub use bootstrap::{default_bootstrap_peers, BootstrapPeer};
pub use config::Config;
pub use error::{Error, Result};
pub use identity::{encode_identity, encode_identity_with, Identity};
pub use keys::{provide_key_material, KeyAlgorithm, KeyPair, Resolution, MIN_KEY_BITS};
pub use settings::InitSettings;
pub use storage::{PlaintextBase64, PrivateKeyCodec};

// Re-export commonly used types
pub use libp2p::PeerId;
