//! Error types for Ferrofs node bootstrap.

use thiserror::Error;

/// The main error type for the Ferrofs bootstrap path.
///
/// The first six variants cover identity generation. Each one aborts the
/// provisioning attempt; nothing is retried and no partial identity is
/// produced.
#[derive(Error, Debug)]
pub enum Error {
    /// Requested key size is below the generation floor
    #[error("bitsize {requested} is less than {minimum} and considered unsafe")]
    UnsafeKeySize { requested: usize, minimum: usize },

    /// Imported or persisted key text is not valid hex / base64
    #[error("Malformed import key encoding: {0}")]
    MalformedImportEncoding(String),

    /// Key bytes were decoded but do not form a valid private key
    #[error("Malformed key material: {0}")]
    MalformedKeyMaterial(String),

    /// Fresh key generation failed (entropy or algorithm-internal error)
    #[error("Key generation failed: {0}")]
    GenerationFailure(String),

    /// The private key could not be serialized
    #[error("Key serialization error: {0}")]
    SerializationFailure(String),

    /// The peer ID could not be derived, or does not match the key
    #[error("Peer ID derivation error: {0}")]
    DerivationFailure(String),

    /// Bootstrap peer address errors
    #[error("Invalid bootstrap address: {0}")]
    Bootstrap(String),

    /// Init settings could not be loaded
    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),
}

/// Convenience type alias for Results using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
