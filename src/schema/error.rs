// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the metadata model.

use snafu::Snafu;
use std::path::PathBuf;

/// Alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for the metadata model.
#[derive(Debug, Snafu)]
#[snafu(visibility = "pub(crate)")]
#[non_exhaustive]
pub enum Error {
    /// Unable to parse a metadata document.
    #[snafu(display("Failed to parse {} metadata: {}", what, source))]
    ParseMetadata {
        what: String,
        source: serde_json::Error,
    },

    #[snafu(display("Failed to serialize {} to JSON: {}", what, source))]
    JsonSerialization {
        what: String,
        source: serde_json::Error,
    },

    /// A document's `_type` tag names a different role than expected.
    #[snafu(display("Expected metadata type {}, got {}", expected, found))]
    WrongType {
        expected: crate::schema::RoleType,
        found: crate::schema::RoleType,
    },

    /// A key ID in a key map does not match the key it names.
    #[snafu(display("Key ID {} does not match its key, which has ID {}", keyid, calculated))]
    InvalidKeyId { keyid: String, calculated: String },

    /// The same key ID appeared twice in a key map.
    #[snafu(display("Duplicate key ID {}", keyid))]
    DuplicateKeyId { keyid: String },

    /// The same key ID signed a document more than once.
    #[snafu(display("Multiple signatures found for key ID {}", keyid))]
    DuplicateSignature { keyid: String },

    /// A role or delegation was looked up that the delegator does not define.
    #[snafu(display("No delegation found for role {}", name))]
    RoleNotFound { name: String },

    /// The delegator has no delegations at all.
    #[snafu(display("Metadata contains no delegations"))]
    NoDelegations,

    /// A key was looked up in a role that does not list it.
    #[snafu(display("Key with ID {} is not used by {}", keyid, role))]
    KeyNotFound { keyid: String, role: String },

    /// Not enough of a role's keys produced a valid signature.
    #[snafu(display(
        "Signature threshold of {} not met for role {} ({} valid signatures)",
        threshold,
        role,
        valid
    ))]
    SignatureThreshold {
        role: String,
        threshold: u64,
        valid: u64,
    },

    /// Data did not match its declared length.
    #[snafu(display("Length verification failed: expected {}, got {}", expected, found))]
    LengthMismatch { expected: u64, found: u64 },

    /// Data did not match a declared digest.
    #[snafu(display(
        "Hash verification failed for {}: expected {}, calculated {}",
        algorithm,
        expected,
        calculated
    ))]
    HashMismatch {
        algorithm: String,
        expected: String,
        calculated: String,
    },

    /// A hash map named an algorithm this implementation does not support.
    #[snafu(display("Unsupported hash algorithm {}", algorithm))]
    UnsupportedAlgorithm { algorithm: String },

    /// A target file descriptor carried no hashes at all.
    #[snafu(display("Target must have at least one hash"))]
    MissingHashes,

    /// A string field could not be decoded into bytes.
    #[snafu(display("Failed to decode {}: {}", what, reason))]
    Decode { what: &'static str, reason: String },

    #[snafu(display("Target path {} is not a file", path.display()))]
    TargetNotAFile { path: PathBuf },

    #[snafu(display("Failed to open {}: {}", path.display(), source))]
    FileOpen {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Failed to read {}: {}", path.display(), source))]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },
}
