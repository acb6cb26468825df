// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contains the error type for this library.

#![allow(clippy::default_trait_access)]

use crate::transport::TransportError;
use snafu::Snafu;
use std::path::PathBuf;
use url::Url;

/// Alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for this library.
#[derive(Debug, Snafu)]
#[snafu(visibility = "pub(crate)")]
#[non_exhaustive]
pub enum Error {
    /// A metadata file's version went backward compared to what is already
    /// trusted.
    #[snafu(display(
        "Found version {} of {}, but version {} is already trusted",
        new_version,
        role,
        current_version
    ))]
    OlderMetadata {
        role: String,
        current_version: u64,
        new_version: u64,
    },

    /// A metadata file's version does not match the version another role
    /// declared for it.
    #[snafu(display("Expected version {} of {}, got {}", expected, role, found))]
    VersionMismatch {
        role: String,
        expected: u64,
        found: u64,
    },

    /// A re-downloaded timestamp carried the version already trusted. Callers
    /// treat this as a no-op signal, not a failure.
    #[snafu(display("Version {} of {} is already trusted", version, role))]
    EqualVersionNumber { role: String, version: u64 },

    /// The reference time is past a metadata file's expiration.
    #[snafu(display("{} metadata is expired", role))]
    ExpiredMetadata { role: String },

    /// A role's metadata file was not listed where it must be listed.
    #[snafu(display("Metadata for {} is missing from {}", file, role))]
    MetaMissing { file: String, role: String },

    /// `update_root` was called after a timestamp was already loaded.
    #[snafu(display("Cannot update root after timestamp is loaded"))]
    RootUpdateAfterTimestamp,

    /// An update method was called before the role it depends on was loaded.
    #[snafu(display("Cannot update {} before {} is loaded", role, requires))]
    MissingRole {
        role: &'static str,
        requires: &'static str,
    },

    /// A delegated targets update named a parent that is not loaded.
    #[snafu(display("Cannot load {} before its delegating role {}", role, parent))]
    ParentNotLoaded { role: String, parent: String },

    /// Failure in the metadata model (parsing, validation, signing input,
    /// signature thresholds, hash or length checks).
    #[snafu(display("{}", source))]
    Schema { source: crate::schema::Error },

    /// A download exceeded its size limit.
    #[snafu(display(
        "Download exceeded the maximum of {} bytes allowed by {}",
        max_size,
        specifier
    ))]
    MaxSizeExceeded {
        max_size: u64,
        specifier: &'static str,
    },

    /// The transport failed to fetch a URL.
    #[snafu(display("Failed to fetch {}: {}", url, source))]
    Transport { url: Url, source: TransportError },

    /// Reading bytes from an already-open transport stream failed.
    #[snafu(display("Failed to read from {}: {}", url, source))]
    Fetch { url: Url, source: std::io::Error },

    #[snafu(display("Failed to join {} to URL {}: {}", path, url, source))]
    JoinUrl {
        path: String,
        url: Url,
        source: url::ParseError,
    },

    #[snafu(display("Failed to create directory {}: {}", path.display(), source))]
    DirCreate {
        path: PathBuf,
        source: std::io::Error,
    },

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

    #[snafu(display("Failed to write {}: {}", path.display(), source))]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Failed to create temporary file in {}: {}", path.display(), source))]
    TempFileCreate {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Failed to persist temporary file as {}: {}", path.display(), source))]
    TempFilePersist {
        path: PathBuf,
        source: tempfile::PersistError,
    },

    /// The local trust root required to bootstrap the updater is missing.
    #[snafu(display("No trusted root found at {}", path.display()))]
    MissingTrustRoot { path: PathBuf },

    /// A target path was not found in any reachable targets role.
    #[snafu(display("Target {} not found", target))]
    TargetNotFound { target: String },

    /// A target path has no directory separator, so a hash prefix cannot be
    /// inserted for consistent-snapshot downloads.
    #[snafu(display("Cannot prefix target path {}, no separator found", path))]
    NoPathSeparator { path: String },

    /// The signing key could not be used.
    #[snafu(display("Failed to sign message"))]
    Sign { source: ring::error::Unspecified },

    /// The private key was rejected by ring.
    #[snafu(display("Failed to parse private key: {}", source))]
    KeyRejected { source: ring::error::KeyRejected },

    /// The private key format was not recognized.
    #[snafu(display("Unrecognized private key format"))]
    KeyUnrecognized,
}

impl Error {
    /// Whether this error means the *repository* handed us something invalid
    /// (as opposed to a local I/O, transport, or caller error). The update
    /// workflow absorbs repository errors from the local cache and retries
    /// against the remote; everything else is surfaced immediately.
    pub fn is_repository_error(&self) -> bool {
        matches!(
            self,
            Error::OlderMetadata { .. }
                | Error::VersionMismatch { .. }
                | Error::EqualVersionNumber { .. }
                | Error::ExpiredMetadata { .. }
                | Error::MetaMissing { .. }
                | Error::Schema { .. }
        )
    }
}

impl From<crate::schema::Error> for Error {
    fn from(source: crate::schema::Error) -> Self {
        Error::Schema { source }
    }
}
