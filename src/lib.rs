// SPDX-License-Identifier: MIT OR Apache-2.0

//! verity is a client library for [TUF repositories].
//!
//! A TUF client bootstraps from a trusted local copy of `root.json`, shipped
//! with your software by an out-of-band process, and verifies everything
//! else it downloads against that root of trust: the timestamp role proves
//! freshness, the snapshot role proves consistency, and the targets role
//! (with any delegated roles) proves which target files are authentic.
//!
//! The usual flow:
//!
//! 1. Create an [`Updater`] with an existing `root.json` in its metadata
//!    directory and a [`Transport`] for the repository's URLs
//!    ([`FilesystemTransport`] for `file://`, or `HttpTransport` with the
//!    `http` feature enabled).
//! 2. Call [`Updater::refresh`] to bring the top-level metadata up to date,
//!    or let the first target lookup do it implicitly.
//! 3. Call [`Updater::get_target_info`] to resolve a target path into a
//!    verified descriptor, then [`Updater::find_cached_target`] or
//!    [`Updater::download_target`] to obtain the file itself.
//!
//! The verification state machine lives in [`TrustedSet`], which can also be
//! driven directly with raw metadata bytes when you are not fetching over a
//! transport.
//!
//! [TUF repositories]: https://theupdateframework.github.io/

#![warn(clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::must_use_candidate
)]

mod datastore;
pub mod error;
mod fetch;
#[cfg(feature = "http")]
mod http;
pub mod key_source;
pub mod schema;
pub mod sign;
mod transport;
mod trusted;
mod updater;

#[cfg(feature = "http")]
pub use crate::http::HttpTransport;
pub use crate::transport::{
    FilesystemTransport, Transport, TransportError, TransportErrorKind,
};
pub use crate::trusted::TrustedSet;
pub use crate::updater::{Limits, Settings, Updater};

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters to percent-escape when turning a role name or target path into
/// a filename. Everything except alphanumerics, `-`, `.`, and `_` is
/// escaped, so path separators can never leak into the metadata directory.
const FILENAME_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_');

/// Percent-encode a string so it is safe for use as a filename.
pub(crate) fn encode_filename<S: AsRef<str>>(name: S) -> String {
    utf8_percent_encode(name.as_ref(), FILENAME_ESCAPE).to_string()
}

#[cfg(test)]
mod tests {
    use super::encode_filename;

    #[test]
    fn filenames_cannot_traverse() {
        assert_eq!(encode_filename("role"), "role");
        assert_eq!(encode_filename("a/../b"), "a%2F..%2Fb");
        assert_eq!(encode_filename("spaced name"), "spaced%20name");
    }
}
