// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provides types for fields that are decoded from strings, such as hex byte
//! strings and PEM-wrapped public keys.
//!
//! A [`Decoded`] value keeps the original string alongside the decoded bytes.
//! Serializing writes the original string back out, so a parse/serialize
//! round-trip is byte-exact even if the source used an equivalent but
//! different encoding of the same bytes.

use crate::schema::error::{self, Error, Result};
use crate::schema::spki;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use snafu::OptionExt;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::Deref;
use std::str::FromStr;

/// A structure that represents `bytes` decoded from a string in the
/// representation `T`.
#[derive(Debug, Clone, Default)]
pub struct Decoded<T> {
    bytes: Vec<u8>,
    original: String,
    spooky: PhantomData<T>,
}

impl<T> Decoded<T> {
    /// Consume this object and return its decoded bytes.
    pub fn into_vec(self) -> Vec<u8> {
        self.bytes
    }
}

/// A trait for decoding strings into bytes.
pub trait Decode {
    /// Convert a string to bytes.
    fn decode(s: &str) -> Result<Vec<u8>>;
}

/// A trait for encoding bytes into a string.
pub trait Encode {
    /// Convert bytes to a string.
    fn encode(b: &[u8]) -> String;
}

// =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=

/// [`Decode`]/[`Encode`] implementation for lowercase hexadecimal strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hex;

impl Decode for Hex {
    fn decode(s: &str) -> Result<Vec<u8>> {
        hex::decode(s).map_err(|err| Error::Decode {
            what: "hex string",
            reason: err.to_string(),
        })
    }
}

impl Encode for Hex {
    fn encode(b: &[u8]) -> String {
        hex::encode(b)
    }
}

/// [`Decode`]/[`Encode`] implementation for PEM-encoded RSA public keys. The
/// decoded bytes are the RSAPublicKey structure with the SubjectPublicKeyInfo
/// framing stripped, which is the form the verifier consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RsaPem;

impl Decode for RsaPem {
    fn decode(s: &str) -> Result<Vec<u8>> {
        let pem = pem::parse(s).map_err(|err| Error::Decode {
            what: "RSA public key",
            reason: err.to_string(),
        })?;
        spki::decode(spki::OID_RSA_ENCRYPTION, None, &pem.contents).context(error::Decode {
            what: "RSA public key",
            reason: "invalid SubjectPublicKeyInfo",
        })
    }
}

impl Encode for RsaPem {
    fn encode(b: &[u8]) -> String {
        pem_wrap(spki::encode(spki::OID_RSA_ENCRYPTION, None, b))
    }
}

/// [`Decode`]/[`Encode`] implementation for PEM-encoded ECDSA public keys on
/// the nistp256 curve. The decoded bytes are the uncompressed curve point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EcdsaPem;

impl Decode for EcdsaPem {
    fn decode(s: &str) -> Result<Vec<u8>> {
        let pem = pem::parse(s).map_err(|err| Error::Decode {
            what: "ECDSA public key",
            reason: err.to_string(),
        })?;
        spki::decode(
            spki::OID_EC_PUBLIC_KEY,
            Some(spki::OID_EC_PARAM_SECP256R1),
            &pem.contents,
        )
        .context(error::Decode {
            what: "ECDSA public key",
            reason: "invalid SubjectPublicKeyInfo",
        })
    }
}

impl Encode for EcdsaPem {
    fn encode(b: &[u8]) -> String {
        pem_wrap(spki::encode(
            spki::OID_EC_PUBLIC_KEY,
            Some(spki::OID_EC_PARAM_SECP256R1),
            b,
        ))
    }
}

fn pem_wrap(der: Vec<u8>) -> String {
    pem::encode_config(
        &pem::Pem {
            tag: "PUBLIC KEY".to_owned(),
            contents: der,
        },
        pem::EncodeConfig {
            line_ending: pem::LineEnding::LF,
        },
    )
    .trim_end()
    .to_owned()
}

// =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=

impl<T: Decode> FromStr for Decoded<T> {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(Self {
            bytes: T::decode(s)?,
            original: s.to_owned(),
            spooky: PhantomData,
        })
    }
}

impl<T: Encode> From<Vec<u8>> for Decoded<T> {
    fn from(bytes: Vec<u8>) -> Self {
        let original = T::encode(&bytes);
        Self {
            bytes,
            original,
            spooky: PhantomData,
        }
    }
}

impl<T> AsRef<[u8]> for Decoded<T> {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl<T> Deref for Decoded<T> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl<T> fmt::Display for Decoded<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

// Equality and hashing consider the bytes only; two values that decode to the
// same bytes are the same key material.

impl<T> PartialEq for Decoded<T> {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl<T> Eq for Decoded<T> {}

impl<T> PartialOrd for Decoded<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Decoded<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.bytes.cmp(&other.bytes)
    }
}

impl<T> Hash for Decoded<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bytes.hash(state);
    }
}

impl<'de, T: Decode> Deserialize<'de> for Decoded<T> {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let original = String::deserialize(deserializer)?;
        Ok(Self {
            bytes: T::decode(&original).map_err(serde::de::Error::custom)?,
            original,
            spooky: PhantomData,
        })
    }
}

impl<T> Serialize for Decoded<T> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.original)
    }
}
