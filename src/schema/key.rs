// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provides the TUF `Key` object, key ID derivation, and per-key signature
//! verification.

use crate::schema::decoded::{Decoded, EcdsaPem, Hex, RsaPem};
use crate::schema::error::{self, Result};
use olpc_cjson::CanonicalFormatter;
use ring::digest::{digest, SHA256};
use ring::signature::UnparsedPublicKey;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_plain::{forward_display_to_serde, forward_from_str_to_serde};
use snafu::ResultExt;
use std::collections::HashMap;

/// A public key in a metadata document, tagged by key type.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "keytype")]
pub enum Key {
    /// An RSA key.
    #[serde(rename = "rsa")]
    Rsa {
        /// The RSA key.
        keyval: RsaKey,
        /// Denotes the key's signature scheme.
        scheme: RsaScheme,
        /// Extra arguments found during deserialization.
        #[serde(flatten)]
        _extra: HashMap<String, Value>,
    },
    /// An Ed25519 key.
    #[serde(rename = "ed25519")]
    Ed25519 {
        /// The Ed25519 key.
        keyval: Ed25519Key,
        /// Denotes the key's signature scheme.
        scheme: Ed25519Scheme,
        /// Extra arguments found during deserialization.
        #[serde(flatten)]
        _extra: HashMap<String, Value>,
    },
    /// An ECDSA key on the nistp256 curve.
    #[serde(rename = "ecdsa-sha2-nistp256")]
    Ecdsa {
        /// The ECDSA key.
        keyval: EcdsaKey,
        /// Denotes the key's signature scheme.
        scheme: EcdsaScheme,
        /// Extra arguments found during deserialization.
        #[serde(flatten)]
        _extra: HashMap<String, Value>,
    },
}

/// Used to identify the RSA signature scheme in use.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub enum RsaScheme {
    /// `rsassa-pss-sha256`: RSA Probabilistic signature scheme with appendix.
    #[serde(rename = "rsassa-pss-sha256")]
    RsassaPssSha256,
}

forward_display_to_serde!(RsaScheme);
forward_from_str_to_serde!(RsaScheme);

/// Represents the public portion of an RSA key.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RsaKey {
    /// The public key, PEM-wrapped on the wire.
    pub public: Decoded<RsaPem>,

    /// Extra arguments found during deserialization.
    #[serde(flatten)]
    pub _extra: HashMap<String, Value>,
}

/// Used to identify the `EdDSA` signature scheme in use.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub enum Ed25519Scheme {
    /// 'ed25519': Elliptic curve digital signature algorithm based on Twisted
    /// Edwards curves.
    #[serde(rename = "ed25519")]
    Ed25519,
}

forward_display_to_serde!(Ed25519Scheme);
forward_from_str_to_serde!(Ed25519Scheme);

/// Represents the public portion of an Ed25519 key.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Ed25519Key {
    /// The public key, hex-encoded on the wire.
    pub public: Decoded<Hex>,

    /// Extra arguments found during deserialization.
    #[serde(flatten)]
    pub _extra: HashMap<String, Value>,
}

/// Used to identify the ECDSA signature scheme in use.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub enum EcdsaScheme {
    /// `ecdsa-sha2-nistp256`: Elliptic Curve Digital Signature Algorithm with
    /// NIST P-256 curve signing and SHA-256 hashing.
    #[serde(rename = "ecdsa-sha2-nistp256")]
    EcdsaSha2Nistp256,
}

forward_display_to_serde!(EcdsaScheme);
forward_from_str_to_serde!(EcdsaScheme);

/// Represents the public portion of an ECDSA key.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct EcdsaKey {
    /// The public key, PEM-wrapped on the wire.
    pub public: Decoded<EcdsaPem>,

    /// Extra arguments found during deserialization.
    #[serde(flatten)]
    pub _extra: HashMap<String, Value>,
}

impl Key {
    /// Calculate the key ID for this key: the hex digest of the SHA-256 hash
    /// of the key's canonical JSON form. The same key bytes always produce
    /// the same ID.
    pub fn key_id(&self) -> Result<Decoded<Hex>> {
        let mut buf = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, CanonicalFormatter::new());
        self.serialize(&mut ser).context(error::JsonSerialization {
            what: "key".to_owned(),
        })?;
        Ok(Decoded::from(digest(&SHA256, &buf).as_ref().to_vec()))
    }

    /// Verify a signature over `msg` made by this key. Returns `false` for a
    /// bad signature; never errors.
    pub fn verify(&self, msg: &[u8], signature: &[u8]) -> bool {
        let (alg, public): (&'static dyn ring::signature::VerificationAlgorithm, &[u8]) =
            match self {
                Key::Ed25519 {
                    scheme: Ed25519Scheme::Ed25519,
                    keyval,
                    ..
                } => (&ring::signature::ED25519, keyval.public.as_ref()),
                Key::Ecdsa {
                    scheme: EcdsaScheme::EcdsaSha2Nistp256,
                    keyval,
                    ..
                } => (
                    &ring::signature::ECDSA_P256_SHA256_ASN1,
                    keyval.public.as_ref(),
                ),
                Key::Rsa {
                    scheme: RsaScheme::RsassaPssSha256,
                    keyval,
                    ..
                } => (
                    &ring::signature::RSA_PSS_2048_8192_SHA256,
                    keyval.public.as_ref(),
                ),
            };
        UnparsedPublicKey::new(alg, public)
            .verify(msg, signature)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::Key;

    #[test]
    fn key_id_is_deterministic() {
        let json = r#"{
            "keytype": "ed25519",
            "scheme": "ed25519",
            "keyval": {
                "public": "edcd0a32a07dce33f7c7873aaffbff36d20ea30787574ead335eefd337e4dacd"
            }
        }"#;
        let a: Key = serde_json::from_str(json).unwrap();
        let b: Key = serde_json::from_str(json).unwrap();
        assert_eq!(a.key_id().unwrap(), b.key_id().unwrap());
    }

    #[test]
    fn key_id_ignores_field_order() {
        let a: Key = serde_json::from_str(
            r#"{"keytype": "ed25519", "scheme": "ed25519", "keyval": {"public": "00aa"}}"#,
        )
        .unwrap();
        let b: Key = serde_json::from_str(
            r#"{"scheme": "ed25519", "keyval": {"public": "00aa"}, "keytype": "ed25519"}"#,
        )
        .unwrap();
        assert_eq!(a.key_id().unwrap(), b.key_id().unwrap());
    }
}
