// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provides the `Sign` trait for signing keys and the signing operation on
//! metadata documents.

use crate::error::{self, Result};
use crate::schema::key::{Ed25519Key, Ed25519Scheme, Key, RsaKey, RsaScheme};
use crate::schema::{Role, Signature, Signed};
use ring::rand::SecureRandom;
use ring::signature::{Ed25519KeyPair, KeyPair, RsaKeyPair};
use snafu::ResultExt;
use std::collections::HashMap;

/// This trait must be implemented for each type of key with which you will
/// sign things.
pub trait Sign: Sync + Send {
    /// Returns the decoded key along with its scheme and other metadata.
    fn tuf_key(&self) -> Key;

    /// Signs the supplied message.
    fn sign(&self, msg: &[u8], rng: &dyn SecureRandom) -> Result<Vec<u8>>;
}

/// Implements the Sign trait for RSA keypairs.
impl Sign for RsaKeyPair {
    fn tuf_key(&self) -> Key {
        Key::Rsa {
            keyval: RsaKey {
                public: self.public_key().as_ref().to_vec().into(),
                _extra: HashMap::new(),
            },
            scheme: RsaScheme::RsassaPssSha256,
            _extra: HashMap::new(),
        }
    }

    fn sign(&self, msg: &[u8], rng: &dyn SecureRandom) -> Result<Vec<u8>> {
        let mut signature = vec![0; self.public_modulus_len()];
        self.sign(&ring::signature::RSA_PSS_SHA256, rng, msg, &mut signature)
            .context(error::Sign)?;
        Ok(signature)
    }
}

/// Implements the Sign trait for Ed25519 keypairs.
impl Sign for Ed25519KeyPair {
    fn tuf_key(&self) -> Key {
        Key::Ed25519 {
            keyval: Ed25519Key {
                public: self.public_key().as_ref().to_vec().into(),
                _extra: HashMap::new(),
            },
            scheme: Ed25519Scheme::Ed25519,
            _extra: HashMap::new(),
        }
    }

    fn sign(&self, msg: &[u8], _rng: &dyn SecureRandom) -> Result<Vec<u8>> {
        let signature = self.sign(msg);
        Ok(signature.as_ref().to_vec())
    }
}

/// Parses a supplied keypair and if it is recognized, returns an object that
/// implements the Sign trait.
pub fn parse_keypair(key: &[u8]) -> Result<Box<dyn Sign>> {
    if let Ok(pem) = pem::parse(key) {
        match pem.tag.as_str() {
            "PRIVATE KEY" => {
                if let Ok(rsa_key_pair) = RsaKeyPair::from_pkcs8(&pem.contents) {
                    Ok(Box::new(rsa_key_pair))
                } else if let Ok(ed25519_key_pair) = Ed25519KeyPair::from_pkcs8(&pem.contents) {
                    Ok(Box::new(ed25519_key_pair))
                } else {
                    error::KeyUnrecognized.fail()
                }
            }
            "RSA PRIVATE KEY" => {
                Ok(Box::new(
                    RsaKeyPair::from_der(&pem.contents).context(error::KeyRejected)?,
                ))
            }
            _ => error::KeyUnrecognized.fail(),
        }
    } else {
        error::KeyUnrecognized.fail()
    }
}

impl<T: Role> Signed<T> {
    /// Sign the canonical form of this document with `signer` and append the
    /// resulting signature.
    ///
    /// The signature's key ID is derived from the signer's public key. A
    /// caller re-signing a document must call
    /// [`clear_signatures`](Signed::clear_signatures) first; signing twice
    /// with the same key produces a duplicate entry that the next parse will
    /// reject.
    pub fn sign(&mut self, signer: &dyn Sign, rng: &dyn SecureRandom) -> Result<Signature> {
        let payload = self.signed.canonical_form()?;
        let sig = signer.sign(&payload, rng)?;
        let keyid = signer.tuf_key().key_id()?;
        let signature = Signature {
            keyid,
            sig: sig.into(),
        };
        self.signatures.push(signature.clone());
        Ok(signature)
    }
}
