// SPDX-License-Identifier: MIT OR Apache-2.0

//! Threshold signature verification for delegated metadata.

use crate::schema::decoded::{Decoded, Hex};
use crate::schema::error::{self, Result};
use crate::schema::key::Key;
use crate::schema::{Role, Root, Signed, Targets};
use log::debug;
use snafu::{ensure, OptionExt};
use std::collections::{HashMap, HashSet};

/// Count the distinct role key IDs whose signature over the canonical form of
/// `role.signed` verifies, and require at least `threshold` of them.
///
/// A signature made by a key that is not in `keyids` contributes nothing, and
/// a key ID listed more than once is counted once. Verification failures of
/// individual keys are logged, not raised; only falling short of the
/// threshold is an error.
fn verify_threshold<T: Role>(
    name: &str,
    keys: &HashMap<Decoded<Hex>, Key>,
    keyids: &[Decoded<Hex>],
    threshold: u64,
    role: &Signed<T>,
) -> Result<()> {
    let payload = role.signed.canonical_form()?;
    let mut valid = HashSet::new();
    for keyid in keyids {
        let key = match keys.get(keyid) {
            Some(key) => key,
            None => continue,
        };
        let signature = match role.signatures.iter().find(|sig| sig.keyid == *keyid) {
            Some(signature) => signature,
            None => continue,
        };
        if key.verify(&payload, &signature.sig) {
            valid.insert(keyid);
        } else {
            debug!("failed to verify {} with key ID {}", name, keyid);
        }
    }
    ensure!(
        valid.len() as u64 >= threshold,
        error::SignatureThreshold {
            role: name,
            threshold,
            valid: valid.len() as u64,
        }
    );
    Ok(())
}

impl Root {
    /// Verify that `role` is signed at threshold by the keys this root
    /// document assigns to the top-level role of type `T`.
    pub fn verify_role<T: Role>(&self, role: &Signed<T>) -> Result<()> {
        let role_keys = self.roles.get(&T::TYPE).context(error::RoleNotFound {
            name: T::TYPE.to_string(),
        })?;
        verify_threshold(
            &T::TYPE.to_string(),
            &self.keys,
            &role_keys.keyids,
            role_keys.threshold.get(),
            role,
        )
    }
}

impl Targets {
    /// Verify that the delegated targets document `role` is signed at
    /// threshold by the keys this document delegates to `name`.
    ///
    /// Fails if this document has no delegations or does not delegate `name`.
    pub fn verify_delegated_role(&self, name: &str, role: &Signed<Targets>) -> Result<()> {
        let delegations = self.delegations.as_ref().context(error::NoDelegations)?;
        let delegated = delegations
            .roles
            .iter()
            .find(|delegated| delegated.name == name)
            .context(error::RoleNotFound { name })?;
        verify_threshold(
            name,
            &delegations.keys,
            &delegated.keyids,
            delegated.threshold.get(),
            role,
        )
    }
}

impl Signed<Root> {
    /// Verify that this root document is signed at its own threshold by its
    /// own root role keys. Used both when bootstrapping trust and when
    /// accepting a rotated root, which must always be self-signed.
    pub fn verify_self(&self) -> Result<()> {
        self.signed.verify_role::<Root>(self)
    }
}
