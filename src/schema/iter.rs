// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::schema::decoded::{Decoded, Hex};
use crate::schema::key::Key;
use std::collections::HashMap;

/// An iterator over the keys a role is allowed to use, resolving the role's
/// key IDs against a key map. IDs with no matching key are skipped.
pub(super) struct KeysIter<'a> {
    pub(super) keyids_iter: std::slice::Iter<'a, Decoded<Hex>>,
    pub(super) keys: &'a HashMap<Decoded<Hex>, Key>,
}

impl<'a> Iterator for KeysIter<'a> {
    type Item = &'a Key;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let keyid = self.keyids_iter.next()?;
            if let Some(key) = self.keys.get(keyid) {
                return Some(key);
            }
        }
    }
}
