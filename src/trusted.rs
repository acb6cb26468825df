// SPDX-License-Identifier: MIT OR Apache-2.0

//! The trusted metadata set: the state machine at the center of the client
//! workflow.
//!
//! A [`TrustedSet`] holds at most one verified document per top-level role
//! plus a map of verified targets documents keyed by role name. Documents
//! enter the set only through the `update_*` methods, which enforce the TUF
//! client rules before installing anything: threshold signatures against the
//! delegating role, strict version advancement for root, rollback protection
//! for timestamp and snapshot, length/hash linkage between roles, and
//! expiration against a reference time captured at construction.
//!
//! Once installed a document is immutable; it leaves the set only by being
//! replaced with a newer version that passes all checks. The set always
//! holds a root; it holds a snapshot only while it holds a timestamp, and
//! targets only while it holds a snapshot.

use crate::error::{self, Result};
use crate::schema::{Role, Root, Signed, Snapshot, Targets, Timestamp};
use chrono::{DateTime, Utc};
use log::debug;
use snafu::{ensure, OptionExt};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// The role name of the top-level targets document in the targets map.
pub const TARGETS: &str = "targets";

/// The parent name used when the top-level targets document is verified
/// against root instead of a delegating targets document.
pub const ROOT: &str = "root";

/// A verified, in-memory copy of a repository's metadata.
#[derive(Debug, Clone)]
pub struct TrustedSet {
    root: Signed<Root>,
    timestamp: Option<Signed<Timestamp>>,
    snapshot: Option<Signed<Snapshot>>,
    targets: HashMap<String, Signed<Targets>>,
    reference_time: DateTime<Utc>,
}

impl TrustedSet {
    /// Bootstrap trust from a locally persisted root document, using the
    /// system clock as the reference time for all expiration checks.
    pub fn new(root_data: &[u8]) -> Result<Self> {
        Self::with_reference_time(root_data, Utc::now())
    }

    /// Bootstrap trust from a locally persisted root document.
    ///
    /// The root must be signed at its own threshold by its own root role
    /// keys and must not be expired at `reference_time`. The reference time
    /// is captured here and used for every later expiration check.
    pub fn with_reference_time(
        root_data: &[u8],
        reference_time: DateTime<Utc>,
    ) -> Result<Self> {
        let root = Signed::<Root>::from_bytes(root_data)?;
        root.verify_self()?;
        ensure!(
            !root.signed.is_expired(reference_time),
            error::ExpiredMetadata { role: ROOT }
        );
        debug!("loaded trusted root v{}", root.signed.version);
        Ok(Self {
            root,
            timestamp: None,
            snapshot: None,
            targets: HashMap::new(),
            reference_time,
        })
    }

    /// The currently trusted root document.
    pub fn root(&self) -> &Signed<Root> {
        &self.root
    }

    /// The currently trusted timestamp document, if one has been loaded.
    pub fn timestamp(&self) -> Option<&Signed<Timestamp>> {
        self.timestamp.as_ref()
    }

    /// The currently trusted snapshot document, if one has been loaded.
    pub fn snapshot(&self) -> Option<&Signed<Snapshot>> {
        self.snapshot.as_ref()
    }

    /// A trusted targets document by role name; the top-level role is named
    /// `"targets"`.
    pub fn targets(&self, role: &str) -> Option<&Signed<Targets>> {
        self.targets.get(role)
    }

    /// The instant all expiration checks compare against.
    pub fn reference_time(&self) -> DateTime<Utc> {
        self.reference_time
    }

    /// Accept a new root document, verified both by the currently trusted
    /// root and by itself at its own threshold, with a version exactly one
    /// greater than the current version.
    ///
    /// Root must be fully updated before the timestamp is loaded; calling
    /// this afterward is an error. Expiration is not checked here, so an
    /// expired root can still rotate forward to an in-date one.
    pub fn update_root(&mut self, data: &[u8]) -> Result<()> {
        ensure!(self.timestamp.is_none(), error::RootUpdateAfterTimestamp);
        let new_root = Signed::<Root>::from_bytes(data)?;
        self.root.signed.verify_role::<Root>(&new_root)?;
        new_root.verify_self()?;
        ensure!(
            new_root.signed.version.get() == self.root.signed.version.get() + 1,
            error::VersionMismatch {
                role: ROOT,
                expected: self.root.signed.version.get() + 1,
                found: new_root.signed.version.get(),
            }
        );
        debug!("updated root to v{}", new_root.signed.version);
        self.root = new_root;
        Ok(())
    }

    /// Accept a new timestamp document, verified against the current root's
    /// timestamp role.
    ///
    /// A version lower than the trusted one is a rollback and fails; the
    /// same version fails with the distinct equal-version error, which
    /// callers treat as "nothing new" rather than an attack. The snapshot
    /// version recorded inside the timestamp may never decrease either.
    pub fn update_timestamp(&mut self, data: &[u8]) -> Result<()> {
        ensure!(
            !self.root.signed.is_expired(self.reference_time),
            error::ExpiredMetadata { role: ROOT }
        );
        let new_timestamp = Signed::<Timestamp>::from_bytes(data)?;
        self.root.signed.verify_role::<Timestamp>(&new_timestamp)?;

        if let Some(current) = &self.timestamp {
            let current_version = current.signed.version;
            let new_version = new_timestamp.signed.version;
            ensure!(
                new_version >= current_version,
                error::OlderMetadata {
                    role: "timestamp",
                    current_version: current_version.get(),
                    new_version: new_version.get(),
                }
            );
            ensure!(
                new_version != current_version,
                error::EqualVersionNumber {
                    role: "timestamp",
                    version: new_version.get(),
                }
            );

            let current_meta = current.signed.snapshot_meta().context(error::MetaMissing {
                file: "snapshot.json",
                role: "timestamp",
            })?;
            let new_meta = new_timestamp
                .signed
                .snapshot_meta()
                .context(error::MetaMissing {
                    file: "snapshot.json",
                    role: "timestamp",
                })?;
            ensure!(
                new_meta.version >= current_meta.version,
                error::OlderMetadata {
                    role: "snapshot",
                    current_version: current_meta.version.get(),
                    new_version: new_meta.version.get(),
                }
            );
        }

        ensure!(
            !new_timestamp.signed.is_expired(self.reference_time),
            error::ExpiredMetadata { role: "timestamp" }
        );
        debug!("updated timestamp to v{}", new_timestamp.signed.version);
        self.timestamp = Some(new_timestamp);
        Ok(())
    }

    /// Accept a new snapshot document, verified against the current root's
    /// snapshot role and checked against the trusted timestamp's record of
    /// its length, hashes, and version.
    ///
    /// Every metadata file listed by the previous snapshot must still be
    /// listed, at the same or a newer version, which blocks rollback and
    /// mix-and-match of role files. With `trusted` set, an expired snapshot
    /// is still accepted: the caller is reloading its own cache for
    /// continuity and will re-download from the remote regardless.
    pub fn update_snapshot(&mut self, data: &[u8], trusted: bool) -> Result<()> {
        let timestamp = self.timestamp.as_ref().context(error::MissingRole {
            role: "snapshot",
            requires: "timestamp",
        })?;
        ensure!(
            !timestamp.signed.is_expired(self.reference_time),
            error::ExpiredMetadata { role: "timestamp" }
        );
        let meta = timestamp.signed.snapshot_meta().context(error::MetaMissing {
            file: "snapshot.json",
            role: "timestamp",
        })?;
        meta.verify_length_hashes(data)?;
        let recorded_version = meta.version;

        let new_snapshot = Signed::<Snapshot>::from_bytes(data)?;
        self.root.signed.verify_role::<Snapshot>(&new_snapshot)?;
        ensure!(
            new_snapshot.signed.version == recorded_version,
            error::VersionMismatch {
                role: "snapshot",
                expected: recorded_version.get(),
                found: new_snapshot.signed.version.get(),
            }
        );

        if let Some(current) = &self.snapshot {
            for (filename, current_meta) in &current.signed.meta {
                let new_meta =
                    new_snapshot
                        .signed
                        .meta
                        .get(filename)
                        .context(error::MetaMissing {
                            file: filename.as_str(),
                            role: "snapshot",
                        })?;
                ensure!(
                    new_meta.version >= current_meta.version,
                    error::OlderMetadata {
                        role: filename.as_str(),
                        current_version: current_meta.version.get(),
                        new_version: new_meta.version.get(),
                    }
                );
            }
        }

        if !trusted {
            ensure!(
                !new_snapshot.signed.is_expired(self.reference_time),
                error::ExpiredMetadata { role: "snapshot" }
            );
        }

        debug!("updated snapshot to v{}", new_snapshot.signed.version);
        self.snapshot = Some(new_snapshot);
        // loaded targets were validated against the previous snapshot
        self.targets.clear();
        Ok(())
    }

    /// Accept the top-level targets document, verified against the current
    /// root's targets role.
    pub fn update_targets(&mut self, data: &[u8]) -> Result<&Signed<Targets>> {
        self.update_delegated_targets(data, TARGETS, ROOT)
    }

    /// Accept a targets document for `role_name`, verified against its
    /// delegating role `parent_name` and checked against the trusted
    /// snapshot's record of its length, hashes, and version.
    ///
    /// The parent must already be in the set, except for the top-level pair
    /// (`"targets"` delegated by `"root"`), which is verified against the
    /// root document directly.
    pub fn update_delegated_targets(
        &mut self,
        data: &[u8],
        role_name: &str,
        parent_name: &str,
    ) -> Result<&Signed<Targets>> {
        let snapshot = self.snapshot.as_ref().context(error::MissingRole {
            role: "targets",
            requires: "snapshot",
        })?;
        ensure!(
            !snapshot.signed.is_expired(self.reference_time),
            error::ExpiredMetadata { role: "snapshot" }
        );

        let filename = format!("{}.json", role_name);
        let meta = snapshot
            .signed
            .meta
            .get(&filename)
            .context(error::MetaMissing {
                file: filename.as_str(),
                role: "snapshot",
            })?;
        meta.verify_length_hashes(data)?;
        let recorded_version = meta.version;

        let new_targets = Signed::<Targets>::from_bytes(data)?;
        if role_name == TARGETS && parent_name == ROOT {
            self.root.signed.verify_role::<Targets>(&new_targets)?;
        } else {
            let parent = self.targets.get(parent_name).context(error::ParentNotLoaded {
                role: role_name,
                parent: parent_name,
            })?;
            parent.signed.verify_delegated_role(role_name, &new_targets)?;
        }

        ensure!(
            new_targets.signed.version == recorded_version,
            error::VersionMismatch {
                role: role_name,
                expected: recorded_version.get(),
                found: new_targets.signed.version.get(),
            }
        );
        ensure!(
            !new_targets.signed.is_expired(self.reference_time),
            error::ExpiredMetadata { role: role_name }
        );

        debug!("updated {} to v{}", role_name, new_targets.signed.version);
        let installed = match self.targets.entry(role_name.to_owned()) {
            Entry::Occupied(mut entry) => {
                entry.insert(new_targets);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(new_targets),
        };
        Ok(&*installed)
    }
}
