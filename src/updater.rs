// SPDX-License-Identifier: MIT OR Apache-2.0

//! The client update workflow: local load, remote fetch, verification, and
//! persistence for each role, plus the delegation walk that resolves a
//! target path into a verified descriptor.

use crate::datastore::Datastore;
use crate::encode_filename;
use crate::error::{self, Error, Result};
use crate::fetch::fetch_max_size;
use crate::schema::{Signed, Target, Targets};
use crate::transport::{Transport, TransportErrorKind};
use crate::trusted::{TrustedSet, ROOT, TARGETS};
use log::debug;
use snafu::{OptionExt, ResultExt};
use std::collections::HashSet;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use url::Url;

/// Limits on downloaded metadata and on the delegation walk. The size caps
/// protect against endless-data responses; snapshot and targets caps apply
/// only when the delegating role does not record an exact length.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    /// Maximum size in bytes of a root metadata file.
    pub max_root_size: u64,
    /// Maximum size in bytes of the timestamp metadata file.
    pub max_timestamp_size: u64,
    /// Maximum size in bytes of the snapshot metadata file, used when the
    /// timestamp does not record its length.
    pub max_snapshot_size: u64,
    /// Maximum size in bytes of a targets metadata file, used when the
    /// snapshot does not record its length.
    pub max_targets_size: u64,
    /// Maximum number of root rotations accepted during one refresh.
    pub max_root_updates: u64,
    /// Maximum number of delegated roles visited while resolving one target
    /// path.
    pub max_delegations: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_root_size: 512_000,
            max_timestamp_size: 16_384,
            max_snapshot_size: 2_000_000,
            max_targets_size: 5_000_000,
            max_root_updates: 32,
            max_delegations: 32,
        }
    }
}

/// Settings for an [`Updater`].
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory holding the trusted `root.json` and the persisted metadata
    /// cache. Must contain a valid `root.json` before the updater is
    /// created; the updater keeps the other role files up to date.
    pub metadata_dir: PathBuf,

    /// Base URL metadata files are fetched from.
    pub metadata_base_url: Url,

    /// Directory where downloaded targets are written when no explicit path
    /// is given.
    pub target_dir: PathBuf,

    /// Base URL target files are fetched from.
    pub targets_base_url: Url,

    /// Download and walk limits.
    pub limits: Limits,

    /// Whether to prefix target filenames with their digest when the
    /// repository uses consistent snapshots.
    pub prefix_targets_with_hash: bool,
}

/// Implements the TUF client workflow against one repository.
///
/// Creating an updater loads and validates the trusted local root; this root
/// is the source of trust for all other metadata. [`refresh`](Self::refresh)
/// updates the top-level metadata in the required order, and
/// [`get_target_info`](Self::get_target_info) resolves a target path through
/// the delegation tree, loading delegated metadata on demand. Downloaded
/// files are verified by the trusted metadata before anything is returned.
#[derive(Debug)]
pub struct Updater {
    transport: Box<dyn Transport>,
    datastore: Datastore,
    metadata_base_url: Url,
    target_dir: PathBuf,
    targets_base_url: Url,
    limits: Limits,
    prefix_targets_with_hash: bool,
    trusted: TrustedSet,
}

impl Updater {
    /// Create an updater, bootstrapping trust from
    /// `<metadata_dir>/root.json`. Fails if that file is absent or invalid.
    pub fn new(transport: Box<dyn Transport>, settings: Settings) -> Result<Self> {
        let datastore = Datastore::new(settings.metadata_dir)?;
        let root_bytes = datastore
            .bytes("root.json")?
            .context(error::MissingTrustRoot {
                path: datastore.path().join("root.json"),
            })?;
        let trusted = TrustedSet::new(&root_bytes)?;
        Ok(Self {
            transport,
            datastore,
            metadata_base_url: ensure_trailing_slash(settings.metadata_base_url),
            target_dir: settings.target_dir,
            targets_base_url: ensure_trailing_slash(settings.targets_base_url),
            limits: settings.limits,
            prefix_targets_with_hash: settings.prefix_targets_with_hash,
            trusted,
        })
    }

    /// The trusted metadata this updater has verified so far.
    pub fn trusted(&self) -> &TrustedSet {
        &self.trusted
    }

    /// Refresh top-level metadata in the required order: root rotations,
    /// then timestamp, snapshot, and the top-level targets. Each accepted
    /// remote document is persisted before the next role is loaded.
    ///
    /// Call this at most once per updater. If it has not been called before
    /// the first [`get_target_info`](Self::get_target_info), it runs
    /// implicitly at that point. Delegated targets metadata is not updated
    /// here; it is loaded on demand during target resolution.
    pub fn refresh(&mut self) -> Result<()> {
        self.load_root()?;
        self.load_timestamp()?;
        self.load_snapshot()?;
        self.load_targets(TARGETS, ROOT)?;
        Ok(())
    }

    /// Resolve `target_path` into a verified [`Target`] descriptor by
    /// walking the delegation tree in pre-order, most trusted roles first.
    /// The result can be passed to [`download_target`](Self::download_target)
    /// or [`find_cached_target`](Self::find_cached_target).
    pub fn get_target_info(&mut self, target_path: &str) -> Result<Target> {
        if self.trusted.targets(TARGETS).is_none() {
            self.refresh()?;
        }
        self.walk_delegations(target_path)
    }

    /// Download the target described by `target`, verify its length and
    /// hashes, and atomically write it to `file_path` (or the default
    /// location under the target directory). Returns the written path.
    pub fn download_target(
        &self,
        target: &Target,
        file_path: Option<&Path>,
        targets_base_url: Option<&Url>,
    ) -> Result<PathBuf> {
        let file_path = match file_path {
            Some(path) => path.to_owned(),
            None => self.generate_target_file_path(target),
        };
        let base_url = match targets_base_url {
            Some(url) => ensure_trailing_slash(url.clone()),
            None => self.targets_base_url.clone(),
        };

        let mut target_path = target.path.clone();
        if self.trusted.root().signed.consistent_snapshot && self.prefix_targets_with_hash {
            // sha256 when present, else the first algorithm in name order
            let digest = target
                .hashes
                .get("sha256")
                .or_else(|| target.hashes.values().next());
            if let Some(digest) = digest {
                let prefixed = {
                    let (dir, base) =
                        target_path
                            .split_once('/')
                            .context(error::NoPathSeparator {
                                path: target_path.as_str(),
                            })?;
                    format!("{}/{}.{}", dir, digest, base)
                };
                target_path = prefixed;
            }
        }

        let url = base_url.join(&target_path).context(error::JoinUrl {
            path: target_path.as_str(),
            url: base_url.clone(),
        })?;
        let data = fetch_max_size(
            self.transport.as_ref(),
            url,
            target.length,
            "target length from targets metadata",
        )?;
        target.verify_length_hashes(&data)?;

        let dir = match file_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).context(error::DirCreate { path: dir })?;
        let mut temp = NamedTempFile::new_in(dir).context(error::TempFileCreate { path: dir })?;
        temp.write_all(&data).context(error::FileWrite {
            path: &file_path,
        })?;
        temp.persist(&file_path).context(error::TempFilePersist {
            path: &file_path,
        })?;
        debug!("downloaded target {}", target.path);
        Ok(file_path)
    }

    /// Check whether an up-to-date copy of `target` already exists at
    /// `file_path` (or the default location). Returns the path if the local
    /// file matches the descriptor's length and hashes.
    pub fn find_cached_target(
        &self,
        target: &Target,
        file_path: Option<&Path>,
    ) -> Result<PathBuf> {
        let file_path = match file_path {
            Some(path) => path.to_owned(),
            None => self.generate_target_file_path(target),
        };
        let mut data = Vec::new();
        File::open(&file_path)
            .context(error::FileOpen { path: &file_path })?
            .read_to_end(&mut data)
            .context(error::FileRead { path: &file_path })?;
        target.verify_length_hashes(&data)?;
        Ok(file_path)
    }

    /// Walk forward through `N.root.json` files until one is missing,
    /// accepting and persisting each rotation. A missing version means the
    /// current root is the newest available; any other download failure
    /// aborts.
    fn load_root(&mut self) -> Result<()> {
        let current = self.trusted.root().signed.version.get();
        for version in (current + 1)..=(current + self.limits.max_root_updates) {
            let data = match self.download_metadata(
                ROOT,
                Some(version),
                self.limits.max_root_size,
                "max_root_size",
            ) {
                Ok(data) => data,
                Err(err) if is_file_not_found(&err) => break,
                Err(err) => return Err(err),
            };
            self.trusted.update_root(&data)?;
            self.datastore.write("root.json", &data)?;
        }
        Ok(())
    }

    /// Load the timestamp: the local copy seeds version comparison but is
    /// never a reason to skip the network, since timestamp is how freshness
    /// is learned.
    fn load_timestamp(&mut self) -> Result<()> {
        if let Some(data) = self.datastore.bytes("timestamp.json")? {
            match self.trusted.update_timestamp(&data) {
                Ok(()) => debug!("local timestamp is valid"),
                Err(err) if err.is_repository_error() => {
                    debug!("local timestamp is not valid: {}", err);
                }
                Err(err) => return Err(err),
            }
        }

        let data = self.download_metadata(
            "timestamp",
            None,
            self.limits.max_timestamp_size,
            "max_timestamp_size",
        )?;
        match self.trusted.update_timestamp(&data) {
            Ok(()) => {}
            // the remote served the version already trusted; nothing to
            // persist
            Err(Error::EqualVersionNumber { .. }) => return Ok(()),
            Err(err) => return Err(err),
        }
        self.datastore.write("timestamp.json", &data)
    }

    /// Load the snapshot, preferring a still-valid local copy over the
    /// network.
    fn load_snapshot(&mut self) -> Result<()> {
        if let Some(data) = self.datastore.bytes("snapshot.json")? {
            match self.trusted.update_snapshot(&data, true) {
                Ok(()) => {
                    debug!("local snapshot is valid: not downloading a new one");
                    return Ok(());
                }
                Err(err) if err.is_repository_error() => {
                    debug!("local snapshot is not valid: {}", err);
                }
                Err(err) => return Err(err),
            }
        }

        let timestamp = self.trusted.timestamp().context(error::MissingRole {
            role: "snapshot",
            requires: "timestamp",
        })?;
        let meta = timestamp
            .signed
            .snapshot_meta()
            .context(error::MetaMissing {
                file: "snapshot.json",
                role: "timestamp",
            })?;
        let max_size = meta.length.unwrap_or(self.limits.max_snapshot_size);
        let version = if self.trusted.root().signed.consistent_snapshot {
            Some(meta.version.get())
        } else {
            None
        };

        let data =
            self.download_metadata("snapshot", version, max_size, "snapshot meta length")?;
        self.trusted.update_snapshot(&data, false)?;
        self.datastore.write("snapshot.json", &data)
    }

    /// Load the targets document for `role` (delegated by `parent`),
    /// preferring an already-loaded or still-valid local copy over the
    /// network.
    fn load_targets(&mut self, role: &str, parent: &str) -> Result<&Signed<Targets>> {
        // avoid loading a role more than once during one resolution
        if self.trusted.targets(role).is_none() {
            self.fetch_targets(role, parent)?;
        }
        self.trusted.targets(role).context(error::MissingRole {
            role: "targets",
            requires: "snapshot",
        })
    }

    fn fetch_targets(&mut self, role: &str, parent: &str) -> Result<()> {
        let filename = format!("{}.json", encode_filename(role));
        if let Some(data) = self.datastore.bytes(&filename)? {
            match self.trusted.update_delegated_targets(&data, role, parent) {
                Ok(_) => {
                    debug!("local {} is valid: not downloading a new one", role);
                    return Ok(());
                }
                Err(err) if err.is_repository_error() => {
                    debug!("local {} is not valid: {}", role, err);
                }
                Err(err) => return Err(err),
            }
        }

        let snapshot = self.trusted.snapshot().context(error::MissingRole {
            role: "targets",
            requires: "snapshot",
        })?;
        let meta_name = format!("{}.json", role);
        let meta = snapshot
            .signed
            .meta
            .get(&meta_name)
            .context(error::MetaMissing {
                file: meta_name.as_str(),
                role: "snapshot",
            })?;
        let max_size = meta.length.unwrap_or(self.limits.max_targets_size);
        let version = if self.trusted.root().signed.consistent_snapshot {
            Some(meta.version.get())
        } else {
            None
        };

        let data = self.download_metadata(role, version, max_size, "targets meta length")?;
        self.trusted.update_delegated_targets(&data, role, parent)?;
        self.datastore.write(&filename, &data)
    }

    /// Pre-order depth-first traversal of the delegation tree, returning the
    /// target descriptor found in the most trusted role that lists
    /// `target_path`.
    fn walk_delegations(&mut self, target_path: &str) -> Result<Target> {
        // (role, delegating parent) pairs still to be inspected, most
        // trusted on top
        let mut to_visit = vec![(TARGETS.to_owned(), ROOT.to_owned())];
        let mut visited = HashSet::new();

        while visited.len() as u64 <= self.limits.max_delegations {
            let (role, parent) = match to_visit.pop() {
                Some(delegation) => delegation,
                None => break,
            };
            // cycle guard
            if visited.contains(&role) {
                debug!("skipping visited role {}", role);
                continue;
            }

            let targets = self.load_targets(&role, &parent)?;
            if let Some(target) = targets.signed.targets.get(target_path) {
                debug!("found target in role {}", role);
                let mut target = target.clone();
                target.path = target_path.to_owned();
                return Ok(target);
            }

            let mut children = Vec::new();
            let mut terminating = false;
            if let Some(delegations) = &targets.signed.delegations {
                // declaration order encodes trust order; a terminating match
                // ends the collection and forbids backtracking past it
                for child in delegations.roles_for_target(target_path) {
                    debug!("adding child role {}", child.name);
                    children.push((child.name.clone(), role.clone()));
                    if child.terminating {
                        debug!("not backtracking to other roles");
                        terminating = true;
                        break;
                    }
                }
            }

            visited.insert(role);
            if terminating {
                to_visit.clear();
            }
            // push in reverse so the first-declared child is popped first
            children.reverse();
            to_visit.append(&mut children);
        }

        if !to_visit.is_empty() {
            debug!(
                "{} roles left to visit, but at most {} delegations allowed",
                to_visit.len(),
                self.limits.max_delegations
            );
        }
        error::TargetNotFound {
            target: target_path,
        }
        .fail()
    }

    /// Download one metadata file, named `<version>.<role>.json` when
    /// `version` is given (consistent snapshots) and `<role>.json`
    /// otherwise.
    fn download_metadata(
        &self,
        role: &str,
        version: Option<u64>,
        max_size: u64,
        specifier: &'static str,
    ) -> Result<Vec<u8>> {
        let filename = match version {
            Some(version) => format!("{}.{}.json", version, encode_filename(role)),
            None => format!("{}.json", encode_filename(role)),
        };
        let url = self
            .metadata_base_url
            .join(&filename)
            .context(error::JoinUrl {
                path: filename.as_str(),
                url: self.metadata_base_url.clone(),
            })?;
        fetch_max_size(self.transport.as_ref(), url, max_size, specifier)
    }

    /// The default local path for a target: its URL-escaped path under the
    /// target directory.
    fn generate_target_file_path(&self, target: &Target) -> PathBuf {
        self.target_dir.join(encode_filename(&target.path))
    }
}

fn is_file_not_found(err: &Error) -> bool {
    matches!(
        err,
        Error::Transport {
            source: crate::transport::TransportError {
                kind: TransportErrorKind::FileNotFound,
                ..
            },
            ..
        }
    )
}

fn ensure_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
