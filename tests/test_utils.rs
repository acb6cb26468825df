// SPDX-License-Identifier: MIT OR Apache-2.0

//! Utilities for tests: a repository fixture that generates ed25519 keys,
//! builds and signs linked metadata in memory, and lays the files out the
//! way a TUF mirror would. Not every test module uses every helper, so we
//! suppress unused warnings.
#![allow(unused)]

use chrono::{DateTime, Duration, Utc};
use ring::digest::{digest, SHA256};
use ring::rand::SystemRandom;
use ring::signature::Ed25519KeyPair;
use std::collections::HashMap;
use std::fs;
use std::num::NonZeroU64;
use std::path::Path;
use url::Url;
use verity::schema::decoded::{Decoded, Hex};
use verity::schema::key::Key;
use verity::schema::{
    DelegatedRole, Delegations, Hashes, MetaFile, PathSet, Role, Root, RoleType, Signed, Snapshot,
    Target, Targets, Timestamp,
};
use verity::sign::Sign;

/// Converts a filepath into a URI formatted string.
pub fn dir_url<P: AsRef<Path>>(path: P) -> Url {
    Url::from_directory_path(path).unwrap()
}

pub fn nz(n: u64) -> NonZeroU64 {
    NonZeroU64::new(n).unwrap()
}

pub fn days_hence(days: i64) -> DateTime<Utc> {
    Utc::now() + Duration::days(days)
}

/// Generate a fresh ed25519 signing key, returned as its pkcs8 document so
/// it can be stored and re-opened (ring keypairs are not clonable).
pub fn generate_key(rng: &SystemRandom) -> Vec<u8> {
    Ed25519KeyPair::generate_pkcs8(rng).unwrap().as_ref().to_vec()
}

pub fn keypair(pkcs8: &[u8]) -> Ed25519KeyPair {
    Ed25519KeyPair::from_pkcs8(pkcs8).unwrap()
}

pub fn public_key(pkcs8: &[u8]) -> Key {
    keypair(pkcs8).tuf_key()
}

/// Clear, re-sign with every given key, and serialize.
pub fn sign_and_serialize<T>(doc: &Signed<T>, keys: &[&Ed25519KeyPair], rng: &SystemRandom) -> Vec<u8>
where
    T: Role + Clone + serde::de::DeserializeOwned,
{
    let mut doc = doc.clone();
    doc.clear_signatures();
    for key in keys {
        doc.sign(*key, rng).unwrap();
    }
    doc.to_bytes_pretty().unwrap()
}

/// A `MetaFile` entry describing `bytes`: its length, sha256 digest, and
/// version.
pub fn meta_file(bytes: &[u8], version: u64) -> MetaFile {
    let mut meta = MetaFile::new(nz(version));
    meta.length = Some(bytes.len() as u64);
    meta.hashes = Some(sha256_hashes(bytes));
    meta
}

pub fn sha256_hashes(bytes: &[u8]) -> Hashes {
    let mut hashes = Hashes::new();
    hashes.insert(
        "sha256".to_owned(),
        Decoded::<Hex>::from(digest(&SHA256, bytes).as_ref().to_vec()),
    );
    hashes
}

/// A repository under construction: a current root (plus any rotated
/// predecessors), a tree of targets documents, and the target files they
/// describe. `write` signs everything, links the snapshot and timestamp to
/// the serialized bytes, and lays the files out for a mirror directory.
pub struct RepoFixture {
    pub rng: SystemRandom,
    keys: HashMap<String, Vec<u8>>,
    pub roots: Vec<Signed<Root>>,
    pub targets_docs: Vec<(String, Signed<Targets>)>,
    pub target_files: Vec<(String, Vec<u8>)>,
    pub snapshot_version: u64,
    pub timestamp_version: u64,
    pub snapshot_expires: DateTime<Utc>,
    pub timestamp_expires: DateTime<Utc>,
    pub consistent_snapshot: bool,
}

impl RepoFixture {
    pub fn new(consistent_snapshot: bool) -> Self {
        let rng = SystemRandom::new();
        let mut keys = HashMap::new();
        let expires = days_hence(30);

        let mut root = Root::new(expires);
        root.consistent_snapshot = consistent_snapshot;
        for (name, role) in &[
            ("root", RoleType::Root),
            ("timestamp", RoleType::Timestamp),
            ("snapshot", RoleType::Snapshot),
            ("targets", RoleType::Targets),
        ] {
            let pkcs8 = generate_key(&rng);
            root.add_key(public_key(&pkcs8), *role).unwrap();
            keys.insert((*name).to_owned(), pkcs8);
        }

        Self {
            rng,
            keys,
            roots: vec![Signed::new(root)],
            targets_docs: vec![("targets".to_owned(), Signed::new(Targets::new(expires)))],
            target_files: Vec::new(),
            snapshot_version: 1,
            timestamp_version: 1,
            snapshot_expires: expires,
            timestamp_expires: expires,
            consistent_snapshot,
        }
    }

    pub fn key(&self, name: &str) -> Ed25519KeyPair {
        keypair(&self.keys[name])
    }

    /// Append a new root version with the same contents and keys.
    pub fn rotate_root(&mut self) {
        let mut root = self.roots.last().unwrap().signed.clone();
        root.version = nz(root.version.get() + 1);
        self.roots.push(Signed::new(root));
    }

    pub fn targets_doc_mut(&mut self, role: &str) -> &mut Signed<Targets> {
        self.targets_docs
            .iter_mut()
            .find(|(name, _)| name == role)
            .map(|(_, doc)| doc)
            .unwrap()
    }

    /// Add a target file to `role`'s document and remember its bytes for
    /// the mirror layout.
    pub fn add_target(&mut self, role: &str, path: &str, data: &[u8]) {
        let target = Target::from_bytes(data, &[]).unwrap();
        self.targets_doc_mut(role).signed.add_target(path, target);
        self.target_files.push((path.to_owned(), data.to_vec()));
    }

    /// Delegate `paths` from `parent` to a new role `name` with a fresh key
    /// and an empty targets document.
    pub fn add_delegation(&mut self, parent: &str, name: &str, paths: &[&str], terminating: bool) {
        let pkcs8 = generate_key(&self.rng);
        self.push_delegation(parent, name, &pkcs8, paths, terminating);
        self.keys.insert(name.to_owned(), pkcs8);
        self.targets_docs
            .push((name.to_owned(), Signed::new(Targets::new(days_hence(30)))));
    }

    /// Add a delegation entry from `parent` to an already-existing role,
    /// reusing its key. Useful for building delegation cycles.
    pub fn delegate_existing(
        &mut self,
        parent: &str,
        name: &str,
        paths: &[&str],
        terminating: bool,
    ) {
        let pkcs8 = self.keys[name].clone();
        self.push_delegation(parent, name, &pkcs8, paths, terminating);
    }

    fn push_delegation(
        &mut self,
        parent: &str,
        name: &str,
        pkcs8: &[u8],
        paths: &[&str],
        terminating: bool,
    ) {
        let key = public_key(pkcs8);
        let keyid = key.key_id().unwrap();
        let parent_doc = self.targets_doc_mut(parent);
        let delegations = parent_doc
            .signed
            .delegations
            .get_or_insert_with(Delegations::default);
        delegations.keys.insert(keyid.clone(), key);
        delegations.roles.push(DelegatedRole {
            name: name.to_owned(),
            keyids: vec![keyid],
            threshold: nz(1),
            paths: PathSet::Paths(paths.iter().map(|p| (*p).to_owned()).collect()),
            terminating,
        });
    }

    /// The serialized first root version, for seeding a client's trust
    /// store. Ed25519 signatures are deterministic, so this matches what
    /// `write` produces for `1.root.json`.
    pub fn root_bytes(&self) -> Vec<u8> {
        sign_and_serialize(&self.roots[0], &[&self.key("root")], &self.rng)
    }

    /// Create `<dir>/root.json` seeded with the first root version.
    pub fn install_client(&self, metadata_dir: &Path) {
        fs::create_dir_all(metadata_dir).unwrap();
        fs::write(metadata_dir.join("root.json"), self.root_bytes()).unwrap();
    }

    /// Sign and write the whole repository under `metadata_dir` and
    /// `targets_dir` using the mirror's filename conventions.
    pub fn write(&self, metadata_dir: &Path, targets_dir: &Path) {
        fs::create_dir_all(metadata_dir).unwrap();
        fs::create_dir_all(targets_dir).unwrap();

        // roots are always served version-prefixed
        for root in &self.roots {
            let bytes = sign_and_serialize(root, &[&self.key("root")], &self.rng);
            fs::write(
                metadata_dir.join(format!("{}.root.json", root.signed.version)),
                bytes,
            )
            .unwrap();
        }

        // targets documents, recording their meta entries for the snapshot
        let mut snapshot_meta = HashMap::new();
        for (name, doc) in &self.targets_docs {
            let bytes = sign_and_serialize(doc, &[&self.key(name)], &self.rng);
            snapshot_meta.insert(
                format!("{}.json", name),
                meta_file(&bytes, doc.signed.version.get()),
            );
            let filename = if self.consistent_snapshot {
                format!("{}.{}.json", doc.signed.version, name)
            } else {
                format!("{}.json", name)
            };
            fs::write(metadata_dir.join(filename), bytes).unwrap();
        }

        // snapshot, then the timestamp that attests to it
        let mut snapshot = Snapshot::new(self.snapshot_expires);
        snapshot.version = nz(self.snapshot_version);
        snapshot.meta = snapshot_meta;
        let snapshot_bytes = sign_and_serialize(
            &Signed::new(snapshot),
            &[&self.key("snapshot")],
            &self.rng,
        );
        let snapshot_name = if self.consistent_snapshot {
            format!("{}.snapshot.json", self.snapshot_version)
        } else {
            "snapshot.json".to_owned()
        };
        fs::write(metadata_dir.join(snapshot_name), &snapshot_bytes).unwrap();

        let mut timestamp = Timestamp::new(self.timestamp_expires);
        timestamp.version = nz(self.timestamp_version);
        timestamp.meta.insert(
            "snapshot.json".to_owned(),
            meta_file(&snapshot_bytes, self.snapshot_version),
        );
        let timestamp_bytes = sign_and_serialize(
            &Signed::new(timestamp),
            &[&self.key("timestamp")],
            &self.rng,
        );
        fs::write(metadata_dir.join("timestamp.json"), timestamp_bytes).unwrap();

        // target files, hash-prefixed as well when consistent snapshots are
        // in use
        for (path, data) in &self.target_files {
            let plain = targets_dir.join(path);
            if let Some(parent) = plain.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(&plain, data).unwrap();
            if self.consistent_snapshot {
                if let Some((dir, base)) = path.split_once('/') {
                    let digest = hex::encode(digest(&SHA256, data).as_ref());
                    fs::write(
                        targets_dir.join(dir).join(format!("{}.{}", digest, base)),
                        data,
                    )
                    .unwrap();
                }
            }
        }
    }
}
