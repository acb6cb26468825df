// SPDX-License-Identifier: MIT OR Apache-2.0

#![allow(clippy::used_underscore_binding)]

//! Provides the schema objects as defined by the TUF spec: the four role
//! documents, the signature envelope, keys, and delegations, along with the
//! integrity checks (length and hash verification) that the update workflow
//! applies to raw document bytes.

mod de;
pub mod decoded;
mod error;
mod iter;
pub mod key;
mod spki;
mod verify;

pub use crate::schema::error::{Error, Result};

use crate::schema::decoded::{Decoded, Hex};
use crate::schema::iter::KeysIter;
use crate::schema::key::Key;
use chrono::{DateTime, Utc};
use globset::Glob;
use olpc_cjson::CanonicalFormatter;
use ring::digest::{digest, Context, SHA256, SHA512};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_plain::{forward_display_to_serde, forward_from_str_to_serde};
use snafu::{ensure, OptionExt, ResultExt};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::Read;
use std::num::NonZeroU64;
use std::path::Path;

/// The version of the TUF specification that documents created by this crate
/// declare.
pub const SPEC_VERSION: &str = "1.0.31";

/// Initial version numbers and default thresholds are both 1.
const ONE: NonZeroU64 = match NonZeroU64::new(1) {
    Some(v) => v,
    None => panic!("1 is nonzero"),
};

/// The type of metadata role.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum RoleType {
    /// The root role delegates trust to specific keys trusted for all other
    /// top-level roles used in the system.
    Root,
    /// The snapshot role signs a metadata file that provides information
    /// about the latest version of all targets metadata on the repository.
    Snapshot,
    /// The targets role's signature indicates which target files are trusted
    /// by clients.
    Targets,
    /// The timestamp role is used to prevent an adversary from replaying an
    /// out-of-date signed metadata file whose signature has not yet expired.
    Timestamp,
}

forward_display_to_serde!(RoleType);
forward_from_str_to_serde!(RoleType);

/// Common trait implemented by all roles.
pub trait Role: Serialize {
    /// The type of role this object represents.
    const TYPE: RoleType;

    /// Determines when metadata should be considered expired and no longer
    /// trusted by clients.
    fn expires(&self) -> DateTime<Utc>;

    /// An integer that is greater than 0. Clients MUST NOT replace a metadata
    /// file with a version number less than the one currently trusted.
    fn version(&self) -> NonZeroU64;

    /// Whether `reference_time` is past this document's expiration.
    fn is_expired(&self, reference_time: DateTime<Utc>) -> bool {
        reference_time > self.expires()
    }

    /// A deterministic JSON serialization used as the signing input for a
    /// metadata object.
    /// [More info on canonical JSON](http://wiki.laptop.org/go/Canonical_JSON)
    fn canonical_form(&self) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(&mut data, CanonicalFormatter::new());
        self.serialize(&mut ser).context(error::JsonSerialization {
            what: "role".to_owned(),
        })?;
        Ok(data)
    }
}

/// A signed metadata object.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Signed<T> {
    /// The role that is signed.
    pub signed: T,
    /// A list of signatures and their key IDs. Each key ID may appear at
    /// most once; documents violating this fail to parse.
    #[serde(deserialize_with = "de::deserialize_signatures")]
    pub signatures: Vec<Signature>,
}

/// A signature and the key ID that made it.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Signature {
    /// The key ID (listed in root.json or a delegation) that made this
    /// signature.
    pub keyid: Decoded<Hex>,
    /// A hex-encoded signature of the canonical JSON form of a role.
    pub sig: Decoded<Hex>,
}

impl<T> Signed<T> {
    /// Wrap a freshly constructed role with an empty signature list.
    pub fn new(signed: T) -> Self {
        Self {
            signed,
            signatures: Vec::new(),
        }
    }

    /// Remove all signatures. Callers re-signing an already-signed document
    /// must clear first; signing twice with the same key produces a duplicate
    /// that the next parse will reject.
    pub fn clear_signatures(&mut self) {
        self.signatures.clear();
    }
}

/// Used by `from_bytes` to check a document's role tag before any field of
/// the expected shape is interpreted.
#[derive(Deserialize)]
struct TypeProbe {
    signed: TypeTag,
}

#[derive(Deserialize)]
struct TypeTag {
    #[serde(rename = "_type")]
    tag: RoleType,
}

impl<T: Role + DeserializeOwned> Signed<T> {
    /// Parse a metadata document from its wire form.
    ///
    /// Fails if the document's `signed._type` does not name `T`'s role, or if
    /// the same key ID appears more than once in `signatures`. Signatures are
    /// *not* verified here; that is the trusted set's job.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let probe: TypeProbe = serde_json::from_slice(data).context(error::ParseMetadata {
            what: T::TYPE.to_string(),
        })?;
        ensure!(
            probe.signed.tag == T::TYPE,
            error::WrongType {
                expected: T::TYPE,
                found: probe.signed.tag,
            }
        );
        serde_json::from_slice(data).context(error::ParseMetadata {
            what: T::TYPE.to_string(),
        })
    }

    /// Serialize this document to its wire form.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).context(error::JsonSerialization {
            what: T::TYPE.to_string(),
        })
    }

    /// Serialize this document to a pretty-printed wire form. Signatures
    /// cover only the canonical form, so the layout on disk is free.
    pub fn to_bytes_pretty(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).context(error::JsonSerialization {
            what: T::TYPE.to_string(),
        })
    }
}

// =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=

/// The root.json file is signed by the root role's keys. It indicates which
/// keys are authorized for all top-level roles, including the root role
/// itself. Revocation and replacement of top-level role keys is done by
/// changing the keys listed for the roles in this file.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "_type")]
#[serde(rename = "root")]
pub struct Root {
    /// A string that contains the version number of the TUF specification.
    pub spec_version: String,

    /// A boolean indicating whether the repository supports consistent
    /// snapshots. When true, non-timestamp metadata and target filenames are
    /// prefixed with a version number or digest.
    pub consistent_snapshot: bool,

    /// An integer that is greater than 0. Clients MUST NOT replace a metadata
    /// file with a version number less than the one currently trusted.
    pub version: NonZeroU64,

    /// Determines when metadata should be considered expired and no longer
    /// trusted by clients.
    pub expires: DateTime<Utc>,

    /// The keys trusted for the top-level roles. Each key ID must be correct
    /// for its key; this is validated during deserialization.
    #[serde(deserialize_with = "de::deserialize_keys")]
    pub keys: HashMap<Decoded<Hex>, Key>,

    /// A list of roles, the key IDs associated with each role, and the
    /// threshold of signatures required for each role.
    pub roles: HashMap<RoleType, RoleKeys>,

    /// Extra arguments found during deserialization.
    ///
    /// We must store these to correctly verify signatures for this object.
    ///
    /// If you're instantiating this struct, you should make this
    /// `HashMap::new()`.
    #[serde(flatten)]
    #[serde(deserialize_with = "de::extra_skip_type")]
    pub _extra: HashMap<String, Value>,
}

/// Represents the key IDs used for a role and the threshold of signatures
/// required to validate it.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RoleKeys {
    /// The key IDs used for the role.
    pub keyids: Vec<Decoded<Hex>>,

    /// The threshold of signatures required to validate the role.
    pub threshold: NonZeroU64,

    /// Extra arguments found during deserialization.
    #[serde(flatten)]
    pub _extra: HashMap<String, Value>,
}

impl Root {
    /// Create a new `Root` with the given expiration: version 1, consistent
    /// snapshots enabled, and all four top-level roles present with no keys
    /// and a threshold of 1.
    pub fn new(expires: DateTime<Utc>) -> Self {
        let roles = [
            RoleType::Root,
            RoleType::Snapshot,
            RoleType::Targets,
            RoleType::Timestamp,
        ]
        .iter()
        .map(|role| {
            (
                *role,
                RoleKeys {
                    keyids: Vec::new(),
                    threshold: ONE,
                    _extra: HashMap::new(),
                },
            )
        })
        .collect();
        Self {
            spec_version: SPEC_VERSION.to_owned(),
            consistent_snapshot: true,
            version: ONE,
            expires,
            keys: HashMap::new(),
            roles,
            _extra: HashMap::new(),
        }
    }

    /// An iterator over the keys for a given role.
    pub fn keys(&self, role: RoleType) -> impl Iterator<Item = &Key> {
        KeysIter {
            keyids_iter: match self.roles.get(&role) {
                Some(role_keys) => role_keys.keyids.iter(),
                None => [].iter(),
            },
            keys: &self.keys,
        }
    }

    /// Add `key` to `role`, registering it in the key store. Adding a key the
    /// role already lists is a no-op.
    pub fn add_key(&mut self, key: Key, role: RoleType) -> Result<Decoded<Hex>> {
        let keyid = key.key_id()?;
        let role_keys = self.roles.get_mut(&role).context(error::RoleNotFound {
            name: role.to_string(),
        })?;
        if !role_keys.keyids.contains(&keyid) {
            role_keys.keyids.push(keyid.clone());
        }
        self.keys.insert(keyid.clone(), key);
        Ok(keyid)
    }

    /// Remove `keyid` from `role`. The key is dropped from the key store
    /// only once no role lists it.
    pub fn revoke_key(&mut self, keyid: &Decoded<Hex>, role: RoleType) -> Result<()> {
        let role_keys = self.roles.get_mut(&role).context(error::RoleNotFound {
            name: role.to_string(),
        })?;
        ensure!(
            role_keys.keyids.contains(keyid),
            error::KeyNotFound {
                keyid: hex::encode(keyid),
                role: role.to_string(),
            }
        );
        role_keys.keyids.retain(|id| id != keyid);
        if !self.roles.values().any(|r| r.keyids.contains(keyid)) {
            self.keys.remove(keyid);
        }
        Ok(())
    }
}

impl Role for Root {
    const TYPE: RoleType = RoleType::Root;

    fn expires(&self) -> DateTime<Utc> {
        self.expires
    }

    fn version(&self) -> NonZeroU64 {
        self.version
    }
}

// =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=

/// A map of hash algorithm name to digest. `sha256` and `sha512` are the
/// algorithms this implementation computes; any other name fails hash
/// verification.
pub type Hashes = BTreeMap<String, Decoded<Hex>>;

/// Verify that `data` is exactly `expected` bytes long.
pub fn verify_length(data: &[u8], expected: u64) -> Result<()> {
    ensure!(
        data.len() as u64 == expected,
        error::LengthMismatch {
            expected,
            found: data.len() as u64,
        }
    );
    Ok(())
}

/// Verify `data` against every digest in `hashes`. An empty map verifies
/// nothing; an unsupported algorithm name is an error.
pub fn verify_hashes(data: &[u8], hashes: &Hashes) -> Result<()> {
    for (algorithm, expected) in hashes {
        let calculated = match algorithm.as_str() {
            "sha256" => digest(&SHA256, data),
            "sha512" => digest(&SHA512, data),
            _ => {
                return error::UnsupportedAlgorithm {
                    algorithm: algorithm.clone(),
                }
                .fail()
            }
        };
        ensure!(
            calculated.as_ref() == expected.as_ref(),
            error::HashMismatch {
                algorithm: algorithm.clone(),
                expected: expected.to_string(),
                calculated: hex::encode(calculated),
            }
        );
    }
    Ok(())
}

/// Describes a metadata file listed in `timestamp.json` or `snapshot.json`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct MetaFile {
    /// The integer length in bytes of the described metadata file. Optional;
    /// when absent the client uses a configured download limit instead.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,

    /// One or more hashes of the described metadata file. Optional; when
    /// absent the version number alone identifies the file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hashes: Option<Hashes>,

    /// An integer that is greater than 0. Clients MUST NOT replace a metadata
    /// file with a version number less than the one currently trusted.
    pub version: NonZeroU64,

    /// Extra arguments found during deserialization.
    #[serde(flatten)]
    pub _extra: HashMap<String, Value>,
}

impl MetaFile {
    /// Create a `MetaFile` carrying only a version number.
    pub fn new(version: NonZeroU64) -> Self {
        Self {
            length: None,
            hashes: None,
            version,
            _extra: HashMap::new(),
        }
    }

    /// Verify `data` against whichever of length and hashes this entry
    /// declares. Both are optional for metadata files.
    pub fn verify_length_hashes(&self, data: &[u8]) -> Result<()> {
        if let Some(hashes) = &self.hashes {
            verify_hashes(data, hashes)?;
        }
        if let Some(length) = self.length {
            verify_length(data, length)?;
        }
        Ok(())
    }
}

// =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=

/// The timestamp.json file is signed by the timestamp key. It indicates the
/// latest version of the snapshot metadata and is frequently re-signed to
/// limit the amount of time a client can be kept unaware of interference with
/// obtaining updates.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "_type")]
#[serde(rename = "timestamp")]
pub struct Timestamp {
    /// A string that contains the version number of the TUF specification.
    pub spec_version: String,

    /// An integer that is greater than 0. Clients MUST NOT replace a metadata
    /// file with a version number less than the one currently trusted.
    pub version: NonZeroU64,

    /// Determines when metadata should be considered expired and no longer
    /// trusted by clients.
    pub expires: DateTime<Utc>,

    /// In timestamp.json this must describe exactly `snapshot.json`.
    pub meta: HashMap<String, MetaFile>,

    /// Extra arguments found during deserialization.
    #[serde(flatten)]
    #[serde(deserialize_with = "de::extra_skip_type")]
    pub _extra: HashMap<String, Value>,
}

impl Timestamp {
    /// Create a new `Timestamp` at version 1 describing version 1 of the
    /// snapshot.
    pub fn new(expires: DateTime<Utc>) -> Self {
        let mut meta = HashMap::new();
        meta.insert("snapshot.json".to_owned(), MetaFile::new(ONE));
        Self {
            spec_version: SPEC_VERSION.to_owned(),
            version: ONE,
            expires,
            meta,
            _extra: HashMap::new(),
        }
    }

    /// The mandatory `snapshot.json` entry, or `None` for a malformed
    /// document that omits it.
    pub fn snapshot_meta(&self) -> Option<&MetaFile> {
        self.meta.get("snapshot.json")
    }
}

impl Role for Timestamp {
    const TYPE: RoleType = RoleType::Timestamp;

    fn expires(&self) -> DateTime<Utc> {
        self.expires
    }

    fn version(&self) -> NonZeroU64 {
        self.version
    }
}

// =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=

/// The snapshot.json file is signed by the snapshot role. It lists the
/// version numbers of the top-level targets metadata and all delegated
/// targets metadata, and may also list their lengths and hashes.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "_type")]
#[serde(rename = "snapshot")]
pub struct Snapshot {
    /// A string that contains the version number of the TUF specification.
    pub spec_version: String,

    /// An integer that is greater than 0. Clients MUST NOT replace a metadata
    /// file with a version number less than the one currently trusted.
    pub version: NonZeroU64,

    /// Determines when metadata should be considered expired and no longer
    /// trusted by clients.
    pub expires: DateTime<Utc>,

    /// Metadata filename (for example `targets.json`) to a description of
    /// that file.
    pub meta: HashMap<String, MetaFile>,

    /// Extra arguments found during deserialization.
    #[serde(flatten)]
    #[serde(deserialize_with = "de::extra_skip_type")]
    pub _extra: HashMap<String, Value>,
}

impl Snapshot {
    /// Create a new `Snapshot` at version 1 describing version 1 of the
    /// top-level targets.
    pub fn new(expires: DateTime<Utc>) -> Self {
        let mut meta = HashMap::new();
        meta.insert("targets.json".to_owned(), MetaFile::new(ONE));
        Self {
            spec_version: SPEC_VERSION.to_owned(),
            version: ONE,
            expires,
            meta,
            _extra: HashMap::new(),
        }
    }
}

impl Role for Snapshot {
    const TYPE: RoleType = RoleType::Snapshot;

    fn expires(&self) -> DateTime<Utc> {
        self.expires
    }

    fn version(&self) -> NonZeroU64 {
        self.version
    }
}

// =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=

/// Represents a `targets.json` file, either the top-level targets role or a
/// delegated one.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "_type")]
#[serde(rename = "targets")]
pub struct Targets {
    /// A string that contains the version number of the TUF specification.
    pub spec_version: String,

    /// An integer that is greater than 0. Clients MUST NOT replace a metadata
    /// file with a version number less than the one currently trusted.
    pub version: NonZeroU64,

    /// Determines when metadata should be considered expired and no longer
    /// trusted by clients.
    pub expires: DateTime<Utc>,

    /// Each key is a target path relative to a mirror's base URL of targets.
    pub targets: HashMap<String, Target>,

    /// Describes subsets of the targets for which responsibility is delegated
    /// to other roles.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delegations: Option<Delegations>,

    /// Extra arguments found during deserialization.
    #[serde(flatten)]
    #[serde(deserialize_with = "de::extra_skip_type")]
    pub _extra: HashMap<String, Value>,
}

impl Targets {
    /// Create a new `Targets` at version 1 with no targets and no
    /// delegations.
    pub fn new(expires: DateTime<Utc>) -> Self {
        Self {
            spec_version: SPEC_VERSION.to_owned(),
            version: ONE,
            expires,
            targets: HashMap::new(),
            delegations: None,
            _extra: HashMap::new(),
        }
    }

    /// Add a target to this role.
    pub fn add_target(&mut self, name: &str, target: Target) {
        self.targets.insert(name.to_owned(), target);
    }

    /// Remove a target from this role.
    pub fn remove_target(&mut self, name: &str) -> Option<Target> {
        self.targets.remove(name)
    }

    /// Add `key` to the delegated role `name`, registering it in the
    /// delegations key store. Fails if `name` is not delegated by this
    /// document.
    pub fn add_key(&mut self, key: Key, name: &str) -> Result<Decoded<Hex>> {
        let keyid = key.key_id()?;
        let delegations = self
            .delegations
            .as_mut()
            .context(error::RoleNotFound { name })?;
        let role = delegations
            .roles
            .iter_mut()
            .find(|role| role.name == name)
            .context(error::RoleNotFound { name })?;
        if !role.keyids.contains(&keyid) {
            role.keyids.push(keyid.clone());
        }
        delegations.keys.insert(keyid.clone(), key);
        Ok(keyid)
    }

    /// Remove `keyid` from the delegated role `name`. The key is dropped
    /// from the delegations key store only once no delegated role lists it.
    pub fn revoke_key(&mut self, keyid: &Decoded<Hex>, name: &str) -> Result<()> {
        let delegations = self
            .delegations
            .as_mut()
            .context(error::RoleNotFound { name })?;
        let role = delegations
            .roles
            .iter_mut()
            .find(|role| role.name == name)
            .context(error::RoleNotFound { name })?;
        ensure!(
            role.keyids.contains(keyid),
            error::KeyNotFound {
                keyid: hex::encode(keyid),
                role: name,
            }
        );
        role.keyids.retain(|id| id != keyid);
        if !delegations.roles.iter().any(|r| r.keyids.contains(keyid)) {
            delegations.keys.remove(keyid);
        }
        Ok(())
    }
}

impl Role for Targets {
    const TYPE: RoleType = RoleType::Targets;

    fn expires(&self) -> DateTime<Utc> {
        self.expires
    }

    fn version(&self) -> NonZeroU64 {
        self.version
    }
}

/// Describes a target file.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Target {
    /// The integer length in bytes of the target file.
    pub length: u64,

    /// One or more hashes of the target file. A target must declare at least
    /// one hash in a supported algorithm.
    pub hashes: Hashes,

    /// Opaque application data describing the file. The framework does not
    /// interpret it.
    #[serde(default)]
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub custom: HashMap<String, Value>,

    /// The target path this descriptor was resolved from. Not part of the
    /// wire format; attached when a target is looked up.
    #[serde(skip)]
    pub path: String,

    /// Extra arguments found during deserialization.
    #[serde(flatten)]
    pub _extra: HashMap<String, Value>,
}

impl Target {
    /// Build a target descriptor for in-memory data, computing digests with
    /// the named algorithms (`sha256` if none are given).
    pub fn from_bytes(data: &[u8], algorithms: &[&str]) -> Result<Self> {
        let algorithms: &[&str] = if algorithms.is_empty() {
            &["sha256"]
        } else {
            algorithms
        };
        let mut hashes = Hashes::new();
        for &algorithm in algorithms {
            let digest = match algorithm {
                "sha256" => digest(&SHA256, data),
                "sha512" => digest(&SHA512, data),
                _ => return error::UnsupportedAlgorithm { algorithm }.fail(),
            };
            hashes.insert(
                algorithm.to_owned(),
                Decoded::from(digest.as_ref().to_vec()),
            );
        }
        Ok(Self {
            length: data.len() as u64,
            hashes,
            custom: HashMap::new(),
            path: String::new(),
            _extra: HashMap::new(),
        })
    }

    /// Build a target descriptor from a file on disk, with its sha256 digest.
    pub fn from_path<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        if !path.is_file() {
            return error::TargetNotAFile { path }.fail();
        }

        let mut file = File::open(path).context(error::FileOpen { path })?;
        let mut digest = Context::new(&SHA256);
        let mut buf = [0; 8 * 1024];
        let mut length = 0;
        loop {
            match file.read(&mut buf).context(error::FileRead { path })? {
                0 => break,
                n => {
                    digest.update(&buf[..n]);
                    length += n as u64;
                }
            }
        }

        let mut hashes = Hashes::new();
        hashes.insert(
            "sha256".to_owned(),
            Decoded::from(digest.finish().as_ref().to_vec()),
        );
        Ok(Self {
            length,
            hashes,
            custom: HashMap::new(),
            path: String::new(),
            _extra: HashMap::new(),
        })
    }

    /// Verify `data` against this descriptor. Unlike metadata files, targets
    /// must declare a length and at least one hash.
    pub fn verify_length_hashes(&self, data: &[u8]) -> Result<()> {
        ensure!(!self.hashes.is_empty(), error::MissingHashes);
        verify_hashes(data, &self.hashes)?;
        verify_length(data, self.length)
    }
}

/// Delegations are found in a `targets.json` file and name the roles trusted
/// for subsets of the target paths.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct Delegations {
    /// The public keys used to verify signatures of delegated targets roles.
    #[serde(deserialize_with = "de::deserialize_keys")]
    pub keys: HashMap<Decoded<Hex>, Key>,

    /// The list of delegated roles. Order is significant: earlier entries
    /// are more trusted, and the delegation walk visits them first.
    pub roles: Vec<DelegatedRole>,
}

impl Delegations {
    /// The delegated roles responsible for `target_path`, in declaration
    /// order.
    pub fn roles_for_target<'a>(
        &'a self,
        target_path: &'a str,
    ) -> impl Iterator<Item = &'a DelegatedRole> {
        self.roles
            .iter()
            .filter(move |role| role.paths.matched_target(target_path))
    }

    /// Look up a delegated role by name.
    pub fn role(&self, name: &str) -> Option<&DelegatedRole> {
        self.roles.iter().find(|role| role.name == name)
    }
}

/// Each role delegated in a targets file is considered a delegated role.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct DelegatedRole {
    /// The name of the delegated role. For example, "projects".
    pub name: String,

    /// The key IDs used by this role.
    pub keyids: Vec<Decoded<Hex>>,

    /// The threshold of signatures required to validate the role.
    pub threshold: NonZeroU64,

    /// The paths governed by this role.
    #[serde(flatten)]
    pub paths: PathSet,

    /// Whether a failure to find the target in this role halts the walk
    /// instead of backtracking to less-trusted siblings.
    pub terminating: bool,
}

/// Specifies the target paths that a delegated role controls.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub enum PathSet {
    /// Shell-style path patterns the role is trusted to provide, e.g.
    /// `targets/*.tgz`.
    #[serde(rename = "paths")]
    Paths(Vec<String>),

    /// Hex digest prefixes of hashed target paths. The shape is preserved on
    /// the wire but the delegation walk never matches against it; roles
    /// delegated only by hash prefix are unreachable.
    #[serde(rename = "path_hash_prefixes")]
    PathHashPrefixes(Vec<String>),
}

impl PathSet {
    /// Whether `target` falls under this path set: true if any pattern in
    /// `paths` matches it.
    pub fn matched_target(&self, target: &str) -> bool {
        match self {
            Self::Paths(paths) => paths.iter().any(|path| Self::matched_path(path, target)),
            Self::PathHashPrefixes(_) => false,
        }
    }

    /// Given a shell-style wildcard path, determines if target matches it.
    fn matched_path(wildcardpath: &str, target: &str) -> bool {
        let glob = if let Ok(glob) = Glob::new(wildcardpath) {
            glob.compile_matcher()
        } else {
            return false;
        };
        glob.is_match(target)
    }

    /// Returns a Vec representation of the `PathSet`.
    pub fn vec(&self) -> &Vec<String> {
        match self {
            PathSet::Paths(x) | PathSet::PathHashPrefixes(x) => x,
        }
    }
}
