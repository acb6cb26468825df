// SPDX-License-Identifier: MIT OR Apache-2.0

//! Drives the trusted metadata set directly with crafted document bytes to
//! exercise the rollback, linkage, and expiration rules.

mod test_utils;

use chrono::{DateTime, Utc};
use test_utils::{
    days_hence, meta_file, nz, sign_and_serialize, RepoFixture,
};
use verity::error::Error;
use verity::schema::{MetaFile, Signed, Snapshot, Timestamp};
use verity::TrustedSet;

fn timestamp_bytes(
    fixture: &RepoFixture,
    version: u64,
    snapshot_meta: MetaFile,
    expires: DateTime<Utc>,
) -> Vec<u8> {
    let mut timestamp = Timestamp::new(expires);
    timestamp.version = nz(version);
    timestamp
        .meta
        .insert("snapshot.json".to_owned(), snapshot_meta);
    sign_and_serialize(
        &Signed::new(timestamp),
        &[&fixture.key("timestamp")],
        &fixture.rng,
    )
}

fn snapshot_bytes(
    fixture: &RepoFixture,
    version: u64,
    meta: &[(&str, MetaFile)],
    expires: DateTime<Utc>,
) -> Vec<u8> {
    let mut snapshot = Snapshot::new(expires);
    snapshot.version = nz(version);
    snapshot.meta = meta
        .iter()
        .map(|(name, meta)| ((*name).to_owned(), meta.clone()))
        .collect();
    sign_and_serialize(
        &Signed::new(snapshot),
        &[&fixture.key("snapshot")],
        &fixture.rng,
    )
}

#[test]
fn expired_root_rejected_at_bootstrap() {
    let fixture = RepoFixture::new(true);
    let root = fixture.root_bytes();

    // the fixture root expires 30 days out
    assert!(TrustedSet::with_reference_time(&root, days_hence(1)).is_ok());
    match TrustedSet::with_reference_time(&root, days_hence(60)) {
        Err(Error::ExpiredMetadata { .. }) => {}
        other => panic!("expected ExpiredMetadata, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn root_updates_are_strictly_incremental() {
    let mut fixture = RepoFixture::new(true);
    fixture.rotate_root(); // v2
    fixture.rotate_root(); // v3
    let root_key = fixture.key("root");
    let v1 = fixture.root_bytes();
    let v2 = sign_and_serialize(&fixture.roots[1], &[&root_key], &fixture.rng);
    let v3 = sign_and_serialize(&fixture.roots[2], &[&root_key], &fixture.rng);

    let mut set = TrustedSet::new(&v1).unwrap();

    // no skipping
    match set.update_root(&v3) {
        Err(Error::VersionMismatch {
            expected: 2,
            found: 3,
            ..
        }) => {}
        other => panic!("expected VersionMismatch, got {:?}", other),
    }
    set.update_root(&v2).unwrap();
    set.update_root(&v3).unwrap();
    assert_eq!(set.root().signed.version.get(), 3);

    // no going back either
    match set.update_root(&v2) {
        Err(Error::VersionMismatch { .. }) => {}
        other => panic!("expected VersionMismatch, got {:?}", other),
    }
}

#[test]
fn root_cannot_update_after_timestamp() {
    let mut fixture = RepoFixture::new(true);
    fixture.rotate_root();
    let root_key = fixture.key("root");
    let v1 = fixture.root_bytes();
    let v2 = sign_and_serialize(&fixture.roots[1], &[&root_key], &fixture.rng);

    let mut set = TrustedSet::new(&v1).unwrap();
    let timestamp = timestamp_bytes(&fixture, 1, MetaFile::new(nz(1)), days_hence(1));
    set.update_timestamp(&timestamp).unwrap();

    match set.update_root(&v2) {
        Err(Error::RootUpdateAfterTimestamp) => {}
        other => panic!("expected RootUpdateAfterTimestamp, got {:?}", other),
    }
}

#[test]
fn timestamp_rollback_rejected() {
    let fixture = RepoFixture::new(true);
    let mut set = TrustedSet::new(&fixture.root_bytes()).unwrap();

    let v5 = timestamp_bytes(&fixture, 5, MetaFile::new(nz(1)), days_hence(1));
    set.update_timestamp(&v5).unwrap();

    let v3 = timestamp_bytes(&fixture, 3, MetaFile::new(nz(1)), days_hence(1));
    match set.update_timestamp(&v3) {
        Err(Error::OlderMetadata {
            current_version: 5,
            new_version: 3,
            ..
        }) => {}
        other => panic!("expected OlderMetadata, got {:?}", other),
    }

    // the same version is a distinct, non-fatal signal
    match set.update_timestamp(&v5) {
        Err(err @ Error::EqualVersionNumber { .. }) => assert!(err.is_repository_error()),
        other => panic!("expected EqualVersionNumber, got {:?}", other),
    }
}

#[test]
fn timestamp_snapshot_meta_cannot_regress() {
    let fixture = RepoFixture::new(true);
    let mut set = TrustedSet::new(&fixture.root_bytes()).unwrap();

    let v1 = timestamp_bytes(&fixture, 1, MetaFile::new(nz(2)), days_hence(1));
    set.update_timestamp(&v1).unwrap();

    // newer timestamp, but it claims an older snapshot
    let v2 = timestamp_bytes(&fixture, 2, MetaFile::new(nz(1)), days_hence(1));
    match set.update_timestamp(&v2) {
        Err(Error::OlderMetadata { .. }) => {}
        other => panic!("expected OlderMetadata, got {:?}", other),
    }
}

#[test]
fn expired_timestamp_rejected() {
    let fixture = RepoFixture::new(true);
    let mut set = TrustedSet::new(&fixture.root_bytes()).unwrap();

    let expired = timestamp_bytes(&fixture, 1, MetaFile::new(nz(1)), days_hence(-1));
    match set.update_timestamp(&expired) {
        Err(Error::ExpiredMetadata { .. }) => {}
        other => panic!("expected ExpiredMetadata, got {:?}", other),
    }
}

#[test]
fn snapshot_version_must_match_timestamp() {
    let fixture = RepoFixture::new(true);
    let mut set = TrustedSet::new(&fixture.root_bytes()).unwrap();

    let snapshot = snapshot_bytes(
        &fixture,
        1,
        &[("targets.json", MetaFile::new(nz(1)))],
        days_hence(1),
    );
    // the timestamp's hashes match these bytes but it records version 2
    let timestamp = timestamp_bytes(&fixture, 1, meta_file(&snapshot, 2), days_hence(1));
    set.update_timestamp(&timestamp).unwrap();

    match set.update_snapshot(&snapshot, false) {
        Err(Error::VersionMismatch {
            expected: 2,
            found: 1,
            ..
        }) => {}
        other => panic!("expected VersionMismatch, got {:?}", other),
    }
}

#[test]
fn snapshot_bytes_must_match_timestamp_record() {
    let fixture = RepoFixture::new(true);
    let mut set = TrustedSet::new(&fixture.root_bytes()).unwrap();

    let snapshot = snapshot_bytes(
        &fixture,
        1,
        &[("targets.json", MetaFile::new(nz(1)))],
        days_hence(1),
    );
    let tampered = snapshot_bytes(
        &fixture,
        1,
        &[("targets.json", MetaFile::new(nz(9)))],
        days_hence(1),
    );
    let timestamp = timestamp_bytes(&fixture, 1, meta_file(&snapshot, 1), days_hence(1));
    set.update_timestamp(&timestamp).unwrap();

    match set.update_snapshot(&tampered, false) {
        Err(Error::Schema { .. }) => {}
        other => panic!("expected a hash mismatch, got {:?}", other),
    }
    set.update_snapshot(&snapshot, false).unwrap();
}

#[test]
fn expired_snapshot_accepted_only_from_local_cache() {
    let fixture = RepoFixture::new(true);
    let mut set = TrustedSet::new(&fixture.root_bytes()).unwrap();

    let snapshot = snapshot_bytes(
        &fixture,
        1,
        &[("targets.json", MetaFile::new(nz(1)))],
        days_hence(-1),
    );
    let timestamp = timestamp_bytes(&fixture, 1, meta_file(&snapshot, 1), days_hence(1));
    set.update_timestamp(&timestamp).unwrap();

    match set.update_snapshot(&snapshot, false) {
        Err(Error::ExpiredMetadata { .. }) => {}
        other => panic!("expected ExpiredMetadata, got {:?}", other),
    }
    // local-cache continuity: the caller will still re-download
    set.update_snapshot(&snapshot, true).unwrap();
    assert!(set.snapshot().is_some());
}

#[test]
fn snapshot_cannot_drop_or_roll_back_role_files() {
    let fixture = RepoFixture::new(true);
    let mut set = TrustedSet::new(&fixture.root_bytes()).unwrap();

    let snap1 = snapshot_bytes(
        &fixture,
        1,
        &[
            ("targets.json", MetaFile::new(nz(2))),
            ("role-a.json", MetaFile::new(nz(2))),
        ],
        days_hence(1),
    );
    let ts1 = timestamp_bytes(&fixture, 1, meta_file(&snap1, 1), days_hence(1));
    set.update_timestamp(&ts1).unwrap();
    set.update_snapshot(&snap1, false).unwrap();

    // a later snapshot that no longer lists role-a.json
    let snap2 = snapshot_bytes(
        &fixture,
        2,
        &[("targets.json", MetaFile::new(nz(2)))],
        days_hence(1),
    );
    let ts2 = timestamp_bytes(&fixture, 2, meta_file(&snap2, 2), days_hence(1));
    set.update_timestamp(&ts2).unwrap();
    match set.update_snapshot(&snap2, false) {
        Err(Error::MetaMissing { .. }) => {}
        other => panic!("expected MetaMissing, got {:?}", other),
    }

    // a later snapshot that rolls role-a.json back to version 1
    let snap3 = snapshot_bytes(
        &fixture,
        3,
        &[
            ("targets.json", MetaFile::new(nz(2))),
            ("role-a.json", MetaFile::new(nz(1))),
        ],
        days_hence(1),
    );
    let ts3 = timestamp_bytes(&fixture, 3, meta_file(&snap3, 3), days_hence(1));
    set.update_timestamp(&ts3).unwrap();
    match set.update_snapshot(&snap3, false) {
        Err(Error::OlderMetadata { .. }) => {}
        other => panic!("expected OlderMetadata, got {:?}", other),
    }
}

#[test]
fn metadata_signed_by_the_wrong_role_is_rejected() {
    let fixture = RepoFixture::new(true);
    let mut set = TrustedSet::new(&fixture.root_bytes()).unwrap();

    let mut timestamp = Timestamp::new(days_hence(1));
    timestamp.version = nz(1);
    let bytes = sign_and_serialize(
        &Signed::new(timestamp),
        &[&fixture.key("snapshot")],
        &fixture.rng,
    );
    match set.update_timestamp(&bytes) {
        Err(err @ Error::Schema { .. }) => assert!(err.is_repository_error()),
        other => panic!("expected a threshold failure, got {:?}", other),
    }
}

#[test]
fn targets_require_snapshot_first() {
    let fixture = RepoFixture::new(true);
    let mut set = TrustedSet::new(&fixture.root_bytes()).unwrap();

    let targets = sign_and_serialize(
        &fixture.targets_docs[0].1,
        &[&fixture.key("targets")],
        &fixture.rng,
    );
    match set.update_targets(&targets) {
        Err(Error::MissingRole { .. }) => {}
        other => panic!("expected MissingRole, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn snapshot_update_invalidates_loaded_targets() {
    let fixture = RepoFixture::new(true);
    let mut set = TrustedSet::new(&fixture.root_bytes()).unwrap();

    let targets = sign_and_serialize(
        &fixture.targets_docs[0].1,
        &[&fixture.key("targets")],
        &fixture.rng,
    );
    let snap1 = snapshot_bytes(
        &fixture,
        1,
        &[("targets.json", meta_file(&targets, 1))],
        days_hence(1),
    );
    let ts1 = timestamp_bytes(&fixture, 1, meta_file(&snap1, 1), days_hence(1));
    set.update_timestamp(&ts1).unwrap();
    set.update_snapshot(&snap1, false).unwrap();
    set.update_targets(&targets).unwrap();
    assert!(set.targets("targets").is_some());

    let snap2 = snapshot_bytes(
        &fixture,
        2,
        &[("targets.json", meta_file(&targets, 1))],
        days_hence(1),
    );
    let ts2 = timestamp_bytes(&fixture, 2, meta_file(&snap2, 2), days_hence(1));
    set.update_timestamp(&ts2).unwrap();
    set.update_snapshot(&snap2, false).unwrap();
    assert!(set.targets("targets").is_none());
}
