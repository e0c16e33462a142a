//! Profile attribute tests against the real storage engine.

use std::collections::BTreeSet;
use std::sync::Arc;

use beacon_core::config::StorageConfig;
use beacon_core::models::AttributeValue;
use beacon_core::traits::IKeyValueStorage;
use beacon_session::{AttributeUpdate, ProfileWriter};
use beacon_storage::StorageEngine;
use tempfile::TempDir;

fn writer(dir: &TempDir) -> (Arc<StorageEngine>, ProfileWriter) {
    let config = StorageConfig {
        db_path: dir.path().join("test.db"),
        read_pool_size: 2,
        ..StorageConfig::default()
    };
    let engine = Arc::new(StorageEngine::open(&config).unwrap());
    let profile = ProfileWriter::new(engine.clone() as Arc<dyn IKeyValueStorage>);
    (engine, profile)
}

#[test]
fn text_and_bool_overwrite_in_place() {
    let dir = TempDir::new().unwrap();
    let (_engine, profile) = writer(&dir);

    let update = profile
        .set("plan", &AttributeValue::Text("free".to_string()))
        .unwrap();
    assert_eq!(
        update,
        AttributeUpdate::Applied {
            current: AttributeValue::Text("free".to_string())
        }
    );

    profile
        .set("plan", &AttributeValue::Text("pro".to_string()))
        .unwrap();
    assert_eq!(
        profile.get("plan").unwrap(),
        Some(AttributeValue::Text("pro".to_string()))
    );
}

#[test]
fn counters_accumulate_deltas() {
    let dir = TempDir::new().unwrap();
    let (_engine, profile) = writer(&dir);

    profile.set("opens", &AttributeValue::Counter(1)).unwrap();
    profile.set("opens", &AttributeValue::Counter(1)).unwrap();
    let update = profile.set("opens", &AttributeValue::Counter(3)).unwrap();
    assert_eq!(
        update,
        AttributeUpdate::Applied {
            current: AttributeValue::Counter(5)
        }
    );
}

#[test]
fn sets_union_across_updates() {
    let dir = TempDir::new().unwrap();
    let (_engine, profile) = writer(&dir);

    profile
        .set(
            "interests",
            &AttributeValue::StringSet(BTreeSet::from(["music".to_string()])),
        )
        .unwrap();
    let update = profile
        .set(
            "interests",
            &AttributeValue::StringSet(BTreeSet::from([
                "music".to_string(),
                "sport".to_string(),
            ])),
        )
        .unwrap();
    assert_eq!(
        update,
        AttributeUpdate::Applied {
            current: AttributeValue::StringSet(BTreeSet::from([
                "music".to_string(),
                "sport".to_string(),
            ]))
        }
    );
}

#[test]
fn kind_change_keeps_previous_value() {
    let dir = TempDir::new().unwrap();
    let (_engine, profile) = writer(&dir);

    profile.set("opens", &AttributeValue::Counter(4)).unwrap();
    let update = profile
        .set("opens", &AttributeValue::Text("four".to_string()))
        .unwrap();
    assert_eq!(
        update,
        AttributeUpdate::TypeMismatch {
            previous: AttributeValue::Counter(4)
        }
    );
    // Store unchanged.
    assert_eq!(
        profile.get("opens").unwrap(),
        Some(AttributeValue::Counter(4))
    );
}

#[test]
fn attributes_are_namespaced_away_from_sdk_keys() {
    let dir = TempDir::new().unwrap();
    let (engine, profile) = writer(&dir);

    profile
        .set("install_id", &AttributeValue::Text("user-set".to_string()))
        .unwrap();
    // The raw key is untouched; the profile key lives under its prefix.
    assert_eq!(engine.get("install_id").unwrap(), None);
    assert_eq!(
        engine.get("profile.install_id").unwrap(),
        Some(AttributeValue::Text("user-set".to_string()))
    );
}

#[test]
fn remove_deletes_only_the_attribute() {
    let dir = TempDir::new().unwrap();
    let (_engine, profile) = writer(&dir);

    profile.set("tmp", &AttributeValue::Bool(true)).unwrap();
    assert!(profile.remove("tmp").unwrap());
    assert!(!profile.remove("tmp").unwrap());
    assert_eq!(profile.get("tmp").unwrap(), None);
}
