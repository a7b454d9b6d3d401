//! Property tests for persist/load round-trips.

use cardfile::{Collection, Record, RecordStore, StoreConfig};
use proptest::collection::vec;
use proptest::prelude::*;
use tempfile::TempDir;

fn arb_record() -> impl Strategy<Value = Record> {
    vec(("[a-z]{1,8}", "\\PC{0,16}"), 0..6)
        .prop_map(|fields| fields.into_iter().collect())
}

fn arb_collection() -> impl Strategy<Value = Collection> {
    vec(arb_record(), 0..8)
}

proptest! {
    /// Appending each record of an arbitrary collection and loading it back
    /// is lossless: same records, same order, same field values.
    #[test]
    fn roundtrip_is_lossless(collection in arb_collection()) {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::new(StoreConfig {
            path: dir.path().join("records.json"),
            ..Default::default()
        });

        for record in &collection {
            store.append(record.clone()).unwrap();
        }

        prop_assert_eq!(store.load().unwrap(), collection);
    }

    /// Removing an absent key never changes what load returns.
    #[test]
    fn noop_removal_preserves_collection(
        collection in arb_collection(),
        key in "[A-Z]{9,12}",
    ) {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::new(StoreConfig {
            path: dir.path().join("records.json"),
            ..Default::default()
        });

        for record in &collection {
            store.append(record.clone()).unwrap();
        }

        // Key alphabet is disjoint from the generated field values' shape
        // only by length; filter the rare collision instead
        prop_assume!(!collection.iter().any(|r| r.get("name") == Some(key.as_str())));

        prop_assert!(!store.remove_by_key(&key).unwrap());
        prop_assert_eq!(store.load().unwrap(), collection);
    }
}
