use std::sync::Arc;

use ledger::{
    write_setting, InMemoryRecordStore, LedgerCache, RecordStore, Row, StoreError, ALIASES_KEY,
    RECORDS_TABLE, SETTINGS_TABLE, SUB_PASSWORD_KEY,
};
use serde_json::{json, Value};

fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected object"),
    }
}

async fn seeded_store() -> Arc<InMemoryRecordStore> {
    let store = InMemoryRecordStore::shared();
    for (date, east) in [("2024-03-01", 25000), ("2024-05-01", 31000), ("2024-04-01", 18000)] {
        store
            .insert(RECORDS_TABLE, row(json!({"play_date": date, "east": east})))
            .await
            .expect("insert");
    }
    write_setting(store.as_ref(), ALIASES_KEY, json!({"alice": "Tile Queen"}))
        .await
        .expect("aliases");
    write_setting(store.as_ref(), SUB_PASSWORD_KEY, json!("sub-secret"))
        .await
        .expect("sub password");
    store
}

#[tokio::test]
async fn sync_loads_all_three_sources_in_play_date_order() {
    let store = seeded_store().await;
    let cache = LedgerCache::new(store.clone());
    cache.sync(false).await.expect("sync");

    let snapshot = cache.snapshot();
    let dates: Vec<_> = snapshot
        .records
        .iter()
        .map(|record| record.play_date().cloned())
        .collect();
    assert_eq!(
        dates,
        vec![
            Some(json!("2024-05-01")),
            Some(json!("2024-04-01")),
            Some(json!("2024-03-01")),
        ]
    );
    assert_eq!(snapshot.aliases.get("alice"), Some(&json!("Tile Queen")));
    assert_eq!(snapshot.sub_password(), Some("sub-secret"));
}

#[tokio::test]
async fn lazy_sync_skips_store_when_populated() {
    let store = seeded_store().await;
    let cache = LedgerCache::new(store.clone());
    cache.sync(false).await.expect("sync");

    let before = store.call_count();
    cache.sync(false).await.expect("lazy sync");
    assert_eq!(store.call_count(), before);

    cache.sync(true).await.expect("forced sync");
    assert_eq!(store.call_count(), before + 3);
}

#[tokio::test]
async fn empty_cache_always_reloads() {
    let store = InMemoryRecordStore::shared();
    let cache = LedgerCache::new(store.clone());
    cache.sync(false).await.expect("sync");
    cache.sync(false).await.expect("sync");
    assert_eq!(store.call_count(), 6);
}

#[tokio::test]
async fn rejected_reads_degrade_to_defaults() {
    let store = seeded_store().await;
    store.fail_table(
        SETTINGS_TABLE,
        StoreError::Rejected {
            status: 500,
            message: "settings offline".to_string(),
        },
    );
    let cache = LedgerCache::new(store.clone());
    cache.sync(true).await.expect("sync");

    let snapshot = cache.snapshot();
    assert_eq!(snapshot.records.len(), 3);
    assert!(snapshot.aliases.is_empty());
    assert_eq!(snapshot.sub_password(), None);

    store.clear_failures();
    store.fail_table(
        RECORDS_TABLE,
        StoreError::Rejected {
            status: 400,
            message: "bad query".to_string(),
        },
    );
    cache.sync(true).await.expect("sync");
    let snapshot = cache.snapshot();
    assert!(snapshot.records.is_empty());
    assert_eq!(snapshot.sub_password(), Some("sub-secret"));
}

#[tokio::test]
async fn transport_failure_keeps_previous_snapshot() {
    let store = seeded_store().await;
    let cache = LedgerCache::new(store.clone());
    cache.sync(true).await.expect("sync");
    let before = cache.snapshot();

    store.fail_table(RECORDS_TABLE, StoreError::Transport("connection reset".to_string()));
    let err = cache.sync(true).await.expect_err("transport error");
    assert!(err.is_transport());
    assert_eq!(*cache.snapshot(), *before);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_never_see_a_mixed_snapshot() {
    let store = InMemoryRecordStore::shared();
    write_setting(store.as_ref(), ALIASES_KEY, json!({"generation": 0}))
        .await
        .expect("aliases");
    let cache = Arc::new(LedgerCache::new(store.clone()));
    cache.sync(true).await.expect("sync");

    let mut readers = Vec::new();
    for _ in 0..4 {
        let cache = cache.clone();
        readers.push(tokio::spawn(async move {
            for _ in 0..2_000 {
                let snapshot = cache.snapshot();
                let generation = snapshot
                    .aliases
                    .get("generation")
                    .and_then(Value::as_u64)
                    .unwrap_or_default();
                assert_eq!(snapshot.records.len() as u64, generation);
                tokio::task::yield_now().await;
            }
        }));
    }

    for generation in 1..=30u64 {
        store
            .insert(RECORDS_TABLE, row(json!({"play_date": format!("2024-01-{generation:02}")})))
            .await
            .expect("insert");
        write_setting(store.as_ref(), ALIASES_KEY, json!({"generation": generation}))
            .await
            .expect("aliases");
        cache.sync(true).await.expect("sync");
    }

    for reader in readers {
        reader.await.expect("reader");
    }
}
