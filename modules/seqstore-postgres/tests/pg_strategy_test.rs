//! Integration tests for the Postgres record strategy.
//! Requires a Postgres instance. Set DATABASE_TEST_URL or these tests are skipped.

use std::sync::Arc;

use futures::{pin_mut, StreamExt};
use seqstore::{
    stream_items, stream_items_read_ahead, ItemQuery, PositionRange, RecordStrategy, SequencedItem,
    StoreError, Timestamp, TimestampClock,
};
use seqstore_postgres::{PgRecordStrategy, INTEGER_SEQUENCED_TABLE, TIMESTAMP_SEQUENCED_TABLE};
use serde_json::json;
use sqlx::PgPool;

/// Get a test database pool, or skip if no test DB is available.
async fn test_pool() -> Option<PgPool> {
    let url = std::env::var("DATABASE_TEST_URL").ok()?;
    let pool = PgPool::connect(&url).await.ok()?;

    for table in [INTEGER_SEQUENCED_TABLE, TIMESTAMP_SEQUENCED_TABLE] {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                sequence_id TEXT   NOT NULL,
                position    BIGINT NOT NULL,
                topic       TEXT   NOT NULL,
                data        TEXT   NOT NULL,
                PRIMARY KEY (sequence_id, position)
            )
            "#
        ))
        .execute(&pool)
        .await
        .ok()?;

        // Clean slate for each test
        sqlx::query(&format!("TRUNCATE {table}"))
            .execute(&pool)
            .await
            .ok()?;
    }

    Some(pool)
}

fn item(sequence_id: &str, position: i64, n: u32) -> SequencedItem<i64> {
    SequencedItem::new(
        sequence_id,
        position,
        "example.topic",
        json!({"n": n}).to_string(),
    )
}

// =========================================================================
// Integer discipline
// =========================================================================

#[tokio::test]
async fn append_then_get_roundtrips() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let store = PgRecordStrategy::integer_sequenced(pool);

    store.append(item("S1", 0, 7)).await.unwrap();

    let got = store.get_item("S1", 0).await.unwrap();
    assert_eq!(got.sequence_id, "S1");
    assert_eq!(got.position, 0);
    assert_eq!(got.topic, "example.topic");
    assert_eq!(got.data, json!({"n": 7}).to_string());
}

#[tokio::test]
async fn duplicate_position_is_concurrency_conflict() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let store = PgRecordStrategy::integer_sequenced(pool);

    store.append(item("S1", 1, 1)).await.unwrap();
    let err = store.append(item("S1", 1, 99)).await.unwrap_err();
    assert!(
        matches!(err, StoreError::ConcurrencyConflict { .. }),
        "expected conflict, got: {err}"
    );

    // The winner's payload is untouched.
    let kept = store.get_item("S1", 1).await.unwrap();
    assert_eq!(kept.data, json!({"n": 1}).to_string());
}

#[tokio::test]
async fn racing_appends_have_exactly_one_winner() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let store = Arc::new(PgRecordStrategy::integer_sequenced(pool));

    let mut handles = Vec::new();
    for n in 0..8u32 {
        let store = store.clone();
        handles.push(tokio::spawn(
            async move { store.append(item("race", 3, n)).await },
        ));
    }

    let mut wins = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => wins += 1,
            Err(StoreError::ConcurrencyConflict { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(wins, 1);
}

#[tokio::test]
async fn get_item_miss_is_item_not_found() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let store = PgRecordStrategy::integer_sequenced(pool);

    let err = store.get_item("S1", 42).await.unwrap_err();
    assert!(matches!(err, StoreError::ItemNotFound { .. }));
}

#[tokio::test]
async fn list_orders_both_directions() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let store = PgRecordStrategy::integer_sequenced(pool);

    for p in 0..5 {
        store.append(item("S1", p, p as u32)).await.unwrap();
    }

    let up = store
        .list_items("S1", &PositionRange::unbounded(), 100, true)
        .await
        .unwrap();
    assert_eq!(up.iter().map(|i| i.position).collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);

    let down = store
        .list_items("S1", &PositionRange::unbounded(), 100, false)
        .await
        .unwrap();
    assert_eq!(down.iter().map(|i| i.position).collect::<Vec<_>>(), vec![4, 3, 2, 1, 0]);
}

#[tokio::test]
async fn range_bounds_and_limit_apply() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let store = PgRecordStrategy::integer_sequenced(pool);

    for p in 0..10 {
        store.append(item("S1", p, p as u32)).await.unwrap();
    }

    let window = store
        .list_items("S1", &PositionRange::unbounded().gte(3).lte(6), 100, true)
        .await
        .unwrap();
    assert_eq!(window.iter().map(|i| i.position).collect::<Vec<_>>(), vec![3, 4, 5, 6]);

    let open = store
        .list_items("S1", &PositionRange::unbounded().gt(3).lt(6), 100, true)
        .await
        .unwrap();
    assert_eq!(open.iter().map(|i| i.position).collect::<Vec<_>>(), vec![4, 5]);

    let capped = store
        .list_items("S1", &PositionRange::unbounded().gte(1), 2, true)
        .await
        .unwrap();
    assert_eq!(capped.iter().map(|i| i.position).collect::<Vec<_>>(), vec![1, 2]);
}

#[tokio::test]
async fn inverted_range_is_empty_not_error() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let store = PgRecordStrategy::integer_sequenced(pool);

    store.append(item("S1", 0, 0)).await.unwrap();

    let none = store
        .list_items("S1", &PositionRange::unbounded().gte(9).lte(1), 100, true)
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn zero_limit_fails_fast() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let store = PgRecordStrategy::integer_sequenced(pool);

    let err = store
        .list_items("S1", &PositionRange::unbounded(), 0, true)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidArgument(_)));
}

#[tokio::test]
async fn sequences_are_isolated() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let store = PgRecordStrategy::integer_sequenced(pool);

    store.append(item("A", 0, 1)).await.unwrap();
    store.append(item("B", 0, 2)).await.unwrap();

    let a = store
        .list_items("A", &PositionRange::unbounded(), 100, true)
        .await
        .unwrap();
    assert_eq!(a.len(), 1);
    assert_eq!(a[0].data, json!({"n": 1}).to_string());
}

#[tokio::test]
async fn all_items_scans_in_key_order() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let store = PgRecordStrategy::integer_sequenced(pool);

    store.append(item("B", 0, 0)).await.unwrap();
    store.append(item("A", 1, 0)).await.unwrap();
    store.append(item("A", 0, 0)).await.unwrap();

    let all = store.all_items().await.unwrap();
    let keys: Vec<_> = all.iter().map(|i| (i.sequence_id.as_str(), i.position)).collect();
    assert_eq!(keys, vec![("A", 0), ("A", 1), ("B", 0)]);
}

#[tokio::test]
async fn iterator_equivalence_over_postgres() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let store = Arc::new(PgRecordStrategy::integer_sequenced(pool));

    for p in 0..23 {
        store.append(item("S1", p, p as u32)).await.unwrap();
    }

    let query = ItemQuery::new("S1").with_page_size(4);
    let simple = {
        let stream = stream_items(store.clone(), query.clone());
        pin_mut!(stream);
        stream.map(|r| r.unwrap()).collect::<Vec<_>>().await
    };
    let ahead = {
        let stream = stream_items_read_ahead(store.clone(), query, 2);
        pin_mut!(stream);
        stream.map(|r| r.unwrap()).collect::<Vec<_>>().await
    };

    assert_eq!(simple.len(), 23);
    assert_eq!(simple, ahead);
}

// =========================================================================
// Timestamp discipline
// =========================================================================

#[tokio::test]
async fn timestamp_positions_descend_in_reverse_append_order() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let store = PgRecordStrategy::timestamp_sequenced(pool);
    let clock = TimestampClock::new();

    let mut appended = Vec::new();
    for n in 0..5u32 {
        let position = clock.next();
        appended.push(position);
        store
            .append(SequencedItem::new(
                "T1",
                position,
                "example.topic",
                json!({"n": n}).to_string(),
            ))
            .await
            .unwrap();
    }

    let down = store
        .list_items("T1", &PositionRange::unbounded(), 100, false)
        .await
        .unwrap();
    let reversed: Vec<Timestamp> = appended.iter().rev().copied().collect();
    assert_eq!(down.iter().map(|i| i.position).collect::<Vec<_>>(), reversed);
}

#[tokio::test]
async fn timestamp_reuse_is_concurrency_conflict() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let store = PgRecordStrategy::timestamp_sequenced(pool);
    let position = TimestampClock::new().next();

    store
        .append(SequencedItem::new("T1", position, "example.topic", "{}"))
        .await
        .unwrap();
    let err = store
        .append(SequencedItem::new("T1", position, "example.topic", "{}"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::ConcurrencyConflict { .. }));
}

#[tokio::test]
async fn timestamp_roundtrips_through_bigint() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let store = PgRecordStrategy::timestamp_sequenced(pool);
    let position = TimestampClock::new().next();

    store
        .append(SequencedItem::new("T1", position, "example.topic", "{}"))
        .await
        .unwrap();

    let got = store.get_item("T1", position).await.unwrap();
    assert_eq!(got.position, position);
    assert_eq!(got.position.nanos(), position.nanos());
}
