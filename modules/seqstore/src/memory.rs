//! In-memory record strategy with a wide-row, column-family layout.
//!
//! One partition per sequence id, rows clustered by position in a `BTreeMap`.
//! No database required — this is both the test backend and the reference
//! semantics every other adapter must match.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::item::{Position, SequencedItem};
use crate::range::PositionRange;
use crate::strategy::RecordStrategy;

#[derive(Debug, Clone)]
struct Row {
    topic: String,
    data: String,
}

/// Wide-row in-memory store: partition key = sequence id, clustering key =
/// position. The write lock makes the presence check and insert one atomic
/// critical section, which is the "atomic conditional insert" the contract
/// requires of a backend.
pub struct MemoryRecordStrategy<P: Position> {
    partitions: RwLock<HashMap<String, BTreeMap<P, Row>>>,
}

impl<P: Position> MemoryRecordStrategy<P> {
    pub fn new() -> Self {
        Self {
            partitions: RwLock::new(HashMap::new()),
        }
    }
}

impl<P: Position> Default for MemoryRecordStrategy<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<P: Position> RecordStrategy<P> for MemoryRecordStrategy<P> {
    async fn append(&self, item: SequencedItem<P>) -> Result<()> {
        let mut partitions = self.partitions.write().await;
        let partition = partitions.entry(item.sequence_id.clone()).or_default();
        if partition.contains_key(&item.position) {
            return Err(StoreError::conflict(&item.sequence_id, item.position));
        }
        partition.insert(
            item.position,
            Row {
                topic: item.topic,
                data: item.data,
            },
        );
        Ok(())
    }

    async fn get_item(&self, sequence_id: &str, position: P) -> Result<SequencedItem<P>> {
        let partitions = self.partitions.read().await;
        partitions
            .get(sequence_id)
            .and_then(|partition| partition.get(&position))
            .map(|row| SequencedItem::new(sequence_id, position, &row.topic, &row.data))
            .ok_or_else(|| StoreError::not_found(sequence_id, position))
    }

    async fn list_items(
        &self,
        sequence_id: &str,
        range: &PositionRange<P>,
        limit: usize,
        ascending: bool,
    ) -> Result<Vec<SequencedItem<P>>> {
        if limit == 0 {
            return Err(StoreError::InvalidArgument(
                "list_items limit must be positive".into(),
            ));
        }
        // BTreeMap::range panics on inverted bounds; an inverted range is a
        // legal empty query here.
        if range.is_empty() {
            return Ok(Vec::new());
        }

        let partitions = self.partitions.read().await;
        let Some(partition) = partitions.get(sequence_id) else {
            return Ok(Vec::new());
        };

        let bounds = (range.lower(), range.upper());
        let select = |(position, row): (&P, &Row)| {
            SequencedItem::new(sequence_id, *position, &row.topic, &row.data)
        };
        let items: Vec<_> = if ascending {
            partition.range(bounds).take(limit).map(select).collect()
        } else {
            partition.range(bounds).rev().take(limit).map(select).collect()
        };
        Ok(items)
    }

    async fn all_items(&self) -> Result<Vec<SequencedItem<P>>> {
        let partitions = self.partitions.read().await;
        let mut sequence_ids: Vec<_> = partitions.keys().collect();
        sequence_ids.sort();

        let mut items = Vec::new();
        for sequence_id in sequence_ids {
            for (position, row) in &partitions[sequence_id] {
                items.push(SequencedItem::new(
                    sequence_id,
                    *position,
                    &row.topic,
                    &row.data,
                ));
            }
        }
        Ok(items)
    }
}
