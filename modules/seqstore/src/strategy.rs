//! The backend adapter contract.
//!
//! Every physical backend sits behind [`RecordStrategy`]: four operations,
//! identical behavior regardless of what is underneath. The only difference
//! a caller can observe between backends is the position type's ordering
//! semantics.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::item::{Position, SequencedItem};
use crate::range::PositionRange;

#[async_trait]
pub trait RecordStrategy<P: Position>: Send + Sync {
    /// Persist one item. Uniqueness of `(sequence_id, position)` is enforced
    /// by the backend's own atomic constraint check — never read-then-write.
    /// A losing append fails with `ConcurrencyConflict` and leaves the
    /// winner's item untouched; all other failures are `Transport` and are
    /// not retried here.
    async fn append(&self, item: SequencedItem<P>) -> Result<()>;

    /// The single item at an exact position, or `ItemNotFound`.
    async fn get_item(&self, sequence_id: &str, position: P) -> Result<SequencedItem<P>>;

    /// A bounded, ordered batch of one sequence's items. This is the paging
    /// primitive all iteration builds on. `limit` must be positive
    /// (`InvalidArgument` otherwise, before any backend call); an inverted or
    /// unsatisfiable range returns empty, not an error.
    async fn list_items(
        &self,
        sequence_id: &str,
        range: &PositionRange<P>,
        limit: usize,
        ascending: bool,
    ) -> Result<Vec<SequencedItem<P>>>;

    /// Full-store scan, ordered by `(sequence_id, position)`. For maintenance
    /// and tests, not the hot path.
    async fn all_items(&self) -> Result<Vec<SequencedItem<P>>>;
}

// Lets callers share one strategy across iterators and tasks.
#[async_trait]
impl<P: Position, S: RecordStrategy<P> + ?Sized> RecordStrategy<P> for Arc<S> {
    async fn append(&self, item: SequencedItem<P>) -> Result<()> {
        (**self).append(item).await
    }

    async fn get_item(&self, sequence_id: &str, position: P) -> Result<SequencedItem<P>> {
        (**self).get_item(sequence_id, position).await
    }

    async fn list_items(
        &self,
        sequence_id: &str,
        range: &PositionRange<P>,
        limit: usize,
        ascending: bool,
    ) -> Result<Vec<SequencedItem<P>>> {
        (**self).list_items(sequence_id, range, limit, ascending).await
    }

    async fn all_items(&self) -> Result<Vec<SequencedItem<P>>> {
        (**self).all_items().await
    }
}
