//! Backend-agnostic store for sequenced items.
//!
//! A sequenced item is an immutable record addressed by `(sequence_id,
//! position)`. Backends plug in behind the [`RecordStrategy`] contract and
//! must all enforce the same guarantee: that key is unique store-wide, and a
//! losing append fails with [`StoreError::ConcurrencyConflict`] instead of
//! overwriting. Position allocation belongs to the caller — the store never
//! picks positions, so conflict/retry policy stays in the layer above.
//!
//! Reads are "by sequence id, optionally range-bounded by position", nothing
//! more. The iterator module pages through a sequence lazily, either inline
//! or with a bounded read-ahead worker.

pub mod error;
pub mod item;
pub mod iterator;
pub mod memory;
pub mod range;
pub mod strategy;

pub use error::{Result, StoreError};
pub use item::{
    IntegerSequencedItem, Position, SequencedItem, Timestamp, TimestampClock,
    TimestampSequencedItem,
};
pub use iterator::{stream_items, stream_items_read_ahead, ItemQuery};
pub use memory::MemoryRecordStrategy;
pub use range::PositionRange;
pub use strategy::RecordStrategy;
