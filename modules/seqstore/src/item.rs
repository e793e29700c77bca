//! Core types for the sequenced-item store. Backend-agnostic.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Ordering key of an item within its sequence.
///
/// Two disciplines implement this: `i64` (integer-sequenced, caller-chosen
/// strictly increasing integers) and [`Timestamp`] (time-ordered, for
/// interleaving independent writers on one timeline).
pub trait Position:
    Copy + Ord + Eq + fmt::Debug + fmt::Display + Send + Sync + 'static
{
}

impl Position for i64 {}
impl Position for Timestamp {}

/// The unit of storage: an immutable record at `(sequence_id, position)`.
///
/// `topic` names the payload type for the layer above; `data` is an opaque
/// serialized payload. The store inspects neither.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencedItem<P> {
    pub sequence_id: String,
    pub position: P,
    pub topic: String,
    pub data: String,
}

impl<P: Position> SequencedItem<P> {
    pub fn new(
        sequence_id: impl Into<String>,
        position: P,
        topic: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        Self {
            sequence_id: sequence_id.into(),
            position,
            topic: topic.into(),
            data: data.into(),
        }
    }
}

/// Integer-sequenced item: position is a caller-chosen non-negative integer.
pub type IntegerSequencedItem = SequencedItem<i64>;

/// Timestamp-sequenced item: position is a [`Timestamp`].
pub type TimestampSequencedItem = SequencedItem<Timestamp>;

// ---------------------------------------------------------------------------
// Timestamp discipline
// ---------------------------------------------------------------------------

/// Number of low bits carrying per-clock entropy instead of wall-clock time.
const WRITER_BITS: u32 = 10;
const WRITER_MASK: i64 = (1 << WRITER_BITS) - 1;

/// A high-resolution, collision-resistant position on a shared timeline.
///
/// Nanoseconds since the Unix epoch, with the low 10 bits replaced by
/// per-writer entropy. Orders by wall-clock time across writers; two writers
/// collide only if they hit the same nanosecond tick *and* drew the same
/// entropy bits.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    pub fn nanos(&self) -> i64 {
        self.0
    }

    /// Wall-clock reading, for display and debugging. `None` if the raw value
    /// is outside chrono's representable range.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.0 / 1_000_000_000, (self.0 % 1_000_000_000) as u32)
            .single()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Issues strictly increasing [`Timestamp`]s for one writer.
///
/// Each clock draws its entropy bits once, from a v4 UUID. `next()` takes the
/// wall clock, stamps in the entropy, and bumps past the previous value if
/// the wall clock hasn't advanced — monotonic per writer even under bursts
/// faster than the clock resolution.
///
/// This is caller-side tooling: the store itself never allocates positions.
pub struct TimestampClock {
    writer: i64,
    last: AtomicI64,
}

impl TimestampClock {
    pub fn new() -> Self {
        let writer = (uuid::Uuid::new_v4().as_u128() as i64) & WRITER_MASK;
        Self {
            writer,
            last: AtomicI64::new(0),
        }
    }

    /// The next position on this writer's timeline. Strictly greater than
    /// every value this clock has returned before.
    pub fn next(&self) -> Timestamp {
        let now = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX);
        let candidate = (now & !WRITER_MASK) | self.writer;
        let mut prev = self.last.load(Ordering::SeqCst);
        loop {
            // Bumping by a full writer-bit stride keeps the entropy bits intact.
            let next = candidate.max(prev + (1 << WRITER_BITS));
            match self
                .last
                .compare_exchange(prev, next, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return Timestamp(next),
                Err(observed) => prev = observed,
            }
        }
    }
}

impl Default for TimestampClock {
    fn default() -> Self {
        Self::new()
    }
}
