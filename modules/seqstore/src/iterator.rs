//! Lazy, ordered iteration over one sequence, hiding backend pagination.
//!
//! One paging algorithm ([`Paginator`]) drives two delivery forms:
//! [`stream_items`] fetches pages inline as consumption demands, and
//! [`stream_items_read_ahead`] overlaps fetch latency with consumption via a
//! worker feeding a bounded channel. Both yield the same total order: each
//! page request starts strictly past the last yielded position, so a page
//! boundary can never duplicate or drop an item, even with appends landing
//! mid-iteration.

use std::sync::Arc;

use async_stream::try_stream;
use futures::Stream;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::item::{Position, SequencedItem};
use crate::range::PositionRange;
use crate::strategy::RecordStrategy;

pub const DEFAULT_PAGE_SIZE: usize = 100;

/// What to iterate: one sequence, an optional position window, a page size
/// and a direction. Clone it to restart iteration from the top.
#[derive(Debug, Clone)]
pub struct ItemQuery<P> {
    pub sequence_id: String,
    pub range: PositionRange<P>,
    pub page_size: usize,
    pub ascending: bool,
}

impl<P: Position> ItemQuery<P> {
    pub fn new(sequence_id: impl Into<String>) -> Self {
        Self {
            sequence_id: sequence_id.into(),
            range: PositionRange::unbounded(),
            page_size: DEFAULT_PAGE_SIZE,
            ascending: true,
        }
    }

    pub fn with_range(mut self, range: PositionRange<P>) -> Self {
        self.range = range;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn descending(mut self) -> Self {
        self.ascending = false;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(StoreError::InvalidArgument(
                "iterator page_size must be positive".into(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Paginator — the one paging algorithm
// ---------------------------------------------------------------------------

/// Tracks where the next page starts. After a full page the range advances
/// strictly past the last item's position; a short page means the sequence
/// (or window) is exhausted.
struct Paginator<P> {
    range: PositionRange<P>,
    page_size: usize,
    ascending: bool,
    exhausted: bool,
}

impl<P: Position> Paginator<P> {
    fn new(range: PositionRange<P>, page_size: usize, ascending: bool) -> Self {
        Self {
            range,
            page_size,
            ascending,
            exhausted: false,
        }
    }

    /// The range to request next, or `None` when iteration is complete.
    fn next_range(&self) -> Option<PositionRange<P>> {
        (!self.exhausted).then_some(self.range)
    }

    /// Fold a fetched page into the cursor state.
    fn record(&mut self, page: &[SequencedItem<P>]) {
        if page.len() < self.page_size {
            self.exhausted = true;
            return;
        }
        match page.last() {
            Some(last) if self.ascending => {
                self.range.gt = Some(last.position);
                self.range.gte = None;
            }
            Some(last) => {
                self.range.lt = Some(last.position);
                self.range.lte = None;
            }
            None => self.exhausted = true,
        }
    }
}

// ---------------------------------------------------------------------------
// Simple form
// ---------------------------------------------------------------------------

/// Lazy stream over one sequence; each page is fetched inline when
/// consumption reaches it. Memory use is bounded by the page size.
pub fn stream_items<P, S>(
    strategy: S,
    query: ItemQuery<P>,
) -> impl Stream<Item = Result<SequencedItem<P>>>
where
    P: Position,
    S: RecordStrategy<P>,
{
    try_stream! {
        query.validate()?;
        let mut pager = Paginator::new(query.range, query.page_size, query.ascending);
        while let Some(range) = pager.next_range() {
            let page = strategy
                .list_items(&query.sequence_id, &range, query.page_size, query.ascending)
                .await?;
            pager.record(&page);
            for item in page {
                yield item;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Read-ahead form
// ---------------------------------------------------------------------------

/// Same result set and order as [`stream_items`], but pages are fetched by a
/// spawned worker up to `buffered_pages` ahead of consumption. The channel is
/// bounded, so a slow consumer backpressures the worker; dropping the stream
/// closes the channel and the worker stops at its next send. A worker failure
/// is delivered in-band when consumption reaches the affected page.
pub fn stream_items_read_ahead<P, S>(
    strategy: S,
    query: ItemQuery<P>,
    buffered_pages: usize,
) -> impl Stream<Item = Result<SequencedItem<P>>>
where
    P: Position,
    S: RecordStrategy<P> + 'static,
{
    try_stream! {
        query.validate()?;
        if buffered_pages == 0 {
            Err(StoreError::InvalidArgument(
                "read-ahead buffer must hold at least one page".into(),
            ))?;
        }

        let (tx, mut rx) = mpsc::channel::<Result<Vec<SequencedItem<P>>>>(buffered_pages);
        let ItemQuery { sequence_id, range, page_size, ascending } = query;

        tokio::spawn(async move {
            let mut pager = Paginator::new(range, page_size, ascending);
            while let Some(range) = pager.next_range() {
                match strategy.list_items(&sequence_id, &range, page_size, ascending).await {
                    Ok(page) => {
                        pager.record(&page);
                        if tx.send(Ok(page)).await.is_err() {
                            debug!(%sequence_id, "read-ahead consumer gone, stopping");
                            return;
                        }
                    }
                    Err(e) => {
                        // Best effort: the consumer may already be gone.
                        let _ = tx.send(Err(e)).await;
                        return;
                    }
                }
            }
        });

        while let Some(page) = rx.recv().await {
            for item in page? {
                yield item;
            }
        }
    }
}

// Shared strategies iterate without extra plumbing.
impl<P: Position> ItemQuery<P> {
    /// Convenience: run this query as a simple stream over a shared strategy.
    pub fn stream(
        self,
        strategy: Arc<dyn RecordStrategy<P>>,
    ) -> impl Stream<Item = Result<SequencedItem<P>>> {
        stream_items(strategy, self)
    }
}
