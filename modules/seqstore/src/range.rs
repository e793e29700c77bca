//! Position ranges for bounded sequence reads.

use std::ops::Bound;

use crate::item::Position;

/// An interval over positions. Any subset of the four bounds may be present;
/// when both inclusive and exclusive bounds are given on the same side, the
/// tighter one wins. An inverted range (lower above upper) is legal and
/// matches nothing — it is never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionRange<P> {
    pub gt: Option<P>,
    pub gte: Option<P>,
    pub lt: Option<P>,
    pub lte: Option<P>,
}

impl<P> Default for PositionRange<P> {
    fn default() -> Self {
        Self {
            gt: None,
            gte: None,
            lt: None,
            lte: None,
        }
    }
}

impl<P: Position> PositionRange<P> {
    /// The whole sequence, no bounds.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn gt(mut self, position: P) -> Self {
        self.gt = Some(position);
        self
    }

    pub fn gte(mut self, position: P) -> Self {
        self.gte = Some(position);
        self
    }

    pub fn lt(mut self, position: P) -> Self {
        self.lt = Some(position);
        self
    }

    pub fn lte(mut self, position: P) -> Self {
        self.lte = Some(position);
        self
    }

    /// Effective lower bound, tightest of `gt`/`gte`.
    pub fn lower(&self) -> Bound<P> {
        match (self.gt, self.gte) {
            (None, None) => Bound::Unbounded,
            (Some(g), None) => Bound::Excluded(g),
            (None, Some(ge)) => Bound::Included(ge),
            // Excluded(g) admits values > g; it is at least as tight as
            // Included(ge) whenever g >= ge.
            (Some(g), Some(ge)) => {
                if g >= ge {
                    Bound::Excluded(g)
                } else {
                    Bound::Included(ge)
                }
            }
        }
    }

    /// Effective upper bound, tightest of `lt`/`lte`.
    pub fn upper(&self) -> Bound<P> {
        match (self.lt, self.lte) {
            (None, None) => Bound::Unbounded,
            (Some(l), None) => Bound::Excluded(l),
            (None, Some(le)) => Bound::Included(le),
            (Some(l), Some(le)) => {
                if l <= le {
                    Bound::Excluded(l)
                } else {
                    Bound::Included(le)
                }
            }
        }
    }

    /// True when no position can satisfy the bounds.
    pub fn is_empty(&self) -> bool {
        let (lo, lo_inclusive) = match self.lower() {
            Bound::Unbounded => return false,
            Bound::Included(p) => (p, true),
            Bound::Excluded(p) => (p, false),
        };
        let (hi, hi_inclusive) = match self.upper() {
            Bound::Unbounded => return false,
            Bound::Included(p) => (p, true),
            Bound::Excluded(p) => (p, false),
        };
        lo > hi || (lo == hi && !(lo_inclusive && hi_inclusive))
    }

    pub fn contains(&self, position: &P) -> bool {
        let above = match self.lower() {
            Bound::Unbounded => true,
            Bound::Included(p) => *position >= p,
            Bound::Excluded(p) => *position > p,
        };
        let below = match self.upper() {
            Bound::Unbounded => true,
            Bound::Included(p) => *position <= p,
            Bound::Excluded(p) => *position < p,
        };
        above && below
    }
}
