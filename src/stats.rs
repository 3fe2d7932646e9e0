//! Process-wide allocation counters.
//!
//! Every non-empty slot array, block word array and `Rc` box allocated by this
//! crate is recorded here, one entry per heap allocation.
//! The counters only ever grow; dropping a bitset does not give anything back.

use core::sync::atomic::{AtomicU64, Ordering};

static ALLOCS: AtomicU64 = AtomicU64::new(0);
static BYTES: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct AllocStats {
    /// Number of heap allocations performed.
    pub allocs: u64,
    /// Cumulative bytes requested by those allocations.
    pub bytes: u64,
}

pub fn alloc_stats() -> AllocStats {
    AllocStats { allocs: ALLOCS.load(Ordering::Relaxed), bytes: BYTES.load(Ordering::Relaxed) }
}

pub(crate) fn record_alloc(bytes: usize) {
    ALLOCS.fetch_add(1, Ordering::Relaxed);
    BYTES.fetch_add(bytes as u64, Ordering::Relaxed);
}

impl AllocStats {
    /// Counters accumulated between `earlier` and `self`.
    pub fn since(&self, earlier: &AllocStats) -> AllocStats {
        AllocStats {
            allocs: self.allocs.saturating_sub(earlier.allocs),
            bytes: self.bytes.saturating_sub(earlier.bytes),
        }
    }
}
