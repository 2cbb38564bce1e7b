// SPDX-License-Identifier: Apache-2.0

use std::ops::Range;

use snpdb_store::{DocumentStore, StoreError};
use tracing::debug;

/// Hands out contiguous id ranges from a backend counter.
pub struct IdAllocator<'s, S: DocumentStore + ?Sized> {
    store: &'s S,
}

impl<'s, S: DocumentStore + ?Sized> IdAllocator<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// Reserves `count` ids in `domain`; the caller owns the returned range.
    pub fn reserve(&self, domain: &str, count: u64) -> Result<Range<u64>, StoreError> {
        let first = self.store.increment_counter(domain, count)?;
        debug!(domain, first, count, "reserved id range");
        Ok(first..first + count)
    }

    pub fn next(&self, domain: &str) -> Result<u64, StoreError> {
        Ok(self.reserve(domain, 1)?.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snpdb_model::{COUNTER_INDIVIDUALS, COUNTER_MARKERS};
    use snpdb_store::MemoryStore;

    #[test]
    fn ranges_are_contiguous_and_disjoint() {
        let store = MemoryStore::new();
        let alloc = IdAllocator::new(&store);
        assert_eq!(alloc.reserve(COUNTER_MARKERS, 3).expect("reserve"), 0..3);
        assert_eq!(alloc.reserve(COUNTER_MARKERS, 0).expect("reserve"), 3..3);
        assert_eq!(alloc.reserve(COUNTER_MARKERS, 2).expect("reserve"), 3..5);
        assert_eq!(alloc.next(COUNTER_INDIVIDUALS).expect("next"), 0);
    }
}
