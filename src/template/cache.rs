//! Bounded cache of selected feature rows, keyed by selector value.
//!
//! The cache is limited both in entries and in total cached matrix cells.
//! Eviction is least-recently-used, so pools shared by many trials (the full
//! pool of every category other than a trial's own) stay resident while the
//! per-trial leave-one-out pools cycle through.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use nalgebra::DMatrix;

use super::selectors::Selector;
use crate::types::FeatureMatrix;

/// Default bound on cached cells: 2^24 `f64` values (128 MiB).
pub const DEFAULT_CACHE_MAX_CELLS: usize = 1 << 24;

/// Hit/miss counters for a [`SelectionCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: usize,
    /// Lookups that had to filter the feature matrix.
    pub misses: usize,
    /// Entries dropped to stay within the bounds.
    pub evictions: usize,
}

#[derive(Debug, Clone)]
struct Entry {
    rows: Arc<DMatrix<f64>>,
    last_used: u64,
}

/// LRU map from selector to the feature rows it selects.
///
/// Entries are only valid for the feature matrix they were built from; call
/// [`clear`](Self::clear) before switching matrices. A selection larger than
/// the cell budget is returned but not stored.
#[derive(Debug, Clone)]
pub struct SelectionCache {
    capacity: usize,
    max_cells: usize,
    cells: usize,
    clock: u64,
    entries: HashMap<Selector, Entry>,
    /// Use history; a record is stale once its entry has a newer `last_used`.
    order: VecDeque<(Selector, u64)>,
    stats: CacheStats,
}

impl SelectionCache {
    /// Cache holding at most `capacity` selections (minimum 1) and
    /// [`DEFAULT_CACHE_MAX_CELLS`] cells.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            max_cells: DEFAULT_CACHE_MAX_CELLS,
            cells: 0,
            clock: 0,
            entries: HashMap::new(),
            order: VecDeque::new(),
            stats: CacheStats::default(),
        }
    }

    /// Set the bound on total cached matrix cells (minimum 1).
    pub fn with_max_cells(mut self, max_cells: usize) -> Self {
        self.max_cells = max_cells.max(1);
        self.evict_to_fit(0);
        self
    }

    /// The rows of `features` picked by `selector`, filtered on first use.
    pub fn select(&mut self, features: &FeatureMatrix, selector: &Selector) -> Arc<DMatrix<f64>> {
        self.clock += 1;
        let now = self.clock;

        if let Some(entry) = self.entries.get_mut(selector) {
            self.stats.hits += 1;
            entry.last_used = now;
            let rows = Arc::clone(&entry.rows);
            self.order.push_back((selector.clone(), now));
            self.compact_order();
            return rows;
        }

        self.stats.misses += 1;
        let indices = selector.indices();
        let rows = Arc::new(features.select_rows(indices.iter()));
        let size = rows.len();
        if size > self.max_cells {
            return rows;
        }

        self.evict_to_fit(size);
        self.cells += size;
        self.entries.insert(
            selector.clone(),
            Entry {
                rows: Arc::clone(&rows),
                last_used: now,
            },
        );
        self.order.push_back((selector.clone(), now));
        rows
    }

    /// Evict least-recently-used entries until one more entry of `incoming`
    /// cells fits.
    fn evict_to_fit(&mut self, incoming: usize) {
        while !self.entries.is_empty()
            && (self.entries.len() >= self.capacity || self.cells + incoming > self.max_cells)
        {
            let Some((selector, stamp)) = self.order.pop_front() else {
                break;
            };
            let current = self
                .entries
                .get(&selector)
                .is_some_and(|entry| entry.last_used == stamp);
            if current {
                if let Some(entry) = self.entries.remove(&selector) {
                    self.cells -= entry.rows.len();
                    self.stats.evictions += 1;
                }
            }
        }
    }

    /// Rebuild the use history once stale records dominate it.
    fn compact_order(&mut self) {
        if self.order.len() <= 2 * self.entries.len() + 16 {
            return;
        }
        let mut live: Vec<(Selector, u64)> = self
            .entries
            .iter()
            .map(|(selector, entry)| (selector.clone(), entry.last_used))
            .collect();
        live.sort_unstable_by_key(|(_, stamp)| *stamp);
        self.order = live.into();
    }

    /// Drop every entry and reset the counters.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.cells = 0;
        self.clock = 0;
        self.stats = CacheStats::default();
    }

    /// Number of cached selections.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Maximum number of cached cells.
    pub fn max_cells(&self) -> usize {
        self.max_cells
    }

    /// Cells currently cached.
    pub fn cells(&self) -> usize {
        self.cells
    }

    /// Counters since the last clear.
    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}
