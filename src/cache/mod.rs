//! On-the-fly kernel evaluation with an LRU cache
//!
//! When the training Gram matrix is not materialized, the solver asks for
//! kernel values by index and [`CachedKernelMatrix`] evaluates them from the
//! records, keeping recent pairs in a bounded cache. The kernel is
//! symmetric, so (i, j) and (j, i) share one slot.

use crate::core::{Record, Result, SVMError};
use crate::kernel::{Kernel, KernelMatrix};
use log::debug;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;

/// Bytes charged per cached entry (key, value and bookkeeping)
const ENTRY_BYTES: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PairKey {
    lo: usize,
    hi: usize,
}

impl PairKey {
    fn new(i: usize, j: usize) -> Self {
        Self {
            lo: i.min(j),
            hi: i.max(j),
        }
    }
}

/// Bounded LRU store of kernel values keyed by unordered index pair
pub struct KernelCache {
    entries: LruCache<PairKey, f64>,
    hits: u64,
    misses: u64,
}

impl KernelCache {
    /// Cache holding at most `capacity` pairs (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Cache sized from a byte budget
    pub fn with_memory_limit(memory_bytes: usize) -> Self {
        Self::new(memory_bytes / ENTRY_BYTES)
    }

    pub fn get(&mut self, i: usize, j: usize) -> Option<f64> {
        match self.entries.get(&PairKey::new(i, j)) {
            Some(&value) => {
                self.hits += 1;
                Some(value)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn put(&mut self, i: usize, j: usize, value: f64) {
        self.entries.put(PairKey::new(i, j), value);
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            capacity: self.entries.cap().get(),
            size: self.entries.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub capacity: usize,
    pub size: usize,
}

/// Kernel matrix over training records, evaluated lazily
pub struct CachedKernelMatrix<'a, K: Kernel + ?Sized> {
    kernel: &'a K,
    records: &'a [Record],
    cache: Mutex<KernelCache>,
}

impl<'a, K: Kernel + ?Sized> CachedKernelMatrix<'a, K> {
    /// `cache_bytes` bounds the memory spent on cached values
    pub fn new(kernel: &'a K, records: &'a [Record], cache_bytes: usize) -> Self {
        let cache = KernelCache::with_memory_limit(cache_bytes);
        debug!(
            "Kernel cache for {} records holds {} pairs",
            records.len(),
            cache.stats().capacity
        );
        Self {
            kernel,
            records,
            cache: Mutex::new(cache),
        }
    }

    pub fn stats(&self) -> Option<CacheStats> {
        self.cache.lock().ok().map(|cache| cache.stats())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, KernelCache>> {
        self.cache
            .lock()
            .map_err(|_| SVMError::OptimizationError("Kernel cache lock poisoned".to_string()))
    }
}

impl<'a, K: Kernel + ?Sized> KernelMatrix for CachedKernelMatrix<'a, K> {
    fn size(&self) -> usize {
        self.records.len()
    }

    fn value(&self, i: usize, j: usize) -> Result<f64> {
        let n = self.records.len();
        if i >= n || j >= n {
            return Err(SVMError::InvalidParameter(format!(
                "Kernel index ({i}, {j}) out of range for {n} rows"
            )));
        }

        if let Some(value) = self.lock()?.get(i, j) {
            return Ok(value);
        }

        let value = self.kernel.compute(&self.records[i], &self.records[j])?;
        self.lock()?.put(i, j, value);
        Ok(value)
    }
}
