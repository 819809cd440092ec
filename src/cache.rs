// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Content-addressed cache of evaluated programs
//!
//! Keys are the SHA-256 of the unit, the evaluation settings and the source
//! text, so a hit is always the outcome a fresh evaluation would produce.
//! Only successful evaluations are stored.

use crate::ast::{EvalOptions, ExecutionOutcome};
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    pub fn new(source: &str, options: &EvalOptions) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(options.unit.suffix().as_bytes());
        hasher.update([0]);
        hasher.update(options.segments.to_le_bytes());
        hasher.update((options.max_call_depth as u64).to_le_bytes());
        hasher.update(source.as_bytes());
        Self(hasher.finalize().into())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..8] {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Percentage of lookups answered from the cache
    pub fn hit_rate(&self) -> f32 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            (self.hits as f32 / lookups as f32) * 100.0
        }
    }
}

/// Shared by reference between threads; every method takes `&self`
#[derive(Default)]
pub struct ProgramCache {
    entries: DashMap<CacheKey, Arc<ExecutionOutcome>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ProgramCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<ExecutionOutcome>> {
        match self.entries.get(key) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                log::trace!(key:% = key; "program cache hit");
                Some(Arc::clone(entry.value()))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                log::trace!(key:% = key; "program cache miss");
                None
            }
        }
    }

    pub fn insert(&self, key: CacheKey, outcome: Arc<ExecutionOutcome>) {
        self.entries.insert(key, outcome);
    }

    /// Cached outcome for `key`, evaluating and storing it on a miss
    pub fn get_or_try_insert<E>(
        &self,
        key: CacheKey,
        evaluate: impl FnOnce() -> Result<ExecutionOutcome, E>,
    ) -> Result<Arc<ExecutionOutcome>, E> {
        if let Some(outcome) = self.get(&key) {
            return Ok(outcome);
        }
        let outcome = Arc::new(evaluate()?);
        self.insert(key, Arc::clone(&outcome));
        Ok(outcome)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl fmt::Debug for ProgramCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgramCache").field("stats", &self.stats()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::evaluate;
    use crate::errors::EvalError;
    use crate::io::parse;
    use crate::units::UnitLength;

    fn run(source: &str, options: &EvalOptions) -> Result<ExecutionOutcome, EvalError> {
        evaluate(&parse(source).unwrap(), options)
    }

    #[test]
    fn test_keys_cover_unit_and_settings() {
        let mm = EvalOptions::default();
        let inch = EvalOptions::with_unit(UnitLength::In);
        let coarse = EvalOptions { segments: 12, ..mm };
        let key = CacheKey::new("cube(1)", &mm);
        assert_eq!(key, CacheKey::new("cube(1)", &mm));
        assert_ne!(key, CacheKey::new("cube(1)", &inch));
        assert_ne!(key, CacheKey::new("cube(1)", &coarse));
        assert_ne!(key, CacheKey::new("cube(2)", &mm));
        assert_eq!(key.to_string().len(), 16);
    }

    #[test]
    fn test_hits_and_misses() {
        let cache = ProgramCache::new();
        let options = EvalOptions::default();
        let key = CacheKey::new("cube(1)", &options);

        let first = cache.get_or_try_insert(key, || run("cube(1)", &options)).unwrap();
        let second = cache
            .get_or_try_insert(key, || -> Result<ExecutionOutcome, EvalError> {
                panic!("should have been cached")
            })
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let stats = cache.stats();
        assert_eq!((stats.entries, stats.hits, stats.misses), (1, 1, 1));
        assert_eq!(stats.hit_rate(), 50.0);
    }

    #[test]
    fn test_failures_are_not_cached() {
        let cache = ProgramCache::new();
        let options = EvalOptions::default();
        let key = CacheKey::new("cube(-1)", &options);
        assert!(cache.get_or_try_insert(key, || run("cube(-1)", &options)).is_err());
        assert!(cache.is_empty());
    }
}
