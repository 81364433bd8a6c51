//! Three-tier completion cache
//!
//! L1 is a small LRU, L2 a larger FIFO, L3 a durable compressed store.
//! An entry lives in exactly one tier. Promotion and demotion are moves:
//! a hit in L2 or L3 moves the entry to L1, an L1 eviction moves the
//! victim to the back of L2, and an L2 eviction moves the victim to L3.
//!
//! Every operation runs under one lock, so concurrent callers observe
//! each key in exactly one tier and a duplicate insert becomes a
//! promotion of the existing entry.

pub mod codec;
pub mod fingerprint;
pub mod tier;

pub use fingerprint::FingerprintBuilder;
pub use tier::Tier;

use crate::error::StorageError;
use crate::store::PersistentStore;
use crate::types::{short_hex, Fingerprint};
use codec::StoredRecord;
use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use tier::{CachedText, FifoTier};
use tracing::{debug, warn};

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of entries in L1
    #[serde(default = "default_l1_capacity")]
    pub l1_capacity: usize,

    /// Maximum number of entries in L2
    #[serde(default = "default_l2_capacity")]
    pub l2_capacity: usize,

    /// Keep L3 on disk (sled); otherwise L3 is in memory
    #[serde(default = "default_persist")]
    pub persist: bool,

    /// L3 location, relative to the workspace root
    #[serde(default = "default_l3_path")]
    pub l3_path: PathBuf,
}

fn default_l1_capacity() -> usize {
    64
}

fn default_l2_capacity() -> usize {
    512
}

fn default_persist() -> bool {
    true
}

fn default_l3_path() -> PathBuf {
    PathBuf::from(".folio/cache")
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            l1_capacity: default_l1_capacity(),
            l2_capacity: default_l2_capacity(),
            persist: default_persist(),
            l3_path: default_l3_path(),
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.l1_capacity == 0 {
            return Err("l1_capacity must be greater than zero".to_string());
        }
        if self.l2_capacity == 0 {
            return Err("l2_capacity must be greater than zero".to_string());
        }
        if self.persist && self.l3_path.as_os_str().is_empty() {
            return Err("l3_path cannot be empty when persist is enabled".to_string());
        }
        Ok(())
    }
}

/// Hit/miss counters for one tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TierStats {
    pub hits: u64,
    pub misses: u64,
}

/// Counters accumulated since the hierarchy was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub l1: TierStats,
    pub l2: TierStats,
    pub l3: TierStats,
    pub inserts: u64,
    pub duplicate_inserts: u64,
    pub promotions: u64,
    pub demotions: u64,
}

/// Entry counts per tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TierSizes {
    pub l1: usize,
    pub l2: usize,
    pub l3: usize,
}

/// Snapshot of one cached entry, read without changing recency.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: Fingerprint,
    pub value: String,
    pub tier: Tier,
    pub inserted_at: DateTime<Utc>,
    pub last_access: DateTime<Utc>,
}

/// Result of an insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The key was new and now lives in L1.
    Inserted,
    /// The key already existed; it was promoted to L1 (or touched there)
    /// and the stored value was kept.
    AlreadyPresent(Tier),
}

struct Tiers {
    l1: LruCache<Fingerprint, CachedText>,
    l2: FifoTier,
    stats: CacheStats,
}

pub struct CacheHierarchy {
    tiers: Mutex<Tiers>,
    l3: Arc<dyn PersistentStore>,
}

impl CacheHierarchy {
    pub fn new(config: &CacheConfig, l3: Arc<dyn PersistentStore>) -> Result<Self, StorageError> {
        Self::with_capacities(config.l1_capacity, config.l2_capacity, l3)
    }

    pub fn with_capacities(
        l1_capacity: usize,
        l2_capacity: usize,
        l3: Arc<dyn PersistentStore>,
    ) -> Result<Self, StorageError> {
        let l1_capacity =
            NonZeroUsize::new(l1_capacity).ok_or(StorageError::InvalidCapacity { tier: "l1" })?;
        if l2_capacity == 0 {
            return Err(StorageError::InvalidCapacity { tier: "l2" });
        }
        Ok(Self {
            tiers: Mutex::new(Tiers {
                l1: LruCache::new(l1_capacity),
                l2: FifoTier::new(l2_capacity),
                stats: CacheStats::default(),
            }),
            l3,
        })
    }

    /// Look a fingerprint up, promoting L2/L3 hits to L1.
    ///
    /// A failed demotion to L3 during the cascade keeps the victim at the
    /// front of L2 and is logged; the found value is still returned.
    pub fn lookup(&self, key: &Fingerprint) -> Result<Option<String>, StorageError> {
        let mut guard = self.tiers.lock();
        let tiers = &mut *guard;

        if let Some(entry) = tiers.l1.get_mut(key) {
            entry.touch();
            tiers.stats.l1.hits += 1;
            debug!(key = %short_hex(key), tier = "l1", "Cache hit");
            return Ok(Some(entry.text.clone()));
        }
        tiers.stats.l1.misses += 1;

        if let Some(mut entry) = tiers.l2.remove(key) {
            tiers.stats.l2.hits += 1;
            entry.touch();
            let text = entry.text.clone();
            self.promote(tiers, *key, entry, Tier::L2);
            return Ok(Some(text));
        }
        tiers.stats.l2.misses += 1;

        match self.take_from_l3(key)? {
            Some(mut entry) => {
                tiers.stats.l3.hits += 1;
                entry.touch();
                let text = entry.text.clone();
                self.promote(tiers, *key, entry, Tier::L3);
                Ok(Some(text))
            }
            None => {
                tiers.stats.l3.misses += 1;
                debug!(key = %short_hex(key), "Cache miss");
                Ok(None)
            }
        }
    }

    /// Insert a value. A key that already exists anywhere keeps its stored
    /// value and is promoted to L1 instead.
    pub fn insert(&self, key: Fingerprint, value: String) -> Result<InsertOutcome, StorageError> {
        let mut guard = self.tiers.lock();
        let tiers = &mut *guard;

        if let Some(entry) = tiers.l1.get_mut(&key) {
            entry.touch();
            tiers.stats.duplicate_inserts += 1;
            return Ok(InsertOutcome::AlreadyPresent(Tier::L1));
        }

        let (entry, outcome) = if let Some(mut entry) = tiers.l2.remove(&key) {
            entry.touch();
            tiers.stats.duplicate_inserts += 1;
            tiers.stats.promotions += 1;
            (entry, InsertOutcome::AlreadyPresent(Tier::L2))
        } else if let Some(mut entry) = self.take_from_l3(&key)? {
            entry.touch();
            tiers.stats.duplicate_inserts += 1;
            tiers.stats.promotions += 1;
            (entry, InsertOutcome::AlreadyPresent(Tier::L3))
        } else {
            tiers.stats.inserts += 1;
            (CachedText::fresh(value), InsertOutcome::Inserted)
        };

        debug!(key = %short_hex(&key), outcome = ?outcome, "Cache insert");
        self.admit_to_l1(tiers, key, entry)?;
        Ok(outcome)
    }

    /// Which tier currently holds `key`, without changing recency.
    pub fn tier_of(&self, key: &Fingerprint) -> Result<Option<Tier>, StorageError> {
        let tiers = self.tiers.lock();
        if tiers.l1.contains(key) {
            return Ok(Some(Tier::L1));
        }
        if tiers.l2.contains(key) {
            return Ok(Some(Tier::L2));
        }
        Ok(self.l3.get(key)?.map(|_| Tier::L3))
    }

    /// Read an entry without promoting it.
    pub fn peek(&self, key: &Fingerprint) -> Result<Option<CacheEntry>, StorageError> {
        let tiers = self.tiers.lock();
        let snapshot = |entry: &CachedText, tier| CacheEntry {
            key: *key,
            value: entry.text.clone(),
            tier,
            inserted_at: entry.inserted_at,
            last_access: entry.last_access,
        };
        if let Some(entry) = tiers.l1.peek(key) {
            return Ok(Some(snapshot(entry, Tier::L1)));
        }
        if let Some(entry) = tiers.l2.peek(key) {
            return Ok(Some(snapshot(entry, Tier::L2)));
        }
        match self.l3.get(key)? {
            Some(bytes) => {
                let entry = decode_l3(&bytes)?;
                Ok(Some(snapshot(&entry, Tier::L3)))
            }
            None => Ok(None),
        }
    }

    pub fn sizes(&self) -> Result<TierSizes, StorageError> {
        let tiers = self.tiers.lock();
        Ok(TierSizes {
            l1: tiers.l1.len(),
            l2: tiers.l2.len(),
            l3: self.l3.len()?,
        })
    }

    pub fn stats(&self) -> CacheStats {
        self.tiers.lock().stats
    }

    /// Drop every entry in every tier. Counters are kept.
    pub fn clear(&self) -> Result<(), StorageError> {
        let mut tiers = self.tiers.lock();
        tiers.l1.clear();
        tiers.l2.clear();
        self.l3.clear()
    }

    fn promote(&self, tiers: &mut Tiers, key: Fingerprint, entry: CachedText, from: Tier) {
        tiers.stats.promotions += 1;
        debug!(key = %short_hex(&key), from = %from, "Cache promotion");
        if let Err(err) = self.admit_to_l1(tiers, key, entry) {
            warn!(
                key = %short_hex(&key),
                error = %err,
                "Demotion to L3 failed; entry kept in L2"
            );
        }
    }

    /// Place `entry` in L1, cascading evictions down the tiers.
    ///
    /// The entry always lands in L1. An error means an L2 victim could not
    /// be written to L3 and was restored to the front of L2.
    fn admit_to_l1(
        &self,
        tiers: &mut Tiers,
        key: Fingerprint,
        entry: CachedText,
    ) -> Result<(), StorageError> {
        let evicted = if tiers.l1.len() >= tiers.l1.cap().get() {
            tiers.l1.pop_lru()
        } else {
            None
        };
        tiers.l1.put(key, entry);

        let Some((victim_key, victim)) = evicted else {
            return Ok(());
        };
        tiers.stats.demotions += 1;
        tiers.l2.push_back(victim_key, victim);

        while tiers.l2.len() > tiers.l2.capacity() {
            let Some((old_key, old_entry)) = tiers.l2.pop_front() else {
                break;
            };
            if let Err(err) = self.write_to_l3(&old_key, &old_entry) {
                tiers.l2.push_front(old_key, old_entry);
                warn!(
                    l2_len = tiers.l2.len(),
                    l2_capacity = tiers.l2.capacity(),
                    "L2 over capacity until L3 accepts writes again"
                );
                return Err(err);
            }
            tiers.stats.demotions += 1;
            debug!(key = %short_hex(&old_key), "Cache demotion to L3");
        }
        Ok(())
    }

    fn write_to_l3(&self, key: &Fingerprint, entry: &CachedText) -> Result<(), StorageError> {
        let record = StoredRecord {
            compressed: codec::compress(&entry.text)?,
            inserted_at: entry.inserted_at,
            last_access: entry.last_access,
        };
        self.l3.put(key, &codec::encode_record(&record)?)
    }

    fn take_from_l3(&self, key: &Fingerprint) -> Result<Option<CachedText>, StorageError> {
        let Some(bytes) = self.l3.get(key)? else {
            return Ok(None);
        };
        match decode_l3(&bytes) {
            Ok(entry) => {
                self.l3.delete(key)?;
                Ok(Some(entry))
            }
            Err(err) => {
                // An undecodable record can never be served; drop it so the key regenerates.
                warn!(key = %short_hex(key), error = %err, "Discarding corrupt L3 record");
                self.l3.delete(key)?;
                Ok(None)
            }
        }
    }
}

fn decode_l3(bytes: &[u8]) -> Result<CachedText, StorageError> {
    let record = codec::decode_record(bytes)?;
    Ok(CachedText {
        text: codec::decompress(&record.compressed)?,
        inserted_at: record.inserted_at,
        last_access: record.last_access,
    })
}
