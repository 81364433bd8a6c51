//! In-memory tier building blocks: cached values and the FIFO tier used for L2.

use crate::types::Fingerprint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Cache tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    L1,
    L2,
    L3,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::L1 => write!(f, "l1"),
            Tier::L2 => write!(f, "l2"),
            Tier::L3 => write!(f, "l3"),
        }
    }
}

/// Uncompressed value held by L1 or L2.
#[derive(Debug, Clone)]
pub(crate) struct CachedText {
    pub text: String,
    pub inserted_at: DateTime<Utc>,
    pub last_access: DateTime<Utc>,
}

impl CachedText {
    pub fn fresh(text: String) -> Self {
        let now = Utc::now();
        Self {
            text,
            inserted_at: now,
            last_access: now,
        }
    }

    pub fn touch(&mut self) {
        self.last_access = Utc::now();
    }
}

/// First-in-first-out tier. Eviction is driven by the hierarchy, which must
/// move evicted entries to L3 before they leave memory.
#[derive(Debug)]
pub(crate) struct FifoTier {
    order: VecDeque<Fingerprint>,
    entries: HashMap<Fingerprint, CachedText>,
    capacity: usize,
}

impl FifoTier {
    pub fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::with_capacity(capacity),
            entries: HashMap::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, key: &Fingerprint) -> bool {
        self.entries.contains_key(key)
    }

    pub fn peek(&self, key: &Fingerprint) -> Option<&CachedText> {
        self.entries.get(key)
    }

    pub fn remove(&mut self, key: &Fingerprint) -> Option<CachedText> {
        let entry = self.entries.remove(key)?;
        if let Some(position) = self.order.iter().position(|k| k == key) {
            self.order.remove(position);
        }
        Some(entry)
    }

    pub fn push_back(&mut self, key: Fingerprint, entry: CachedText) {
        if self.entries.insert(key, entry).is_none() {
            self.order.push_back(key);
        }
    }

    /// Put an entry back at the eviction end, e.g. after a failed demotion.
    pub fn push_front(&mut self, key: Fingerprint, entry: CachedText) {
        if self.entries.insert(key, entry).is_none() {
            self.order.push_front(key);
        }
    }

    pub fn pop_front(&mut self) -> Option<(Fingerprint, CachedText)> {
        let key = self.order.pop_front()?;
        let entry = self.entries.remove(&key)?;
        Some((key, entry))
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.entries.clear();
    }
}
