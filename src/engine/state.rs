use std::collections::HashMap;

use crate::{
    double_diff::{DoubleDifference, SatPair},
    independence::IndependenceBuffer,
    prelude::{Duration, Epoch, SV},
};

/// Persisted integer of one [SatPair]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheEntry {
    /// Fixed integer
    pub value: i64,
    /// Start of the common window, when it was fixed.
    /// A different start means one ambiguity was reset since.
    pub since: Epoch,
}

/// Fix counter key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixKey {
    Satellite(SV),
    /// Epochs where at least one ambiguity was fixed
    Sum,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixCounter {
    /// Number of fixed epochs
    pub count: u32,
    /// Latest fix
    pub last: Epoch,
}

/// Cross epoch state of one [Stage](crate::prelude::Stage)
#[derive(Debug, Default)]
pub struct StageState {
    /// Fixed integers
    pub integers: HashMap<SatPair, CacheEntry>,
    /// Fix counters
    pub counters: HashMap<FixKey, FixCounter>,
    /// Latest successful fix
    pub last_fix: Option<Epoch>,
    /// Epoch of the latest UPD block
    pub upd_epoch: Option<Epoch>,
    /// [IndependenceBuffer]
    pub buffer: IndependenceBuffer,
}

impl StageState {
    /// Integers that are still valid for these [DoubleDifference]s
    pub fn valid_integers(&self, dds: &[DoubleDifference]) -> HashMap<SatPair, i64> {
        dds.iter()
            .filter_map(|dd| {
                let entry = self.integers.get(&dd.pair)?;
                if entry.since == dd.window.start {
                    Some((dd.pair.clone(), entry.value))
                } else {
                    None
                }
            })
            .collect()
    }

    /// Persists the fixed integer of this [DoubleDifference]
    pub fn persist(&mut self, dd: &DoubleDifference) {
        if let Some(value) = dd.fixed() {
            self.integers.insert(
                dd.pair.clone(),
                CacheEntry {
                    value,
                    since: dd.window.start,
                },
            );
        }
    }

    /// Number of fixed epochs of this [SV]
    pub fn fix_count(&self, sv: SV) -> u32 {
        self.counters
            .get(&FixKey::Satellite(sv))
            .map(|c| c.count)
            .unwrap_or_default()
    }

    /// Number of epochs where something got fixed
    pub fn total_fixes(&self) -> u32 {
        self.counters
            .get(&FixKey::Sum)
            .map(|c| c.count)
            .unwrap_or_default()
    }

    /// Increments the counter of this [FixKey]
    pub fn bump(&mut self, t: Epoch, key: FixKey) {
        let counter = self.counters.entry(key).or_insert(FixCounter { count: 0, last: t });
        counter.count += 1;
        counter.last = t;
    }

    /// Resets the counters of this [SV]
    pub fn reset_sv(&mut self, sv: SV) {
        self.counters.remove(&FixKey::Satellite(sv));
    }

    /// Resets all counters
    pub fn reset_counters(&mut self) {
        self.counters.clear();
    }

    /// Drops the satellite counters that were not fixed within `max_gap`.
    pub fn age_out(&mut self, t: Epoch, max_gap: Duration) {
        self.counters.retain(|key, counter| match key {
            FixKey::Satellite(_) => t - counter.last <= max_gap,
            FixKey::Sum => true,
        });
    }
}
