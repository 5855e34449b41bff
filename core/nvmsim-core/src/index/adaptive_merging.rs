//! Adaptive merging — a [`DbIndex`] decorator over a cold partitioned dataset.
//!
//! The decorator starts with `starting_entries` cold entries laid out in
//! fixed-size partitions and an arbitrary hot index it wraps. Every find or
//! delete is split between both tiers in proportion to their sizes:
//!
//! ```text
//! request(n) ──┬── hot part ──────────────▶ wrapped index
//!              └── cold part ─▶ locate ─▶ touch (invalidate + load)
//!                                            └─▶ migrate into wrapped index
//! ```
//!
//! Three variants share this control flow and differ only in how a touch is
//! charged:
//!
//! | Variant | Manager | Invalidation |
//! |---------|---------|--------------|
//! | `Eager` | [`AmPartitionManager`] | rewrite of the partition's first block |
//! | `Lazy`  | [`LamPartitionManager`] | deferred to LEB reorganization |
//! | `Pcm`   | [`AmPartitionManager`] | read + overwrite of the located bytes |

use crate::error::{SimError, SimResult};
use crate::index::{DbIndex, IndexCounters, IndexOp};
use crate::logging::TARGET_AM;
use crate::storage::{
    AmPartitionManager, Disk, Invalidation, LamConfig, LamPartitionManager, Lookup, Partition,
    PartitionManager, TouchCost,
};

/// Adaptive-merging flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdaptiveMergingVariant {
    Eager,
    Lazy,
    Pcm,
}

impl AdaptiveMergingVariant {
    pub fn name(self) -> &'static str {
        match self {
            Self::Eager => "AdaptiveMerging",
            Self::Lazy => "LazyAdaptiveMerging",
            Self::Pcm => "PCMAdaptiveMerging",
        }
    }
}

/// Cold dataset geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmParams {
    /// Partition size in bytes
    pub partition_size: usize,
    /// Entries resident in partitions at construction
    pub starting_entries: usize,
}

impl AmParams {
    pub fn new(partition_size: usize, starting_entries: usize) -> Self {
        Self {
            partition_size,
            starting_entries,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdaptiveMerging {
    variant: AdaptiveMergingVariant,
    index: Box<dyn DbIndex>,
    manager: PartitionManager,
    counters: IndexCounters,
    // fractional cold share not yet assigned to a request
    cold_carry: f64,
    expected_entries: usize,
}

impl AdaptiveMerging {
    /// Eager adaptive merging.
    pub fn new(index: Box<dyn DbIndex>, params: AmParams) -> SimResult<Self> {
        let am = AmPartitionManager::new(
            params.starting_entries,
            index.record_size(),
            params.partition_size,
            Invalidation::BlockRewrite,
        )?;
        Ok(Self::build(
            AdaptiveMergingVariant::Eager,
            index,
            PartitionManager::Am(am),
        ))
    }

    /// Lazy adaptive merging with LEB reorganization.
    pub fn lazy(index: Box<dyn DbIndex>, params: AmParams, config: LamConfig) -> SimResult<Self> {
        let am = AmPartitionManager::new(
            params.starting_entries,
            index.record_size(),
            params.partition_size,
            Invalidation::BlockRewrite,
        )?;
        let lam = LamPartitionManager::new(am, index.disk().block_size(), config)?;
        Ok(Self::build(
            AdaptiveMergingVariant::Lazy,
            index,
            PartitionManager::Lam(lam),
        ))
    }

    /// Adaptive merging for byte-addressable PCM. The wrapped index must sit
    /// on a PCM disk.
    pub fn pcm(index: Box<dyn DbIndex>, params: AmParams) -> SimResult<Self> {
        let model = index.disk().low_level_controller();
        if !model.is_byte_addressable() {
            return Err(SimError::InvalidConfig(format!(
                "PCMAdaptiveMerging requires a PCM disk, got {}",
                model.model_name()
            )));
        }
        let am = AmPartitionManager::new(
            params.starting_entries,
            index.record_size(),
            params.partition_size,
            Invalidation::InPlace,
        )?;
        Ok(Self::build(
            AdaptiveMergingVariant::Pcm,
            index,
            PartitionManager::Am(am),
        ))
    }

    fn build(
        variant: AdaptiveMergingVariant,
        index: Box<dyn DbIndex>,
        manager: PartitionManager,
    ) -> Self {
        let expected_entries = manager.num_entries() + index.num_entries();
        tracing::info!(
            target: TARGET_AM,
            index = variant.name(),
            wrapped = index.name(),
            partitions = manager.partitions().len(),
            cold_entries = manager.num_entries(),
            device = index.disk().low_level_controller().model_name(),
            "adaptive merging index created"
        );
        Self {
            variant,
            index,
            manager,
            counters: IndexCounters::new(),
            cold_carry: 0.0,
            expected_entries,
        }
    }

    pub fn variant(&self) -> AdaptiveMergingVariant {
        self.variant
    }

    pub fn manager(&self) -> &PartitionManager {
        &self.manager
    }

    pub fn partitions(&self) -> &[Partition] {
        self.manager.partitions()
    }

    pub fn wrapped(&self) -> &dyn DbIndex {
        self.index.as_ref()
    }

    /// Entries still resident in partitions.
    pub fn cold_entries(&self) -> usize {
        self.manager.num_entries()
    }

    pub fn number_of_lebs(&self) -> Option<usize> {
        self.manager.as_lam().map(LamPartitionManager::number_of_lebs)
    }

    pub fn number_of_reorganizations(&self) -> Option<usize> {
        self.manager
            .as_lam()
            .map(LamPartitionManager::number_of_reorganizations)
    }

    pub fn num_entries_to_delete(&self) -> Option<usize> {
        self.manager
            .as_lam()
            .map(LamPartitionManager::num_entries_to_delete)
    }

    fn check_entries(&self) {
        assert_eq!(
            self.manager.num_entries() + self.index.num_entries(),
            self.expected_entries,
            "{}: cold + hot entries diverged",
            self.variant.name()
        );
    }

    /// Splits `entries` (already clamped to the total) into `(cold, hot)`.
    fn split(&mut self, entries: usize) -> (usize, usize) {
        let cold_total = self.manager.num_entries();
        let hot_total = self.index.num_entries();
        let total = cold_total + hot_total;
        if total == 0 {
            return (0, 0);
        }

        let exact = entries as f64 * cold_total as f64 / total as f64 + self.cold_carry;
        let share = exact.floor() as usize;
        let cold = share
            .clamp(entries.saturating_sub(hot_total), entries.min(cold_total));
        self.cold_carry = if cold == share { exact - share as f64 } else { 0.0 };
        (cold, entries - cold)
    }

    /// Touches the partitions holding `entries` cold entries and pegs the
    /// breakdown counters.
    fn touch_cold(&mut self, lookup: Lookup, entries: usize) -> TouchCost {
        let located = self.manager.locate(lookup, entries);
        let cost = self.manager.touch(self.index.disk_mut(), &located);
        if !located.is_empty() {
            self.counters.record(
                IndexOp::AmInvalidation,
                cost.invalidation_time,
                cost.invalidation_operations,
            );
            self.counters
                .record(IndexOp::AmLoading, cost.loading_time, cost.loading_operations);
        }
        cost
    }

    fn find(&mut self, lookup: Lookup, entries: usize, repeats: usize) -> SimResult<f64> {
        let entries = entries.min(self.num_entries());
        if entries == 0 || repeats == 0 {
            return Ok(0.0);
        }
        let (cold, hot) = self.split(entries);

        let mut time = 0.0;
        if hot > 0 {
            time += match lookup {
                Lookup::Point => self.index.find_point_entries(hot, repeats)?,
                Lookup::Range => self.index.find_range_entries(hot, repeats)?,
            };
        }
        if cold > 0 {
            let cost = self.touch_cold(lookup, cold);
            time += cost.total_time();
            time += self.index.insert_entries(cost.entries)?;
            if repeats > 1 {
                // migrated entries are hot from now on
                time += match lookup {
                    Lookup::Point => self.index.find_point_entries(cost.entries, repeats - 1)?,
                    Lookup::Range => self.index.find_range_entries(cost.entries, repeats - 1)?,
                };
            }
        }

        let op = match lookup {
            Lookup::Point => IndexOp::FindPoint,
            Lookup::Range => IndexOp::FindRange,
        };
        self.counters.record(op, time, 1);
        self.check_entries();
        Ok(time)
    }
}

impl DbIndex for AdaptiveMerging {
    fn name(&self) -> &str {
        self.variant.name()
    }

    fn num_entries(&self) -> usize {
        self.manager.num_entries() + self.index.num_entries()
    }

    fn key_size(&self) -> usize {
        self.index.key_size()
    }

    fn data_size(&self) -> usize {
        self.index.data_size()
    }

    fn is_bulkload_supported(&self) -> bool {
        false
    }

    fn insert_entries(&mut self, entries: usize) -> SimResult<f64> {
        if entries == 0 {
            return Ok(0.0);
        }
        let time = self.index.insert_entries(entries)?;
        self.expected_entries += entries;
        self.counters.record(IndexOp::Insert, time, 1);
        self.check_entries();
        Ok(time)
    }

    fn bulkload_entries(&mut self, _entries: usize) -> SimResult<f64> {
        Err(SimError::Unsupported(format!(
            "{} does not support bulkload",
            self.variant.name()
        )))
    }

    fn find_point_entries(&mut self, entries: usize, repeats: usize) -> SimResult<f64> {
        self.find(Lookup::Point, entries, repeats)
    }

    fn find_range_entries(&mut self, entries: usize, repeats: usize) -> SimResult<f64> {
        self.find(Lookup::Range, entries, repeats)
    }

    fn delete_entries(&mut self, entries: usize) -> SimResult<f64> {
        let entries = entries.min(self.num_entries());
        if entries == 0 {
            return Ok(0.0);
        }
        let (cold, hot) = self.split(entries);

        let mut time = 0.0;
        if hot > 0 {
            time += self.index.delete_entries(hot)?;
        }
        if cold > 0 {
            // migrate, then complete the delete in the wrapped index
            let cost = self.touch_cold(Lookup::Point, cold);
            time += cost.total_time();
            time += self.index.insert_entries(cost.entries)?;
            time += self.index.delete_entries(cost.entries)?;
        }

        self.expected_entries -= entries;
        self.counters.record(IndexOp::Delete, time, 1);
        self.check_entries();
        Ok(time)
    }

    fn counters(&self) -> &IndexCounters {
        &self.counters
    }

    fn disk(&self) -> &Disk {
        self.index.disk()
    }

    fn disk_mut(&mut self) -> &mut Disk {
        self.index.disk_mut()
    }

    fn box_clone(&self) -> Box<dyn DbIndex> {
        Box::new(self.clone())
    }
}
