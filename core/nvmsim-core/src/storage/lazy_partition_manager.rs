//! LamPartitionManager — lazy adaptive merging.
//!
//! Adds a layer of logical erase blocks (LEBs) above [`AmPartitionManager`].
//! A touch only marks the located entries as stale inside their LEB; the
//! physical invalidation is deferred until enough LEBs run below the usage
//! threshold, at which point a reorganization pass rewrites the live data of
//! the emptiest blocks into fewer fresh ones and reclaims the rest. A pass
//! that would not free a block is skipped and costs nothing.

use crate::error::{SimError, SimResult};
use crate::logging::TARGET_AM;
use crate::storage::disk::Disk;
use crate::storage::partition::LogicalEraseBlock;
use crate::storage::partition_manager::AmPartitionManager;
use crate::storage::{Located, TouchCost};
use serde::{Deserialize, Serialize};

/// Reorganization tuning. Every field is mandatory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LamConfig {
    /// Upper bound of LEBs compacted by one pass
    pub reorganization_max_blocks: usize,
    /// Number of low-usage LEBs that triggers a pass
    #[serde(alias = "reorganization_blocks_treshold")]
    pub reorganization_blocks_threshold: usize,
    /// An LEB below this usage counts as low-usage
    pub leb_usage_threshold: f64,
}

impl LamConfig {
    pub fn new(
        reorganization_max_blocks: usize,
        reorganization_blocks_threshold: usize,
        leb_usage_threshold: f64,
    ) -> SimResult<Self> {
        let config = Self {
            reorganization_max_blocks,
            reorganization_blocks_threshold,
            leb_usage_threshold,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.reorganization_max_blocks == 0 {
            return Err(SimError::InvalidConfig(
                "reorganization_max_blocks must be >= 1".to_string(),
            ));
        }
        if self.reorganization_blocks_threshold == 0 {
            return Err(SimError::InvalidConfig(
                "reorganization_blocks_threshold must be >= 1".to_string(),
            ));
        }
        if !(self.leb_usage_threshold > 0.0 && self.leb_usage_threshold <= 1.0) {
            return Err(SimError::InvalidConfig(format!(
                "leb_usage_threshold {} outside (0, 1]",
                self.leb_usage_threshold
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LamPartitionManager {
    am: AmPartitionManager,
    config: LamConfig,
    lebs: Vec<LogicalEraseBlock>,
    // owning LEB per partition; None once a drained partition was reclaimed
    partition_leb: Vec<Option<usize>>,
    leb_capacity: usize,
    reorganizations: usize,
    entries_to_delete: usize,
}

impl LamPartitionManager {
    /// Groups the partitions of `am` into LEBs of one erase block each
    /// (one partition per LEB when a partition is larger than a block or the
    /// medium has no erase blocks).
    pub fn new(am: AmPartitionManager, block_size: usize, config: LamConfig) -> SimResult<Self> {
        config.validate()?;

        let partition_bytes = am.partition_bytes();
        let per_leb = if block_size == 0 {
            1
        } else {
            (block_size / partition_bytes).max(1)
        };
        let leb_capacity = per_leb * partition_bytes;

        let ids: Vec<usize> = (0..am.partitions().len()).collect();
        let lebs: Vec<LogicalEraseBlock> = ids
            .chunks(per_leb)
            .map(|chunk| {
                let valid = chunk.iter().map(|p| am.remaining_bytes(*p)).sum();
                LogicalEraseBlock::new(leb_capacity, chunk.to_vec(), valid)
            })
            .collect();

        let mut manager = Self {
            partition_leb: vec![None; am.partitions().len()],
            am,
            config,
            lebs,
            leb_capacity,
            reorganizations: 0,
            entries_to_delete: 0,
        };
        manager.rebuild_partition_map();
        Ok(manager)
    }

    pub fn partitions_manager(&self) -> &AmPartitionManager {
        &self.am
    }

    pub(crate) fn partitions_manager_mut(&mut self) -> &mut AmPartitionManager {
        &mut self.am
    }

    pub fn config(&self) -> &LamConfig {
        &self.config
    }

    pub fn lebs(&self) -> &[LogicalEraseBlock] {
        &self.lebs
    }

    pub fn number_of_lebs(&self) -> usize {
        self.lebs.len()
    }

    pub fn number_of_reorganizations(&self) -> usize {
        self.reorganizations
    }

    /// Entries migrated out but still physically present in their LEB.
    pub fn num_entries_to_delete(&self) -> usize {
        self.entries_to_delete
    }

    pub fn leb_capacity(&self) -> usize {
        self.leb_capacity
    }

    fn rebuild_partition_map(&mut self) {
        self.partition_leb.iter_mut().for_each(|slot| *slot = None);
        for (i, leb) in self.lebs.iter().enumerate() {
            for p in leb.partitions() {
                self.partition_leb[*p] = Some(i);
            }
        }
    }

    /// Scans and drains the located entries; invalidation is only logical.
    pub fn touch(&mut self, disk: &mut Disk, located: &[Located]) -> TouchCost {
        let mut cost = TouchCost::default();
        if located.is_empty() {
            return cost;
        }

        let record_size = self.am.record_size();
        for loc in located {
            cost.loading_time += self.am.load(disk, loc.partition);
            let taken = self.am.take(loc.partition, loc.entries);
            if let Some(leb) = self.partition_leb[loc.partition] {
                self.lebs[leb].invalidate(taken * record_size);
            }
            self.entries_to_delete += taken;
            cost.entries += taken;
        }
        cost.loading_operations = 1;

        if let Some(time) = self.reorganize_if_needed(disk) {
            cost.invalidation_time += time;
            cost.invalidation_operations = 1;
        }
        cost
    }

    fn reorganize_if_needed(&mut self, disk: &mut Disk) -> Option<f64> {
        let threshold = self.config.leb_usage_threshold;
        let mut candidates: Vec<usize> = self
            .lebs
            .iter()
            .enumerate()
            .filter(|(_, leb)| leb.usage() < threshold)
            .map(|(i, _)| i)
            .collect();
        if candidates.len() < self.config.reorganization_blocks_threshold {
            return None;
        }

        candidates.sort_by(|a, b| {
            self.lebs[*a]
                .usage()
                .total_cmp(&self.lebs[*b].usage())
                .then(a.cmp(b))
        });
        candidates.truncate(self.config.reorganization_max_blocks);

        // a pass must free at least one block
        let groups = self.repack(&candidates);
        if groups.len() >= candidates.len() {
            return None;
        }
        Some(self.reorganize(disk, &candidates, groups))
    }

    /// Greedy packing of the non-empty partitions of `selected` into fresh
    /// LEBs, in partition order. Returns `(partitions, valid_bytes)` per LEB.
    fn repack(&self, selected: &[usize]) -> Vec<(Vec<usize>, usize)> {
        let mut moved: Vec<usize> = selected
            .iter()
            .flat_map(|i| self.lebs[*i].partitions().iter().copied())
            .filter(|p| !self.am.partitions()[*p].is_empty())
            .collect();
        moved.sort_unstable();

        let mut groups = Vec::new();
        let mut group: Vec<usize> = Vec::new();
        let mut group_bytes = 0;
        for p in moved {
            let bytes = self.am.remaining_bytes(p);
            if !group.is_empty() && group_bytes + bytes > self.leb_capacity {
                groups.push((std::mem::take(&mut group), group_bytes));
                group_bytes = 0;
            }
            group.push(p);
            group_bytes += bytes;
        }
        if !group.is_empty() {
            groups.push((group, group_bytes));
        }
        groups
    }

    /// Replaces the LEBs at `selected` by `groups` and returns the charged time.
    fn reorganize(
        &mut self,
        disk: &mut Disk,
        selected: &[usize],
        groups: Vec<(Vec<usize>, usize)>,
    ) -> f64 {
        let record_size = self.am.record_size();
        let lebs_before = self.lebs.len();

        let live_bytes: usize = selected.iter().map(|i| self.lebs[*i].valid_bytes()).sum();
        let stale_entries: usize = selected
            .iter()
            .map(|i| self.lebs[*i].stale_bytes() / record_size)
            .sum();

        // live data is read back and rewritten into fresh blocks
        let time = disk.read_bytes(live_bytes) + disk.overwrite_bytes(live_bytes);

        let mut keep = vec![true; self.lebs.len()];
        for i in selected {
            keep[*i] = false;
        }
        let mut index = 0;
        self.lebs.retain(|_| {
            let kept = keep[index];
            index += 1;
            kept
        });

        let capacity = self.leb_capacity;
        self.lebs.extend(
            groups
                .into_iter()
                .map(|(partitions, valid)| LogicalEraseBlock::new(capacity, partitions, valid)),
        );

        self.lebs
            .sort_by_key(|leb| leb.partitions().first().copied().unwrap_or(usize::MAX));
        self.rebuild_partition_map();

        self.entries_to_delete -= stale_entries;
        self.reorganizations += 1;

        tracing::debug!(
            target: TARGET_AM,
            merged = selected.len(),
            lebs_before,
            lebs_after = self.lebs.len(),
            live_bytes,
            reclaimed_entries = stale_entries,
            time,
            "LEB reorganization"
        );
        time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::SsdSpec;
    use crate::storage::Lookup;
    use crate::storage::partition_manager::Invalidation;

    // 64-byte records, 64 KiB partitions, 4 partitions per 256 KiB LEB
    fn lam(partitions: usize, config: LamConfig) -> (LamPartitionManager, Disk) {
        let spec = SsdSpec::default();
        let am =
            AmPartitionManager::new(partitions * 1024, 64, 65536, Invalidation::BlockRewrite)
                .unwrap();
        let lam = LamPartitionManager::new(am, spec.block_size, config).unwrap();
        (lam, Disk::ssd(spec).unwrap())
    }

    #[test]
    fn test_config_is_validated() {
        assert!(LamConfig::new(0, 1, 0.5).is_err());
        assert!(LamConfig::new(1, 0, 0.5).is_err());
        assert!(LamConfig::new(1, 1, 0.0).is_err());
        assert!(LamConfig::new(1, 1, 1.5).is_err());
        assert!(LamConfig::new(2, 2, 1.0).is_ok());
    }

    #[test]
    fn test_config_accepts_legacy_spelling() {
        let json = r#"{
            "reorganization_max_blocks": 4,
            "reorganization_blocks_treshold": 2,
            "leb_usage_threshold": 0.5
        }"#;
        let config: LamConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.reorganization_blocks_threshold, 2);
    }

    #[test]
    fn test_lebs_group_partitions_by_block() {
        let (lam, _) = lam(16, LamConfig::new(2, 2, 0.5).unwrap());
        assert_eq!(lam.number_of_lebs(), 4);
        assert_eq!(lam.leb_capacity(), 262144);
        assert_eq!(lam.lebs()[1].partitions(), &[4, 5, 6, 7]);
        assert!(lam.lebs().iter().all(|leb| leb.usage() == 1.0));
    }

    #[test]
    fn test_touch_defers_invalidation() {
        let (mut lam, mut disk) = lam(16, LamConfig::new(2, 2, 0.5).unwrap());
        let located = lam.partitions_manager_mut().locate(Lookup::Range, 100);
        let cost = lam.touch(&mut disk, &located);

        assert_eq!(cost.invalidation_time, 0.0);
        assert_eq!(cost.invalidation_operations, 0);
        assert_eq!(cost.loading_operations, 1);
        assert!(cost.loading_time > 0.0);
        assert_eq!(lam.num_entries_to_delete(), 100);
        assert_eq!(lam.lebs()[0].stale_bytes(), 6400);
        assert_eq!(disk.counters().count(crate::memory::MemoryCounter::OverwriteTotalOperations), 0);
    }

    #[test]
    fn test_reorganization_merges_low_usage_blocks() {
        let (mut lam, mut disk) = lam(16, LamConfig::new(2, 2, 0.5).unwrap());

        // drain LEB 0 completely and LEB 1 below half
        let located = lam.partitions_manager_mut().locate(Lookup::Range, 4096);
        let cost = lam.touch(&mut disk, &located);
        assert_eq!(cost.invalidation_operations, 0);
        assert_eq!(lam.number_of_reorganizations(), 0);

        let located = lam.partitions_manager_mut().locate(Lookup::Range, 2100);
        let cost = lam.touch(&mut disk, &located);

        assert_eq!(lam.number_of_reorganizations(), 1);
        assert_eq!(cost.invalidation_operations, 1);
        assert!(cost.invalidation_time > 0.0);
        assert_eq!(lam.number_of_lebs(), 3);
        // stale entries of both merged blocks are gone
        assert_eq!(lam.num_entries_to_delete(), 0);
        // partition 4 and 5 were drained, 6 partially: 6 and 7 survive
        assert_eq!(lam.lebs()[0].partitions(), &[6, 7]);
        assert_eq!(lam.lebs()[0].stale_bytes(), 0);
    }

    #[test]
    fn test_pass_skipped_when_no_block_is_freed() {
        let (mut lam, mut disk) = lam(16, LamConfig::new(1, 1, 0.5).unwrap());

        // LEB 0 below half, but its live partitions still need one block
        let located = lam.partitions_manager_mut().locate(Lookup::Range, 2100);
        let cost = lam.touch(&mut disk, &located);
        assert_eq!(cost.invalidation_operations, 0);

        for _ in 0..6 {
            let located = lam.partitions_manager_mut().locate(Lookup::Point, 8);
            let cost = lam.touch(&mut disk, &located);
            assert_eq!(cost.invalidation_operations, 0);
            assert_eq!(cost.invalidation_time, 0.0);
        }
        assert_eq!(lam.number_of_reorganizations(), 0);
        assert_eq!(lam.number_of_lebs(), 4);
        assert_eq!(lam.num_entries_to_delete(), 2100 + 48);
        assert_eq!(disk.counters().count(crate::memory::MemoryCounter::OverwriteTotalOperations), 0);
    }

    #[test]
    fn test_drained_block_reclaimed_once() {
        let (mut lam, mut disk) = lam(16, LamConfig::new(1, 1, 0.5).unwrap());

        let located = lam.partitions_manager_mut().locate(Lookup::Range, 4096);
        let cost = lam.touch(&mut disk, &located);
        assert_eq!(cost.invalidation_operations, 1);
        assert_eq!(lam.number_of_reorganizations(), 1);
        assert_eq!(lam.number_of_lebs(), 3);
        assert_eq!(lam.num_entries_to_delete(), 0);

        // the remaining blocks are full enough; later touches only load
        for _ in 0..4 {
            let located = lam.partitions_manager_mut().locate(Lookup::Point, 16);
            let cost = lam.touch(&mut disk, &located);
            assert_eq!(cost.invalidation_operations, 0);
        }
        assert_eq!(lam.number_of_reorganizations(), 1);
        assert_eq!(lam.number_of_lebs(), 3);
        assert_eq!(lam.num_entries_to_delete(), 64);
    }

    #[test]
    fn test_entries_to_delete_across_passes() {
        let (mut lam, mut disk) = lam(16, LamConfig::new(1, 1, 0.5).unwrap());

        let located = lam.partitions_manager_mut().locate(Lookup::Range, 4096);
        lam.touch(&mut disk, &located);
        let located = lam.partitions_manager_mut().locate(Lookup::Range, 4096);
        lam.touch(&mut disk, &located);
        assert_eq!(lam.number_of_reorganizations(), 2);
        assert_eq!(lam.number_of_lebs(), 2);
        assert_eq!(lam.num_entries_to_delete(), 0);

        let located = lam.partitions_manager_mut().locate(Lookup::Point, 8);
        lam.touch(&mut disk, &located);
        assert_eq!(lam.number_of_reorganizations(), 2);
        assert_eq!(lam.num_entries_to_delete(), 8);
        let stale: usize = lam.lebs().iter().map(|leb| leb.stale_bytes()).sum();
        assert_eq!(stale, 8 * 64);
    }

    #[test]
    fn test_no_reorganization_below_trigger() {
        let (mut lam, mut disk) = lam(16, LamConfig::new(4, 3, 0.5).unwrap());
        let located = lam.partitions_manager_mut().locate(Lookup::Range, 4096 + 2100);
        lam.touch(&mut disk, &located);
        assert_eq!(lam.number_of_reorganizations(), 0);
        assert_eq!(lam.number_of_lebs(), 4);
    }
}
