//! AmPartitionManager — cold partitions of eager adaptive merging.
//!
//! Partitions are ordered by key range. Locating a request maps it onto
//! partitions deterministically:
//!
//! - point lookups visit non-empty partitions round-robin, one entry per visit
//! - range lookups take a contiguous run of entries across consecutive
//!   partitions
//!
//! Touching a located partition charges the disk for invalidating its first
//! block (or the located bytes in place, for byte-addressable media) and for
//! scanning its still-valid data, then drains the located entries.

use crate::error::{SimError, SimResult};
use crate::logging::TARGET_AM;
use crate::storage::disk::Disk;
use crate::storage::partition::Partition;
use crate::storage::{Located, LocatedPartitions, Lookup, TouchCost};

/// How a touch invalidates the located entries on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalidation {
    /// Rewrite the partition's first erase block without the located entries.
    BlockRewrite,
    /// Read and overwrite only the located bytes (byte-addressable media).
    InPlace,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AmPartitionManager {
    record_size: usize,
    entries_per_partition: usize,
    partitions: Vec<Partition>,
    invalidation: Invalidation,
    point_cursor: usize,
    range_cursor: usize,
}

impl AmPartitionManager {
    pub fn new(
        total_entries: usize,
        record_size: usize,
        partition_size_bytes: usize,
        invalidation: Invalidation,
    ) -> SimResult<Self> {
        if record_size == 0 {
            return Err(SimError::InvalidConfig("record size must be > 0".to_string()));
        }
        let entries_per_partition = partition_size_bytes / record_size;
        if entries_per_partition == 0 {
            return Err(SimError::InvalidConfig(format!(
                "partition size {} is smaller than one record ({} bytes)",
                partition_size_bytes, record_size
            )));
        }

        let num_partitions = total_entries.div_ceil(entries_per_partition);
        let partitions = (0..num_partitions)
            .map(|i| {
                let start = i * entries_per_partition;
                Partition::new(entries_per_partition.min(total_entries - start))
            })
            .collect();

        Ok(Self {
            record_size,
            entries_per_partition,
            partitions,
            invalidation,
            point_cursor: 0,
            range_cursor: 0,
        })
    }

    /// Entries still cold.
    pub fn num_entries(&self) -> usize {
        self.partitions.iter().map(Partition::remaining_entries).sum()
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    pub fn record_size(&self) -> usize {
        self.record_size
    }

    pub fn entries_per_partition(&self) -> usize {
        self.entries_per_partition
    }

    /// Bytes of a full partition.
    pub fn partition_bytes(&self) -> usize {
        self.entries_per_partition * self.record_size
    }

    pub fn invalidation(&self) -> Invalidation {
        self.invalidation
    }

    pub(crate) fn remaining_bytes(&self, partition: usize) -> usize {
        self.partitions[partition].remaining_entries() * self.record_size
    }

    /// Maps `entries` cold entries onto partitions. Never locates more entries
    /// than are cold.
    pub fn locate(&mut self, lookup: Lookup, entries: usize) -> LocatedPartitions {
        let entries = entries.min(self.num_entries());
        if entries == 0 {
            return LocatedPartitions::new();
        }
        match lookup {
            Lookup::Point => self.locate_point(entries),
            Lookup::Range => self.locate_range(entries),
        }
    }

    fn locate_point(&mut self, mut left: usize) -> LocatedPartitions {
        let count = self.partitions.len();
        let mut located = LocatedPartitions::new();
        let mut slot: Vec<Option<usize>> = vec![None; count];

        while left > 0 {
            let p = self.point_cursor;
            self.point_cursor = (p + 1) % count;

            let planned = slot[p].map_or(0, |s| located[s].entries);
            if self.partitions[p].remaining_entries() > planned {
                match slot[p] {
                    Some(s) => located[s].entries += 1,
                    None => {
                        slot[p] = Some(located.len());
                        located.push(Located {
                            partition: p,
                            entries: 1,
                        });
                    }
                }
                left -= 1;
            }
        }
        located
    }

    fn locate_range(&mut self, mut left: usize) -> LocatedPartitions {
        let count = self.partitions.len();
        let mut located = LocatedPartitions::new();

        while left > 0 {
            let p = self.range_cursor;
            let available = self.partitions[p].remaining_entries();
            let take = available.min(left);
            if take > 0 {
                located.push(Located {
                    partition: p,
                    entries: take,
                });
                left -= take;
            }
            // the next range continues inside a partially consumed partition
            if take == available {
                self.range_cursor = (p + 1) % count;
            }
        }
        located
    }

    /// Charges the scan of a partition's still-valid data.
    pub(crate) fn load(&self, disk: &mut Disk, partition: usize) -> f64 {
        disk.read_bytes(self.remaining_bytes(partition))
    }

    pub(crate) fn take(&mut self, partition: usize, entries: usize) -> usize {
        self.partitions[partition].take(entries)
    }

    fn invalidate(&self, disk: &mut Disk, located: &Located) -> f64 {
        let located_bytes = located.entries * self.record_size;
        match self.invalidation {
            Invalidation::BlockRewrite => {
                let valid = self.remaining_bytes(located.partition);
                let block = disk.block_size();
                let first_block = if block == 0 { valid } else { block.min(valid) };
                disk.overwrite_bytes(first_block.saturating_sub(located_bytes))
            }
            Invalidation::InPlace => {
                disk.read_bytes(located_bytes) + disk.overwrite_bytes(located_bytes)
            }
        }
    }

    /// Runs the touch protocol over `located`, in order.
    pub fn touch(&mut self, disk: &mut Disk, located: &[Located]) -> TouchCost {
        let mut cost = TouchCost::default();
        if located.is_empty() {
            return cost;
        }

        for loc in located {
            cost.invalidation_time += self.invalidate(disk, loc);
            cost.loading_time += self.load(disk, loc.partition);
            cost.entries += self.take(loc.partition, loc.entries);
        }
        cost.invalidation_operations = 1;
        cost.loading_operations = 1;

        tracing::debug!(
            target: TARGET_AM,
            partitions = located.len(),
            entries = cost.entries,
            invalidation = cost.invalidation_time,
            loading = cost.loading_time,
            "partitions touched"
        );
        cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{PcmSpec, SsdSpec};

    fn manager(total: usize) -> AmPartitionManager {
        // 10 entries per partition
        AmPartitionManager::new(total, 100, 1000, Invalidation::BlockRewrite).unwrap()
    }

    #[test]
    fn test_partition_geometry() {
        let am = manager(95);
        assert_eq!(am.partitions().len(), 10);
        assert_eq!(am.partitions()[9].capacity(), 5);
        assert_eq!(am.num_entries(), 95);
        assert_eq!(am.partition_bytes(), 1000);
    }

    #[test]
    fn test_partition_smaller_than_record_rejected() {
        let err = AmPartitionManager::new(10, 72, 64, Invalidation::BlockRewrite).unwrap_err();
        assert!(matches!(err, SimError::InvalidConfig(_)));
    }

    #[test]
    fn test_empty_dataset_has_no_partitions() {
        let mut am = manager(0);
        assert!(am.partitions().is_empty());
        assert!(am.locate(Lookup::Point, 5).is_empty());
    }

    #[test]
    fn test_point_lookup_round_robin() {
        let mut am = manager(30);
        let located = am.locate(Lookup::Point, 4);
        let partitions: Vec<_> = located.iter().map(|l| (l.partition, l.entries)).collect();
        assert_eq!(partitions, vec![(0, 2), (1, 1), (2, 1)]);

        let located = am.locate(Lookup::Point, 1);
        assert_eq!(located[0].partition, 1);
    }

    #[test]
    fn test_point_lookup_skips_drained_partitions() {
        let mut am = manager(20);
        am.take(0, 10);
        let located = am.locate(Lookup::Point, 3);
        assert_eq!(located.len(), 1);
        assert_eq!(located[0].partition, 1);
        assert_eq!(located[0].entries, 3);
    }

    #[test]
    fn test_range_lookup_is_contiguous() {
        let mut am = manager(40);
        let located = am.locate(Lookup::Range, 25);
        let partitions: Vec<_> = located.iter().map(|l| (l.partition, l.entries)).collect();
        assert_eq!(partitions, vec![(0, 10), (1, 10), (2, 5)]);

        // cursor stays inside partition 2
        am.touch(&mut Disk::ssd(SsdSpec::default()).unwrap(), &located);
        let located = am.locate(Lookup::Range, 8);
        let partitions: Vec<_> = located.iter().map(|l| (l.partition, l.entries)).collect();
        assert_eq!(partitions, vec![(2, 5), (3, 3)]);
    }

    #[test]
    fn test_locate_clamps_to_cold_entries() {
        let mut am = manager(12);
        let located = am.locate(Lookup::Point, 100);
        let total: usize = located.iter().map(|l| l.entries).sum();
        assert_eq!(total, 12);
    }

    #[test]
    fn test_touch_block_rewrite_costs() {
        let spec = SsdSpec::default();
        let mut disk = Disk::ssd(spec.clone()).unwrap();
        // 8 partitions of 4096 entries * 64 bytes = one 256 KiB block each
        let mut am =
            AmPartitionManager::new(8 * 4096, 64, spec.block_size, Invalidation::BlockRewrite)
                .unwrap();

        let located = am.locate(Lookup::Point, 1);
        let cost = am.touch(&mut disk, &located);

        let pages = spec.block_size / spec.page_size;
        // block minus one record still spans every page, sequential
        let expected_invalidation = pages as f64 * spec.write_seq_time + spec.erase_time;
        let expected_loading = pages as f64 * spec.read_seq_time;
        assert!((cost.invalidation_time - expected_invalidation).abs() < 1e-12);
        assert!((cost.loading_time - expected_loading).abs() < 1e-12);
        assert_eq!(cost.entries, 1);
        assert_eq!(cost.invalidation_operations, 1);
        assert_eq!(cost.loading_operations, 1);
        assert_eq!(am.num_entries(), 8 * 4096 - 1);
    }

    #[test]
    fn test_touch_in_place_costs() {
        let spec = PcmSpec::default();
        let mut disk = Disk::pcm(spec.clone()).unwrap();
        let mut am = AmPartitionManager::new(1000, 72, 7200, Invalidation::InPlace).unwrap();

        let located = am.locate(Lookup::Point, 1);
        let cost = am.touch(&mut disk, &located);
        assert_eq!(cost.invalidation_time, spec.read_time + spec.write_time);
        assert_eq!(cost.loading_time, spec.read_time);
    }

    #[test]
    fn test_touch_nothing_is_free() {
        let mut disk = Disk::ssd(SsdSpec::default()).unwrap();
        let mut am = manager(10);
        let cost = am.touch(&mut disk, &[]);
        assert_eq!(cost, TouchCost::default());
    }

    #[test]
    fn test_partition_count_never_changes() {
        let mut disk = Disk::ssd(SsdSpec::default()).unwrap();
        let mut am = manager(50);
        let located = am.locate(Lookup::Range, 50);
        am.touch(&mut disk, &located);
        assert_eq!(am.num_entries(), 0);
        assert_eq!(am.partitions().len(), 5);
    }
}
