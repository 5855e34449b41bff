//! Storage module — simulated device and the cold partition tier.
//!
//! [`Disk`] charges every access through a memory model. The partition
//! managers hold the cold dataset of the adaptive-merging indexes and run the
//! touch-and-migrate protocol against a `Disk`.

pub mod disk;
pub mod lazy_partition_manager;
pub mod partition;
pub mod partition_manager;

pub use disk::Disk;
pub use lazy_partition_manager::{LamConfig, LamPartitionManager};
pub use partition::{LogicalEraseBlock, Partition};
pub use partition_manager::{AmPartitionManager, Invalidation};

use smallvec::SmallVec;

/// Shape of a lookup, which decides how it maps onto partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Point,
    Range,
}

/// Entries located inside one partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Located {
    pub partition: usize,
    pub entries: usize,
}

/// Most lookups touch a handful of partitions.
pub type LocatedPartitions = SmallVec<[Located; 4]>;

/// Cost of one touch, already summed over all touched partitions.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TouchCost {
    pub invalidation_time: f64,
    pub invalidation_operations: u64,
    pub loading_time: f64,
    pub loading_operations: u64,
    /// Entries drained from the partitions
    pub entries: usize,
}

impl TouchCost {
    pub fn total_time(&self) -> f64 {
        self.invalidation_time + self.loading_time
    }
}

/// Partition manager variant: eager (also used by the PCM decorator) or lazy.
#[derive(Debug, Clone, PartialEq)]
pub enum PartitionManager {
    Am(AmPartitionManager),
    Lam(LamPartitionManager),
}

impl PartitionManager {
    fn am(&self) -> &AmPartitionManager {
        match self {
            Self::Am(am) => am,
            Self::Lam(lam) => lam.partitions_manager(),
        }
    }

    /// Entries still cold.
    pub fn num_entries(&self) -> usize {
        self.am().num_entries()
    }

    /// Fixed-length view of the partitions.
    pub fn partitions(&self) -> &[Partition] {
        self.am().partitions()
    }

    pub fn record_size(&self) -> usize {
        self.am().record_size()
    }

    pub fn locate(&mut self, lookup: Lookup, entries: usize) -> LocatedPartitions {
        match self {
            Self::Am(am) => am.locate(lookup, entries),
            Self::Lam(lam) => lam.partitions_manager_mut().locate(lookup, entries),
        }
    }

    pub fn touch(&mut self, disk: &mut Disk, located: &[Located]) -> TouchCost {
        match self {
            Self::Am(am) => am.touch(disk, located),
            Self::Lam(lam) => lam.touch(disk, located),
        }
    }

    pub fn as_lam(&self) -> Option<&LamPartitionManager> {
        match self {
            Self::Lam(lam) => Some(lam),
            Self::Am(_) => None,
        }
    }
}
