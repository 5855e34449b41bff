//! Partitions of the cold dataset and the logical erase blocks grouping them.

/// Fixed-capacity, key-ordered slice of the cold dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    capacity: usize,
    remaining_entries: usize,
}

impl Partition {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            remaining_entries: capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn remaining_entries(&self) -> usize {
        self.remaining_entries
    }

    pub fn is_empty(&self) -> bool {
        self.remaining_entries == 0
    }

    /// Removes up to `entries` entries and returns how many were removed.
    pub fn take(&mut self, entries: usize) -> usize {
        let taken = entries.min(self.remaining_entries);
        self.remaining_entries -= taken;
        taken
    }
}

/// Group of partitions sharing one physical erase block.
///
/// Bytes of entries that already migrated stay in the block as stale data
/// until a reorganization rewrites the block's live content elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalEraseBlock {
    capacity_bytes: usize,
    valid_bytes: usize,
    stale_bytes: usize,
    partitions: Vec<usize>,
}

impl LogicalEraseBlock {
    pub fn new(capacity_bytes: usize, partitions: Vec<usize>, valid_bytes: usize) -> Self {
        Self {
            capacity_bytes,
            valid_bytes,
            stale_bytes: 0,
            partitions,
        }
    }

    pub fn capacity_bytes(&self) -> usize {
        self.capacity_bytes
    }

    pub fn valid_bytes(&self) -> usize {
        self.valid_bytes
    }

    pub fn stale_bytes(&self) -> usize {
        self.stale_bytes
    }

    pub fn partitions(&self) -> &[usize] {
        &self.partitions
    }

    /// Fraction of the block still holding live entries.
    pub fn usage(&self) -> f64 {
        if self.capacity_bytes == 0 {
            0.0
        } else {
            self.valid_bytes as f64 / self.capacity_bytes as f64
        }
    }

    /// Logically deletes `bytes` of live data.
    pub fn invalidate(&mut self, bytes: usize) {
        let bytes = bytes.min(self.valid_bytes);
        self.valid_bytes -= bytes;
        self.stale_bytes += bytes;
    }
}
