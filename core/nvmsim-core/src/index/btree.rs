//! Reference hot index: an analytical B+Tree cost model.
//!
//! Nodes are `node_size` bytes with `node_size / record_size` slots. Lookups
//! read one node per level; updates additionally overwrite the leaf in place.

use crate::error::{SimError, SimResult};
use crate::index::{DbIndex, IndexCounters, IndexOp};
use crate::storage::Disk;

#[derive(Debug, Clone)]
pub struct BTree {
    disk: Disk,
    counters: IndexCounters,
    key_size: usize,
    data_size: usize,
    node_size: usize,
    entries: usize,
}

impl BTree {
    pub fn new(disk: Disk, key_size: usize, data_size: usize, node_size: usize) -> SimResult<Self> {
        if key_size + data_size == 0 {
            return Err(SimError::InvalidConfig("record size must be > 0".to_string()));
        }
        if node_size == 0 {
            return Err(SimError::InvalidConfig("node size must be > 0".to_string()));
        }
        Ok(Self {
            disk,
            counters: IndexCounters::new(),
            key_size,
            data_size,
            node_size,
            entries: 0,
        })
    }

    pub fn node_size(&self) -> usize {
        self.node_size
    }

    pub fn fanout(&self) -> usize {
        (self.node_size / self.record_size()).max(2)
    }

    /// Levels of a tree holding `entries` entries; 0 for an empty tree.
    pub fn height_for(&self, entries: usize) -> usize {
        if entries == 0 {
            return 0;
        }
        let fanout = self.fanout();
        let mut nodes = entries.div_ceil(fanout);
        let mut height = 1;
        while nodes > 1 {
            nodes = nodes.div_ceil(fanout);
            height += 1;
        }
        height
    }

    pub fn height(&self) -> usize {
        self.height_for(self.entries)
    }

    /// Total node count of a tree built bottom-up over `entries` entries.
    fn nodes_for(&self, entries: usize) -> usize {
        let fanout = self.fanout();
        let mut level = entries.div_ceil(fanout);
        let mut total = level;
        while level > 1 {
            level = level.div_ceil(fanout);
            total += level;
        }
        total
    }

    fn descend(&mut self, levels: usize) -> f64 {
        (0..levels).map(|_| self.disk.read_bytes(self.node_size)).sum()
    }

    fn update_leaf(&mut self) -> f64 {
        let time = self.descend(self.height());
        time + self.disk.overwrite_bytes(self.node_size)
    }
}

impl DbIndex for BTree {
    fn name(&self) -> &str {
        "BTree"
    }

    fn num_entries(&self) -> usize {
        self.entries
    }

    fn key_size(&self) -> usize {
        self.key_size
    }

    fn data_size(&self) -> usize {
        self.data_size
    }

    fn is_bulkload_supported(&self) -> bool {
        true
    }

    fn insert_entries(&mut self, entries: usize) -> SimResult<f64> {
        if entries == 0 {
            return Ok(0.0);
        }
        let mut time = 0.0;
        for _ in 0..entries {
            time += self.update_leaf();
            self.entries += 1;
        }
        self.counters.record(IndexOp::Insert, time, 1);
        Ok(time)
    }

    fn bulkload_entries(&mut self, entries: usize) -> SimResult<f64> {
        if entries == 0 {
            return Ok(0.0);
        }
        let bytes = self.nodes_for(entries) * self.node_size;
        let time = self.disk.write_bytes(bytes);
        self.entries += entries;
        self.counters.record(IndexOp::Bulkload, time, 1);
        Ok(time)
    }

    fn find_point_entries(&mut self, entries: usize, repeats: usize) -> SimResult<f64> {
        if entries == 0 || repeats == 0 {
            return Ok(0.0);
        }
        let height = self.height();
        let mut time = 0.0;
        // empty tree: no node to read
        if height > 0 {
            for _ in 0..repeats {
                for _ in 0..entries {
                    time += self.descend(height);
                }
            }
        }
        self.counters.record(IndexOp::FindPoint, time, 1);
        Ok(time)
    }

    fn find_range_entries(&mut self, entries: usize, repeats: usize) -> SimResult<f64> {
        let entries = entries.min(self.entries);
        if entries == 0 || repeats == 0 {
            return Ok(0.0);
        }
        let inner = self.height().saturating_sub(1);
        let leaf_bytes = entries.div_ceil(self.fanout()) * self.node_size;
        let mut time = 0.0;
        for _ in 0..repeats {
            time += self.descend(inner);
            time += self.disk.read_bytes(leaf_bytes);
        }
        self.counters.record(IndexOp::FindRange, time, 1);
        Ok(time)
    }

    fn delete_entries(&mut self, entries: usize) -> SimResult<f64> {
        let entries = entries.min(self.entries);
        if entries == 0 {
            return Ok(0.0);
        }
        let mut time = 0.0;
        for _ in 0..entries {
            time += self.update_leaf();
            self.entries -= 1;
        }
        self.counters.record(IndexOp::Delete, time, 1);
        Ok(time)
    }

    fn counters(&self) -> &IndexCounters {
        &self.counters
    }

    fn disk(&self) -> &Disk {
        &self.disk
    }

    fn disk_mut(&mut self) -> &mut Disk {
        &mut self.disk
    }

    fn box_clone(&self) -> Box<dyn DbIndex> {
        Box::new(self.clone())
    }
}
