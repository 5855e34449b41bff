//! Index layer — the [`DbIndex`] contract and its implementations.
//!
//! # Design Principles
//!
//! - **DIP**: decorators depend on this trait, never on a concrete tree.
//! - **Ownership**: an index owns its [`Disk`] exclusively; `box_clone` is a
//!   full deep copy and nothing is shared between instances.
//!
//! # Contract
//!
//! - Every operation returns the simulated time it would take, in seconds.
//! - Requests for 0 entries cost 0 and change nothing.
//! - Selectivities must lie in `[0, 1]`.

pub mod adaptive_merging;
pub mod btree;
pub mod counters;

pub use adaptive_merging::{AdaptiveMerging, AdaptiveMergingVariant, AmParams};
pub use btree::BTree;
pub use counters::{IndexCounter, IndexCounters, IndexOp};

use crate::error::{SimError, SimResult};
use crate::memory::CounterValue;
use crate::storage::Disk;
use std::fmt::Debug;

pub trait DbIndex: Debug + Send {
    fn name(&self) -> &str;

    fn num_entries(&self) -> usize;

    fn key_size(&self) -> usize;

    fn data_size(&self) -> usize;

    fn record_size(&self) -> usize {
        self.key_size() + self.data_size()
    }

    fn is_bulkload_supported(&self) -> bool;

    fn insert_entries(&mut self, entries: usize) -> SimResult<f64>;

    fn bulkload_entries(&mut self, entries: usize) -> SimResult<f64>;

    fn find_point_entries(&mut self, entries: usize, repeats: usize) -> SimResult<f64>;

    fn find_range_entries(&mut self, entries: usize, repeats: usize) -> SimResult<f64>;

    fn delete_entries(&mut self, entries: usize) -> SimResult<f64>;

    fn find_point_entries_selectivity(&mut self, selectivity: f64, repeats: usize) -> SimResult<f64> {
        let entries = entries_for_selectivity(self.num_entries(), selectivity)?;
        self.find_point_entries(entries, repeats)
    }

    fn find_range_entries_selectivity(&mut self, selectivity: f64, repeats: usize) -> SimResult<f64> {
        let entries = entries_for_selectivity(self.num_entries(), selectivity)?;
        self.find_range_entries(entries, repeats)
    }

    fn counters(&self) -> &IndexCounters;

    fn counter(&self, id: IndexCounter) -> (&'static str, CounterValue) {
        self.counters().get_counter(id)
    }

    fn disk(&self) -> &Disk;

    fn disk_mut(&mut self) -> &mut Disk;

    fn box_clone(&self) -> Box<dyn DbIndex>;
}

impl Clone for Box<dyn DbIndex> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// Number of entries a selectivity covers, rounded to the nearest entry.
pub fn entries_for_selectivity(num_entries: usize, selectivity: f64) -> SimResult<usize> {
    if !(0.0..=1.0).contains(&selectivity) {
        return Err(SimError::invalid_argument(
            format!("selectivity {} outside [0, 1]", selectivity),
            format!("index with {} entries", num_entries),
        ));
    }
    Ok((selectivity * num_entries as f64).round() as usize)
}
