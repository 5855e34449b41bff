//! IndexCounters — per-index operation ledger.
//!
//! Same shape as [`MemoryCounters`](crate::memory::MemoryCounters): raw time
//! and operation accumulators per index operation, derived totals and
//! averages computed on read. The adaptive-merging invalidation/loading
//! counters break down time that is already part of the find/delete totals,
//! so they are excluded from the derived totals.

use crate::memory::{CounterSample, CounterValue};

/// Index operation whose cost is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexOp {
    Insert,
    Bulkload,
    FindPoint,
    FindRange,
    Delete,
    AmInvalidation,
    AmLoading,
}

impl IndexOp {
    const COUNT: usize = 7;

    fn offset(self) -> usize {
        match self {
            IndexOp::Insert => 0,
            IndexOp::Bulkload => 1,
            IndexOp::FindPoint => 2,
            IndexOp::FindRange => 3,
            IndexOp::Delete => 4,
            IndexOp::AmInvalidation => 5,
            IndexOp::AmLoading => 6,
        }
    }

    fn from_offset(offset: usize) -> IndexOp {
        match offset {
            0 => IndexOp::Insert,
            1 => IndexOp::Bulkload,
            2 => IndexOp::FindPoint,
            3 => IndexOp::FindRange,
            4 => IndexOp::Delete,
            5 => IndexOp::AmInvalidation,
            _ => IndexOp::AmLoading,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum IndexCounter {
    InsertTotalTime = 0,
    BulkloadTotalTime,
    FindPointTotalTime,
    FindRangeTotalTime,
    DeleteTotalTime,
    AmInvalidationTotalTime,
    AmLoadingTotalTime,
    InsertTotalOperations,
    BulkloadTotalOperations,
    FindPointTotalOperations,
    FindRangeTotalOperations,
    DeleteTotalOperations,
    AmInvalidationTotalOperations,
    AmLoadingTotalOperations,
    RoTotalTime,
    RoTotalOperations,
    RoInsertAvgTime,
    RoBulkloadAvgTime,
    RoFindPointAvgTime,
    RoFindRangeAvgTime,
    RoDeleteAvgTime,
}

impl IndexCounter {
    pub const ALL: [IndexCounter; 21] = [
        IndexCounter::InsertTotalTime,
        IndexCounter::BulkloadTotalTime,
        IndexCounter::FindPointTotalTime,
        IndexCounter::FindRangeTotalTime,
        IndexCounter::DeleteTotalTime,
        IndexCounter::AmInvalidationTotalTime,
        IndexCounter::AmLoadingTotalTime,
        IndexCounter::InsertTotalOperations,
        IndexCounter::BulkloadTotalOperations,
        IndexCounter::FindPointTotalOperations,
        IndexCounter::FindRangeTotalOperations,
        IndexCounter::DeleteTotalOperations,
        IndexCounter::AmInvalidationTotalOperations,
        IndexCounter::AmLoadingTotalOperations,
        IndexCounter::RoTotalTime,
        IndexCounter::RoTotalOperations,
        IndexCounter::RoInsertAvgTime,
        IndexCounter::RoBulkloadAvgTime,
        IndexCounter::RoFindPointAvgTime,
        IndexCounter::RoFindRangeAvgTime,
        IndexCounter::RoDeleteAvgTime,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Forward iteration over `first..=last`.
    pub fn range(first: IndexCounter, last: IndexCounter) -> impl Iterator<Item = IndexCounter> {
        (first.index()..=last.index()).filter_map(Self::from_index)
    }

    pub fn name(self) -> &'static str {
        match self {
            IndexCounter::InsertTotalTime => "INDEX_COUNTER_RW_INSERT_TOTAL_TIME",
            IndexCounter::BulkloadTotalTime => "INDEX_COUNTER_RW_BULKLOAD_TOTAL_TIME",
            IndexCounter::FindPointTotalTime => "INDEX_COUNTER_RW_FIND_POINT_TOTAL_TIME",
            IndexCounter::FindRangeTotalTime => "INDEX_COUNTER_RW_FIND_RANGE_TOTAL_TIME",
            IndexCounter::DeleteTotalTime => "INDEX_COUNTER_RW_DELETE_TOTAL_TIME",
            IndexCounter::AmInvalidationTotalTime => "INDEX_AM_COUNTER_RO_INVALIDATION_TOTAL_TIME",
            IndexCounter::AmLoadingTotalTime => "INDEX_AM_COUNTER_RO_LOADING_TOTAL_TIME",
            IndexCounter::InsertTotalOperations => "INDEX_COUNTER_RW_INSERT_TOTAL_OPERATIONS",
            IndexCounter::BulkloadTotalOperations => "INDEX_COUNTER_RW_BULKLOAD_TOTAL_OPERATIONS",
            IndexCounter::FindPointTotalOperations => {
                "INDEX_COUNTER_RW_FIND_POINT_TOTAL_OPERATIONS"
            }
            IndexCounter::FindRangeTotalOperations => {
                "INDEX_COUNTER_RW_FIND_RANGE_TOTAL_OPERATIONS"
            }
            IndexCounter::DeleteTotalOperations => "INDEX_COUNTER_RW_DELETE_TOTAL_OPERATIONS",
            IndexCounter::AmInvalidationTotalOperations => {
                "INDEX_AM_COUNTER_RO_INVALIDATION_TOTAL_OPERATIONS"
            }
            IndexCounter::AmLoadingTotalOperations => "INDEX_AM_COUNTER_RO_LOADING_TOTAL_OPERATIONS",
            IndexCounter::RoTotalTime => "INDEX_COUNTER_RO_TOTAL_TIME",
            IndexCounter::RoTotalOperations => "INDEX_COUNTER_RO_TOTAL_OPERATIONS",
            IndexCounter::RoInsertAvgTime => "INDEX_COUNTER_RO_INSERT_AVG_TIME",
            IndexCounter::RoBulkloadAvgTime => "INDEX_COUNTER_RO_BULKLOAD_AVG_TIME",
            IndexCounter::RoFindPointAvgTime => "INDEX_COUNTER_RO_FIND_POINT_AVG_TIME",
            IndexCounter::RoFindRangeAvgTime => "INDEX_COUNTER_RO_FIND_RANGE_AVG_TIME",
            IndexCounter::RoDeleteAvgTime => "INDEX_COUNTER_RO_DELETE_AVG_TIME",
        }
    }
}

// operations that make up the derived totals
const USER_OPS: usize = 5;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexCounters {
    times: [f64; IndexOp::COUNT],
    operations: [u64; IndexOp::COUNT],
}

impl IndexCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `time` and `operations` to the counters of `op`.
    pub fn record(&mut self, op: IndexOp, time: f64, operations: u64) {
        self.times[op.offset()] += time;
        self.operations[op.offset()] += operations;
    }

    pub fn value(&self, id: IndexCounter) -> CounterValue {
        let i = id.index();
        let ops = IndexOp::COUNT;
        if i < ops {
            CounterValue::Time(self.times[i])
        } else if i < 2 * ops {
            CounterValue::Count(self.operations[i - ops])
        } else {
            match id {
                IndexCounter::RoTotalTime => {
                    CounterValue::Time(self.times[..USER_OPS].iter().sum())
                }
                IndexCounter::RoTotalOperations => {
                    CounterValue::Count(self.operations[..USER_OPS].iter().sum())
                }
                _ => {
                    let op = IndexOp::from_offset(i - IndexCounter::RoInsertAvgTime.index());
                    CounterValue::Time(self.avg_time(op))
                }
            }
        }
    }

    pub fn get_counter(&self, id: IndexCounter) -> (&'static str, CounterValue) {
        (id.name(), self.value(id))
    }

    pub fn time(&self, id: IndexCounter) -> f64 {
        self.value(id).as_f64()
    }

    pub fn count(&self, id: IndexCounter) -> u64 {
        self.value(id).as_u64()
    }

    fn avg_time(&self, op: IndexOp) -> f64 {
        let ops = self.operations[op.offset()];
        if ops == 0 {
            0.0
        } else {
            self.times[op.offset()] / ops as f64
        }
    }

    pub fn reset_all_counters(&mut self) {
        *self = Self::default();
    }

    pub fn snapshot(&self) -> Vec<CounterSample> {
        IndexCounter::ALL
            .iter()
            .map(|id| CounterSample {
                name: id.name().to_string(),
                value: self.value(*id),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_derive() {
        let mut counters = IndexCounters::new();
        counters.record(IndexOp::Insert, 2.0, 1);
        counters.record(IndexOp::Insert, 4.0, 1);
        counters.record(IndexOp::FindPoint, 1.0, 1);
        counters.record(IndexOp::AmInvalidation, 0.5, 1);

        assert_eq!(counters.time(IndexCounter::InsertTotalTime), 6.0);
        assert_eq!(counters.time(IndexCounter::RoInsertAvgTime), 3.0);
        assert_eq!(counters.count(IndexCounter::AmInvalidationTotalOperations), 1);
        // breakdown counters are not part of the totals
        assert_eq!(counters.time(IndexCounter::RoTotalTime), 7.0);
        assert_eq!(counters.count(IndexCounter::RoTotalOperations), 3);
    }

    #[test]
    fn test_avg_without_operations_is_zero() {
        let counters = IndexCounters::new();
        for id in IndexCounter::range(IndexCounter::RoInsertAvgTime, IndexCounter::RoDeleteAvgTime)
        {
            assert_eq!(counters.time(id), 0.0);
        }
    }

    #[test]
    fn test_names_of_am_counters() {
        assert_eq!(
            IndexCounter::AmLoadingTotalOperations.name(),
            "INDEX_AM_COUNTER_RO_LOADING_TOTAL_OPERATIONS"
        );
        let counters = IndexCounters::new();
        let (name, value) = counters.get_counter(IndexCounter::AmInvalidationTotalTime);
        assert_eq!(name, "INDEX_AM_COUNTER_RO_INVALIDATION_TOTAL_TIME");
        assert_eq!(value, CounterValue::Time(0.0));
    }

    #[test]
    fn test_avg_maps_to_its_operation() {
        let mut counters = IndexCounters::new();
        counters.record(IndexOp::Delete, 9.0, 3);
        counters.record(IndexOp::FindRange, 1.0, 4);
        assert_eq!(counters.time(IndexCounter::RoDeleteAvgTime), 3.0);
        assert_eq!(counters.time(IndexCounter::RoFindRangeAvgTime), 0.25);
        assert_eq!(counters.time(IndexCounter::RoBulkloadAvgTime), 0.0);
    }
}
