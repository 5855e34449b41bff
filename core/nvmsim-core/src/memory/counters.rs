//! MemoryCounters — per-device cost ledger.
//!
//! Nine raw accumulators (time, bytes and operation count for read, write and
//! overwrite) plus derived read-only aggregates that are recomputed on every
//! access, so an aggregate can never be stale.

use crate::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Value of a single counter: simulated seconds or an integer count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CounterValue {
    Time(f64),
    Count(u64),
}

impl CounterValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            CounterValue::Time(t) => *t,
            CounterValue::Count(c) => *c as f64,
        }
    }

    /// Integer view; time values are truncated.
    pub fn as_u64(&self) -> u64 {
        match self {
            CounterValue::Time(t) => *t as u64,
            CounterValue::Count(c) => *c,
        }
    }
}

impl fmt::Display for CounterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CounterValue::Time(t) => write!(f, "{:.9}", t),
            CounterValue::Count(c) => write!(f, "{}", c),
        }
    }
}

/// One named counter reading, used for reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterSample {
    pub name: String,
    pub value: CounterValue,
}

/// Kind of device access recorded by a ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    Overwrite,
}

impl Access {
    fn offset(self) -> usize {
        match self {
            Access::Read => 0,
            Access::Write => 1,
            Access::Overwrite => 2,
        }
    }
}

/// Dense counter ids. Raw counters come first, derived (`Ro*`) after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum MemoryCounter {
    ReadTotalTime = 0,
    WriteTotalTime,
    OverwriteTotalTime,
    ReadTotalBytes,
    WriteTotalBytes,
    OverwriteTotalBytes,
    ReadTotalOperations,
    WriteTotalOperations,
    OverwriteTotalOperations,
    RoTotalTime,
    RoTotalBytes,
    RoTotalOperations,
    RoReadAvgTime,
    RoWriteAvgTime,
    RoOverwriteAvgTime,
    RoReadAvgBytes,
    RoWriteAvgBytes,
    RoOverwriteAvgBytes,
}

const RAW_TIME: usize = 3;
const RAW_LONG: usize = 6;

impl MemoryCounter {
    pub const ALL: [MemoryCounter; 18] = [
        MemoryCounter::ReadTotalTime,
        MemoryCounter::WriteTotalTime,
        MemoryCounter::OverwriteTotalTime,
        MemoryCounter::ReadTotalBytes,
        MemoryCounter::WriteTotalBytes,
        MemoryCounter::OverwriteTotalBytes,
        MemoryCounter::ReadTotalOperations,
        MemoryCounter::WriteTotalOperations,
        MemoryCounter::OverwriteTotalOperations,
        MemoryCounter::RoTotalTime,
        MemoryCounter::RoTotalBytes,
        MemoryCounter::RoTotalOperations,
        MemoryCounter::RoReadAvgTime,
        MemoryCounter::RoWriteAvgTime,
        MemoryCounter::RoOverwriteAvgTime,
        MemoryCounter::RoReadAvgBytes,
        MemoryCounter::RoWriteAvgBytes,
        MemoryCounter::RoOverwriteAvgBytes,
    ];

    pub const FIRST_RAW: MemoryCounter = MemoryCounter::ReadTotalTime;
    pub const LAST_RAW: MemoryCounter = MemoryCounter::OverwriteTotalOperations;
    pub const FIRST_DERIVED: MemoryCounter = MemoryCounter::RoTotalTime;
    pub const LAST_DERIVED: MemoryCounter = MemoryCounter::RoOverwriteAvgBytes;

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Forward iteration over `first..=last`.
    pub fn range(first: MemoryCounter, last: MemoryCounter) -> impl Iterator<Item = MemoryCounter> {
        (first.index()..=last.index()).filter_map(Self::from_index)
    }

    pub fn is_derived(self) -> bool {
        self.index() >= Self::FIRST_DERIVED.index()
    }

    pub fn is_time(self) -> bool {
        matches!(
            self,
            MemoryCounter::ReadTotalTime
                | MemoryCounter::WriteTotalTime
                | MemoryCounter::OverwriteTotalTime
                | MemoryCounter::RoTotalTime
                | MemoryCounter::RoReadAvgTime
                | MemoryCounter::RoWriteAvgTime
                | MemoryCounter::RoOverwriteAvgTime
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            MemoryCounter::ReadTotalTime => "MEMORY_COUNTER_RW_READ_TOTAL_TIME",
            MemoryCounter::WriteTotalTime => "MEMORY_COUNTER_RW_WRITE_TOTAL_TIME",
            MemoryCounter::OverwriteTotalTime => "MEMORY_COUNTER_RW_OVERWRITE_TOTAL_TIME",
            MemoryCounter::ReadTotalBytes => "MEMORY_COUNTER_RW_READ_TOTAL_BYTES",
            MemoryCounter::WriteTotalBytes => "MEMORY_COUNTER_RW_WRITE_TOTAL_BYTES",
            MemoryCounter::OverwriteTotalBytes => "MEMORY_COUNTER_RW_OVERWRITE_TOTAL_BYTES",
            MemoryCounter::ReadTotalOperations => "MEMORY_COUNTER_RW_READ_TOTAL_OPERATIONS",
            MemoryCounter::WriteTotalOperations => "MEMORY_COUNTER_RW_WRITE_TOTAL_OPERATIONS",
            MemoryCounter::OverwriteTotalOperations => {
                "MEMORY_COUNTER_RW_OVERWRITE_TOTAL_OPERATIONS"
            }
            MemoryCounter::RoTotalTime => "MEMORY_COUNTER_RO_TOTAL_TIME",
            MemoryCounter::RoTotalBytes => "MEMORY_COUNTER_RO_TOTAL_BYTES",
            MemoryCounter::RoTotalOperations => "MEMORY_COUNTER_RO_TOTAL_OPERATIONS",
            MemoryCounter::RoReadAvgTime => "MEMORY_COUNTER_RO_READ_AVG_TIME",
            MemoryCounter::RoWriteAvgTime => "MEMORY_COUNTER_RO_WRITE_AVG_TIME",
            MemoryCounter::RoOverwriteAvgTime => "MEMORY_COUNTER_RO_OVERWRITE_AVG_TIME",
            MemoryCounter::RoReadAvgBytes => "MEMORY_COUNTER_RO_READ_AVG_BYTES",
            MemoryCounter::RoWriteAvgBytes => "MEMORY_COUNTER_RO_WRITE_AVG_BYTES",
            MemoryCounter::RoOverwriteAvgBytes => "MEMORY_COUNTER_RO_OVERWRITE_AVG_BYTES",
        }
    }
}

/// Ledger of memory costs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryCounters {
    times: [f64; RAW_TIME],
    // bytes for read/write/overwrite, then operations for read/write/overwrite
    longs: [u64; RAW_LONG],
}

impl MemoryCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one access of `bytes` bytes that took `time` seconds.
    pub fn record(&mut self, access: Access, time: f64, bytes: u64) {
        let i = access.offset();
        self.times[i] += time;
        self.longs[i] += bytes;
        self.longs[RAW_TIME + i] += 1;
    }

    /// Adds `delta` to a raw counter.
    pub fn peg_counter(&mut self, id: MemoryCounter, delta: CounterValue) -> SimResult<()> {
        if id.is_derived() {
            return Err(SimError::invalid_argument(
                format!("{} is derived and cannot be pegged", id.name()),
                "MemoryCounters::peg_counter",
            ));
        }
        match (id.is_time(), delta) {
            (true, CounterValue::Time(t)) => self.times[id.index()] += t,
            (false, CounterValue::Count(c)) => self.longs[id.index() - RAW_TIME] += c,
            _ => {
                return Err(SimError::invalid_argument(
                    format!("value kind does not match counter {}", id.name()),
                    "MemoryCounters::peg_counter",
                ));
            }
        }
        Ok(())
    }

    pub fn get_counter(&self, id: MemoryCounter) -> (&'static str, CounterValue) {
        (id.name(), self.value(id))
    }

    pub fn value(&self, id: MemoryCounter) -> CounterValue {
        use MemoryCounter::*;
        match id {
            ReadTotalTime | WriteTotalTime | OverwriteTotalTime => {
                CounterValue::Time(self.times[id.index()])
            }
            ReadTotalBytes | WriteTotalBytes | OverwriteTotalBytes | ReadTotalOperations
            | WriteTotalOperations | OverwriteTotalOperations => {
                CounterValue::Count(self.longs[id.index() - RAW_TIME])
            }
            RoTotalTime => CounterValue::Time(self.times.iter().sum()),
            RoTotalBytes => CounterValue::Count(self.longs[..3].iter().sum()),
            RoTotalOperations => CounterValue::Count(self.longs[3..].iter().sum()),
            RoReadAvgTime => CounterValue::Time(self.avg_time(Access::Read)),
            RoWriteAvgTime => CounterValue::Time(self.avg_time(Access::Write)),
            RoOverwriteAvgTime => CounterValue::Time(self.avg_time(Access::Overwrite)),
            RoReadAvgBytes => CounterValue::Count(self.avg_bytes(Access::Read)),
            RoWriteAvgBytes => CounterValue::Count(self.avg_bytes(Access::Write)),
            RoOverwriteAvgBytes => CounterValue::Count(self.avg_bytes(Access::Overwrite)),
        }
    }

    pub fn time(&self, id: MemoryCounter) -> f64 {
        self.value(id).as_f64()
    }

    pub fn count(&self, id: MemoryCounter) -> u64 {
        self.value(id).as_u64()
    }

    fn avg_time(&self, access: Access) -> f64 {
        let ops = self.longs[RAW_TIME + access.offset()];
        if ops == 0 {
            0.0
        } else {
            self.times[access.offset()] / ops as f64
        }
    }

    fn avg_bytes(&self, access: Access) -> u64 {
        let ops = self.longs[RAW_TIME + access.offset()];
        if ops == 0 {
            0
        } else {
            self.longs[access.offset()] / ops
        }
    }

    pub fn reset_counter(&mut self, id: MemoryCounter) -> SimResult<()> {
        if id.is_derived() {
            return Err(SimError::invalid_argument(
                format!("{} is derived and cannot be reset", id.name()),
                "MemoryCounters::reset_counter",
            ));
        }
        if id.is_time() {
            self.times[id.index()] = 0.0;
        } else {
            self.longs[id.index() - RAW_TIME] = 0;
        }
        Ok(())
    }

    pub fn reset_all_counters(&mut self) {
        *self = Self::default();
    }

    pub fn snapshot(&self) -> Vec<CounterSample> {
        MemoryCounter::ALL
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
    fn test_fresh_counters_are_zero() {
        let counters = MemoryCounters::new();
        for id in MemoryCounter::range(MemoryCounter::FIRST_RAW, MemoryCounter::LAST_DERIVED) {
            assert_eq!(counters.value(id).as_f64(), 0.0, "{}", id.name());
        }
    }

    #[test]
    fn test_record_updates_raw_and_derived() {
        let mut counters = MemoryCounters::new();
        counters.record(Access::Read, 0.5, 4096);
        counters.record(Access::Read, 1.5, 8192);
        counters.record(Access::Write, 2.0, 100);

        assert_eq!(counters.time(MemoryCounter::ReadTotalTime), 2.0);
        assert_eq!(counters.count(MemoryCounter::ReadTotalBytes), 12288);
        assert_eq!(counters.count(MemoryCounter::ReadTotalOperations), 2);
        assert_eq!(counters.time(MemoryCounter::RoTotalTime), 4.0);
        assert_eq!(counters.count(MemoryCounter::RoTotalBytes), 12388);
        assert_eq!(counters.count(MemoryCounter::RoTotalOperations), 3);
        assert_eq!(counters.time(MemoryCounter::RoReadAvgTime), 1.0);
        assert_eq!(counters.count(MemoryCounter::RoReadAvgBytes), 6144);
    }

    #[test]
    fn test_average_with_zero_operations_is_zero() {
        let mut counters = MemoryCounters::new();
        counters
            .peg_counter(MemoryCounter::OverwriteTotalTime, CounterValue::Time(3.0))
            .unwrap();
        assert_eq!(counters.time(MemoryCounter::RoOverwriteAvgTime), 0.0);
        assert_eq!(counters.count(MemoryCounter::RoOverwriteAvgBytes), 0);
    }

    #[test]
    fn test_peg_rejects_derived_and_kind_mismatch() {
        let mut counters = MemoryCounters::new();
        assert!(
            counters
                .peg_counter(MemoryCounter::RoTotalTime, CounterValue::Time(1.0))
                .is_err()
        );
        assert!(
            counters
                .peg_counter(MemoryCounter::ReadTotalBytes, CounterValue::Time(1.0))
                .is_err()
        );
        assert!(
            counters
                .peg_counter(MemoryCounter::ReadTotalTime, CounterValue::Count(1))
                .is_err()
        );
    }

    #[test]
    fn test_reset_counter_recomputes_derived() {
        let mut counters = MemoryCounters::new();
        counters.record(Access::Overwrite, 1.0, 10);
        counters.record(Access::Write, 2.0, 20);

        counters.reset_counter(MemoryCounter::OverwriteTotalTime).unwrap();
        assert_eq!(counters.time(MemoryCounter::RoTotalTime), 2.0);
        assert!(counters.reset_counter(MemoryCounter::RoTotalBytes).is_err());

        counters.reset_all_counters();
        for id in MemoryCounter::range(MemoryCounter::FIRST_DERIVED, MemoryCounter::LAST_DERIVED) {
            assert_eq!(counters.value(id).as_f64(), 0.0);
        }
    }

    #[test]
    fn test_range_iterates_forward() {
        let ids: Vec<_> =
            MemoryCounter::range(MemoryCounter::ReadTotalBytes, MemoryCounter::OverwriteTotalBytes)
                .collect();
        assert_eq!(
            ids,
            vec![
                MemoryCounter::ReadTotalBytes,
                MemoryCounter::WriteTotalBytes,
                MemoryCounter::OverwriteTotalBytes
            ]
        );
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut counters = MemoryCounters::new();
        counters.record(Access::Read, 0.25, 64);
        let json = serde_json::to_string(&counters.snapshot()).unwrap();
        assert!(json.contains("MEMORY_COUNTER_RW_READ_TOTAL_TIME"));
        assert!(json.contains("0.25"));
    }
}
