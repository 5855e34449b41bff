//! Disk — facade pairing a memory model with its cost ledgers.
//!
//! Every non-empty call is timed by the model and recorded twice: in the
//! cumulative disk ledger and in the last-call ledger (which is reset first).

use crate::error::SimResult;
use crate::logging::TARGET_DISK;
use crate::memory::{
    Access, CounterValue, MemoryCounter, MemoryCounters, MemoryModel, MemoryModelPcm,
    MemoryModelSsd, PcmSpec, SsdSpec,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Disk {
    model: MemoryModel,
    counters: MemoryCounters,
    last_call: MemoryCounters,
}

impl Disk {
    pub fn new(model: impl Into<MemoryModel>) -> Self {
        Self {
            model: model.into(),
            counters: MemoryCounters::new(),
            last_call: MemoryCounters::new(),
        }
    }

    pub fn ssd(spec: SsdSpec) -> SimResult<Self> {
        Ok(Self::new(MemoryModelSsd::new(spec)?))
    }

    pub fn pcm(spec: PcmSpec) -> SimResult<Self> {
        Ok(Self::new(MemoryModelPcm::new(spec)?))
    }

    pub fn read_bytes(&mut self, bytes: usize) -> f64 {
        if bytes == 0 {
            return 0.0;
        }
        let time = self.model.read_bytes(bytes);
        self.record(Access::Read, time, bytes);
        time
    }

    pub fn write_bytes(&mut self, bytes: usize) -> f64 {
        if bytes == 0 {
            return 0.0;
        }
        let time = self.model.write_bytes(bytes);
        self.record(Access::Write, time, bytes);
        time
    }

    pub fn overwrite_bytes(&mut self, bytes: usize) -> f64 {
        if bytes == 0 {
            return 0.0;
        }
        let time = self.model.overwrite_bytes(bytes);
        self.record(Access::Overwrite, time, bytes);
        time
    }

    fn record(&mut self, access: Access, time: f64, bytes: usize) {
        tracing::trace!(
            target: TARGET_DISK,
            model = %self.model.model_name(),
            ?access,
            bytes,
            time,
            "disk access"
        );
        self.last_call.reset_all_counters();
        self.last_call.record(access, time, bytes as u64);
        self.counters.record(access, time, bytes as u64);
    }

    pub fn low_level_controller(&self) -> &MemoryModel {
        &self.model
    }

    /// Cumulative counter of this disk.
    pub fn disk_counter(&self, id: MemoryCounter) -> (&'static str, CounterValue) {
        self.counters.get_counter(id)
    }

    /// Counter of the most recent non-empty call only.
    pub fn model_counter(&self, id: MemoryCounter) -> (&'static str, CounterValue) {
        self.last_call.get_counter(id)
    }

    pub fn counters(&self) -> &MemoryCounters {
        &self.counters
    }

    pub fn last_call_counters(&self) -> &MemoryCounters {
        &self.last_call
    }

    /// Clears both ledgers; device state (wear, dirty pages) is kept.
    pub fn reset_counters(&mut self) {
        self.counters.reset_all_counters();
        self.last_call.reset_all_counters();
    }

    pub fn page_size(&self) -> usize {
        self.model.page_size()
    }

    pub fn block_size(&self) -> usize {
        self.model.block_size()
    }

    pub fn memory_wear_out(&self) -> u64 {
        self.model.memory_wear_out()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_byte_calls_leave_no_trace() {
        let mut disk = Disk::ssd(SsdSpec::default()).unwrap();
        assert_eq!(disk.read_bytes(0), 0.0);
        assert_eq!(disk.write_bytes(0), 0.0);
        assert_eq!(disk.overwrite_bytes(0), 0.0);
        assert_eq!(disk.counters().count(MemoryCounter::RoTotalOperations), 0);
        assert_eq!(disk.memory_wear_out(), 0);
    }

    #[test]
    fn test_cumulative_and_last_call_ledgers() {
        let spec = SsdSpec::default();
        let mut disk = Disk::ssd(spec.clone()).unwrap();

        let read = disk.read_bytes(4096);
        let write = disk.write_bytes(3 * 4096);

        assert_eq!(disk.disk_counter(MemoryCounter::ReadTotalTime).1, CounterValue::Time(read));
        assert_eq!(
            disk.disk_counter(MemoryCounter::RoTotalOperations).1,
            CounterValue::Count(2)
        );
        // last call only knows about the write
        assert_eq!(
            disk.model_counter(MemoryCounter::ReadTotalOperations).1,
            CounterValue::Count(0)
        );
        assert_eq!(
            disk.model_counter(MemoryCounter::WriteTotalTime).1,
            CounterValue::Time(write)
        );
        assert_eq!(write, 3.0 * spec.write_seq_time);
    }

    #[test]
    fn test_clone_is_deep() {
        let mut disk = Disk::ssd(SsdSpec::default()).unwrap();
        disk.write_bytes(4096);
        let copy = disk.clone();

        disk.overwrite_bytes(4096);
        assert_eq!(copy.memory_wear_out(), 4096);
        assert_eq!(disk.memory_wear_out(), 8192);
        assert_eq!(copy.counters().count(MemoryCounter::OverwriteTotalOperations), 0);
    }

    #[test]
    fn test_reset_keeps_device_state() {
        let mut disk = Disk::ssd(SsdSpec::default()).unwrap();
        disk.overwrite_bytes(4096);
        disk.reset_counters();
        assert_eq!(disk.counters().time(MemoryCounter::RoTotalTime), 0.0);
        assert_eq!(disk.low_level_controller().dirty_pages(), 1);
    }
}
