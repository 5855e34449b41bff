//! Physical memory cost models.
//!
//! [`MemoryModel`] is a closed set of device models. Each variant is a pure
//! cost function over byte counts that also owns its device state (wear-out,
//! dirty pages). Nothing here performs I/O.

pub mod counters;
pub mod pcm;
pub mod ssd;

pub use counters::{Access, CounterSample, CounterValue, MemoryCounter, MemoryCounters};
pub use pcm::{MemoryModelPcm, PcmSpec};
pub use ssd::{MemoryModelSsd, SsdSpec};

/// Memory model variant: flash SSD or byte-addressable PCM.
#[derive(Debug, Clone, PartialEq)]
pub enum MemoryModel {
    Ssd(MemoryModelSsd),
    Pcm(MemoryModelPcm),
}

impl MemoryModel {
    pub fn read_bytes(&self, bytes: usize) -> f64 {
        match self {
            Self::Ssd(ssd) => ssd.read_bytes(bytes),
            Self::Pcm(pcm) => pcm.read_bytes(bytes),
        }
    }

    pub fn write_bytes(&mut self, bytes: usize) -> f64 {
        match self {
            Self::Ssd(ssd) => ssd.write_bytes(bytes),
            Self::Pcm(pcm) => pcm.write_bytes(bytes),
        }
    }

    pub fn overwrite_bytes(&mut self, bytes: usize) -> f64 {
        match self {
            Self::Ssd(ssd) => ssd.overwrite_bytes(bytes),
            Self::Pcm(pcm) => pcm.overwrite_bytes(bytes),
        }
    }

    pub fn model_name(&self) -> &str {
        match self {
            Self::Ssd(ssd) => ssd.model_name(),
            Self::Pcm(pcm) => pcm.model_name(),
        }
    }

    pub fn page_size(&self) -> usize {
        match self {
            Self::Ssd(ssd) => ssd.page_size(),
            Self::Pcm(pcm) => pcm.page_size(),
        }
    }

    /// Erase block size; 0 for byte-addressable media.
    pub fn block_size(&self) -> usize {
        match self {
            Self::Ssd(ssd) => ssd.block_size(),
            Self::Pcm(_) => 0,
        }
    }

    pub fn memory_wear_out(&self) -> u64 {
        match self {
            Self::Ssd(ssd) => ssd.memory_wear_out(),
            Self::Pcm(pcm) => pcm.memory_wear_out(),
        }
    }

    pub fn dirty_pages(&self) -> usize {
        match self {
            Self::Ssd(ssd) => ssd.dirty_pages(),
            Self::Pcm(_) => 0,
        }
    }

    pub fn is_byte_addressable(&self) -> bool {
        matches!(self, Self::Pcm(_))
    }

    pub fn as_ssd(&self) -> Option<&MemoryModelSsd> {
        match self {
            Self::Ssd(ssd) => Some(ssd),
            Self::Pcm(_) => None,
        }
    }

    pub fn as_pcm(&self) -> Option<&MemoryModelPcm> {
        match self {
            Self::Pcm(pcm) => Some(pcm),
            Self::Ssd(_) => None,
        }
    }
}

impl From<MemoryModelSsd> for MemoryModel {
    fn from(ssd: MemoryModelSsd) -> Self {
        MemoryModel::Ssd(ssd)
    }
}

impl From<MemoryModelPcm> for MemoryModel {
    fn from(pcm: MemoryModelPcm) -> Self {
        MemoryModel::Pcm(pcm)
    }
}
