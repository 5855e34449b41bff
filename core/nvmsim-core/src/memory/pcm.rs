//! Phase-change memory cost model.
//!
//! Byte-addressable: every access costs one flat device latency regardless of
//! its size, and there is no erase-before-write, so overwrite == write.

use crate::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PcmSpec {
    pub name: String,
    /// Write unit used for wear accounting
    pub page_size: usize,
    pub read_time: f64,
    pub write_time: f64,
}

impl Default for PcmSpec {
    fn default() -> Self {
        Self {
            name: "PCM:Generic".to_string(),
            page_size: 64,
            read_time: 0.000_000_3,
            write_time: 0.000_001_5,
        }
    }
}

impl PcmSpec {
    pub fn validate(&self) -> SimResult<()> {
        if self.page_size == 0 {
            return Err(SimError::InvalidConfig("PCM page size must be > 0".to_string()));
        }
        if [self.read_time, self.write_time]
            .iter()
            .any(|t| !t.is_finite() || *t < 0.0)
        {
            return Err(SimError::InvalidConfig(
                "PCM timings must be finite and non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryModelPcm {
    spec: PcmSpec,
    memory_wear_out: u64,
}

impl MemoryModelPcm {
    pub fn new(spec: PcmSpec) -> SimResult<Self> {
        spec.validate()?;
        Ok(Self {
            spec,
            memory_wear_out: 0,
        })
    }

    pub fn read_bytes(&self, bytes: usize) -> f64 {
        if bytes == 0 { 0.0 } else { self.spec.read_time }
    }

    pub fn write_bytes(&mut self, bytes: usize) -> f64 {
        if bytes == 0 {
            return 0.0;
        }
        let units = bytes.div_ceil(self.spec.page_size);
        self.memory_wear_out += (units * self.spec.page_size) as u64;
        self.spec.write_time
    }

    pub fn overwrite_bytes(&mut self, bytes: usize) -> f64 {
        self.write_bytes(bytes)
    }

    pub fn spec(&self) -> &PcmSpec {
        &self.spec
    }

    pub fn model_name(&self) -> &str {
        &self.spec.name
    }

    pub fn page_size(&self) -> usize {
        self.spec.page_size
    }

    pub fn read_time(&self) -> f64 {
        self.spec.read_time
    }

    pub fn write_time(&self) -> f64 {
        self.spec.write_time
    }

    pub fn memory_wear_out(&self) -> u64 {
        self.memory_wear_out
    }
}
