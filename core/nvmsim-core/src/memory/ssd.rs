//! Flash SSD cost model.
//!
//! Page-granular reads and writes with a random/sequential split, wear-out
//! accounting and erase-cycle amortization for overwrites.

use crate::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};

/// Device parameters of an SSD. Times are seconds per page (erase: per block).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SsdSpec {
    pub name: String,
    pub page_size: usize,
    pub block_size: usize,
    pub read_random_time: f64,
    pub write_random_time: f64,
    pub read_seq_time: f64,
    pub write_seq_time: f64,
    pub erase_time: f64,
    /// Accesses spanning more pages than this are sequential
    pub seq_op_threshold: usize,
}

impl Default for SsdSpec {
    fn default() -> Self {
        Self {
            name: "SSD:Generic-MLC".to_string(),
            page_size: 4096,
            block_size: 256 * 1024,
            read_random_time: 0.000_025,
            write_random_time: 0.000_200,
            read_seq_time: 0.000_012,
            write_seq_time: 0.000_090,
            erase_time: 0.001_500,
            seq_op_threshold: 1,
        }
    }
}

impl SsdSpec {
    pub fn validate(&self) -> SimResult<()> {
        if self.page_size == 0 {
            return Err(SimError::InvalidConfig("SSD page size must be > 0".to_string()));
        }
        if self.block_size == 0 || self.block_size % self.page_size != 0 {
            return Err(SimError::InvalidConfig(format!(
                "SSD block size {} must be a non-zero multiple of page size {}",
                self.block_size, self.page_size
            )));
        }
        let times = [
            self.read_random_time,
            self.write_random_time,
            self.read_seq_time,
            self.write_seq_time,
            self.erase_time,
        ];
        if times.iter().any(|t| !t.is_finite() || *t < 0.0) {
            return Err(SimError::InvalidConfig(
                "SSD timings must be finite and non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryModelSsd {
    spec: SsdSpec,
    dirty_pages: usize,
    memory_wear_out: u64,
}

impl MemoryModelSsd {
    pub fn new(spec: SsdSpec) -> SimResult<Self> {
        spec.validate()?;
        Ok(Self {
            spec,
            dirty_pages: 0,
            memory_wear_out: 0,
        })
    }

    fn pages(&self, bytes: usize) -> usize {
        bytes.div_ceil(self.spec.page_size)
    }

    fn is_sequential(&self, pages: usize) -> bool {
        pages > self.spec.seq_op_threshold
    }

    pub fn pages_per_block(&self) -> usize {
        self.spec.block_size / self.spec.page_size
    }

    pub fn read_bytes(&self, bytes: usize) -> f64 {
        let pages = self.pages(bytes);
        let per_page = if self.is_sequential(pages) {
            self.spec.read_seq_time
        } else {
            self.spec.read_random_time
        };
        pages as f64 * per_page
    }

    pub fn write_bytes(&mut self, bytes: usize) -> f64 {
        let pages = self.pages(bytes);
        let per_page = if self.is_sequential(pages) {
            self.spec.write_seq_time
        } else {
            self.spec.write_random_time
        };
        self.memory_wear_out += (pages * self.spec.page_size) as u64;
        pages as f64 * per_page
    }

    /// Write plus erase amortization.
    ///
    /// Every full block of accumulated dirty pages costs one erase. A random
    /// write that triggers an erase also re-reads one page of valid data into
    /// the freshly erased block.
    pub fn overwrite_bytes(&mut self, bytes: usize) -> f64 {
        let pages = self.pages(bytes);
        let mut time = self.write_bytes(bytes);

        self.dirty_pages += pages;
        let pages_per_block = self.pages_per_block();
        if self.dirty_pages >= pages_per_block {
            let blocks = self.dirty_pages / pages_per_block;
            time += blocks as f64 * self.spec.erase_time;
            self.dirty_pages -= blocks * pages_per_block;

            if !self.is_sequential(pages) {
                time += self.spec.read_random_time;
            }
        }

        time
    }

    pub fn spec(&self) -> &SsdSpec {
        &self.spec
    }

    pub fn model_name(&self) -> &str {
        &self.spec.name
    }

    pub fn page_size(&self) -> usize {
        self.spec.page_size
    }

    pub fn block_size(&self) -> usize {
        self.spec.block_size
    }

    pub fn dirty_pages(&self) -> usize {
        self.dirty_pages
    }

    pub fn memory_wear_out(&self) -> u64 {
        self.memory_wear_out
    }

    pub fn read_random_time(&self) -> f64 {
        self.spec.read_random_time
    }

    pub fn write_random_time(&self) -> f64 {
        self.spec.write_random_time
    }

    pub fn read_seq_time(&self) -> f64 {
        self.spec.read_seq_time
    }

    pub fn write_seq_time(&self) -> f64 {
        self.spec.write_seq_time
    }

    pub fn erase_time(&self) -> f64 {
        self.spec.erase_time
    }

    pub fn seq_op_threshold(&self) -> usize {
        self.spec.seq_op_threshold
    }
}
