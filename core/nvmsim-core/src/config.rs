//! Simulation configuration.
//!
//! JSON file → env overrides → validate → build. Every field has a default,
//! so a config file only lists what it changes:
//!
//! ```json
//! {
//!   "starting_entries": 100000,
//!   "memory": { "type": "pcm", "read_time": 3e-7 },
//!   "lazy": {
//!     "reorganization_max_blocks": 4,
//!     "reorganization_blocks_threshold": 2,
//!     "leb_usage_threshold": 0.5
//!   }
//! }
//! ```

use crate::error::{SimError, SimResult};
use crate::index::{AdaptiveMerging, AdaptiveMergingVariant, AmParams, BTree, DbIndex};
use crate::memory::{MemoryModel, MemoryModelPcm, MemoryModelSsd, PcmSpec, SsdSpec};
use crate::storage::{Disk, LamConfig};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// 장치 모델 선택
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MemoryConfig {
    Ssd(SsdSpec),
    Pcm(PcmSpec),
}

impl Default for MemoryConfig {
    fn default() -> Self {
        MemoryConfig::Ssd(SsdSpec::default())
    }
}

impl MemoryConfig {
    pub fn validate(&self) -> SimResult<()> {
        match self {
            MemoryConfig::Ssd(spec) => spec.validate(),
            MemoryConfig::Pcm(spec) => spec.validate(),
        }
    }

    pub fn build(&self) -> SimResult<MemoryModel> {
        Ok(match self {
            MemoryConfig::Ssd(spec) => MemoryModel::Ssd(MemoryModelSsd::new(spec.clone())?),
            MemoryConfig::Pcm(spec) => MemoryModel::Pcm(MemoryModelPcm::new(spec.clone())?),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub key_size: usize,
    pub data_size: usize,
    /// Node size of the reference B+Tree
    pub node_size: usize,
    /// Partition size in bytes; 0 = one erase block (one page for PCM)
    pub partition_size: usize,
    pub starting_entries: usize,
    pub memory: MemoryConfig,
    /// Required by the lazy variant only
    pub lazy: Option<LamConfig>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            key_size: 8,
            data_size: 64,
            node_size: 4096,
            partition_size: 0,
            starting_entries: 1_000_000,
            memory: MemoryConfig::default(),
            lazy: None,
        }
    }
}

impl SimulationConfig {
    pub const ENV_KEY_SIZE: &'static str = "NVMSIM_KEY_SIZE";
    pub const ENV_DATA_SIZE: &'static str = "NVMSIM_DATA_SIZE";
    pub const ENV_NODE_SIZE: &'static str = "NVMSIM_NODE_SIZE";
    pub const ENV_PARTITION_SIZE: &'static str = "NVMSIM_PARTITION_SIZE";
    pub const ENV_STARTING_ENTRIES: &'static str = "NVMSIM_STARTING_ENTRIES";

    pub fn from_json_str(json: &str) -> SimResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// 파일에서 로드
    pub fn load_from_file(path: impl AsRef<Path>) -> SimResult<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// 파일에 저장
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> SimResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, json)?;
        Ok(())
    }

    /// 환경 변수에서 덮어쓰기
    pub fn apply_env_overrides(&mut self) -> SimResult<()> {
        self.apply_overrides(|name| env::var(name).ok())
    }

    /// Same as [`apply_env_overrides`](Self::apply_env_overrides) over an
    /// arbitrary variable source.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> SimResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let fields: [(&str, &mut usize); 5] = [
            (Self::ENV_KEY_SIZE, &mut self.key_size),
            (Self::ENV_DATA_SIZE, &mut self.data_size),
            (Self::ENV_NODE_SIZE, &mut self.node_size),
            (Self::ENV_PARTITION_SIZE, &mut self.partition_size),
            (Self::ENV_STARTING_ENTRIES, &mut self.starting_entries),
        ];
        for (name, field) in fields {
            if let Some(value) = lookup(name) {
                *field = parse_var(name, &value)?;
            }
        }
        Ok(())
    }

    pub fn record_size(&self) -> usize {
        self.key_size + self.data_size
    }

    /// Partition size with the 0 default resolved against the device.
    pub fn effective_partition_size(&self) -> usize {
        if self.partition_size != 0 {
            return self.partition_size;
        }
        match &self.memory {
            MemoryConfig::Ssd(spec) => spec.block_size,
            // a page may be narrower than one record
            MemoryConfig::Pcm(spec) => spec.page_size.max(self.record_size()),
        }
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.record_size() == 0 {
            return Err(SimError::InvalidConfig(
                "key_size + data_size must be > 0".to_string(),
            ));
        }
        if self.node_size < self.record_size() {
            return Err(SimError::InvalidConfig(format!(
                "node size {} is smaller than one record ({} bytes)",
                self.node_size,
                self.record_size()
            )));
        }
        if self.effective_partition_size() < self.record_size() {
            return Err(SimError::InvalidConfig(format!(
                "partition size {} is smaller than one record ({} bytes)",
                self.effective_partition_size(),
                self.record_size()
            )));
        }
        self.memory.validate()?;
        if let Some(lazy) = &self.lazy {
            lazy.validate()?;
        }
        Ok(())
    }

    pub fn build_disk(&self) -> SimResult<Disk> {
        Ok(Disk::new(self.memory.build()?))
    }

    pub fn build_btree(&self) -> SimResult<BTree> {
        self.validate()?;
        BTree::new(self.build_disk()?, self.key_size, self.data_size, self.node_size)
    }

    /// Builds the requested decorator over an empty reference B+Tree.
    pub fn build_adaptive_merging(
        &self,
        variant: AdaptiveMergingVariant,
    ) -> SimResult<AdaptiveMerging> {
        let index: Box<dyn DbIndex> = Box::new(self.build_btree()?);
        let params = AmParams::new(self.effective_partition_size(), self.starting_entries);
        match variant {
            AdaptiveMergingVariant::Eager => AdaptiveMerging::new(index, params),
            AdaptiveMergingVariant::Pcm => AdaptiveMerging::pcm(index, params),
            AdaptiveMergingVariant::Lazy => {
                let lazy = self.lazy.clone().ok_or_else(|| {
                    SimError::InvalidConfig(
                        "LazyAdaptiveMerging requires a `lazy` section".to_string(),
                    )
                })?;
                AdaptiveMerging::lazy(index, params, lazy)
            }
        }
    }
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> SimResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| SimError::InvalidConfig(format!("{}={:?} is not a valid number", name, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_validate() {
        let config = SimulationConfig::default();
        config.validate().unwrap();
        assert_eq!(config.effective_partition_size(), SsdSpec::default().block_size);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = SimulationConfig::from_json_str(
            r#"{ "starting_entries": 500, "memory": { "type": "pcm", "read_time": 1e-7 } }"#,
        )
        .unwrap();
        assert_eq!(config.starting_entries, 500);
        assert_eq!(config.key_size, 8);
        match &config.memory {
            MemoryConfig::Pcm(spec) => {
                assert_eq!(spec.read_time, 1e-7);
                assert_eq!(spec.write_time, PcmSpec::default().write_time);
            }
            other => panic!("expected PCM, got {:?}", other),
        }
        // one PCM page is narrower than a 72-byte record
        assert_eq!(config.effective_partition_size(), 72);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sim").join("config.json");

        let mut config = SimulationConfig::default();
        config.lazy = Some(LamConfig::new(4, 2, 0.5).unwrap());
        config.save_to_file(&path).unwrap();

        let loaded = SimulationConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SimulationConfig::load_from_file(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, SimError::Io { .. }));
    }

    #[test]
    fn test_malformed_json_is_serialization_error() {
        let err = SimulationConfig::from_json_str("{ key_size: ").unwrap_err();
        assert!(matches!(err, SimError::Serialization(_)));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            (SimulationConfig::ENV_KEY_SIZE, "16"),
            (SimulationConfig::ENV_STARTING_ENTRIES, " 42 "),
        ]
        .into_iter()
        .collect();

        let mut config = SimulationConfig::default();
        config
            .apply_overrides(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.key_size, 16);
        assert_eq!(config.starting_entries, 42);
        assert_eq!(config.data_size, 64);
    }

    #[test]
    fn test_unparsable_override_rejected() {
        let mut config = SimulationConfig::default();
        let err = config
            .apply_overrides(|name| {
                (name == SimulationConfig::ENV_NODE_SIZE).then(|| "big".to_string())
            })
            .unwrap_err();
        assert!(matches!(err, SimError::InvalidConfig(_)));
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let mut config = SimulationConfig::default();
        config.partition_size = 10;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.node_size = 32;
        assert!(config.build_btree().is_err());

        let mut config = SimulationConfig::default();
        config.memory = MemoryConfig::Ssd(SsdSpec {
            block_size: 1000,
            ..SsdSpec::default()
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_build_variants() {
        let mut config = SimulationConfig::default();
        config.starting_entries = 10_000;

        let am = config.build_adaptive_merging(AdaptiveMergingVariant::Eager).unwrap();
        assert_eq!(am.num_entries(), 10_000);

        assert!(config.build_adaptive_merging(AdaptiveMergingVariant::Lazy).is_err());
        assert!(config.build_adaptive_merging(AdaptiveMergingVariant::Pcm).is_err());

        config.lazy = Some(LamConfig::new(2, 2, 0.5).unwrap());
        let lazy = config.build_adaptive_merging(AdaptiveMergingVariant::Lazy).unwrap();
        assert_eq!(lazy.number_of_reorganizations(), Some(0));

        config.memory = MemoryConfig::Pcm(PcmSpec::default());
        let pcm = config.build_adaptive_merging(AdaptiveMergingVariant::Pcm).unwrap();
        assert_eq!(pcm.name(), "PCMAdaptiveMerging");
    }
}
