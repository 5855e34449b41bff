//! # nvmsim — Cost Simulator for Adaptive Merging on Non-Volatile Memory
//!
//! nvmsim는 인덱스 연산이 flash SSD 또는 PCM 위에서 *얼마나 걸릴지*를 계산하는
//! 분석적 비용 시뮬레이터입니다. 실제 I/O는 수행하지 않습니다.
//!
//! ## 주요 특징
//!
//! - **Adaptive Merging**: eager, lazy (LEB reorganization), PCM 세 가지 데코레이터
//! - **Memory models**: SSD page/block 모델 (wear-out, erase amortization), PCM 모델
//! - **Counters**: 장치별 / 인덱스별 누적 카운터와 파생 집계
//!
//! ## 빠른 시작
//!
//! ```rust
//! use nvmsim_core::{AdaptiveMerging, AmParams, BTree, DbIndex, Disk, IndexCounter, SsdSpec};
//!
//! # fn main() -> nvmsim_core::SimResult<()> {
//! let spec = SsdSpec::default();
//! let tree = BTree::new(Disk::ssd(spec.clone())?, 8, 64, 4096)?;
//!
//! // 100k cold entries in partitions of one erase block
//! let mut am = AdaptiveMerging::new(Box::new(tree), AmParams::new(spec.block_size, 100_000))?;
//!
//! let time = am.find_point_entries(1, 1)?;
//! assert!(time > 0.0);
//! assert_eq!(am.wrapped().num_entries(), 1);
//! assert_eq!(am.counter(IndexCounter::AmLoadingTotalOperations).1.as_u64(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## 아키텍처
//!
//! ```text
//! AdaptiveMerging ──▶ wrapped DbIndex (BTree) ──▶ Disk ──▶ MemoryModel (Ssd | Pcm)
//!        │                                         ▲
//!        └──▶ PartitionManager (Am | Lam) ─────────┘
//! ```
//!
//! ## 모듈 구조
//!
//! - [`memory`]: device cost models and [`MemoryCounters`]
//! - [`storage`]: [`Disk`], partitions and partition managers
//! - [`index`]: the [`DbIndex`] contract, [`BTree`], [`AdaptiveMerging`]
//! - [`config`]: [`SimulationConfig`] (JSON + env)
//! - [`logging`]: tracing subscriber setup

pub mod config;
pub mod error;
pub mod index;
pub mod memory;
pub mod storage;

// Logging utilities
pub mod logging;

// Re-export commonly used types
pub use config::{MemoryConfig, SimulationConfig};
pub use error::{SimError, SimResult};
pub use index::{
    AdaptiveMerging, AdaptiveMergingVariant, AmParams, BTree, DbIndex, IndexCounter,
    IndexCounters, IndexOp,
};
pub use memory::{
    CounterValue, MemoryCounter, MemoryCounters, MemoryModel, MemoryModelPcm, MemoryModelSsd,
    PcmSpec, SsdSpec,
};
pub use storage::{Disk, Invalidation, LamConfig, PartitionManager};
