//! SSD vs PCM adaptive merging 비교 예제
//!
//! 실행: cargo run --example compare_devices
//! 설정 파일 사용: cargo run --example compare_devices -- sim.json
//! 로그 출력: NVMSIM_LOG=nvmsim::am=debug cargo run --example compare_devices --features logging

use nvmsim_core::{
    AdaptiveMergingVariant, DbIndex, IndexCounter, LamConfig, MemoryConfig, PcmSpec, SimResult,
    SimulationConfig,
};

fn base_config() -> SimResult<SimulationConfig> {
    let mut config = match std::env::args().nth(1) {
        Some(path) => SimulationConfig::load_from_file(path)?,
        None => SimulationConfig::default(),
    };
    config.apply_env_overrides()?;
    if config.lazy.is_none() {
        config.lazy = Some(LamConfig::new(4, 2, 0.5)?);
    }
    Ok(config)
}

fn main() -> SimResult<()> {
    nvmsim_core::logging::init();

    let ssd = base_config()?;
    let mut pcm = ssd.clone();
    pcm.memory = MemoryConfig::Pcm(PcmSpec::default());

    let runs = [
        (&ssd, AdaptiveMergingVariant::Eager),
        (&ssd, AdaptiveMergingVariant::Lazy),
        (&pcm, AdaptiveMergingVariant::Pcm),
    ];

    println!("=== nvmsim: {} cold entries ===\n", ssd.starting_entries);
    for (config, variant) in runs {
        let mut am = config.build_adaptive_merging(variant)?;

        let mut time = 0.0;
        for _ in 0..10 {
            time += am.find_range_entries_selectivity(0.001, 1)?;
            time += am.find_point_entries(100, 3)?;
            time += am.insert_entries(50)?;
        }

        println!("{} on {}", am.name(), am.disk().low_level_controller().model_name());
        println!("  total time        : {:.6} s", time);
        println!(
            "  invalidation time : {:.6} s",
            am.counters().time(IndexCounter::AmInvalidationTotalTime)
        );
        println!(
            "  loading time      : {:.6} s",
            am.counters().time(IndexCounter::AmLoadingTotalTime)
        );
        println!("  hot entries       : {}", am.wrapped().num_entries());
        println!("  wear-out          : {} bytes", am.disk().memory_wear_out());
        if let Some(passes) = am.number_of_reorganizations() {
            println!("  reorganizations   : {}", passes);
        }
        println!();
    }

    Ok(())
}
