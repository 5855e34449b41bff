//! Logging setup for nvmsim
//!
//! Library code only emits events, under two targets:
//!
//! | Target | Level | Events |
//! |--------|-------|--------|
//! | [`TARGET_AM`] | info / debug | index creation, partition touches, LEB reorganizations |
//! | [`TARGET_DISK`] | trace | every device call |
//!
//! The subscribers installed here keep other crates at `warn` and filter the
//! simulator's targets at the requested level. `NVMSIM_LOG` takes precedence
//! over `RUST_LOG`; both replace the defaults entirely.

#[cfg(feature = "logging")]
use tracing_subscriber::{EnvFilter, fmt};

/// Adaptive-merging decisions.
pub const TARGET_AM: &str = "nvmsim::am";
/// Per-call device cost.
pub const TARGET_DISK: &str = "nvmsim::disk";

/// Environment variable read before `RUST_LOG`.
pub const LOG_ENV: &str = "NVMSIM_LOG";

/// Filter directives: `warn` globally, `level` for the simulator targets.
pub fn default_directives(level: &str) -> String {
    format!("warn,{TARGET_AM}={level},{TARGET_DISK}={level}")
}

#[cfg(feature = "logging")]
fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)))
}

/// Initialize logging at `info`: one line per index built.
///
/// ```rust
/// nvmsim_core::logging::init();
/// ```
#[cfg(feature = "logging")]
pub fn init() {
    init_with_level("info")
}

/// Initialize logging with the simulator targets at `level`.
///
/// `debug` adds touches and reorganizations, `trace` every disk call.
#[cfg(feature = "logging")]
pub fn init_with_level(level: &str) {
    let _ = fmt()
        .with_env_filter(env_filter(level))
        .with_target(true)
        .with_line_number(true)
        .try_init();
}

/// Touches and reorganizations, captured per test. Disk calls stay off.
#[cfg(feature = "logging")]
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new(default_directives("debug")))
        .with_target(true)
        .with_test_writer()
        .try_init();
}

// Stub implementations when logging feature is disabled
#[cfg(not(feature = "logging"))]
pub fn init() {}

#[cfg(not(feature = "logging"))]
pub fn init_with_level(_level: &str) {}

#[cfg(not(feature = "logging"))]
pub fn init_test() {}
