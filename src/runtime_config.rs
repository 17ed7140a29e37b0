//! # Runtime Configuration Module
//!
//! Environment-variable configuration for runtime behaviour.
//!
//! ## Environment Variables
//!
//! ### `SWB_STACK_SIZE`
//!
//! Stack size for spawned producer coroutines, in decimal (`16384`) or hex
//! (`0x4000`) bytes. Default: `0x4000` (16 KB). Tune upward for producers
//! with deep call chains; total memory is stack size times concurrent
//! coroutines.
//!
//! ### `SWB_DEV`
//!
//! Set to `1` or `true` to enable development diagnostics: 500 responses
//! for undeclared failures then carry a captured stack in their structured
//! body. Leave unset in production.

use std::env;

const DEFAULT_STACK_SIZE: usize = 0x4000;

/// Runtime configuration loaded once at startup.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeConfig {
    /// Stack size in bytes for producer coroutines
    pub stack_size: usize,
    /// Whether diagnostic detail is exposed in 500 bodies
    pub dev: bool,
}

impl RuntimeConfig {
    /// Load configuration from `SWB_STACK_SIZE` and `SWB_DEV`.
    #[must_use]
    pub fn from_env() -> Self {
        let stack_size = env::var("SWB_STACK_SIZE")
            .ok()
            .and_then(|val| {
                if let Some(hex) = val.strip_prefix("0x") {
                    usize::from_str_radix(hex, 16).ok()
                } else {
                    val.parse().ok()
                }
            })
            .unwrap_or(DEFAULT_STACK_SIZE);

        let dev = env::var("SWB_DEV")
            .map(|val| val == "1" || val.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        RuntimeConfig { stack_size, dev }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            stack_size: DEFAULT_STACK_SIZE,
            dev: false,
        }
    }
}
