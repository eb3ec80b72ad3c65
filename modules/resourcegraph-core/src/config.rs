//! Plain configuration structs for cache and per-adapter defaults.
//!
//! Unlike the teacher's `AppConfig::from_env`, these are never populated
//! from the environment or a config file -- configuration loading is out of
//! scope here (spec.md §1, Non-goals). They exist so a discovery runtime
//! embedding this crate has somewhere typed to hold its knobs before handing
//! them to a kernel shape's builder methods.

use std::time::Duration;

use crate::adapter::DEFAULT_WEIGHT;
use crate::kernel::always_get::DEFAULT_MAX_PARALLEL;
use crate::kernel::common::DEFAULT_CACHE_DURATION;

/// Cache-wide defaults every kernel shape falls back to unless an adapter
/// overrides them via its own `with_cache_duration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub default_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_CACHE_DURATION,
        }
    }
}

/// Per-adapter defaults a discovery runtime applies when constructing a
/// kernel shape, before any adapter-specific `with_weight`/`with_max_parallel`
/// override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterConfig {
    pub weight: i32,
    pub max_parallel: usize,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            weight: DEFAULT_WEIGHT,
            max_parallel: DEFAULT_MAX_PARALLEL,
        }
    }
}
