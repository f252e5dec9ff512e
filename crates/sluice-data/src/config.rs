// Cache construction options and the process-wide debug switch

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use crate::loader::{LoadMode, LoadOptions};
use crate::sample::Value;

/// Environment variable read once to initialise debug mode.
pub const DEBUG_ENV: &str = "SLUICE_DEBUG";

static DEBUG_MODE: OnceLock<AtomicBool> = OnceLock::new();

fn debug_flag() -> &'static AtomicBool {
    DEBUG_MODE.get_or_init(|| {
        let on = std::env::var(DEBUG_ENV)
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        AtomicBool::new(on)
    })
}

/// Whether debug mode is active. Debug mode forces sequential loading.
pub fn debug_mode() -> bool {
    debug_flag().load(Ordering::Relaxed)
}

/// Switch debug mode on or off for the whole process.
pub fn set_debug_mode(on: bool) {
    debug_flag().store(on, Ordering::Relaxed);
}

/// Options for building a [`CacheDataset`](crate::CacheDataset).
#[derive(Debug, Clone, Default)]
pub struct CacheConfig {
    /// How loaded units are merged.
    pub mode: LoadMode,
    /// Parallel workers: `None` uses every logical core, `Some(0)` loads on
    /// the calling thread.
    pub num_workers: Option<usize>,
    /// Report progress while loading. Only honoured when loading sequentially.
    pub verbose: bool,
    /// Force sequential loading for this dataset only.
    pub debug: bool,
    /// Keyword options handed to every loader call.
    pub options: LoadOptions,
}

impl CacheConfig {
    pub fn mode(mut self, mode: LoadMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn num_workers(mut self, n: usize) -> Self {
        self.num_workers = Some(n);
        self
    }

    pub fn verbose(mut self, v: bool) -> Self {
        self.verbose = v;
        self
    }

    pub fn debug(mut self, d: bool) -> Self {
        self.debug = d;
        self
    }

    pub fn options(mut self, options: LoadOptions) -> Self {
        self.options = options;
        self
    }

    /// Add a single loader keyword option.
    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options = self.options.with(key, value);
        self
    }

    /// Settle worker count and verbosity, warning about every adjustment.
    pub(crate) fn plan(&self) -> LoadPlan {
        let parallel = self.num_workers.map_or(true, |n| n > 0);
        if parallel && (self.debug || debug_mode()) {
            tracing::warn!("debug mode has been activated, falling back to num_workers = 0");
            return LoadPlan::Sequential {
                verbose: self.verbose,
            };
        }
        if !parallel {
            return LoadPlan::Sequential {
                verbose: self.verbose,
            };
        }
        if self.verbose {
            tracing::warn!("verbosity is mutually exclusive with num_workers > 0, disabling it");
        }
        LoadPlan::Parallel {
            num_workers: self.num_workers,
        }
    }
}

/// Resolved loading strategy for one cache build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoadPlan {
    Sequential { verbose: bool },
    Parallel { num_workers: Option<usize> },
}
