// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Walker configuration loaded from environment variables.

use serde::Deserialize;

fn default_workers() -> usize {
    num_cpus::get()
}

/// Walker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WalkConfig {
    /// Number of workers claiming regions.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Evaluate member lists strictly left to right instead of grouping
    /// the terms between unions first.
    #[serde(default)]
    pub pure_boolean: bool,
}

impl WalkConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads `NMG_WALK_WORKERS` (default: number of CPUs) and
    /// `NMG_PURE_BOOLEAN` (`1` or `true` to enable).
    pub fn from_env() -> Self {
        Self {
            workers: std::env::var("NMG_WALK_WORKERS")
                .unwrap_or_else(|_| num_cpus::get().to_string())
                .parse()
                .unwrap_or_else(|_| num_cpus::get())
                .max(1),
            pure_boolean: std::env::var("NMG_PURE_BOOLEAN")
                .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
                .unwrap_or(false),
        }
    }

    /// A configuration with a fixed worker count and GIFT grouping.
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            pure_boolean: false,
        }
    }
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self::with_workers(num_cpus::get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_count_is_at_least_one() {
        assert_eq!(WalkConfig::with_workers(0).workers, 1);
    }

    #[test]
    fn deserializes_with_defaults() {
        let cfg: WalkConfig = serde_json::from_str(r#"{ "pure_boolean": true }"#).unwrap();
        assert!(cfg.pure_boolean);
        assert_eq!(cfg.workers, num_cpus::get());
    }
}
