// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Kernel configuration loaded from environment variables.

use serde::Deserialize;

use crate::geometry::Tolerance;

const DEFAULT_DIST: f64 = 0.005;
const DEFAULT_PERP: f64 = 1e-6;

fn default_dist() -> f64 {
    DEFAULT_DIST
}

fn default_perp() -> f64 {
    DEFAULT_PERP
}

/// Kernel configuration.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct KernelConfig {
    /// Distance below which two points are the same point.
    #[serde(default = "default_dist")]
    pub tol_dist: f64,
    /// Cosine below which two directions are perpendicular.
    #[serde(default = "default_perp")]
    pub tol_perp: f64,
}

impl KernelConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads `NMG_TOL_DIST` and `NMG_TOL_PERP`; unset or unparsable values
    /// fall back to the defaults.
    pub fn from_env() -> Self {
        Self {
            tol_dist: std::env::var("NMG_TOL_DIST")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|d: &f64| *d > 0.0)
                .unwrap_or(DEFAULT_DIST),
            tol_perp: std::env::var("NMG_TOL_PERP")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|p: &f64| (0.0..1.0).contains(p))
                .unwrap_or(DEFAULT_PERP),
        }
    }

    /// The tolerance every geometric predicate should use.
    pub fn tolerance(&self) -> Tolerance {
        Tolerance::new(self.tol_dist, self.tol_perp)
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            tol_dist: DEFAULT_DIST,
            tol_perp: DEFAULT_PERP,
        }
    }
}
