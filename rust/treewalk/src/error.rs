// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for tree walking.

/// Result type alias for tree walking.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while walking a boolean tree.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No object of this name exists in the database.
    #[error("object not found: {0}")]
    NotFound(String),

    /// A record did not have the shape its use requires.
    #[error("defective record at '{path}': {reason}")]
    DefectiveRecord { path: String, reason: &'static str },

    /// A path element is not a member of the combination before it.
    #[error("unable to find '{comb}/{member}'")]
    MemberNotFound { comb: String, member: String },

    /// A path continued past a solid.
    #[error("found leaf early at '{0}'")]
    LeafBeforeEndOfPath(String),

    /// A combination along a path has no members.
    #[error("combination '{0}' has no members")]
    EmptyCombination(String),

    /// None of the requested paths produced a tree.
    #[error("nothing to walk")]
    NothingToWalk,

    /// Descent was asked to start from an empty path.
    #[error("null path")]
    NullPath,

    /// A region started while another was still open on the same branch.
    #[error("region already open at '{0}'")]
    RegionAlreadyOpen(String),

    /// A solid's accumulated matrix skews its axes.
    #[error("matrix at '{path}' does not preserve axis perpendicularity (X.Y={xy}, Y.Z={yz}, X.Z={xz})")]
    NonPerpendicularMatrix { path: String, xy: f64, yz: f64, xz: f64 },

    /// The leaf handler declined a solid.
    #[error("leaf handler failed on '{0}'")]
    LeafFailed(String),

    /// The worker pool could not be built.
    #[error("thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// A database document could not be parsed.
    #[error("database document: {0}")]
    Json(#[from] serde_json::Error),
}
