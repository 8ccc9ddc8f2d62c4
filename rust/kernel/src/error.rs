// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for topology operations.

use crate::keys::*;

/// Result type alias for topology operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during topology operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A referenced topology element was not found in the model.
    #[error("topology element not found: {0:?}")]
    NotFound(TopologyKey),

    /// A loopuse's recorded parent is not the faceuse the caller claimed.
    #[error("loopuse {lu:?} is not a child of faceuse {claimed:?}")]
    ParentMismatch { lu: LoopUseKey, claimed: FaceUseKey },

    /// Two faceuses were expected to live in the same shell.
    #[error("faceuses {0:?} and {1:?} are in different shells")]
    DifferentShells(FaceUseKey, FaceUseKey),

    /// An operation that needs a face edgeuse was handed a wire edgeuse.
    #[error("edgeuse {0:?} is a wire edge, a face edge is required")]
    WireEdge(EdgeUseKey),

    /// An operation that needs an edge loop was handed a point loop.
    #[error("loopuse {0:?} is a single-vertex loop")]
    PointLoop(LoopUseKey),

    /// Two edges being joined do not share the same endpoints.
    #[error("edgeuses {0:?} and {1:?} do not span the same vertices")]
    EdgeVertexMismatch(EdgeUseKey, EdgeUseKey),

    /// A loop or point set does not define a plane.
    #[error("degenerate geometry: {0}")]
    Degenerate(&'static str),

    /// A direction that must be unit length was not.
    #[error("direction vector is not unit length (|d| = {0})")]
    NonUnitDirection(f64),

    /// A face needs at least three vertices.
    #[error("face needs at least 3 vertices, got {0}")]
    TooFewVertices(usize),

    /// An element that must not be the shell's last was.
    #[error("shell {0:?} has no faces")]
    EmptyShell(ShellKey),

    /// Ear clipping failed on a face.
    #[error("triangulation failed: {0}")]
    Triangulation(String),

    /// A transform matrix has no inverse.
    #[error("transform matrix is singular")]
    SingularTransform,

    /// Vertex key not found in the model.
    #[error("vertex not found: {0:?}")]
    VertexNotFound(VertexKey),

    /// Edgeuse key not found in the model.
    #[error("edgeuse not found: {0:?}")]
    EdgeUseNotFound(EdgeUseKey),

    /// Loopuse key not found in the model.
    #[error("loopuse not found: {0:?}")]
    LoopUseNotFound(LoopUseKey),

    /// Faceuse key not found in the model.
    #[error("faceuse not found: {0:?}")]
    FaceUseNotFound(FaceUseKey),

    /// Shell key not found in the model.
    #[error("shell not found: {0:?}")]
    ShellNotFound(ShellKey),

    /// Region key not found in the model.
    #[error("region not found: {0:?}")]
    RegionNotFound(RegionKey),
}
