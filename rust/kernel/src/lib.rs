// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # NMG Kernel
//!
//! Non-manifold geometry (NMG) boundary representation using the radial-edge
//! structure.
//!
//! A [`Model`] nests regions, shells, faces, loops, edges and vertices. Faces,
//! loops and edges are reached through *uses*: each face has two faceuses (its
//! two sides), each loop and edge one use per side it bounds, and every use is
//! paired with a mate. The uses of an edge are linked in a radial ring sorted
//! by angle around the edge, so any number of faces can meet at one edge.
//!
//! On top of the structure the crate provides the repair algorithms used to
//! turn raw polygon soups into solids:
//!
//! - [`Model::close_shell`] fills holes bounded by free edges
//! - [`Model::decompose_shell`] splits a shell into connected pieces
//! - [`Model::fix_normals`] makes face orientations agree
//! - [`Model::simplify_shell`] and [`Model::shell_coplanar_face_merge`]
//!   tidy up cracks, empty loops and coplanar neighbours
//! - [`Model::in_vert`] and [`Model::move_edge_thru_pt`] put vertices back
//!   where their faces meet after a plane moves
//!
//! Elements are stored in slot maps, so killing an element never invalidates
//! the keys of the others and a stale key is caught on lookup.
//!
//! ## Example
//!
//! ```
//! use nalgebra::Point3;
//! use nmg_kernel::{Model, Tolerance};
//!
//! let mut m = Model::new();
//! let (_r, s) = m.mrsv();
//! let a = m.add_vertex(Point3::new(0.0, 0.0, 0.0));
//! let b = m.add_vertex(Point3::new(1.0, 0.0, 0.0));
//! let c = m.add_vertex(Point3::new(0.0, 1.0, 0.0));
//! let d = m.add_vertex(Point3::new(0.0, 0.0, 1.0));
//! let faces = [
//!     m.cface(s, &[a, b, d]).unwrap(),
//!     m.cface(s, &[b, c, d]).unwrap(),
//!     m.cface(s, &[c, a, d]).unwrap(),
//! ];
//! m.glue_faces(&faces).unwrap();
//!
//! let outcome = m.close_shell(s, &Tolerance::default()).unwrap();
//! assert!(outcome.is_closed());
//! assert!(m.shell_is_closed_manifold(s));
//! ```

pub mod arena;
pub mod close;
pub mod config;
pub mod construction;
pub mod decompose;
pub mod dup;
pub mod error;
pub mod geometry;
pub mod keys;
pub mod kill;
pub mod mutators;
pub mod normals;
pub mod ptbl;
pub mod radial;
pub mod rebound;
pub mod simplify;
pub mod tessellate;
pub mod transform;
pub mod traversal;
pub mod validate;
pub mod vertex_solve;
pub mod visited;

pub use arena::{
    EdgeData, EdgeUseData, EdgeUseParent, FaceData, FaceUseData, LoopData, LoopUseData,
    LoopUseDown, LoopUseParent, Model, Orientation, RegionData, ShellData, VertexData,
    VertexUseData, VertexUseParent,
};
pub use close::CloseOutcome;
pub use config::KernelConfig;
pub use dup::TranslationTable;
pub use error::{Error, Result};
pub use geometry::{Aabb, Coplanarity, Plane, Tolerance};
pub use keys::{
    EdgeKey, EdgeUseKey, FaceKey, FaceUseKey, LoopKey, LoopUseKey, RegionKey, ShellKey,
    TopologyKey, TopologyType, VertexKey, VertexUseKey,
};
pub use kill::Cascade;
pub use ptbl::{Inserted, PointerTable};
pub use rebound::ShellCounts;
pub use tessellate::Mesh;
pub use validate::Defect;
pub use vertex_solve::VertexFaces;
pub use visited::VisitedSet;
