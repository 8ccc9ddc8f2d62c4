// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Arena-based storage for the radial-edge boundary representation.
//!
//! The [`Model`] owns every topology element in slot maps with stable,
//! generational keys. The structure nests
//! region → shell → faceuse → loopuse → edgeuse → vertexuse → vertex, and each
//! "use" element is paired with a *mate* describing the other side of the same
//! face, loop or edge.
//!
//! ## Mate and radial links
//!
//! Every edgeuse has exactly one mate (the reverse-direction use of the same
//! edge on the other side of the face) and a radial link to the next edgeuse
//! around the edge axis. Radial links are an involution (`eu.radial.radial ==
//! eu`), and walking `eu -> eu.radial -> .mate -> .radial -> ...` visits every
//! use of the edge and returns to the start. An edge touched by a single face
//! is *free*: its radial is its own mate.
//!
//! Mate loopuses list the mates of their partner's edgeuses in reverse order,
//! so both sides of a face run counter-clockwise about their own normal.

use nalgebra::Point3;
use slotmap::SlotMap;

use crate::error::{Error, Result};
use crate::geometry::{Aabb, Plane};
use crate::keys::*;

/// Orientation of a use relative to its underlying element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// Faceuse: front side. Loopuse: outer boundary.
    Same,
    /// Faceuse: back side. Loopuse: inner boundary (hole).
    Opposite,
    /// Transient state used during boolean evaluation.
    Unspec,
    /// Transient state used during boolean evaluation.
    BoolPlace,
}

impl Orientation {
    /// Swaps `Same` and `Opposite`; transient states are unchanged.
    pub fn flipped(self) -> Self {
        match self {
            Orientation::Same => Orientation::Opposite,
            Orientation::Opposite => Orientation::Same,
            other => other,
        }
    }
}

/// A region: a set of shells.
#[derive(Debug, Clone, Default)]
pub struct RegionData {
    pub shells: Vec<ShellKey>,
    pub bbox: Option<Aabb>,
}

/// A shell: faces, wire loops, wire edges and at most one lone vertex.
///
/// Both uses of every face live in `faceuses`, and both uses of every wire
/// loop or wire edge live in the wire lists.
#[derive(Debug, Clone)]
pub struct ShellData {
    pub region: RegionKey,
    pub faceuses: Vec<FaceUseKey>,
    pub wire_loopuses: Vec<LoopUseKey>,
    pub wire_edgeuses: Vec<EdgeUseKey>,
    pub vertexuse: Option<VertexUseKey>,
    pub bbox: Option<Aabb>,
}

impl ShellData {
    /// Returns `true` if the shell has no faces, wires or lone vertex.
    pub fn is_empty(&self) -> bool {
        self.faceuses.is_empty()
            && self.wire_loopuses.is_empty()
            && self.wire_edgeuses.is_empty()
            && self.vertexuse.is_none()
    }
}

/// One side of a face.
#[derive(Debug, Clone)]
pub struct FaceUseData {
    pub shell: ShellKey,
    pub mate: FaceUseKey,
    pub face: FaceKey,
    pub orientation: Orientation,
    pub loopuses: Vec<LoopUseKey>,
}

/// A face: the plane shared by two mated faceuses.
///
/// The front (`OT_SAME`) side's normal is `plane.normal`, negated when `flip`
/// is set.
#[derive(Debug, Clone)]
pub struct FaceData {
    pub fu: FaceUseKey,
    pub plane: Option<Plane>,
    pub flip: bool,
    pub bbox: Option<Aabb>,
}

/// Owner of a loopuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopUseParent {
    Face(FaceUseKey),
    Shell(ShellKey),
}

/// Contents of a loopuse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopUseDown {
    /// A cycle of edgeuses, each starting where the previous one ends.
    Edges(Vec<EdgeUseKey>),
    /// A single-vertex ("point") loop.
    Vertex(VertexUseKey),
}

/// One use of a loop.
#[derive(Debug, Clone)]
pub struct LoopUseData {
    pub parent: LoopUseParent,
    pub mate: LoopUseKey,
    pub lp: LoopKey,
    pub orientation: Orientation,
    pub down: LoopUseDown,
}

/// A loop, shared by two mated loopuses.
#[derive(Debug, Clone)]
pub struct LoopData {
    pub lu: LoopUseKey,
    pub bbox: Option<Aabb>,
}

/// Owner of an edgeuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeUseParent {
    Loop(LoopUseKey),
    Shell(ShellKey),
}

/// One directed use of an edge.
#[derive(Debug, Clone)]
pub struct EdgeUseData {
    pub parent: EdgeUseParent,
    pub mate: EdgeUseKey,
    pub radial: EdgeUseKey,
    pub edge: EdgeKey,
    /// Use of the start vertex.
    pub vu: VertexUseKey,
}

/// An edge: the support of a radial ring of edgeuses.
#[derive(Debug, Clone)]
pub struct EdgeData {
    /// Any one use; the ring is reached from here.
    pub eu: EdgeUseKey,
}

/// Owner of a vertexuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexUseParent {
    EdgeUse(EdgeUseKey),
    LoopUse(LoopUseKey),
    Shell(ShellKey),
}

/// One use of a vertex.
#[derive(Debug, Clone)]
pub struct VertexUseData {
    pub parent: VertexUseParent,
    pub vertex: VertexKey,
}

/// A vertex: a point shared by all its uses.
#[derive(Debug, Clone)]
pub struct VertexData {
    pub coord: Point3<f64>,
    pub uses: Vec<VertexUseKey>,
}

/// The central arena that owns all topology elements.
///
/// # Example
///
/// ```
/// use nalgebra::Point3;
/// use nmg_kernel::Model;
///
/// let mut m = Model::new();
/// let (_r, s) = m.mrsv();
/// let fu = m
///     .cface_from_points(
///         s,
///         &[
///             Point3::new(0.0, 0.0, 0.0),
///             Point3::new(1.0, 0.0, 0.0),
///             Point3::new(0.0, 1.0, 0.0),
///         ],
///     )
///     .unwrap();
///
/// assert_eq!(m.face_count(), 1);
/// assert_eq!(m.faceuse_count(), 2);
/// assert_eq!(m.edge_count(), 3);
/// assert!(m.faceuse(fu).is_some());
/// ```
#[derive(Debug, Clone)]
pub struct Model {
    pub(crate) region_order: Vec<RegionKey>,
    pub(crate) regions: SlotMap<RegionKey, RegionData>,
    pub(crate) shells: SlotMap<ShellKey, ShellData>,
    pub(crate) faceuses: SlotMap<FaceUseKey, FaceUseData>,
    pub(crate) faces: SlotMap<FaceKey, FaceData>,
    pub(crate) loopuses: SlotMap<LoopUseKey, LoopUseData>,
    pub(crate) loops: SlotMap<LoopKey, LoopData>,
    pub(crate) edgeuses: SlotMap<EdgeUseKey, EdgeUseData>,
    pub(crate) edges: SlotMap<EdgeKey, EdgeData>,
    pub(crate) vertexuses: SlotMap<VertexUseKey, VertexUseData>,
    pub(crate) vertices: SlotMap<VertexKey, VertexData>,
}

impl Model {
    /// Creates a new, empty model.
    pub fn new() -> Self {
        Self {
            region_order: Vec::new(),
            regions: SlotMap::with_key(),
            shells: SlotMap::with_key(),
            faceuses: SlotMap::with_key(),
            faces: SlotMap::with_key(),
            loopuses: SlotMap::with_key(),
            loops: SlotMap::with_key(),
            edgeuses: SlotMap::with_key(),
            edges: SlotMap::with_key(),
            vertexuses: SlotMap::with_key(),
            vertices: SlotMap::with_key(),
        }
    }

    // --- Region operations ---

    /// Regions in creation order.
    pub fn regions(&self) -> &[RegionKey] {
        &self.region_order
    }

    /// Returns the region data for the given key, or `None` if not found.
    pub fn region(&self, key: RegionKey) -> Option<&RegionData> {
        self.regions.get(key)
    }

    // --- Shell operations ---

    /// Returns the shell data for the given key, or `None` if not found.
    pub fn shell(&self, key: ShellKey) -> Option<&ShellData> {
        self.shells.get(key)
    }

    /// Returns the number of shells in the model.
    pub fn shell_count(&self) -> usize {
        self.shells.len()
    }

    // --- Face operations ---

    /// Returns the faceuse data for the given key, or `None` if not found.
    pub fn faceuse(&self, key: FaceUseKey) -> Option<&FaceUseData> {
        self.faceuses.get(key)
    }

    /// Returns the face data for the given key, or `None` if not found.
    pub fn face(&self, key: FaceKey) -> Option<&FaceData> {
        self.faces.get(key)
    }

    /// Returns the number of faces in the model.
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Returns the number of faceuses in the model (twice the faces).
    pub fn faceuse_count(&self) -> usize {
        self.faceuses.len()
    }

    // --- Loop operations ---

    /// Returns the loopuse data for the given key, or `None` if not found.
    pub fn loopuse(&self, key: LoopUseKey) -> Option<&LoopUseData> {
        self.loopuses.get(key)
    }

    /// Returns the number of loops in the model.
    pub fn loop_count(&self) -> usize {
        self.loops.len()
    }

    // --- Edge operations ---

    /// Returns the edgeuse data for the given key, or `None` if not found.
    pub fn edgeuse(&self, key: EdgeUseKey) -> Option<&EdgeUseData> {
        self.edgeuses.get(key)
    }

    /// Returns the edge data for the given key, or `None` if not found.
    pub fn edge(&self, key: EdgeKey) -> Option<&EdgeData> {
        self.edges.get(key)
    }

    /// Returns the number of edges in the model.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns the number of edgeuses in the model.
    pub fn edgeuse_count(&self) -> usize {
        self.edgeuses.len()
    }

    // --- Vertex operations ---

    /// Adds a vertex at the given point. It has no uses until one is made.
    pub fn add_vertex(&mut self, coord: Point3<f64>) -> VertexKey {
        self.vertices.insert(VertexData {
            coord,
            uses: Vec::new(),
        })
    }

    /// Returns the vertex data for the given key, or `None` if not found.
    pub fn vertex(&self, key: VertexKey) -> Option<&VertexData> {
        self.vertices.get(key)
    }

    /// Returns the vertexuse data for the given key, or `None` if not found.
    pub fn vertexuse(&self, key: VertexUseKey) -> Option<&VertexUseData> {
        self.vertexuses.get(key)
    }

    /// Returns the number of vertices in the model.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Returns the position of a vertex.
    pub fn vertex_point(&self, key: VertexKey) -> Option<Point3<f64>> {
        self.vertices.get(key).map(|v| v.coord)
    }

    /// Moves a vertex; every use follows.
    pub fn set_vertex_point(&mut self, key: VertexKey, coord: Point3<f64>) -> Result<()> {
        let v = self
            .vertices
            .get_mut(key)
            .ok_or(Error::VertexNotFound(key))?;
        v.coord = coord;
        Ok(())
    }

    // --- Element existence checks ---

    /// Returns `true` if the given topology key references a live element.
    pub fn contains(&self, key: TopologyKey) -> bool {
        match key {
            TopologyKey::Region(k) => self.regions.contains_key(k),
            TopologyKey::Shell(k) => self.shells.contains_key(k),
            TopologyKey::FaceUse(k) => self.faceuses.contains_key(k),
            TopologyKey::Face(k) => self.faces.contains_key(k),
            TopologyKey::LoopUse(k) => self.loopuses.contains_key(k),
            TopologyKey::Loop(k) => self.loops.contains_key(k),
            TopologyKey::EdgeUse(k) => self.edgeuses.contains_key(k),
            TopologyKey::Edge(k) => self.edges.contains_key(k),
            TopologyKey::VertexUse(k) => self.vertexuses.contains_key(k),
            TopologyKey::Vertex(k) => self.vertices.contains_key(k),
        }
    }

    // --- Checked lookups used by the algorithms ---

    pub(crate) fn get_shell(&self, key: ShellKey) -> Result<&ShellData> {
        self.shells.get(key).ok_or(Error::ShellNotFound(key))
    }

    pub(crate) fn get_shell_mut(&mut self, key: ShellKey) -> Result<&mut ShellData> {
        self.shells.get_mut(key).ok_or(Error::ShellNotFound(key))
    }

    pub(crate) fn get_region_mut(&mut self, key: RegionKey) -> Result<&mut RegionData> {
        self.regions.get_mut(key).ok_or(Error::RegionNotFound(key))
    }

    pub(crate) fn get_fu(&self, key: FaceUseKey) -> Result<&FaceUseData> {
        self.faceuses.get(key).ok_or(Error::FaceUseNotFound(key))
    }

    pub(crate) fn get_fu_mut(&mut self, key: FaceUseKey) -> Result<&mut FaceUseData> {
        self.faceuses
            .get_mut(key)
            .ok_or(Error::FaceUseNotFound(key))
    }

    pub(crate) fn get_face(&self, key: FaceKey) -> Result<&FaceData> {
        self.faces.get(key).ok_or(Error::NotFound(key.into()))
    }

    pub(crate) fn get_face_mut(&mut self, key: FaceKey) -> Result<&mut FaceData> {
        self.faces.get_mut(key).ok_or(Error::NotFound(key.into()))
    }

    pub(crate) fn get_lu(&self, key: LoopUseKey) -> Result<&LoopUseData> {
        self.loopuses.get(key).ok_or(Error::LoopUseNotFound(key))
    }

    pub(crate) fn get_lu_mut(&mut self, key: LoopUseKey) -> Result<&mut LoopUseData> {
        self.loopuses
            .get_mut(key)
            .ok_or(Error::LoopUseNotFound(key))
    }

    pub(crate) fn get_eu(&self, key: EdgeUseKey) -> Result<&EdgeUseData> {
        self.edgeuses.get(key).ok_or(Error::EdgeUseNotFound(key))
    }

    pub(crate) fn get_eu_mut(&mut self, key: EdgeUseKey) -> Result<&mut EdgeUseData> {
        self.edgeuses
            .get_mut(key)
            .ok_or(Error::EdgeUseNotFound(key))
    }

    pub(crate) fn get_vu(&self, key: VertexUseKey) -> Result<&VertexUseData> {
        self.vertexuses.get(key).ok_or(Error::NotFound(key.into()))
    }

    pub(crate) fn get_point(&self, key: VertexKey) -> Result<Point3<f64>> {
        self.vertex_point(key).ok_or(Error::VertexNotFound(key))
    }

    // --- Low-level allocation helpers ---

    /// Makes a new use of `vertex` owned by `parent`.
    pub(crate) fn new_vertexuse(
        &mut self,
        vertex: VertexKey,
        parent: VertexUseParent,
    ) -> Result<VertexUseKey> {
        if !self.vertices.contains_key(vertex) {
            return Err(Error::VertexNotFound(vertex));
        }
        let vu = self.vertexuses.insert(VertexUseData { parent, vertex });
        if let Some(v) = self.vertices.get_mut(vertex) {
            v.uses.push(vu);
        }
        Ok(vu)
    }

    /// Removes a vertexuse, and its vertex once the last use is gone.
    pub(crate) fn free_vertexuse(&mut self, vu: VertexUseKey) {
        if let Some(data) = self.vertexuses.remove(vu) {
            let now_unused = match self.vertices.get_mut(data.vertex) {
                Some(v) => {
                    v.uses.retain(|&u| u != vu);
                    v.uses.is_empty()
                }
                None => false,
            };
            if now_unused {
                self.vertices.remove(data.vertex);
            }
        }
    }

    /// Re-points a vertexuse at a different vertex.
    pub(crate) fn move_vertexuse(&mut self, vu: VertexUseKey, to: VertexKey) -> Result<()> {
        if !self.vertices.contains_key(to) {
            return Err(Error::VertexNotFound(to));
        }
        let from = self.get_vu(vu)?.vertex;
        if from == to {
            return Ok(());
        }
        let now_unused = match self.vertices.get_mut(from) {
            Some(v) => {
                v.uses.retain(|&u| u != vu);
                v.uses.is_empty()
            }
            None => false,
        };
        if now_unused {
            self.vertices.remove(from);
        }
        if let Some(v) = self.vertices.get_mut(to) {
            v.uses.push(vu);
        }
        if let Some(data) = self.vertexuses.get_mut(vu) {
            data.vertex = to;
        }
        Ok(())
    }

    /// Makes a new edge from `v1` to `v2` with a free edgeuse/mate pair.
    ///
    /// Returns `(eu, mate)` where `eu` starts at `v1`. Parents must be fixed up
    /// by the caller when they are not known yet.
    pub(crate) fn new_edge_pair(
        &mut self,
        v1: VertexKey,
        v2: VertexKey,
        parent: EdgeUseParent,
        mate_parent: EdgeUseParent,
    ) -> Result<(EdgeUseKey, EdgeUseKey)> {
        let (eu, mate) = self.new_edgeuse_pair_on(None, v1, v2, parent, mate_parent)?;
        Ok((eu, mate))
    }

    /// Makes an edgeuse/mate pair on `edge` (or on a new edge when `None`).
    ///
    /// The pair is left radially free; callers that reuse an edge must rebuild
    /// its ring afterwards.
    pub(crate) fn new_edgeuse_pair_on(
        &mut self,
        edge: Option<EdgeKey>,
        v1: VertexKey,
        v2: VertexKey,
        parent: EdgeUseParent,
        mate_parent: EdgeUseParent,
    ) -> Result<(EdgeUseKey, EdgeUseKey)> {
        let placeholder_vu = self.new_vertexuse(v1, VertexUseParent::Shell(ShellKey::default()))?;
        let mate_vu = match self.new_vertexuse(v2, VertexUseParent::Shell(ShellKey::default())) {
            Ok(vu) => vu,
            Err(e) => {
                self.free_vertexuse(placeholder_vu);
                return Err(e);
            }
        };

        let edge = match edge {
            Some(e) => e,
            None => self.edges.insert(EdgeData {
                eu: EdgeUseKey::default(),
            }),
        };

        let eu = self.edgeuses.insert(EdgeUseData {
            parent,
            mate: EdgeUseKey::default(),
            radial: EdgeUseKey::default(),
            edge,
            vu: placeholder_vu,
        });
        let mate = self.edgeuses.insert(EdgeUseData {
            parent: mate_parent,
            mate: eu,
            radial: eu,
            edge,
            vu: mate_vu,
        });
        if let Some(d) = self.edgeuses.get_mut(eu) {
            d.mate = mate;
            d.radial = mate;
        }
        if let Some(d) = self.vertexuses.get_mut(placeholder_vu) {
            d.parent = VertexUseParent::EdgeUse(eu);
        }
        if let Some(d) = self.vertexuses.get_mut(mate_vu) {
            d.parent = VertexUseParent::EdgeUse(mate);
        }
        if let Some(e) = self.edges.get_mut(edge) {
            if !self.edgeuses.contains_key(e.eu) {
                e.eu = eu;
            }
        }
        Ok((eu, mate))
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}
