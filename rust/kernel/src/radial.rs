// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Radial ring maintenance.
//!
//! The uses of an edge are kept in angular order around the edge axis, so that
//! crossing a radial link always lands on the face use looking back across the
//! same wedge of space. Rings are rebuilt from geometry whenever edges are
//! joined, and spliced when a use pair leaves an edge.

use std::f64::consts::TAU;

use nalgebra::Vector3;
use rustc_hash::FxHashSet;

use crate::arena::*;
use crate::error::{Error, Result};
use crate::keys::*;

/// One edgeuse/mate pair, split by direction along the edge axis.
#[derive(Debug, Clone, Copy)]
struct RadialPair {
    /// The use starting at the axis start vertex.
    fwd: EdgeUseKey,
    /// Its mate.
    bwd: EdgeUseKey,
    angle: f64,
}

impl Model {
    /// Rebuilds the radial ring of `edge` in angular order.
    pub fn rebuild_ring(&mut self, edge: EdgeKey) -> Result<()> {
        let uses = self.edge_uses(edge);
        self.link_ring(edge, &uses)
    }

    /// Links `uses` (which must include each use's mate) into the ring of
    /// `edge`, ordered by the angle of each face around the edge axis.
    fn link_ring(&mut self, edge: EdgeKey, uses: &[EdgeUseKey]) -> Result<()> {
        let anchor = match self.edges.get(edge).map(|e| e.eu) {
            Some(eu) if uses.contains(&eu) => eu,
            _ => *uses.first().ok_or(Error::NotFound(edge.into()))?,
        };
        let a0 = self.eu_vertex(anchor).ok_or(Error::EdgeUseNotFound(anchor))?;
        let (p0, p1) = self.eu_points(anchor).ok_or(Error::EdgeUseNotFound(anchor))?;
        let axis = (p1 - p0).try_normalize(1e-15);

        let mut seen = FxHashSet::default();
        let mut pairs = Vec::with_capacity(uses.len() / 2);
        for &u in uses {
            if !seen.insert(u) {
                continue;
            }
            let mate = self.get_eu(u)?.mate;
            seen.insert(mate);
            let (fwd, bwd) = if self.eu_vertex(u) == Some(a0) {
                (u, mate)
            } else {
                (mate, u)
            };
            pairs.push(RadialPair {
                fwd,
                bwd,
                angle: 0.0,
            });
        }

        if let Some(axis) = axis {
            self.assign_angles(&mut pairs, &axis);
        }
        pairs.sort_by(|a, b| a.angle.total_cmp(&b.angle));

        let n = pairs.len();
        for (i, pair) in pairs.iter().enumerate() {
            let next = pairs[(i + 1) % n];
            self.get_eu_mut(pair.fwd)?.radial = next.bwd;
            self.get_eu_mut(next.bwd)?.radial = pair.fwd;
        }
        for &u in uses {
            self.get_eu_mut(u)?.edge = edge;
        }
        if let Some(e) = self.edges.get_mut(edge) {
            e.eu = pairs[0].fwd;
        }
        Ok(())
    }

    fn assign_angles(&self, pairs: &mut [RadialPair], axis: &Vector3<f64>) {
        let lefts: Vec<Option<Vector3<f64>>> = pairs
            .iter()
            .map(|p| {
                if self.is_wire_eu(p.fwd) {
                    return None;
                }
                let n = self.faceuse_normal(self.find_fu_of_eu(p.fwd)?)?;
                Some(n.cross(axis))
            })
            .collect();

        let reference = lefts
            .iter()
            .flatten()
            .find_map(|l| (l - axis * l.dot(axis)).try_normalize(1e-12));
        let Some(u) = reference else {
            return;
        };
        let w = axis.cross(&u);

        for (pair, left) in pairs.iter_mut().zip(lefts) {
            pair.angle = if self.is_wire_eu(pair.fwd) {
                -1.0
            } else {
                match left {
                    Some(l) => l.dot(&w).atan2(l.dot(&u)).rem_euclid(TAU),
                    None => 0.0,
                }
            };
        }
    }

    /// Takes `eu` and its mate out of their ring, leaving them radially free.
    ///
    /// The pair still names its old edge; the caller moves it to another one.
    /// Returns `false` if they were the only uses of the edge.
    pub(crate) fn unlink_from_ring(&mut self, eu: EdgeUseKey) -> Result<bool> {
        let d = self.get_eu(eu)?;
        let (mate, edge, x) = (d.mate, d.edge, d.radial);
        if x == mate {
            return Ok(false);
        }
        let y = self.get_eu(mate)?.radial;
        self.get_eu_mut(x)?.radial = y;
        self.get_eu_mut(y)?.radial = x;
        self.get_eu_mut(eu)?.radial = mate;
        self.get_eu_mut(mate)?.radial = eu;
        if let Some(e) = self.edges.get_mut(edge) {
            if e.eu == eu || e.eu == mate {
                e.eu = x;
            }
        }
        Ok(true)
    }

    /// Merges the edges of `eu1` and `eu2` into one.
    ///
    /// Both must run between the same two vertices (in either direction). All
    /// uses of `eu2`'s edge move to `eu1`'s edge and the combined ring is
    /// rebuilt in angular order.
    pub fn radial_join(&mut self, eu1: EdgeUseKey, eu2: EdgeUseKey) -> Result<()> {
        let e1 = self.get_eu(eu1)?.edge;
        let e2 = self.get_eu(eu2)?.edge;
        if e1 == e2 {
            return Ok(());
        }
        let ends = |m: &Model, eu| -> Option<(VertexKey, VertexKey)> {
            Some((m.eu_vertex(eu)?, m.eu_end_vertex(eu)?))
        };
        let (a1, b1) = ends(self, eu1).ok_or(Error::EdgeUseNotFound(eu1))?;
        let (a2, b2) = ends(self, eu2).ok_or(Error::EdgeUseNotFound(eu2))?;
        if !((a1 == a2 && b1 == b2) || (a1 == b2 && b1 == a2)) {
            return Err(Error::EdgeVertexMismatch(eu1, eu2));
        }

        let mut uses = self.edge_uses(e1);
        uses.extend(self.edge_uses(e2));
        self.edges.remove(e2);
        self.link_ring(e1, &uses)?;
        tracing::trace!(?eu1, ?eu2, n = uses.len(), "radial join");
        Ok(())
    }

    /// Joins `eu` with every other edge between its endpoints whose uses
    /// pass `accept`. Returns the number of joins.
    pub(crate) fn join_matching_edges(
        &mut self,
        eu: EdgeUseKey,
        accept: impl Fn(&Model, EdgeUseKey) -> bool,
    ) -> Result<usize> {
        let v1 = self.eu_vertex(eu).ok_or(Error::EdgeUseNotFound(eu))?;
        let v2 = self.eu_end_vertex(eu).ok_or(Error::EdgeUseNotFound(eu))?;
        let mut joined = 0;
        loop {
            let edge = self.get_eu(eu)?.edge;
            let candidate = self.vertices.get(v1).and_then(|v| {
                v.uses.iter().find_map(|&vu| {
                    let VertexUseParent::EdgeUse(other) = self.vertexuses.get(vu)?.parent else {
                        return None;
                    };
                    let od = self.edgeuses.get(other)?;
                    (od.edge != edge
                        && self.eu_end_vertex(other) == Some(v2)
                        && accept(self, other))
                    .then_some(other)
                })
            });
            match candidate {
                Some(other) => {
                    self.radial_join(eu, other)?;
                    joined += 1;
                }
                None => return Ok(joined),
            }
        }
    }

    /// Radially joins all coincident edges among the given faces.
    ///
    /// Returns the number of edge pairs joined.
    pub fn glue_faces(&mut self, faceuses: &[FaceUseKey]) -> Result<usize> {
        let faces: FxHashSet<FaceKey> = faceuses
            .iter()
            .map(|&fu| self.get_fu(fu).map(|d| d.face))
            .collect::<Result<_>>()?;
        let in_set = |m: &Model, eu: EdgeUseKey| {
            m.find_fu_of_eu(eu)
                .and_then(|fu| m.faceuses.get(fu))
                .map(|d| faces.contains(&d.face))
                .unwrap_or(false)
        };

        let mut joined = 0;
        for &fu in faceuses {
            let eus: Vec<EdgeUseKey> = self
                .get_fu(fu)?
                .loopuses
                .iter()
                .flat_map(|&lu| self.loop_edgeuses(lu).to_vec())
                .collect();
            for eu in eus {
                joined += self.join_matching_edges(eu, in_set)?;
            }
        }
        tracing::debug!(faces = faceuses.len(), joined, "glued faces");
        Ok(joined)
    }

    /// Radially joins the edges of one face with any coincident face edge
    /// elsewhere in its shell.
    pub fn glue_face_in_shell(&mut self, fu: FaceUseKey) -> Result<usize> {
        let shell = self.get_fu(fu)?.shell;
        let eus: Vec<EdgeUseKey> = self
            .get_fu(fu)?
            .loopuses
            .iter()
            .flat_map(|&lu| self.loop_edgeuses(lu).to_vec())
            .collect();
        let mut joined = 0;
        for eu in eus {
            joined += self.join_matching_edges(eu, |m, other| {
                !m.is_wire_eu(other) && m.find_s_of_eu(other) == Some(shell)
            })?;
        }
        Ok(joined)
    }

    /// Rebuilds the ring of every edge of a face.
    ///
    /// Returns the number of distinct edges visited.
    pub fn face_fix_radial_parity(&mut self, fu: FaceUseKey) -> Result<usize> {
        let mut edges = Vec::new();
        let mut seen = FxHashSet::default();
        for &lu in &self.get_fu(fu)?.loopuses {
            for &eu in self.loop_edgeuses(lu) {
                let e = self.get_eu(eu)?.edge;
                if seen.insert(e) {
                    edges.push(e);
                }
            }
        }
        for &e in &edges {
            self.rebuild_ring(e)?;
        }
        Ok(edges.len())
    }
}
