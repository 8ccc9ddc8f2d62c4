// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Traversal methods for navigating the radial-edge structure.
//!
//! Upward queries (which loop, face or shell owns a use), loop order queries
//! (next/previous edgeuse, loop vertices) and radial queries (walking the ring
//! of uses around an edge).

use nalgebra::{Point3, Vector3};
use rustc_hash::FxHashSet;

use crate::arena::*;
use crate::geometry::{newell_normal, polygon_plane_area, Plane};
use crate::keys::*;

// =============================================================================
// Upward traversal: find owners
// =============================================================================

impl Model {
    /// Returns the loopuse owning an edgeuse, or `None` for wire edges.
    pub fn find_lu_of_eu(&self, eu: EdgeUseKey) -> Option<LoopUseKey> {
        match self.edgeuses.get(eu)?.parent {
            EdgeUseParent::Loop(lu) => Some(lu),
            EdgeUseParent::Shell(_) => None,
        }
    }

    /// Returns the faceuse owning a loopuse, or `None` for wire loops.
    pub fn find_fu_of_lu(&self, lu: LoopUseKey) -> Option<FaceUseKey> {
        match self.loopuses.get(lu)?.parent {
            LoopUseParent::Face(fu) => Some(fu),
            LoopUseParent::Shell(_) => None,
        }
    }

    /// Returns the faceuse an edgeuse belongs to, if it is in a face loop.
    pub fn find_fu_of_eu(&self, eu: EdgeUseKey) -> Option<FaceUseKey> {
        self.find_fu_of_lu(self.find_lu_of_eu(eu)?)
    }

    /// Returns the shell a loopuse belongs to.
    pub fn find_s_of_lu(&self, lu: LoopUseKey) -> Option<ShellKey> {
        match self.loopuses.get(lu)?.parent {
            LoopUseParent::Face(fu) => Some(self.faceuses.get(fu)?.shell),
            LoopUseParent::Shell(s) => Some(s),
        }
    }

    /// Returns the shell an edgeuse belongs to.
    pub fn find_s_of_eu(&self, eu: EdgeUseKey) -> Option<ShellKey> {
        match self.edgeuses.get(eu)?.parent {
            EdgeUseParent::Loop(lu) => self.find_s_of_lu(lu),
            EdgeUseParent::Shell(s) => Some(s),
        }
    }

    /// Returns the shell a vertexuse belongs to.
    pub fn find_s_of_vu(&self, vu: VertexUseKey) -> Option<ShellKey> {
        match self.vertexuses.get(vu)?.parent {
            VertexUseParent::EdgeUse(eu) => self.find_s_of_eu(eu),
            VertexUseParent::LoopUse(lu) => self.find_s_of_lu(lu),
            VertexUseParent::Shell(s) => Some(s),
        }
    }

    /// Returns `true` if the edgeuse hangs directly off a shell.
    pub fn is_wire_eu(&self, eu: EdgeUseKey) -> bool {
        matches!(
            self.edgeuses.get(eu).map(|d| d.parent),
            Some(EdgeUseParent::Shell(_))
        )
    }

    // =========================================================================
    // Loop order
    // =========================================================================

    /// Edgeuses of a loop in order; empty for point loops.
    pub fn loop_edgeuses(&self, lu: LoopUseKey) -> &[EdgeUseKey] {
        match self.loopuses.get(lu).map(|d| &d.down) {
            Some(LoopUseDown::Edges(eus)) => eus,
            _ => &[],
        }
    }

    /// Start vertex of an edgeuse.
    pub fn eu_vertex(&self, eu: EdgeUseKey) -> Option<VertexKey> {
        let vu = self.edgeuses.get(eu)?.vu;
        Some(self.vertexuses.get(vu)?.vertex)
    }

    /// End vertex of an edgeuse (the start of its mate).
    pub fn eu_end_vertex(&self, eu: EdgeUseKey) -> Option<VertexKey> {
        self.eu_vertex(self.edgeuses.get(eu)?.mate)
    }

    /// Start and end points of an edgeuse.
    pub fn eu_points(&self, eu: EdgeUseKey) -> Option<(Point3<f64>, Point3<f64>)> {
        let a = self.vertex_point(self.eu_vertex(eu)?)?;
        let b = self.vertex_point(self.eu_end_vertex(eu)?)?;
        Some((a, b))
    }

    fn eu_offset(&self, eu: EdgeUseKey, step: isize) -> Option<EdgeUseKey> {
        let lu = self.find_lu_of_eu(eu)?;
        let eus = self.loop_edgeuses(lu);
        let i = eus.iter().position(|&e| e == eu)? as isize;
        let n = eus.len() as isize;
        Some(eus[(i + step).rem_euclid(n) as usize])
    }

    /// Next edgeuse around the loop; `None` for wire edges.
    pub fn eu_next(&self, eu: EdgeUseKey) -> Option<EdgeUseKey> {
        self.eu_offset(eu, 1)
    }

    /// Previous edgeuse around the loop; `None` for wire edges.
    pub fn eu_prev(&self, eu: EdgeUseKey) -> Option<EdgeUseKey> {
        self.eu_offset(eu, -1)
    }

    /// Vertices of a loop in traversal order.
    pub fn loop_vertices(&self, lu: LoopUseKey) -> Vec<VertexKey> {
        match self.loopuses.get(lu).map(|d| &d.down) {
            Some(LoopUseDown::Edges(eus)) => {
                eus.iter().filter_map(|&eu| self.eu_vertex(eu)).collect()
            }
            Some(LoopUseDown::Vertex(vu)) => self
                .vertexuses
                .get(*vu)
                .map(|d| vec![d.vertex])
                .unwrap_or_default(),
            None => Vec::new(),
        }
    }

    /// Points of a loop in traversal order.
    pub fn loop_points(&self, lu: LoopUseKey) -> Vec<Point3<f64>> {
        self.loop_vertices(lu)
            .into_iter()
            .filter_map(|v| self.vertex_point(v))
            .collect()
    }

    /// First outer (`OT_SAME`) loop of a faceuse.
    pub fn outer_loopuse(&self, fu: FaceUseKey) -> Option<LoopUseKey> {
        self.faceuses.get(fu)?.loopuses.iter().copied().find(|&lu| {
            self.loopuses
                .get(lu)
                .map(|d| d.orientation == Orientation::Same)
                .unwrap_or(false)
        })
    }

    /// Outward normal of a faceuse.
    ///
    /// Uses the face plane when one is assigned; otherwise Newell's method on
    /// the faceuse's outer loop. `None` when neither gives a direction.
    pub fn faceuse_normal(&self, fu: FaceUseKey) -> Option<Vector3<f64>> {
        let d = self.faceuses.get(fu)?;
        let face = self.faces.get(d.face)?;
        if let Some(plane) = face.plane {
            let mut n = plane.normal;
            if face.flip {
                n = -n;
            }
            if d.orientation == Orientation::Opposite {
                n = -n;
            }
            return Some(n);
        }
        let lu = self.outer_loopuse(fu)?;
        let n = newell_normal(&self.loop_points(lu));
        let len = n.norm();
        (len > 1e-15).then(|| n / len)
    }

    /// Plane of a faceuse, with the normal pointing out of its front.
    pub fn faceuse_plane(&self, fu: FaceUseKey) -> Option<Plane> {
        let d = self.faceuses.get(fu)?;
        let face = self.faces.get(d.face)?;
        match face.plane {
            Some(plane) => {
                let reversed = face.flip != (d.orientation == Orientation::Opposite);
                Some(if reversed { plane.reversed() } else { plane })
            }
            None => {
                let lu = self.outer_loopuse(fu)?;
                polygon_plane_area(&self.loop_points(lu)).map(|(pl, _)| pl)
            }
        }
    }

    // =========================================================================
    // Radial traversal
    // =========================================================================

    /// Returns `true` if only one edgeuse/mate pair uses the edge.
    pub fn is_free_edge(&self, eu: EdgeUseKey) -> bool {
        self.edgeuses
            .get(eu)
            .map(|d| d.radial == d.mate)
            .unwrap_or(false)
    }

    /// Every use of an edge, walking the ring from the edge's recorded use.
    ///
    /// Uses come out in pairs `(x, x.mate)` in ring order.
    pub fn edge_uses(&self, edge: EdgeKey) -> Vec<EdgeUseKey> {
        let Some(start) = self.edges.get(edge).map(|e| e.eu) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut cur = start;
        let limit = self.edgeuses.len();
        loop {
            let Some(d) = self.edgeuses.get(cur) else {
                break;
            };
            out.push(cur);
            out.push(d.mate);
            let Some(next) = self.edgeuses.get(d.mate).map(|m| m.radial) else {
                break;
            };
            if next == start || out.len() > limit {
                break;
            }
            cur = next;
        }
        out
    }

    fn radial_candidate_ok(&self, eu: EdgeUseKey, shell: Option<ShellKey>, wires: bool) -> bool {
        if !wires && self.is_wire_eu(eu) {
            return false;
        }
        match shell {
            Some(s) => self.find_s_of_eu(eu) == Some(s),
            None => true,
        }
    }

    fn walk_radial(
        &self,
        eu: EdgeUseKey,
        shell: Option<ShellKey>,
        wires: bool,
        step: impl Fn(&Self, EdgeUseKey) -> Option<EdgeUseKey>,
    ) -> Option<EdgeUseKey> {
        let mut cur = step(self, eu)?;
        let mut guard = self.edgeuses.len();
        while cur != eu {
            if self.radial_candidate_ok(cur, shell, wires) {
                return Some(cur);
            }
            cur = step(self, cur)?;
            guard = guard.checked_sub(1)?;
        }
        Some(eu)
    }

    /// Next same-direction use of the edge around the ring (`eu.mate.radial`).
    ///
    /// Uses outside `shell` (when given) and wire edgeuses (unless `wires`)
    /// are skipped. Returns `eu` itself when no other use qualifies.
    pub fn next_radial_eu(
        &self,
        eu: EdgeUseKey,
        shell: Option<ShellKey>,
        wires: bool,
    ) -> Option<EdgeUseKey> {
        self.walk_radial(eu, shell, wires, |m, e| {
            let mate = m.edgeuses.get(e)?.mate;
            Some(m.edgeuses.get(mate)?.radial)
        })
    }

    /// Previous same-direction use of the edge around the ring (`eu.radial.mate`).
    pub fn prev_radial_eu(
        &self,
        eu: EdgeUseKey,
        shell: Option<ShellKey>,
        wires: bool,
    ) -> Option<EdgeUseKey> {
        self.walk_radial(eu, shell, wires, |m, e| {
            let radial = m.edgeuses.get(e)?.radial;
            Some(m.edgeuses.get(radial)?.mate)
        })
    }

    /// The face edgeuse across the radial gap from `eu` within `shell`.
    ///
    /// Starts at `eu.radial` and hops `mate.radial` past uses in other shells
    /// and wires. Returns `None` when the walk comes back to `eu.mate`, i.e.
    /// no other face of the shell uses the edge.
    pub fn radial_eu_in_shell(&self, eu: EdgeUseKey, shell: ShellKey) -> Option<EdgeUseKey> {
        let d = self.edgeuses.get(eu)?;
        let mate = d.mate;
        let mut cur = d.radial;
        let mut guard = self.edgeuses.len();
        while cur != mate {
            if !self.is_wire_eu(cur) && self.find_s_of_eu(cur) == Some(shell) {
                return Some(cur);
            }
            let m = self.edgeuses.get(cur)?.mate;
            cur = self.edgeuses.get(m)?.radial;
            guard = guard.checked_sub(1)?;
        }
        None
    }

    /// Number of faces around the edge of `eu` (wire uses excluded).
    pub fn radial_face_count(&self, eu: EdgeUseKey, shell: Option<ShellKey>) -> usize {
        let (Some(edge), Some(start)) = (self.edgeuses.get(eu).map(|d| d.edge), self.eu_vertex(eu))
        else {
            return 0;
        };
        self.edge_uses(edge)
            .into_iter()
            .filter(|&e| self.eu_vertex(e) == Some(start))
            .filter(|&e| self.radial_candidate_ok(e, shell, false))
            .count()
    }

    /// Finds an edgeuse running from `v1` to `v2`.
    ///
    /// Uses on the edge of `exclude` are skipped, as are uses outside `shell`
    /// when one is given. With `dangling_only`, only free edges qualify.
    pub fn findeu(
        &self,
        v1: VertexKey,
        v2: VertexKey,
        shell: Option<ShellKey>,
        exclude: Option<EdgeUseKey>,
        dangling_only: bool,
    ) -> Option<EdgeUseKey> {
        let excluded_edge = exclude.and_then(|e| self.edgeuses.get(e)).map(|d| d.edge);
        self.vertices.get(v1)?.uses.iter().find_map(|&vu| {
            let VertexUseParent::EdgeUse(eu) = self.vertexuses.get(vu)?.parent else {
                return None;
            };
            let d = self.edgeuses.get(eu)?;
            if Some(d.edge) == excluded_edge {
                return None;
            }
            if self.eu_end_vertex(eu)? != v2 {
                return None;
            }
            if let Some(s) = shell {
                if self.find_s_of_eu(eu)? != s {
                    return None;
                }
            }
            if dangling_only && d.radial != d.mate {
                return None;
            }
            Some(eu)
        })
    }

    /// Returns `true` if the two faces share at least one edge.
    pub fn faces_are_radial(&self, fu1: FaceUseKey, fu2: FaceUseKey) -> bool {
        let Some(face2) = self.faceuses.get(fu2).map(|d| d.face) else {
            return false;
        };
        let Some(fd) = self.faceuses.get(fu1) else {
            return false;
        };
        fd.loopuses.iter().any(|&lu| {
            self.loop_edgeuses(lu).iter().any(|&eu| {
                let Some(edge) = self.edgeuses.get(eu).map(|d| d.edge) else {
                    return false;
                };
                self.edge_uses(edge).into_iter().any(|other| {
                    self.find_fu_of_eu(other)
                        .and_then(|fu| self.faceuses.get(fu))
                        .map(|d| d.face == face2)
                        .unwrap_or(false)
                })
            })
        })
    }

    // =========================================================================
    // Shell contents
    // =========================================================================

    /// Every edgeuse in a shell: face loops, wire loops and wire edges.
    pub fn shell_edgeuses(&self, shell: ShellKey) -> Vec<EdgeUseKey> {
        let Some(s) = self.shells.get(shell) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for &fu in &s.faceuses {
            if let Some(fd) = self.faceuses.get(fu) {
                for &lu in &fd.loopuses {
                    out.extend_from_slice(self.loop_edgeuses(lu));
                }
            }
        }
        for &lu in &s.wire_loopuses {
            out.extend_from_slice(self.loop_edgeuses(lu));
        }
        out.extend_from_slice(&s.wire_edgeuses);
        out
    }

    /// Distinct vertices used anywhere in a shell, in first-seen order.
    pub fn shell_vertices(&self, shell: ShellKey) -> Vec<VertexKey> {
        let Some(s) = self.shells.get(shell) else {
            return Vec::new();
        };
        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        let mut push = |v: VertexKey| {
            if seen.insert(v) {
                out.push(v);
            }
        };
        for &fu in &s.faceuses {
            if let Some(fd) = self.faceuses.get(fu) {
                for &lu in &fd.loopuses {
                    self.loop_vertices(lu).into_iter().for_each(&mut push);
                }
            }
        }
        for &lu in &s.wire_loopuses {
            self.loop_vertices(lu).into_iter().for_each(&mut push);
        }
        for &eu in &s.wire_edgeuses {
            if let Some(v) = self.eu_vertex(eu) {
                push(v);
            }
        }
        if let Some(v) = s.vertexuse.and_then(|vu| self.vertexuses.get(vu)) {
            push(v.vertex);
        }
        out
    }

    /// The `OT_SAME` faceuses of a shell, in shell order.
    pub fn shell_same_faceuses(&self, shell: ShellKey) -> Vec<FaceUseKey> {
        self.shells
            .get(shell)
            .map(|s| {
                s.faceuses
                    .iter()
                    .copied()
                    .filter(|&fu| {
                        self.faceuses
                            .get(fu)
                            .map(|d| d.orientation == Orientation::Same)
                            .unwrap_or(false)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle(m: &mut Model) -> (ShellKey, FaceUseKey) {
        let (_r, s) = m.mrsv();
        let fu = m
            .cface_from_points(
                s,
                &[
                    Point3::new(0.0, 0.0, 0.0),
                    Point3::new(1.0, 0.0, 0.0),
                    Point3::new(0.0, 1.0, 0.0),
                ],
            )
            .unwrap();
        (s, fu)
    }

    #[test]
    fn owners_are_found() {
        let mut m = Model::new();
        let (s, fu) = triangle(&mut m);
        let lu = m.faceuse(fu).unwrap().loopuses[0];
        let eu = m.loop_edgeuses(lu)[0];
        assert_eq!(m.find_lu_of_eu(eu), Some(lu));
        assert_eq!(m.find_fu_of_eu(eu), Some(fu));
        assert_eq!(m.find_s_of_eu(eu), Some(s));
        assert!(!m.is_wire_eu(eu));
    }

    #[test]
    fn loop_order_wraps() {
        let mut m = Model::new();
        let (_s, fu) = triangle(&mut m);
        let lu = m.faceuse(fu).unwrap().loopuses[0];
        let eus = m.loop_edgeuses(lu).to_vec();
        assert_eq!(m.eu_next(eus[2]), Some(eus[0]));
        assert_eq!(m.eu_prev(eus[0]), Some(eus[2]));
        for &eu in &eus {
            let next = m.eu_next(eu).unwrap();
            assert_eq!(m.eu_end_vertex(eu), m.eu_vertex(next));
        }
    }

    #[test]
    fn free_edge_ring_is_one_pair() {
        let mut m = Model::new();
        let (s, fu) = triangle(&mut m);
        let lu = m.faceuse(fu).unwrap().loopuses[0];
        let eu = m.loop_edgeuses(lu)[0];
        let d = m.edgeuse(eu).unwrap();
        assert!(m.is_free_edge(eu));
        assert_eq!(m.edge_uses(d.edge), vec![eu, d.mate]);
        assert_eq!(m.radial_face_count(eu, Some(s)), 1);
        assert_eq!(m.next_radial_eu(eu, None, false), Some(eu));
        assert_eq!(m.radial_eu_in_shell(eu, s), None);
    }

    #[test]
    fn findeu_honours_direction() {
        let mut m = Model::new();
        let (s, fu) = triangle(&mut m);
        let lu = m.faceuse(fu).unwrap().loopuses[0];
        let eu = m.loop_edgeuses(lu)[0];
        let a = m.eu_vertex(eu).unwrap();
        let b = m.eu_end_vertex(eu).unwrap();
        let found = m.findeu(a, b, Some(s), None, false).unwrap();
        assert_eq!(m.eu_vertex(found), Some(a));
        assert_eq!(m.eu_end_vertex(found), Some(b));
        assert!(m.findeu(a, b, Some(s), Some(eu), false).is_none());
    }

    #[test]
    fn shell_contents() {
        let mut m = Model::new();
        let (s, fu) = triangle(&mut m);
        assert_eq!(m.shell_vertices(s).len(), 3);
        assert_eq!(m.shell_edgeuses(s).len(), 6);
        assert_eq!(m.shell_same_faceuses(s), vec![fu]);
    }
}
