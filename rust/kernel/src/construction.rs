// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Construction methods for topology elements.
//!
//! Every element is created through the [`Model`], which allocates the use
//! and its mate together so the mate invariant holds from the first moment.
//! New edges are radially free; faces that should share edges are glued
//! afterwards (see the radial module).

use nalgebra::Point3;

use crate::arena::*;
use crate::error::{Error, Result};
use crate::geometry::{polygon_plane_area, Plane, Tolerance};
use crate::keys::*;

impl Model {
    // --- Regions and shells ---

    /// Makes a new region holding one new, empty shell.
    pub fn mrsv(&mut self) -> (RegionKey, ShellKey) {
        let region = self.regions.insert(RegionData::default());
        self.region_order.push(region);
        let shell = self.shells.insert(ShellData {
            region,
            faceuses: Vec::new(),
            wire_loopuses: Vec::new(),
            wire_edgeuses: Vec::new(),
            vertexuse: None,
            bbox: None,
        });
        if let Some(r) = self.regions.get_mut(region) {
            r.shells.push(shell);
        }
        tracing::trace!(?region, ?shell, "made region and shell");
        (region, shell)
    }

    /// Makes a new, empty shell in an existing region.
    pub fn msv(&mut self, region: RegionKey) -> Result<ShellKey> {
        if !self.regions.contains_key(region) {
            return Err(Error::RegionNotFound(region));
        }
        let shell = self.shells.insert(ShellData {
            region,
            faceuses: Vec::new(),
            wire_loopuses: Vec::new(),
            wire_edgeuses: Vec::new(),
            vertexuse: None,
            bbox: None,
        });
        self.get_region_mut(region)?.shells.push(shell);
        Ok(shell)
    }

    /// Gives a shell a lone vertexuse of `vertex`, replacing any previous one.
    pub fn add_lone_vertex(&mut self, shell: ShellKey, vertex: VertexKey) -> Result<VertexUseKey> {
        let previous = self.get_shell(shell)?.vertexuse;
        let vu = self.new_vertexuse(vertex, VertexUseParent::Shell(shell))?;
        if let Some(old) = previous {
            self.free_vertexuse(old);
        }
        self.get_shell_mut(shell)?.vertexuse = Some(vu);
        Ok(vu)
    }

    fn drop_lone_vertex(&mut self, shell: ShellKey) -> Result<()> {
        if let Some(vu) = self.get_shell_mut(shell)?.vertexuse.take() {
            self.free_vertexuse(vu);
        }
        Ok(())
    }

    // --- Faces ---

    /// Makes a face whose single outer loop runs through `vertices` in order.
    ///
    /// Each consecutive pair of vertices gets a new, radially free edge. The
    /// returned faceuse is the `OT_SAME` side; its loop runs counter-clockwise
    /// about its normal. A lone vertexuse in the shell is removed.
    pub fn cface(&mut self, shell: ShellKey, vertices: &[VertexKey]) -> Result<FaceUseKey> {
        if vertices.len() < 3 {
            return Err(Error::TooFewVertices(vertices.len()));
        }
        if let Some(&missing) = vertices.iter().find(|&&v| !self.vertices.contains_key(v)) {
            return Err(Error::VertexNotFound(missing));
        }
        self.get_shell(shell)?;

        let face = self.faces.insert(FaceData {
            fu: FaceUseKey::default(),
            plane: None,
            flip: false,
            bbox: None,
        });
        let fu = self.faceuses.insert(FaceUseData {
            shell,
            mate: FaceUseKey::default(),
            face,
            orientation: Orientation::Same,
            loopuses: Vec::new(),
        });
        let fu_mate = self.faceuses.insert(FaceUseData {
            shell,
            mate: fu,
            face,
            orientation: Orientation::Opposite,
            loopuses: Vec::new(),
        });
        self.get_fu_mut(fu)?.mate = fu_mate;
        self.get_face_mut(face)?.fu = fu;

        {
            let s = self.get_shell_mut(shell)?;
            s.faceuses.push(fu);
            s.faceuses.push(fu_mate);
        }
        self.add_face_loop(fu, vertices, Orientation::Same)?;
        self.drop_lone_vertex(shell)?;
        tracing::trace!(?fu, n = vertices.len(), "made face");
        Ok(fu)
    }

    /// Makes a vertex for each point and then a face through them.
    pub fn cface_from_points(
        &mut self,
        shell: ShellKey,
        points: &[Point3<f64>],
    ) -> Result<FaceUseKey> {
        if points.len() < 3 {
            return Err(Error::TooFewVertices(points.len()));
        }
        let verts: Vec<VertexKey> = points.iter().map(|&p| self.add_vertex(p)).collect();
        self.cface(shell, &verts)
    }

    /// Adds another loop through `vertices` to a face.
    ///
    /// `orientation` is `Same` for an outer boundary and `Opposite` for a hole.
    /// The loop is placed in `fu` in the order given; the mate loop, with the
    /// reverse order, is placed in the mate faceuse.
    pub fn add_face_loop(
        &mut self,
        fu: FaceUseKey,
        vertices: &[VertexKey],
        orientation: Orientation,
    ) -> Result<LoopUseKey> {
        let fu_mate = self.get_fu(fu)?.mate;
        let (lu, lu_mate) = self.mk_loop_pair(
            LoopUseParent::Face(fu),
            LoopUseParent::Face(fu_mate),
            vertices,
            orientation,
        )?;
        self.get_fu_mut(fu)?.loopuses.push(lu);
        self.get_fu_mut(fu_mate)?.loopuses.push(lu_mate);
        Ok(lu)
    }

    /// Makes a loopuse/mate pair of new edges through `vertices`.
    ///
    /// The caller lists the two loopuses in their owners.
    fn mk_loop_pair(
        &mut self,
        parent: LoopUseParent,
        mate_parent: LoopUseParent,
        vertices: &[VertexKey],
        orientation: Orientation,
    ) -> Result<(LoopUseKey, LoopUseKey)> {
        if vertices.len() < 2 {
            return Err(Error::TooFewVertices(vertices.len()));
        }
        if let Some(&missing) = vertices.iter().find(|&&v| !self.vertices.contains_key(v)) {
            return Err(Error::VertexNotFound(missing));
        }

        let lp = self.loops.insert(LoopData {
            lu: LoopUseKey::default(),
            bbox: None,
        });
        let lu = self.loopuses.insert(LoopUseData {
            parent,
            mate: LoopUseKey::default(),
            lp,
            orientation,
            down: LoopUseDown::Edges(Vec::new()),
        });
        let lu_mate = self.loopuses.insert(LoopUseData {
            parent: mate_parent,
            mate: lu,
            lp,
            orientation,
            down: LoopUseDown::Edges(Vec::new()),
        });
        self.get_lu_mut(lu)?.mate = lu_mate;
        if let Some(l) = self.loops.get_mut(lp) {
            l.lu = lu;
        }

        let n = vertices.len();
        let mut eus = Vec::with_capacity(n);
        let mut mates = Vec::with_capacity(n);
        for i in 0..n {
            let (eu, mate) = self.new_edge_pair(
                vertices[i],
                vertices[(i + 1) % n],
                EdgeUseParent::Loop(lu),
                EdgeUseParent::Loop(lu_mate),
            )?;
            eus.push(eu);
            mates.push(mate);
        }
        mates.reverse();
        self.get_lu_mut(lu)?.down = LoopUseDown::Edges(eus);
        self.get_lu_mut(lu_mate)?.down = LoopUseDown::Edges(mates);
        Ok((lu, lu_mate))
    }

    // --- Wires ---

    /// Makes a wire loop of new edges through `vertices` in a shell.
    pub fn add_wire_loop(&mut self, shell: ShellKey, vertices: &[VertexKey]) -> Result<LoopUseKey> {
        self.get_shell(shell)?;
        let (lu, lu_mate) = self.mk_loop_pair(
            LoopUseParent::Shell(shell),
            LoopUseParent::Shell(shell),
            vertices,
            Orientation::Same,
        )?;
        let s = self.get_shell_mut(shell)?;
        s.wire_loopuses.push(lu);
        s.wire_loopuses.push(lu_mate);
        Ok(lu)
    }

    /// Makes a single-vertex wire loop in a shell.
    pub fn add_point_loop(&mut self, shell: ShellKey, vertex: VertexKey) -> Result<LoopUseKey> {
        self.get_shell(shell)?;
        if !self.vertices.contains_key(vertex) {
            return Err(Error::VertexNotFound(vertex));
        }
        let lp = self.loops.insert(LoopData {
            lu: LoopUseKey::default(),
            bbox: None,
        });
        let lu = self.loopuses.insert(LoopUseData {
            parent: LoopUseParent::Shell(shell),
            mate: LoopUseKey::default(),
            lp,
            orientation: Orientation::Same,
            down: LoopUseDown::Edges(Vec::new()),
        });
        let lu_mate = self.loopuses.insert(LoopUseData {
            parent: LoopUseParent::Shell(shell),
            mate: lu,
            lp,
            orientation: Orientation::Same,
            down: LoopUseDown::Edges(Vec::new()),
        });
        let vu = self.new_vertexuse(vertex, VertexUseParent::LoopUse(lu))?;
        let vu_mate = self.new_vertexuse(vertex, VertexUseParent::LoopUse(lu_mate))?;
        {
            let d = self.get_lu_mut(lu)?;
            d.mate = lu_mate;
            d.down = LoopUseDown::Vertex(vu);
        }
        self.get_lu_mut(lu_mate)?.down = LoopUseDown::Vertex(vu_mate);
        if let Some(l) = self.loops.get_mut(lp) {
            l.lu = lu;
        }
        let s = self.get_shell_mut(shell)?;
        s.wire_loopuses.push(lu);
        s.wire_loopuses.push(lu_mate);
        Ok(lu)
    }

    /// Makes a wire edge from `v1` to `v2` directly in a shell.
    ///
    /// Returns the edgeuse starting at `v1`.
    pub fn me_wire(&mut self, shell: ShellKey, v1: VertexKey, v2: VertexKey) -> Result<EdgeUseKey> {
        self.get_shell(shell)?;
        let (eu, mate) = self.new_edge_pair(
            v1,
            v2,
            EdgeUseParent::Shell(shell),
            EdgeUseParent::Shell(shell),
        )?;
        let s = self.get_shell_mut(shell)?;
        s.wire_edgeuses.push(eu);
        s.wire_edgeuses.push(mate);
        Ok(eu)
    }

    // --- Face geometry ---

    /// Assigns `plane` as the geometry of the face, expressed for `fu`.
    ///
    /// `plane.normal` becomes the normal of `fu`; its mate gets the reverse.
    pub fn face_g(&mut self, fu: FaceUseKey, plane: Plane) -> Result<()> {
        let d = self.get_fu(fu)?;
        let flip = d.orientation == Orientation::Opposite;
        let face = self.get_face_mut(d.face)?;
        face.plane = Some(plane);
        face.flip = flip;
        Ok(())
    }

    /// Computes the face plane from the outer loop of its `OT_SAME` use.
    ///
    /// The loop winding decides the normal direction (Newell's method). Fails
    /// with [`Error::Degenerate`] for loops with no area.
    pub fn fu_planeeqn(&mut self, fu: FaceUseKey, tol: &Tolerance) -> Result<Plane> {
        let same = self.same_use(fu)?;
        let lu = self
            .outer_loopuse(same)
            .ok_or(Error::Degenerate("face has no outer loop"))?;
        let points = self.loop_points(lu);
        let (plane, area) =
            polygon_plane_area(&points).ok_or(Error::Degenerate("loop has no plane"))?;
        if area < tol.dist_sq {
            tracing::warn!(?fu, area, "loop area below tolerance");
            return Err(Error::Degenerate("loop area below tolerance"));
        }
        self.face_g(same, plane)?;
        Ok(plane)
    }

    /// Returns whichever of `fu` and its mate is the `OT_SAME` use.
    pub fn same_use(&self, fu: FaceUseKey) -> Result<FaceUseKey> {
        let d = self.get_fu(fu)?;
        Ok(if d.orientation == Orientation::Same {
            fu
        } else {
            d.mate
        })
    }

    /// Moves a loop (and its mate) out of its parent into a new face.
    ///
    /// The loop becomes the new face's outer boundary; the returned faceuse
    /// holds `lu` and is `OT_SAME`. A face cannot give up its only outer loop.
    pub fn mk_new_face_from_loop(&mut self, lu: LoopUseKey) -> Result<FaceUseKey> {
        let d = self.get_lu(lu)?;
        let lu_mate = d.mate;
        let (shell, old_parent, old_mate_parent) = match d.parent {
            LoopUseParent::Face(fu) => {
                let fd = self.get_fu(fu)?;
                (fd.shell, Some(fu), Some(fd.mate))
            }
            LoopUseParent::Shell(s) => (s, None, None),
        };
        if matches!(d.down, LoopUseDown::Vertex(_)) {
            return Err(Error::PointLoop(lu));
        }
        if let (Some(fu), Orientation::Same) = (old_parent, d.orientation) {
            let outer = self
                .get_fu(fu)?
                .loopuses
                .iter()
                .filter(|&&l| {
                    self.loopuses
                        .get(l)
                        .map(|ld| ld.orientation == Orientation::Same)
                        .unwrap_or(false)
                })
                .count();
            if outer == 1 {
                return Err(Error::Degenerate("cannot remove the only outer loop of a face"));
            }
        }

        match (old_parent, old_mate_parent) {
            (Some(fu), Some(fu_mate)) => {
                self.get_fu_mut(fu)?.loopuses.retain(|&l| l != lu);
                self.get_fu_mut(fu_mate)?.loopuses.retain(|&l| l != lu_mate);
            }
            _ => {
                self.get_shell_mut(shell)?
                    .wire_loopuses
                    .retain(|&l| l != lu && l != lu_mate);
            }
        }

        let face = self.faces.insert(FaceData {
            fu: FaceUseKey::default(),
            plane: None,
            flip: false,
            bbox: None,
        });
        let fu = self.faceuses.insert(FaceUseData {
            shell,
            mate: FaceUseKey::default(),
            face,
            orientation: Orientation::Same,
            loopuses: vec![lu],
        });
        let fu_mate = self.faceuses.insert(FaceUseData {
            shell,
            mate: fu,
            face,
            orientation: Orientation::Opposite,
            loopuses: vec![lu_mate],
        });
        self.get_fu_mut(fu)?.mate = fu_mate;
        self.get_face_mut(face)?.fu = fu;
        for (l, parent) in [(lu, fu), (lu_mate, fu_mate)] {
            let ld = self.get_lu_mut(l)?;
            ld.parent = LoopUseParent::Face(parent);
            ld.orientation = Orientation::Same;
        }
        let s = self.get_shell_mut(shell)?;
        s.faceuses.push(fu);
        s.faceuses.push(fu_mate);
        Ok(fu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn unit_square() -> [Point3<f64>; 4] {
        [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn cface_builds_mated_structure() {
        let mut m = Model::new();
        let (_r, s) = m.mrsv();
        let fu = m.cface_from_points(s, &unit_square()).unwrap();

        let fd = m.faceuse(fu).unwrap();
        assert_eq!(fd.orientation, Orientation::Same);
        let mate = m.faceuse(fd.mate).unwrap();
        assert_eq!(mate.mate, fu);
        assert_eq!(mate.orientation, Orientation::Opposite);
        assert_eq!(m.shell(s).unwrap().faceuses.len(), 2);
        assert_eq!(m.edge_count(), 4);
        assert_eq!(m.edgeuse_count(), 8);

        let lu = fd.loopuses[0];
        let lu_mate = m.loopuse(lu).unwrap().mate;
        let fwd = m.loop_vertices(lu);
        let mut back = m.loop_vertices(lu_mate);
        assert_eq!(fwd.len(), 4);
        // The mate loop walks the same vertices the other way round.
        back.reverse();
        back.rotate_right(1);
        assert_eq!(fwd, back);
    }

    #[test]
    fn cface_needs_three_vertices() {
        let mut m = Model::new();
        let (_r, s) = m.mrsv();
        let err = m.cface_from_points(s, &unit_square()[..2]);
        assert!(matches!(err, Err(Error::TooFewVertices(2))));
    }

    #[test]
    fn cface_replaces_lone_vertex() {
        let mut m = Model::new();
        let (_r, s) = m.mrsv();
        let v = m.add_vertex(Point3::new(5.0, 5.0, 5.0));
        m.add_lone_vertex(s, v).unwrap();
        assert!(m.shell(s).unwrap().vertexuse.is_some());
        m.cface_from_points(s, &unit_square()).unwrap();
        assert!(m.shell(s).unwrap().vertexuse.is_none());
        assert!(m.vertex(v).is_none());
    }

    #[test]
    fn planeeqn_follows_winding() {
        let mut m = Model::new();
        let (_r, s) = m.mrsv();
        let fu = m.cface_from_points(s, &unit_square()).unwrap();
        let pl = m.fu_planeeqn(fu, &Tolerance::default()).unwrap();
        assert_relative_eq!(pl.normal, Vector3::z());
        assert_relative_eq!(m.faceuse_normal(fu).unwrap(), Vector3::z());
        let mate = m.faceuse(fu).unwrap().mate;
        assert_relative_eq!(m.faceuse_normal(mate).unwrap(), -Vector3::z());
    }

    #[test]
    fn planeeqn_rejects_degenerate_loop() {
        let mut m = Model::new();
        let (_r, s) = m.mrsv();
        let fu = m
            .cface_from_points(
                s,
                &[
                    Point3::new(0.0, 0.0, 0.0),
                    Point3::new(1.0, 0.0, 0.0),
                    Point3::new(2.0, 0.0, 0.0),
                ],
            )
            .unwrap();
        assert!(matches!(
            m.fu_planeeqn(fu, &Tolerance::default()),
            Err(Error::Degenerate(_))
        ));
    }

    #[test]
    fn wire_edge_and_point_loop_live_in_shell() {
        let mut m = Model::new();
        let (_r, s) = m.mrsv();
        let a = m.add_vertex(Point3::origin());
        let b = m.add_vertex(Point3::new(0.0, 0.0, 1.0));
        let eu = m.me_wire(s, a, b).unwrap();
        assert!(m.is_free_edge(eu));
        m.add_point_loop(s, a).unwrap();
        let sd = m.shell(s).unwrap();
        assert_eq!(sd.wire_edgeuses.len(), 2);
        assert_eq!(sd.wire_loopuses.len(), 2);
    }

    #[test]
    fn loop_moves_into_new_face() {
        let mut m = Model::new();
        let (_r, s) = m.mrsv();
        let fu = m.cface_from_points(s, &unit_square()).unwrap();
        let verts: Vec<_> = [
            Point3::new(3.0, 0.0, 0.0),
            Point3::new(4.0, 0.0, 0.0),
            Point3::new(4.0, 1.0, 0.0),
        ]
        .iter()
        .map(|&p| m.add_vertex(p))
        .collect();
        let lu = m.add_face_loop(fu, &verts, Orientation::Same).unwrap();
        let new_fu = m.mk_new_face_from_loop(lu).unwrap();

        assert_eq!(m.face_count(), 2);
        assert_eq!(m.faceuse(fu).unwrap().loopuses.len(), 1);
        assert_eq!(m.faceuse(new_fu).unwrap().loopuses, vec![lu]);
        assert_eq!(m.find_fu_of_lu(lu), Some(new_fu));
    }
}
