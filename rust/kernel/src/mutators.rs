// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-place edits that keep the mate and radial invariants.

use crate::arena::*;
use crate::error::{Error, Result};
use crate::geometry::Tolerance;
use crate::keys::*;

impl Model {
    // --- Face orientation ---

    /// Swaps the front and back roles of a face.
    ///
    /// The faceuse and its mate trade `OT_SAME`/`OT_OPPOSITE` and the face's
    /// flip flag is toggled, so each faceuse keeps its own normal and loops.
    pub fn reverse_face(&mut self, fu: FaceUseKey) -> Result<()> {
        let d = self.get_fu(fu)?;
        let (mate, face) = (d.mate, d.face);
        for k in [fu, mate] {
            let d = self.get_fu_mut(k)?;
            d.orientation = d.orientation.flipped();
        }
        let f = self.get_face_mut(face)?;
        f.flip = !f.flip;
        Ok(())
    }

    /// Reverses a face and rebuilds the radial ring of each of its edges.
    pub fn reverse_face_and_radials(&mut self, fu: FaceUseKey) -> Result<()> {
        self.reverse_face(fu)?;
        let edges = self.face_fix_radial_parity(fu)?;
        tracing::trace!(?fu, edges, "reversed face");
        Ok(())
    }

    // --- Edge splitting ---

    /// Splits the edge of `eu` at vertex `v`.
    ///
    /// `eu` becomes `A -> v` and a new edgeuse `v -> B` follows it in the loop;
    /// the mate side is split to match. The two split pairs leave the old
    /// edge's radial ring and start out free: other faces still using `A -> B`
    /// keep the old edge until they are split and joined radially as well.
    /// Returns the new edgeuse starting at `v`.
    pub fn esplit(&mut self, v: VertexKey, eu: EdgeUseKey) -> Result<EdgeUseKey> {
        if !self.vertices.contains_key(v) {
            return Err(Error::VertexNotFound(v));
        }
        let d = self.get_eu(eu)?;
        let (mate, parent) = (d.mate, d.parent);
        let md = self.get_eu(mate)?;
        let (mate_parent, mate_vu) = (md.parent, md.vu);
        let a = self.eu_vertex(eu).ok_or(Error::EdgeUseNotFound(eu))?;
        let b = self.eu_end_vertex(eu).ok_or(Error::EdgeUseNotFound(eu))?;
        if v == a || v == b {
            return Err(Error::Degenerate("split vertex is an edge endpoint"));
        }

        if self.unlink_from_ring(eu)? {
            let edge = self.edges.insert(EdgeData { eu });
            self.get_eu_mut(eu)?.edge = edge;
            self.get_eu_mut(mate)?.edge = edge;
        }

        let (eu2, mate2) = self.new_edge_pair(v, b, parent, mate_parent)?;
        self.move_vertexuse(mate_vu, v)?;

        match (parent, mate_parent) {
            (EdgeUseParent::Loop(lu), EdgeUseParent::Loop(lu_mate)) => {
                if let LoopUseDown::Edges(eus) = &mut self.get_lu_mut(lu)?.down {
                    let at = eus.iter().position(|&e| e == eu).map_or(eus.len(), |i| i + 1);
                    eus.insert(at, eu2);
                }
                if let LoopUseDown::Edges(eus) = &mut self.get_lu_mut(lu_mate)?.down {
                    let at = eus.iter().position(|&e| e == mate).unwrap_or(eus.len());
                    eus.insert(at, mate2);
                }
            }
            (EdgeUseParent::Shell(s), _) => {
                let sd = self.get_shell_mut(s)?;
                sd.wire_edgeuses.push(eu2);
                sd.wire_edgeuses.push(mate2);
            }
            (EdgeUseParent::Loop(_), EdgeUseParent::Shell(_)) => {
                return Err(Error::WireEdge(mate));
            }
        }
        tracing::trace!(?eu, ?eu2, "split edge");
        Ok(eu2)
    }

    /// Splits every face edge of a shell that has another vertex of the shell
    /// lying on its interior, then rejoins the pieces radially.
    ///
    /// Returns the number of splits made.
    pub fn break_long_edges(&mut self, shell: ShellKey, tol: &Tolerance) -> Result<usize> {
        let _span = tracing::debug_span!("break_long_edges", ?shell).entered();
        let verts = self.shell_vertices(shell);
        let mut splits = 0;

        'restart: loop {
            let eus: Vec<EdgeUseKey> = self
                .shell_edgeuses(shell)
                .into_iter()
                .filter(|&eu| self.find_fu_of_eu(eu).is_some())
                .collect();
            for eu in eus {
                let (Some(a), Some(b)) = (self.eu_vertex(eu), self.eu_end_vertex(eu)) else {
                    continue;
                };
                let Some((pa, pb)) = self.eu_points(eu) else {
                    continue;
                };
                let dir = pb - pa;
                let len = dir.norm();
                if len < tol.dist {
                    continue;
                }
                let unit = dir / len;
                let hit = verts.iter().copied().find(|&v| {
                    if v == a || v == b {
                        return false;
                    }
                    let Some(p) = self.vertex_point(v) else {
                        return false;
                    };
                    let t = (p - pa).dot(&unit);
                    if t <= tol.dist || t >= len - tol.dist {
                        return false;
                    }
                    (p - (pa + unit * t)).norm_squared() < tol.dist_sq
                });
                if let Some(v) = hit {
                    let eu2 = self.esplit(v, eu)?;
                    splits += 1;
                    for piece in [eu, eu2] {
                        self.join_matching_edges(piece, |m, other| {
                            m.find_fu_of_eu(other).is_some() && m.find_s_of_eu(other) == Some(shell)
                        })?;
                    }
                    continue 'restart;
                }
            }
            break;
        }
        tracing::debug!(splits, "broke long edges");
        Ok(splits)
    }

    /// Splits the edge of `eu` at `v` for every face using it.
    ///
    /// Each use pair on the edge is split with [`Model::esplit`] and the two
    /// halves are joined radially again within the shell, so the split edge
    /// keeps its radial faces. Returns the piece `v -> B` that follows `eu`.
    pub fn esplit_edge(&mut self, v: VertexKey, eu: EdgeUseKey) -> Result<EdgeUseKey> {
        let a = self.eu_vertex(eu).ok_or(Error::EdgeUseNotFound(eu))?;
        let shell = self.find_s_of_eu(eu);
        let edge = self.get_eu(eu)?.edge;
        let reps: Vec<EdgeUseKey> = self
            .edge_uses(edge)
            .into_iter()
            .filter(|&u| u != eu && self.eu_vertex(u) == Some(a))
            .collect();

        let piece = self.esplit(v, eu)?;
        for rep in reps {
            self.esplit(v, rep)?;
        }
        for half in [eu, piece] {
            self.join_matching_edges(half, |m, other| m.find_s_of_eu(other) == shell)?;
        }
        tracing::trace!(?eu, ?piece, "split edge radially");
        Ok(piece)
    }

    /// Joins vertex `gone` into `keep`: every use of `gone` moves to `keep`
    /// and `gone` is removed.
    pub fn jv(&mut self, keep: VertexKey, gone: VertexKey) -> Result<()> {
        if keep == gone {
            return Ok(());
        }
        if !self.vertices.contains_key(keep) {
            return Err(Error::VertexNotFound(keep));
        }
        let uses = self
            .vertices
            .get(gone)
            .ok_or(Error::VertexNotFound(gone))?
            .uses
            .clone();
        for vu in uses {
            self.move_vertexuse(vu, keep)?;
        }
        tracing::trace!(?keep, ?gone, "joined vertices");
        Ok(())
    }

    /// Cuts a face loop in two with a new edge from the start of `eu1` to the
    /// start of `eu2`.
    ///
    /// The edgeuses from `eu1` up to (not including) `eu2` move to a new loop
    /// in the same faceuse, closed by the new edge; the rest stay in the old
    /// loop, closed by the other use of that edge. Both loops keep the old
    /// orientation. Returns the new loopuse.
    pub fn cut_loop(&mut self, eu1: EdgeUseKey, eu2: EdgeUseKey) -> Result<LoopUseKey> {
        let EdgeUseParent::Loop(lu) = self.get_eu(eu1)?.parent else {
            return Err(Error::WireEdge(eu1));
        };
        if self.get_eu(eu2)?.parent != EdgeUseParent::Loop(lu) {
            return Err(Error::Degenerate("edgeuses are in different loops"));
        }
        let ld = self.get_lu(lu)?;
        let (lu_mate, orientation) = (ld.mate, ld.orientation);
        let LoopUseParent::Face(fu) = ld.parent else {
            return Err(Error::Degenerate("cannot cut a wire loop"));
        };
        let fu_mate = self.get_fu(fu)?.mate;
        let eus = self.loop_edgeuses(lu).to_vec();
        let n = eus.len();
        let i = eus.iter().position(|&e| e == eu1).ok_or(Error::EdgeUseNotFound(eu1))?;
        let j = eus.iter().position(|&e| e == eu2).ok_or(Error::EdgeUseNotFound(eu2))?;
        let v1 = self.eu_vertex(eu1).ok_or(Error::EdgeUseNotFound(eu1))?;
        let v2 = self.eu_vertex(eu2).ok_or(Error::EdgeUseNotFound(eu2))?;
        if i == j || v1 == v2 {
            return Err(Error::Degenerate("loop cut would make a zero-length edge"));
        }

        let a_len = (j + n - i) % n;
        let piece_a: Vec<EdgeUseKey> = (0..a_len).map(|k| eus[(i + k) % n]).collect();
        let piece_b: Vec<EdgeUseKey> = (0..n - a_len).map(|k| eus[(j + k) % n]).collect();
        let mates = |m: &Model, piece: &[EdgeUseKey]| -> Result<Vec<EdgeUseKey>> {
            piece.iter().rev().map(|&e| Ok(m.get_eu(e)?.mate)).collect()
        };
        let mates_a = mates(self, &piece_a)?;
        let mates_b = mates(self, &piece_b)?;

        let lp = self.loops.insert(LoopData {
            lu: LoopUseKey::default(),
            bbox: None,
        });
        let lu_new = self.loopuses.insert(LoopUseData {
            parent: LoopUseParent::Face(fu),
            mate: LoopUseKey::default(),
            lp,
            orientation,
            down: LoopUseDown::Edges(Vec::new()),
        });
        let lu_new_mate = self.loopuses.insert(LoopUseData {
            parent: LoopUseParent::Face(fu_mate),
            mate: lu_new,
            lp,
            orientation,
            down: LoopUseDown::Edges(Vec::new()),
        });
        self.get_lu_mut(lu_new)?.mate = lu_new_mate;
        if let Some(l) = self.loops.get_mut(lp) {
            l.lu = lu_new;
        }

        let (ca, ca_mate) = self.new_edge_pair(
            v2,
            v1,
            EdgeUseParent::Loop(lu_new),
            EdgeUseParent::Loop(lu_new_mate),
        )?;
        let (cb, cb_mate) =
            self.new_edge_pair(v1, v2, EdgeUseParent::Loop(lu), EdgeUseParent::Loop(lu_mate))?;

        for &e in &piece_a {
            self.get_eu_mut(e)?.parent = EdgeUseParent::Loop(lu_new);
        }
        for &e in &mates_a {
            self.get_eu_mut(e)?.parent = EdgeUseParent::Loop(lu_new_mate);
        }

        let mut down_new = piece_a;
        down_new.push(ca);
        let mut down_new_mate = vec![ca_mate];
        down_new_mate.extend(mates_a);
        let mut down_old = piece_b;
        down_old.push(cb);
        let mut down_old_mate = vec![cb_mate];
        down_old_mate.extend(mates_b);

        self.get_lu_mut(lu_new)?.down = LoopUseDown::Edges(down_new);
        self.get_lu_mut(lu_new_mate)?.down = LoopUseDown::Edges(down_new_mate);
        self.get_lu_mut(lu)?.down = LoopUseDown::Edges(down_old);
        self.get_lu_mut(lu_mate)?.down = LoopUseDown::Edges(down_old_mate);
        self.get_fu_mut(fu)?.loopuses.push(lu_new);
        self.get_fu_mut(fu_mate)?.loopuses.push(lu_new_mate);

        self.radial_join(ca, cb)?;
        tracing::trace!(?lu, ?lu_new, "cut loop");
        Ok(lu_new)
    }

    // --- Moving elements between owners ---

    /// Moves a loop (and its mate) from `src` to `dest`.
    ///
    /// Returns `true` if `src` has no loops left, which tells the caller to
    /// kill it. `lu` must belong to `src`.
    pub fn move_lu_between_fus(
        &mut self,
        dest: FaceUseKey,
        src: FaceUseKey,
        lu: LoopUseKey,
    ) -> Result<bool> {
        let ld = self.get_lu(lu)?;
        if ld.parent != LoopUseParent::Face(src) {
            tracing::error!(?lu, ?src, parent = ?ld.parent, "loopuse is not a child of faceuse");
            return Err(Error::ParentMismatch { lu, claimed: src });
        }
        let lu_mate = ld.mate;
        let src_mate = self.get_fu(src)?.mate;
        let dest_mate = self.get_fu(dest)?.mate;
        if dest == src {
            return Ok(false);
        }

        self.get_fu_mut(src)?.loopuses.retain(|&l| l != lu);
        self.get_fu_mut(src_mate)?.loopuses.retain(|&l| l != lu_mate);
        self.get_fu_mut(dest)?.loopuses.push(lu);
        self.get_fu_mut(dest_mate)?.loopuses.push(lu_mate);
        self.get_lu_mut(lu)?.parent = LoopUseParent::Face(dest);
        self.get_lu_mut(lu_mate)?.parent = LoopUseParent::Face(dest_mate);

        Ok(self.get_fu(src)?.loopuses.is_empty())
    }

    /// Moves a face (both uses) into another shell.
    pub fn mv_fu_between_shells(&mut self, dest: ShellKey, fu: FaceUseKey) -> Result<()> {
        self.get_shell(dest)?;
        let d = self.get_fu(fu)?;
        let (src, mate) = (d.shell, d.mate);
        if src == dest {
            return Ok(());
        }
        self.get_shell_mut(src)?
            .faceuses
            .retain(|&f| f != fu && f != mate);
        let sd = self.get_shell_mut(dest)?;
        sd.faceuses.push(fu);
        sd.faceuses.push(mate);
        self.get_fu_mut(fu)?.shell = dest;
        self.get_fu_mut(mate)?.shell = dest;
        Ok(())
    }

    /// Moves a shell into another region.
    pub fn mv_shell_to_region(&mut self, shell: ShellKey, region: RegionKey) -> Result<()> {
        if !self.regions.contains_key(region) {
            return Err(Error::RegionNotFound(region));
        }
        let src = self.get_shell(shell)?.region;
        if src == region {
            return Ok(());
        }
        self.get_region_mut(src)?.shells.retain(|&s| s != shell);
        self.get_region_mut(region)?.shells.push(shell);
        self.get_shell_mut(shell)?.region = region;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector3};

    fn square(m: &mut Model, s: ShellKey, z: f64) -> FaceUseKey {
        m.cface_from_points(
            s,
            &[
                Point3::new(0.0, 0.0, z),
                Point3::new(1.0, 0.0, z),
                Point3::new(1.0, 1.0, z),
                Point3::new(0.0, 1.0, z),
            ],
        )
        .unwrap()
    }

    #[test]
    fn reverse_face_keeps_use_normals() {
        let mut m = Model::new();
        let (_r, s) = m.mrsv();
        let fu = square(&mut m, s, 0.0);
        m.fu_planeeqn(fu, &Tolerance::default()).unwrap();
        m.reverse_face(fu).unwrap();
        assert_eq!(m.faceuse(fu).unwrap().orientation, Orientation::Opposite);
        assert_relative_eq!(m.faceuse_normal(fu).unwrap(), Vector3::z());
        let front = m.same_use(fu).unwrap();
        assert_relative_eq!(m.faceuse_normal(front).unwrap(), -Vector3::z());
    }

    #[test]
    fn esplit_inserts_after_and_keeps_loop_closed() {
        let mut m = Model::new();
        let (_r, s) = m.mrsv();
        let fu = square(&mut m, s, 0.0);
        let lu = m.faceuse(fu).unwrap().loopuses[0];
        let eu = m.loop_edgeuses(lu)[0];
        let b = m.eu_end_vertex(eu).unwrap();
        let mid = m.add_vertex(Point3::new(0.5, 0.0, 0.0));

        let eu2 = m.esplit(mid, eu).unwrap();
        assert_eq!(m.eu_end_vertex(eu), Some(mid));
        assert_eq!(m.eu_vertex(eu2), Some(mid));
        assert_eq!(m.eu_end_vertex(eu2), Some(b));
        assert_eq!(m.eu_next(eu), Some(eu2));
        assert_eq!(m.loop_edgeuses(lu).len(), 5);

        let lu_mate = m.loopuse(lu).unwrap().mate;
        assert_eq!(m.loop_edgeuses(lu_mate).len(), 5);
        for &e in m.loop_edgeuses(lu_mate) {
            let next = m.eu_next(e).unwrap();
            assert_eq!(m.eu_end_vertex(e), m.eu_vertex(next));
        }
        assert!(m.check_model().is_empty());
    }

    #[test]
    fn esplit_wire_edge() {
        let mut m = Model::new();
        let (_r, s) = m.mrsv();
        let a = m.add_vertex(Point3::origin());
        let b = m.add_vertex(Point3::new(2.0, 0.0, 0.0));
        let v = m.add_vertex(Point3::new(1.0, 0.0, 0.0));
        let eu = m.me_wire(s, a, b).unwrap();
        let eu2 = m.esplit(v, eu).unwrap();
        assert_eq!(m.shell(s).unwrap().wire_edgeuses.len(), 4);
        assert_eq!(m.eu_end_vertex(eu), Some(v));
        assert_eq!(m.eu_end_vertex(eu2), Some(b));
        assert!(m.check_model().is_empty());
    }

    #[test]
    fn esplit_rejects_endpoint() {
        let mut m = Model::new();
        let (_r, s) = m.mrsv();
        let fu = square(&mut m, s, 0.0);
        let lu = m.faceuse(fu).unwrap().loopuses[0];
        let eu = m.loop_edgeuses(lu)[0];
        let a = m.eu_vertex(eu).unwrap();
        assert!(matches!(m.esplit(a, eu), Err(Error::Degenerate(_))));
    }

    #[test]
    fn move_lu_checks_parent() {
        let mut m = Model::new();
        let (_r, s) = m.mrsv();
        let f1 = square(&mut m, s, 0.0);
        let f2 = square(&mut m, s, 1.0);
        let lu2 = m.faceuse(f2).unwrap().loopuses[0];

        assert!(matches!(
            m.move_lu_between_fus(f2, f1, lu2),
            Err(Error::ParentMismatch { .. })
        ));
        assert!(m.move_lu_between_fus(f1, f2, lu2).unwrap());
        assert_eq!(m.faceuse(f1).unwrap().loopuses.len(), 2);
        let mate = m.faceuse(f1).unwrap().mate;
        assert_eq!(m.faceuse(mate).unwrap().loopuses.len(), 2);
        assert_eq!(m.find_fu_of_lu(lu2), Some(f1));
    }

    #[test]
    fn move_face_and_shell() {
        let mut m = Model::new();
        let (r, s) = m.mrsv();
        let fu = square(&mut m, s, 0.0);
        let s2 = m.msv(r).unwrap();
        m.mv_fu_between_shells(s2, fu).unwrap();
        assert!(m.shell(s).unwrap().faceuses.is_empty());
        assert_eq!(m.shell(s2).unwrap().faceuses.len(), 2);

        let (r2, _) = m.mrsv();
        m.mv_shell_to_region(s2, r2).unwrap();
        assert_eq!(m.shell(s2).unwrap().region, r2);
        assert_eq!(m.region(r).unwrap().shells, vec![s]);
    }

    #[test]
    fn break_long_edges_splits_at_t_junction() {
        let mut m = Model::new();
        let (_r, s) = m.mrsv();
        // A long bottom edge with two small squares sitting on top of it.
        let a = m.add_vertex(Point3::new(0.0, 0.0, 0.0));
        let b = m.add_vertex(Point3::new(2.0, 0.0, 0.0));
        let c = m.add_vertex(Point3::new(2.0, 0.0, -1.0));
        let d = m.add_vertex(Point3::new(0.0, 0.0, -1.0));
        let mid = m.add_vertex(Point3::new(1.0, 0.0, 0.0));
        let top_l = m.add_vertex(Point3::new(0.0, 0.0, 1.0));
        let top_m = m.add_vertex(Point3::new(1.0, 0.0, 1.0));
        let top_r = m.add_vertex(Point3::new(2.0, 0.0, 1.0));
        m.cface(s, &[a, d, c, b]).unwrap();
        m.cface(s, &[a, mid, top_m, top_l]).unwrap();
        m.cface(s, &[mid, b, top_r, top_m]).unwrap();

        let splits = m.break_long_edges(s, &Tolerance::default()).unwrap();
        assert_eq!(splits, 1);
        let eu = m.findeu(a, mid, Some(s), None, false).unwrap();
        assert_eq!(m.radial_face_count(eu, Some(s)), 2);
        assert!(m.check_model().is_empty());
    }

    #[test]
    fn cut_loop_splits_square_into_triangles() {
        let mut m = Model::new();
        let (_r, s) = m.mrsv();
        let fu = square(&mut m, s, 0.0);
        let lu = m.faceuse(fu).unwrap().loopuses[0];
        let eus = m.loop_edgeuses(lu).to_vec();
        let verts = m.loop_vertices(lu);

        let lu_new = m.cut_loop(eus[0], eus[2]).unwrap();
        assert_eq!(m.loop_vertices(lu_new), vec![verts[0], verts[1], verts[2]]);
        assert_eq!(m.loop_vertices(lu), vec![verts[2], verts[3], verts[0]]);
        assert_eq!(m.faceuse(fu).unwrap().loopuses.len(), 2);
        assert!(m.check_model().is_empty());

        let new_fu = m.mk_new_face_from_loop(lu_new).unwrap();
        assert_eq!(m.face_count(), 2);
        assert_eq!(m.edge_count(), 5);
        let diagonal = m.loop_edgeuses(lu_new)[2];
        assert_eq!(m.radial_face_count(diagonal, Some(s)), 2);
        assert_ne!(m.find_fu_of_eu(diagonal), Some(fu));
        assert_eq!(m.find_fu_of_eu(diagonal), Some(new_fu));
        assert!(m.check_model().is_empty());
    }

    #[test]
    fn cut_loop_rejects_adjacent_start() {
        let mut m = Model::new();
        let (_r, s) = m.mrsv();
        let fu = square(&mut m, s, 0.0);
        let lu = m.faceuse(fu).unwrap().loopuses[0];
        let eu = m.loop_edgeuses(lu)[1];
        assert!(matches!(m.cut_loop(eu, eu), Err(Error::Degenerate(_))));
    }

    #[test]
    fn jv_merges_uses() {
        let mut m = Model::new();
        let (_r, s) = m.mrsv();
        let a = m.add_vertex(Point3::new(0.0, 0.0, 0.0));
        let b = m.add_vertex(Point3::new(1.0, 0.0, 0.0));
        let c = m.add_vertex(Point3::new(0.0, 1.0, 0.0));
        let c2 = m.add_vertex(Point3::new(0.0, 1.0, 0.001));
        let d = m.add_vertex(Point3::new(-1.0, 0.0, 0.0));
        m.cface(s, &[a, b, c]).unwrap();
        m.cface(s, &[a, c2, d]).unwrap();

        m.jv(c, c2).unwrap();
        assert!(m.vertex(c2).is_none());
        assert_eq!(m.vertex(c).unwrap().uses.len(), 4);
        assert_eq!(m.vertex_count(), 4);
        assert!(matches!(m.jv(c, c2), Err(Error::VertexNotFound(_))));
        assert!(m.check_model().is_empty());
    }

    #[test]
    fn esplit_edge_keeps_both_faces_on_the_edge() {
        let mut m = Model::new();
        let (_r, s) = m.mrsv();
        let a = m.add_vertex(Point3::new(0.0, 0.0, 0.0));
        let b = m.add_vertex(Point3::new(1.0, 0.0, 0.0));
        let c = m.add_vertex(Point3::new(0.0, 1.0, 0.0));
        let d = m.add_vertex(Point3::new(0.0, 0.0, 1.0));
        let f1 = m.cface(s, &[a, b, c]).unwrap();
        let f2 = m.cface(s, &[b, a, d]).unwrap();
        m.glue_faces(&[f1, f2]).unwrap();
        let eu = m.findeu(a, b, Some(s), None, false).unwrap();
        assert_eq!(m.radial_face_count(eu, Some(s)), 2);

        let mid = m.add_vertex(Point3::new(0.5, 0.0, 0.0));
        let piece = m.esplit_edge(mid, eu).unwrap();
        assert_eq!(m.eu_vertex(piece), Some(mid));
        assert_eq!(m.radial_face_count(eu, Some(s)), 2);
        assert_eq!(m.radial_face_count(piece, Some(s)), 2);
        assert_eq!(m.edge_count(), 6);
        assert!(m.check_model().is_empty());
    }
}
