// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Moving vertices back onto the faces that meet at them.
//!
//! After a face plane changes, the vertices on that face no longer satisfy
//! every plane they sit on. [`Model::in_vert`] puts a vertex back where its
//! faces meet. Up to three independent planes fix a point directly. With
//! more, the vertex is pulled apart along the lines where neighbouring faces
//! meet, and new faces are cut where the pieces no longer share a plane.

use nalgebra::{Point3, Vector3};

use crate::arena::*;
use crate::error::{Error, Result};
use crate::geometry::{
    coplanar, dist_line3_line3, isect_2planes, isect_lseg3_lseg3, mkpoint_3planes,
    pt3_pt3_equal, three_pts_collinear, Coplanarity, LineLine, Plane, Tolerance,
};
use crate::keys::*;

/// Distinct face planes meeting at a vertex.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VertexFaces {
    pub faces: Vec<FaceKey>,
    /// Faces whose edge into or out of the vertex is free.
    pub free_edges: usize,
}

/// Where two neighbouring faces around a vertex meet.
#[derive(Debug, Clone)]
struct EdgeLine {
    /// Faces before and after the line, going around the vertex. `None` on
    /// the open side of a free edge.
    faces: [Option<FaceUseKey>; 2],
    /// Use of the edge at the vertex. Runs away from the vertex, except on a
    /// leading free edge where it runs into it.
    eu: EdgeUseKey,
    start: Point3<f64>,
    dir: Vector3<f64>,
    pt: Point3<f64>,
    /// Vertex placed on the line at `pt`.
    vp: Option<VertexKey>,
    free: bool,
}

impl EdgeLine {
    fn shares_face(&self, other: &EdgeLine) -> bool {
        self.faces
            .iter()
            .flatten()
            .any(|f| other.faces.contains(&Some(*f)))
    }
}

/// Pairs that are not neighbours across a face: the wrap-around pair of an
/// open fan, or two free edges.
fn open_pair(lines: &[EdgeLine], i: usize, j: usize) -> bool {
    let (a, b) = (&lines[i], &lines[j]);
    (j == 0 && (a.free || b.free)) || (a.free && b.free)
}

impl Model {
    fn fu_plane(&self, fu: FaceUseKey) -> Result<Plane> {
        self.faceuse_plane(fu)
            .ok_or(Error::Degenerate("face has no plane"))
    }

    /// Front faceuses touching `v`, each listed once.
    fn same_faceuses_at(&self, v: VertexKey) -> Result<Vec<FaceUseKey>> {
        let uses = &self.vertices.get(v).ok_or(Error::VertexNotFound(v))?.uses;
        let mut out = Vec::new();
        for &vu in uses {
            let fu = match self.get_vu(vu)?.parent {
                VertexUseParent::EdgeUse(eu) => self.find_fu_of_eu(eu),
                VertexUseParent::LoopUse(lu) => self.find_fu_of_lu(lu),
                VertexUseParent::Shell(_) => None,
            };
            if let Some(fu) = fu {
                if self.get_fu(fu)?.orientation == Orientation::Same && !out.contains(&fu) {
                    out.push(fu);
                }
            }
        }
        Ok(out)
    }

    /// Front-side edgeuses leaving `v`.
    fn out_eus_at(&self, v: VertexKey) -> Result<Vec<EdgeUseKey>> {
        let uses = &self.vertices.get(v).ok_or(Error::VertexNotFound(v))?.uses;
        let mut out = Vec::new();
        for &vu in uses {
            let VertexUseParent::EdgeUse(eu) = self.get_vu(vu)?.parent else {
                continue;
            };
            let front = self
                .find_fu_of_eu(eu)
                .and_then(|fu| self.faceuses.get(fu))
                .is_some_and(|d| d.orientation == Orientation::Same);
            if front {
                out.push(eu);
            }
        }
        Ok(out)
    }

    /// Stores a plane for every face at `v` that only has one implied by its
    /// loop, so that moving vertices does not tilt it.
    fn pin_face_planes(&mut self, v: VertexKey, tol: &Tolerance) -> Result<()> {
        for fu in self.same_faceuses_at(v)? {
            let face = self.get_fu(fu)?.face;
            if self.get_face(face)?.plane.is_none() {
                if let Err(e) = self.fu_planeeqn(fu, tol) {
                    tracing::warn!(?fu, %e, "face plane left unset");
                }
            }
        }
        Ok(())
    }

    fn kill_eu_and_empty_parents(&mut self, eu: EdgeUseKey) -> Result<()> {
        let lu = self.find_lu_of_eu(eu);
        if !self.keu(eu)?.parent_now_empty() {
            return Ok(());
        }
        if let Some(lu) = lu {
            let fu = self.find_fu_of_lu(lu);
            if self.klu(lu)?.parent_now_empty() {
                if let Some(fu) = fu {
                    let _ = self.kfu(fu)?;
                }
            }
        }
        Ok(())
    }

    /// Lists the distinct face planes at `v`.
    ///
    /// Faces coplanar with one already listed are skipped. For each face kept,
    /// a free edge leaving or entering `v` in that face counts once.
    pub fn find_isect_faces(&self, v: VertexKey, tol: &Tolerance) -> Result<VertexFaces> {
        let uses = &self.vertices.get(v).ok_or(Error::VertexNotFound(v))?.uses;
        let mut out = VertexFaces::default();
        let mut planes: Vec<Plane> = Vec::new();
        for &vu in uses {
            let parent = self.get_vu(vu)?.parent;
            let fu = match parent {
                VertexUseParent::EdgeUse(eu) => self.find_fu_of_eu(eu),
                VertexUseParent::LoopUse(lu) => self.find_fu_of_lu(lu),
                VertexUseParent::Shell(_) => None,
            };
            let Some(fu) = fu else { continue };
            let fd = self.get_fu(fu)?;
            if fd.orientation != Orientation::Same || out.faces.contains(&fd.face) {
                continue;
            }
            let face = fd.face;
            let plane = self.fu_plane(fu)?;
            let repeat = planes.iter().any(|p| {
                matches!(
                    coplanar(p, &plane, tol),
                    Coplanarity::Coplanar | Coplanarity::CoplanarOpposite
                )
            });
            if repeat {
                continue;
            }
            out.faces.push(face);
            planes.push(plane);
            if let VertexUseParent::EdgeUse(eu) = parent {
                let prev_free = self.eu_prev(eu).is_some_and(|p| self.is_free_edge(p));
                if self.is_free_edge(eu) || prev_free {
                    out.free_edges += 1;
                }
            }
        }
        Ok(out)
    }

    /// Moves `v` to the point fixed by up to three face planes.
    ///
    /// One plane projects the vertex onto it; two move it to the nearest
    /// point on their line of intersection; three move it to their common
    /// point.
    pub fn simple_vertex_solve(&mut self, v: VertexKey, faces: &[FaceKey]) -> Result<()> {
        let p = self.get_point(v)?;
        let planes = faces
            .iter()
            .map(|&f| {
                let fu = self.get_face(f)?.fu;
                self.fu_plane(fu)
            })
            .collect::<Result<Vec<_>>>()?;
        let new = match planes.as_slice() {
            [] => return Err(Error::Degenerate("vertex has no faces to solve against")),
            [a] => p - a.normal * a.distance(&p),
            [a, b] => {
                let third = Plane::from_point_normal(&p, &a.normal.cross(&b.normal))
                    .ok_or(Error::Degenerate("parallel faces at vertex"))?;
                mkpoint_3planes(a, b, &third)
                    .ok_or(Error::Degenerate("parallel faces at vertex"))?
            }
            [a, b, c] => mkpoint_3planes(a, b, c)
                .ok_or(Error::Degenerate("faces at vertex do not meet in a point"))?,
            _ => return Err(Error::Degenerate("more than three faces at vertex")),
        };
        tracing::trace!(?v, from = ?p, to = ?new, "solved vertex");
        self.set_vertex_point(v, new)
    }

    /// Returns `true` if `v` lies on the plane of every face that uses it.
    pub fn vert_on_fus(&self, v: VertexKey, tol: &Tolerance) -> bool {
        let (Ok(p), Ok(fus)) = (self.get_point(v), self.same_faceuses_at(v)) else {
            return false;
        };
        let mut on = true;
        for fu in fus {
            let Some(plane) = self.faceuse_plane(fu) else {
                continue;
            };
            let dist = plane.distance(&p);
            if dist.abs() > tol.dist {
                tracing::debug!(?v, ?fu, dist, "vertex off face plane");
                on = false;
            }
        }
        on
    }

    /// Moves `v` to where the faces using it meet.
    ///
    /// Faces without a stored plane get one from their loop first. Vertices
    /// with few enough distinct planes are solved directly; otherwise the
    /// vertex is rebuilt by [`Model::complex_vertex_solve`].
    pub fn in_vert(&mut self, v: VertexKey, tol: &Tolerance) -> Result<()> {
        let _span = tracing::debug_span!("in_vert", ?v).entered();
        self.pin_face_planes(v, tol)?;
        let found = self.find_isect_faces(v, tol)?;
        let n = found.faces.len();
        tracing::debug!(faces = n, free = found.free_edges, "faces at vertex");
        if (n < 4 && found.free_edges == 0) || n < 3 {
            self.simple_vertex_solve(v, &found.faces)
        } else {
            self.complex_vertex_solve(v, tol)
        }
    }

    /// Rebuilds the neighbourhood of a vertex where more than three planes
    /// meet.
    ///
    /// Each edge at `v` is replaced by the line where its two faces now meet,
    /// and a new vertex is placed on that line as far out as the neighbouring
    /// lines allow. `v` moves to the middle of those points, coincident and
    /// collinear lines are fused, and a triangular face is cut off wherever
    /// two neighbouring points and `v` no longer lie in one of the old faces.
    pub fn complex_vertex_solve(&mut self, v: VertexKey, tol: &Tolerance) -> Result<()> {
        let _span = tracing::debug_span!("complex_vertex_solve", ?v).entered();
        let mut lines = self.edge_lines(v)?;
        self.max_edge_inters(&mut lines, tol)?;
        self.split_edges_at_pts(v, &mut lines, tol)?;
        self.fix_crossed_loops(v, &lines, tol)?;
        self.calc_new_v(v, &lines, tol)?;
        self.remove_short_eus_inter(v, &mut lines, tol)?;
        self.simplify_inter(v, &mut lines, tol)?;
        self.make_faces_at_vert(v, &mut lines, tol)?;
        self.kill_cracks_at_vertex(v)?;
        tracing::debug!(lines = lines.len(), "rebuilt vertex");
        Ok(())
    }

    /// Line along a free edge at `v`, lying in the plane of its one face.
    fn free_line(
        &self,
        v: VertexKey,
        eu: EdgeUseKey,
        faces: [Option<FaceUseKey>; 2],
    ) -> Result<EdgeLine> {
        let fu = faces
            .iter()
            .flatten()
            .next()
            .copied()
            .ok_or(Error::WireEdge(eu))?;
        let plane = self.fu_plane(fu)?;
        let pv = self.get_point(v)?;
        let far = if self.eu_vertex(eu) == Some(v) {
            self.eu_end_vertex(eu)
        } else {
            self.eu_vertex(eu)
        }
        .ok_or(Error::EdgeUseNotFound(eu))?;
        let along = self.get_point(far)? - pv;
        let dir = (along - plane.normal * plane.normal.dot(&along))
            .try_normalize(1e-12)
            .ok_or(Error::Degenerate("free edge is normal to its face"))?;
        let start = pv - plane.normal * plane.distance(&pv);
        Ok(EdgeLine {
            faces,
            eu,
            start,
            dir,
            pt: start,
            vp: None,
            free: true,
        })
    }

    /// Walks the faces around `v` in order, one [`EdgeLine`] per edge.
    ///
    /// An open fan starts at the face whose incoming edge is free and ends at
    /// a free outgoing edge.
    fn edge_lines(&self, v: VertexKey) -> Result<Vec<EdgeLine>> {
        let pv = self.get_point(v)?;
        let outs = self.out_eus_at(v)?;
        let mut lines = Vec::new();
        let dangling = outs.iter().find_map(|&eu| {
            let prev = self.eu_prev(eu)?;
            self.is_free_edge(prev).then_some((eu, prev))
        });
        let first = match dangling {
            Some((out, prev)) => {
                let fu = self.find_fu_of_eu(prev).ok_or(Error::WireEdge(prev))?;
                lines.push(self.free_line(v, prev, [None, Some(fu)])?);
                out
            }
            None => *outs
                .first()
                .ok_or(Error::Degenerate("vertex has no face edges"))?,
        };

        let mut eu = first;
        for _ in 0..=outs.len() {
            if self.eu_vertex(eu) != Some(v) {
                return Err(Error::Degenerate("faces at vertex are not consistently oriented"));
            }
            let fu1 = self.find_fu_of_eu(eu).ok_or(Error::WireEdge(eu))?;
            if self.is_free_edge(eu) {
                lines.push(self.free_line(v, eu, [Some(fu1), None])?);
                return Ok(lines);
            }
            let radial = self.get_eu(eu)?.radial;
            let fu2 = self
                .find_fu_of_eu(radial)
                .filter(|&f| {
                    self.faceuses
                        .get(f)
                        .is_some_and(|d| d.orientation == Orientation::Same)
                })
                .ok_or(Error::Degenerate("faces at vertex are not consistently oriented"))?;
            if self.get_fu(fu1)?.face == self.get_fu(fu2)?.face {
                return Err(Error::Degenerate("edge at vertex joins two loops of one face"));
            }
            let (_, far) = self.eu_points(eu).ok_or(Error::EdgeUseNotFound(eu))?;
            let (start, mut dir) = isect_2planes(&self.fu_plane(fu1)?, &self.fu_plane(fu2)?, &pv)
                .ok_or(Error::Degenerate("neighbouring faces at vertex are parallel"))?;
            if dir.dot(&(far - pv)) < 0.0 {
                dir = -dir;
            }
            lines.push(EdgeLine {
                faces: [Some(fu1), Some(fu2)],
                eu,
                start,
                dir,
                pt: start,
                vp: None,
                free: false,
            });
            eu = self.eu_next(radial).ok_or(Error::WireEdge(radial))?;
            if eu == first {
                return Ok(lines);
            }
        }
        Err(Error::Degenerate("faces around vertex do not close"))
    }

    /// Places each line's point at the farthest crossing with its neighbours.
    fn max_edge_inters(&self, lines: &mut [EdgeLine], tol: &Tolerance) -> Result<()> {
        let n = lines.len();
        if n < 2 {
            return Ok(());
        }
        for i in 0..n {
            let mut best: Option<f64> = None;
            for j in [(i + 1) % n, (i + n - 1) % n] {
                if j == i || !lines[i].shares_face(&lines[j]) {
                    continue;
                }
                let (a, b) = (&lines[i], &lines[j]);
                match dist_line3_line3(&a.start, &a.dir, &b.start, &b.dir, tol)? {
                    LineLine::Intersect { t1, .. } | LineLine::Skew { t1, .. } => {
                        best = Some(best.map_or(t1, |t| t.max(t1)));
                    }
                    LineLine::Collinear | LineLine::ParallelDistinct => {}
                }
            }
            let line = &mut lines[i];
            line.pt = best.map_or(line.start, |t| line.start + line.dir * t);
        }
        Ok(())
    }

    fn split_edges_at_pts(
        &mut self,
        v: VertexKey,
        lines: &mut [EdgeLine],
        tol: &Tolerance,
    ) -> Result<()> {
        let pv = self.get_point(v)?;
        for line in lines.iter_mut() {
            if pt3_pt3_equal(&line.pt, &pv, tol) {
                line.vp = None;
                continue;
            }
            let vp = self.add_vertex(line.pt);
            let piece = self.esplit_edge(vp, line.eu)?;
            if line.faces[0].is_none() {
                line.eu = piece;
            }
            line.vp = Some(vp);
        }
        Ok(())
    }

    /// The edge left beyond a line's vertex, as `(vp, far end)`.
    fn line_segment(&self, line: &EdgeLine) -> Option<(Point3<f64>, Point3<f64>)> {
        let vp = line.vp?;
        let far = if line.faces[0].is_none() {
            self.eu_vertex(self.eu_prev(line.eu)?)?
        } else {
            self.eu_end_vertex(self.eu_next(line.eu)?)?
        };
        Some((self.vertex_point(vp)?, self.vertex_point(far)?))
    }

    /// Where the edges beyond two neighbouring line vertices cross inside
    /// their shared face, moves both vertices to the crossing.
    fn fix_crossed_loops(&mut self, v: VertexKey, lines: &[EdgeLine], tol: &Tolerance) -> Result<()> {
        let n = lines.len();
        if n < 2 {
            return Ok(());
        }
        for i in 0..n {
            let j = (i + 1) % n;
            let Some(fu) = lines[i].faces[1] else {
                continue;
            };
            if lines[j].faces[0] != Some(fu) {
                continue;
            }
            let (Some((ai, bi)), Some((aj, bj))) =
                (self.line_segment(&lines[i]), self.line_segment(&lines[j]))
            else {
                continue;
            };
            let plane = self.fu_plane(fu)?;
            let onto = |p: Point3<f64>| p - plane.normal * plane.distance(&p);
            let (ai, bi, aj, bj) = (onto(ai), onto(bi), onto(aj), onto(bj));
            let (di, dj) = (bi - ai, bj - aj);
            let Some((fi, fj)) = isect_lseg3_lseg3(&ai, &di, &aj, &dj, tol) else {
                continue;
            };
            if fi * di.norm() <= tol.dist || fj * dj.norm() <= tol.dist {
                continue;
            }
            let p = ai + di * fi;
            for vp in [lines[i].vp, lines[j].vp].into_iter().flatten() {
                self.set_vertex_point(vp, p)?;
            }
            if lines[i].free && lines[j].free {
                self.set_vertex_point(v, p)?;
            }
            tracing::debug!(i, j, ?p, "uncrossed edges at vertex");
        }
        Ok(())
    }

    fn vp_point(&self, line: &EdgeLine) -> Option<Point3<f64>> {
        line.vp.and_then(|k| self.vertex_point(k))
    }

    /// Moves `v` to the middle of the distinct line vertices, or between the
    /// two free edges of an open fan.
    fn calc_new_v(&mut self, v: VertexKey, lines: &[EdgeLine], tol: &Tolerance) -> Result<()> {
        let free = lines.iter().filter(|l| l.free).count();
        if free > 2 {
            return Err(Error::Degenerate("more than two free edges at vertex"));
        }
        let free_pts: Vec<Point3<f64>> = lines
            .iter()
            .filter(|l| l.free)
            .filter_map(|l| self.vp_point(l))
            .collect();
        let new = match free_pts.as_slice() {
            [a, b] if free == 2 => Point3::from((a.coords + b.coords) * 0.5),
            _ => {
                let mut prev = match lines.last().and_then(|l| self.vp_point(l)) {
                    Some(p) => p,
                    None => self.get_point(v)?,
                };
                let mut sum = Vector3::zeros();
                let mut count = 0usize;
                for p in lines.iter().filter_map(|l| self.vp_point(l)) {
                    if pt3_pt3_equal(&p, &prev, tol) {
                        continue;
                    }
                    sum += p.coords;
                    count += 1;
                    prev = p;
                }
                if count == 0 {
                    prev
                } else {
                    Point3::from(sum / count as f64)
                }
            }
        };
        tracing::trace!(?v, ?new, "new vertex position");
        self.set_vertex_point(v, new)
    }

    /// First edge within tolerance of zero length in a face at `v`.
    fn short_eu_at(&self, v: VertexKey, tol: &Tolerance) -> Result<Option<EdgeUseKey>> {
        for fu in self.same_faceuses_at(v)? {
            for &lu in &self.get_fu(fu)?.loopuses {
                for &eu in self.loop_edgeuses(lu) {
                    let (Some(a), Some(b)) = (self.eu_vertex(eu), self.eu_end_vertex(eu)) else {
                        continue;
                    };
                    let short = a == b
                        || self
                            .eu_points(eu)
                            .is_some_and(|(pa, pb)| pt3_pt3_equal(&pa, &pb, tol));
                    if short {
                        return Ok(Some(eu));
                    }
                }
            }
        }
        Ok(None)
    }

    /// Merges line vertices that landed on `v` and kills the zero-length
    /// edges that leaves in the faces around it.
    fn remove_short_eus_inter(
        &mut self,
        v: VertexKey,
        lines: &mut [EdgeLine],
        tol: &Tolerance,
    ) -> Result<()> {
        let pv = self.get_point(v)?;
        for line in lines.iter_mut() {
            let Some(vp) = line.vp else { continue };
            let close = self
                .vertex_point(vp)
                .is_some_and(|p| pt3_pt3_equal(&p, &pv, tol));
            if vp != v && close {
                self.jv(v, vp)?;
                line.vp = Some(v);
            }
        }

        let mut guard = self.edgeuses.len();
        while let Some(eu) = self.short_eu_at(v, tol)? {
            let (a, b) = (self.eu_vertex(eu), self.eu_end_vertex(eu));
            if let (Some(a), Some(b)) = (a, b) {
                if a != b {
                    let (keep, gone) = if b == v { (b, a) } else { (a, b) };
                    self.jv(keep, gone)?;
                    for line in lines.iter_mut() {
                        if line.vp == Some(gone) {
                            line.vp = Some(keep);
                        }
                    }
                }
            }
            self.kill_eu_and_empty_parents(eu)?;
            guard = guard.saturating_sub(1);
            if guard == 0 {
                return Err(Error::Degenerate("short edges at vertex keep reappearing"));
            }
        }
        Ok(())
    }

    /// Fuses neighbouring lines whose vertices coincide, or where one vertex
    /// lies on the other line's edge.
    fn simplify_inter(
        &mut self,
        v: VertexKey,
        lines: &mut Vec<EdgeLine>,
        tol: &Tolerance,
    ) -> Result<()> {
        let pv = self.get_point(v)?;
        let mut i = 0;
        while lines.len() > 1 && i < lines.len() {
            let j = (i + 1) % lines.len();
            let (Some(vi), Some(vj)) = (lines[i].vp, lines[j].vp) else {
                i += 1;
                continue;
            };
            if open_pair(lines, i, j) || vi == v || vj == v {
                i += 1;
                continue;
            }
            if vi == vj {
                return Err(Error::Degenerate("neighbouring edge lines share a vertex"));
            }
            let (pi, pj) = (self.get_point(vi)?, self.get_point(vj)?);
            if pt3_pt3_equal(&pi, &pj, tol) {
                self.jv(vi, vj)?;
                lines[j].vp = Some(vi);
                i = self.fuse_lines(lines, i, j)?;
                continue;
            }
            let (di, dj) = ((pi - pv).norm_squared(), (pj - pv).norm_squared());
            let same_side = (pi - pv).dot(&(pj - pv)) > 0.0;
            if same_side && three_pts_collinear(&pv, &pi, &pj, tol) {
                if di > dj && dj > tol.dist_sq {
                    let piece = self.esplit_edge(vj, lines[i].eu)?;
                    if lines[i].faces[0].is_none() {
                        lines[i].eu = piece;
                    }
                    lines[i].vp = Some(vj);
                    i = self.fuse_lines(lines, i, j)?;
                    continue;
                }
                if dj > di && di > tol.dist_sq {
                    self.esplit_edge(vi, lines[j].eu)?;
                    lines[j].vp = Some(vi);
                    i = self.fuse_lines(lines, i, j)?;
                    continue;
                }
            }
            i += 1;
        }
        Ok(())
    }

    /// Merges line `j` into line `i` once both end at the same vertex.
    ///
    /// The face between them loses its crack at `v`, and the faces on the far
    /// sides of the two lines become radial neighbours. Returns the index of
    /// the merged line.
    fn fuse_lines(&mut self, lines: &mut Vec<EdgeLine>, i: usize, j: usize) -> Result<usize> {
        let y = lines[j].eu;
        let x = self.eu_prev(y).ok_or(Error::WireEdge(y))?;
        let (ry, y_mate, y_edge) = {
            let d = self.get_eu(y)?;
            (d.radial, d.mate, d.edge)
        };
        let crack = self.eu_vertex(x) == self.eu_end_vertex(y) && self.get_eu(x)?.edge != y_edge;
        if crack {
            self.kill_eu_and_empty_parents(x)?;
            self.kill_eu_and_empty_parents(y)?;
            if lines[i].faces[0].is_some() && lines[j].faces[1].is_some() && ry != y_mate {
                self.radial_join(lines[i].eu, ry)?;
            }
        } else {
            tracing::warn!(?x, ?y, "fused edge lines without a crack between them");
        }
        if lines[i].faces[0].is_none() {
            lines[i].eu = ry;
        }
        lines[i].faces[1] = lines[j].faces[1];
        lines[i].free |= lines[j].free;
        lines.remove(j);
        Ok(if j < i { i - 1 } else { i })
    }

    /// Cuts a new face off every old face whose two line vertices no longer
    /// lie in one plane with `v`.
    fn make_faces_at_vert(
        &mut self,
        v: VertexKey,
        lines: &mut [EdgeLine],
        tol: &Tolerance,
    ) -> Result<()> {
        match lines.len() {
            0 => return Ok(()),
            1 => {
                if let Some(vp) = lines[0].vp.filter(|&k| k != v) {
                    let p = self.get_point(vp)?;
                    self.set_vertex_point(v, p)?;
                    self.jv(v, vp)?;
                    lines[0].vp = Some(v);
                    self.remove_short_eus_inter(v, lines, tol)?;
                }
                return Ok(());
            }
            2 => {
                if let (Some(a), Some(b)) = (lines[0].vp, lines[1].vp) {
                    if !lines[0].free && !lines[1].free && a != v && b != v {
                        let (pa, pb) = (self.get_point(a)?, self.get_point(b)?);
                        self.set_vertex_point(v, Point3::from((pa.coords + pb.coords) * 0.5))?;
                    }
                }
                return Ok(());
            }
            _ => {}
        }

        let pv = self.get_point(v)?;
        let n = lines.len();
        for i in 0..n {
            let j = (i + 1) % n;
            if open_pair(lines, i, j) {
                continue;
            }
            let (Some(vi), Some(vj)) = (lines[i].vp, lines[j].vp) else {
                continue;
            };
            if vi == v || vj == v || vi == vj {
                continue;
            }
            let (pi, pj) = (self.get_point(vi)?, self.get_point(vj)?);
            if three_pts_collinear(&pv, &pi, &pj, tol) {
                continue;
            }
            let Some(lu) = self.find_lu_of_eu(lines[j].eu) else {
                continue;
            };
            let eus = self.loop_edgeuses(lu).to_vec();
            let starting_at = |vert| eus.iter().copied().find(|&e| self.eu_vertex(e) == Some(vert));
            let (Some(eu1), Some(eu2)) = (starting_at(vi), starting_at(vj)) else {
                continue;
            };
            if self.eu_next(eu1) == Some(eu2) {
                continue;
            }
            let lu_new = self.cut_loop(eu1, eu2)?;
            let fu_new = self.mk_new_face_from_loop(lu_new)?;
            if let Err(e) = self.fu_planeeqn(fu_new, tol) {
                tracing::warn!(?fu_new, %e, "new face at vertex has no plane");
            }
            lines[i].faces[1] = Some(fu_new);
            lines[j].faces[0] = Some(fu_new);
            tracing::debug!(?v, ?fu_new, "cut face at vertex");
        }
        Ok(())
    }

    /// Moves an edge so that it passes through `pt`.
    ///
    /// A wire edge is translated perpendicular to itself. A face edge tilts
    /// each of its (at most two) faces about a point of that face off the
    /// edge, and every vertex of those faces is then solved against its
    /// planes. Fails when an affected vertex has more than three faces.
    pub fn move_edge_thru_pt(
        &mut self,
        eu: EdgeUseKey,
        pt: &Point3<f64>,
        tol: &Tolerance,
    ) -> Result<()> {
        let _span = tracing::debug_span!("move_edge_thru_pt", ?eu).entered();
        let (p1, p2) = self.eu_points(eu).ok_or(Error::EdgeUseNotFound(eu))?;
        let v1 = self.eu_vertex(eu).ok_or(Error::EdgeUseNotFound(eu))?;
        let v2 = self.eu_end_vertex(eu).ok_or(Error::EdgeUseNotFound(eu))?;
        let e_dir = (p2 - p1)
            .try_normalize(tol.dist)
            .ok_or(Error::Degenerate("zero-length edge"))?;

        if self.is_wire_eu(eu) {
            let offset = pt - p1;
            let shift = offset - e_dir * offset.dot(&e_dir);
            self.set_vertex_point(v1, p1 + shift)?;
            self.set_vertex_point(v2, p2 + shift)?;
            return Ok(());
        }

        let uses = self.edge_uses(self.get_eu(eu)?.edge);
        if uses.len() > 4 {
            return Err(Error::Degenerate("edge has more than two radial faces"));
        }
        let fronts: Vec<(EdgeUseKey, FaceUseKey)> = uses
            .iter()
            .filter_map(|&u| {
                let fu = self.find_fu_of_eu(u)?;
                (self.faceuses.get(fu)?.orientation == Orientation::Same).then_some((u, fu))
            })
            .collect();

        let mut verts = vec![v1, v2];
        for &(_, fu) in &fronts {
            for &lu in &self.get_fu(fu)?.loopuses {
                for vk in self.loop_vertices(lu) {
                    if !verts.contains(&vk) {
                        verts.push(vk);
                    }
                }
            }
        }
        for &vk in &verts {
            self.pin_face_planes(vk, tol)?;
        }
        for vk in [v1, v2] {
            if self.find_isect_faces(vk, tol)?.faces.len() > 3 {
                return Err(Error::Degenerate("edge endpoint has more than three faces"));
            }
        }

        for &(u, fu) in &fronts {
            let u_dir = if self.eu_vertex(u) == Some(v1) { e_dir } else { -e_dir };
            let anchor = self.plane_anchor(u, &u_dir, pt, [v1, v2])?;
            let mut normal = u_dir.cross(&(anchor - pt));
            if self.faceuse_normal(fu).is_some_and(|old| normal.dot(&old) < 0.0) {
                normal = -normal;
            }
            let plane = Plane::from_point_normal(pt, &normal)
                .ok_or(Error::Degenerate("face plane through moved edge is undefined"))?;
            self.face_g(fu, plane)?;
        }

        for vk in verts {
            let found = self.find_isect_faces(vk, tol)?;
            if found.faces.len() > 3 {
                return Err(Error::Degenerate("vertex has more than three faces"));
            }
            self.simple_vertex_solve(vk, &found.faces)?;
        }
        tracing::debug!(?eu, ?pt, "moved edge");
        Ok(())
    }

    /// A point of `u`'s loop, not on the edge, that its face pivots about.
    fn plane_anchor(
        &self,
        u: EdgeUseKey,
        u_dir: &Vector3<f64>,
        pt: &Point3<f64>,
        skip: [VertexKey; 2],
    ) -> Result<Point3<f64>> {
        let lu = self.find_lu_of_eu(u).ok_or(Error::WireEdge(u))?;
        let mut cur = u;
        for _ in 0..self.loop_edgeuses(lu).len() {
            cur = self.eu_next(cur).ok_or(Error::WireEdge(cur))?;
            let Some(vk) = self.eu_end_vertex(cur) else {
                continue;
            };
            if skip.contains(&vk) {
                continue;
            }
            let p = self.get_point(vk)?;
            if u_dir.cross(&(p - pt)).norm() > 1e-12 {
                return Ok(p);
            }
        }
        Err(Error::Degenerate("face has no point off the moved edge"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const FACES: [[usize; 4]; 6] = [
        [0, 3, 2, 1],
        [4, 5, 6, 7],
        [0, 1, 5, 4],
        [1, 2, 6, 5],
        [2, 3, 7, 6],
        [3, 0, 4, 7],
    ];

    /// Unit cube, optionally without its top face (index 1).
    fn cube(m: &mut Model, s: ShellKey, top: bool) -> (Vec<VertexKey>, Vec<FaceUseKey>) {
        let v: Vec<VertexKey> = (0..8)
            .map(|i| {
                let x = f64::from(u8::from(i % 4 == 1 || i % 4 == 2));
                let y = f64::from(u8::from(i % 4 >= 2));
                let z = f64::from(u8::from(i >= 4));
                m.add_vertex(Point3::new(x, y, z))
            })
            .collect();
        let fus: Vec<FaceUseKey> = FACES
            .iter()
            .enumerate()
            .filter(|&(i, _)| top || i != 1)
            .map(|(_, f)| m.cface(s, &f.map(|k| v[k])).unwrap())
            .collect();
        m.glue_faces(&fus).unwrap();
        (v, fus)
    }

    #[test]
    fn raised_top_moves_its_corners() {
        let tol = Tolerance::default();
        let mut m = Model::new();
        let (_r, s) = m.mrsv();
        let (v, fus) = cube(&mut m, s, true);
        for &fu in &fus {
            m.fu_planeeqn(fu, &tol).unwrap();
        }
        let top = Plane::from_point_normal(&Point3::new(0.0, 0.0, 1.5), &Vector3::z()).unwrap();
        m.face_g(fus[1], top).unwrap();

        for &k in &v[4..] {
            m.in_vert(k, &tol).unwrap();
            assert_relative_eq!(m.vertex_point(k).unwrap().z, 1.5, epsilon = 1e-9);
            assert!(m.vert_on_fus(k, &tol));
        }
        assert_relative_eq!(m.vertex_point(v[6]).unwrap(), Point3::new(1.0, 1.0, 1.5), epsilon = 1e-9);
        assert!(m.check_model().is_empty());
    }

    #[test]
    fn isect_faces_counts_planes_and_free_edges() {
        let tol = Tolerance::default();
        let mut m = Model::new();
        let (_r, s) = m.mrsv();
        let (v, _) = cube(&mut m, s, true);
        let found = m.find_isect_faces(v[4], &tol).unwrap();
        assert_eq!(found.faces.len(), 3);
        assert_eq!(found.free_edges, 0);

        let (_r2, s2) = m.mrsv();
        let (open, _) = cube(&mut m, s2, false);
        let found = m.find_isect_faces(open[4], &tol).unwrap();
        assert_eq!(found.faces.len(), 2);
        assert_eq!(found.free_edges, 2);
    }

    #[test]
    fn simple_solve_needs_a_face() {
        let mut m = Model::new();
        let v = m.add_vertex(Point3::origin());
        assert!(matches!(m.simple_vertex_solve(v, &[]), Err(Error::Degenerate(_))));
    }

    #[test]
    fn simple_solve_projects_onto_two_planes() {
        let tol = Tolerance::default();
        let mut m = Model::new();
        let (_r, s) = m.mrsv();
        let (v, fus) = cube(&mut m, s, false);
        for &fu in &fus {
            m.fu_planeeqn(fu, &tol).unwrap();
        }
        // Open top: corner 4 only sits on the front and left faces.
        m.set_vertex_point(v[4], Point3::new(0.2, 0.3, 2.0)).unwrap();
        let found = m.find_isect_faces(v[4], &tol).unwrap();
        m.simple_vertex_solve(v[4], &found.faces).unwrap();
        assert_relative_eq!(m.vertex_point(v[4]).unwrap(), Point3::new(0.0, 0.0, 2.0), epsilon = 1e-9);
    }

    #[test]
    fn wire_edge_slides_through_point() {
        let tol = Tolerance::default();
        let mut m = Model::new();
        let (_r, s) = m.mrsv();
        let a = m.add_vertex(Point3::origin());
        let b = m.add_vertex(Point3::new(1.0, 0.0, 0.0));
        let eu = m.me_wire(s, a, b).unwrap();
        m.move_edge_thru_pt(eu, &Point3::new(0.5, 2.0, 0.0), &tol).unwrap();
        assert_relative_eq!(m.vertex_point(a).unwrap(), Point3::new(0.0, 2.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(m.vertex_point(b).unwrap(), Point3::new(1.0, 2.0, 0.0), epsilon = 1e-12);
    }
}
