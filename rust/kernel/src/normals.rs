// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Making face normals agree across a shell.
//!
//! [`Model::fix_normals`] seeds each connected piece of a shell with its
//! topmost face, which is assumed to face +Z, and pushes that orientation
//! across the radial rings. Shells meant to bound a void come out pointing
//! outwards all the same; [`Model::shell_is_void`] can tell such a shell
//! apart afterwards only if its normals were right to begin with.

use nalgebra::Vector3;

use crate::arena::*;
use crate::error::{Error, Result};
use crate::geometry::Tolerance;
use crate::keys::*;
use crate::ptbl::PointerTable;
use crate::visited::VisitedSet;

impl Model {
    fn face_loop_eu_in_shell(&self, eu: EdgeUseKey, shell: ShellKey) -> Option<FaceUseKey> {
        let fu = self.find_fu_of_eu(eu)?;
        (self.faceuses.get(fu)?.shell == shell).then_some(fu)
    }

    fn face_of(&self, fu: FaceUseKey) -> Option<FaceKey> {
        self.faceuses.get(fu).map(|d| d.face)
    }

    /// Finds the face of `shell` lying highest in +Z, skipping `visited` faces.
    ///
    /// The search narrows from the highest vertex to the steepest edge
    /// leaving it, then to the face around that edge whose interior climbs
    /// most steeply away from the edge.
    pub fn find_top_face(&self, shell: ShellKey, visited: &VisitedSet<FaceKey>) -> Option<FaceKey> {
        let unvisited = |fu: FaceUseKey| self.face_of(fu).is_some_and(|f| !visited.contains(f));

        let mut top = None::<(f64, VertexKey)>;
        for &fu in &self.shell(shell)?.faceuses {
            if !unvisited(fu) {
                continue;
            }
            for &lu in &self.faceuses.get(fu)?.loopuses {
                for &eu in self.loop_edgeuses(lu) {
                    let Some(v) = self.eu_vertex(eu) else { continue };
                    let Some(p) = self.vertex_point(v) else { continue };
                    if top.map_or(true, |(z, _)| p.z > z) {
                        top = Some((p.z, v));
                    }
                }
            }
        }
        let Some((_, v_top)) = top else {
            tracing::warn!(?shell, "could not find uppermost vertex");
            return None;
        };

        let mut top_edge = None::<(f64, EdgeKey)>;
        for &vu in &self.vertex(v_top)?.uses {
            let VertexUseParent::EdgeUse(eu) = self.vertexuses.get(vu)?.parent else {
                continue;
            };
            let Some(fu) = self.face_loop_eu_in_shell(eu, shell) else {
                continue;
            };
            if !unvisited(fu) {
                continue;
            }
            let Some((a, b)) = self.eu_points(eu) else { continue };
            let Some(dir) = (b - a).try_normalize(0.0) else { continue };
            if top_edge.map_or(true, |(slope, _)| dir.z > slope) {
                top_edge = Some((dir.z, self.edgeuses.get(eu)?.edge));
            }
        }
        let Some((_, e_top)) = top_edge else {
            tracing::warn!(?shell, "could not find uppermost edge");
            return None;
        };

        let mut top_face = None::<(f64, FaceKey)>;
        let start = self.edges.get(e_top)?.eu;
        let mut eu = start;
        for _ in 0..self.edgeuses.len() {
            if let Some(fu) = self.face_loop_eu_in_shell(eu, shell) {
                let outer = self
                    .find_lu_of_eu(eu)
                    .and_then(|lu| self.loopuses.get(lu))
                    .is_some_and(|d| d.orientation == Orientation::Same);
                if outer && unvisited(fu) {
                    // Interior direction: the reversed edge crossed with the normal.
                    let left = self.eu_points(eu).zip(self.faceuse_normal(fu)).and_then(
                        |((a, b), n): (_, Vector3<f64>)| (a - b).cross(&n).try_normalize(0.0),
                    );
                    if let (Some(left), Some(face)) = (left, self.face_of(fu)) {
                        if top_face.map_or(true, |(slope, _)| left.z > slope) {
                            top_face = Some((left.z, face));
                        }
                    }
                }
            }
            let mate = self.edgeuses.get(eu)?.mate;
            eu = self.edgeuses.get(mate)?.radial;
            if eu == start {
                break;
            }
        }
        if top_face.is_none() {
            tracing::warn!(?shell, "could not find uppermost face");
        }
        top_face.map(|(_, f)| f)
    }

    /// Returns `true` if the shell bounds a void.
    ///
    /// Decided by the Z component of the topmost face's front normal, so the
    /// shell's normals must already be consistent.
    pub fn shell_is_void(&self, shell: ShellKey) -> Result<bool> {
        let face = self
            .find_top_face(shell, &VisitedSet::new())
            .ok_or(Error::Degenerate("shell has no top face"))?;
        let fu = self.same_use(self.get_face(face)?.fu)?;
        let normal = self
            .faceuse_normal(fu)
            .ok_or(Error::Degenerate("top face has no normal"))?;
        if normal.z == 0.0 {
            tracing::error!(?shell, ?face, "cannot tell whether shell is void");
            return Err(Error::Degenerate("top face is vertical"));
        }
        Ok(normal.z < 0.0)
    }

    fn push_nonfree_edges(&self, fu: FaceUseKey, stack: &mut PointerTable<EdgeUseKey>) -> Result<()> {
        for &lu in &self.get_fu(fu)?.loopuses {
            for &eu in self.loop_edgeuses(lu) {
                if !self.is_free_edge(eu) {
                    stack.insert(eu);
                }
            }
        }
        Ok(())
    }

    /// Spreads the orientation of `fu_in` to every face reachable from it.
    ///
    /// `fu_in` is taken to be correctly oriented. A neighbour is reversed
    /// when the use across the radial gap is not its front side, or runs in
    /// the same direction as the edge just crossed. Faces in `visited` are
    /// left alone; every face reached is added to it. Returns the number of
    /// faces reversed.
    pub fn propagate_normals(
        &mut self,
        fu_in: FaceUseKey,
        visited: &mut VisitedSet<FaceKey>,
        tol: &Tolerance,
    ) -> Result<usize> {
        let fu = self.same_use(fu_in)?;
        let d = self.get_fu(fu)?;
        let (shell, face) = (d.shell, d.face);
        tracing::debug!(?fu, ?shell, dist = tol.dist, "propagating normals");
        visited.insert(face);

        let mut stack = PointerTable::new();
        self.push_nonfree_edges(fu, &mut stack)?;
        let mut reversed = 0;

        while let Some(eu1) = stack.pop() {
            let Ok(d1) = self.get_eu(eu1) else { continue };
            let eu1_mate = d1.mate;
            let mut eu = d1.radial;
            let mut guard = self.edgeuses.len();
            while self.find_s_of_eu(eu) != Some(shell) && eu != eu1 && eu != eu1_mate {
                let mate = self.get_eu(eu)?.mate;
                eu = self.get_eu(mate)?.radial;
                guard = guard.saturating_sub(1);
                if guard == 0 {
                    break;
                }
            }
            if eu == eu1 || eu == eu1_mate {
                continue;
            }
            let Some(fu) = self.find_fu_of_eu(eu) else {
                continue;
            };
            if !visited.insert(self.get_fu(fu)?.face) {
                continue;
            }

            let same_direction = self.eu_vertex(eu1) == self.eu_vertex(eu)
                && self.eu_end_vertex(eu1) == self.eu_end_vertex(eu);
            if self.get_fu(fu)?.orientation != Orientation::Same || same_direction {
                self.reverse_face_and_radials(fu)?;
                reversed += 1;
            }
            let fu = self.same_use(fu)?;
            self.push_nonfree_edges(fu, &mut stack)?;
        }
        Ok(reversed)
    }

    /// Orients every face of the shell consistently, outward at the top.
    ///
    /// Each connected piece is seeded with its topmost face, flipped if its
    /// front normal points down, and the orientation is propagated from
    /// there. Returns the number of faces reversed.
    pub fn fix_normals(&mut self, shell: ShellKey, tol: &Tolerance) -> Result<usize> {
        let _span = tracing::debug_span!("fix_normals", ?shell).entered();
        self.get_shell(shell)?;
        let mut visited = VisitedSet::new();
        let mut reversed = 0;

        loop {
            let missed = self
                .shell_same_faceuses(shell)
                .into_iter()
                .filter(|&fu| self.face_of(fu).is_some_and(|f| !visited.contains(f)))
                .count();
            if missed == 0 {
                break;
            }
            let Some(f_top) = self.find_top_face(shell, &visited) else {
                tracing::warn!(?shell, missed, "faces left unoriented");
                break;
            };
            let fu = self.same_use(self.get_face(f_top)?.fu)?;
            let z = self.faceuse_normal(fu).map_or(0.0, |n| n.z);
            if z < 0.0 {
                self.reverse_face_and_radials(fu)?;
                reversed += 1;
            }
            let fu = self.same_use(fu)?;
            reversed += self.propagate_normals(fu, &mut visited, tol)?;
        }
        tracing::debug!(?shell, reversed, "fixed normals");
        Ok(reversed)
    }

    /// Returns `true` if any front faceuse of the shell has a normal that
    /// disagrees with the winding of its loops.
    pub fn bad_face_normals(&self, shell: ShellKey, tol: &Tolerance) -> bool {
        self.shell_same_faceuses(shell).into_iter().any(|fu| {
            let Some(old) = self.faceuse_normal(fu) else {
                return false;
            };
            let Some(d) = self.faceuses.get(fu) else {
                return false;
            };
            let fresh = d.loopuses.iter().find_map(|&lu| {
                let orientation = self.loopuses.get(lu)?.orientation;
                if !matches!(orientation, Orientation::Same | Orientation::Opposite) {
                    return None;
                }
                let (plane, area) = self.loop_plane_area(lu)?;
                if area <= tol.dist_sq {
                    return None;
                }
                Some(if orientation == Orientation::Same {
                    plane.normal
                } else {
                    -plane.normal
                })
            });
            fresh.is_some_and(|n| old.dot(&n) < 0.0)
        })
    }
}
