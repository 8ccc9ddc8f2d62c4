// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Closing open shells.
//!
//! Free edges of the shell's faces are chained into loops and each loop is
//! filled with new faces: a planar loop becomes one face, anything else is
//! fanned into faces edge by edge. The new faces are glued to the shell,
//! coplanar neighbours are merged and cracks are removed.

use nalgebra::Point3;

use crate::arena::*;
use crate::error::{Error, Result};
use crate::geometry::{
    coplanar, mk_plane_3pts, newell_normal, three_pts_collinear, Coplanarity, Plane, Tolerance,
};
use crate::keys::*;
use crate::ptbl::PointerTable;

/// Result of [`Model::close_shell`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The shell had no free edges; nothing was changed.
    AlreadyClosed,
    /// Every free-edge loop was filled.
    Closed {
        /// Faces created to fill the gaps.
        faces_added: usize,
    },
    /// Some free-edge loops could not be filled. The faces that were made
    /// are glued in place; the rest of the shell is left open.
    Partial {
        faces_added: usize,
        /// Free edges left in loops that were given up on.
        open_edges: usize,
    },
}

impl CloseOutcome {
    /// Returns `true` unless some gap was left open.
    pub fn is_closed(self) -> bool {
        !matches!(self, CloseOutcome::Partial { .. })
    }
}

/// What happened to one pass over the free-edge table.
enum Fill {
    /// The loop was filled completely.
    Done,
    /// The loop's edges were dropped from the table without being filled.
    Abandoned(usize),
}

impl Model {
    fn eu_start_point(&self, eu: EdgeUseKey) -> Result<Point3<f64>> {
        let v = self.eu_vertex(eu).ok_or(Error::EdgeUseNotFound(eu))?;
        self.get_point(v)
    }

    /// Chains table entries into a loop starting at entry 0.
    ///
    /// Each step takes the first unchained entry that starts where the
    /// current one ends. Returns table indices in loop order and whether the
    /// chain came back to its start.
    fn order_tbl(&self, tbl: &PointerTable<EdgeUseKey>) -> (Vec<usize>, bool) {
        let mut index = Vec::with_capacity(tbl.len());
        let Some(first) = tbl.get(0) else {
            return (index, false);
        };
        let start = self.eu_vertex(first);
        let mut used = vec![false; tbl.len()];
        used[0] = true;
        index.push(0);
        let mut cur = first;
        loop {
            let end = self.eu_end_vertex(cur);
            if end.is_some() && end == start {
                return (index, true);
            }
            let next = (1..tbl.len()).find(|&j| {
                !used[j] && tbl.get(j).and_then(|eu| self.eu_vertex(eu)) == end
            });
            match next {
                Some(j) => {
                    used[j] = true;
                    index.push(j);
                    cur = tbl.as_slice()[j];
                }
                None => return (index, false),
            }
        }
    }

    fn remove_indexed(tbl: &mut PointerTable<EdgeUseKey>, index: &[usize]) {
        let eus: Vec<EdgeUseKey> = index.iter().filter_map(|&i| tbl.get(i)).collect();
        for eu in eus {
            tbl.remove(eu);
        }
    }

    /// Tries to fill the whole ordered loop with one planar face.
    ///
    /// Fits a plane through the first non-collinear run of three vertices,
    /// then checks further runs of three against it. Returns `None` when the
    /// loop is not planar.
    fn close_planar_loop(
        &mut self,
        shell: ShellKey,
        tbl: &PointerTable<EdgeUseKey>,
        index: &[usize],
        tol: &Tolerance,
    ) -> Result<Option<FaceUseKey>> {
        let loop_size = index.len();
        let points: Vec<Point3<f64>> = index
            .iter()
            .map(|&i| tbl.get(i).ok_or(Error::Degenerate("free edge table out of step")))
            .map(|eu| eu.and_then(|eu| self.eu_start_point(eu)))
            .collect::<Result<_>>()?;

        let window = |start: usize| {
            mk_plane_3pts(&points[start], &points[start + 1], &points[start + 2], tol)
        };
        let Some((first_start, pl1)) =
            (0..=loop_size - 3).find_map(|start| window(start).map(|pl| (start, pl)))
        else {
            tracing::error!(?shell, loop_size, "cannot fit any plane to free edge loop");
            return Err(Error::Degenerate("free edge loop is collinear"));
        };

        let mut end = first_start + 3;
        while end < loop_size {
            end = (end + 3).min(loop_size);
            if let Some(pl2) = window(end - 3) {
                if !matches!(
                    coplanar(&pl1, &pl2, tol),
                    Coplanarity::Coplanar | Coplanarity::CoplanarOpposite
                ) {
                    return Ok(None);
                }
            }
        }

        // A reflex corner can give the fitted plane the wrong sense.
        let plane: Plane = if newell_normal(&points).dot(&pl1.normal) < 0.0 {
            pl1.reversed()
        } else {
            pl1
        };
        let verts: Vec<VertexKey> = index
            .iter()
            .filter_map(|&i| tbl.get(i))
            .filter_map(|eu| self.eu_vertex(eu))
            .collect();
        let fu = self.cface(shell, &verts)?;
        self.face_g(fu, plane)?;
        tracing::debug!(?fu, loop_size, "closed planar loop with one face");
        Ok(Some(fu))
    }

    /// Fills one ordered loop, face by face, until three edges remain.
    fn close_loop_incrementally(
        &mut self,
        shell: ShellKey,
        tbl: &mut PointerTable<EdgeUseKey>,
        mut index: Vec<usize>,
        fu_list: &mut Vec<FaceUseKey>,
        tol: &Tolerance,
    ) -> Result<Fill> {
        while index.len() > 3 {
            if let Some(fu) = self.close_planar_loop(shell, tbl, &index, tol)? {
                fu_list.push(fu);
                Self::remove_indexed(tbl, &index);
                return Ok(Fill::Done);
            }

            let loop_size = index.len();
            let at = |i: usize| tbl.as_slice()[index[i % loop_size]];
            let mut start_index = 0;
            let (verts, used) = loop {
                let eu1_first = at(start_index);
                let mut eu1 = eu1_first;
                let mut end_index = start_index + 1;
                let mut eu2 = at(end_index);
                let mut verts = vec![
                    self.eu_vertex(eu1).ok_or(Error::EdgeUseNotFound(eu1))?,
                    self.eu_vertex(eu2).ok_or(Error::EdgeUseNotFound(eu2))?,
                ];
                let mut edges_used = 2;
                while edges_used < loop_size {
                    let (p2, p3) = self.eu_points(eu2).ok_or(Error::EdgeUseNotFound(eu2))?;
                    if !three_pts_collinear(&self.eu_start_point(eu1)?, &p2, &p3, tol) {
                        break;
                    }
                    end_index += 1;
                    eu1 = eu2;
                    eu2 = at(end_index);
                    verts.push(self.eu_vertex(eu2).ok_or(Error::EdgeUseNotFound(eu2))?);
                    edges_used += 1;
                }

                let (a1, b1) = self
                    .eu_points(eu1_first)
                    .ok_or(Error::EdgeUseNotFound(eu1_first))?;
                let (a2, b2) = self.eu_points(eu2).ok_or(Error::EdgeUseNotFound(eu2))?;
                let (v1, v2) = (b1 - a1, b2 - a2);
                let inside = self
                    .find_fu_of_eu(eu1)
                    .and_then(|fu| self.faceuse_normal(fu))
                    .map(|n| n.cross(&v1));
                let wrong_way = inside.map(|inside| inside.dot(&v2) > 0.0).unwrap_or(false);
                if !wrong_way && edges_used < loop_size {
                    verts.push(self.eu_end_vertex(eu2).ok_or(Error::EdgeUseNotFound(eu2))?);
                    let used: Vec<usize> = (0..edges_used)
                        .map(|i| index[(start_index + i) % loop_size])
                        .collect();
                    break (verts, used);
                }

                start_index += 1;
                if start_index > loop_size - 2 {
                    tracing::warn!(?shell, loop_size, "no face can be made from free edge loop");
                    Self::remove_indexed(tbl, &index);
                    return Ok(Fill::Abandoned(loop_size));
                }
            };

            let fu = self.cface(shell, &verts)?;
            if let Err(e) = self.fu_planeeqn(fu, tol) {
                tracing::warn!(?fu, error = %e, "no plane for closing face");
            }
            fu_list.push(fu);

            // The new face's last edge closes it back to the first vertex;
            // its mate is the new free edge of the remaining loop.
            let closing = self
                .outer_loopuse(fu)
                .and_then(|lu| self.loop_edgeuses(lu).last().copied())
                .ok_or(Error::Degenerate("closing face has no edges"))?;
            let eu_new = self.get_eu(closing)?.mate;

            Self::remove_indexed(tbl, &used);
            tbl.insert(eu_new);
            let (next, closed) = self.order_tbl(tbl);
            if !closed {
                tracing::error!(?shell, "free edge loop stopped closing while being filled");
                Self::remove_indexed(tbl, &next);
                return Ok(Fill::Abandoned(next.len()));
            }
            index = next;
        }

        if index.len() != 3 {
            tracing::error!(?shell, loop_size = index.len(), "free edge loop too short to fill");
            Self::remove_indexed(tbl, &index);
            return Ok(Fill::Abandoned(index.len()));
        }

        let eus: Vec<EdgeUseKey> = index.iter().filter_map(|&i| tbl.get(i)).collect();
        let verts: Vec<VertexKey> = eus.iter().filter_map(|&eu| self.eu_vertex(eu)).collect();
        let pts: Vec<Point3<f64>> = verts.iter().map(|&v| self.get_point(v)).collect::<Result<_>>()?;
        if !three_pts_collinear(&pts[0], &pts[1], &pts[2], tol) {
            let fu = self.cface(shell, &verts)?;
            if let Err(e) = self.fu_planeeqn(fu, tol) {
                tracing::warn!(?fu, error = %e, "no plane for closing face");
            }
            fu_list.push(fu);
        }
        for eu in eus {
            tbl.remove(eu);
        }
        Ok(Fill::Done)
    }

    /// Fills every hole in a shell with new faces.
    ///
    /// A hole is a loop of free edges on the shell's faces. Planar holes get a
    /// single face carrying the fitted plane; other holes are filled a few
    /// edges at a time, skipping runs of collinear edges and any face that
    /// would fold back over its neighbour. Afterwards the new faces are glued
    /// to the shell, coplanar neighbours are merged and cracks removed.
    pub fn close_shell(&mut self, shell: ShellKey, tol: &Tolerance) -> Result<CloseOutcome> {
        let _span = tracing::debug_span!("close_shell", ?shell).entered();
        tracing::debug!(?shell, "closing shell");

        let mut fu_list = self.shell_same_faceuses(shell);
        let mut tbl = PointerTable::new();
        for &fu in &fu_list {
            for &lu in &self.get_fu(fu)?.loopuses {
                for &eu in self.loop_edgeuses(lu) {
                    let d = self.get_eu(eu)?;
                    if d.radial == d.mate {
                        tbl.insert(d.mate);
                    }
                }
            }
        }
        if tbl.is_empty() {
            return Ok(CloseOutcome::AlreadyClosed);
        }
        let existing = fu_list.len();
        let mut open_edges = 0;

        while !tbl.is_empty() {
            let (index, closed) = self.order_tbl(&tbl);
            if !closed {
                tracing::warn!(?shell, edges = index.len(), "free edges do not form a loop");
                Self::remove_indexed(&mut tbl, &index);
                open_edges += index.len();
                continue;
            }
            match self.close_loop_incrementally(shell, &mut tbl, index, &mut fu_list, tol)? {
                Fill::Done => {}
                Fill::Abandoned(n) => open_edges += n,
            }
        }

        self.glue_faces(&fu_list)?;
        let faces_added = fu_list.len() - existing;
        self.shell_coplanar_face_merge(shell, tol)?;
        if self.simplify_shell(shell)? {
            tracing::warn!(?shell, "simplified shell is empty");
        }

        tracing::debug!(faces_added, open_edges, "closed shell");
        Ok(if open_edges == 0 {
            CloseOutcome::Closed { faces_added }
        } else {
            tracing::error!(?shell, open_edges, "shell left partially closed");
            CloseOutcome::Partial {
                faces_added,
                open_edges,
            }
        })
    }
}
