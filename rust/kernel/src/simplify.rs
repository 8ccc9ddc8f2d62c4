// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Crack removal, shell simplification and coplanar face merging.
//!
//! A crack is a pair of consecutive edgeuses in one loop that run out along
//! an edge and straight back. It encloses nothing and is removed by killing
//! both uses, which leaves the loop closed.

use crate::arena::*;
use crate::error::{Error, Result};
use crate::geometry::{coplanar, Coplanarity, Plane, Tolerance};
use crate::keys::*;
use crate::ptbl::PointerTable;

impl Model {
    // --- Cracks ---

    /// Returns `true` if every edge of the loop is traversed in both
    /// directions by the loop itself, so it encloses no area.
    pub fn loop_is_a_crack(&self, lu: LoopUseKey) -> bool {
        let eus = self.loop_edgeuses(lu);
        if eus.is_empty() {
            return false;
        }
        eus.iter().all(|&eu| {
            let edge = self.edgeuses.get(eu).map(|d| d.edge);
            let (Some(edge), Some(end)) = (edge, self.eu_end_vertex(eu)) else {
                return false;
            };
            eus.iter().any(|&other| {
                other != eu
                    && self.edgeuses.get(other).map(|d| d.edge) == Some(edge)
                    && self.eu_vertex(other) == Some(end)
            })
        })
    }

    /// First pair of consecutive edgeuses of `lu` on the same edge.
    fn find_crack(&self, lu: LoopUseKey) -> Option<(EdgeUseKey, EdgeUseKey)> {
        let eus = self.loop_edgeuses(lu);
        let n = eus.len();
        if n < 2 {
            return None;
        }
        (0..n).find_map(|i| {
            let prev = eus[(i + n - 1) % n];
            let eu = eus[i];
            let same_edge = self.edgeuses.get(prev)?.edge == self.edgeuses.get(eu)?.edge;
            (prev != eu && same_edge).then_some((prev, eu))
        })
    }

    /// Kills cracks in the given faces, then any loop or face left empty.
    ///
    /// Returns the number of cracks removed. Faces already gone are skipped.
    fn kill_cracks_in_faces(&mut self, faceuses: &[FaceUseKey]) -> Result<usize> {
        let mut killed = 0;
        for &fu in faceuses {
            if !self.faceuses.contains_key(fu) {
                continue;
            }
            let loops = self.get_fu(fu)?.loopuses.clone();
            for lu in loops {
                if self.loop_is_a_crack(lu) {
                    tracing::trace!(?lu, "loop is a crack");
                    let _ = self.klu(lu)?;
                    killed += 1;
                    continue;
                }
                while let Some((prev, eu)) = self.find_crack(lu) {
                    let _ = self.keu(eu)?;
                    let cascade = self.keu(prev)?;
                    killed += 1;
                    if cascade.parent_now_empty() {
                        tracing::trace!(?lu, "crack removal emptied loop");
                        let _ = self.klu(lu)?;
                        break;
                    }
                }
            }
            if self.faceuses.contains_key(fu) && self.get_fu(fu)?.loopuses.is_empty() {
                let _ = self.kfu(fu)?;
            }
        }
        Ok(killed)
    }

    /// Removes every crack from the faces of a shell.
    ///
    /// Loops that are nothing but a crack are killed, and so are faces left
    /// without loops. Returns `true` if the shell is now empty.
    pub fn kill_cracks(&mut self, shell: ShellKey) -> Result<bool> {
        let fus = self.shell_same_faceuses(shell);
        let killed = self.kill_cracks_in_faces(&fus)?;
        tracing::debug!(?shell, killed, "killed cracks");
        Ok(self.get_shell(shell)?.is_empty())
    }

    /// Removes cracks from every face that uses vertex `v`.
    ///
    /// Returns the number of cracks removed.
    pub fn kill_cracks_at_vertex(&mut self, v: VertexKey) -> Result<usize> {
        let uses = self
            .vertices
            .get(v)
            .ok_or(Error::VertexNotFound(v))?
            .uses
            .clone();
        let mut fus = PointerTable::new();
        for vu in uses {
            let fu = match self.get_vu(vu)?.parent {
                VertexUseParent::EdgeUse(eu) => self.find_fu_of_eu(eu),
                VertexUseParent::LoopUse(lu) => self.find_fu_of_lu(lu),
                VertexUseParent::Shell(_) => None,
            };
            if let Some(fu) = fu {
                fus.insert_unique(fu);
            }
        }
        self.kill_cracks_in_faces(fus.as_slice())
    }

    fn is_empty_edge_loop(&self, lu: LoopUseKey) -> bool {
        matches!(
            self.loopuses.get(lu).map(|d| &d.down),
            Some(LoopUseDown::Edges(eus)) if eus.is_empty()
        )
    }

    /// Tidies a shell after heavy editing.
    ///
    /// Kills cracks, loops without edges, faces without loops and empty wire
    /// loops, and drops the lone vertex of a shell that has anything else.
    /// Returns `true` if the shell is now empty.
    pub fn simplify_shell(&mut self, shell: ShellKey) -> Result<bool> {
        let _span = tracing::debug_span!("simplify_shell", ?shell).entered();
        self.kill_cracks(shell)?;

        for fu in self.shell_same_faceuses(shell) {
            let empty_loops: Vec<LoopUseKey> = self
                .get_fu(fu)?
                .loopuses
                .iter()
                .copied()
                .filter(|&lu| self.is_empty_edge_loop(lu))
                .collect();
            for lu in empty_loops {
                let _ = self.klu(lu)?;
            }
            if self.get_fu(fu)?.loopuses.is_empty() {
                let _ = self.kfu(fu)?;
            }
        }

        let wire_loops = self.get_shell(shell)?.wire_loopuses.clone();
        for lu in wire_loops {
            if self.is_empty_edge_loop(lu) {
                let _ = self.klu(lu)?;
            }
        }

        let sd = self.get_shell(shell)?;
        let crowded = !sd.faceuses.is_empty()
            || !sd.wire_loopuses.is_empty()
            || !sd.wire_edgeuses.is_empty();
        if let (true, Some(vu)) = (crowded, sd.vertexuse) {
            let _ = self.kvu(vu)?;
        }
        Ok(self.get_shell(shell)?.is_empty())
    }

    // --- Coplanar face merging ---

    /// The front faceuse across the edge of `eu` when exactly two faces share
    /// it, both as outer loops, and that face lies in `plane`.
    fn coplanar_partner(
        &self,
        eu: EdgeUseKey,
        fu: FaceUseKey,
        plane: &Plane,
        tol: &Tolerance,
    ) -> Option<EdgeUseKey> {
        let d = self.edgeuses.get(eu)?;
        let uses = self.edge_uses(d.edge);
        if uses.len() != 4 {
            return None;
        }
        let end = self.eu_end_vertex(eu)?;
        let other = uses.into_iter().find(|&u| {
            u != eu
                && u != d.mate
                && self.eu_vertex(u) == Some(end)
                && self
                    .find_fu_of_eu(u)
                    .and_then(|f| self.faceuses.get(f))
                    .map(|fd| fd.orientation == Orientation::Same)
                    .unwrap_or(false)
        })?;
        let lu = self.find_lu_of_eu(other)?;
        let other_fu = self.find_fu_of_lu(lu)?;
        if other_fu == fu || self.loopuses.get(lu)?.orientation != Orientation::Same {
            return None;
        }
        if self.faceuses.get(other_fu)?.shell != self.faceuses.get(fu)?.shell {
            return None;
        }
        let other_plane = self.faceuse_plane(other_fu)?;
        (coplanar(plane, &other_plane, tol) == Coplanarity::Coplanar).then_some(other)
    }

    /// Joins the faces of `eu1` and `eu2` across their shared edge.
    ///
    /// The two loops become one loop of the first face, the shared edge is
    /// removed, any other loops of the second face move over and the second
    /// face is killed.
    fn join_faces_across(&mut self, eu1: EdgeUseKey, eu2: EdgeUseKey) -> Result<()> {
        let lu1 = self.find_lu_of_eu(eu1).ok_or(Error::WireEdge(eu1))?;
        let lu2 = self.find_lu_of_eu(eu2).ok_or(Error::WireEdge(eu2))?;
        let fu1 = self.find_fu_of_lu(lu1).ok_or(Error::LoopUseNotFound(lu1))?;
        let fu2 = self.find_fu_of_lu(lu2).ok_or(Error::LoopUseNotFound(lu2))?;
        let lu1_mate = self.get_lu(lu1)?.mate;
        let lu2_mate = self.get_lu(lu2)?.mate;

        let after = |eus: &[EdgeUseKey], at: EdgeUseKey| -> Vec<EdgeUseKey> {
            let i = eus.iter().position(|&e| e == at).unwrap_or(0);
            eus[i + 1..].iter().chain(&eus[..i]).copied().collect()
        };
        let mut joined = after(self.loop_edgeuses(lu1), eu1);
        joined.extend(after(self.loop_edgeuses(lu2), eu2));
        let mut mates = joined
            .iter()
            .map(|&e| self.get_eu(e).map(|d| d.mate))
            .collect::<Result<Vec<_>>>()?;
        mates.reverse();

        for &e in &joined {
            self.get_eu_mut(e)?.parent = EdgeUseParent::Loop(lu1);
        }
        for &e in &mates {
            self.get_eu_mut(e)?.parent = EdgeUseParent::Loop(lu1_mate);
        }
        self.get_lu_mut(lu1)?.down = LoopUseDown::Edges(joined);
        self.get_lu_mut(lu1_mate)?.down = LoopUseDown::Edges(mates);
        self.get_lu_mut(lu2)?.down = LoopUseDown::Edges(Vec::new());
        self.get_lu_mut(lu2_mate)?.down = LoopUseDown::Edges(Vec::new());
        self.free_eu_pair(eu1)?;
        self.free_eu_pair(eu2)?;
        let _ = self.klu(lu2)?;

        let rest = self.get_fu(fu2)?.loopuses.clone();
        for lu in rest {
            self.move_lu_between_fus(fu1, fu2, lu)?;
        }
        let _ = self.kfu(fu2)?;
        tracing::trace!(?fu1, ?fu2, "joined coplanar faces");
        Ok(())
    }

    /// Merges adjacent front faces of a shell that lie in the same plane.
    ///
    /// Two faces merge across an edge that only they share, when both use it
    /// in an outer loop and their planes coincide with the same sense. Cracks
    /// left where faces shared more than one edge are removed afterwards.
    /// Returns the number of merges.
    pub fn shell_coplanar_face_merge(&mut self, shell: ShellKey, tol: &Tolerance) -> Result<usize> {
        let _span = tracing::debug_span!("shell_coplanar_face_merge", ?shell).entered();
        let mut merged = 0;
        loop {
            let candidate = self.shell_same_faceuses(shell).into_iter().find_map(|fu| {
                let plane = self.faceuse_plane(fu)?;
                let fd = self.faceuses.get(fu)?;
                fd.loopuses.iter().find_map(|&lu| {
                    if self.loopuses.get(lu)?.orientation != Orientation::Same {
                        return None;
                    }
                    self.loop_edgeuses(lu).iter().find_map(|&eu| {
                        self.coplanar_partner(eu, fu, &plane, tol)
                            .map(|other| (eu, other))
                    })
                })
            });
            let Some((eu1, eu2)) = candidate else {
                break;
            };
            self.join_faces_across(eu1, eu2)?;
            merged += 1;
        }
        if merged > 0 {
            self.kill_cracks(shell)?;
        }
        tracing::debug!(merged, "merged coplanar faces");
        Ok(merged)
    }
}
