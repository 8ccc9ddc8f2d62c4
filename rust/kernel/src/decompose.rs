// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Splitting faces and shells into their connected pieces.
//!
//! [`Model::decompose_shell`] colours the faces of a shell by flood fill over
//! edges shared by exactly two faces. Edges shared by more faces are ambiguous
//! and are kept aside; when the fill runs dry they are used to decide where
//! the next unvisited face belongs, by asking which shell its already
//! coloured neighbours went to and, failing that, by orientation parity.
//! The parity test is a heuristic: pieces that meet only at a non-manifold
//! edge with no coloured neighbour to go by may be split the wrong way.

use rustc_hash::FxHashMap;

use crate::arena::*;
use crate::error::{Error, Result};
use crate::geometry::{point_in_polygon, Tolerance};
use crate::keys::*;
use crate::ptbl::PointerTable;

/// Flood-fill state shared by the passes of [`Model::decompose_shell`].
struct Colouring {
    shell: ShellKey,
    /// Shell number of each face; absent until visited.
    face_shell: FxHashMap<FaceKey, usize>,
    stack: PointerTable<EdgeUseKey>,
    shared_edges: PointerTable<EdgeUseKey>,
}

impl Colouring {
    fn number_of(&self, m: &Model, fu: FaceUseKey) -> Option<usize> {
        let face = m.faceuses.get(fu)?.face;
        self.face_shell.get(&face).copied()
    }
}

impl Model {
    // --- Loops ---

    /// Returns `true` if loop `inner` lies inside loop `outer`.
    ///
    /// Tested with the first vertex of `inner` that is not also on `outer`.
    fn loop_inside_loop(&self, inner: LoopUseKey, outer: LoopUseKey, fu: FaceUseKey) -> bool {
        let outer_verts = self.loop_vertices(outer);
        let Some(probe) = self
            .loop_vertices(inner)
            .into_iter()
            .find(|v| !outer_verts.contains(v))
            .and_then(|v| self.vertex_point(v))
        else {
            return false;
        };
        let Some(normal) = self.faceuse_normal(fu) else {
            return false;
        };
        point_in_polygon(&probe, &self.loop_points(outer), &normal)
    }

    fn split_face_loops(&mut self, fu: FaceUseKey, tol: &Tolerance) -> Result<usize> {
        let mut outer = Vec::new();
        let mut holes = Vec::new();
        for &lu in &self.get_fu(fu)?.loopuses {
            if self.loop_edgeuses(lu).is_empty() {
                continue;
            }
            match self.get_lu(lu)?.orientation {
                Orientation::Same => outer.push(lu),
                Orientation::Opposite => holes.push(lu),
                other => {
                    tracing::warn!(?fu, ?lu, ?other, "face loop with transient orientation");
                    return Ok(0);
                }
            }
        }
        if outer.len() < 2 {
            if outer.is_empty() && !holes.is_empty() {
                tracing::warn!(?fu, "face has only hole loops, ignored");
            }
            return Ok(0);
        }

        let plane = self.faceuse_plane(fu);
        let mut made = 0;
        // The first outer loop stays behind together with the holes no other
        // outer loop claims.
        for &lu in &outer[1..] {
            let own_holes: Vec<LoopUseKey> = holes
                .iter()
                .copied()
                .filter(|&hole| self.loop_inside_loop(hole, lu, fu))
                .filter(|&hole| {
                    // A hole inside an island that itself sits inside `lu`
                    // belongs to the island.
                    !outer.iter().any(|&island| {
                        island != lu
                            && self.loop_inside_loop(island, lu, fu)
                            && self.loop_inside_loop(hole, island, fu)
                    })
                })
                .collect();
            let new_fu = self.mk_new_face_from_loop(lu)?;
            if let Some(plane) = plane {
                self.face_g(new_fu, plane)?;
            }
            for hole in own_holes {
                self.move_lu_between_fus(new_fu, fu, hole)?;
                holes.retain(|&h| h != hole);
            }
            made += 1;
        }
        tracing::trace!(?fu, made, dist = tol.dist, "split face loops");
        Ok(made)
    }

    /// Gives every disjoint outer loop of every face in the shell its own face.
    ///
    /// Holes go with the outer loop that immediately contains them. Returns
    /// the number of faces created.
    pub fn split_loops_into_faces(&mut self, shell: ShellKey, tol: &Tolerance) -> Result<usize> {
        let mut made = 0;
        for fu in self.shell_same_faceuses(shell) {
            made += self.split_face_loops(fu, tol)?;
        }
        tracing::debug!(?shell, made, "split loops into faces");
        Ok(made)
    }

    // --- Shells ---

    fn push_face_edges(&self, fu: FaceUseKey, c: &mut Colouring) -> Result<()> {
        for &lu in &self.get_fu(fu)?.loopuses {
            for &eu in self.loop_edgeuses(lu) {
                if self.radial_face_count(eu, Some(c.shell)) > 2 {
                    c.shared_edges.insert_unique(eu);
                } else {
                    c.stack.insert_unique(eu);
                }
            }
        }
        Ok(())
    }

    /// Colours `fu` and everything reachable from it across simple edges.
    fn flood_fill(&self, fu: FaceUseKey, number: usize, c: &mut Colouring) -> Result<()> {
        let fu = self.same_use(fu)?;
        let face = self.get_fu(fu)?.face;
        if c.face_shell.contains_key(&face) {
            return Ok(());
        }
        c.face_shell.insert(face, number);
        self.push_face_edges(fu, c)?;

        while let Some(eu1) = c.stack.pop() {
            let Some(eu) = self.radial_eu_in_shell(eu1, c.shell) else {
                continue;
            };
            let Some(fu) = self.find_fu_of_eu(eu) else {
                continue;
            };
            let fu = self.same_use(fu)?;
            let face = self.get_fu(fu)?.face;
            if c.face_shell.contains_key(&face) {
                continue;
            }
            c.face_shell.insert(face, number);
            self.push_face_edges(fu, c)?;
        }
        Ok(())
    }

    /// Uses of an edge within the shell, one per face, going around the ring.
    fn faces_around(&self, eu: EdgeUseKey, shell: ShellKey) -> Vec<EdgeUseKey> {
        let mut out = vec![eu];
        let mut cur = eu;
        while let Some(next) = self.next_radial_eu(cur, Some(shell), false) {
            if next == eu || out.len() > self.edgeuses.len() {
                break;
            }
            out.push(next);
            cur = next;
        }
        out
    }

    /// Looks for a shared edge with exactly one uncoloured face whose other
    /// faces all went to one shell. Returns that face and shell number.
    ///
    /// Entries whose faces are all coloured are dropped from the table.
    fn deduce_from_shared_edges(&self, c: &mut Colouring) -> Option<(FaceUseKey, usize)> {
        let mut settled = Vec::new();
        let mut found = None;
        for &eu in c.shared_edges.iter() {
            let mut unassigned = Vec::new();
            let mut numbers = Vec::new();
            for u in self.faces_around(eu, c.shell) {
                let fu = self.find_fu_of_eu(u)?;
                match c.number_of(self, fu) {
                    Some(n) => numbers.push(n),
                    None => unassigned.push(fu),
                }
            }
            match unassigned.as_slice() {
                [] => settled.push(eu),
                [fu] if !numbers.is_empty() && numbers.iter().all(|&n| n == numbers[0]) => {
                    found = Some((*fu, numbers[0]));
                    break;
                }
                _ => {}
            }
        }
        for eu in settled {
            c.shared_edges.remove(eu);
        }
        found
    }

    /// Finds an uncoloured face at a shared edge whose coloured radial
    /// neighbour has the same orientation, so the two cannot belong to one
    /// consistently oriented shell.
    fn parity_conflict(&self, c: &Colouring) -> Option<FaceUseKey> {
        c.shared_edges.iter().find_map(|&eu| {
            self.faces_around(eu, c.shell).into_iter().find_map(|u| {
                let fu1 = self.find_fu_of_eu(u)?;
                if c.number_of(self, fu1).is_some() {
                    return None;
                }
                let orientation = self.faceuses.get(fu1)?.orientation;
                [
                    self.prev_radial_eu(u, Some(c.shell), false),
                    self.next_radial_eu(u, Some(c.shell), false),
                ]
                .into_iter()
                .flatten()
                .filter(|&n| n != u)
                .filter_map(|n| self.find_fu_of_eu(n))
                .any(|fu2| {
                    c.number_of(self, fu2).is_some()
                        && self.faceuses.get(fu2).map(|d| d.orientation) == Some(orientation)
                })
                .then_some(fu1)
            })
        })
    }

    fn first_missed_face(&self, c: &Colouring) -> Option<FaceUseKey> {
        self.shell_same_faceuses(c.shell)
            .into_iter()
            .find(|&fu| c.number_of(self, fu).is_none())
    }

    /// Breaks a shell into one shell per connected piece.
    ///
    /// Disjoint loops are first split into their own faces. The pieces after
    /// the first move to new shells in the same region. Returns the number of
    /// shells the original became; 1 means nothing changed.
    pub fn decompose_shell(&mut self, shell: ShellKey, tol: &Tolerance) -> Result<usize> {
        let _span = tracing::debug_span!("decompose_shell", ?shell).entered();
        self.split_loops_into_faces(shell, tol)?;

        let first = *self
            .shell_same_faceuses(shell)
            .first()
            .ok_or(Error::EmptyShell(shell))?;
        let mut c = Colouring {
            shell,
            face_shell: FxHashMap::default(),
            stack: PointerTable::new(),
            shared_edges: PointerTable::new(),
        };
        let mut no_of_shells = 1;
        self.flood_fill(first, 1, &mut c)?;

        while let Some(missed) = self.first_missed_face(&c) {
            c.stack.reset();
            let (seed, number) = match self.deduce_from_shared_edges(&mut c) {
                Some(found) => found,
                None => {
                    no_of_shells += 1;
                    let seed = self.parity_conflict(&c).unwrap_or(missed);
                    (seed, no_of_shells)
                }
            };
            tracing::trace!(?seed, number, "seeding shell");
            self.flood_fill(seed, number, &mut c)?;
        }

        if no_of_shells == 1 {
            tracing::debug!(?shell, "shell is one piece");
            return Ok(1);
        }

        let region = self.get_shell(shell)?.region;
        for number in 2..=no_of_shells {
            let new_shell = self.msv(region)?;
            for fu in self.shell_same_faceuses(shell) {
                if c.number_of(self, fu) == Some(number) {
                    self.mv_fu_between_shells(new_shell, fu)?;
                }
            }
            if self.get_shell(new_shell)?.is_empty() {
                // A shell number whose faces were all claimed elsewhere.
                let _ = self.ks(new_shell)?;
                no_of_shells -= 1;
            }
        }
        tracing::debug!(?shell, shells = no_of_shells, "decomposed shell");
        Ok(no_of_shells)
    }
}
