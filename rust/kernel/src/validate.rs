// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Structural consistency checks.
//!
//! Every link in the radial-edge structure is stored on both ends. These
//! checks walk the arena and report each place where the two ends disagree,
//! so tests can assert that an edit left the model whole.

use rustc_hash::FxHashMap;

use crate::arena::*;
use crate::keys::*;

/// One broken invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Defect {
    #[error("{0:?} refers to a missing element")]
    Dangling(TopologyKey),
    #[error("{0:?} is not its mate's mate")]
    MateNotSymmetric(TopologyKey),
    #[error("{0:?} and its mate do not share an edge")]
    MateOffEdge(EdgeUseKey),
    #[error("edgeuse {0:?} is not its radial's radial")]
    RadialNotSymmetric(EdgeUseKey),
    #[error("edgeuse {0:?} and its radial are on different edges")]
    RadialOffEdge(EdgeUseKey),
    #[error("radial of edgeuse {0:?} does not start where it ends")]
    RadialDirection(EdgeUseKey),
    #[error("ring of edge {0:?} does not reach all of its uses")]
    BrokenRing(EdgeKey),
    #[error("edge {0:?} names a use on another edge")]
    EdgeAnchor(EdgeKey),
    #[error("{child:?} is not listed by its parent {parent:?}")]
    Orphan {
        child: TopologyKey,
        parent: TopologyKey,
    },
    #[error("loop {0:?} is not closed at edgeuse {1:?}")]
    OpenLoop(LoopUseKey, EdgeUseKey),
    #[error("loopuse {0:?} does not mirror its mate")]
    LoopMateMismatch(LoopUseKey),
    #[error("faceuse {0:?} and its mate have the same orientation")]
    FaceOrientation(FaceUseKey),
}

impl Model {
    fn check_edgeuse(&self, eu: EdgeUseKey, d: &EdgeUseData, out: &mut Vec<Defect>) {
        let Some(md) = self.edgeuses.get(d.mate) else {
            out.push(Defect::Dangling(eu.into()));
            return;
        };
        if md.mate != eu || d.mate == eu {
            out.push(Defect::MateNotSymmetric(eu.into()));
        }
        if md.edge != d.edge {
            out.push(Defect::MateOffEdge(eu));
        }
        match self.edgeuses.get(d.radial) {
            None => out.push(Defect::Dangling(eu.into())),
            Some(rd) => {
                if rd.radial != eu {
                    out.push(Defect::RadialNotSymmetric(eu));
                }
                if rd.edge != d.edge {
                    out.push(Defect::RadialOffEdge(eu));
                }
                if self.eu_vertex(d.radial) != self.eu_end_vertex(eu) {
                    out.push(Defect::RadialDirection(eu));
                }
            }
        }
        if !self.edges.contains_key(d.edge) {
            out.push(Defect::Dangling(eu.into()));
        }

        match self.vertexuses.get(d.vu) {
            Some(vd) if vd.parent == VertexUseParent::EdgeUse(eu) => {
                let listed = self
                    .vertices
                    .get(vd.vertex)
                    .is_some_and(|v| v.uses.contains(&d.vu));
                if !listed {
                    out.push(Defect::Orphan {
                        child: d.vu.into(),
                        parent: vd.vertex.into(),
                    });
                }
            }
            _ => out.push(Defect::Dangling(eu.into())),
        }

        let listed = match d.parent {
            EdgeUseParent::Loop(lu) => self.loop_edgeuses(lu).contains(&eu),
            EdgeUseParent::Shell(s) => self
                .shells
                .get(s)
                .is_some_and(|sd| sd.wire_edgeuses.contains(&eu)),
        };
        if !listed {
            let parent = match d.parent {
                EdgeUseParent::Loop(lu) => lu.into(),
                EdgeUseParent::Shell(s) => s.into(),
            };
            out.push(Defect::Orphan {
                child: eu.into(),
                parent,
            });
        }
    }

    /// Mate loops hold the mates of `lu`'s edgeuses in reverse cyclic order.
    fn loop_mirrors_mate(&self, lu: LoopUseKey, mate: LoopUseKey) -> bool {
        let eus = self.loop_edgeuses(lu);
        let mate_eus = self.loop_edgeuses(mate);
        let n = eus.len();
        if n != mate_eus.len() {
            return false;
        }
        if n == 0 {
            return true;
        }
        let mate_of = |e: EdgeUseKey| self.edgeuses.get(e).map(|d| d.mate);
        let Some(k) = mate_eus.iter().position(|&m| Some(m) == mate_of(eus[n - 1])) else {
            return false;
        };
        eus.iter()
            .rev()
            .enumerate()
            .all(|(i, &e)| mate_of(e) == Some(mate_eus[(i + k) % n]))
    }

    fn check_loopuse(&self, lu: LoopUseKey, d: &LoopUseData, out: &mut Vec<Defect>) {
        let Some(md) = self.loopuses.get(d.mate) else {
            out.push(Defect::Dangling(lu.into()));
            return;
        };
        if md.mate != lu || md.lp != d.lp {
            out.push(Defect::MateNotSymmetric(lu.into()));
        }

        let eus = self.loop_edgeuses(lu);
        for (i, &eu) in eus.iter().enumerate() {
            let next = eus[(i + 1) % eus.len()];
            if self.eu_end_vertex(eu) != self.eu_vertex(next) {
                out.push(Defect::OpenLoop(lu, eu));
            }
        }
        if !self.loop_mirrors_mate(lu, d.mate) {
            out.push(Defect::LoopMateMismatch(lu));
        }

        let (listed, parent): (bool, TopologyKey) = match d.parent {
            LoopUseParent::Face(fu) => (
                self.faceuses
                    .get(fu)
                    .is_some_and(|fd| fd.loopuses.contains(&lu)),
                fu.into(),
            ),
            LoopUseParent::Shell(s) => (
                self.shells
                    .get(s)
                    .is_some_and(|sd| sd.wire_loopuses.contains(&lu)),
                s.into(),
            ),
        };
        if !listed {
            out.push(Defect::Orphan {
                child: lu.into(),
                parent,
            });
        }
    }

    fn check_faceuse(&self, fu: FaceUseKey, d: &FaceUseData, out: &mut Vec<Defect>) {
        let Some(md) = self.faceuses.get(d.mate) else {
            out.push(Defect::Dangling(fu.into()));
            return;
        };
        if md.mate != fu || md.face != d.face {
            out.push(Defect::MateNotSymmetric(fu.into()));
        }
        let opposed = matches!(
            (d.orientation, md.orientation),
            (Orientation::Same, Orientation::Opposite) | (Orientation::Opposite, Orientation::Same)
        );
        if !opposed {
            out.push(Defect::FaceOrientation(fu));
        }
        if !self.faces.contains_key(d.face) {
            out.push(Defect::Dangling(fu.into()));
        }
        let listed = self
            .shells
            .get(d.shell)
            .is_some_and(|sd| sd.faceuses.contains(&fu));
        if !listed {
            out.push(Defect::Orphan {
                child: fu.into(),
                parent: d.shell.into(),
            });
        }
    }

    fn check_edges(&self, out: &mut Vec<Defect>) {
        let mut per_edge: FxHashMap<EdgeKey, usize> = FxHashMap::default();
        for d in self.edgeuses.values() {
            *per_edge.entry(d.edge).or_default() += 1;
        }
        for (e, ed) in &self.edges {
            match self.edgeuses.get(ed.eu) {
                Some(d) if d.edge == e => {}
                _ => {
                    out.push(Defect::EdgeAnchor(e));
                    continue;
                }
            }
            if self.edge_uses(e).len() != per_edge.get(&e).copied().unwrap_or(0) {
                out.push(Defect::BrokenRing(e));
            }
        }
    }

    /// Checks the whole model. An empty list means every invariant holds.
    pub fn check_model(&self) -> Vec<Defect> {
        let mut out = Vec::new();
        for (eu, d) in &self.edgeuses {
            self.check_edgeuse(eu, d, &mut out);
        }
        for (lu, d) in &self.loopuses {
            self.check_loopuse(lu, d, &mut out);
        }
        for (fu, d) in &self.faceuses {
            self.check_faceuse(fu, d, &mut out);
        }
        self.check_edges(&mut out);
        for (s, sd) in &self.shells {
            let listed = self
                .regions
                .get(sd.region)
                .is_some_and(|r| r.shells.contains(&s));
            if !listed {
                out.push(Defect::Orphan {
                    child: s.into(),
                    parent: sd.region.into(),
                });
            }
        }
        if !out.is_empty() {
            tracing::debug!(defects = out.len(), "model check failed");
        }
        out
    }

    /// Checks the elements of one shell.
    pub fn check_shell(&self, shell: ShellKey) -> Vec<Defect> {
        let mut out = Vec::new();
        let Some(sd) = self.shells.get(shell) else {
            out.push(Defect::Dangling(shell.into()));
            return out;
        };
        for &fu in &sd.faceuses {
            let Some(d) = self.faceuses.get(fu) else {
                out.push(Defect::Dangling(fu.into()));
                continue;
            };
            self.check_faceuse(fu, d, &mut out);
            for &lu in &d.loopuses {
                self.check_loop_tree(lu, &mut out);
            }
        }
        for &lu in &sd.wire_loopuses {
            self.check_loop_tree(lu, &mut out);
        }
        for &eu in &sd.wire_edgeuses {
            match self.edgeuses.get(eu) {
                Some(d) => self.check_edgeuse(eu, d, &mut out),
                None => out.push(Defect::Dangling(eu.into())),
            }
        }
        out
    }

    fn check_loop_tree(&self, lu: LoopUseKey, out: &mut Vec<Defect>) {
        let Some(d) = self.loopuses.get(lu) else {
            out.push(Defect::Dangling(lu.into()));
            return;
        };
        self.check_loopuse(lu, d, out);
        for &eu in self.loop_edgeuses(lu) {
            match self.edgeuses.get(eu) {
                Some(ed) => self.check_edgeuse(eu, ed, out),
                None => out.push(Defect::Dangling(eu.into())),
            }
        }
    }

    /// Returns `true` if every edge of the shell's faces is shared by exactly
    /// two faces of the shell.
    pub fn shell_is_closed_manifold(&self, shell: ShellKey) -> bool {
        let eus = self.shell_edgeuses(shell);
        !eus.is_empty()
            && eus.iter().all(|&eu| {
                self.is_wire_eu(eu) || self.radial_face_count(eu, Some(shell)) == 2
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

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
    fn fresh_face_is_consistent() {
        let mut m = Model::new();
        let (s, _) = triangle(&mut m);
        assert!(m.check_model().is_empty());
        assert!(m.check_shell(s).is_empty());
        assert!(!m.shell_is_closed_manifold(s));
    }

    #[test]
    fn broken_radial_is_reported() {
        let mut m = Model::new();
        let (s, fu) = triangle(&mut m);
        let lu = m.outer_loopuse(fu).unwrap();
        let eus = m.loop_edgeuses(lu).to_vec();
        // Point one use's radial at an unrelated edgeuse.
        m.edgeuses[eus[0]].radial = eus[1];
        let defects = m.check_shell(s);
        assert!(defects.contains(&Defect::RadialNotSymmetric(eus[0])));
        assert!(defects.contains(&Defect::RadialOffEdge(eus[0])));
    }

    #[test]
    fn unlisted_loop_is_an_orphan() {
        let mut m = Model::new();
        let (_s, fu) = triangle(&mut m);
        let lu = m.outer_loopuse(fu).unwrap();
        m.faceuses[fu].loopuses.clear();
        assert!(m.check_model().contains(&Defect::Orphan {
            child: lu.into(),
            parent: fu.into(),
        }));
    }
}
