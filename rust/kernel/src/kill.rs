// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Kill operations.
//!
//! Each kill removes an element together with its mate and everything below
//! it, then reports whether the parent was left empty. Cascading upward is the
//! caller's decision.

use crate::arena::*;
use crate::error::{Error, Result};
use crate::keys::*;

/// What a kill left behind in the parent element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Cascade {
    /// The parent still has children.
    Continue,
    /// The parent has nothing left and should be killed too.
    ParentNowEmpty,
}

impl Cascade {
    fn from_empty(empty: bool) -> Self {
        if empty {
            Cascade::ParentNowEmpty
        } else {
            Cascade::Continue
        }
    }

    /// Returns `true` for [`Cascade::ParentNowEmpty`].
    pub fn parent_now_empty(self) -> bool {
        self == Cascade::ParentNowEmpty
    }
}

impl Model {
    /// Frees an edgeuse pair that its owners no longer list.
    pub(crate) fn free_eu_pair(&mut self, eu: EdgeUseKey) -> Result<()> {
        let d = self.get_eu(eu)?;
        let (mate, edge, vu) = (d.mate, d.edge, d.vu);
        let mate_vu = self.get_eu(mate)?.vu;
        if !self.unlink_from_ring(eu)? {
            self.edges.remove(edge);
        }
        self.free_vertexuse(vu);
        self.free_vertexuse(mate_vu);
        self.edgeuses.remove(eu);
        self.edgeuses.remove(mate);
        Ok(())
    }

    /// Kills an edgeuse and its mate.
    ///
    /// For a loop edge the two uses leave their loops, which are not rejoined;
    /// the result is `ParentNowEmpty` when the loop has no edges left. For a
    /// wire edge it is `ParentNowEmpty` when the shell is empty.
    pub fn keu(&mut self, eu: EdgeUseKey) -> Result<Cascade> {
        let d = self.get_eu(eu)?;
        let mate = d.mate;
        let (parent, mate_parent) = (d.parent, self.get_eu(mate)?.parent);

        let cascade = match (parent, mate_parent) {
            (EdgeUseParent::Loop(lu), EdgeUseParent::Loop(lu_mate)) => {
                for (l, e) in [(lu, eu), (lu_mate, mate)] {
                    if let LoopUseDown::Edges(eus) = &mut self.get_lu_mut(l)?.down {
                        eus.retain(|&x| x != e);
                    }
                }
                self.free_eu_pair(eu)?;
                Cascade::from_empty(self.loop_edgeuses(lu).is_empty())
            }
            (EdgeUseParent::Shell(s), _) | (_, EdgeUseParent::Shell(s)) => {
                self.get_shell_mut(s)?
                    .wire_edgeuses
                    .retain(|&x| x != eu && x != mate);
                self.free_eu_pair(eu)?;
                Cascade::from_empty(self.get_shell(s)?.is_empty())
            }
        };
        Ok(cascade)
    }

    /// Kills a loopuse, its mate and all their edges or vertices.
    ///
    /// `ParentNowEmpty` means the owning faceuse has no loops left (face loop)
    /// or the owning shell is empty (wire loop).
    pub fn klu(&mut self, lu: LoopUseKey) -> Result<Cascade> {
        let d = self.get_lu(lu)?;
        let (mate, lp, parent) = (d.mate, d.lp, d.parent);
        let down = d.down.clone();
        let mate_down = self.get_lu(mate)?.down.clone();

        match down {
            LoopUseDown::Edges(eus) => {
                for eu in eus {
                    self.free_eu_pair(eu)?;
                }
            }
            LoopUseDown::Vertex(vu) => self.free_vertexuse(vu),
        }
        if let LoopUseDown::Vertex(vu) = mate_down {
            self.free_vertexuse(vu);
        }

        let empty = match parent {
            LoopUseParent::Face(fu) => {
                let fu_mate = self.get_fu(fu)?.mate;
                self.get_fu_mut(fu)?.loopuses.retain(|&l| l != lu);
                self.get_fu_mut(fu_mate)?.loopuses.retain(|&l| l != mate);
                self.get_fu(fu)?.loopuses.is_empty()
            }
            LoopUseParent::Shell(s) => {
                self.get_shell_mut(s)?
                    .wire_loopuses
                    .retain(|&l| l != lu && l != mate);
                self.get_shell(s)?.is_empty()
            }
        };
        self.loopuses.remove(lu);
        self.loopuses.remove(mate);
        self.loops.remove(lp);
        Ok(Cascade::from_empty(empty))
    }

    /// Kills a faceuse, its mate, their loops and the face.
    ///
    /// `ParentNowEmpty` means the shell is empty.
    pub fn kfu(&mut self, fu: FaceUseKey) -> Result<Cascade> {
        let d = self.get_fu(fu)?;
        let (mate, face, shell) = (d.mate, d.face, d.shell);
        let loops = d.loopuses.clone();
        for lu in loops {
            let _ = self.klu(lu)?;
        }
        self.get_shell_mut(shell)?
            .faceuses
            .retain(|&f| f != fu && f != mate);
        self.faceuses.remove(fu);
        self.faceuses.remove(mate);
        self.faces.remove(face);
        Ok(Cascade::from_empty(self.get_shell(shell)?.is_empty()))
    }

    /// Kills a lone or point-loop vertexuse.
    ///
    /// For a shell's lone vertex, `ParentNowEmpty` means the shell is empty.
    /// A point loop is always empty afterwards. Vertexuses of edgeuses die
    /// with their edgeuse and are rejected here.
    pub fn kvu(&mut self, vu: VertexUseKey) -> Result<Cascade> {
        match self.get_vu(vu)?.parent {
            VertexUseParent::Shell(s) => {
                let sd = self.get_shell_mut(s)?;
                if sd.vertexuse == Some(vu) {
                    sd.vertexuse = None;
                }
                self.free_vertexuse(vu);
                Ok(Cascade::from_empty(self.get_shell(s)?.is_empty()))
            }
            VertexUseParent::LoopUse(lu) => {
                self.free_vertexuse(vu);
                self.get_lu_mut(lu)?.down = LoopUseDown::Edges(Vec::new());
                Ok(Cascade::ParentNowEmpty)
            }
            VertexUseParent::EdgeUse(eu) => {
                tracing::error!(?vu, ?eu, "cannot kill the vertexuse of an edgeuse");
                Err(Error::Degenerate("vertexuse belongs to an edgeuse"))
            }
        }
    }

    /// Kills a shell and everything in it.
    ///
    /// `ParentNowEmpty` means the region has no shells left.
    pub fn ks(&mut self, shell: ShellKey) -> Result<Cascade> {
        let region = self.get_shell(shell)?.region;
        while let Some(&fu) = self.get_shell(shell)?.faceuses.first() {
            let _ = self.kfu(fu)?;
        }
        while let Some(&lu) = self.get_shell(shell)?.wire_loopuses.first() {
            let _ = self.klu(lu)?;
        }
        while let Some(&eu) = self.get_shell(shell)?.wire_edgeuses.first() {
            let _ = self.keu(eu)?;
        }
        if let Some(vu) = self.get_shell(shell)?.vertexuse {
            let _ = self.kvu(vu)?;
        }
        self.shells.remove(shell);
        let r = self.get_region_mut(region)?;
        r.shells.retain(|&s| s != shell);
        Ok(Cascade::from_empty(r.shells.is_empty()))
    }

    /// Kills a region and all its shells.
    ///
    /// `ParentNowEmpty` means the model has no regions left.
    pub fn kr(&mut self, region: RegionKey) -> Result<Cascade> {
        let shells = self
            .regions
            .get(region)
            .ok_or(Error::RegionNotFound(region))?
            .shells
            .clone();
        for s in shells {
            let _ = self.ks(s)?;
        }
        self.regions.remove(region);
        self.region_order.retain(|&r| r != region);
        Ok(Cascade::from_empty(self.region_order.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn triangle(m: &mut Model, s: ShellKey) -> FaceUseKey {
        m.cface_from_points(
            s,
            &[
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn keu_reports_empty_loop() {
        let mut m = Model::new();
        let (_r, s) = m.mrsv();
        let fu = triangle(&mut m, s);
        let lu = m.faceuse(fu).unwrap().loopuses[0];
        let eus = m.loop_edgeuses(lu).to_vec();
        assert_eq!(m.keu(eus[0]).unwrap(), Cascade::Continue);
        assert_eq!(m.keu(eus[1]).unwrap(), Cascade::Continue);
        assert_eq!(m.keu(eus[2]).unwrap(), Cascade::ParentNowEmpty);
        assert_eq!(m.edge_count(), 0);
        assert_eq!(m.vertex_count(), 0);
    }

    #[test]
    fn klu_then_kfu_empties_shell() {
        let mut m = Model::new();
        let (_r, s) = m.mrsv();
        let fu = triangle(&mut m, s);
        let lu = m.faceuse(fu).unwrap().loopuses[0];
        assert!(m.klu(lu).unwrap().parent_now_empty());
        assert_eq!(m.kfu(fu).unwrap(), Cascade::ParentNowEmpty);
        assert_eq!(m.face_count(), 0);
        assert!(m.shell(s).unwrap().is_empty());
    }

    #[test]
    fn kfu_keeps_shared_edges_alive() {
        let mut m = Model::new();
        let (_r, s) = m.mrsv();
        let a = m.add_vertex(Point3::new(0.0, 0.0, 0.0));
        let b = m.add_vertex(Point3::new(1.0, 0.0, 0.0));
        let c = m.add_vertex(Point3::new(0.0, 1.0, 0.0));
        let d = m.add_vertex(Point3::new(0.0, 0.0, 1.0));
        let f1 = m.cface(s, &[a, c, b]).unwrap();
        let f2 = m.cface(s, &[a, b, d]).unwrap();
        m.glue_faces(&[f1, f2]).unwrap();
        assert_eq!(m.edge_count(), 5);

        assert_eq!(m.kfu(f1).unwrap(), Cascade::Continue);
        assert_eq!(m.edge_count(), 3);
        let lu = m.faceuse(f2).unwrap().loopuses[0];
        assert!(m.loop_edgeuses(lu).iter().all(|&eu| m.is_free_edge(eu)));
        assert!(m.vertex(c).is_none());
        assert!(m.check_model().is_empty());
    }

    #[test]
    fn kvu_and_wire_kills() {
        let mut m = Model::new();
        let (r, s) = m.mrsv();
        let a = m.add_vertex(Point3::origin());
        let b = m.add_vertex(Point3::new(1.0, 0.0, 0.0));
        let vu = m.add_lone_vertex(s, a).unwrap();
        let eu = m.me_wire(s, a, b).unwrap();
        assert_eq!(m.kvu(vu).unwrap(), Cascade::Continue);
        assert_eq!(m.keu(eu).unwrap(), Cascade::ParentNowEmpty);
        assert_eq!(m.ks(s).unwrap(), Cascade::ParentNowEmpty);
        assert_eq!(m.kr(r).unwrap(), Cascade::ParentNowEmpty);
        assert!(m.regions().is_empty());
    }

    #[test]
    fn kvu_rejects_edge_vertexuse() {
        let mut m = Model::new();
        let (_r, s) = m.mrsv();
        let a = m.add_vertex(Point3::origin());
        let b = m.add_vertex(Point3::new(1.0, 0.0, 0.0));
        let eu = m.me_wire(s, a, b).unwrap();
        let vu = m.edgeuse(eu).unwrap().vu;
        assert!(m.kvu(vu).is_err());
    }

    #[test]
    fn ks_removes_everything() {
        let mut m = Model::new();
        let (r, s) = m.mrsv();
        triangle(&mut m, s);
        let v = m.add_vertex(Point3::new(3.0, 3.0, 3.0));
        m.add_point_loop(s, v).unwrap();
        let s2 = m.msv(r).unwrap();
        assert_eq!(m.ks(s).unwrap(), Cascade::Continue);
        assert_eq!(m.face_count(), 0);
        assert_eq!(m.loop_count(), 0);
        assert_eq!(m.vertex_count(), 0);
        assert_eq!(m.region(r).unwrap().shells, vec![s2]);
    }
}
