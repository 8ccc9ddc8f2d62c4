// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bounding boxes, element counts and loop areas.

use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::arena::*;
use crate::error::Result;
use crate::geometry::{polygon_plane_area, Aabb, Plane};
use crate::keys::*;

/// What a shell is made of.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ShellCounts {
    /// Faces, counted once per face (not per use).
    pub faces: usize,
    /// Wire loops, counted once per loop.
    pub wire_loops: usize,
    /// Wire edges, counted once per edge.
    pub wire_edges: usize,
    /// 1 if the shell is a lone vertex.
    pub points: usize,
}

impl ShellCounts {
    /// Adds the counts of another shell.
    pub fn accumulate(&mut self, other: &ShellCounts) {
        self.faces += other.faces;
        self.wire_loops += other.wire_loops;
        self.wire_edges += other.wire_edges;
        self.points += other.points;
    }
}

fn merge(acc: Option<Aabb>, bb: Option<Aabb>) -> Option<Aabb> {
    match (acc, bb) {
        (Some(a), Some(b)) => Some(a.union(&b)),
        (a, b) => a.or(b),
    }
}

impl Model {
    /// Plane and area of a loop, the plane normal following its winding.
    ///
    /// `None` for point loops, cracks and loops without area.
    pub fn loop_plane_area(&self, lu: LoopUseKey) -> Option<(Plane, f64)> {
        if self.loop_edgeuses(lu).is_empty() || self.loop_is_a_crack(lu) {
            return None;
        }
        polygon_plane_area(&self.loop_points(lu))
    }

    /// Counts the faces, wires and points of a shell.
    pub fn count_shell_kids(&self, shell: ShellKey) -> Result<ShellCounts> {
        let sd = self.get_shell(shell)?;
        if sd.vertexuse.is_some() {
            return Ok(ShellCounts {
                points: 1,
                ..Default::default()
            });
        }
        let faces: FxHashSet<FaceKey> = sd
            .faceuses
            .iter()
            .filter_map(|&fu| self.faceuses.get(fu).map(|d| d.face))
            .collect();
        let wire_loops: FxHashSet<LoopKey> = sd
            .wire_loopuses
            .iter()
            .filter_map(|&lu| self.loopuses.get(lu).map(|d| d.lp))
            .collect();
        let wire_edges: FxHashSet<EdgeKey> = sd
            .wire_edgeuses
            .iter()
            .filter_map(|&eu| self.edgeuses.get(eu).map(|d| d.edge))
            .collect();
        Ok(ShellCounts {
            faces: faces.len(),
            wire_loops: wire_loops.len(),
            wire_edges: wire_edges.len(),
            points: 0,
        })
    }

    /// Totals of [`Model::count_shell_kids`] over every shell of the model.
    pub fn count_model_kids(&self) -> ShellCounts {
        let mut total = ShellCounts::default();
        for s in self.shells.keys() {
            if let Ok(counts) = self.count_shell_kids(s) {
                total.accumulate(&counts);
            }
        }
        total
    }

    fn loop_bbox(&self, lu: LoopUseKey) -> Option<Aabb> {
        let d = self.loopuses.get(lu)?;
        match &d.down {
            LoopUseDown::Edges(_) => Aabb::from_points(&self.loop_points(lu)),
            LoopUseDown::Vertex(vu) => {
                let v = self.vertexuses.get(*vu)?.vertex;
                self.vertex_point(v).map(|p| Aabb::from_point(&p))
            }
        }
    }

    /// Recomputes the bounding boxes of every loop, face, shell and region.
    ///
    /// Works bottom-up so each level is built from the boxes just computed
    /// below it. Elements with no geometry get `None`.
    pub fn rebound(&mut self) -> Result<()> {
        let _span = tracing::debug_span!("rebound").entered();
        let mut loops_done = FxHashSet::default();
        let mut faces_done = FxHashSet::default();

        for r in self.region_order.clone() {
            let mut region_bb = None;
            for s in self.regions.get(r).map(|d| d.shells.clone()).unwrap_or_default() {
                let sd = self.get_shell(s)?.clone();
                let mut shell_bb = None;

                for &fu in &sd.faceuses {
                    let d = self.get_fu(fu)?.clone();
                    let mut face_bb = None;
                    for &lu in &d.loopuses {
                        let lp = self.get_lu(lu)?.lp;
                        let bb = self.loop_bbox(lu);
                        if loops_done.insert(lp) {
                            if let Some(l) = self.loops.get_mut(lp) {
                                l.bbox = bb;
                            }
                        }
                        face_bb = merge(face_bb, bb);
                    }
                    if faces_done.insert(d.face) {
                        self.get_face_mut(d.face)?.bbox = face_bb;
                    }
                    shell_bb = merge(shell_bb, face_bb);
                }

                for &lu in &sd.wire_loopuses {
                    let lp = self.get_lu(lu)?.lp;
                    let bb = self.loop_bbox(lu);
                    if loops_done.insert(lp) {
                        if let Some(l) = self.loops.get_mut(lp) {
                            l.bbox = bb;
                        }
                    }
                    shell_bb = merge(shell_bb, bb);
                }
                for &eu in &sd.wire_edgeuses {
                    let bb = self.eu_points(eu).and_then(|(a, b)| Aabb::from_points([&a, &b]));
                    shell_bb = merge(shell_bb, bb);
                }
                if let Some(vu) = sd.vertexuse {
                    let v = self.get_vu(vu)?.vertex;
                    shell_bb = merge(shell_bb, self.vertex_point(v).map(|p| Aabb::from_point(&p)));
                }

                self.get_shell_mut(s)?.bbox = shell_bb;
                region_bb = merge(region_bb, shell_bb);
            }
            self.get_region_mut(r)?.bbox = region_bb;
        }
        tracing::debug!(
            loops = loops_done.len(),
            faces = faces_done.len(),
            "rebounded model"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    #[test]
    fn boxes_grow_bottom_up() {
        let mut m = Model::new();
        let (r, s) = m.mrsv();
        let fu = m
            .cface_from_points(
                s,
                &[
                    Point3::new(0.0, 0.0, 0.0),
                    Point3::new(2.0, 0.0, 0.0),
                    Point3::new(0.0, 3.0, 0.0),
                ],
            )
            .unwrap();
        let a = m.add_vertex(Point3::new(-1.0, 0.0, 4.0));
        let b = m.add_vertex(Point3::new(0.0, 0.0, 0.5));
        m.me_wire(s, a, b).unwrap();
        m.rebound().unwrap();

        let face = m.faceuse(fu).unwrap().face;
        let fb = m.face(face).unwrap().bbox.unwrap();
        assert_relative_eq!(fb.max, Point3::new(2.0, 3.0, 0.0));
        let sb = m.shell(s).unwrap().bbox.unwrap();
        assert_relative_eq!(sb.min, Point3::new(-1.0, 0.0, 0.0));
        assert_relative_eq!(sb.max, Point3::new(2.0, 3.0, 4.0));
        let rb = m.region(r).unwrap().bbox.unwrap();
        assert_relative_eq!(rb.max, sb.max);
    }

    #[test]
    fn counts_distinct_elements() {
        let mut m = Model::new();
        let (_r, s) = m.mrsv();
        assert_eq!(m.count_shell_kids(s).unwrap(), ShellCounts::default());
        let lone = m.add_vertex(Point3::new(9.0, 9.0, 9.0));
        m.add_lone_vertex(s, lone).unwrap();
        assert_eq!(m.count_shell_kids(s).unwrap().points, 1);

        m.cface_from_points(
            s,
            &[
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
        )
        .unwrap();
        let a = m.add_vertex(Point3::new(5.0, 0.0, 0.0));
        let b = m.add_vertex(Point3::new(6.0, 0.0, 0.0));
        let c = m.add_vertex(Point3::new(6.0, 1.0, 0.0));
        m.me_wire(s, a, b).unwrap();
        m.add_wire_loop(s, &[a, b, c]).unwrap();

        let counts = m.count_shell_kids(s).unwrap();
        assert_eq!(
            counts,
            ShellCounts {
                faces: 1,
                wire_loops: 1,
                wire_edges: 1,
                points: 0,
            }
        );
        assert_eq!(m.count_model_kids(), counts);
    }

    #[test]
    fn loop_area_follows_winding() {
        let mut m = Model::new();
        let (_r, s) = m.mrsv();
        let fu = m
            .cface_from_points(
                s,
                &[
                    Point3::new(0.0, 0.0, 1.0),
                    Point3::new(0.0, 2.0, 1.0),
                    Point3::new(2.0, 2.0, 1.0),
                    Point3::new(2.0, 0.0, 1.0),
                ],
            )
            .unwrap();
        let lu = m.outer_loopuse(fu).unwrap();
        let (plane, area) = m.loop_plane_area(lu).unwrap();
        assert_relative_eq!(area, 4.0);
        assert_relative_eq!(plane.normal.z, -1.0);
        assert_relative_eq!(plane.d, -1.0);
    }
}
