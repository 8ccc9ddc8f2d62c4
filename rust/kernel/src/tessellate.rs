// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Triangle export of shells.
//!
//! Each front faceuse is projected onto the coordinate plane most
//! perpendicular to its normal and ear-clipped together with its holes.
//! Triangles are wound counter-clockwise about the faceuse normal.

use nalgebra::{Point3, Vector3};
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::arena::*;
use crate::error::{Error, Result};
use crate::geometry::projection_axes;
use crate::keys::*;

/// Indexed triangle mesh of a shell.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Mesh {
    /// One position per distinct vertex.
    pub positions: Vec<[f64; 3]>,
    /// Triangles as indices into `positions`.
    pub triangles: Vec<[u32; 3]>,
    /// Normal of the face each triangle came from.
    pub normals: Vec<[f64; 3]>,
    /// Vertex each position was taken from.
    #[serde(skip)]
    pub vertices: Vec<VertexKey>,
}

impl Mesh {
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Sum of the triangle areas.
    pub fn area(&self) -> f64 {
        self.triangles
            .iter()
            .map(|t| {
                let [a, b, c] = t.map(|i| Point3::from(self.positions[i as usize]));
                0.5 * (b - a).cross(&(c - a)).norm()
            })
            .sum()
    }
}

impl Model {
    /// Triangulates one faceuse, loops with holes included.
    pub fn tessellate_face(&self, fu: FaceUseKey) -> Result<Vec<[VertexKey; 3]>> {
        let d = self.get_fu(fu)?;
        let normal = self
            .faceuse_normal(fu)
            .ok_or(Error::Degenerate("face has no normal"))?;
        let (u, v) = projection_axes(&normal);

        let mut outer = Vec::new();
        let mut holes = Vec::new();
        for &lu in &d.loopuses {
            let verts = self.loop_vertices(lu);
            if verts.len() < 3 || self.loop_edgeuses(lu).is_empty() {
                continue;
            }
            match self.get_lu(lu)?.orientation {
                Orientation::Same => outer.push(verts),
                Orientation::Opposite => holes.push(verts),
                _ => {}
            }
        }
        if outer.len() > 1 {
            tracing::warn!(?fu, loops = outer.len(), "face has several outer loops");
        }

        let mut triangles = Vec::new();
        for (i, outer_verts) in outer.iter().enumerate() {
            let mut all = outer_verts.clone();
            let mut hole_indices = Vec::new();
            // Holes go with the first outer loop; split_loops_into_faces
            // sorts them out beforehand when that is wrong.
            if i == 0 {
                for hole in &holes {
                    hole_indices.push(all.len());
                    all.extend_from_slice(hole);
                }
            }
            let mut coords = Vec::with_capacity(all.len() * 2);
            for &vk in &all {
                let p = self.get_point(vk)?;
                coords.push(p[u]);
                coords.push(p[v]);
            }
            let indices = earcutr::earcut(&coords, &hole_indices, 2)
                .map_err(|e| Error::Triangulation(format!("{:?}", e)))?;

            for chunk in indices.chunks_exact(3) {
                let mut tri = [all[chunk[0]], all[chunk[1]], all[chunk[2]]];
                let [a, b, c] = [
                    self.get_point(tri[0])?,
                    self.get_point(tri[1])?,
                    self.get_point(tri[2])?,
                ];
                if (b - a).cross(&(c - a)).dot(&normal) < 0.0 {
                    tri.swap(1, 2);
                }
                triangles.push(tri);
            }
        }
        Ok(triangles)
    }

    /// Triangulates every front faceuse of a shell into one indexed mesh.
    ///
    /// Faces that cannot be triangulated are skipped with a warning.
    pub fn tessellate_shell(&self, shell: ShellKey) -> Result<Mesh> {
        let _span = tracing::debug_span!("tessellate_shell", ?shell).entered();
        self.get_shell(shell)?;
        let mut mesh = Mesh::default();
        let mut index: FxHashMap<VertexKey, u32> = FxHashMap::default();

        for fu in self.shell_same_faceuses(shell) {
            let tris = match self.tessellate_face(fu) {
                Ok(tris) => tris,
                Err(e) => {
                    tracing::warn!(?fu, error = %e, "face skipped");
                    continue;
                }
            };
            let n = self.faceuse_normal(fu).unwrap_or_else(Vector3::zeros);
            for tri in tris {
                let mut out = [0u32; 3];
                for (slot, vk) in out.iter_mut().zip(tri) {
                    *slot = match index.get(&vk) {
                        Some(&i) => i,
                        None => {
                            let p = self.get_point(vk)?;
                            let i = mesh.positions.len() as u32;
                            mesh.positions.push([p.x, p.y, p.z]);
                            mesh.vertices.push(vk);
                            index.insert(vk, i);
                            i
                        }
                    };
                }
                mesh.triangles.push(out);
                mesh.normals.push([n.x, n.y, n.z]);
            }
        }
        tracing::debug!(
            triangles = mesh.triangles.len(),
            positions = mesh.positions.len(),
            "tessellated shell"
        );
        Ok(mesh)
    }
}
