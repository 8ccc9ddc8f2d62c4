// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Affine transformations of shells and whole models.
//!
//! Vertices are moved in place and face planes are carried along with the
//! inverse-transpose of the matrix. A matrix with a negative determinant
//! turns every loop inside out, so faces are reversed afterwards to keep the
//! front side's loops counter-clockwise about its normal.

use nalgebra::{Matrix3, Matrix4, Point3, Vector3};
use rustc_hash::FxHashSet;

use crate::arena::*;
use crate::error::{Error, Result};
use crate::geometry::Plane;
use crate::keys::*;

/// A matrix prepared for moving points and planes.
struct PreparedTransform {
    matrix: Matrix4<f64>,
    normal_matrix: Matrix3<f64>,
    reflects: bool,
}

impl PreparedTransform {
    fn new(matrix: &Matrix4<f64>) -> Result<Self> {
        let linear = matrix.fixed_view::<3, 3>(0, 0).into_owned();
        let det = linear.determinant();
        if det.abs() < 1e-12 {
            tracing::error!(det, "singular transform");
            return Err(Error::SingularTransform);
        }
        let normal_matrix = linear
            .try_inverse()
            .ok_or(Error::SingularTransform)?
            .transpose();
        Ok(Self {
            matrix: *matrix,
            normal_matrix,
            reflects: det < 0.0,
        })
    }

    fn point(&self, p: &Point3<f64>) -> Point3<f64> {
        self.matrix.transform_point(p)
    }

    fn plane(&self, plane: &Plane) -> Option<Plane> {
        let on_plane = Point3::from(plane.normal * plane.d);
        let normal: Vector3<f64> = self.normal_matrix * plane.normal;
        Plane::from_point_normal(&self.point(&on_plane), &normal)
    }
}

impl Model {
    fn apply_transform(
        &mut self,
        vertices: &[VertexKey],
        faces: &[FaceKey],
        t: &PreparedTransform,
    ) -> Result<()> {
        for &v in vertices {
            let p = self.get_point(v)?;
            self.set_vertex_point(v, t.point(&p))?;
        }
        for &f in faces {
            let plane = self.get_face(f)?.plane;
            if let Some(plane) = plane {
                let moved = t.plane(&plane);
                if moved.is_none() {
                    tracing::warn!(?f, "face plane lost in transform");
                }
                // The front use's loops now wind the other way, so the stored
                // plane goes with the back side until the face is reversed.
                self.get_face_mut(f)?.plane = if t.reflects {
                    moved.map(|p| p.reversed())
                } else {
                    moved
                };
            }
            if t.reflects {
                let fu = self.get_face(f)?.fu;
                self.reverse_face(fu)?;
            }
        }
        Ok(())
    }

    fn shell_faces(&self, shell: ShellKey) -> Result<Vec<FaceKey>> {
        let mut seen = FxHashSet::default();
        Ok(self
            .get_shell(shell)?
            .faceuses
            .iter()
            .filter_map(|&fu| self.faceuses.get(fu).map(|d| d.face))
            .filter(|&f| seen.insert(f))
            .collect())
    }

    /// Applies an affine transform to every vertex and face of a shell.
    ///
    /// Vertices shared with other shells move too.
    pub fn transform_shell(&mut self, shell: ShellKey, matrix: &Matrix4<f64>) -> Result<()> {
        let t = PreparedTransform::new(matrix)?;
        let vertices = self.shell_vertices(shell);
        let faces = self.shell_faces(shell)?;
        self.apply_transform(&vertices, &faces, &t)?;
        tracing::debug!(
            ?shell,
            vertices = vertices.len(),
            faces = faces.len(),
            reflects = t.reflects,
            "transformed shell"
        );
        self.rebound()
    }

    /// Moves a shell by `offset`.
    pub fn translate_shell(&mut self, shell: ShellKey, offset: &Vector3<f64>) -> Result<()> {
        self.transform_shell(shell, &Matrix4::new_translation(offset))
    }

    /// Applies an affine transform to the whole model.
    pub fn transform_model(&mut self, matrix: &Matrix4<f64>) -> Result<()> {
        let t = PreparedTransform::new(matrix)?;
        let vertices: Vec<VertexKey> = self.vertices.keys().collect();
        let faces: Vec<FaceKey> = self.faces.keys().collect();
        self.apply_transform(&vertices, &faces, &t)?;
        tracing::debug!(
            vertices = vertices.len(),
            faces = faces.len(),
            reflects = t.reflects,
            "transformed model"
        );
        self.rebound()
    }

    /// Reflects the model across the Y = 0 plane.
    ///
    /// Every face is reversed, so front sides that faced outwards still do.
    pub fn mirror_model(&mut self) -> Result<()> {
        self.transform_model(&Matrix4::from_diagonal(&nalgebra::Vector4::new(
            1.0, -1.0, 1.0, 1.0,
        )))
    }
}
