// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![allow(dead_code)]

use nalgebra::{Point3, Vector3};
use nmg_kernel::{FaceUseKey, Model, ShellKey, VertexKey};
use tracing_subscriber::EnvFilter;

/// Shows kernel diagnostics when run with `RUST_LOG=debug`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Which faces of a cube to build and how.
#[derive(Debug, Clone, Copy, Default)]
pub struct CubeSpec {
    /// Lower corner.
    pub origin: Vector3<f64>,
    /// Faces (by index into [`CUBE_FACES`]) to leave out.
    pub skip: &'static [usize],
    /// Faces to wind the wrong way.
    pub flip: &'static [usize],
}

/// Bottom, top, front (y = 0), right, back, left; wound outward.
pub const CUBE_FACES: [[usize; 4]; 6] = [
    [0, 3, 2, 1],
    [4, 5, 6, 7],
    [0, 1, 5, 4],
    [1, 2, 6, 5],
    [2, 3, 7, 6],
    [3, 0, 4, 7],
];

pub const TOP: usize = 1;
pub const FRONT: usize = 2;

/// Corner `i` of a unit cube: bottom ring 0..4, top ring 4..8.
pub fn corner(origin: &Vector3<f64>, i: usize) -> Point3<f64> {
    let offset = Vector3::new(
        f64::from(u8::from(i % 4 == 1 || i % 4 == 2)),
        f64::from(u8::from(i % 4 >= 2)),
        f64::from(u8::from(i >= 4)),
    );
    Point3::from(origin + offset)
}

/// Builds a unit cube in `shell` and glues its faces.
pub fn cube(m: &mut Model, shell: ShellKey, spec: CubeSpec) -> (Vec<VertexKey>, Vec<FaceUseKey>) {
    let v: Vec<VertexKey> = (0..8)
        .map(|i| m.add_vertex(corner(&spec.origin, i)))
        .collect();
    let fus = cube_on(m, shell, &v, spec);
    (v, fus)
}

/// Builds the faces of a cube over existing corner vertices.
pub fn cube_on(m: &mut Model, shell: ShellKey, v: &[VertexKey], spec: CubeSpec) -> Vec<FaceUseKey> {
    let mut fus = Vec::new();
    for (i, face) in CUBE_FACES.iter().enumerate() {
        if spec.skip.contains(&i) {
            continue;
        }
        let mut verts = face.map(|k| v[k]);
        if spec.flip.contains(&i) {
            verts.reverse();
        }
        fus.push(m.cface(shell, &verts).expect("cube face"));
    }
    m.glue_faces(&fus).expect("glue cube");
    fus
}

/// Centre of the cube built from `spec`.
pub fn centre(spec: &CubeSpec) -> Point3<f64> {
    Point3::from(spec.origin + Vector3::repeat(0.5))
}

/// Number of free edgeuses among the shell's faces.
pub fn free_edges(m: &Model, s: ShellKey) -> usize {
    m.shell_edgeuses(s)
        .into_iter()
        .filter(|&eu| m.is_free_edge(eu))
        .count()
}

/// Returns `true` if every front faceuse of `s` faces away from `centre`.
pub fn faces_point_away(m: &Model, s: ShellKey, centre: &Point3<f64>) -> bool {
    m.shell_same_faceuses(s).into_iter().all(|fu| {
        let (Some(n), Some(lu)) = (m.faceuse_normal(fu), m.outer_loopuse(fu)) else {
            return false;
        };
        let pts = m.loop_points(lu);
        let mid = pts.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords) / pts.len() as f64;
        n.dot(&(mid - centre.coords)) > 0.0
    })
}
