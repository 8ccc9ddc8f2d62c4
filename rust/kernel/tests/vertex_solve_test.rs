// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod common;

use approx::assert_relative_eq;
use common::*;
use nalgebra::{Point3, Vector3};
use nmg_kernel::{FaceUseKey, Model, Plane, ShellKey, Tolerance, VertexKey};

/// Square pyramid over (+-1, +-1, 0) with its apex at (0, 0, 1).
///
/// Faces are +x, +y, -x, -y and then the base.
fn pyramid(m: &mut Model, s: ShellKey) -> (Vec<VertexKey>, VertexKey, Vec<FaceUseKey>) {
    let base: Vec<VertexKey> = [(1.0, -1.0), (1.0, 1.0), (-1.0, 1.0), (-1.0, -1.0)]
        .iter()
        .map(|&(x, y)| m.add_vertex(Point3::new(x, y, 0.0)))
        .collect();
    let apex = m.add_vertex(Point3::new(0.0, 0.0, 1.0));
    let (a, b, c, d) = (base[0], base[1], base[2], base[3]);
    let fus = vec![
        m.cface(s, &[a, b, apex]).unwrap(),
        m.cface(s, &[b, c, apex]).unwrap(),
        m.cface(s, &[c, d, apex]).unwrap(),
        m.cface(s, &[d, a, apex]).unwrap(),
        m.cface(s, &[a, d, c, b]).unwrap(),
    ];
    m.glue_faces(&fus).unwrap();
    (base, apex, fus)
}

#[test]
fn displaced_apex_returns_to_its_faces() {
    init_tracing();
    let tol = Tolerance::default();
    let mut m = Model::new();
    let (_r, s) = m.mrsv();
    let (_, apex, fus) = pyramid(&mut m, s);
    for &fu in &fus {
        m.fu_planeeqn(fu, &tol).unwrap();
    }
    m.set_vertex_point(apex, Point3::new(0.0, 0.0, 2.0)).unwrap();

    m.in_vert(apex, &tol).unwrap();
    assert_relative_eq!(m.vertex_point(apex).unwrap(), Point3::new(0.0, 0.0, 1.0), epsilon = 1e-6);
    assert_eq!(m.face_count(), 5);
    assert_eq!(m.vertex_count(), 5);
    assert_eq!(m.edge_count(), 8);
    assert!(m.shell_is_closed_manifold(s));
    assert!(m.check_model().is_empty());
}

#[test]
fn steep_side_turns_apex_into_ridge() {
    init_tracing();
    let tol = Tolerance::default();
    let mut m = Model::new();
    let (_r, s) = m.mrsv();
    let (base, apex, fus) = pyramid(&mut m, s);
    let sides = [
        (Vector3::new(1.0, 0.0, 0.5), base[0]),
        (Vector3::new(0.0, 1.0, 1.0), base[1]),
        (Vector3::new(-1.0, 0.0, 1.0), base[2]),
        (Vector3::new(0.0, -1.0, 1.0), base[3]),
    ];
    for (&fu, (normal, through)) in fus.iter().zip(sides) {
        let p = m.vertex_point(through).unwrap();
        m.face_g(fu, Plane::from_point_normal(&p, &normal).unwrap()).unwrap();
    }
    m.fu_planeeqn(fus[4], &tol).unwrap();
    m.set_vertex_point(apex, Point3::new(0.0, 0.0, 3.0)).unwrap();

    m.in_vert(apex, &tol).unwrap();

    // The four sides now meet along a ridge from (0, 0, 1) to (0.5, 0, 1).
    assert_relative_eq!(m.vertex_point(apex).unwrap(), Point3::new(0.25, 0.0, 1.0), epsilon = 1e-6);
    assert_eq!(m.vertex_count(), 7);
    assert_eq!(m.face_count(), 5);
    assert!(m.shell_is_closed_manifold(s));
    assert!(m.check_model().is_empty());

    let verts = m.shell_vertices(s);
    for &v in &verts {
        assert!(m.vert_on_fus(v, &tol), "vertex {v:?} left its faces");
    }
    for ridge_end in [Point3::new(0.5, 0.0, 1.0), Point3::new(0.0, 0.0, 1.0)] {
        let found = verts
            .iter()
            .any(|&v| (m.vertex_point(v).unwrap() - ridge_end).norm() < 1e-6);
        assert!(found, "no vertex at {ridge_end:?}");
    }
}

#[test]
fn cube_edge_moves_through_point() {
    init_tracing();
    let tol = Tolerance::default();
    let mut m = Model::new();
    let (_r, s) = m.mrsv();
    let (v, fus) = cube(&mut m, s, CubeSpec::default());
    for &fu in &fus {
        m.fu_planeeqn(fu, &tol).unwrap();
    }
    let eu = m.findeu(v[5], v[6], Some(s), None, false).unwrap();

    m.move_edge_thru_pt(eu, &Point3::new(1.2, 0.5, 1.2), &tol).unwrap();

    assert_relative_eq!(m.vertex_point(v[5]).unwrap(), Point3::new(1.2, 0.0, 1.2), epsilon = 1e-9);
    assert_relative_eq!(m.vertex_point(v[6]).unwrap(), Point3::new(1.2, 1.0, 1.2), epsilon = 1e-9);
    for i in [1, 2, 4, 7] {
        assert_relative_eq!(m.vertex_point(v[i]).unwrap(), corner(&Vector3::zeros(), i), epsilon = 1e-9);
    }
    for &k in &v {
        assert!(m.vert_on_fus(k, &tol));
    }
    assert!(m.shell_is_closed_manifold(s));
    assert!(m.check_model().is_empty());
}

#[test]
fn crowded_endpoint_rejects_edge_move() {
    init_tracing();
    let tol = Tolerance::default();
    let mut m = Model::new();
    let (_r, s) = m.mrsv();
    let (base, apex, _) = pyramid(&mut m, s);
    let eu = m.findeu(base[0], apex, Some(s), None, false).unwrap();
    let before = m.vertex_point(apex).unwrap();
    assert!(m
        .move_edge_thru_pt(eu, &Point3::new(0.6, -0.6, 0.6), &tol)
        .is_err());
    assert_eq!(m.vertex_point(apex), Some(before));
}
