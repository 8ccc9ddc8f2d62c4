// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod common;

use approx::assert_relative_eq;
use common::*;
use nalgebra::Vector3;
use nmg_kernel::{CloseOutcome, Model, Tolerance};

#[test]
fn cube_missing_top_gets_its_lid() {
    init_tracing();
    let mut m = Model::new();
    let (_r, s) = m.mrsv();
    let spec = CubeSpec {
        skip: &[TOP],
        ..Default::default()
    };
    cube(&mut m, s, spec);
    assert_eq!(free_edges(&m, s), 8);

    let tol = Tolerance::default();
    let outcome = m.close_shell(s, &tol).unwrap();
    assert_eq!(outcome, CloseOutcome::Closed { faces_added: 1 });
    assert_eq!(free_edges(&m, s), 0);
    assert!(m.shell_is_closed_manifold(s));
    assert!(m.check_model().is_empty());

    let lid = m
        .shell_same_faceuses(s)
        .into_iter()
        .find(|&fu| m.loop_points(m.outer_loopuse(fu).unwrap()).iter().all(|p| p.z > 0.5))
        .expect("new face at z = 1");
    let plane = m.faceuse_plane(lid).unwrap();
    assert_relative_eq!(plane.normal, Vector3::z(), epsilon = 1e-9);
    assert_relative_eq!(plane.d, 1.0, epsilon = 1e-9);
    assert!(faces_point_away(&m, s, &centre(&spec)));
}

#[test]
fn closing_twice_is_a_no_op() {
    let mut m = Model::new();
    let (_r, s) = m.mrsv();
    cube(
        &mut m,
        s,
        CubeSpec {
            skip: &[TOP],
            ..Default::default()
        },
    );
    let tol = Tolerance::default();
    assert!(m.close_shell(s, &tol).unwrap().is_closed());
    let faces = m.face_count();
    assert_eq!(m.close_shell(s, &tol).unwrap(), CloseOutcome::AlreadyClosed);
    assert_eq!(m.face_count(), faces);
}

#[test]
fn bent_hole_is_filled() {
    init_tracing();
    let mut m = Model::new();
    let (_r, s) = m.mrsv();
    let spec = CubeSpec {
        skip: &[TOP, FRONT],
        ..Default::default()
    };
    cube(&mut m, s, spec);
    assert_eq!(free_edges(&m, s), 12);

    let outcome = m.close_shell(s, &Tolerance::default()).unwrap();
    assert!(outcome.is_closed(), "{outcome:?}");
    assert_eq!(free_edges(&m, s), 0);
    assert!(m.shell_is_closed_manifold(s));
    assert!(m.check_model().is_empty());
}

#[test]
fn closed_cube_reports_already_closed() {
    let mut m = Model::new();
    let (_r, s) = m.mrsv();
    cube(&mut m, s, CubeSpec::default());
    assert_eq!(
        m.close_shell(s, &Tolerance::default()).unwrap(),
        CloseOutcome::AlreadyClosed
    );
}
