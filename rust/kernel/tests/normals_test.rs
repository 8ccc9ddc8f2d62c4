// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod common;

use common::*;
use nalgebra::Vector3;
use nmg_kernel::{Model, Orientation, Tolerance};

fn radial_neighbours_agree(m: &Model, s: nmg_kernel::ShellKey) -> bool {
    m.shell_same_faceuses(s).into_iter().all(|fu| {
        let lu = m.outer_loopuse(fu).unwrap();
        m.loop_edgeuses(lu).iter().all(|&eu| {
            let radial = m.edgeuse(eu).unwrap().radial;
            let other = m.find_fu_of_eu(radial).unwrap();
            m.faceuse(other).unwrap().orientation == Orientation::Same
        })
    })
}

#[test]
fn reversed_side_face_is_turned_outward() {
    init_tracing();
    let mut m = Model::new();
    let (_r, s) = m.mrsv();
    let spec = CubeSpec {
        flip: &[FRONT],
        ..Default::default()
    };
    cube(&mut m, s, spec);
    assert!(!faces_point_away(&m, s, &centre(&spec)));

    let reversed = m.fix_normals(s, &Tolerance::default()).unwrap();
    assert_eq!(reversed, 1);
    assert!(faces_point_away(&m, s, &centre(&spec)));
    assert!(radial_neighbours_agree(&m, s));
    assert!(!m.shell_is_void(s).unwrap());
    assert!(m.check_model().is_empty());
}

#[test]
fn disjoint_pieces_are_each_fixed() {
    let mut m = Model::new();
    let (_r, s) = m.mrsv();
    let a = CubeSpec {
        flip: &[TOP],
        ..Default::default()
    };
    let b = CubeSpec {
        origin: Vector3::new(0.0, 4.0, -3.0),
        flip: &[FRONT],
        ..Default::default()
    };
    cube(&mut m, s, a);
    cube(&mut m, s, b);

    let reversed = m.fix_normals(s, &Tolerance::default()).unwrap();
    assert_eq!(reversed, 2);
    let tol = Tolerance::default();
    assert_eq!(m.decompose_shell(s, &tol).unwrap(), 2);
    let region = m.shell(s).unwrap().region;
    for sh in m.region(region).unwrap().shells.clone() {
        let spec = if m.shell_vertices(sh).iter().any(|&v| m.vertex_point(v).unwrap().y > 2.0) {
            b
        } else {
            a
        };
        assert!(faces_point_away(&m, sh, &centre(&spec)));
    }
}

#[test]
fn consistent_shell_needs_no_work() {
    let mut m = Model::new();
    let (_r, s) = m.mrsv();
    cube(&mut m, s, CubeSpec::default());
    assert_eq!(m.fix_normals(s, &Tolerance::default()).unwrap(), 0);
    assert!(radial_neighbours_agree(&m, s));
}
