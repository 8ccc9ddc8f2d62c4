// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end walks over a small combination database.

use nalgebra::Matrix4;
use nmg_treewalk::{
    walk_tree, BoolOp, Combination, Error, FullPath, MemDatabase, Member, RegionInfo, Solid,
    TreeState, UnionTree, WalkConfig, WalkHandler,
};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Clone, PartialEq)]
struct RegionResult {
    path: String,
    id: i32,
    color: Option<[f64; 3]>,
    tree: String,
}

/// Names each solid after its directory entry; solids of kind `bad` fail.
struct Recorder {
    skip_air: bool,
}

impl WalkHandler for Recorder {
    type Leaf = String;
    type Output = RegionResult;

    fn region_start(&self, state: &TreeState, _path: &FullPath) -> bool {
        !self.skip_air || state.region.aircode == 0
    }

    fn leaf(&self, _state: &TreeState, path: &FullPath, solid: &Solid) -> Option<String> {
        if solid.kind == "bad" {
            return None;
        }
        path.current().map(str::to_string)
    }

    fn region_end(&self, state: &TreeState, path: &FullPath, tree: UnionTree<String>) -> RegionResult {
        RegionResult {
            path: path.to_string(),
            id: state.region.id,
            color: state.material.color,
            tree: tree.to_string(),
        }
    }
}

fn region(id: i32, aircode: i32, members: &[(&str, BoolOp)]) -> Combination {
    Combination {
        region: Some(RegionInfo {
            id,
            aircode,
            ..Default::default()
        }),
        members: members.iter().map(|&(n, op)| Member::new(n, op)).collect(),
        ..Default::default()
    }
}

fn group(members: &[(&str, BoolOp)]) -> Combination {
    Combination {
        members: members.iter().map(|&(n, op)| Member::new(n, op)).collect(),
        ..Default::default()
    }
}

use BoolOp::{Intersect as I, Subtract as S, Union as U};

fn database() -> MemDatabase {
    let mut db = MemDatabase::new();
    for name in ["s1", "s2", "s3", "s4", "s5", "s6"] {
        db.insert_solid(name, "sph", &[0.0, 0.0, 0.0, 1.0]);
    }
    db.insert_solid("broken", "bad", &[]);
    db.insert_combination("r1", region(1, 0, &[("s1", U), ("s2", S)]));
    db.insert_combination("r2", region(2, 0, &[("s3", U), ("s4", I), ("broken", U)]));
    db.insert_combination("air.r", region(3, 1, &[("s5", U)]));
    db.insert_combination("grp", group(&[("r1", U), ("r2", U), ("air.r", U)]));
    db.insert_combination("all", group(&[("grp", U), ("s6", S)]));
    db.insert_combination("loose", group(&[("s1", U), ("s2", U)]));
    db
}

fn walk(db: &MemDatabase, paths: &[&str], workers: usize, skip_air: bool) -> Vec<RegionResult> {
    walk_tree(
        db,
        paths,
        &WalkConfig::with_workers(workers),
        &TreeState::default(),
        &Recorder { skip_air },
    )
    .unwrap()
    .into_iter()
    .map(|r| r.expect("region result"))
    .collect()
}

#[test]
fn subtraction_above_regions_reaches_each_region() {
    init_tracing();
    let db = database();
    let results = walk(&db, &["all"], 1, false);
    let summary: Vec<(&str, i32, &str)> = results
        .iter()
        .map(|r| (r.path.as_str(), r.id, r.tree.as_str()))
        .collect();
    assert_eq!(
        summary,
        [
            ("/all/grp/r1", 1, "((s1 - s2) - s6)"),
            ("/all/grp/r2", 2, "((s3 + s4) - s6)"),
            ("/all/grp/air.r", 3, "(s5 - s6)"),
        ]
    );
}

#[test]
fn rejected_regions_are_left_out() {
    let db = database();
    let results = walk(&db, &["grp"], 2, true);
    let ids: Vec<i32> = results.iter().map(|r| r.id).collect();
    assert_eq!(ids, [1, 2]);
}

#[test]
fn results_do_not_depend_on_worker_count() {
    init_tracing();
    let db = database();
    let paths = ["all", "loose", "r1"];
    let reference = walk(&db, &paths, 1, false);
    assert_eq!(reference.len(), 6);
    for workers in [2, 3, 8] {
        for _ in 0..3 {
            assert_eq!(walk(&db, &paths, workers, false), reference, "workers = {workers}");
        }
    }
}

#[test]
fn bare_solids_become_their_own_regions() {
    let db = database();
    let results = walk(&db, &["loose"], 1, false);
    let trees: Vec<(&str, &str)> = results
        .iter()
        .map(|r| (r.path.as_str(), r.tree.as_str()))
        .collect();
    assert_eq!(trees, [("/loose/s1", "s1"), ("/loose/s2", "s2")]);
}

#[test]
fn failed_and_skewed_solids_are_dropped() {
    let mut db = database();
    let mut shear = Matrix4::identity();
    shear[(0, 1)] = 0.5;
    db.insert_combination(
        "skew.r",
        Combination {
            region: Some(RegionInfo {
                id: 9,
                ..Default::default()
            }),
            members: vec![
                Member::new("s1", U).with_matrix(&shear),
                Member::new("s2", U),
            ],
            ..Default::default()
        },
    );
    let results = walk(&db, &["skew.r", "r2"], 1, false);
    assert_eq!(results[0].tree, "s2");
    assert_eq!(results[1].tree, "(s3 + s4)");
}

#[test]
fn higher_color_locks_out_lower_color() {
    let mut db = database();
    let blue = Combination {
        color: Some([0, 0, 255]),
        ..region(5, 0, &[("s1", U)])
    };
    db.insert_combination("blue.r", blue);
    for (name, inherit) in [("weak", false), ("strong", true)] {
        db.insert_combination(
            name,
            Combination {
                color: Some([255, 0, 0]),
                inherit,
                ..group(&[("blue.r", U)])
            },
        );
    }
    assert_eq!(walk(&db, &["weak"], 1, false)[0].color, Some([0.0, 0.0, 1.0]));
    assert_eq!(walk(&db, &["strong"], 1, false)[0].color, Some([1.0, 0.0, 0.0]));
}

#[test]
fn pure_boolean_reads_members_left_to_right() {
    let mut db = database();
    db.insert_combination("mix.r", region(4, 0, &[("s1", U), ("s2", U), ("s3", S)]));
    let run = |pure_boolean| {
        let config = WalkConfig {
            workers: 1,
            pure_boolean,
        };
        walk_tree(&db, &["mix.r"], &config, &TreeState::default(), &Recorder { skip_air: false })
            .unwrap()
            .remove(0)
            .map(|r| r.tree)
    };
    assert_eq!(run(false).as_deref(), Some("(s1 u (s2 - s3))"));
    assert_eq!(run(true).as_deref(), Some("((s1 u s2) - s3)"));
}

#[test]
fn nothing_to_walk() {
    let db = database();
    let err = walk_tree(
        &db,
        &["missing", "s1/s2"],
        &WalkConfig::with_workers(1),
        &TreeState::default(),
        &Recorder { skip_air: false },
    )
    .unwrap_err();
    assert!(matches!(err, Error::NothingToWalk));
}
