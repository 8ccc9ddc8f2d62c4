// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # NMG Tree Walk
//!
//! Parallel walker over boolean combination trees.
//!
//! Starting from one or more named objects, [`walk_tree`] finds every region
//! below them, rewrites the combined tree so that only unions sit above the
//! regions, and then walks each region down to its solids on a pool of
//! workers. A [`WalkHandler`] decides what a solid becomes and what to do
//! with each finished region tree.
//!
//! ## Example
//!
//! ```
//! use nmg_treewalk::{
//!     walk_tree, BoolOp, Combination, FullPath, MemDatabase, Member, RegionInfo, Solid,
//!     TreeState, UnionTree, WalkConfig, WalkHandler,
//! };
//!
//! struct Names;
//!
//! impl WalkHandler for Names {
//!     type Leaf = String;
//!     type Output = String;
//!
//!     fn leaf(&self, _: &TreeState, path: &FullPath, _: &Solid) -> Option<String> {
//!         path.current().map(str::to_string)
//!     }
//!
//!     fn region_end(&self, _: &TreeState, _: &FullPath, tree: UnionTree<String>) -> String {
//!         tree.to_string()
//!     }
//! }
//!
//! let mut db = MemDatabase::new();
//! db.insert_solid("block", "arb8", &[]);
//! db.insert_solid("bore", "rcc", &[]);
//! db.insert_combination(
//!     "part",
//!     Combination {
//!         region: Some(RegionInfo { id: 1, ..Default::default() }),
//!         members: vec![
//!             Member::new("block", BoolOp::Union),
//!             Member::new("bore", BoolOp::Subtract),
//!         ],
//!         ..Default::default()
//!     },
//! );
//!
//! let out = walk_tree(&db, &["part"], &WalkConfig::with_workers(2), &TreeState::default(), &Names)
//!     .unwrap();
//! assert_eq!(out, vec![Some("(block - bore)".to_string())]);
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod state;
pub mod tree;
pub mod walk;

pub use config::WalkConfig;
pub use db::{
    BoolOp, Combination, Database, DirEntry, MaterialSpec, Member, MemDatabase, Object,
    ObjectKind, RegionInfo, Solid,
};
pub use error::{Error, Result};
pub use state::{CombinedTreeState, FullPath, Inherit, MaterialState, Sofar, TreeState};
pub use tree::{mkbool_tree, mkgift_tree, TreeOp, UnionTree};
pub use walk::{follow_path_for_state, walk_tree, WalkHandler};
