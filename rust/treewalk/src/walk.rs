// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The tree walker.
//!
//! A walk runs in two passes. The first descends from each requested path
//! only as far as the region tops and builds a tree of region
//! placeholders. After non-union operators are pushed down, the tree falls
//! apart into independent per-region subtrees, which workers claim one at
//! a time from a shared counter and walk down to their solids.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use nalgebra::Vector3;
use rayon::prelude::*;

use crate::config::WalkConfig;
use crate::db::{Database, Object, Solid};
use crate::error::{Error, Result};
use crate::state::{CombinedTreeState, FullPath, TreeState};
use crate::tree::{mkgift_tree, TreeOp, UnionTree};

/// Axis dot products above this reject a solid's matrix.
const PERPENDICULAR_TOL: f64 = 0.0001;

/// Callbacks that turn a database walk into the caller's geometry.
///
/// One handler is shared by every worker.
pub trait WalkHandler: Sync {
    type Leaf: Clone + Send;
    type Output: Send;

    /// Called when the first pass reaches a region top.
    ///
    /// Returning `false` skips the region, e.g. to leave out air.
    fn region_start(&self, _state: &TreeState, _path: &FullPath) -> bool {
        true
    }

    /// Called once per solid. `None` drops the solid from its region.
    fn leaf(&self, state: &TreeState, path: &FullPath, solid: &Solid) -> Option<Self::Leaf>;

    /// Called once a region's whole tree has been assembled.
    ///
    /// `tree` may be [`UnionTree::Nop`] when nothing in the region
    /// survived.
    fn region_end(
        &self,
        state: &TreeState,
        path: &FullPath,
        tree: UnionTree<Self::Leaf>,
    ) -> Self::Output;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    /// Stop at region tops and leave placeholders.
    Regions,
    /// Walk a region down to its solids.
    Leaves,
}

struct Walker<'a, D: ?Sized, H> {
    db: &'a D,
    handler: &'a H,
    pure_boolean: bool,
}

fn axes_perpendicular(state: &TreeState, path: &FullPath) -> Result<()> {
    let m = state.matrix.fixed_view::<3, 3>(0, 0);
    let a: Vector3<f64> = m * Vector3::x();
    let b: Vector3<f64> = m * Vector3::y();
    let c: Vector3<f64> = m * Vector3::z();
    let (xy, yz, xz) = (a.dot(&b), b.dot(&c), a.dot(&c));
    if xy.abs() < PERPENDICULAR_TOL && yz.abs() < PERPENDICULAR_TOL && xz.abs() < PERPENDICULAR_TOL
    {
        Ok(())
    } else {
        Err(Error::NonPerpendicularMatrix {
            path: path.to_string(),
            xy,
            yz,
            xz,
        })
    }
}

fn placeholder<L>(state: &TreeState, path: &FullPath) -> UnionTree<L> {
    UnionTree::Region(Box::new(CombinedTreeState::new(state, path)))
}

impl<D, H> Walker<'_, D, H>
where
    D: Database + ?Sized,
    H: WalkHandler,
{
    /// Descends from the node `path` ends at.
    ///
    /// `Ok(None)` means the subtree was skipped on purpose; errors drop the
    /// subtree from its parent's member list.
    fn recurse(
        &self,
        ts: &TreeState,
        path: &mut FullPath,
        region_start: &mut Option<CombinedTreeState>,
        pass: Pass,
    ) -> Result<Option<UnionTree<H::Leaf>>> {
        let name = path.current().ok_or(Error::NullPath)?.to_string();
        match self.db.get(&name)? {
            Object::Combination(comb) => {
                let mut nts = ts.clone();
                let is_region = nts.apply_state_from_comb(path, &comb);

                if is_region {
                    if pass == Pass::Regions && !self.handler.region_start(&nts, path) {
                        tracing::debug!(%path, "region skipped by handler");
                        return Ok(None);
                    }
                    if nts.stop_at_regions {
                        return Ok(Some(placeholder(&nts, path)));
                    }
                    if region_start.is_some() {
                        tracing::error!(%path, "region started inside an open region");
                        return Err(Error::RegionAlreadyOpen(path.to_string()));
                    }
                    *region_start = Some(CombinedTreeState::new(&nts, path));
                }

                let mut trees = Vec::with_capacity(comb.members.len());
                for (i, member) in comb.members.iter().enumerate() {
                    let mut ms = nts.clone();
                    if let Err(e) = ms.apply_state_from_memb(self.db, path, member) {
                        tracing::warn!(%path, member = %member.name, error = %e, "member skipped");
                        continue;
                    }
                    let op = if i == 0 {
                        TreeOp::Union
                    } else {
                        member.op.into()
                    };
                    match op {
                        TreeOp::Subtract => ms.sofar.minus = true,
                        TreeOp::Intersect => ms.sofar.intersect = true,
                        _ => {}
                    }
                    match self.recurse(&ms, path, region_start, pass) {
                        Ok(Some(tree)) => trees.push((op, tree)),
                        Ok(None) => {}
                        Err(e) => tracing::warn!(%path, error = %e, "subtree dropped"),
                    }
                    path.pop();
                }

                Ok(Some(
                    mkgift_tree(trees, self.pure_boolean).unwrap_or(UnionTree::Nop),
                ))
            }
            Object::Solid(solid) => {
                axes_perpendicular(ts, path)?;

                if !ts.sofar.region && !ts.stop_at_regions {
                    if region_start.is_some() {
                        tracing::error!(%path, "bare solid inside an open region");
                        return Err(Error::RegionAlreadyOpen(path.to_string()));
                    }
                    tracing::debug!(%path, "solid not contained in a region");
                    let mut invented = CombinedTreeState::new(ts, path);
                    invented.state.sofar.region = true;
                    *region_start = Some(invented);
                }

                match pass {
                    Pass::Regions => Ok(Some(placeholder(ts, path))),
                    Pass::Leaves => self
                        .handler
                        .leaf(ts, path, &solid)
                        .map(|leaf| Some(UnionTree::Leaf(leaf)))
                        .ok_or_else(|| Error::LeafFailed(path.to_string())),
                }
            }
        }
    }

    /// Replaces every region placeholder in `tree` with its walked subtree.
    fn walk_subtree(
        &self,
        tree: &mut UnionTree<H::Leaf>,
        region_start: &mut Option<CombinedTreeState>,
    ) {
        match tree {
            UnionTree::Nop | UnionTree::Leaf(_) => {}
            UnionTree::Region(cts) => {
                let CombinedTreeState {
                    state: mut ts,
                    path: mut path,
                } = std::mem::take(&mut **cts);
                if path.is_empty() {
                    tracing::warn!("region placeholder with null path");
                    *tree = UnionTree::Nop;
                    return;
                }
                ts.stop_at_regions = false;
                // A region already open on this branch turns the rest into
                // its members.
                ts.sofar.region = region_start.is_some();
                *tree = match self.recurse(&ts, &mut path, region_start, Pass::Leaves) {
                    Ok(Some(walked)) => walked,
                    Ok(None) => UnionTree::Nop,
                    Err(e) => {
                        tracing::warn!(%path, error = %e, "region subtree failed");
                        UnionTree::Nop
                    }
                };
            }
            UnionTree::Not(sub) => self.walk_subtree(sub, region_start),
            UnionTree::Binary { left, right, .. } => {
                self.walk_subtree(left, region_start);
                self.walk_subtree(right, region_start);
            }
        }
    }

    /// Claims regions until none are left.
    fn dispatch(
        &self,
        regions: &[Mutex<Option<UnionTree<H::Leaf>>>],
        next: &AtomicUsize,
    ) -> Vec<(usize, H::Output)> {
        let mut done = Vec::new();
        loop {
            let mine = next.fetch_add(1, Ordering::Relaxed);
            let Some(slot) = regions.get(mine) else {
                break;
            };
            let Some(mut tree) = slot.lock().ok().and_then(|mut t| t.take()) else {
                continue;
            };
            tracing::trace!(region = mine, "walking region");

            let mut region_start = None;
            self.walk_subtree(&mut tree, &mut region_start);
            let Some(start) = region_start else {
                tracing::error!(region = mine, "region started with no state");
                continue;
            };
            let output = self.handler.region_end(&start.state, &start.path, tree);
            done.push((mine, output));
        }
        done
    }
}

/// Resolves a slash-separated path into walk state.
///
/// Each combination along the path contributes its state, and each member
/// its matrix; a subtracted or intersected member sets the matching flag.
/// `path` receives the resolved names. An empty string leaves both alone.
pub fn follow_path_for_state<D: Database + ?Sized>(
    db: &D,
    state: &mut TreeState,
    path: &mut FullPath,
    path_str: &str,
) -> Result<()> {
    let mut parts = path_str.split('/').filter(|p| !p.is_empty()).peekable();
    if parts.peek().is_none() {
        return Ok(());
    }

    let mut comb_name = match path.current() {
        Some(name) => name.to_string(),
        None => {
            let Some(first) = parts.next() else {
                return Ok(());
            };
            let entry = db.lookup(first)?;
            path.push(entry.name.clone());
            if !entry.is_combination() {
                if parts.peek().is_some() {
                    return Err(Error::LeafBeforeEndOfPath(path.to_string()));
                }
                return Ok(());
            }
            entry.name
        }
    };

    while let Some(part) = parts.next() {
        let entry = db.lookup(part)?;
        let Object::Combination(comb) = db.get(&comb_name)? else {
            return Err(Error::DefectiveRecord {
                path: path.to_string(),
                reason: "not a combination",
            });
        };
        state.apply_state_from_comb(path, &comb);

        let Some((i, member)) = comb.members.iter().enumerate().find(|(_, m)| m.name == part)
        else {
            return Err(Error::MemberNotFound {
                comb: comb_name,
                member: part.to_string(),
            });
        };
        state.apply_state_from_memb(db, path, member)?;
        if i > 0 {
            match TreeOp::from(member.op) {
                TreeOp::Subtract => state.sofar.minus = true,
                TreeOp::Intersect => state.sofar.intersect = true,
                _ => {}
            }
        }

        if !entry.is_combination() {
            if parts.peek().is_some() {
                return Err(Error::LeafBeforeEndOfPath(path.to_string()));
            }
            break;
        }
        if let Object::Combination(c) = db.get(part)? {
            if c.members.is_empty() {
                return Err(Error::EmptyCombination(part.to_string()));
            }
        }
        comb_name = entry.name;
    }
    tracing::debug!(%path, "followed path");
    Ok(())
}

/// Walks the trees below `paths` and evaluates every region found.
///
/// Returns one entry per region, in the order the regions appear in the
/// combined tree. An entry is `None` when the region could not be started.
/// Regions are walked by `config.workers` workers; which worker takes which
/// region varies between runs but the results do not.
pub fn walk_tree<D, H, S>(
    db: &D,
    paths: &[S],
    config: &WalkConfig,
    init_state: &TreeState,
    handler: &H,
) -> Result<Vec<Option<H::Output>>>
where
    D: Database + ?Sized,
    H: WalkHandler,
    S: AsRef<str>,
{
    let _span = tracing::debug_span!("walk_tree", paths = paths.len()).entered();
    let walker = Walker {
        db,
        handler,
        pure_boolean: config.pure_boolean,
    };

    let mut whole: Option<UnionTree<H::Leaf>> = None;
    for p in paths {
        let p = p.as_ref();
        let mut ts = init_state.clone();
        let mut path = FullPath::new();
        if let Err(e) = follow_path_for_state(db, &mut ts, &mut path, p) {
            tracing::warn!(path = p, error = %e, "path not walked");
            continue;
        }
        if path.is_empty() {
            continue;
        }

        ts.stop_at_regions = true;
        let mut region_start = None;
        let tree = match walker.recurse(&ts, &mut path, &mut region_start, Pass::Regions) {
            Ok(Some(tree)) => tree,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(path = p, error = %e, "path not walked");
                continue;
            }
        };
        whole = Some(match whole {
            None => tree,
            Some(prev) => UnionTree::binary(TreeOp::Union, prev, tree),
        });
    }
    let mut whole = whole.ok_or(Error::NothingToWalk)?;

    whole.non_union_push();
    let regions: Vec<Mutex<Option<UnionTree<H::Leaf>>>> = whole
        .tally_subtree_regions()
        .into_iter()
        .map(|t| Mutex::new(Some(t)))
        .collect();
    let count = regions.len();
    tracing::debug!(regions = count, workers = config.workers, "dispatching regions");

    let next = AtomicUsize::new(0);
    let finished: Vec<(usize, H::Output)> = if config.workers <= 1 {
        walker.dispatch(&regions, &next)
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .build()?;
        pool.install(|| {
            (0..config.workers)
                .into_par_iter()
                .flat_map_iter(|_| walker.dispatch(&regions, &next))
                .collect()
        })
    };

    let mut results: Vec<Option<H::Output>> = std::iter::repeat_with(|| None).take(count).collect();
    for (i, output) in finished {
        results[i] = Some(output);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{BoolOp, Combination, Member, MemDatabase, RegionInfo};
    use approx::assert_relative_eq;
    use nalgebra::Matrix4;

    fn db() -> MemDatabase {
        let mut db = MemDatabase::new();
        db.insert_solid("a.s", "sph", &[]);
        db.insert_solid("b.s", "sph", &[]);
        db.insert_combination(
            "part.r",
            Combination {
                region: Some(RegionInfo {
                    id: 1,
                    ..Default::default()
                }),
                members: vec![
                    Member::new("a.s", BoolOp::Union),
                    Member::new("b.s", BoolOp::Subtract),
                ],
                ..Default::default()
            },
        );
        db.insert_combination(
            "top",
            Combination {
                members: vec![Member::new("part.r", BoolOp::Union).with_matrix(
                    &Matrix4::new_translation(&Vector3::new(0.0, 0.0, 5.0)),
                )],
                color: Some([0, 255, 0]),
                ..Default::default()
            },
        );
        db.insert_combination("empty", Combination::default());
        db
    }

    #[test]
    fn follows_path_through_combinations() {
        let db = db();
        let mut ts = TreeState::default();
        let mut path = FullPath::new();
        follow_path_for_state(&db, &mut ts, &mut path, "/top/part.r/b.s").unwrap();
        assert_eq!(path.to_string(), "/top/part.r/b.s");
        assert!(ts.sofar.region);
        assert!(ts.sofar.minus);
        assert_eq!(ts.region.id, 1);
        assert_eq!(ts.material.color, Some([0.0, 1.0, 0.0]));
        assert_relative_eq!(ts.matrix[(2, 3)], 5.0);
    }

    #[test]
    fn path_errors() {
        let db = db();
        let follow = |p: &str| {
            follow_path_for_state(&db, &mut TreeState::default(), &mut FullPath::new(), p)
        };
        assert!(matches!(follow("a.s/b.s"), Err(Error::LeafBeforeEndOfPath(_))));
        assert!(matches!(follow("top/a.s"), Err(Error::MemberNotFound { .. })));
        assert!(matches!(follow("missing"), Err(Error::NotFound(_))));
        assert!(follow("").is_ok());
    }

    struct Names;

    impl WalkHandler for Names {
        type Leaf = String;
        type Output = String;

        fn leaf(&self, _: &TreeState, path: &FullPath, _: &Solid) -> Option<String> {
            path.current().map(str::to_string)
        }

        fn region_end(&self, _: &TreeState, _: &FullPath, tree: UnionTree<String>) -> String {
            tree.to_string()
        }
    }

    #[test]
    fn first_pass_stops_at_region_tops() {
        let db = db();
        let walker = Walker {
            db: &db,
            handler: &Names,
            pure_boolean: false,
        };
        let ts = TreeState {
            stop_at_regions: true,
            ..Default::default()
        };
        let mut path = FullPath::new();
        path.push("top");
        let mut region_start = None;
        let tree = walker
            .recurse(&ts, &mut path, &mut region_start, Pass::Regions)
            .unwrap()
            .unwrap();
        assert_eq!(tree.to_string(), "region(/top/part.r)");
        assert_eq!(path.to_string(), "/top");
        assert!(region_start.is_none());

        let mut region_start = None;
        let mut tree = tree;
        walker.walk_subtree(&mut tree, &mut region_start);
        assert_eq!(tree.to_string(), "(a.s - b.s)");
        assert_eq!(region_start.unwrap().path.to_string(), "/top/part.r");
    }

    #[test]
    fn skewed_matrix_is_rejected() {
        let mut ts = TreeState::default();
        ts.matrix[(0, 1)] = 0.5;
        let mut path = FullPath::new();
        path.push("a.s");
        assert!(matches!(
            axes_perpendicular(&ts, &path),
            Err(Error::NonPerpendicularMatrix { .. })
        ));
        assert!(axes_perpendicular(&TreeState::default(), &path).is_ok());
    }
}
