// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! State carried down a branch of the tree walk.
//!
//! A [`TreeState`] is copied at every combination member so each branch
//! can change it independently. The [`FullPath`] is shared along one
//! descent and pushed and popped as members are entered and left.

use std::fmt;

use nalgebra::Matrix4;

use crate::db::{Combination, Database, Member, RegionInfo};
use crate::error::Result;

/// What the walk has passed through on the way to the current node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sofar {
    /// Inside a region.
    pub region: bool,
    /// Below a subtracted member.
    pub minus: bool,
    /// Below an intersected member.
    pub intersect: bool,
}

impl Sofar {
    /// Inside a region and not being taken away from it.
    fn unioned_into_region(&self) -> bool {
        self.region && !self.minus && !self.intersect
    }
}

/// Which level of the tree decides a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Inherit {
    /// The lowest combination that sets it wins.
    #[default]
    Lower,
    /// The combination that set it locks it against lower ones.
    Higher,
}

impl From<bool> for Inherit {
    fn from(higher: bool) -> Self {
        if higher {
            Inherit::Higher
        } else {
            Inherit::Lower
        }
    }
}

/// Color and material inherited down the tree.
///
/// Color and material have separate inheritance interlocks.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MaterialState {
    /// Color in 0..=1 per channel, `None` until a combination sets one.
    pub color: Option<[f64; 3]>,
    pub color_inherit: Inherit,
    pub name: String,
    pub params: String,
    pub material_inherit: Inherit,
}

/// Per-branch walk state.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeState {
    pub sofar: Sofar,
    pub region: RegionInfo,
    pub material: MaterialState,
    /// Accumulated placement from the root to the current node.
    pub matrix: Matrix4<f64>,
    /// Stop descending at region tops.
    pub stop_at_regions: bool,
}

impl Default for TreeState {
    fn default() -> Self {
        Self {
            sofar: Sofar::default(),
            region: RegionInfo::default(),
            material: MaterialState::default(),
            matrix: Matrix4::identity(),
            stop_at_regions: false,
        }
    }
}

impl TreeState {
    /// Applies the color, material and region flag of a combination.
    ///
    /// Returns `true` if the combination starts a new region.
    pub fn apply_state_from_comb(&mut self, path: &FullPath, comb: &Combination) -> bool {
        if let Some(rgb) = comb.color {
            if self.sofar.region {
                if self.sofar.unioned_into_region() {
                    tracing::warn!(%path, "color override in combination within region, ignored");
                }
            } else if self.material.color_inherit == Inherit::Lower {
                self.material.color = Some(rgb.map(|c| f64::from(c) / 255.0));
                self.material.color_inherit = comb.inherit.into();
            }
        }

        if let Some(spec) = comb.material.as_ref().filter(|m| !m.name.is_empty()) {
            if self.sofar.region {
                if self.sofar.unioned_into_region() {
                    tracing::warn!(%path, "material in combination within region, ignored");
                }
            } else if self.material.material_inherit == Inherit::Lower {
                self.material.name = spec.name.clone();
                self.material.params = spec.params.clone();
                self.material.material_inherit = comb.inherit.into();
            }
        }

        if let Some(info) = comb.region {
            if self.sofar.region {
                if self.sofar.unioned_into_region() {
                    tracing::warn!(%path, "region unioned into region, lower region info ignored");
                }
            } else {
                self.sofar.region = true;
                self.region = info;
                return true;
            }
        }
        false
    }

    /// Looks up a member, pushes it on `path` and accumulates its matrix.
    ///
    /// The caller pops the path when done with the member.
    pub fn apply_state_from_memb<D: Database + ?Sized>(
        &mut self,
        db: &D,
        path: &mut FullPath,
        member: &Member,
    ) -> Result<()> {
        let entry = db.lookup(&member.name)?;
        path.push(entry.name);
        self.matrix *= member.matrix();
        Ok(())
    }
}

/// Names from the walk root to the current node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FullPath {
    names: Vec<String>,
}

impl FullPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>) {
        self.names.push(name.into());
    }

    pub fn pop(&mut self) -> Option<String> {
        self.names.pop()
    }

    /// The node the path ends at.
    pub fn current(&self) -> Option<&str> {
        self.names.last().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl fmt::Display for FullPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.names.is_empty() {
            return f.write_str("/");
        }
        for name in &self.names {
            write!(f, "/{}", name)?;
        }
        Ok(())
    }
}

/// A state together with the path it was taken at.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CombinedTreeState {
    pub state: TreeState,
    pub path: FullPath,
}

impl CombinedTreeState {
    pub fn new(state: &TreeState, path: &FullPath) -> Self {
        Self {
            state: state.clone(),
            path: path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MaterialSpec, MemDatabase};
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector3};

    fn colored(rgb: [u8; 3], inherit: bool) -> Combination {
        Combination {
            color: Some(rgb),
            inherit,
            ..Default::default()
        }
    }

    fn region(id: i32) -> Combination {
        Combination {
            region: Some(RegionInfo {
                id,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn lower_color_wins_by_default() {
        let path = FullPath::new();
        let mut ts = TreeState::default();
        ts.apply_state_from_comb(&path, &colored([255, 0, 0], false));
        ts.apply_state_from_comb(&path, &colored([0, 0, 255], false));
        assert_eq!(ts.material.color, Some([0.0, 0.0, 1.0]));
    }

    #[test]
    fn inherit_locks_color_and_material_separately() {
        let path = FullPath::new();
        let mut ts = TreeState::default();
        ts.apply_state_from_comb(&path, &colored([255, 0, 0], true));
        ts.apply_state_from_comb(
            &path,
            &Combination {
                color: Some([0, 255, 0]),
                material: Some(MaterialSpec {
                    name: "plastic".into(),
                    params: "sh=4".into(),
                }),
                ..Default::default()
            },
        );
        assert_eq!(ts.material.color, Some([1.0, 0.0, 0.0]));
        assert_eq!(ts.material.name, "plastic");
        assert_eq!(ts.material.material_inherit, Inherit::Lower);
    }

    #[test]
    fn region_starts_once() {
        let path = FullPath::new();
        let mut ts = TreeState::default();
        assert!(ts.apply_state_from_comb(&path, &region(3)));
        assert!(ts.sofar.region);
        assert!(!ts.apply_state_from_comb(&path, &region(4)));
        assert_eq!(ts.region.id, 3);
    }

    #[test]
    fn color_inside_region_is_ignored() {
        let path = FullPath::new();
        let mut ts = TreeState::default();
        ts.apply_state_from_comb(&path, &region(1));
        ts.apply_state_from_comb(&path, &colored([9, 9, 9], false));
        assert_eq!(ts.material.color, None);
    }

    #[test]
    fn member_matrices_accumulate_root_first() {
        let mut db = MemDatabase::new();
        db.insert_solid("s", "sph", &[]);
        let mut path = FullPath::new();
        path.push("top");
        let mut ts = TreeState::default();

        let scale = Member::new("s", Default::default()).with_matrix(&Matrix4::new_scaling(2.0));
        let shift = Member::new("s", Default::default())
            .with_matrix(&Matrix4::new_translation(&Vector3::new(1.0, 0.0, 0.0)));
        ts.apply_state_from_memb(&db, &mut path, &scale).unwrap();
        ts.apply_state_from_memb(&db, &mut path, &shift).unwrap();

        assert_eq!(path.to_string(), "/top/s/s");
        let p = ts.matrix.transform_point(&Point3::origin());
        assert_relative_eq!(p, Point3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn unknown_member_leaves_path_alone() {
        let db = MemDatabase::new();
        let mut path = FullPath::new();
        let mut ts = TreeState::default();
        assert!(ts
            .apply_state_from_memb(&db, &mut path, &Member::new("ghost", Default::default()))
            .is_err());
        assert!(path.is_empty());
    }
}
