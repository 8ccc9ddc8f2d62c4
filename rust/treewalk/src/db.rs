// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Database records and the lookup interface the walker reads them through.

use nalgebra::Matrix4;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How a member combines with the members before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoolOp {
    #[default]
    Union,
    Subtract,
    Intersect,
}

const IDENTITY: [f64; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

fn identity() -> [f64; 16] {
    IDENTITY
}

/// One entry of a combination's member list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    #[serde(default)]
    pub op: BoolOp,
    /// Placement of the member, row-major.
    #[serde(default = "identity")]
    pub matrix: [f64; 16],
}

impl Member {
    pub fn new(name: impl Into<String>, op: BoolOp) -> Self {
        Self {
            name: name.into(),
            op,
            matrix: IDENTITY,
        }
    }

    pub fn with_matrix(mut self, m: &Matrix4<f64>) -> Self {
        for (r, row) in self.matrix.chunks_exact_mut(4).enumerate() {
            for (c, slot) in row.iter_mut().enumerate() {
                *slot = m[(r, c)];
            }
        }
        self
    }

    pub fn matrix(&self) -> Matrix4<f64> {
        Matrix4::from_row_slice(&self.matrix)
    }
}

/// Identification carried by a combination that is the top of a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegionInfo {
    pub id: i32,
    /// Non-zero for air regions.
    #[serde(default)]
    pub aircode: i32,
    #[serde(default)]
    pub gift_material: i32,
    /// Line-of-sight thickness percentage.
    #[serde(default = "default_los")]
    pub los: i32,
}

fn default_los() -> i32 {
    100
}

/// Named material with its shader parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MaterialSpec {
    pub name: String,
    #[serde(default)]
    pub params: String,
}

/// A boolean combination of other objects.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Combination {
    pub members: Vec<Member>,
    /// Present when this combination starts a region.
    #[serde(default)]
    pub region: Option<RegionInfo>,
    /// Color override, 0-255 per channel.
    #[serde(default)]
    pub color: Option<[u8; 3]>,
    /// Material override.
    #[serde(default)]
    pub material: Option<MaterialSpec>,
    /// When set, this combination's color and material win over any set
    /// further down the tree.
    #[serde(default)]
    pub inherit: bool,
}

/// A primitive shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solid {
    pub kind: String,
    #[serde(default)]
    pub params: Vec<f64>,
}

/// A database object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Object {
    Combination(Combination),
    Solid(Solid),
}

impl Object {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Object::Combination(_) => ObjectKind::Combination,
            Object::Solid(_) => ObjectKind::Solid,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Combination,
    Solid,
}

/// Directory entry returned by [`Database::lookup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: ObjectKind,
}

impl DirEntry {
    pub fn is_combination(&self) -> bool {
        self.kind == ObjectKind::Combination
    }
}

/// Read access to named objects.
///
/// Shared by every worker of a walk, so implementations must be `Sync`.
pub trait Database: Sync {
    /// Finds the directory entry for `name`.
    fn lookup(&self, name: &str) -> Result<DirEntry>;

    /// Loads the record for `name`.
    fn get(&self, name: &str) -> Result<Object>;
}

/// A database held in memory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemDatabase {
    objects: FxHashMap<String, Object>,
}

impl MemDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON object mapping names to records.
    pub fn from_json(json: &str) -> Result<Self> {
        let db: Self = serde_json::from_str(json)?;
        tracing::debug!(objects = db.objects.len(), "loaded database");
        Ok(db)
    }

    pub fn insert(&mut self, name: impl Into<String>, object: Object) -> Option<Object> {
        self.objects.insert(name.into(), object)
    }

    pub fn insert_solid(&mut self, name: impl Into<String>, kind: &str, params: &[f64]) {
        self.insert(
            name,
            Object::Solid(Solid {
                kind: kind.to_string(),
                params: params.to_vec(),
            }),
        );
    }

    pub fn insert_combination(&mut self, name: impl Into<String>, comb: Combination) {
        self.insert(name, Object::Combination(comb));
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl Database for MemDatabase {
    fn lookup(&self, name: &str) -> Result<DirEntry> {
        self.objects
            .get(name)
            .map(|o| DirEntry {
                name: name.to_string(),
                kind: o.kind(),
            })
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    fn get(&self, name: &str) -> Result<Object> {
        self.objects
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_records_from_json() {
        let db = MemDatabase::from_json(
            r#"{
                "body.r": {
                    "type": "combination",
                    "region": { "id": 7 },
                    "color": [255, 0, 0],
                    "members": [
                        { "name": "box.s" },
                        { "name": "hole.s", "op": "subtract" }
                    ]
                },
                "box.s": { "type": "solid", "kind": "arb8" },
                "hole.s": { "type": "solid", "kind": "rcc", "params": [0, 0, 0, 1] }
            }"#,
        )
        .unwrap();
        assert_eq!(db.len(), 3);
        assert!(db.lookup("body.r").unwrap().is_combination());
        assert!(!db.lookup("hole.s").unwrap().is_combination());

        let Object::Combination(c) = db.get("body.r").unwrap() else {
            panic!("expected a combination");
        };
        let region = c.region.unwrap();
        assert_eq!(region.id, 7);
        assert_eq!(region.los, 100);
        assert_eq!(c.members[1].op, BoolOp::Subtract);
        assert_eq!(c.members[0].matrix(), Matrix4::identity());
    }

    #[test]
    fn missing_object_is_not_found() {
        let db = MemDatabase::new();
        assert!(matches!(db.lookup("nope"), Err(Error::NotFound(n)) if n == "nope"));
    }

    #[test]
    fn member_matrix_is_row_major() {
        let m = Matrix4::new_translation(&nalgebra::Vector3::new(1.0, 2.0, 3.0));
        let member = Member::new("a", BoolOp::Union).with_matrix(&m);
        assert_eq!(member.matrix[3], 1.0);
        assert_eq!(member.matrix(), m);
    }
}
