// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Topology key types for arena-based storage.
//!
//! Every element of the radial-edge structure gets a type-safe generational
//! key created by `slotmap::SlotMap`. A killed element leaves a tombstone, so a
//! stale key is detected on lookup instead of aliasing a reused slot.

use slotmap::new_key_type;

new_key_type! {
    /// Key for a region (a set of shells).
    pub struct RegionKey;

    /// Key for a shell (a connected grouping of faces, wires and points).
    pub struct ShellKey;

    /// Key for one side (use) of a face.
    pub struct FaceUseKey;

    /// Key for a face, the geometric support shared by two faceuses.
    pub struct FaceKey;

    /// Key for one use of a loop.
    pub struct LoopUseKey;

    /// Key for a loop, shared by two mated loopuses.
    pub struct LoopKey;

    /// Key for one directed use of an edge.
    pub struct EdgeUseKey;

    /// Key for an edge, shared by a radial ring of edgeuses.
    pub struct EdgeKey;

    /// Key for a use of a vertex.
    pub struct VertexUseKey;

    /// Key for a vertex (a point in 3D space).
    pub struct VertexKey;
}

/// A key that can reference any topology element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopologyKey {
    Region(RegionKey),
    Shell(ShellKey),
    FaceUse(FaceUseKey),
    Face(FaceKey),
    LoopUse(LoopUseKey),
    Loop(LoopKey),
    EdgeUse(EdgeUseKey),
    Edge(EdgeKey),
    VertexUse(VertexUseKey),
    Vertex(VertexKey),
}

impl TopologyKey {
    /// Returns the topology type of this key.
    pub fn topology_type(&self) -> TopologyType {
        match self {
            TopologyKey::Region(_) => TopologyType::Region,
            TopologyKey::Shell(_) => TopologyType::Shell,
            TopologyKey::FaceUse(_) => TopologyType::FaceUse,
            TopologyKey::Face(_) => TopologyType::Face,
            TopologyKey::LoopUse(_) => TopologyType::LoopUse,
            TopologyKey::Loop(_) => TopologyType::Loop,
            TopologyKey::EdgeUse(_) => TopologyType::EdgeUse,
            TopologyKey::Edge(_) => TopologyType::Edge,
            TopologyKey::VertexUse(_) => TopologyType::VertexUse,
            TopologyKey::Vertex(_) => TopologyType::Vertex,
        }
    }
}

/// Discriminant for topology element types, ordered root to leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TopologyType {
    Region = 0,
    Shell = 1,
    FaceUse = 2,
    Face = 3,
    LoopUse = 4,
    Loop = 5,
    EdgeUse = 6,
    Edge = 7,
    VertexUse = 8,
    Vertex = 9,
}

impl TopologyType {
    /// Returns the type name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            TopologyType::Region => "Region",
            TopologyType::Shell => "Shell",
            TopologyType::FaceUse => "FaceUse",
            TopologyType::Face => "Face",
            TopologyType::LoopUse => "LoopUse",
            TopologyType::Loop => "Loop",
            TopologyType::EdgeUse => "EdgeUse",
            TopologyType::Edge => "Edge",
            TopologyType::VertexUse => "VertexUse",
            TopologyType::Vertex => "Vertex",
        }
    }
}

impl std::fmt::Display for TopologyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

macro_rules! impl_from_key {
    ($($key:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$key> for TopologyKey {
                fn from(k: $key) -> Self {
                    TopologyKey::$variant(k)
                }
            }
        )*
    };
}

impl_from_key! {
    RegionKey => Region,
    ShellKey => Shell,
    FaceUseKey => FaceUse,
    FaceKey => Face,
    LoopUseKey => LoopUse,
    LoopKey => Loop,
    EdgeUseKey => EdgeUse,
    EdgeKey => Edge,
    VertexUseKey => VertexUse,
    VertexKey => Vertex,
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn topology_type_ordering_is_root_to_leaf() {
        assert!(TopologyType::Region < TopologyType::Shell);
        assert!(TopologyType::Shell < TopologyType::FaceUse);
        assert!(TopologyType::LoopUse < TopologyType::EdgeUse);
        assert!(TopologyType::VertexUse < TopologyType::Vertex);
    }

    #[test]
    fn key_conversion_keeps_type() {
        let mut map: SlotMap<EdgeUseKey, ()> = SlotMap::with_key();
        let k = map.insert(());
        let tk: TopologyKey = k.into();
        assert_eq!(tk.topology_type(), TopologyType::EdgeUse);
        assert_eq!(tk.topology_type().to_string(), "EdgeUse");
    }
}
