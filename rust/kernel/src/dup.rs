// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shell duplication.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::arena::*;
use crate::error::{Error, Result};
use crate::keys::*;

/// Map from elements of a source shell to their copies.
///
/// Entries are recorded as the copy is built, so not every element is
/// guaranteed an entry; callers must handle `None`.
#[derive(Debug, Clone, Default)]
pub struct TranslationTable {
    map: FxHashMap<TopologyKey, TopologyKey>,
}

macro_rules! typed_lookup {
    ($($(#[$doc:meta])* $name:ident: $key:ident => $variant:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $name(&self, old: $key) -> Option<$key> {
                match self.map.get(&TopologyKey::$variant(old))? {
                    TopologyKey::$variant(new) => Some(*new),
                    _ => None,
                }
            }
        )*
    };
}

impl TranslationTable {
    /// Records that `old` was copied to `new`.
    pub fn insert(&mut self, old: impl Into<TopologyKey>, new: impl Into<TopologyKey>) {
        self.map.insert(old.into(), new.into());
    }

    /// Looks up the copy of any element.
    pub fn get(&self, old: impl Into<TopologyKey>) -> Option<TopologyKey> {
        self.map.get(&old.into()).copied()
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    typed_lookup! {
        /// Copy of a shell.
        shell: ShellKey => Shell,
        /// Copy of a faceuse.
        faceuse: FaceUseKey => FaceUse,
        /// Copy of a face.
        face: FaceKey => Face,
        /// Copy of a loopuse.
        loopuse: LoopUseKey => LoopUse,
        /// Copy of an edgeuse.
        edgeuse: EdgeUseKey => EdgeUse,
        /// Copy of a vertex.
        vertex: VertexKey => Vertex,
    }
}

impl Model {
    fn dup_vertex(
        &mut self,
        v: VertexKey,
        vmap: &mut FxHashMap<VertexKey, VertexKey>,
        trans: &mut TranslationTable,
    ) -> Result<VertexKey> {
        if let Some(&nv) = vmap.get(&v) {
            return Ok(nv);
        }
        let p = self.get_point(v)?;
        let nv = self.add_vertex(p);
        vmap.insert(v, nv);
        trans.insert(v, nv);
        Ok(nv)
    }

    fn dup_vertices(
        &mut self,
        verts: &[VertexKey],
        vmap: &mut FxHashMap<VertexKey, VertexKey>,
        trans: &mut TranslationTable,
    ) -> Result<Vec<VertexKey>> {
        verts
            .iter()
            .map(|&v| self.dup_vertex(v, vmap, trans))
            .collect()
    }

    fn record_loop(&self, old: LoopUseKey, new: LoopUseKey, trans: &mut TranslationTable) {
        trans.insert(old, new);
        if let (Some(o), Some(n)) = (self.loopuses.get(old), self.loopuses.get(new)) {
            trans.insert(o.mate, n.mate);
        }
        let old_eus = self.loop_edgeuses(old);
        let new_eus = self.loop_edgeuses(new);
        for (&o, &n) in old_eus.iter().zip(new_eus) {
            trans.insert(o, n);
        }
    }

    /// Copies a shell into the same region.
    ///
    /// The copy gets its own vertices at the same coordinates, so it can be
    /// transformed independently. Faces are copied with their planes and glued
    /// to each other; wire loops, wire edges and the lone vertex follow.
    pub fn dup_shell(&mut self, shell: ShellKey) -> Result<(ShellKey, TranslationTable)> {
        let _span = tracing::debug_span!("dup_shell", ?shell).entered();
        let region = self.get_shell(shell)?.region;
        let new_shell = self.msv(region)?;
        let mut trans = TranslationTable::default();
        let mut vmap = FxHashMap::default();
        trans.insert(shell, new_shell);

        let mut new_faces = Vec::new();
        for fu in self.shell_same_faceuses(shell) {
            let d = self.get_fu(fu)?;
            let (fu_mate, face) = (d.mate, d.face);
            let loops: Vec<LoopUseKey> = d
                .loopuses
                .iter()
                .copied()
                .filter(|&lu| !self.loop_edgeuses(lu).is_empty())
                .collect();
            let Some((&first, rest)) = loops.split_first() else {
                tracing::warn!(?fu, "face without edge loops not copied");
                continue;
            };

            let verts = self.loop_vertices(first);
            let verts = self.dup_vertices(&verts, &mut vmap, &mut trans)?;
            let new_fu = self.cface(new_shell, &verts)?;
            let new_first = self
                .get_fu(new_fu)?
                .loopuses
                .first()
                .copied()
                .ok_or(Error::Degenerate("new face has no loop"))?;
            let first_orientation = self.get_lu(first)?.orientation;
            for l in [new_first, self.get_lu(new_first)?.mate] {
                self.get_lu_mut(l)?.orientation = first_orientation;
            }
            self.record_loop(first, new_first, &mut trans);

            for &lu in rest {
                let orientation = self.get_lu(lu)?.orientation;
                let verts = self.loop_vertices(lu);
                let verts = self.dup_vertices(&verts, &mut vmap, &mut trans)?;
                let new_lu = self.add_face_loop(new_fu, &verts, orientation)?;
                self.record_loop(lu, new_lu, &mut trans);
            }

            let old_face = self.get_face(face)?.clone();
            let new_fu_data = self.get_fu(new_fu)?;
            let (new_mate, new_face) = (new_fu_data.mate, new_fu_data.face);
            {
                let f = self.get_face_mut(new_face)?;
                f.plane = old_face.plane;
                f.flip = old_face.flip;
            }
            trans.insert(fu, new_fu);
            trans.insert(fu_mate, new_mate);
            trans.insert(face, new_face);
            new_faces.push(new_fu);
        }
        self.glue_faces(&new_faces)?;

        let mut done = FxHashSet::default();
        let wire_loops = self.get_shell(shell)?.wire_loopuses.clone();
        for lu in wire_loops {
            if !done.insert(lu) {
                continue;
            }
            done.insert(self.get_lu(lu)?.mate);
            let verts = self.loop_vertices(lu);
            let verts = self.dup_vertices(&verts, &mut vmap, &mut trans)?;
            let point_loop = matches!(self.get_lu(lu)?.down, LoopUseDown::Vertex(_));
            let new_lu = match verts.first() {
                Some(&v) if point_loop => self.add_point_loop(new_shell, v)?,
                _ => self.add_wire_loop(new_shell, &verts)?,
            };
            self.record_loop(lu, new_lu, &mut trans);
        }

        let mut done = FxHashSet::default();
        let wire_edges = self.get_shell(shell)?.wire_edgeuses.clone();
        for eu in wire_edges {
            if !done.insert(eu) {
                continue;
            }
            let mate = self.get_eu(eu)?.mate;
            done.insert(mate);
            let a = self.eu_vertex(eu).ok_or(Error::EdgeUseNotFound(eu))?;
            let b = self.eu_end_vertex(eu).ok_or(Error::EdgeUseNotFound(eu))?;
            let a = self.dup_vertex(a, &mut vmap, &mut trans)?;
            let b = self.dup_vertex(b, &mut vmap, &mut trans)?;
            let new_eu = self.me_wire(new_shell, a, b)?;
            trans.insert(eu, new_eu);
            trans.insert(mate, self.get_eu(new_eu)?.mate);
        }

        if let Some(vu) = self.get_shell(shell)?.vertexuse {
            let v = self.get_vu(vu)?.vertex;
            let nv = self.dup_vertex(v, &mut vmap, &mut trans)?;
            let new_vu = self.add_lone_vertex(new_shell, nv)?;
            trans.insert(vu, new_vu);
        }

        tracing::debug!(faces = new_faces.len(), entries = trans.len(), "duplicated shell");
        Ok((new_shell, trans))
    }
}
