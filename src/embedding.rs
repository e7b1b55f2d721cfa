//! `EmbeddingState` (C4): the mutable state a search explores — which layout
//! edges are already realized as target paths, which target elements they
//! occupy, and the sector each unembedded layout edge is still free to use.

use fixedbitset::FixedBitSet;
use hashbrown::HashMap;

use crate::error::{LayoutEmbeddingError, Result};
use crate::input::EmbeddingInput;
use crate::mesh::halfedge::{EdgeId, FaceId, HalfEdgeId, HalfEdgeMesh, VertexId};
use crate::mesh::virtual_vertex::VirtualPath;

/// A realized layout half-edge: the target vertex chain it follows, stored
/// in the direction `origin(h_L) -> dest(h_L)`.
#[derive(Clone, Debug)]
pub struct EmbeddedPath {
    pub vertices: Vec<VertexId>,
    pub length: f64,
}

/// The open angular range, around a landmark's target vertex, still free
/// for a not-yet-embedded layout half-edge to enter.
///
/// `Wedge(from, to)` names the range by its two exclusive bounding target
/// half-edges (both outgoing from the landmark): the range is everything
/// reached rotating from just after `from` up to just before `to`, in
/// [`HalfEdgeMesh::rotate_outgoing`] order. When only one layout half-edge
/// at the landmark is embedded, `from == to` and the wedge is "every
/// direction except `from`".
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Sector {
    Full,
    Wedge(HalfEdgeId, HalfEdgeId),
}

#[derive(Clone, Debug)]
pub struct EmbeddingState {
    pub input: EmbeddingInput,
    /// Indexed by layout `HalfEdgeId`. `path[h]` is set iff `h`'s edge is
    /// embedded; `path[twin(h)]` is always its reverse.
    path: Vec<Option<EmbeddedPath>>,
    blocked_vertices: FixedBitSet,
    blocked_edges: FixedBitSet,
    is_landmark: FixedBitSet,
    landmark_of_target: HashMap<VertexId, VertexId>,
    total_length: f64,
    num_embedded: usize,
    repulsive: std::cell::RefCell<RepulsiveCache>,
}

#[derive(Default, Debug, Clone)]
struct RepulsiveCache {
    /// Keyed by the sorted pair of landmarks excluded as sources, per the
    /// oracle's `VertexRepulsive` metric (see `oracle.rs`).
    energies: HashMap<(VertexId, VertexId), Vec<f64>>,
}

impl EmbeddingState {
    pub fn new(input: EmbeddingInput) -> Self {
        let num_he = input.layout.half_edges.len();
        let num_target_v = input.target.num_vertices();
        let mut is_landmark = FixedBitSet::with_capacity(num_target_v);
        let mut landmark_of_target = HashMap::new();
        for (l_v, &t_v) in input.landmarks.iter().enumerate() {
            is_landmark.insert(t_v.index());
            landmark_of_target.insert(t_v, VertexId(l_v));
        }
        EmbeddingState {
            path: vec![None; num_he],
            blocked_vertices: FixedBitSet::with_capacity(num_target_v),
            blocked_edges: FixedBitSet::with_capacity(input.target.num_edges()),
            is_landmark,
            landmark_of_target,
            total_length: 0.0,
            num_embedded: 0,
            input,
            repulsive: std::cell::RefCell::new(RepulsiveCache::default()),
        }
    }

    pub fn layout(&self) -> &HalfEdgeMesh {
        &self.input.layout
    }

    pub fn target(&self) -> &HalfEdgeMesh {
        &self.input.target
    }

    pub fn landmark_of(&self, l_v: VertexId) -> VertexId {
        self.input.landmark_of(l_v)
    }

    pub fn layout_vertex_of_landmark(&self, t_v: VertexId) -> Option<VertexId> {
        self.landmark_of_target.get(&t_v).copied()
    }

    pub fn is_landmark_vertex(&self, t_v: VertexId) -> bool {
        self.is_landmark.contains(t_v.index())
    }

    pub fn is_embedded(&self, h_l: HalfEdgeId) -> bool {
        self.path[h_l.index()].is_some()
    }

    pub fn is_blocked_vertex(&self, t_v: VertexId) -> bool {
        self.blocked_vertices.contains(t_v.index())
    }

    pub fn is_blocked_edge(&self, t_e: EdgeId) -> bool {
        self.blocked_edges.contains(t_e.index())
    }

    pub fn get_embedded_path(&self, h_l: HalfEdgeId) -> Option<&EmbeddedPath> {
        self.path[h_l.index()].as_ref()
    }

    pub fn total_embedded_path_length(&self) -> f64 {
        self.total_length
    }

    pub fn num_embedded_edges(&self) -> usize {
        self.num_embedded
    }

    pub fn is_complete(&self) -> bool {
        self.num_embedded == self.input.layout.num_edges()
    }

    /// The range of target directions, around `landmark_of(origin(h_l))`,
    /// still open for `h_l`. Scans the layout vertex's outgoing ring for the
    /// nearest already-embedded neighbors on either side; see [`Sector`].
    pub fn embeddable_sector(&self, h_l: HalfEdgeId) -> Sector {
        let v_l = self.input.layout.origin(h_l);
        let ring: Vec<HalfEdgeId> = self.input.layout.outgoing(v_l).collect();
        let pos = ring.iter().position(|&h| h == h_l).expect("h_l incident to its own origin");
        let n = ring.len();

        let pred = (1..n)
            .map(|i| ring[(pos + n - i) % n])
            .find(|&h| self.is_embedded(h));
        let succ = (1..n)
            .map(|i| ring[(pos + i) % n])
            .find(|&h| self.is_embedded(h));

        match (pred, succ) {
            (None, None) => Sector::Full,
            (Some(p), Some(s)) => {
                let from = self.first_target_direction(p);
                let to = self.first_target_direction(s);
                Sector::Wedge(from, to)
            }
            _ => unreachable!("pred and succ search the same ring, either both or neither find a hit"),
        }
    }

    /// The first target half-edge an embedded layout half-edge's path takes,
    /// outgoing from that layout half-edge's landmark.
    fn first_target_direction(&self, h_l: HalfEdgeId) -> HalfEdgeId {
        let path = self.path[h_l.index()].as_ref().expect("h_l is embedded");
        let v0 = path.vertices[0];
        let v1 = path.vertices[1];
        self.input
            .target
            .outgoing(v0)
            .find(|&he| self.input.target.dest(he) == v1)
            .expect("embedded path's first step must be a target mesh edge")
    }

    /// Whether `he_t` (outgoing from the sector's landmark) lies strictly
    /// inside `sector`.
    pub fn sector_contains(&self, sector: Sector, he_t: HalfEdgeId) -> bool {
        match sector {
            Sector::Full => true,
            Sector::Wedge(from, to) => {
                if from == to {
                    return he_t != from;
                }
                let v = self.input.target.origin(from);
                let mut cur = self.input.target.rotate_outgoing(from);
                while cur != to {
                    if cur == he_t {
                        return true;
                    }
                    cur = self.input.target.rotate_outgoing(cur);
                    debug_assert_eq!(self.input.target.origin(cur), v);
                }
                false
            }
        }
    }

    /// Embeds `h_l` (and implicitly its twin, reversed) along `path`, a pure
    /// vertex chain produced by the oracle. Validates endpoints, sector
    /// membership, interior occupancy, and simplicity before mutating
    /// anything; on error the state is unchanged.
    pub fn embed_path(&mut self, h_l: HalfEdgeId, path: &VirtualPath) -> Result<()> {
        if self.is_embedded(h_l) {
            return Err(LayoutEmbeddingError::ConstraintViolation(format!(
                "layout edge {h_l:?} is already embedded"
            )));
        }
        let vs = path.as_vertex_chain().ok_or_else(|| {
            LayoutEmbeddingError::ConstraintViolation(
                "embed_path requires an all-vertex path; edge-interior points belong to smoothing".into(),
            )
        })?;
        if vs.len() < 2 {
            return Err(LayoutEmbeddingError::ConstraintViolation(
                "path must have at least two vertices".into(),
            ));
        }

        let t = &self.input.target;
        let v_l0 = self.input.layout.origin(h_l);
        let v_l1 = self.input.layout.dest(h_l);
        if vs[0] != self.landmark_of(v_l0) {
            return Err(LayoutEmbeddingError::ConstraintViolation(
                "path does not start at the origin landmark".into(),
            ));
        }
        if *vs.last().unwrap() != self.landmark_of(v_l1) {
            return Err(LayoutEmbeddingError::ConstraintViolation(
                "path does not end at the destination landmark".into(),
            ));
        }

        let sector = self.embeddable_sector(h_l);
        let he0 = t
            .outgoing(vs[0])
            .find(|&he| t.dest(he) == vs[1])
            .ok_or_else(|| {
                LayoutEmbeddingError::ConstraintViolation("path's first step is not a target edge".into())
            })?;
        if !self.sector_contains(sector, he0) {
            return Err(LayoutEmbeddingError::ConstraintViolation(
                "path's first step leaves the embeddable sector at its origin landmark".into(),
            ));
        }

        let h_opp = self.input.layout.twin(h_l);
        let rev_sector = self.embeddable_sector(h_opp);
        let n = vs.len();
        let he_last = t
            .outgoing(vs[n - 1])
            .find(|&he| t.dest(he) == vs[n - 2])
            .ok_or_else(|| {
                LayoutEmbeddingError::ConstraintViolation("path's last step is not a target edge".into())
            })?;
        if !self.sector_contains(rev_sector, he_last) {
            return Err(LayoutEmbeddingError::ConstraintViolation(
                "path's last step leaves the embeddable sector at its destination landmark".into(),
            ));
        }

        let mut edges = Vec::with_capacity(n - 1);
        let mut seen_vertices: hashbrown::HashSet<VertexId> = hashbrown::HashSet::new();
        seen_vertices.insert(vs[0]);
        for w in vs.windows(2) {
            let e = t.edge_between(w[0], w[1]).ok_or_else(|| {
                LayoutEmbeddingError::ConstraintViolation(format!(
                    "{:?} and {:?} are not adjacent in the target mesh",
                    w[0], w[1]
                ))
            })?;
            if !seen_vertices.insert(w[1]) {
                return Err(LayoutEmbeddingError::ConstraintViolation(
                    "path is not simple: repeats a vertex".into(),
                ));
            }
            edges.push(e);
        }
        for (i, &v) in vs.iter().enumerate() {
            let interior = i != 0 && i != n - 1;
            if interior {
                if self.is_landmark_vertex(v) {
                    return Err(LayoutEmbeddingError::ConstraintViolation(
                        "path passes through a foreign landmark".into(),
                    ));
                }
                if self.is_blocked_vertex(v) {
                    return Err(LayoutEmbeddingError::ConstraintViolation(format!(
                        "target vertex {v:?} is already occupied"
                    )));
                }
            }
        }
        for &e in &edges {
            if self.is_blocked_edge(e) {
                return Err(LayoutEmbeddingError::ConstraintViolation(format!(
                    "target edge {e:?} is already occupied"
                )));
            }
        }

        let length = path.length(t);
        self.path[h_l.index()] = Some(EmbeddedPath {
            vertices: vs.clone(),
            length,
        });
        let mut rev = vs.clone();
        rev.reverse();
        self.path[h_opp.index()] = Some(EmbeddedPath { vertices: rev, length });
        for &e in &edges {
            self.blocked_edges.insert(e.index());
        }
        for &v in &vs[1..n - 1] {
            self.blocked_vertices.insert(v.index());
        }
        self.total_length += length;
        self.num_embedded += 1;
        Ok(())
    }

    /// Exact inverse of the most recent [`Self::embed_path`] on `h_l`'s edge.
    pub fn unembed_path(&mut self, h_l: HalfEdgeId) -> Result<()> {
        let Some(embedded) = self.path[h_l.index()].clone() else {
            return Err(LayoutEmbeddingError::ConstraintViolation(format!(
                "layout edge {h_l:?} is not embedded"
            )));
        };
        let t = &self.input.target;
        let n = embedded.vertices.len();
        for w in embedded.vertices.windows(2) {
            let e = t.edge_between(w[0], w[1]).expect("edge existed when embedded");
            self.blocked_edges.set(e.index(), false);
        }
        for &v in &embedded.vertices[1..n - 1] {
            self.blocked_vertices.set(v.index(), false);
        }
        self.total_length -= embedded.length;
        self.num_embedded -= 1;
        self.path[h_l.index()] = None;
        let h_opp = self.input.layout.twin(h_l);
        self.path[h_opp.index()] = None;
        Ok(())
    }

    /// The target faces bounded by the embedded paths of `f_l`'s edges.
    /// Requires [`Self::is_complete`].
    pub fn get_patch(&self, f_l: FaceId) -> Result<Vec<FaceId>> {
        if !self.is_complete() {
            return Err(LayoutEmbeddingError::ConstraintViolation(
                "get_patch requires every layout edge to be embedded".into(),
            ));
        }
        let t = &self.input.target;
        let mut seeds = Vec::new();
        for h_l in self.input.layout.face_halfedges(f_l) {
            let path = self.path[h_l.index()].as_ref().expect("complete embedding");
            for w in path.vertices.windows(2) {
                let he = t
                    .outgoing(w[0])
                    .find(|&he| t.dest(he) == w[1])
                    .expect("embedded step is a target edge");
                seeds.push(t.face(he));
            }
        }
        let mut visited: hashbrown::HashSet<FaceId> = hashbrown::HashSet::new();
        let mut stack = seeds;
        while let Some(f) = stack.pop() {
            if !visited.insert(f) {
                continue;
            }
            for he in t.face_halfedges(f) {
                let e = t.edge_of(he);
                if self.is_blocked_edge(e) {
                    continue;
                }
                stack.push(t.face(t.twin(he)));
            }
        }
        Ok(visited.into_iter().collect())
    }

    pub(crate) fn repulsive_energy_excluding(
        &self,
        a: VertexId,
        b: VertexId,
        compute: impl FnOnce() -> Vec<f64>,
    ) -> Vec<f64> {
        let key = if a.index() <= b.index() { (a, b) } else { (b, a) };
        let mut cache = self.repulsive.borrow_mut();
        cache.energies.entry(key).or_insert_with(compute).clone()
    }
}
