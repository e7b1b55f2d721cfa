//! Shortest-path oracle (C3).
//!
//! Runs Dijkstra over the target mesh's vertex graph directly (our own
//! `BinaryHeap` + scored wrapper, not `petgraph::algo::dijkstra`, since the
//! node set a query actually touches — landmark exclusions, sector-gated
//! first/last hops, blocked vertices/edges — is assembled per call rather
//! than fixed up front) rather than an edge-unfolding sampler: every
//! returned path is a pure target-vertex chain
//! (`VirtualPath::from_vertices`), and edge-interior points are left to the
//! smoothing post-process. See SPEC_FULL.md's "open questions" section for
//! the rationale.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::embedding::{EmbeddingState, Sector};
use crate::input::triangle_area;
use crate::mesh::halfedge::{HalfEdgeId, VertexId};
use crate::mesh::virtual_vertex::VirtualPath;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    /// Euclidean edge length.
    Geodesic,
    /// Euclidean edge length plus a repulsive penalty that pushes the path
    /// away from other landmarks, reducing the chance that later paths
    /// between nearby landmark pairs have to detour around this one.
    VertexRepulsive,
}

/// Ordering wrapper so `BinaryHeap` (a max-heap) pops the least-cost entry
/// first, tie-broken by `(VertexId, EdgeId)` for determinism.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Scored {
    cost: f64,
    v: VertexId,
    via_edge: usize,
}

impl Eq for Scored {}
impl Ord for Scored {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .partial_cmp(&self.cost)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.v.index().cmp(&self.v.index()))
            .then_with(|| other.via_edge.cmp(&self.via_edge))
    }
}
impl PartialOrd for Scored {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Finds the best path realizing `h_l`, respecting the sector open at both
/// of its endpoints. Returns `None` (⊥) if no feasible path exists.
pub fn shortest_path_for_layout_halfedge(
    state: &EmbeddingState,
    h_l: HalfEdgeId,
    metric: Metric,
) -> Option<VirtualPath> {
    let l = state.layout();
    let start_v = state.landmark_of(l.origin(h_l));
    let end_v = state.landmark_of(l.dest(h_l));
    let start_sector = state.embeddable_sector(h_l);
    let end_sector = state.embeddable_sector(l.twin(h_l));
    shortest_path(state, start_v, start_sector, end_v, end_sector, metric)
}

/// General form: shortest path between two landmark target vertices,
/// restricted to leave `start_v` within `start_sector` and arrive at
/// `end_v` from a direction within `end_sector` (read as outgoing from
/// `end_v`, i.e. the reverse of the arrival step).
pub fn shortest_path(
    state: &EmbeddingState,
    start_v: VertexId,
    start_sector: Sector,
    end_v: VertexId,
    end_sector: Sector,
    metric: Metric,
) -> Option<VirtualPath> {
    let t = state.target();
    let weights = edge_weights(state, start_v, end_v, metric);

    let mut dist_to: HashMap<VertexId, f64> = HashMap::new();
    let mut prev: HashMap<VertexId, VertexId> = HashMap::new();
    let mut heap = BinaryHeap::new();

    dist_to.insert(start_v, 0.0);
    heap.push(Scored {
        cost: 0.0,
        v: start_v,
        via_edge: 0,
    });

    while let Some(Scored { cost, v, .. }) = heap.pop() {
        if cost > *dist_to.get(&v).unwrap_or(&f64::INFINITY) {
            continue;
        }
        if v == end_v {
            break;
        }
        for he in t.outgoing(v) {
            let w = t.dest(he);
            if w != end_v && state.is_landmark_vertex(w) {
                continue; // interior of a path never passes through a foreign landmark
            }
            if w != end_v && state.is_blocked_vertex(w) {
                continue;
            }
            let e = t.edge_of(he);
            if state.is_blocked_edge(e) {
                continue;
            }
            if v == start_v && !state.sector_contains(start_sector, he) {
                continue;
            }
            if w == end_v {
                let arrival = t.twin(he); // outgoing from end_v, reversed
                if !state.sector_contains(end_sector, arrival) {
                    continue;
                }
            }
            let next_cost = cost + weights[e.index()];
            if next_cost < *dist_to.get(&w).unwrap_or(&f64::INFINITY) {
                dist_to.insert(w, next_cost);
                prev.insert(w, v);
                heap.push(Scored {
                    cost: next_cost,
                    v: w,
                    via_edge: e.index(),
                });
            }
        }
    }

    if !dist_to.contains_key(&end_v) && start_v != end_v {
        return None;
    }

    let mut chain = vec![end_v];
    let mut cur = end_v;
    while cur != start_v {
        cur = *prev.get(&cur)?;
        chain.push(cur);
    }
    chain.reverse();
    Some(VirtualPath::from_vertices(chain))
}

pub fn path_length(path: &VirtualPath, state: &EmbeddingState) -> f64 {
    path.length(state.target())
}

/// Per-edge weight table for `metric`, indexed by target `EdgeId`.
fn edge_weights(state: &EmbeddingState, start_v: VertexId, end_v: VertexId, metric: Metric) -> Vec<f64> {
    let t = state.target();
    let base: Vec<f64> = (0..t.num_edges()).map(|i| t.euclidean_length(crate::mesh::halfedge::EdgeId(i))).collect();
    match metric {
        Metric::Geodesic => base,
        Metric::VertexRepulsive => {
            let energy = repulsive_energy(state, start_v, end_v);
            base.iter()
                .enumerate()
                .map(|(i, &len)| {
                    let [he, _] = t.edge_halfedges(crate::mesh::halfedge::EdgeId(i));
                    let a = t.origin(he);
                    let b = t.dest(he);
                    let penalty = 0.5 * (energy[a.index()] + energy[b.index()]);
                    len * (1.0 + penalty)
                })
                .collect()
        }
    }
}

/// Repulsive potential field with unit sources at every landmark except
/// `start_v`/`end_v`, solved by fixed-iteration Gauss-Seidel relaxation over
/// the cotangent-weighted graph Laplacian (SPEC_FULL.md open question (a)).
/// Cached per excluded-pair on the embedding state; the cache is valid for
/// the lifetime of a fixed landmark set.
fn repulsive_energy(state: &EmbeddingState, start_v: VertexId, end_v: VertexId) -> Vec<f64> {
    state.repulsive_energy_excluding(start_v, end_v, || solve_repulsive(state, start_v, end_v))
}

const GAUSS_SEIDEL_SWEEPS: usize = 200;

fn solve_repulsive(state: &EmbeddingState, start_v: VertexId, end_v: VertexId) -> Vec<f64> {
    let t = state.target();
    let n = t.num_vertices();
    let mut energy = vec![0.0f64; n];
    let sources: Vec<VertexId> = state
        .layout()
        .vertices
        .iter()
        .enumerate()
        .map(|(i, _)| state.landmark_of(VertexId(i)))
        .filter(|&v| v != start_v && v != end_v)
        .collect();
    if sources.is_empty() {
        return energy;
    }
    for &s in &sources {
        energy[s.index()] = 1.0;
    }

    let mut weights: HashMap<(usize, usize), f64> = HashMap::new();
    for v in 0..n {
        for he in t.outgoing(VertexId(v)) {
            let w = t.dest(he).index();
            if v < w {
                let weight = cotangent_weight(state, he);
                weights.insert((v, w), weight);
                weights.insert((w, v), weight);
            }
        }
    }

    for _ in 0..GAUSS_SEIDEL_SWEEPS {
        for v in 0..n {
            let vid = VertexId(v);
            if sources.contains(&vid) {
                continue;
            }
            let mut num = 0.0;
            let mut den = 0.0;
            for he in t.outgoing(vid) {
                let w = t.dest(he).index();
                let wt = *weights.get(&(v, w)).unwrap_or(&1.0);
                num += wt * energy[w];
                den += wt;
            }
            if den > 0.0 {
                energy[v] = num / den;
            }
        }
        for &s in &sources {
            energy[s.index()] = 1.0;
        }
    }
    energy
}

/// `0.5 * (cot(alpha) + cot(beta))` for the edge underlying `he`, where
/// `alpha`/`beta` are the angles opposite it in its two incident triangles.
fn cotangent_weight(state: &EmbeddingState, he: HalfEdgeId) -> f64 {
    let t = state.target();
    let a = t.pos(t.origin(he));
    let b = t.pos(t.dest(he));
    let mut w = 0.0;
    for &h in &[he, t.twin(he)] {
        let apex = t.origin(t.prev(h));
        if apex == t.origin(h) || apex == t.dest(h) {
            continue;
        }
        let c = t.pos(apex);
        w += 0.5 * cot_angle(c, a, b);
    }
    w.max(1e-6)
}

/// Cotangent of the angle at `c` in triangle `(a, b, c)`, via
/// `cos/sin = (u·v) / |u×v|`.
fn cot_angle(c: [f64; 3], a: [f64; 3], b: [f64; 3]) -> f64 {
    let u = [a[0] - c[0], a[1] - c[1], a[2] - c[2]];
    let v = [b[0] - c[0], b[1] - c[1], b[2] - c[2]];
    let dot = u[0] * v[0] + u[1] * v[1] + u[2] * v[2];
    let area2 = 2.0 * triangle_area(c, a, b);
    if area2 < 1e-12 {
        return 0.0;
    }
    dot / area2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbeddingState;
    use crate::input::EmbeddingInput;
    use crate::mesh::halfedge::HalfEdgeMesh;

    fn tetra() -> HalfEdgeMesh {
        let positions = vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
        ];
        let faces = vec![vec![0, 2, 1], vec![0, 1, 3], vec![1, 2, 3], vec![2, 0, 3]];
        HalfEdgeMesh::from_faces(positions, faces).unwrap()
    }

    fn identity_state() -> EmbeddingState {
        let layout = tetra();
        let target = tetra();
        let landmarks = vec![VertexId(0), VertexId(1), VertexId(2), VertexId(3)];
        let input = EmbeddingInput::new(layout, target, landmarks).unwrap();
        EmbeddingState::new(input)
    }

    #[test]
    fn geodesic_direct_edge_is_shortest() {
        let state = identity_state();
        let path = shortest_path(&state, VertexId(0), Sector::Full, VertexId(1), Sector::Full, Metric::Geodesic)
            .expect("tetrahedron vertices are adjacent");
        assert_eq!(path.as_vertex_chain().unwrap(), vec![VertexId(0), VertexId(1)]);
    }

    #[test]
    fn unrelated_embedded_edge_does_not_block_a_disjoint_query() {
        let mut state = identity_state();
        let h = state
            .layout()
            .outgoing(VertexId(2))
            .find(|&he| state.layout().dest(he) == VertexId(3))
            .unwrap();
        let path = VirtualPath::from_vertices(vec![VertexId(2), VertexId(3)]);
        state.embed_path(h, &path).unwrap();
        let again = shortest_path(&state, VertexId(0), Sector::Full, VertexId(1), Sector::Full, Metric::Geodesic);
        assert_eq!(again.unwrap().as_vertex_chain().unwrap(), vec![VertexId(0), VertexId(1)]);
    }

    #[test]
    fn repulsive_metric_runs_without_sources_between_only_two_landmarks() {
        let state = identity_state();
        // Only 4 landmarks total; excluding the two endpoints leaves 2 sources.
        let path = shortest_path(
            &state,
            VertexId(0),
            Sector::Full,
            VertexId(1),
            Sector::Full,
            Metric::VertexRepulsive,
        );
        assert!(path.is_some());
    }
}
