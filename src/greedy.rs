//! Greedy embedders (C5): one shared insertion skeleton — each iteration
//! asks the oracle for a candidate path for every still-unembedded layout
//! edge, scores them, and commits the best — configured three different
//! ways (`Praun`, `Kraevoy`, `Schreiner`) plus a blocking-aware variant, per
//! spec.md's pseudocode.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::embedding::EmbeddingState;
use crate::input::EmbeddingInput;
use crate::insertion_sequence::InsertionSequence;
use crate::mesh::halfedge::{dist, EdgeId, HalfEdgeId, VertexId};
use crate::mesh::virtual_vertex::VirtualPath;
use crate::oracle::{self, Metric};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsertionOrder {
    /// Score by candidate path length; shortest feasible edge goes first.
    BestFirst,
    /// Score by layout edge id; ties in every other knob fall back to
    /// input order.
    Arbitrary,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct GreedySettings {
    pub metric: Metric,
    pub insertion_order: InsertionOrder,
    pub use_swirl_detection: bool,
    pub swirl_penalty_factor: f64,
    pub use_vertex_repulsive_tracing: bool,
    pub use_blocking_condition: bool,
    pub prefer_extremal_vertices: bool,
    pub extremal_vertex_ratio: f64,
    /// Not in spec.md's option list: if a step's preferred metric finds no
    /// feasible candidate, retry once with `VertexRepulsive` before
    /// declaring the edge infeasible.
    pub retry_with_repulsive_metric: bool,
}

impl Default for GreedySettings {
    fn default() -> Self {
        GreedySettings {
            metric: Metric::Geodesic,
            insertion_order: InsertionOrder::BestFirst,
            use_swirl_detection: false,
            swirl_penalty_factor: 2.0,
            use_vertex_repulsive_tracing: false,
            use_blocking_condition: false,
            prefer_extremal_vertices: false,
            extremal_vertex_ratio: 0.25,
            retry_with_repulsive_metric: true,
        }
    }
}

impl GreedySettings {
    pub fn praun() -> Self {
        GreedySettings {
            insertion_order: InsertionOrder::BestFirst,
            ..Self::default()
        }
    }

    pub fn kraevoy() -> Self {
        GreedySettings {
            insertion_order: InsertionOrder::BestFirst,
            use_vertex_repulsive_tracing: true,
            ..Self::default()
        }
    }

    pub fn schreiner() -> Self {
        GreedySettings {
            insertion_order: InsertionOrder::BestFirst,
            prefer_extremal_vertices: true,
            ..Self::default()
        }
    }

    pub fn blocking_aware() -> Self {
        GreedySettings {
            insertion_order: InsertionOrder::BestFirst,
            use_blocking_condition: true,
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug)]
pub struct GreedyResult {
    pub name: &'static str,
    pub sequence: InsertionSequence,
    pub state: EmbeddingState,
    pub failed_edges: Vec<HalfEdgeId>,
}

impl GreedyResult {
    pub fn is_complete(&self) -> bool {
        self.failed_edges.is_empty() && self.state.is_complete()
    }

    pub fn cost(&self) -> f64 {
        if self.is_complete() {
            self.state.total_embedded_path_length()
        } else {
            f64::INFINITY
        }
    }
}

pub(crate) fn canonical_directions(layout: &crate::mesh::halfedge::HalfEdgeMesh) -> Vec<HalfEdgeId> {
    (0..layout.num_edges())
        .map(|i| {
            let [a, b] = layout.edge_halfedges(EdgeId(i));
            if layout.origin(a).index() <= layout.origin(b).index() {
                a
            } else {
                b
            }
        })
        .collect()
}

/// Eccentricity of each landmark: its maximum straight-line distance to any
/// other landmark. An approximation of true geodesic eccentricity, good
/// enough for the soft "prefer extremal vertices" scoring bonus.
fn landmark_eccentricity(input: &EmbeddingInput) -> HashMap<VertexId, f64> {
    let t = &input.target;
    let landmarks = &input.landmarks;
    let mut ecc = HashMap::new();
    for &a in landmarks {
        let e = landmarks
            .iter()
            .map(|&b| dist(t.pos(a), t.pos(b)))
            .fold(0.0_f64, f64::max);
        ecc.insert(a, e);
    }
    ecc
}

fn extremal_set(ecc: &HashMap<VertexId, f64>, ratio: f64) -> hashbrown::HashSet<VertexId> {
    let mut sorted: Vec<(VertexId, f64)> = ecc.iter().map(|(&v, &e)| (v, e)).collect();
    sorted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
    let k = ((sorted.len() as f64) * ratio).ceil().max(1.0) as usize;
    sorted.into_iter().take(k).map(|(v, _)| v).collect()
}

/// Total unsigned turning angle between consecutive path segments — a cheap
/// stand-in for "winds around the landmark", since the path lives on a 3D
/// mesh surface rather than a flattened 2D disk.
pub(crate) fn swirl_angle(path: &VirtualPath, target: &crate::mesh::halfedge::HalfEdgeMesh) -> f64 {
    let pts: Vec<[f64; 3]> = path.vertices.iter().map(|v| v.pos3(target)).collect();
    if pts.len() < 3 {
        return 0.0;
    }
    let mut total = 0.0;
    for w in pts.windows(3) {
        let u = sub(w[1], w[0]);
        let v = sub(w[2], w[1]);
        let lu = norm(u);
        let lv = norm(v);
        if lu < 1e-12 || lv < 1e-12 {
            continue;
        }
        let cos = (dot(u, v) / (lu * lv)).clamp(-1.0, 1.0);
        total += cos.acos();
    }
    total
}

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}
fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}
fn norm(a: [f64; 3]) -> f64 {
    dot(a, a).sqrt()
}

struct Candidate {
    h_l: HalfEdgeId,
    path: VirtualPath,
    score: f64,
}

fn find_candidate(
    state: &EmbeddingState,
    h_l: HalfEdgeId,
    settings: &GreedySettings,
    extremal: &hashbrown::HashSet<VertexId>,
) -> Option<Candidate> {
    let metric = if settings.use_vertex_repulsive_tracing {
        Metric::VertexRepulsive
    } else {
        settings.metric
    };
    let path = oracle::shortest_path_for_layout_halfedge(state, h_l, metric).or_else(|| {
        if settings.retry_with_repulsive_metric && metric != Metric::VertexRepulsive {
            oracle::shortest_path_for_layout_halfedge(state, h_l, Metric::VertexRepulsive)
        } else {
            None
        }
    })?;

    let mut score = match settings.insertion_order {
        InsertionOrder::BestFirst => path.length(state.target()),
        InsertionOrder::Arbitrary => h_l.index() as f64,
    };

    if settings.use_swirl_detection {
        let swirl = swirl_angle(&path, state.target());
        if swirl > std::f64::consts::PI {
            score += settings.swirl_penalty_factor * (swirl - std::f64::consts::PI);
        }
    }

    if settings.prefer_extremal_vertices {
        let l = state.layout();
        let u = state.landmark_of(l.origin(h_l));
        let v = state.landmark_of(l.dest(h_l));
        if extremal.contains(&u) && extremal.contains(&v) {
            score *= 0.5;
        }
    }

    Some(Candidate { h_l, path, score })
}

/// After hypothetically embedding `candidate`, checks that every other
/// still-unembedded layout edge retains a feasible candidate — spec.md's
/// "blocking condition" look-ahead.
fn passes_blocking_condition(state: &mut EmbeddingState, candidate: &Candidate, remaining: &[HalfEdgeId]) -> bool {
    state
        .embed_path(candidate.h_l, &candidate.path)
        .expect("already validated by the oracle");
    let ok = remaining
        .iter()
        .filter(|&&h| h != candidate.h_l)
        .all(|&h| oracle::shortest_path_for_layout_halfedge(state, h, Metric::Geodesic).is_some());
    state.unembed_path(candidate.h_l).expect("just embedded above");
    ok
}

fn embed_greedy(input: EmbeddingInput, settings: GreedySettings, name: &'static str) -> GreedyResult {
    let extremal = if settings.prefer_extremal_vertices {
        extremal_set(&landmark_eccentricity(&input), settings.extremal_vertex_ratio)
    } else {
        hashbrown::HashSet::new()
    };

    let mut state = EmbeddingState::new(input);
    let all_edges = canonical_directions(state.layout());
    let mut sequence = InsertionSequence::new(settings.metric);
    let mut failed = Vec::new();

    loop {
        let remaining: Vec<HalfEdgeId> = all_edges.iter().copied().filter(|&h| !state.is_embedded(h)).collect();
        if remaining.is_empty() {
            break;
        }

        let mut candidates: Vec<Candidate> = remaining
            .iter()
            .filter_map(|&h| find_candidate(&state, h, &settings, &extremal))
            .collect();
        // `remaining` (and so `candidates`) is already in ascending layout-edge
        // order; radsort's stability turns a plain by-score sort into the
        // spec's `(score, h_l.index())` tie-break for free.
        radsort::sort_by_key(&mut candidates, |c| c.score);

        let chosen = if settings.use_blocking_condition {
            candidates.into_iter().find(|c| passes_blocking_condition(&mut state, c, &remaining))
        } else {
            candidates.into_iter().next()
        };

        match chosen {
            Some(c) => {
                state.embed_path(c.h_l, &c.path).expect("validated by the oracle");
                sequence.push(c.h_l);
            }
            None => {
                failed = remaining;
                break;
            }
        }
    }

    GreedyResult {
        name,
        sequence,
        state,
        failed_edges: failed,
    }
}

pub fn embed_praun(input: EmbeddingInput) -> GreedyResult {
    embed_greedy(input, GreedySettings::praun(), "praun")
}

pub fn embed_kraevoy(input: EmbeddingInput) -> GreedyResult {
    embed_greedy(input, GreedySettings::kraevoy(), "kraevoy")
}

pub fn embed_schreiner(input: EmbeddingInput) -> GreedyResult {
    embed_greedy(input, GreedySettings::schreiner(), "schreiner")
}

pub fn embed_blocking_aware(input: EmbeddingInput) -> GreedyResult {
    embed_greedy(input, GreedySettings::blocking_aware(), "blocking-aware")
}

pub fn embed_competitors(input: &EmbeddingInput) -> Vec<GreedyResult> {
    vec![
        embed_praun(input.clone()),
        embed_kraevoy(input.clone()),
        embed_schreiner(input.clone()),
        embed_blocking_aware(input.clone()),
    ]
}

/// Minimum-cost successful result; ties broken by algorithm name lexical
/// order, then by position in `results`.
pub fn best(results: &[GreedyResult]) -> Option<&GreedyResult> {
    results
        .iter()
        .enumerate()
        .filter(|(_, r)| r.is_complete())
        .min_by(|(ia, a), (ib, b)| {
            a.cost()
                .partial_cmp(&b.cost())
                .unwrap()
                .then(a.name.cmp(b.name))
                .then(ia.cmp(ib))
        })
        .map(|(_, r)| r)
}

#[cfg(test)]
mod tests {
    use super::*;
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

    fn identity_input() -> EmbeddingInput {
        let landmarks = vec![VertexId(0), VertexId(1), VertexId(2), VertexId(3)];
        EmbeddingInput::new(tetra(), tetra(), landmarks).unwrap()
    }

    #[test]
    fn all_variants_complete_the_identity_embedding() {
        let input = identity_input();
        let results = embed_competitors(&input);
        for r in &results {
            assert!(r.is_complete(), "{} failed to complete: {:?}", r.name, r.failed_edges);
        }
    }

    #[test]
    fn best_picks_a_complete_result() {
        let input = identity_input();
        let results = embed_competitors(&input);
        let winner = best(&results).unwrap();
        assert!(winner.is_complete());
    }
}
