//! Branch-and-bound search (C6).
//!
//! Open-set nodes store their decision list `S` (not a cloned
//! `EmbeddingState`); a node is materialized by replaying `S` onto a fresh
//! state when popped. Replay cost is `O(|S|)`, bounded by the number of
//! layout edges — the spec sanctions this directly ("the induced
//! `EmbeddingState` is reproducible by replaying `S` on a fresh state, or
//! maintained incrementally with push/pop"); we take the replay form since
//! the open set is a genuine best-first priority queue rather than a DFS
//! stack, and best-first popping does not admit the single-shared-mutable-
//! state push/pop discipline `embedding.rs` uses for its O(path length)
//! guarantee.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Instant;

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};

use crate::embedding::EmbeddingState;
use crate::error::{LayoutEmbeddingError, Result};
use crate::greedy::{self, swirl_angle};
use crate::input::EmbeddingInput;
use crate::insertion_sequence::InsertionSequence;
use crate::mesh::halfedge::HalfEdgeId;
use crate::mesh::virtual_vertex::VirtualPath;
use crate::oracle::{self, Metric};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    LowerBound,
    LowerBoundNonConflicting,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct BranchAndBoundSettings {
    pub optimality_gap: f64,
    /// Seconds; `<= 0` means unbounded.
    pub time_limit_secs: f64,
    pub extend_time_limit_to_ensure_solution: bool,
    pub record_upper_bound_events: bool,
    pub record_lower_bound_events: bool,
    pub priority: Priority,
    pub use_state_hashing: bool,
    pub use_proactive_pruning: bool,
    pub use_candidate_paths_for_lower_bounds: bool,
    pub use_greedy_init: bool,
}

impl Default for BranchAndBoundSettings {
    fn default() -> Self {
        BranchAndBoundSettings {
            optimality_gap: 0.0,
            time_limit_secs: 60.0,
            extend_time_limit_to_ensure_solution: true,
            record_upper_bound_events: true,
            record_lower_bound_events: false,
            priority: Priority::LowerBound,
            use_state_hashing: true,
            use_proactive_pruning: true,
            use_candidate_paths_for_lower_bounds: false,
            use_greedy_init: true,
        }
    }
}

impl BranchAndBoundSettings {
    /// `main_pig.cpp`'s driver settings: branch-and-bound run cold, without
    /// a greedy upper bound to seed it (`settings.use_greedy_init = false;
    /// settings.time_limit = 60.0;`), relying on
    /// `extend_time_limit_to_ensure_solution` to keep searching past the
    /// limit until a first feasible solution turns up.
    pub fn main_pig_driver_default() -> Self {
        BranchAndBoundSettings {
            use_greedy_init: false,
            time_limit_secs: 60.0,
            extend_time_limit_to_ensure_solution: true,
            ..Self::default()
        }
    }
}

/// Slack applied to the bound pruning test (`LB(N) >= UB * (1 - eps)`), not
/// exposed as a setting: spec.md's option list (§6) doesn't list it, so we
/// treat it as an implementation constant rather than user-tunable.
const EPS_GAP_SLACK: f64 = 1e-9;

#[derive(Clone, Debug)]
pub struct BranchAndBoundResult {
    pub sequence: InsertionSequence,
    pub cost: f64,
    pub lower_bound: f64,
    pub gap: f64,
    pub iterations: u64,
    pub deadline_reached: bool,
    pub upper_bound_events: Vec<(f64, f64)>,
    pub lower_bound_events: Vec<(f64, f64)>,
    pub peak_memory_estimate_bytes: usize,
}

#[derive(Clone, Debug)]
struct Node {
    decisions: Vec<(HalfEdgeId, VirtualPath)>,
    lb: f64,
    priority: f64,
}

/// Tie-break key: `(layout_edge_index, target_vertex_index sequence)` of
/// the node's decision list, per Open Question (a).
fn tie_break_key(node: &Node) -> Vec<(usize, Vec<usize>)> {
    let mut key: Vec<(usize, Vec<usize>)> = node
        .decisions
        .iter()
        .map(|(h, p)| (h.index(), p.as_vertex_chain().unwrap().into_iter().map(|v| v.index()).collect()))
        .collect();
    key.sort();
    key
}

struct ScoredNode(Node);

impl PartialEq for ScoredNode {
    fn eq(&self, other: &Self) -> bool {
        self.0.priority == other.0.priority && tie_break_key(&self.0) == tie_break_key(&other.0)
    }
}
impl Eq for ScoredNode {}
impl PartialOrd for ScoredNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for ScoredNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse so the lowest priority pops first.
        other
            .0
            .priority
            .partial_cmp(&self.0.priority)
            .unwrap_or(Ordering::Equal)
            .then_with(|| tie_break_key(&other.0).cmp(&tie_break_key(&self.0)))
    }
}

fn materialize(input: &EmbeddingInput, decisions: &[(HalfEdgeId, VirtualPath)]) -> EmbeddingState {
    let mut state = EmbeddingState::new(input.clone());
    for (h, p) in decisions {
        state.embed_path(*h, p).expect("nodes only hold previously-validated decisions");
    }
    state
}

fn unembedded_canonical_edges(state: &EmbeddingState) -> Vec<HalfEdgeId> {
    greedy::canonical_directions(state.layout())
        .into_iter()
        .filter(|&h| !state.is_embedded(h))
        .collect()
}

/// `LB(N)`: cost so far plus, per unembedded edge, the oracle's current
/// feasible length (optionally maxed against a cached root candidate).
/// Returns `None` if any unembedded edge is infeasible under `state`
/// (proactive pruning signal).
fn lower_bound(
    state: &EmbeddingState,
    settings: &BranchAndBoundSettings,
    root_candidates: &HashMap<HalfEdgeId, f64>,
) -> Option<f64> {
    let mut total = state.total_embedded_path_length();
    for h in unembedded_canonical_edges(state) {
        let path = oracle::shortest_path_for_layout_halfedge(state, h, Metric::Geodesic)?;
        let mut lb_e = path.length(state.target());
        if settings.use_candidate_paths_for_lower_bounds {
            if let Some(&root_len) = root_candidates.get(&h) {
                lb_e = lb_e.max(root_len);
            }
        }
        total += lb_e;
    }
    Some(total)
}

/// Up to two structurally distinct candidates for `h_l`: the geodesic
/// shortest path, and (if different) the vertex-repulsive one. A full
/// k-shortest-paths enumeration is not specified anywhere in the retrieved
/// material; this is the practical stand-in, recorded in DESIGN.md.
fn candidates_for(state: &EmbeddingState, h_l: HalfEdgeId) -> Vec<VirtualPath> {
    let mut out = Vec::new();
    if let Some(p) = oracle::shortest_path_for_layout_halfedge(state, h_l, Metric::Geodesic) {
        out.push(p);
    }
    if let Some(p) = oracle::shortest_path_for_layout_halfedge(state, h_l, Metric::VertexRepulsive) {
        if out.first().map(|first| first.vertices != p.vertices).unwrap_or(true) {
            out.push(p);
        }
    }
    out
}

fn state_hash(decisions: &[(HalfEdgeId, VirtualPath)]) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut canonical: Vec<(usize, Vec<usize>)> = decisions
        .iter()
        .map(|(h, p)| (h.index(), p.as_vertex_chain().unwrap().into_iter().map(|v| v.index()).collect()))
        .collect();
    canonical.sort();
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    canonical.hash(&mut hasher);
    hasher.finish()
}

fn non_conflicting_priority(state: &EmbeddingState, lb: f64, best_candidate: &HashMap<HalfEdgeId, VirtualPath>) -> f64 {
    let mut count = 0usize;
    let entries: Vec<(&HalfEdgeId, &VirtualPath)> = best_candidate.iter().collect();
    for (i, (_, p_i)) in entries.iter().enumerate() {
        let verts_i: HashSet<usize> = p_i.vertices.iter().filter_map(|v| v.as_vertex()).map(|v| v.index()).collect();
        let mut conflicts = false;
        for (j, (_, p_j)) in entries.iter().enumerate() {
            if i == j {
                continue;
            }
            let verts_j: HashSet<usize> = p_j.vertices.iter().filter_map(|v| v.as_vertex()).map(|v| v.index()).collect();
            if verts_i.intersection(&verts_j).next().is_some() {
                conflicts = true;
                break;
            }
        }
        if !conflicts {
            count += 1;
        }
    }
    let _ = state;
    lb * (1.0 + count as f64)
}

fn priority_of(state: &EmbeddingState, lb: f64, settings: &BranchAndBoundSettings) -> f64 {
    match settings.priority {
        Priority::LowerBound => lb,
        Priority::LowerBoundNonConflicting => {
            let mut best_candidate = HashMap::new();
            for h in unembedded_canonical_edges(state) {
                if let Some(p) = oracle::shortest_path_for_layout_halfedge(state, h, Metric::Geodesic) {
                    best_candidate.insert(h, p);
                }
            }
            non_conflicting_priority(state, lb, &best_candidate)
        }
    }
}

/// Whether the sum of swirl penalties that would apply to the current best
/// candidate of every unembedded edge already exceeds the remaining budget
/// `ub - cost(s)` — proactive pruning's swirl-based half.
fn swirl_budget_exceeded(state: &EmbeddingState, ub: f64, swirl_penalty_factor: f64) -> bool {
    if !ub.is_finite() {
        return false;
    }
    let budget = ub - state.total_embedded_path_length();
    if budget <= 0.0 {
        return true;
    }
    let mut total_penalty = 0.0;
    for h in unembedded_canonical_edges(state) {
        if let Some(p) = oracle::shortest_path_for_layout_halfedge(state, h, Metric::Geodesic) {
            let swirl = swirl_angle(&p, state.target());
            if swirl > std::f64::consts::PI {
                total_penalty += swirl_penalty_factor * (swirl - std::f64::consts::PI);
            }
        }
    }
    total_penalty > budget
}

pub fn search(input: EmbeddingInput, settings: BranchAndBoundSettings) -> Result<BranchAndBoundResult> {
    let start = Instant::now();
    let time_limit = settings.time_limit_secs;

    let root_candidates: HashMap<HalfEdgeId, f64> = if settings.use_candidate_paths_for_lower_bounds {
        let root_state = EmbeddingState::new(input.clone());
        unembedded_canonical_edges(&root_state)
            .into_iter()
            .filter_map(|h| oracle::shortest_path_for_layout_halfedge(&root_state, h, Metric::Geodesic).map(|p| (h, p.length(root_state.target()))))
            .collect()
    } else {
        HashMap::new()
    };

    let mut ub = f64::INFINITY;
    let mut best_decisions: Vec<(HalfEdgeId, VirtualPath)> = Vec::new();
    let mut ub_events = Vec::new();
    let mut lb_events = Vec::new();

    if settings.use_greedy_init {
        let greedy_results = greedy::embed_competitors(&input);
        if let Some(winner) = greedy::best(&greedy_results) {
            ub = winner.cost();
            best_decisions = winner
                .sequence
                .steps
                .iter()
                .map(|&h| (h, VirtualPath::from_vertices(winner.state.get_embedded_path(h).unwrap().vertices.clone())))
                .collect();
            if settings.record_upper_bound_events {
                ub_events.push((start.elapsed().as_secs_f64(), ub));
            }
        }
    }

    let root_state = EmbeddingState::new(input.clone());
    let root_lb = match lower_bound(&root_state, &settings, &root_candidates) {
        Some(lb) => lb,
        None => {
            let culprit = unembedded_canonical_edges(&root_state)
                .into_iter()
                .find(|&h| oracle::shortest_path_for_layout_halfedge(&root_state, h, Metric::Geodesic).is_none())
                .expect("lower_bound returned None because some edge has no feasible path");
            return Err(LayoutEmbeddingError::Infeasible(culprit));
        }
    };

    let mut heap: BinaryHeap<ScoredNode> = BinaryHeap::new();
    let root_priority = priority_of(&root_state, root_lb, &settings);
    heap.push(ScoredNode(Node {
        decisions: Vec::new(),
        lb: root_lb,
        priority: root_priority,
    }));

    let mut visited_hashes: HashSet<u64> = HashSet::new();
    let mut iterations: u64 = 0;
    let mut deadline_reached = false;
    let mut lb_global = root_lb;

    'search: loop {
        if time_limit > 0.0 && start.elapsed().as_secs_f64() >= time_limit {
            if !(settings.extend_time_limit_to_ensure_solution && !ub.is_finite()) {
                deadline_reached = true;
                break;
            }
        }

        let Some(ScoredNode(node)) = heap.pop() else {
            break;
        };
        lb_global = lb_global.min(node.lb);
        if node.lb >= ub * (1.0 - EPS_GAP_SLACK) && ub.is_finite() {
            continue;
        }

        iterations += 1;
        let state = materialize(&input, &node.decisions);

        if state.is_complete() {
            let cost = state.total_embedded_path_length();
            if cost < ub {
                ub = cost;
                best_decisions = node.decisions.clone();
                if settings.record_upper_bound_events {
                    ub_events.push((start.elapsed().as_secs_f64(), ub));
                }
            }
            continue;
        }

        if settings.use_state_hashing {
            let h = state_hash(&node.decisions);
            if !visited_hashes.insert(h) {
                continue;
            }
        }

        if settings.use_proactive_pruning && swirl_budget_exceeded(&state, ub, 2.0) {
            continue;
        }

        let remaining = unembedded_canonical_edges(&state);
        let mut best_edge: Option<(HalfEdgeId, Vec<VirtualPath>)> = None;
        for h in remaining {
            let cands = candidates_for(&state, h);
            if cands.is_empty() {
                continue 'search; // shouldn't happen: lower_bound already checked feasibility
            }
            let better = match &best_edge {
                None => true,
                Some((bh, bc)) => (cands.len(), h.index()) < (bc.len(), bh.index()),
            };
            if better {
                best_edge = Some((h, cands));
            }
        }
        let Some((e_star, cands)) = best_edge else {
            continue; // no unembedded edges left but not is_complete(): unreachable for a manifold layout mesh
        };

        for path in cands {
            let mut child_decisions = node.decisions.clone();
            child_decisions.push((e_star, path.clone()));
            let child_state = materialize(&input, &child_decisions);
            if let Some(lb) = lower_bound(&child_state, &settings, &root_candidates) {
                if !ub.is_finite() || lb < ub * (1.0 - EPS_GAP_SLACK) {
                    let priority = priority_of(&child_state, lb, &settings);
                    if settings.record_lower_bound_events {
                        lb_events.push((start.elapsed().as_secs_f64(), lb));
                    }
                    heap.push(ScoredNode(Node {
                        decisions: child_decisions,
                        lb,
                        priority,
                    }));
                }
            }
        }

        let gap_now = if ub == 0.0 { 0.0 } else if ub.is_finite() { (ub - lb_global) / ub } else { 1.0 };
        if gap_now <= settings.optimality_gap {
            break;
        }
    }

    let gap = if ub == 0.0 {
        0.0
    } else if ub.is_finite() {
        (ub - lb_global) / ub
    } else {
        1.0
    };

    let sequence = InsertionSequence {
        steps: best_decisions.iter().map(|(h, _)| *h).collect(),
        metric: Metric::Geodesic,
    };

    let peak_memory_estimate_bytes = estimate_peak_memory(&heap, visited_hashes.len());

    Ok(BranchAndBoundResult {
        sequence,
        cost: ub,
        lower_bound: lb_global,
        gap,
        iterations,
        deadline_reached,
        upper_bound_events: ub_events,
        lower_bound_events: lb_events,
        peak_memory_estimate_bytes,
    })
}

/// `sizeof(node) * |open| + |closed|`-style estimate, per spec §8's
/// memory-accounting property — a rough order-of-magnitude figure, not a
/// measured allocator statistic.
fn estimate_peak_memory(open: &BinaryHeap<ScoredNode>, closed_count: usize) -> usize {
    const NODE_BYTES: usize = std::mem::size_of::<Node>() + 64;
    open.len() * NODE_BYTES + closed_count * std::mem::size_of::<u64>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::halfedge::{HalfEdgeMesh, VertexId};

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
    fn finds_the_identity_embedding_optimally() {
        let input = identity_input();
        let settings = BranchAndBoundSettings::default();
        let result = search(input, settings).unwrap();
        assert!(result.gap <= 1e-6);
        let expected_cost = 3.0 + 3.0 * std::f64::consts::SQRT_2;
        assert!((result.cost - expected_cost).abs() < 1e-6);
        assert_eq!(result.sequence.len(), 6);
    }

    #[test]
    fn honors_a_short_time_limit() {
        let input = identity_input();
        let settings = BranchAndBoundSettings {
            time_limit_secs: 1e-12,
            extend_time_limit_to_ensure_solution: false,
            use_greedy_init: false,
            ..BranchAndBoundSettings::default()
        };
        let result = search(input, settings).unwrap();
        assert!(result.deadline_reached);
    }

    #[test]
    fn state_hashing_is_idempotent_across_runs() {
        let input = identity_input();
        let a = search(input.clone(), BranchAndBoundSettings::default()).unwrap();
        let b = search(input, BranchAndBoundSettings::default()).unwrap();
        assert_eq!(a.sequence.steps.len(), b.sequence.steps.len());
        assert!((a.cost - b.cost).abs() < 1e-9);
    }
}
