//! Default [`super::ColorfulSubtreeSolver`]: a subset-DP (knapsack-over-colors) exact solver.
//!
//! For each node, `solve` computes, for every reachable subset of descendant colors, the maximum
//! additional weight obtainable using exactly that color set, merging one child edge at a time
//! (a standard "tree knapsack" construction). Practical for the color counts (tens of peaks) this
//! crate's fragmentation graphs have; an ILP-based solver handling the same contract at larger
//! scale is documented, not implemented, in this crate's design notes.
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::error::IdentificationError;
use crate::formula::MolecularFormula;
use crate::graph::{Edge, FGraph, NodeKind};
use crate::system::{s, OrderedScore, Time};

use super::tree::{FTree, FragmentNode, Loss, TreeScoring};
use super::ColorfulSubtreeSolver;

/// `node -> (colors subset bitmask -> (best additional weight, chosen child edges))`.
type DpMap = HashMap<u32, (f64, Vec<(usize, u32)>)>;

/// A maximum colorful subtree solver via dynamic programming over color subsets.
#[derive(Clone, Copy, Debug)]
pub struct DynamicProgrammingSolver {
    time_budget: Option<Duration>,
}

impl DynamicProgrammingSolver {
    /// A solver with no time budget: always runs to completion.
    pub fn unbounded() -> Self {
        Self { time_budget: None }
    }

    /// A solver that gives up exploring further edges once `budget` has elapsed, returning the
    /// best feasible tree found so far (or `None` if none was found yet).
    pub fn with_time_budget(budget: Time) -> Self {
        Self {
            time_budget: Some(Duration::from_secs_f64(budget.get::<s>().max(0.0))),
        }
    }
}

impl Default for DynamicProgrammingSolver {
    fn default() -> Self {
        Self::unbounded()
    }
}

fn timed_out(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() > d)
}

fn solve(graph: &FGraph, node: usize, deadline: Option<Instant>, memo: &mut HashMap<usize, DpMap>) -> DpMap {
    if let Some(cached) = memo.get(&node) {
        return cached.clone();
    }
    let mut dp: DpMap = HashMap::new();
    dp.insert(0u32, (0.0, Vec::new()));

    for edge in graph.edges_from(node) {
        if timed_out(deadline) {
            break;
        }
        let child = edge.head;
        let Some(child_color) = graph.color(child) else {
            continue;
        };
        if child_color >= 32 {
            // Beyond this crate's practical color-count range; skip rather than overflow the mask.
            continue;
        }
        let child_bit = 1u32 << child_color;
        let child_dp = solve(graph, child, deadline, memo);

        let mut next = dp.clone();
        for (&mask, (value, choices)) in &dp {
            for (&child_mask, (child_value, _)) in &child_dp {
                let combined_child_mask = child_mask | child_bit;
                if mask & combined_child_mask != 0 {
                    continue;
                }
                let new_mask = mask | combined_child_mask;
                let new_value = value + edge.weight + child_value;
                let is_better = next.get(&new_mask).map_or(true, |(v, _)| new_value > *v);
                if is_better {
                    let mut new_choices = choices.clone();
                    new_choices.push((child, combined_child_mask));
                    next.insert(new_mask, (new_value, new_choices));
                }
            }
        }
        dp = next;
    }

    memo.insert(node, dp.clone());
    dp
}

fn emit_subtree(
    graph: &FGraph,
    node: usize,
    mask: u32,
    memo: &HashMap<usize, DpMap>,
    parent_fragment_index: usize,
    fragments: &mut Vec<FragmentNode>,
    losses: &mut Vec<Loss>,
) {
    let Some((_, choices)) = memo.get(&node).and_then(|dp| dp.get(&mask)) else {
        return;
    };
    for &(child, child_mask) in choices {
        let NodeKind::Fragment { peak_index, formula } = &graph.nodes[child].kind else {
            continue;
        };
        let child_fragment_index = fragments.len();
        fragments.push(FragmentNode {
            formula: formula.clone(),
            peak: graph.peaks[*peak_index],
        });
        let edge_weight = graph
            .edges_from(node)
            .find(|e: &&Edge| e.head == child)
            .map_or(0.0, |e| e.weight);
        let parent_formula = fragments[parent_fragment_index].formula.clone();
        let loss_formula = parent_formula.checked_sub(formula).unwrap_or_else(MolecularFormula::empty);
        losses.push(Loss {
            parent: parent_fragment_index,
            child: child_fragment_index,
            formula: loss_formula,
            weight: edge_weight,
        });
        emit_subtree(graph, child, child_mask, memo, child_fragment_index, fragments, losses);
    }
}

fn root_candidates(graph: &FGraph) -> impl Iterator<Item = &Edge> {
    graph.edges_from(FGraph::ROOT)
}

fn build_tree_from(graph: &FGraph, root_edge: &Edge, mask: u32, value: f64, memo: &HashMap<usize, DpMap>) -> FTree {
    let NodeKind::Fragment { peak_index, formula } = &graph.nodes[root_edge.head].kind else {
        unreachable!("root edge always targets a fragment node")
    };
    let mut fragments = vec![FragmentNode {
        formula: formula.clone(),
        peak: graph.peaks[*peak_index],
    }];
    let mut losses = Vec::new();
    emit_subtree(graph, root_edge.head, mask, memo, 0, &mut fragments, &mut losses);

    let scoring = TreeScoring {
        root_score: root_edge.weight,
        overall_score: root_edge.weight + value,
        additional_scores: std::collections::BTreeMap::new(),
    };
    FTree {
        fragments,
        losses,
        scoring,
    }
}

impl ColorfulSubtreeSolver for DynamicProgrammingSolver {
    fn optimal_tree(&self, graph: &FGraph, lower_bound: Option<f64>) -> Result<Option<FTree>, IdentificationError> {
        let deadline = self.time_budget.map(|d| Instant::now() + d);
        let mut memo: HashMap<usize, DpMap> = HashMap::new();

        let mut best: Option<(f64, &Edge, u32)> = None;
        for edge in root_candidates(graph) {
            let child_dp = solve(graph, edge.head, deadline, &mut memo);
            for (&mask, (value, _)) in &child_dp {
                let total = edge.weight + value;
                if best.map_or(true, |(best_total, _, _)| total > best_total) {
                    best = Some((total, edge, mask));
                }
            }
        }

        if timed_out(deadline) {
            log::warn!("colorful subtree search exceeded its time budget; returning the best tree found so far");
        }

        let Some((total, edge, mask)) = best else {
            return Ok(None);
        };
        if let Some(bound) = lower_bound {
            if total < bound {
                return Ok(None);
            }
        }
        let tree = build_tree_from(graph, edge, mask, total - edge.weight, &memo);
        tree.verify()?;
        Ok(Some(tree))
    }

    fn k_best_trees(&self, graph: &FGraph, k: usize) -> Result<Vec<FTree>, IdentificationError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let deadline = self.time_budget.map(|d| Instant::now() + d);
        let mut memo: HashMap<usize, DpMap> = HashMap::new();

        let mut candidates: Vec<(f64, &Edge, u32)> = Vec::new();
        for edge in root_candidates(graph) {
            let child_dp = solve(graph, edge.head, deadline, &mut memo);
            for (&mask, (value, _)) in &child_dp {
                candidates.push((edge.weight + value, edge, mask));
            }
        }
        candidates.sort_by_key(|c| std::cmp::Reverse(OrderedScore::new(c.0)));

        let mut trees = Vec::new();
        let mut seen_formula_multisets = std::collections::HashSet::new();
        for (total, edge, mask) in candidates {
            if trees.len() >= k {
                break;
            }
            let tree = build_tree_from(graph, edge, mask, total - edge.weight, &memo);
            let mut key: Vec<String> = tree.fragments.iter().map(|f| f.formula.hill_notation()).collect();
            key.sort();
            if !seen_formula_multisets.insert(key) {
                continue;
            }
            tree.verify()?;
            trees.push(tree);
        }
        Ok(trees)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::FormulaConstraints;
    use crate::element::Element;
    use crate::formula::MolecularFormula;
    use crate::graph::build_graph;
    use crate::ionization::PrecursorIonType;
    use crate::preprocess;
    use crate::spectrum::{Ms2Experiment, Spectrum};
    use crate::system::{da, mz, MassOverCharge};
    use crate::tolerance::Deviation;

    fn glucose() -> MolecularFormula {
        MolecularFormula::new([(Element::C, 6), (Element::H, 12), (Element::O, 6)])
    }

    fn glucose_graph() -> FGraph {
        let ms2 = Spectrum::wrap(&[181.0707, 163.0601, 85.0284], &[1.0, 0.6, 0.4]);
        let experiment = Ms2Experiment::new("glucose", vec![ms2], MassOverCharge::new::<mz>(181.0707));
        let ion_type = PrecursorIonType::protonated();
        let deviation = Deviation::new(10.0, da(0.001));
        let processed = preprocess::process(&experiment, &glucose(), &ion_type, &FormulaConstraints::default(), deviation);
        build_graph(&processed, &glucose(), &ion_type, deviation, 0.0)
    }

    #[test]
    fn optimal_tree_roots_at_precursor_formula() {
        let graph = glucose_graph();
        let solver = DynamicProgrammingSolver::unbounded();
        let tree = solver.optimal_tree(&graph, None).unwrap().unwrap();
        assert_eq!(tree.root().formula, glucose());
        assert!(tree.respects_structural_invariants());
    }

    #[test]
    fn optimal_tree_score_is_self_consistent() {
        let graph = glucose_graph();
        let solver = DynamicProgrammingSolver::unbounded();
        let tree = solver.optimal_tree(&graph, None).unwrap().unwrap();
        assert!(tree.verify().is_ok());
    }

    #[test]
    fn k_best_returns_at_most_k_distinct_trees_in_order() {
        let graph = glucose_graph();
        let solver = DynamicProgrammingSolver::unbounded();
        let trees = solver.k_best_trees(&graph, 3).unwrap();
        assert!(trees.len() <= 3);
        for pair in trees.windows(2) {
            assert!(pair[0].scoring.overall_score >= pair[1].scoring.overall_score);
        }
    }

    #[test]
    fn empty_graph_yields_no_tree() {
        let graph = FGraph {
            nodes: vec![crate::graph::Node {
                kind: crate::graph::NodeKind::PseudoRoot,
                color: None,
            }],
            edges: Vec::new(),
            peaks: Vec::new(),
        };
        let solver = DynamicProgrammingSolver::unbounded();
        assert!(solver.optimal_tree(&graph, None).unwrap().is_none());
    }
}
