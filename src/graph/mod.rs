//! The fragmentation DAG: nodes are (peak, sub-formula) pairs, edges are chemically plausible
//! neutral losses, and a pseudo-root connects to every candidate explaining the parent peak.
pub mod scorer;

use crate::formula::MolecularFormula;
use crate::ionization::PrecursorIonType;
use crate::preprocess::ProcessedInput;
use crate::spectrum::Peak;
use crate::tolerance::Deviation;
use scorer::{default_fragment_scorers, default_loss_scorers, FragmentContext, FragmentPeakScorer, LossContext, LossScorer};

/// The m/z margin used to decide "peak 1 is heavier than peak 2" when comparing non-parent peaks.
const EPSILON_MZ: f64 = 1e-6;

/// A pseudo-root or a (peak, sub-formula) pair.
#[derive(Clone, PartialEq, Debug)]
pub enum NodeKind {
    /// The synthetic root all top-level candidates hang from.
    PseudoRoot,
    /// A candidate sub-formula explaining a specific peak.
    Fragment {
        /// Index into the owning [`FGraph`]'s peak list.
        peak_index: usize,
        /// The sub-formula this node represents.
        formula: MolecularFormula,
    },
}

/// One node of the fragmentation DAG.
#[derive(Clone, PartialEq, Debug)]
pub struct Node {
    /// What this node represents.
    pub kind: NodeKind,
    /// The color (peak index) this node occupies; `None` for the pseudo-root, which is
    /// colorless and may coexist with any chosen subtree.
    pub color: Option<usize>,
}

/// A directed edge: `tail -> head`, where `head.formula` is a subset of `tail.formula` (or the
/// tail is the pseudo-root).
#[derive(Clone, PartialEq, Debug)]
pub struct Edge {
    /// Index of the tail (parent) node.
    pub tail: usize,
    /// Index of the head (child) node.
    pub head: usize,
    /// The additively-composed log-odds weight of choosing this edge.
    pub weight: f64,
}

/// The fragmentation graph built for one fixed candidate precursor formula.
#[derive(Clone, PartialEq, Debug)]
pub struct FGraph {
    /// All nodes, with index 0 always the pseudo-root.
    pub nodes: Vec<Node>,
    /// All edges, `tail -> head`.
    pub edges: Vec<Edge>,
    /// The merged MS2 peaks this graph was built over (indexed by [`NodeKind::Fragment::peak_index`]).
    pub peaks: Vec<Peak>,
}

impl FGraph {
    /// The pseudo-root's node index.
    pub const ROOT: usize = 0;

    /// Outgoing edges from `node`.
    pub fn edges_from(&self, node: usize) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.tail == node)
    }

    /// The color of a node, or `None` for the pseudo-root.
    pub fn color(&self, node: usize) -> Option<usize> {
        self.nodes[node].color
    }

    /// The number of distinct colors present among non-root nodes.
    pub fn color_count(&self) -> usize {
        self.nodes.iter().filter_map(|n| n.color).collect::<std::collections::HashSet<_>>().len()
    }
}

/// Build the fragmentation graph for candidate precursor formula `precursor_formula` from
/// `processed`.
pub fn build_graph(
    processed: &ProcessedInput,
    precursor_formula: &MolecularFormula,
    ion_type: &PrecursorIonType,
    deviation: Deviation,
    tree_size_score: f64,
) -> FGraph {
    let loss_scorers = default_loss_scorers();
    let fragment_scorers = default_fragment_scorers();

    let mut nodes = vec![Node {
        kind: NodeKind::PseudoRoot,
        color: None,
    }];
    // node_index -> (peak_index, formula)
    let mut fragments: Vec<(usize, MolecularFormula)> = Vec::new();
    for (peak_index, decomposition) in processed.decompositions.iter().enumerate() {
        for formula in &decomposition.formulas {
            if !precursor_formula.contains(formula) {
                continue;
            }
            fragments.push((peak_index, formula.clone()));
            nodes.push(Node {
                kind: NodeKind::Fragment {
                    peak_index,
                    formula: formula.clone(),
                },
                color: Some(peak_index),
            });
        }
    }

    let mut edges = Vec::new();
    let parent_peak_index = processed.parent_peak_index;

    for (i, (peak_i, formula_i)) in fragments.iter().enumerate() {
        let node_i = i + 1;
        let is_from_parent_peak = parent_peak_index == Some(*peak_i);

        if is_from_parent_peak && *formula_i == *precursor_formula {
            edges.push(Edge {
                tail: FGraph::ROOT,
                head: node_i,
                weight: score_fragment(
                    &processed.peaks[*peak_i],
                    formula_i,
                    ion_type,
                    deviation,
                    tree_size_score,
                    &fragment_scorers,
                ),
            });
        }

        for (j, (peak_j, formula_j)) in fragments.iter().enumerate() {
            if i == j {
                continue;
            }
            let node_j = j + 1;
            if !formula_i.strictly_contains(formula_j) {
                continue;
            }
            let heavier_peak = processed.peaks[*peak_i].mz().value > processed.peaks[*peak_j].mz().value + EPSILON_MZ;
            if !(is_from_parent_peak || heavier_peak) {
                continue;
            }
            let Some(loss) = formula_i.checked_sub(formula_j) else {
                continue;
            };
            let loss_weight: f64 = loss_scorers.iter().map(|s| s.evaluate(&LossContext { loss: &loss })).sum();
            let fragment_weight = score_fragment(
                &processed.peaks[*peak_j],
                formula_j,
                ion_type,
                deviation,
                tree_size_score,
                &fragment_scorers,
            );
            edges.push(Edge {
                tail: node_i,
                head: node_j,
                weight: loss_weight + fragment_weight,
            });
        }
    }

    FGraph {
        nodes,
        edges,
        peaks: processed.peaks.clone(),
    }
}

fn score_fragment(
    peak: &Peak,
    formula: &MolecularFormula,
    ion_type: &PrecursorIonType,
    deviation: Deviation,
    tree_size_score: f64,
    scorers: &[FragmentPeakScorer],
) -> f64 {
    let theoretical_ion_mz = ion_type.neutral_to_ion_mass(formula).value;
    let ctx = FragmentContext {
        peak,
        theoretical_ion_mz,
        formula,
        deviation,
        tree_size_score,
    };
    scorers.iter().map(|s| s.evaluate(&ctx)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::FormulaConstraints;
    use crate::element::Element;
    use crate::preprocess;
    use crate::spectrum::{Ms2Experiment, Spectrum};
    use crate::system::{da, mz, MassOverCharge};

    fn glucose() -> MolecularFormula {
        MolecularFormula::new([(Element::C, 6), (Element::H, 12), (Element::O, 6)])
    }

    #[test]
    fn root_connects_to_parent_peak_full_formula() {
        let ms2 = Spectrum::wrap(&[181.0707, 163.06, 85.028], &[1.0, 0.6, 0.4]);
        let experiment = Ms2Experiment::new("glucose", vec![ms2], MassOverCharge::new::<mz>(181.0707));
        let ion_type = PrecursorIonType::protonated();
        let deviation = Deviation::new(10.0, da(0.001));
        let processed = preprocess::process(&experiment, &glucose(), &ion_type, &FormulaConstraints::default(), deviation);
        let graph = build_graph(&processed, &glucose(), &ion_type, deviation, 0.0);
        assert!(graph.edges_from(FGraph::ROOT).count() >= 1);
    }

    #[test]
    fn every_edge_head_is_strict_subset_of_tail() {
        let ms2 = Spectrum::wrap(&[181.0707, 163.06, 85.028], &[1.0, 0.6, 0.4]);
        let experiment = Ms2Experiment::new("glucose", vec![ms2], MassOverCharge::new::<mz>(181.0707));
        let ion_type = PrecursorIonType::protonated();
        let deviation = Deviation::new(10.0, da(0.001));
        let processed = preprocess::process(&experiment, &glucose(), &ion_type, &FormulaConstraints::default(), deviation);
        let graph = build_graph(&processed, &glucose(), &ion_type, deviation, 0.0);
        for edge in &graph.edges {
            if edge.tail == FGraph::ROOT {
                continue;
            }
            let (NodeKind::Fragment { formula: tail_formula, .. }, NodeKind::Fragment { formula: head_formula, .. }) =
                (&graph.nodes[edge.tail].kind, &graph.nodes[edge.head].kind)
            else {
                panic!("expected fragment nodes");
            };
            assert!(tail_formula.strictly_contains(head_formula));
        }
    }
}
