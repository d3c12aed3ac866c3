//! The maximum-colorful-subtree search: the combinatorial core of fragmentation tree
//! construction.
pub mod dp;
mod tree;

pub use dp::DynamicProgrammingSolver;
pub use tree::{FTree, FragmentNode, Loss, TreeScoring};

use crate::error::IdentificationError;
use crate::graph::FGraph;

/// A pluggable solver for the maximum colorful subtree problem.
///
/// At minimum one implementation must be provided; this crate ships [`DynamicProgrammingSolver`].
/// An ILP-based implementation (one binary variable per edge, tree/color/connectivity
/// constraints) is feasible against the same trait but is not provided here — see `DESIGN.md`.
pub trait ColorfulSubtreeSolver {
    /// Find a feasible tree with maximum overall score. If `lower_bound` is given, returns `None`
    /// when no feasible tree reaches it. Returns `Ok(None)` (not an error) when the graph has no
    /// feasible subtree at all — `ErrorKind::SolverInfeasible` exists for callers that want to
    /// surface this as an error, but this trait never constructs one itself.
    fn optimal_tree(&self, graph: &FGraph, lower_bound: Option<f64>) -> Result<Option<FTree>, IdentificationError>;

    /// Up to `k` distinct trees (distinct fragment-formula multisets) in non-increasing
    /// overall-score order.
    fn k_best_trees(&self, graph: &FGraph, k: usize) -> Result<Vec<FTree>, IdentificationError>;
}
