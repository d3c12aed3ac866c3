//! The fragmentation tree: the output of a [`super::ColorfulSubtreeSolver`] run.
use std::collections::BTreeMap;

use crate::error::IdentificationError;
use crate::formula::MolecularFormula;
use crate::spectrum::Peak;

/// One fragment (tree node): a sub-formula anchored to the peak it explains.
#[derive(Clone, PartialEq, Debug)]
pub struct FragmentNode {
    /// The sub-formula at this node.
    pub formula: MolecularFormula,
    /// The peak this node explains.
    pub peak: Peak,
}

/// One neutral loss (tree edge): `parent.formula - child.formula`.
#[derive(Clone, PartialEq, Debug)]
pub struct Loss {
    /// Index into [`FTree::fragments`] of the parent.
    pub parent: usize,
    /// Index into [`FTree::fragments`] of the child.
    pub child: usize,
    /// The lost formula.
    pub formula: MolecularFormula,
    /// This edge's additively-composed log-odds weight.
    pub weight: f64,
}

/// The aggregate score record for one [`FTree`].
#[derive(Clone, PartialEq, Debug, Default)]
pub struct TreeScoring {
    /// The weight of the root's incoming (pseudo-root) edge.
    pub root_score: f64,
    /// `root_score + sum(losses.weight) + sum(additional_scores.values())`.
    pub overall_score: f64,
    /// Named extra score contributions, e.g. `"isotope"`.
    pub additional_scores: BTreeMap<String, f64>,
}

/// A rooted, edge-weighted fragmentation tree: the solution to one maximum-colorful-subtree
/// search. `fragments[0]` is always the root.
#[derive(Clone, PartialEq, Debug)]
pub struct FTree {
    /// All fragment nodes, root first.
    pub fragments: Vec<FragmentNode>,
    /// All losses (edges).
    pub losses: Vec<Loss>,
    /// The aggregate score.
    pub scoring: TreeScoring,
}

impl FTree {
    /// The root fragment.
    pub fn root(&self) -> &FragmentNode {
        &self.fragments[0]
    }

    /// The total number of fragment nodes.
    pub fn number_of_vertices(&self) -> usize {
        self.fragments.len()
    }

    /// The losses whose parent is `fragment_index`.
    pub fn children_of(&self, fragment_index: usize) -> impl Iterator<Item = &Loss> {
        self.losses.iter().filter(move |l| l.parent == fragment_index)
    }

    /// The fraction of `total_ms2_intensity` explained by this tree's fragment peaks.
    pub fn explained_intensity_ratio(&self, total_ms2_intensity: f64) -> f64 {
        if total_ms2_intensity <= 0.0 {
            return 0.0;
        }
        let explained: f64 = self.fragments.iter().map(|f| f.peak.intensity()).sum();
        (explained / total_ms2_intensity).min(1.0)
    }

    /// Recompute `scoring.overall_score` from scratch and compare it against the stored value.
    /// A mismatch of 1e-9 or more is a fatal internal error.
    pub fn verify(&self) -> Result<(), IdentificationError> {
        let recomputed = self.scoring.root_score
            + self.losses.iter().map(|l| l.weight).sum::<f64>()
            + self.scoring.additional_scores.values().sum::<f64>();
        if (recomputed - self.scoring.overall_score).abs() >= 1e-9 {
            return Err(IdentificationError::internal(format!(
                "tree score verification failed: stored {}, recomputed {recomputed}",
                self.scoring.overall_score
            )));
        }
        Ok(())
    }

    /// `true` iff every edge's head formula is a strict subset of its tail formula's, and no two
    /// fragments share a peak.
    pub fn respects_structural_invariants(&self) -> bool {
        let subsets = self.losses.iter().all(|l| {
            self.fragments[l.parent].formula.strictly_contains(&self.fragments[l.child].formula)
        });
        let mut seen = std::collections::HashSet::new();
        let colorful = self.fragments.iter().all(|f| seen.insert(f.peak.mz().value.to_bits()));
        subsets && colorful
    }
}
