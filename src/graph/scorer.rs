//! Pluggable scoring strategies, modeled as tagged variants with a shared evaluation method
//! so new scorers can be added without a trait-object registry.
use crate::formula::MolecularFormula;
use crate::spectrum::Peak;
use crate::tolerance::Deviation;

/// Context available to a [`LossScorer`] when scoring one candidate edge.
pub struct LossContext<'a> {
    /// The formula lost between parent and child (`parent.formula - child.formula`).
    pub loss: &'a MolecularFormula,
}

/// A scoring term evaluated on the neutral loss of a candidate edge.
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum LossScorer {
    /// Penalizes losses with an implausible ring-double-bond-equivalent value.
    RingDoubleBondEquivalent,
    /// Rewards losses matching a small table of chemically common neutral losses (water,
    /// ammonia, carbon dioxide, ...).
    CommonLossPattern,
    /// Penalizes losses that would require rearranging more hydrogens than plausible.
    HydrogenRearrangement,
}

impl LossScorer {
    /// Evaluate this scorer against one candidate edge's loss.
    pub fn evaluate(self, ctx: &LossContext) -> f64 {
        match self {
            Self::RingDoubleBondEquivalent => {
                let rdbe = ctx.loss.ring_double_bond_equivalents();
                if (-0.5..=20.0).contains(&rdbe) {
                    0.0
                } else {
                    -2.0 * (rdbe.abs() - 20.0).max(0.0)
                }
            }
            Self::CommonLossPattern => common_loss_bonus(ctx.loss),
            Self::HydrogenRearrangement => {
                let h = f64::from(ctx.loss.count(crate::element::Element::H));
                let heavy: u32 = ctx
                    .loss
                    .elements()
                    .filter(|(e, _)| *e != crate::element::Element::H)
                    .map(|(_, n)| n)
                    .sum();
                if h <= 2.0 * f64::from(heavy) + 2.0 {
                    0.0
                } else {
                    -0.5 * (h - 2.0 * f64::from(heavy) - 2.0)
                }
            }
        }
    }
}

fn common_loss_bonus(loss: &MolecularFormula) -> f64 {
    use crate::element::Element;
    let water = MolecularFormula::new([(Element::H, 2), (Element::O, 1)]);
    let ammonia = MolecularFormula::new([(Element::N, 1), (Element::H, 3)]);
    let co2 = MolecularFormula::new([(Element::C, 1), (Element::O, 2)]);
    let co = MolecularFormula::new([(Element::C, 1), (Element::O, 1)]);
    let methyl = MolecularFormula::new([(Element::C, 1), (Element::H, 3)]);
    if *loss == water || *loss == ammonia || *loss == co2 {
        2.0
    } else if *loss == co || *loss == methyl {
        1.0
    } else {
        0.0
    }
}

/// Context available to a [`FragmentPeakScorer`] when scoring one candidate node.
pub struct FragmentContext<'a> {
    /// The peak this node is anchored to.
    pub peak: &'a Peak,
    /// The theoretical ion mass of `formula` under the active ionization.
    pub theoretical_ion_mz: f64,
    /// The candidate sub-formula at this node.
    pub formula: &'a MolecularFormula,
    /// The deviation window used to judge m/z plausibility.
    pub deviation: Deviation,
    /// The current tree-size bonus, bumped by the pipeline's adaptive loop.
    pub tree_size_score: f64,
}

/// A scoring term evaluated on a candidate fragment node.
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum FragmentPeakScorer {
    /// Rewards a small observed-vs-theoretical m/z deviation; penalizes outside the window.
    MassDeviation,
    /// Rewards higher relative peak intensity.
    Intensity,
    /// Rewards chemically plausible formulas (non-negative, reasonable RDBE).
    FormulaPlausibility,
    /// A constant bonus per node, used as the adaptive tree-size knob.
    TreeSize,
}

impl FragmentPeakScorer {
    /// Evaluate this scorer against one candidate node.
    pub fn evaluate(self, ctx: &FragmentContext) -> f64 {
        match self {
            Self::MassDeviation => {
                use crate::system::da;
                let observed = da(ctx.peak.mz().value);
                let theoretical = da(ctx.theoretical_ion_mz);
                let window = ctx.deviation.allowed_deviation(theoretical).value.max(1e-9);
                let error = (observed - theoretical).value.abs();
                if error > window {
                    -10.0
                } else {
                    2.0 * (1.0 - error / window)
                }
            }
            Self::Intensity => ctx.peak.intensity().max(0.0).ln_1p(),
            Self::FormulaPlausibility => {
                let rdbe = ctx.formula.ring_double_bond_equivalents();
                if (-0.5..=40.0).contains(&rdbe) {
                    0.0
                } else {
                    -1.0
                }
            }
            Self::TreeSize => ctx.tree_size_score,
        }
    }
}

/// The default set of loss scorers applied to every edge.
pub fn default_loss_scorers() -> Vec<LossScorer> {
    vec![
        LossScorer::RingDoubleBondEquivalent,
        LossScorer::CommonLossPattern,
        LossScorer::HydrogenRearrangement,
    ]
}

/// The default set of fragment-peak scorers applied to every node.
pub fn default_fragment_scorers() -> Vec<FragmentPeakScorer> {
    vec![
        FragmentPeakScorer::MassDeviation,
        FragmentPeakScorer::Intensity,
        FragmentPeakScorer::FormulaPlausibility,
        FragmentPeakScorer::TreeSize,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;

    #[test]
    fn common_loss_gets_a_bonus() {
        let water = MolecularFormula::new([(Element::H, 2), (Element::O, 1)]);
        let ctx = LossContext { loss: &water };
        assert!(LossScorer::CommonLossPattern.evaluate(&ctx) > 0.0);
    }

    #[test]
    fn uncommon_loss_gets_no_bonus() {
        let weird = MolecularFormula::new([(Element::Fe, 1)]);
        let ctx = LossContext { loss: &weird };
        assert_eq!(LossScorer::CommonLossPattern.evaluate(&ctx), 0.0);
    }

    #[test]
    fn tree_size_scorer_passes_through_current_bonus() {
        let formula = MolecularFormula::new([(Element::C, 1)]);
        let peak = Peak::new(crate::system::MassOverCharge::new::<crate::system::mz>(100.0), 1.0);
        let ctx = FragmentContext {
            peak: &peak,
            theoretical_ion_mz: 100.0,
            formula: &formula,
            deviation: Deviation::new(10.0, crate::system::da(0.001)),
            tree_size_score: 2.5,
        };
        assert_eq!(FragmentPeakScorer::TreeSize.evaluate(&ctx), 2.5);
    }
}
