//! The identification pipeline orchestrator: MS1 filtering, k-best tree computation with its
//! adaptive tree-size loop, optional recalibration, and final ranking.
use std::sync::mpsc;

use crate::constraints::FormulaConstraints;
use crate::decomposer;
use crate::error::{Context, ErrorKind, IdentificationError};
use crate::formula::MolecularFormula;
use crate::ionization::{Ionization, PrecursorIonType};
use crate::isotope::{self, ScoredMolecularFormula};
use crate::profile::MeasurementProfile;
use crate::recalibration;
use crate::solver::{ColorfulSubtreeSolver, DynamicProgrammingSolver, FTree};
use crate::spectrum::{Ms2Experiment, Peak, Spectrum};
use crate::system::{da, mz, MassOverCharge};
use crate::{graph, preprocess};

/// The maximum total increase the adaptive loop may apply to the tree-size bonus before giving
/// up on reaching the explanatory sufficiency thresholds.
const MAX_TREESIZE_INCREASE: f64 = 3.0;
const MIN_COMPUTE_CANDIDATES: usize = 5;
const SUFFICIENT_VERTEX_COUNT: usize = 15;
const SUFFICIENT_INTENSITY_RATIO: f64 = 0.70;

/// How MS1 information is used by [`identify`].
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum IsotopeMode {
    /// Ignore MS1.
    Omit,
    /// Restrict candidates to the isotope-filtered set.
    Filter,
    /// Filter (when `bestScore > 10`) and add an isotope score to each qualifying tree.
    Score,
}

/// One ranked candidate: its neutral formula, the ion type it was explained under, and its
/// fragmentation tree (`None` when no feasible tree exists at all).
#[derive(Clone, PartialEq, Debug)]
pub struct IdentificationResult {
    /// 1-based rank among the returned results.
    pub rank: usize,
    /// The candidate neutral formula (the tree's root formula, when a tree exists).
    pub formula: MolecularFormula,
    /// The ion type this candidate was explained under.
    pub ionization: PrecursorIonType,
    /// The fragmentation tree, or `None` if infeasible.
    pub tree: Option<FTree>,
    /// The composite score used for ranking (`f64::NEG_INFINITY` when `tree` is `None`).
    pub overall_score: f64,
}

struct CandidateComputation {
    formula: MolecularFormula,
    tree: Option<FTree>,
    overall_score: f64,
}

fn compute_candidate_tree(
    experiment: &Ms2Experiment,
    formula: &MolecularFormula,
    ion_type: &PrecursorIonType,
    profile: &MeasurementProfile,
) -> Result<Option<FTree>, IdentificationError> {
    let deviation = profile.allowed_mass_deviation();
    let processed = preprocess::process(experiment, formula, ion_type, profile.formula_constraints(), deviation);
    let fgraph = graph::build_graph(&processed, formula, ion_type, deviation, profile.tree_size_score());
    let solver = DynamicProgrammingSolver::unbounded();
    solver.optimal_tree(&fgraph, None)
}

/// Run the tree computation for `candidates` across a worker pool with `profile.parallelism()`
/// workers: an explicit queue of jobs, spawned onto the pool and joined back via a channel,
/// rather than a transparent parallel-iterator fan-out.
fn compute_candidates_in_parallel(
    experiment: &Ms2Experiment,
    candidates: &[MolecularFormula],
    ion_type: &PrecursorIonType,
    profile: &MeasurementProfile,
    iso_scores: Option<&[ScoredMolecularFormula]>,
) -> Result<Vec<CandidateComputation>, IdentificationError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(profile.parallelism().max(1))
        .build()
        .map_err(|e| IdentificationError::internal(format!("failed to build worker pool: {e}")))?;

    let (sender, receiver) = mpsc::channel();
    pool.scope(|scope| {
        for formula in candidates {
            let sender = sender.clone();
            scope.spawn(move |_| {
                let result = compute_candidate_tree(experiment, formula, ion_type, profile);
                let _ = sender.send((formula.clone(), result));
            });
        }
    });
    drop(sender);

    let mut results = Vec::new();
    for (formula, tree_result) in receiver {
        let mut tree = tree_result?;
        if let (Some(t), Some(scores)) = (tree.as_mut(), iso_scores) {
            if let Some(score) = scores.iter().find(|s| s.formula == formula) {
                add_isotope_score(t, score.score);
            }
        }
        let overall_score = tree.as_ref().map_or(f64::NEG_INFINITY, |t| t.scoring.overall_score);
        results.push(CandidateComputation {
            formula,
            tree,
            overall_score,
        });
    }
    Ok(results)
}

/// Record `score` under `scoring.additional_scores["isotope"]` and fold it into
/// `scoring.overall_score`, keeping [`FTree::verify`] consistent rather than carrying the isotope
/// contribution in a side value.
fn add_isotope_score(tree: &mut FTree, score: f64) {
    *tree.scoring.additional_scores.entry("isotope".to_string()).or_insert(0.0) += score;
    tree.scoring.overall_score += score;
}

/// Fit a recalibration from `tree`'s explained peaks, apply it to `experiment`'s MS2 m/z values,
/// rebuild the fragmentation DAG against the corrected spectra, and re-solve for the recalibrated
/// counterpart tree. Re-adds the isotope score (when `iso_scores` names this formula) so the
/// recalibrated tree's `overall_score` is directly comparable to the uncorrected one.
///
/// Leaves `computation` untouched if recalibration yields no feasible tree.
fn recalibrate_computation(
    experiment: &Ms2Experiment,
    computation: &mut CandidateComputation,
    ion_type: &PrecursorIonType,
    profile: &MeasurementProfile,
    iso_scores: Option<&[ScoredMolecularFormula]>,
) -> Result<(), IdentificationError> {
    let Some(tree) = &computation.tree else {
        return Ok(());
    };
    let spectrum_peak_counts: Vec<usize> = experiment.ms2().iter().map(|s| s.peaks().len()).collect();
    let recal = recalibration::recalibrate(tree, ion_type, &spectrum_peak_counts, profile.median_slope_recalibration());

    let corrected_ms2: Vec<Spectrum> = experiment
        .ms2()
        .iter()
        .zip(&recal.per_spectrum)
        .map(|(spectrum, correction)| {
            let peaks: Vec<Peak> = spectrum
                .peaks()
                .iter()
                .map(|p| Peak::new(MassOverCharge::new::<mz>(correction.apply(p.mz().value)), p.intensity()))
                .collect();
            Spectrum::from_peaks(peaks)
        })
        .collect();
    let corrected_experiment = experiment.clone().with_ms2(corrected_ms2);

    let mut recalibrated_tree = match compute_candidate_tree(&corrected_experiment, &computation.formula, ion_type, profile)? {
        Some(tree) => tree,
        None => return Ok(()),
    };
    if let Some(scores) = iso_scores {
        if let Some(score) = scores.iter().find(|s| s.formula == computation.formula) {
            add_isotope_score(&mut recalibrated_tree, score.score);
        }
    }
    computation.overall_score = recalibrated_tree.scoring.overall_score;
    computation.tree = Some(recalibrated_tree);
    Ok(())
}

fn rank_and_truncate(mut results: Vec<CandidateComputation>, output_size: usize, ion_type: &PrecursorIonType) -> Vec<IdentificationResult> {
    results.sort_by_key(|c| {
        (
            std::cmp::Reverse(crate::system::OrderedScore::new(c.overall_score)),
            c.formula.hill_notation(),
        )
    });
    results
        .into_iter()
        .take(output_size)
        .enumerate()
        .map(|(i, c)| IdentificationResult {
            rank: i + 1,
            formula: c.formula,
            ionization: ion_type.clone(),
            tree: c.tree,
            overall_score: c.overall_score,
        })
        .collect()
}

fn is_sufficient(results: &[CandidateComputation], total_ms2_intensity: f64, s: f64, s_max: f64) -> bool {
    if s >= s_max {
        return true;
    }
    results.iter().any(|c| {
        c.tree.as_ref().is_some_and(|t| {
            t.number_of_vertices() >= SUFFICIENT_VERTEX_COUNT
                || t.explained_intensity_ratio(total_ms2_intensity) >= SUFFICIENT_INTENSITY_RATIO
        })
    })
}

fn active_profile<'a>(experiment: &'a Ms2Experiment, fallback: &'a MeasurementProfile) -> &'a MeasurementProfile {
    experiment.profile_override().unwrap_or(fallback)
}

/// The core adaptive loop shared by [`identify`] and [`identify_precursor_and_ionization`]: run
/// up to `compute_n` candidates, growing the tree-size bonus until the sufficiency test passes
/// or the increase budget is exhausted.
fn adaptive_loop(
    experiment: &Ms2Experiment,
    candidates: &[MolecularFormula],
    ion_type: &PrecursorIonType,
    base_profile: &MeasurementProfile,
    iso_scores: Option<&[ScoredMolecularFormula]>,
) -> Result<Vec<CandidateComputation>, IdentificationError> {
    let total_ms2_intensity: f64 = experiment.ms2().iter().flat_map(|s| s.peaks()).map(|p| p.intensity()).sum();
    let s0 = base_profile.tree_size_score();
    let s_max = s0 + MAX_TREESIZE_INCREASE;
    let mut s = s0;

    loop {
        let profile = base_profile.with_tree_size_score(s);
        let results = compute_candidates_in_parallel(experiment, candidates, ion_type, &profile, iso_scores)?;
        let best_vertex_count = results.iter().filter_map(|c| c.tree.as_ref().map(FTree::number_of_vertices)).max().unwrap_or(0);
        let best_intensity_ratio = results
            .iter()
            .filter_map(|c| c.tree.as_ref().map(|t| t.explained_intensity_ratio(total_ms2_intensity)))
            .fold(0.0, f64::max);
        log::debug!(
            "adaptive loop: s={s}, candidates={}, best tree vertices={best_vertex_count}, best explained intensity={best_intensity_ratio:.3}",
            results.len()
        );
        if s >= s_max {
            log::info!("adaptive loop stopped at s={s} (increase budget exhausted)");
            return Ok(results);
        }
        if is_sufficient(&results, total_ms2_intensity, s, s_max) {
            log::info!("adaptive loop converged at s={s} (sufficiency threshold met)");
            return Ok(results);
        }
        s += 1.0;
    }
}

fn resolve_isotope_candidates(
    experiment: &Ms2Experiment,
    ion_type: &PrecursorIonType,
    profile: &MeasurementProfile,
) -> Result<(Vec<ScoredMolecularFormula>, f64), IdentificationError> {
    let Some(ms1) = experiment.ms1() else {
        return Ok((Vec::new(), 0.0));
    };
    let clusters = isotope::extract_patterns(ms1, profile.standard_ms1_deviation());
    let patterns = isotope::score_patterns(&clusters, ion_type, profile.formula_constraints(), profile.allowed_mass_deviation());
    Ok(isotope::filter_best_pattern(&patterns))
}

fn derive_ion_mass(experiment: &Ms2Experiment, ion_type: &PrecursorIonType, profile: &MeasurementProfile) -> Result<f64, IdentificationError> {
    let Some(ms1) = experiment.ms1() else {
        return Err(IdentificationError::invalid_input(
            "Please provide the parentmass",
            "no precursor m/z was given and the experiment carries no MS1 spectrum to derive it from",
        )
        .with_context(Context::field("ionMass")));
    };
    let clusters = isotope::extract_patterns(ms1, profile.standard_ms1_deviation());
    let patterns = isotope::score_patterns(&clusters, ion_type, profile.formula_constraints(), profile.allowed_mass_deviation());
    if isotope::is_ambiguous(&patterns) {
        return Err(IdentificationError::invalid_input(
            "Please provide the parentmass",
            "more than one MS1 isotope pattern scored positively; the precursor mass is ambiguous",
        )
        .with_context(Context::field("ionMass")));
    }
    let Some(best) = patterns.iter().max_by(|a, b| a.best_score.total_cmp(&b.best_score)) else {
        return Err(IdentificationError::invalid_input(
            "Please provide the parentmass",
            "no MS1 isotope pattern could be resolved to a precursor mass",
        )
        .with_context(Context::field("ionMass")));
    };
    Ok(ion_type.neutral_to_ion_mass(&best.candidates.first().map_or(MolecularFormula::empty(), |c| c.formula.clone())).value)
}

/// Run the full identification procedure for one experiment under a single known (or assumed
/// protonated) ion type.
///
/// `k` bounds the number of returned candidates; `recalibrating` triggers a second,
/// mass-corrected tree computation pass; `isotope_mode` controls how MS1 information is used;
/// `white_list`, when non-empty, restricts candidates to the given neutral formulas.
pub fn identify(
    experiment: &Ms2Experiment,
    k: usize,
    recalibrating: bool,
    isotope_mode: IsotopeMode,
    white_list: Option<&[MolecularFormula]>,
    base_profile: &MeasurementProfile,
) -> Result<Vec<IdentificationResult>, IdentificationError> {
    let profile = active_profile(experiment, base_profile).clone();
    let ion_type = experiment
        .ion_type()
        .cloned()
        .unwrap_or_else(PrecursorIonType::protonated);

    let mut experiment = experiment.clone();
    if experiment.needs_precursor_mass() {
        let derived = derive_ion_mass(&experiment, &ion_type, &profile)?;
        experiment = experiment
            .with_ion_mass(crate::system::MassOverCharge::new::<crate::system::mz>(derived))
            .with_ion_type(ion_type.clone());
    }

    let (iso_formulas, best_iso_score) = resolve_isotope_candidates(&experiment, &ion_type, &profile)?;

    let parent_decompositions = || -> Vec<MolecularFormula> {
        let neutral_mass = ion_type.ion_to_neutral_mass(da(experiment.ion_mass().value));
        decomposer::decompose(neutral_mass, profile.formula_constraints(), profile.allowed_mass_deviation())
    };

    let mut candidates: Vec<MolecularFormula> = match isotope_mode {
        IsotopeMode::Omit => parent_decompositions(),
        IsotopeMode::Filter => {
            if iso_formulas.is_empty() {
                parent_decompositions()
            } else {
                iso_formulas.iter().map(|c| c.formula.clone()).collect()
            }
        }
        // Only restrict to the isotope-filtered set once the best pattern's evidence is strong
        // (`bestScore > 10`); a weak pattern still gets an isotope score added below, but must
        // not narrow the candidate pool on its own.
        IsotopeMode::Score => {
            if !iso_formulas.is_empty() && best_iso_score > 10.0 {
                iso_formulas.iter().map(|c| c.formula.clone()).collect()
            } else {
                parent_decompositions()
            }
        }
    };

    if let Some(white_list) = white_list {
        candidates.retain(|f| white_list.contains(f));
    }

    let max_candidates = if !iso_formulas.is_empty() && best_iso_score > 10.0 {
        iso_formulas.len()
    } else {
        candidates.len()
    };
    let output_size = max_candidates.min(k);
    let compute_n = MIN_COMPUTE_CANDIDATES.max(output_size).min(candidates.len().max(1));
    candidates.truncate(compute_n);

    let iso_scores_for_scoring = matches!(isotope_mode, IsotopeMode::Score).then_some(iso_formulas.as_slice());
    let mut computations = adaptive_loop(&experiment, &candidates, &ion_type, &profile, iso_scores_for_scoring)?;

    if recalibrating {
        for computation in &mut computations {
            recalibrate_computation(&experiment, computation, &ion_type, &profile, iso_scores_for_scoring)?;
        }
    }

    let ranked = rank_and_truncate(computations, output_size.max(1).min(k.max(1)), &ion_type);
    log::info!(
        "identify({}): ranked {} formula(s), top = {}",
        experiment.name(),
        ranked.len(),
        ranked.first().map_or_else(|| "none".to_string(), |r| r.formula.hill_notation())
    );
    Ok(ranked)
}

/// As [`identify`], but searches over every ion mode consistent with the experiment's declared
/// charge, collecting all candidate trees into one bounded best-set keyed by overall score
/// across ion modes. Accepts no `white_list`.
pub fn identify_precursor_and_ionization(
    experiment: &Ms2Experiment,
    k: usize,
    recalibrating: bool,
    isotope_mode: IsotopeMode,
    base_profile: &MeasurementProfile,
) -> Result<Vec<IdentificationResult>, IdentificationError> {
    let charge_sign = experiment.ion_type().map_or(1, |t| t.ionization().charge().signum());
    let ion_modes = known_ion_modes(charge_sign);

    let mut all_results = Vec::new();
    for ion_type in ion_modes {
        let mut per_mode_experiment = experiment.clone();
        per_mode_experiment = per_mode_experiment.with_ion_type(ion_type);
        let results = identify(&per_mode_experiment, k, recalibrating, isotope_mode, None, base_profile)?;
        all_results.extend(results);
    }

    all_results.sort_by_key(|r| {
        (
            std::cmp::Reverse(crate::system::OrderedScore::new(r.overall_score)),
            r.formula.hill_notation(),
        )
    });
    for (i, result) in all_results.iter_mut().take(k).enumerate() {
        result.rank = i + 1;
    }
    all_results.truncate(k);
    Ok(all_results)
}

fn known_ion_modes(charge_sign: i8) -> Vec<PrecursorIonType> {
    if charge_sign < 0 {
        vec![
            PrecursorIonType::deprotonated(),
            PrecursorIonType::from_ionization(Ionization::radical(-1)),
        ]
    } else {
        vec![
            PrecursorIonType::protonated(),
            PrecursorIonType::from_ionization(Ionization::sodiated()),
            PrecursorIonType::from_ionization(Ionization::radical(1)),
        ]
    }
}

/// Compute the single optimal tree for a known `formula`, with the same adaptive tree-size loop
/// as [`identify`]. Returns a result with `tree = None` when infeasible.
pub fn compute(
    experiment: &Ms2Experiment,
    formula: &MolecularFormula,
    recalibrating: bool,
    base_profile: &MeasurementProfile,
) -> Result<IdentificationResult, IdentificationError> {
    let profile = active_profile(experiment, base_profile).clone();
    let ion_type = experiment.ion_type().cloned().unwrap_or_else(PrecursorIonType::protonated);
    let candidates = [formula.clone()];

    let mut computations = adaptive_loop(experiment, &candidates, &ion_type, &profile, None)?;
    let mut computation = computations.pop().unwrap_or(CandidateComputation {
        formula: formula.clone(),
        tree: None,
        overall_score: f64::NEG_INFINITY,
    });

    if recalibrating {
        recalibrate_computation(experiment, &mut computation, &ion_type, &profile, None)?;
    }

    Ok(IdentificationResult {
        rank: 1,
        formula: computation.formula,
        ionization: ion_type,
        tree: computation.tree,
        overall_score: computation.overall_score,
    })
}

/// Propose alphabet and per-element bounds from the experiment's observed masses. A conservative
/// heuristic: the default CHNOPS alphabet, bounded above by
/// the element count a formula matching the precursor mass alone (all-carbon) could contain.
pub fn predict_elements(experiment: &Ms2Experiment) -> FormulaConstraints {
    let ion_mass = experiment.ion_mass().value;
    let carbon_mass = crate::element::Element::C.monoisotopic_mass().value;
    let max_atoms = if carbon_mass > 0.0 {
        ((ion_mass / carbon_mass).ceil() as u32).max(1)
    } else {
        20
    };
    FormulaConstraints::chnops(max_atoms.min(100))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;
    use crate::spectrum::Spectrum;
    use crate::system::mz;

    fn glucose() -> MolecularFormula {
        MolecularFormula::new([(Element::C, 6), (Element::H, 12), (Element::O, 6)])
    }

    fn glucose_experiment() -> Ms2Experiment {
        let ms2 = Spectrum::wrap(&[181.0707, 163.0601, 85.0284], &[1.0, 0.6, 0.4]);
        Ms2Experiment::new("glucose", vec![ms2], crate::system::MassOverCharge::new::<mz>(181.0707))
            .with_ion_type(PrecursorIonType::protonated())
    }

    #[test]
    fn identify_ranks_glucose_first() {
        let experiment = glucose_experiment();
        let profile = MeasurementProfile::qtof();
        let results = identify(&experiment, 5, false, IsotopeMode::Omit, None, &profile).unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].rank, 1);
        assert_eq!(results[0].formula, glucose());
    }

    #[test]
    fn k_equals_one_returns_one_result() {
        let experiment = glucose_experiment();
        let profile = MeasurementProfile::qtof();
        let results = identify(&experiment, 1, false, IsotopeMode::Omit, None, &profile).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn ranks_are_contiguous_and_non_increasing() {
        let experiment = glucose_experiment();
        let profile = MeasurementProfile::qtof();
        let results = identify(&experiment, 5, false, IsotopeMode::Omit, None, &profile).unwrap();
        for (i, r) in results.iter().enumerate() {
            assert_eq!(r.rank, i + 1);
        }
        for pair in results.windows(2) {
            assert!(pair[0].overall_score >= pair[1].overall_score);
        }
    }

    #[test]
    fn whitelist_restricts_candidates() {
        let experiment = glucose_experiment();
        let profile = MeasurementProfile::qtof();
        let other = MolecularFormula::new([(Element::C, 7), (Element::H, 14), (Element::O, 6)]);
        let white_list = vec![glucose(), other];
        let results = identify(&experiment, 5, false, IsotopeMode::Omit, Some(&white_list), &profile).unwrap();
        for result in &results {
            assert!(white_list.contains(&result.formula));
        }
    }

    #[test]
    fn compute_returns_the_requested_root_formula() {
        let experiment = glucose_experiment();
        let profile = MeasurementProfile::qtof();
        let result = compute(&experiment, &glucose(), false, &profile).unwrap();
        if let Some(tree) = &result.tree {
            assert_eq!(tree.root().formula, glucose());
        }
    }

    #[test]
    fn recalibrating_tightens_mass_deviation_and_raises_the_score() {
        const OFFSET: f64 = 0.0008;
        let ms2 = Spectrum::wrap(
            &[181.0707 + OFFSET, 163.0601 + OFFSET, 85.0284 + OFFSET],
            &[1.0, 0.6, 0.4],
        );
        let experiment = Ms2Experiment::new("glucose_offset", vec![ms2], crate::system::MassOverCharge::new::<mz>(181.0707 + OFFSET))
            .with_ion_type(PrecursorIonType::protonated());
        let params = crate::profile::MedianSlopeRecalibration {
            min_peaks: 2,
            ..crate::profile::MedianSlopeRecalibration::default()
        };
        let profile = MeasurementProfile::qtof().with_median_slope_recalibration(params);

        let uncorrected = identify(&experiment, 1, false, IsotopeMode::Omit, None, &profile).unwrap();
        let recalibrated = identify(&experiment, 1, true, IsotopeMode::Omit, None, &profile).unwrap();

        assert_eq!(uncorrected[0].formula, glucose());
        assert_eq!(recalibrated[0].formula, glucose());
        let tree = recalibrated[0].tree.as_ref().expect("glucose should have a feasible tree");
        assert!(tree.verify().is_ok());
        assert!(recalibrated[0].overall_score > uncorrected[0].overall_score);
    }

    #[test]
    fn missing_precursor_mass_without_ms1_is_invalid_input() {
        let ms2 = Spectrum::wrap(&[181.0707], &[1.0]);
        let experiment = Ms2Experiment::new("x", vec![ms2], crate::system::MassOverCharge::new::<mz>(0.0));
        let profile = MeasurementProfile::qtof();
        let err = identify(&experiment, 5, false, IsotopeMode::Omit, None, &profile).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
