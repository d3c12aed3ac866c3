//! Minimal project-workspace persistence: profile snapshots, per-experiment result trees, and
//! summary tables. Deliberately thin — this crate treats the full workspace/project format as
//! an external collaborator and implements only enough to round-trip the identification
//! pipeline's own output.
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Context, ErrorKind, IdentificationError};
use crate::pipeline::IdentificationResult;
use crate::profile::MeasurementProfile;

fn io_error(action: &str, path: &Path, source: std::io::Error) -> IdentificationError {
    IdentificationError::new(
        ErrorKind::Internal,
        format!("failed to {action}"),
        source.to_string(),
        Context::field(path.display().to_string()),
    )
}

fn csv_error(action: &str, path: &Path, source: csv::Error) -> IdentificationError {
    IdentificationError::new(
        ErrorKind::Internal,
        format!("failed to {action}"),
        source.to_string(),
        Context::field(path.display().to_string()),
    )
}

/// A directory laid out as `profiles/<name>/`, `ms/*.ms`, `scores/*.csv`,
/// `<experiment-id>/trees/*.json|dot`, `<experiment-id>/summary.csv`.
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Open (without creating) a workspace rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the standard top-level directories if they do not already exist.
    pub fn initialize(&self) -> Result<(), IdentificationError> {
        for dir in ["profiles", "ms", "scores"] {
            let path = self.root.join(dir);
            fs::create_dir_all(&path).map_err(|e| io_error("create workspace directory", &path, e))?;
        }
        Ok(())
    }

    /// Persist `profile` as a TOML snapshot under `profiles/<profile.name()>/profile.toml`.
    pub fn save_profile(&self, profile: &MeasurementProfile) -> Result<(), IdentificationError> {
        let dir = self.root.join("profiles").join(profile.name());
        fs::create_dir_all(&dir).map_err(|e| io_error("create profile directory", &dir, e))?;
        let path = dir.join("profile.toml");
        let contents = toml::to_string_pretty(profile)
            .map_err(|e| IdentificationError::new(ErrorKind::Internal, "failed to serialize profile", e.to_string(), Context::none()))?;
        fs::write(&path, contents).map_err(|e| io_error("write profile", &path, e))
    }

    /// Load a profile snapshot previously written by [`Workspace::save_profile`].
    pub fn load_profile(&self, name: &str) -> Result<MeasurementProfile, IdentificationError> {
        let path = self.root.join("profiles").join(name).join("profile.toml");
        let contents = fs::read_to_string(&path).map_err(|e| io_error("read profile", &path, e))?;
        toml::from_str(&contents)
            .map_err(|e| IdentificationError::new(ErrorKind::Internal, "failed to parse profile", e.to_string(), Context::field(name)))
    }

    /// Write one result's fragmentation tree as JSON to
    /// `<experiment_id>/trees/<rank>_<formula>.json`. A companion `.dot` file with the same stem
    /// holds a Graphviz rendering for visual inspection.
    pub fn save_tree(&self, experiment_id: &str, result: &IdentificationResult) -> Result<(), IdentificationError> {
        let Some(tree) = &result.tree else {
            return Ok(());
        };
        let dir = self.root.join(experiment_id).join("trees");
        fs::create_dir_all(&dir).map_err(|e| io_error("create trees directory", &dir, e))?;
        let stem = format!("{}_{}", result.rank, result.formula.hill_notation());

        let json = serde_json::to_string_pretty(&serializable_tree(tree))
            .map_err(|e| IdentificationError::new(ErrorKind::Internal, "failed to serialize tree", e.to_string(), Context::none()))?;
        let json_path = dir.join(format!("{stem}.json"));
        fs::write(&json_path, json).map_err(|e| io_error("write tree json", &json_path, e))?;

        let dot_path = dir.join(format!("{stem}.dot"));
        fs::write(&dot_path, tree_to_dot(tree)).map_err(|e| io_error("write tree dot", &dot_path, e))?;
        Ok(())
    }

    /// Write the ranked summary table for one experiment's results to
    /// `<experiment_id>/summary.csv`.
    pub fn save_summary(&self, experiment_id: &str, results: &[IdentificationResult]) -> Result<(), IdentificationError> {
        let dir = self.root.join(experiment_id);
        fs::create_dir_all(&dir).map_err(|e| io_error("create experiment directory", &dir, e))?;
        let path = dir.join("summary.csv");
        let mut writer = csv::Writer::from_path(&path).map_err(|e| csv_error("open summary csv", &path, e))?;
        writer
            .write_record(["rank", "formula", "ionization", "overall_score", "tree_size", "explained_intensity", "isotope_score"])
            .map_err(|e| csv_error("write summary header", &path, e))?;
        for result in results {
            let (tree_size, explained_intensity) = result
                .tree
                .as_ref()
                .map_or((0, 0.0), |t| (t.number_of_vertices(), t.explained_intensity_ratio(1.0)));
            let isotope_score = result
                .tree
                .as_ref()
                .and_then(|t| t.scoring.additional_scores.get("isotope"))
                .copied()
                .unwrap_or(0.0);
            writer
                .write_record([
                    result.rank.to_string(),
                    result.formula.hill_notation(),
                    result.ionization.to_string(),
                    result.overall_score.to_string(),
                    tree_size.to_string(),
                    explained_intensity.to_string(),
                    isotope_score.to_string(),
                ])
                .map_err(|e| csv_error("write summary row", &path, e))?;
        }
        writer.flush().map_err(|e| io_error("flush summary csv", &path, e))
    }
}

#[derive(serde::Serialize)]
struct SerializableFragment {
    formula: String,
    mz: f64,
    intensity: f64,
}

#[derive(serde::Serialize)]
struct SerializableLoss {
    parent: usize,
    child: usize,
    formula: String,
    weight: f64,
}

#[derive(serde::Serialize)]
struct SerializableTree {
    fragments: Vec<SerializableFragment>,
    losses: Vec<SerializableLoss>,
    overall_score: f64,
}

fn serializable_tree(tree: &crate::solver::FTree) -> SerializableTree {
    SerializableTree {
        fragments: tree
            .fragments
            .iter()
            .map(|f| SerializableFragment {
                formula: f.formula.hill_notation(),
                mz: f.peak.mz().value,
                intensity: f.peak.intensity(),
            })
            .collect(),
        losses: tree
            .losses
            .iter()
            .map(|l| SerializableLoss {
                parent: l.parent,
                child: l.child,
                formula: l.formula.hill_notation(),
                weight: l.weight,
            })
            .collect(),
        overall_score: tree.scoring.overall_score,
    }
}

fn tree_to_dot(tree: &crate::solver::FTree) -> String {
    let mut out = String::from("digraph FTree {\n");
    for (i, fragment) in tree.fragments.iter().enumerate() {
        out.push_str(&format!("  n{i} [label=\"{}\"];\n", fragment.formula.hill_notation()));
    }
    for loss in &tree.losses {
        out.push_str(&format!(
            "  n{} -> n{} [label=\"-{} ({:.2})\"];\n",
            loss.parent,
            loss.child,
            loss.formula.hill_notation(),
            loss.weight
        ));
    }
    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_creates_expected_directories() {
        let dir = std::env::temp_dir().join(format!("molident-workspace-test-{}", std::process::id()));
        let workspace = Workspace::open(&dir);
        workspace.initialize().unwrap();
        assert!(dir.join("profiles").is_dir());
        assert!(dir.join("ms").is_dir());
        assert!(dir.join("scores").is_dir());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn profile_round_trips_through_toml() {
        let dir = std::env::temp_dir().join(format!("molident-workspace-profile-{}", std::process::id()));
        let workspace = Workspace::open(&dir);
        let profile = MeasurementProfile::qtof();
        workspace.save_profile(&profile).unwrap();
        let loaded = workspace.load_profile(profile.name()).unwrap();
        assert_eq!(loaded.parallelism(), profile.parallelism());
        let _ = fs::remove_dir_all(&dir);
    }
}
