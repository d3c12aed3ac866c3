use super::Context;
use serde::{Deserialize, Serialize};
use std::{error, fmt};

/// The taxonomy of failures the identification pipeline can produce.
///
/// `InfeasibleDecomposition` and `SolverInfeasible` are deliberately *not* constructed as
/// `Err` anywhere in this crate: an empty decomposition or an empty feasible-subtree search is
/// a normal, expected outcome, represented as an empty `Vec` / `None` respectively.
/// The variants exist here so that code which does surface them wrapped in an error (e.g. a
/// caller-facing summary) can still report which taxonomy bucket a message belongs to.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing precursor mass, malformed formula, unknown element symbol, unsupported multiple
    /// charge, empty MS2 when required.
    InvalidInput,
    /// More than one positive-scoring MS1 candidate and no user-specified precursor mass.
    AmbiguousIsotopePattern,
    /// No candidate formulas survived decomposition under the active constraints.
    InfeasibleDecomposition,
    /// The per-tree solver time budget was exceeded; the best feasible tree found is retained.
    SolverTimeout,
    /// The solver found no feasible colorful subtree at all.
    SolverInfeasible,
    /// A score-verification mismatch or other invariant violation: a bug, not a user error.
    Internal,
}

impl ErrorKind {
    /// A short machine-stable name for this kind, used in log output.
    pub const fn name(self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::AmbiguousIsotopePattern => "ambiguous_isotope_pattern",
            Self::InfeasibleDecomposition => "infeasible_decomposition",
            Self::SolverTimeout => "solver_timeout",
            Self::SolverInfeasible => "solver_infeasible",
            Self::Internal => "internal",
        }
    }
}

/// An error produced by any stage of the identification pipeline.
#[derive(Serialize, Deserialize, PartialEq, Clone, Eq)]
pub struct IdentificationError {
    kind: ErrorKind,
    short_description: String,
    long_description: String,
    context: Context,
}

impl IdentificationError {
    /// Create a new error of the given kind.
    pub fn new(
        kind: ErrorKind,
        short_desc: impl std::string::ToString,
        long_desc: impl std::string::ToString,
        context: Context,
    ) -> Self {
        Self {
            kind,
            short_description: short_desc.to_string(),
            long_description: long_desc.to_string(),
            context,
        }
    }

    /// Shorthand for an `InvalidInput` error with no further context.
    pub fn invalid_input(
        short_desc: impl std::string::ToString,
        long_desc: impl std::string::ToString,
    ) -> Self {
        Self::new(ErrorKind::InvalidInput, short_desc, long_desc, Context::none())
    }

    /// Shorthand for an `Internal` error, used when an invariant check fails.
    pub fn internal(message: impl std::string::ToString) -> Self {
        Self::new(
            ErrorKind::Internal,
            "internal invariant violation",
            message,
            Context::none(),
        )
    }

    /// Attach field context to this error.
    #[must_use]
    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    /// The taxonomy bucket this error falls into.
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The short, title-line description.
    pub fn short_description(&self) -> &str {
        &self.short_description
    }
}

impl fmt::Debug for IdentificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}{}\n{}",
            self.kind.name(),
            self.short_description,
            self.context,
            self.long_description
        )
    }
}

impl fmt::Display for IdentificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl error::Error for IdentificationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_invalid_input() {
        let e = IdentificationError::invalid_input(
            "missing parentmass",
            "ionMass was 0 and no MS1 spectrum was supplied",
        );
        assert_eq!(e.kind(), ErrorKind::InvalidInput);
        assert!(format!("{e}").contains("missing parentmass"));
    }

    #[test]
    fn context_is_rendered() {
        let e = IdentificationError::invalid_input("bad formula", "unknown element")
            .with_context(Context::field("formula"));
        assert!(format!("{e}").contains("field `formula`"));
    }
}
