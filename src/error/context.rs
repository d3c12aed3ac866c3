use serde::{Deserialize, Serialize};
use std::fmt;

/// The context of an error message: where in the offending input it occurred.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum Context {
    /// When no context can be given
    None,
    /// A named field on a request or record, e.g. an experiment id or profile key
    Field {
        /// The name of the field
        name: String,
    },
    /// A single line of input text with a span highlighted
    Line {
        /// The full line of text
        line: String,
        /// Byte offset of the highlighted span
        offset: usize,
        /// Length of the highlighted span
        length: usize,
    },
}

impl Context {
    /// Creates a context with no further information
    pub const fn none() -> Self {
        Self::None
    }

    /// Creates a context pointing at a named field
    pub fn field(name: impl std::string::ToString) -> Self {
        Self::Field {
            name: name.to_string(),
        }
    }

    /// Creates a context highlighting a span within a line of text
    pub fn line(line: impl std::string::ToString, offset: usize, length: usize) -> Self {
        Self::Line {
            line: line.to_string(),
            offset,
            length,
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => Ok(()),
            Self::Field { name } => write!(f, " (field `{name}`)"),
            Self::Line {
                line,
                offset,
                length,
            } => {
                let length = (*length).max(1);
                write!(
                    f,
                    "\n  | {line}\n  | {}{}",
                    " ".repeat(*offset),
                    "^".repeat(length)
                )
            }
        }
    }
}
