//! Error types with enough context to explain *where* in the input something went wrong, plus
//! a failure taxonomy layered on top as [`ErrorKind`].

mod context;
mod custom_error;

pub use context::Context;
pub use custom_error::{ErrorKind, IdentificationError};

/// The result type used throughout this crate.
pub type Result<T> = std::result::Result<T, IdentificationError>;
