//! Error types for protocol-level parsing.

use thiserror::Error;

/// Errors produced while interpreting mode strings.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ModeParseError {
    /// A mode notification carried a non-zero number of arguments that does
    /// not line up with the number of mode letters.
    #[error("mode letters {modes:?} do not pair with {args} argument(s)")]
    ArgumentMismatch {
        /// The mode letters as received.
        modes: String,
        /// How many arguments arrived with them.
        args: usize,
    },

    /// A mode that requires a parameter had none left to consume.
    #[error("mode '{0}' requires an argument but none provided")]
    MissingArgument(char),

    /// Parameters were left over after every mode letter was consumed.
    #[error("{0} unused mode argument(s)")]
    UnusedArguments(usize),
}
