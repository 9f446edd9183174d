//! Error types for surveyor.
//!
//! The error taxonomy separates conditions that abort a run from per-symbol
//! outcomes that merely skip or reclassify one symbol:
//! - **Fatal** (everything in [`SurveyorError`]): malformed input files,
//!   mapping conflicts, unresolvable ancestors, missing constructor records.
//!   A fatal error propagates out of the generator and nothing is persisted.
//! - **Recoverable** conditions (a matched symbol whose predecessor mapping is
//!   gone, an obfuscated name that is not a legal identifier) are not errors
//!   at all; the generator logs them and moves on.

use std::io;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SurveyorError>;

/// Unified error type for the generation pipeline.
///
/// Every variant is fatal: once one is raised the run aborts and no output
/// file is written, since a partially written ledger or mapping tree could
/// hand out duplicate names on the next run.
#[derive(Debug, Error)]
pub enum SurveyorError {
    /// Malformed ledger, match, or side-table input.
    #[error("{path}:{line}: {message}")]
    Format {
        path: String,
        line: usize,
        message: String,
    },

    /// The same obfuscated identity was registered twice with different
    /// target names.
    #[error("mapping conflict for {identity}: already '{existing}', now '{proposed}'")]
    MappingConflict {
        identity: String,
        existing: String,
        proposed: String,
    },

    /// A superclass or interface could not be resolved in the artifact, the
    /// library index, or the platform manifest. Override suppression cannot
    /// be decided without the complete ancestor set.
    #[error("unable to resolve ancestor {class} (required while processing {dependent})")]
    MissingAncestor { class: String, dependent: String },

    /// A matched constructor has no record in the previous side table.
    #[error("no constructor record for {owner}{desc} in the previous side table")]
    MissingConstructor { owner: String, desc: String },

    /// Bug or impossible state (e.g. a member whose owner class was never
    /// registered during the class phase).
    #[error("internal error: {0}")]
    Internal(String),

    /// I/O failure reading or writing one of the on-disk files.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// JSON (de)serialization failure for a side file or serialized index.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SurveyorError {
    /// Create a format error for a line of an input file.
    pub fn format(path: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        SurveyorError::Format {
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        SurveyorError::Internal(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_error_display_includes_path_and_line() {
        let err = SurveyorError::format("history.txt", 7, "unknown record kind");
        assert_eq!(err.to_string(), "history.txt:7: unknown record kind");
    }

    #[test]
    fn mapping_conflict_display_names_both_sides() {
        let err = SurveyorError::MappingConflict {
            identity: "a.b()V".to_string(),
            existing: "method_1".to_string(),
            proposed: "method_2".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("method_1"));
        assert!(msg.contains("method_2"));
    }

    #[test]
    fn io_error_converts() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "gone");
        let err = SurveyorError::from(io_err);
        assert!(matches!(err, SurveyorError::Io(_)));
    }
}
