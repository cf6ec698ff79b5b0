//! Error types.
//!
//! `LoadError` covers bad schema entries. The loader logs these and skips
//! the offending extractor. `RegistryError` covers programming mistakes
//! in how registries are driven and propagates to the caller, except for a
//! name clash during loading, which the loader reports as a `LoadError`.

use thiserror::Error;

use crate::registry::ExtractionStage;

/// A schema entry could not be turned into an extractor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("'{extractor_type}' is not a valid {kind} type")]
    UnknownExtractorType {
        kind: &'static str,
        extractor_type: String,
    },

    #[error("'{name}' is missing required schema field '{field}'")]
    MissingSchemaField { name: String, field: String },

    #[error("'{name}' has an invalid value for schema field '{field}': {reason}")]
    InvalidSchemaField {
        name: String,
        field: String,
        reason: String,
    },

    #[error("no mapping table named '{0}' was supplied to the loader")]
    UnknownMapping(String),

    #[error("no count filter named '{0}' was supplied to the loader")]
    UnknownCountFilter(String),

    #[error("another schema entry already produced an extractor named '{0}'")]
    DuplicateName(String),
}

/// A registry was driven in a way that breaks its contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("{registry} was given {found} '{name}', expected a {expected}")]
    TypeMismatch {
        registry: &'static str,
        expected: &'static str,
        found: &'static str,
        name: String,
    },

    #[error("an extractor named '{0}' is already registered")]
    DuplicateExtractor(String),

    #[error("cannot {operation} while registry is in stage {stage:?}")]
    StageViolation {
        operation: &'static str,
        stage: ExtractionStage,
    },
}

pub type Result<T, E = RegistryError> = std::result::Result<T, E>;
