//! Mod runtime error taxonomy
//!
//! Metadata and instantiation errors are fatal only to the mod that raised
//! them. Dependency errors are fatal to the whole resolution stage, since no
//! safe load order exists. Phase errors remove the offending mod and its
//! hard-dependent closure. The pipeline is the single place that decides
//! fatal-vs-contained.

use thiserror::Error;

use crate::mods::manifest::json5::Json5Error;
use crate::mods::phases::Phase;

/// Manifest lookup or parse failure for a single package.
#[derive(Debug, Error)]
pub enum MetadataParseError {
    #[error("mod directory {path} has no catan.mod.json5 at its root")]
    MissingDirManifest { path: String },

    #[error("mod archive {path} has no catan.mod.json5 (checked the archive root and META-INF/catan/)")]
    MissingArchiveManifest { path: String },

    #[error("failed to read manifest in {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open mod archive {path}: {message}")]
    Archive { path: String, message: String },

    #[error("manifest syntax error in {path}: {source}")]
    Syntax {
        path: String,
        #[source]
        source: Json5Error,
    },

    #[error("manifest in {path} has an invalid shape: {message}")]
    Shape { path: String, message: String },

    #[error("manifest in {path} is missing required field `{field}`")]
    MissingField { path: String, field: &'static str },

    #[error("manifest in {path} has an invalid `{field}`: {message}")]
    InvalidField {
        path: String,
        field: &'static str,
        message: String,
    },

    #[error("manifest in {path} declares a dependency with a missing or blank id")]
    BlankDependencyId { path: String },
}

/// Dependency graph validation or linearization failure.
///
/// Any of these aborts the run: a partial load order is never produced.
#[derive(Debug, Error)]
pub enum DependencyError {
    #[error("mod `{dependent}` is missing required dependency `{dependency}`")]
    Missing {
        dependent: String,
        dependency: String,
    },

    #[error("mod `{dependent}` requires `{dependency}` {required} but found v{found}")]
    VersionMismatch {
        dependent: String,
        dependency: String,
        required: String,
        found: String,
    },

    #[error("mod `{id}` declares a dependency on itself")]
    SelfDependency { id: String },

    #[error("cyclic dependency detected among mods: {}", participants.join(", "))]
    Cycle { participants: Vec<String> },
}

/// Per-mod failure while building an isolation context or constructing the
/// entry-point instance.
#[derive(Debug, Error)]
pub enum InstantiationError {
    #[error("failed to prepare isolation context for mod `{id}`: {message}")]
    Context { id: String, message: String },

    #[error("failed to load native library {path} for mod `{id}`: {message}")]
    LibraryLoad {
        id: String,
        path: String,
        message: String,
    },

    #[error("native library for mod `{id}` does not export `catan_mod_entry`")]
    MissingEntrySymbol { id: String },

    #[error("mod `{id}` was built against mod ABI v{found}, host expects v{expected}")]
    AbiMismatch { id: String, expected: u32, found: u32 },

    #[error("entrypoint `{entrypoint}` declared by mod `{id}` was not found in its isolation context")]
    EntrypointNotFound { id: String, entrypoint: String },

    #[error("entrypoint constructor for mod `{id}` panicked: {message}")]
    ConstructorPanic { id: String, message: String },

    #[error("skipped mod `{id}`: required dependency `{dependency}` failed to load")]
    DependencyFailed { id: String, dependency: String },
}

/// A mod's failure during one activation phase.
#[derive(Debug, Error)]
#[error("mod `{mod_id}` failed during {phase}: {source}")]
pub struct PhaseError {
    pub mod_id: String,
    pub phase: Phase,
    #[source]
    pub source: anyhow::Error,
}

/// Run-level error returned by the pipeline.
#[derive(Debug, Error)]
pub enum ModError {
    #[error("dependency resolution failed: {0}")]
    Dependency(#[from] DependencyError),

    #[error(transparent)]
    Metadata(#[from] MetadataParseError),

    #[error(transparent)]
    Instantiation(#[from] InstantiationError),

    #[error(transparent)]
    Phase(#[from] PhaseError),

    #[error("mod discovery failed: {0}")]
    Discovery(#[from] std::io::Error),
}
