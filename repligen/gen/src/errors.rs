//! Error types for the replicator generator.

use std::path::PathBuf;

use repligen_define::ClassId;
use thiserror::Error;

/// Errors that end an operation of the generator.
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// The host module manifest could not be read
    #[error("Failed to read module manifest '{path}': {source}")]
    ModuleManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The host module manifest is not valid JSON of the expected shape
    #[error("Module manifest is malformed '{path}': {source}")]
    ModuleManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The generated manifest could not be read
    #[error("Unable to load GeneratedManifest: {}", path.display())]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The generated manifest is not a JSON object
    #[error("GeneratedManifest is malformed: {}", path.display())]
    ManifestMalformed { path: PathBuf },

    /// The directory meant to hold the generated manifest does not exist
    #[error("Unable to find the directory of GeneratedManifest: {}", path.display())]
    ManifestDirNotFound { path: PathBuf },

    /// Failed to write output file
    #[error("Failed to write output file '{path}': {source}")]
    WriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to list or delete files in the storage directory
    #[error("Storage directory operation failed on '{path}': {source}")]
    StorageError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize a record written by the generator
    #[error("Failed to serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A generation step received no target classes
    #[error("No target classes to generate {0} for")]
    EmptyTargets(&'static str),

    /// The class catalog could not be loaded
    #[error("Failed to load class catalog: {0}")]
    CatalogError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// A generated class name that cannot name files in the storage directory
    #[error("Invalid generated class name '{0}'")]
    InvalidGeneratedName(String),
}

/// Reasons a single class is left out of a generation run.
///
/// These never abort a batch; the run reports them next to the classes that
/// were generated.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecorateError {
    /// The provider has no metadata for the class
    #[error("No metadata available for class '{0}'")]
    MetadataUnavailable(ClassId),

    /// No module header declares the class
    #[error("Can not find the header file of class '{class}' (looked up as '{lookup}')")]
    HeaderNotFound { class: String, lookup: String },

    /// The class is on the ignore list
    #[error("Class '{class}' is ignored ({path})")]
    Ignored { class: String, path: String },

    /// A struct used by the class maps to a schema message that another
    /// generated message already names
    #[error("Struct message '{message}' used by class '{class}' clashes with a generated message")]
    SchemaNameClash { class: String, message: String },
}
