//! File names inside the storage directory.
//!
//! Every artifact name is derived from a generated class name (or the module
//! name) plus a fixed extension, so a class's files can be found and removed
//! without reading them.

use std::sync::LazyLock;

use regex::Regex;
use strum::{EnumIter, IntoEnumIterator};

pub const HEADER_EXTENSION: &str = ".h";
pub const SOURCE_EXTENSION: &str = ".cpp";
pub const PROTO_EXTENSION: &str = ".proto";
pub const PROTO_HEADER_EXTENSION: &str = ".pb.h";
pub const PROTO_SOURCE_EXTENSION: &str = ".pb.cc";

pub const TYPE_DEFINITIONS_HEADER: &str = "ChanneldReplicatorTypeDefinitions.h";
pub const TYPE_DEFINITIONS_SOURCE: &str = "ChanneldReplicatorTypeDefinitions.cpp";
pub const REGISTRATION_HEADER: &str = "ChanneldReplicatorRegistration.h";
pub const GLOBAL_STRUCT_HEADER: &str = "ChanneldGlobalStruct.h";
pub const GLOBAL_STRUCT_PROTO: &str = "ChanneldGlobalStruct.proto";

/// Record of the classes generated by the last run, kept with the artifacts.
pub const REGISTRY_FILE: &str = "ChanneldGeneratedClasses.json";
/// Manifest of the last run, kept in the intermediate directory.
pub const MANIFEST_FILE: &str = "GeneratedManifest.json";

/// Default storage directory name under the module directory.
pub const DEFAULT_STORAGE_DIR_NAME: &str = "ChanneldGenerated";
/// Default intermediate directory, relative to the working directory.
pub const DEFAULT_INTERMEDIATE_DIR: &str = "Intermediate/ReplicatorGenerator";

/// Extracts the generated class name from a replicator header file name.
pub static REPLICATOR_HEADER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Channeld(\w+)Replicator\.h$").expect("Invalid replicator header regex")
});

/// The per-class artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum ArtifactKind {
    Head,
    Source,
    Schema,
    SchemaHeader,
    SchemaSource,
}

impl ArtifactKind {
    pub fn extension(self) -> &'static str {
        match self {
            ArtifactKind::Head => HEADER_EXTENSION,
            ArtifactKind::Source => SOURCE_EXTENSION,
            ArtifactKind::Schema => PROTO_EXTENSION,
            ArtifactKind::SchemaHeader => PROTO_HEADER_EXTENSION,
            ArtifactKind::SchemaSource => PROTO_SOURCE_EXTENSION,
        }
    }

    /// File name of this artifact for a generated class.
    ///
    /// ```
    /// use repligen_gen::layout::ArtifactKind;
    ///
    /// assert_eq!(ArtifactKind::Head.file_name("Pawn"), "ChanneldPawnReplicator.h");
    /// assert_eq!(ArtifactKind::SchemaSource.file_name("Pawn"), "Pawn.pb.cc");
    /// ```
    pub fn file_name(self, generated_name: &str) -> String {
        match self {
            ArtifactKind::Head | ArtifactKind::Source => {
                format!("Channeld{generated_name}Replicator{}", self.extension())
            }
            _ => format!("{generated_name}{}", self.extension()),
        }
    }
}

/// Every per-class file name, in [`ArtifactKind`] order.
pub fn artifact_file_names(generated_name: &str) -> Vec<String> {
    ArtifactKind::iter()
        .map(|kind| kind.file_name(generated_name))
        .collect()
}

pub fn channel_data_header_file_name(module: &str) -> String {
    format!("ChannelData_{module}{HEADER_EXTENSION}")
}

pub fn channel_data_proto_file_name(module: &str) -> String {
    format!("ChannelData_{module}{PROTO_EXTENSION}")
}

/// Channel-data processor, schema and compiled schema file names of a module.
pub fn channel_data_file_names(module: &str) -> [String; 4] {
    [
        channel_data_header_file_name(module),
        channel_data_proto_file_name(module),
        format!("ChannelData_{module}{PROTO_HEADER_EXTENSION}"),
        format!("ChannelData_{module}{PROTO_SOURCE_EXTENSION}"),
    ]
}

/// Returns true when `generated_name` can only name files directly inside
/// the storage directory.
pub fn is_valid_generated_name(generated_name: &str) -> bool {
    !generated_name.is_empty()
        && generated_name != ".."
        && !generated_name.contains(['/', '\\'])
}

/// Returns the generated class name if `file_name` is a replicator header.
pub fn generated_name_from_header(file_name: &str) -> Option<&str> {
    REPLICATOR_HEADER_PATTERN
        .captures(file_name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}
