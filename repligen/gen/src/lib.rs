//! Replicator code generator library.
//!
//! This crate turns reflective class metadata (see `repligen-define`) into the
//! glue a channel-based replication runtime needs:
//!
//! - A replicator per class (C++ header and source) that diffs replicated
//!   properties into a state message and applies incoming state
//! - A schema per class with one state message and one message per remote call
//! - A channel-data processor and schema aggregating every class's state
//! - Shared type definitions, global struct helpers and a registration header
//!
//! ## Modules
//!
//! - [`resolver`] - Locates the header declaring each class
//! - [`decorator`] - Normalizes a class into a [`ClassDescriptor`](decorator::ClassDescriptor)
//! - [`codegen`] - Emits artifacts from descriptors
//! - [`manager`] - Runs generation and manages the storage directory
//! - [`manifest`] / [`registry`] - Records of the last run
//! - [`config`] - TOML configuration
//! - [`errors`] - Error types for the generator
//!
//! ## Example Usage
//!
//! ```no_run
//! use std::path::Path;
//! use repligen_define::{ClassCatalog, ClassId};
//! use repligen_gen::config::GeneratorConfig;
//! use repligen_gen::manager::GenerationManager;
//!
//! let config = GeneratorConfig::from_file(Path::new("repligen.toml")).unwrap();
//! let catalog: ClassCatalog = serde_json::from_str(&std::fs::read_to_string("classes.json").unwrap()).unwrap();
//! let mut manager = GenerationManager::new(config, catalog);
//!
//! manager.start_generation(true).unwrap();
//! let report = manager.generate_all(&[ClassId::from("/Script/Game.Door")], None).unwrap();
//! manager.stop_generation();
//! println!("generated {} classes", report.generated.len());
//! ```
//!
//! ## Storage Layout
//!
//! For a module `Game` with one class `Door`:
//!
//! ```text
//! Game/ChanneldGenerated/
//!   ChanneldDoorReplicator.h          ChanneldDoorReplicator.cpp
//!   Door.proto
//!   ChannelData_Game.h                ChannelData_Game.proto
//!   ChanneldGlobalStruct.h            ChanneldGlobalStruct.proto
//!   ChanneldReplicatorTypeDefinitions.h / .cpp
//!   ChanneldReplicatorRegistration.h
//!   ChanneldGeneratedClasses.json
//! Intermediate/ReplicatorGenerator/GeneratedManifest.json
//! ```

pub mod codegen;
pub mod config;
pub mod decorator;
pub mod errors;
pub mod layout;
pub mod manager;
pub mod manifest;
pub mod naming;
pub mod output;
pub mod registry;
pub mod resolver;

#[cfg(test)]
mod test_utils;
