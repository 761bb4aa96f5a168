//! Repligen Definition Library
//!
//! This crate provides host-neutral types describing the classes a replicator
//! generator works on. A host integration (an engine editor plugin, an offline
//! reflection dump, a test fixture) fills these in and hands them to the
//! `repligen-gen` crate through the [`ClassMetadataProvider`] trait.
//!
//! ## Core Types
//!
//! - [`ClassId`] - Opaque identity of one class object in the host
//! - [`ClassMetadata`] - Name, module, kind, replicated properties and remote calls of a class
//! - [`ClassKind`] - Actor, actor component or game state
//! - [`PropertyMetadata`] - One declared property and whether it replicates
//! - [`PropertyType`] - Type descriptor of a property or remote-call parameter
//! - [`StructMetadata`] - Field layout of a struct-typed property
//! - [`RpcMetadata`] - A remote call and its ordered parameters
//! - [`ClassMetadataProvider`] - Lookup seam between the host and the generator
//! - [`ClassCatalog`] - In-memory provider, loadable from JSON
//!
//! ## Examples
//!
//! ```
//! use repligen_define::{ClassCatalog, ClassId, ClassKind, ClassMetadata, ClassMetadataProvider};
//! use repligen_define::{PropertyMetadata, PropertyType};
//!
//! let pawn = ClassMetadata::new("/Script/Engine.Pawn", "Pawn", ClassKind::Actor)
//!     .with_module("Engine")
//!     .with_property(PropertyMetadata::replicated("Health", PropertyType::Float));
//!
//! let catalog = ClassCatalog::new(vec![pawn]).unwrap();
//! let found = catalog.class_metadata(&ClassId::from("/Script/Engine.Pawn")).unwrap();
//!
//! assert_eq!(found.cpp_name(), "APawn");
//! assert_eq!(found.properties.len(), 1);
//! ```

pub mod class;
pub mod prelude;
pub mod property;
pub mod provider;
pub mod rpc;

pub use class::{ClassId, ClassKind, ClassMetadata};
pub use property::{PropertyAccess, PropertyMetadata, PropertyType, StructMetadata};
pub use provider::{CatalogError, ClassCatalog, ClassMetadataProvider};
pub use rpc::{ParamMetadata, RpcKind, RpcMetadata};
