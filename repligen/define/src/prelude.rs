//! Convenient re-exports for host integrations.
//!
//! ```
//! use repligen_define::prelude::*;
//!
//! let class = ClassMetadata::new("/Game/BP_Ghost.BP_Ghost_C", "BP_Ghost_C", ClassKind::Actor);
//! assert!(class.rpcs.is_empty());
//! ```

pub use crate::class::{ClassId, ClassKind, ClassMetadata};
pub use crate::property::{PropertyAccess, PropertyMetadata, PropertyType, StructMetadata};
pub use crate::provider::{ClassCatalog, ClassMetadataProvider};
pub use crate::rpc::{ParamMetadata, RpcKind, RpcMetadata};
