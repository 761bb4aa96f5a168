//! Remote-call descriptors.

use serde::{Deserialize, Serialize};

use crate::property::PropertyType;

/// Direction of a remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RpcKind {
    /// Client to server.
    Server,
    /// Server to the owning client.
    Client,
    /// Server to every client.
    NetMulticast,
}

/// One parameter of a remote call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamMetadata {
    pub name: String,
    pub ty: PropertyType,
}

impl ParamMetadata {
    pub fn new(name: impl Into<String>, ty: PropertyType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A remote call declared on a class.
///
/// ## Examples
///
/// ```
/// use repligen_define::{ParamMetadata, PropertyType, RpcKind, RpcMetadata};
///
/// let rpc = RpcMetadata::new("ServerFire", RpcKind::Server)
///     .with_param(ParamMetadata::new("Origin", PropertyType::Vector));
///
/// assert_eq!(rpc.params.len(), 1);
/// assert!(rpc.replicated);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcMetadata {
    pub name: String,
    pub kind: RpcKind,
    /// Parameters in declaration order.
    #[serde(default)]
    pub params: Vec<ParamMetadata>,
    /// Whether the host marks the function as a network call.
    #[serde(default = "default_replicated")]
    pub replicated: bool,
}

fn default_replicated() -> bool {
    true
}

impl RpcMetadata {
    pub fn new(name: impl Into<String>, kind: RpcKind) -> Self {
        Self {
            name: name.into(),
            kind,
            params: Vec::new(),
            replicated: true,
        }
    }

    pub fn with_param(mut self, param: ParamMetadata) -> Self {
        self.params.push(param);
        self
    }
}
