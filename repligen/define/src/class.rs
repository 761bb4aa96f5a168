//! Class identity and metadata.
//!
//! - [`ClassId`] - The host's identity for one class object
//! - [`ClassKind`] - How the class participates in channel data
//! - [`ClassMetadata`] - Everything the generator reads about a class

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::EnumString;

use crate::property::PropertyMetadata;
use crate::rpc::RpcMetadata;

/// Opaque identity of a class object in the host.
///
/// Two classes may share a display name (a native `Pawn` and a blueprint
/// asset also called `Pawn`) but never a `ClassId`. Hosts usually use the
/// class's full object path.
///
/// ## Examples
///
/// ```
/// use repligen_define::ClassId;
///
/// let id = ClassId::from("/Script/Engine.Pawn");
/// assert_eq!(id.as_str(), "/Script/Engine.Pawn");
/// assert_eq!(id.to_string(), "/Script/Engine.Pawn");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassId(String);

impl ClassId {
    /// Creates a class id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClassId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ClassId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// How a class's replicated state is stored in channel data.
///
/// ## Examples
///
/// ```
/// use std::str::FromStr;
/// use repligen_define::ClassKind;
///
/// assert_eq!(ClassKind::from_str("game_state").unwrap(), ClassKind::GameState);
/// assert!(ClassKind::GameState.is_singleton());
/// assert!(!ClassKind::Actor.is_singleton());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ClassKind {
    /// A world actor, one state entry per network object.
    #[default]
    Actor,
    /// A component owned by an actor, one state entry per network object.
    ActorComponent,
    /// The game state, exactly one state per channel.
    GameState,
}

impl ClassKind {
    /// Returns true when at most one instance exists per channel.
    pub fn is_singleton(self) -> bool {
        matches!(self, ClassKind::GameState)
    }
}

/// Reflective metadata of one class.
///
/// Property and remote-call order is significant: it decides field numbers in
/// the emitted schema and the layout of the generated code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetadata {
    /// Host identity of the class.
    pub id: ClassId,
    /// Class name without the C++ prefix (e.g. `Pawn`, `BP_Ghost_C`).
    pub name: String,
    /// C++ prefix of the native class (`A` for actors, `U` for objects).
    #[serde(default = "default_cpp_prefix")]
    pub cpp_prefix: String,
    /// Full object path of the class (e.g. `/Script/Engine.Pawn`).
    #[serde(default)]
    pub path_name: String,
    /// Path of the package that owns the class (e.g. `/Script/Engine`).
    #[serde(default)]
    pub package_path: String,
    /// Name of the module declaring the class.
    #[serde(default)]
    pub module: String,
    /// Storage behaviour in channel data.
    #[serde(default)]
    pub kind: ClassKind,
    /// True when the class was compiled from a blueprint asset.
    #[serde(default)]
    pub blueprint: bool,
    /// Direct super class, when the host knows it.
    #[serde(default)]
    pub super_class: Option<ClassId>,
    /// C++ name of the nearest native ancestor (used by blueprint classes).
    #[serde(default)]
    pub native_ancestor: Option<String>,
    /// Properties declared directly on this class, in declaration order.
    #[serde(default)]
    pub properties: Vec<PropertyMetadata>,
    /// Remote calls declared directly on this class, in declaration order.
    #[serde(default)]
    pub rpcs: Vec<RpcMetadata>,
}

fn default_cpp_prefix() -> String {
    "A".to_string()
}

impl ClassMetadata {
    /// Creates metadata with the given identity and no properties.
    ///
    /// The path name defaults to the id and the C++ prefix follows the kind
    /// (`U` for components, `A` otherwise).
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: ClassKind) -> Self {
        let id = id.into();
        let cpp_prefix = match kind {
            ClassKind::ActorComponent => "U",
            ClassKind::Actor | ClassKind::GameState => "A",
        };
        Self {
            path_name: id.clone(),
            id: ClassId::new(id),
            name: name.into(),
            cpp_prefix: cpp_prefix.to_string(),
            package_path: String::new(),
            module: String::new(),
            kind,
            blueprint: false,
            super_class: None,
            native_ancestor: None,
            properties: Vec::new(),
            rpcs: Vec::new(),
        }
    }

    /// Sets the declaring module.
    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }

    /// Sets the owning package path.
    pub fn with_package_path(mut self, package_path: impl Into<String>) -> Self {
        self.package_path = package_path.into();
        self
    }

    /// Sets the direct super class.
    pub fn with_super_class(mut self, super_class: impl Into<ClassId>) -> Self {
        self.super_class = Some(super_class.into());
        self
    }

    /// Marks the class as blueprint-generated with the given native ancestor.
    pub fn as_blueprint(mut self, native_ancestor: impl Into<String>) -> Self {
        self.blueprint = true;
        self.native_ancestor = Some(native_ancestor.into());
        self
    }

    /// Appends a property.
    pub fn with_property(mut self, property: PropertyMetadata) -> Self {
        self.properties.push(property);
        self
    }

    /// Appends a remote call.
    pub fn with_rpc(mut self, rpc: RpcMetadata) -> Self {
        self.rpcs.push(rpc);
        self
    }

    /// Returns the prefixed C++ class name (e.g. `APawn`).
    pub fn cpp_name(&self) -> String {
        format!("{}{}", self.cpp_prefix, self.name)
    }

    /// Returns the C++ type that generated code holds instances as.
    ///
    /// Blueprint classes have no C++ type of their own and are held as their
    /// nearest native ancestor.
    pub fn instance_cpp_name(&self) -> String {
        match (&self.native_ancestor, self.blueprint) {
            (Some(ancestor), true) => ancestor.clone(),
            _ => self.cpp_name(),
        }
    }

    /// Returns the C++ class name whose header declares this class.
    pub fn header_lookup_name(&self) -> String {
        self.instance_cpp_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::{PropertyMetadata, PropertyType};

    #[test]
    fn new_uses_kind_for_cpp_prefix() {
        let comp = ClassMetadata::new("/Script/Game.Inventory", "Inventory", ClassKind::ActorComponent);
        assert_eq!(comp.cpp_name(), "UInventory");

        let actor = ClassMetadata::new("/Script/Game.Door", "Door", ClassKind::Actor);
        assert_eq!(actor.cpp_name(), "ADoor");
    }

    #[test]
    fn blueprint_is_held_as_native_ancestor() {
        let ghost = ClassMetadata::new("/Game/BP_Ghost.BP_Ghost_C", "BP_Ghost_C", ClassKind::Actor)
            .as_blueprint("ACharacter");

        assert_eq!(ghost.instance_cpp_name(), "ACharacter");
        assert_eq!(ghost.header_lookup_name(), "ACharacter");
        assert_eq!(ghost.cpp_name(), "ABP_Ghost_C");
    }

    #[test]
    fn deserializes_with_defaults() {
        let json = r#"{
            "id": "/Script/Game.Door",
            "name": "Door",
            "properties": [{ "name": "bOpen", "ty": { "type": "bool" } }]
        }"#;

        let class: ClassMetadata = serde_json::from_str(json).unwrap();

        assert_eq!(class.cpp_prefix, "A");
        assert_eq!(class.kind, ClassKind::Actor);
        assert!(!class.blueprint);
        assert_eq!(
            class.properties,
            vec![PropertyMetadata::replicated("bOpen", PropertyType::Bool)]
        );
    }
}
