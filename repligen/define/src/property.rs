//! Property and type descriptors.

use serde::{Deserialize, Serialize};

/// Visibility of a property to code outside the class.
///
/// Generated code reads public properties of native classes directly and
/// everything else through reflected property pointers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyAccess {
    #[default]
    Public,
    Protected,
    Private,
}

/// Type of a replicated property or remote-call parameter.
///
/// Serialized with an adjacent tag so catalogs stay readable:
///
/// ```
/// use repligen_define::PropertyType;
///
/// let ty: PropertyType = serde_json::from_str(r#"{ "type": "array", "of": { "type": "uint32" } }"#).unwrap();
/// assert_eq!(ty, PropertyType::Array(Box::new(PropertyType::UInt32)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "of", rename_all = "snake_case")]
pub enum PropertyType {
    Bool,
    Byte,
    Int32,
    #[serde(rename = "uint32")]
    UInt32,
    Int64,
    #[serde(rename = "uint64")]
    UInt64,
    Float,
    Double,
    String,
    Name,
    Text,
    Vector,
    Rotator,
    /// An enum, by C++ type name.
    Enum(String),
    /// A reference to another object, by C++ class name.
    Object(String),
    /// A value struct with its own field layout.
    Struct(StructMetadata),
    /// A dynamic array of another type.
    Array(Box<PropertyType>),
    /// A type the host could not describe, by C++ type name.
    Unsupported(String),
}

impl PropertyType {
    /// Returns the C++ type used to declare a value of this type.
    ///
    /// ## Examples
    ///
    /// ```
    /// use repligen_define::PropertyType;
    ///
    /// assert_eq!(PropertyType::Object("AActor".into()).cpp_type(), "AActor*");
    /// assert_eq!(PropertyType::Array(Box::new(PropertyType::Name)).cpp_type(), "TArray<FName>");
    /// ```
    pub fn cpp_type(&self) -> String {
        match self {
            PropertyType::Bool => "bool".to_string(),
            PropertyType::Byte => "uint8".to_string(),
            PropertyType::Int32 => "int32".to_string(),
            PropertyType::UInt32 => "uint32".to_string(),
            PropertyType::Int64 => "int64".to_string(),
            PropertyType::UInt64 => "uint64".to_string(),
            PropertyType::Float => "float".to_string(),
            PropertyType::Double => "double".to_string(),
            PropertyType::String => "FString".to_string(),
            PropertyType::Name => "FName".to_string(),
            PropertyType::Text => "FText".to_string(),
            PropertyType::Vector => "FVector".to_string(),
            PropertyType::Rotator => "FRotator".to_string(),
            PropertyType::Enum(name) | PropertyType::Unsupported(name) => name.clone(),
            PropertyType::Object(class) => format!("{class}*"),
            PropertyType::Struct(st) => st.name.clone(),
            PropertyType::Array(inner) => format!("TArray<{}>", inner.cpp_type()),
        }
    }
}

/// Field layout of a struct-typed property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructMetadata {
    /// C++ struct name including its prefix (e.g. `FWeaponInfo`).
    pub name: String,
    /// Header to include for the struct declaration, relative to its module.
    #[serde(default)]
    pub header: Option<String>,
    /// Fields in declaration order.
    #[serde(default)]
    pub fields: Vec<PropertyMetadata>,
}

impl StructMetadata {
    /// Creates a struct descriptor with the given fields.
    pub fn new(name: impl Into<String>, fields: Vec<PropertyMetadata>) -> Self {
        Self {
            name: name.into(),
            header: None,
            fields,
        }
    }

    /// Returns the schema message name: the C++ name without its `F` prefix.
    ///
    /// ```
    /// use repligen_define::StructMetadata;
    ///
    /// assert_eq!(StructMetadata::new("FWeaponInfo", vec![]).message_name(), "WeaponInfo");
    /// assert_eq!(StructMetadata::new("Fuel", vec![]).message_name(), "Fuel");
    /// ```
    pub fn message_name(&self) -> String {
        let mut chars = self.name.chars();
        match (chars.next(), chars.next()) {
            (Some('F'), Some(second)) if second.is_ascii_uppercase() => self.name[1..].to_string(),
            _ => self.name.clone(),
        }
    }
}

/// One property declared on a class or struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyMetadata {
    /// Declared name of the property.
    pub name: String,
    /// Type of the property.
    pub ty: PropertyType,
    /// Whether the host marks the property as replicated.
    #[serde(default = "default_replicated")]
    pub replicated: bool,
    /// C++ visibility of the property.
    #[serde(default)]
    pub access: PropertyAccess,
}

fn default_replicated() -> bool {
    true
}

impl PropertyMetadata {
    /// Creates a public replicated property.
    pub fn replicated(name: impl Into<String>, ty: PropertyType) -> Self {
        Self {
            name: name.into(),
            ty,
            replicated: true,
            access: PropertyAccess::Public,
        }
    }

    /// Creates a public property the host does not replicate.
    pub fn local(name: impl Into<String>, ty: PropertyType) -> Self {
        Self {
            replicated: false,
            ..Self::replicated(name, ty)
        }
    }

    /// Sets the visibility of the property.
    pub fn with_access(mut self, access: PropertyAccess) -> Self {
        self.access = access;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn struct_type_round_trips_through_json() {
        let ty = PropertyType::Struct(StructMetadata::new(
            "FWeaponInfo",
            vec![PropertyMetadata::replicated("Ammo", PropertyType::Int32)],
        ));

        let json = serde_json::to_string(&ty).unwrap();
        assert!(json.contains(r#""type":"struct""#));

        let back: PropertyType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ty);
    }

    #[test]
    fn enum_type_carries_cpp_name() {
        let ty: PropertyType = serde_json::from_str(r#"{ "type": "enum", "of": "EWeaponSlot" }"#).unwrap();
        assert_eq!(ty.cpp_type(), "EWeaponSlot");
    }

    #[test]
    fn local_property_is_not_replicated() {
        let prop = PropertyMetadata::local("CachedTarget", PropertyType::Vector);
        assert!(!prop.replicated);
        assert_eq!(prop.access, PropertyAccess::Public);
    }
}
