//! The lookup seam between a host and the generator.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::class::{ClassId, ClassMetadata};

/// Supplies class metadata by identity.
///
/// Implementations only read host state. The generator calls
/// [`class_metadata`](ClassMetadataProvider::class_metadata) once per target
/// class and again while walking super-class chains.
pub trait ClassMetadataProvider {
    /// Returns the metadata for `id`, or `None` when the host does not know it.
    fn class_metadata(&self, id: &ClassId) -> Option<ClassMetadata>;
}

impl<T: ClassMetadataProvider + ?Sized> ClassMetadataProvider for &T {
    fn class_metadata(&self, id: &ClassId) -> Option<ClassMetadata> {
        (**self).class_metadata(id)
    }
}

/// Errors raised while building a [`ClassCatalog`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// Two entries share the same class id.
    #[error("duplicate class id in catalog: {0}")]
    DuplicateClass(ClassId),
}

/// Serialized form of a catalog.
#[derive(Debug, Serialize, Deserialize)]
struct CatalogDocument {
    classes: Vec<ClassMetadata>,
}

/// In-memory class metadata, in insertion order.
///
/// A catalog is the simplest provider: an offline dump of host reflection,
/// loaded from JSON, or a fixture built in tests.
///
/// ## Examples
///
/// ```
/// use repligen_define::{ClassCatalog, ClassMetadataProvider};
///
/// let json = r#"{ "classes": [ { "id": "/Script/Game.Door", "name": "Door" } ] }"#;
/// let catalog: ClassCatalog = serde_json::from_str(json).unwrap();
///
/// assert_eq!(catalog.len(), 1);
/// assert!(catalog.class_metadata(&"/Script/Game.Door".into()).is_some());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "CatalogDocument", into = "CatalogDocument")]
pub struct ClassCatalog {
    classes: Vec<ClassMetadata>,
    index: HashMap<ClassId, usize>,
}

impl ClassCatalog {
    /// Builds a catalog, rejecting duplicate ids.
    ///
    /// ## Errors
    ///
    /// Returns [`CatalogError::DuplicateClass`] for the first repeated id.
    pub fn new(classes: Vec<ClassMetadata>) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(classes.len());
        for (i, class) in classes.iter().enumerate() {
            if index.insert(class.id.clone(), i).is_some() {
                return Err(CatalogError::DuplicateClass(class.id.clone()));
            }
        }
        Ok(Self { classes, index })
    }

    /// Returns the class ids in catalog order.
    pub fn ids(&self) -> impl Iterator<Item = &ClassId> {
        self.classes.iter().map(|c| &c.id)
    }

    /// Returns a reference to the metadata for `id`.
    pub fn get(&self, id: &ClassId) -> Option<&ClassMetadata> {
        self.index.get(id).map(|&i| &self.classes[i])
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl ClassMetadataProvider for ClassCatalog {
    fn class_metadata(&self, id: &ClassId) -> Option<ClassMetadata> {
        self.get(id).cloned()
    }
}

impl TryFrom<CatalogDocument> for ClassCatalog {
    type Error = CatalogError;

    fn try_from(doc: CatalogDocument) -> Result<Self, Self::Error> {
        ClassCatalog::new(doc.classes)
    }
}

impl From<ClassCatalog> for CatalogDocument {
    fn from(catalog: ClassCatalog) -> Self {
        CatalogDocument {
            classes: catalog.classes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ClassKind;

    #[test]
    fn rejects_duplicate_ids() {
        let a = ClassMetadata::new("/Script/Game.Door", "Door", ClassKind::Actor);
        let b = a.clone();

        let err = ClassCatalog::new(vec![a, b]).unwrap_err();
        assert_eq!(err, CatalogError::DuplicateClass(ClassId::from("/Script/Game.Door")));
    }

    #[test]
    fn keeps_insertion_order() {
        let catalog = ClassCatalog::new(vec![
            ClassMetadata::new("/Script/Game.B", "B", ClassKind::Actor),
            ClassMetadata::new("/Script/Game.A", "A", ClassKind::Actor),
        ])
        .unwrap();

        let ids: Vec<_> = catalog.ids().map(|id| id.as_str()).collect();
        assert_eq!(ids, ["/Script/Game.B", "/Script/Game.A"]);
    }

    #[test]
    fn duplicate_ids_fail_deserialization() {
        let json = r#"{ "classes": [ { "id": "X", "name": "X" }, { "id": "X", "name": "Y" } ] }"#;
        let result: Result<ClassCatalog, _> = serde_json::from_str(json);

        let err = result.unwrap_err().to_string();
        assert!(err.contains("duplicate class id"));
    }

    #[test]
    fn unknown_id_returns_none() {
        let catalog = ClassCatalog::default();
        assert!(catalog.class_metadata(&ClassId::from("nope")).is_none());
    }
}
