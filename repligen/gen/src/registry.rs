//! Record of the classes generated into a storage directory.
//!
//! Written next to the artifacts after every run so that listing does not
//! depend on parsing file names. The file-name scan remains as a fallback
//! for storage directories produced without a registry.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use repligen_define::ClassId;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::decorator::ClassDescriptor;
use crate::errors::GeneratorError;
use crate::output::write_atomic;

/// One generated class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub class_id: ClassId,
    pub original_name: String,
    pub generated_name: String,
    pub path_name: String,
    pub proto_package: String,
}

impl From<&ClassDescriptor> for RegistryEntry {
    fn from(desc: &ClassDescriptor) -> Self {
        Self {
            class_id: desc.id().clone(),
            original_name: desc.original_name().to_string(),
            generated_name: desc.generated_name.clone(),
            path_name: desc.class.path_name.clone(),
            proto_package: desc.proto_package.clone(),
        }
    }
}

/// Contents of `ChanneldGeneratedClasses.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedClassRegistry {
    #[serde(with = "chrono::serde::ts_seconds")]
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub classes: Vec<RegistryEntry>,
}

impl GeneratedClassRegistry {
    /// Creates a registry of `descriptors` stamped with the current time.
    pub fn from_descriptors<'a>(descriptors: impl IntoIterator<Item = &'a ClassDescriptor>) -> Self {
        Self {
            generated_at: Utc::now(),
            classes: descriptors.into_iter().map(RegistryEntry::from).collect(),
        }
    }

    /// Reads the registry, returning `None` when it is absent or unreadable.
    pub fn load(path: &Path) -> Option<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "No generated class registry");
                return None;
            }
        };
        match serde_json::from_str(&text) {
            Ok(registry) => Some(registry),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring malformed generated class registry");
                None
            }
        }
    }

    /// Writes the registry atomically.
    pub fn save(&self, path: &Path) -> Result<(), GeneratorError> {
        let json = serde_json::to_string_pretty(self).map_err(|source| GeneratorError::Serialize {
            what: "generated class registry",
            source,
        })?;
        write_atomic(path, &json)
    }

    /// Generated class names in generation order.
    pub fn generated_names(&self) -> Vec<String> {
        self.classes.iter().map(|c| c.generated_name.clone()).collect()
    }

    /// Drops entries whose generated name is in `names`; returns how many.
    pub fn remove_names(&mut self, names: &[&str]) -> usize {
        let before = self.classes.len();
        self.classes.retain(|c| !names.contains(&c.generated_name.as_str()));
        before - self.classes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tracing_test::traced_test;

    fn entry(name: &str) -> RegistryEntry {
        RegistryEntry {
            class_id: ClassId::new(format!("/Script/Game.{name}")),
            original_name: name.to_string(),
            generated_name: name.to_string(),
            path_name: format!("/Script/Game.{name}"),
            proto_package: "channeldgenpb".to_string(),
        }
    }

    #[test]
    fn save_and_load_keep_entries_in_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ChanneldGeneratedClasses.json");
        let registry = GeneratedClassRegistry {
            generated_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            classes: vec![entry("Pawn"), entry("Pawn_2")],
        };

        registry.save(&path).unwrap();
        let loaded = GeneratedClassRegistry::load(&path).unwrap();

        assert_eq!(loaded, registry);
        assert_eq!(loaded.generated_names(), ["Pawn", "Pawn_2"]);
        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["generated_at"], serde_json::json!(1_700_000_000));
    }

    #[test]
    fn remove_names_counts_removed_entries() {
        let mut registry = GeneratedClassRegistry {
            generated_at: Utc::now(),
            classes: vec![entry("Door"), entry("Lamp")],
        };

        assert_eq!(registry.remove_names(&["Door", "Missing"]), 1);
        assert_eq!(registry.generated_names(), ["Lamp"]);
    }

    #[test]
    fn absent_registry_loads_as_none() {
        let dir = TempDir::new().unwrap();
        assert!(GeneratedClassRegistry::load(&dir.path().join("none.json")).is_none());
    }

    #[traced_test]
    #[test]
    fn malformed_registry_is_ignored_with_warning() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ChanneldGeneratedClasses.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(GeneratedClassRegistry::load(&path).is_none());
        assert!(logs_contain("Ignoring malformed generated class registry"));
    }
}
