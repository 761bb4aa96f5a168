//! Record of the most recent generation run.
//!
//! The manifest lives in the intermediate directory, apart from the
//! generated artifacts, as a small JSON object:
//!
//! ```json
//! { "GeneratedTime": 1760000000, "ProtoPackageName": "channeldgenpb" }
//! ```

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};
use tracing::warn;

use crate::errors::GeneratorError;
use crate::output::write_atomic;

const GENERATED_TIME_KEY: &str = "GeneratedTime";
const PROTO_PACKAGE_NAME_KEY: &str = "ProtoPackageName";

/// Timestamp and schema package of a generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedManifest {
    /// When the run finished, stored at whole-second precision.
    pub generated_time: DateTime<Utc>,
    pub proto_package_name: String,
}

impl GeneratedManifest {
    /// Creates a manifest stamped with the current time.
    pub fn now(proto_package_name: impl Into<String>) -> Self {
        Self {
            generated_time: truncate_to_seconds(Utc::now()),
            proto_package_name: proto_package_name.into(),
        }
    }

    /// Reads a manifest from `path`.
    ///
    /// Missing or mistyped fields keep their defaults and are reported with a
    /// warning.
    ///
    /// ## Errors
    ///
    /// - [`GeneratorError::ManifestRead`] when the file cannot be read
    /// - [`GeneratorError::ManifestMalformed`] when it is not a JSON object
    pub fn load(path: &Path) -> Result<Self, GeneratorError> {
        let text = fs::read_to_string(path).map_err(|source| GeneratorError::ManifestRead {
            path: path.to_path_buf(),
            source,
        })?;
        let object = match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(object)) => object,
            _ => {
                return Err(GeneratorError::ManifestMalformed {
                    path: path.to_path_buf(),
                });
            }
        };
        Ok(Self::from_object(&object, path))
    }

    fn from_object(object: &Map<String, Value>, path: &Path) -> Self {
        let mut manifest = Self::default();

        match object
            .get(GENERATED_TIME_KEY)
            .and_then(Value::as_i64)
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
        {
            Some(time) => manifest.generated_time = time,
            None => warn!(path = %path.display(), "GeneratedManifest is missing '{GENERATED_TIME_KEY}'"),
        }

        match object.get(PROTO_PACKAGE_NAME_KEY).and_then(Value::as_str) {
            Some(name) => manifest.proto_package_name = name.to_string(),
            None => warn!(path = %path.display(), "GeneratedManifest is missing '{PROTO_PACKAGE_NAME_KEY}'"),
        }

        manifest
    }

    /// Renders the manifest as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, GeneratorError> {
        let value = json!({
            GENERATED_TIME_KEY: self.generated_time.timestamp(),
            PROTO_PACKAGE_NAME_KEY: self.proto_package_name,
        });
        serde_json::to_string_pretty(&value).map_err(|source| GeneratorError::Serialize {
            what: "generated manifest",
            source,
        })
    }

    /// Writes the manifest to `path`.
    ///
    /// ## Errors
    ///
    /// - [`GeneratorError::ManifestDirNotFound`] when the parent directory
    ///   does not exist (it is never created here)
    /// - [`GeneratorError::WriteError`] when the write fails
    pub fn save(&self, path: &Path) -> Result<(), GeneratorError> {
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
        if let Some(dir) = dir
            && !dir.is_dir()
        {
            return Err(GeneratorError::ManifestDirNotFound {
                path: dir.to_path_buf(),
            });
        }
        write_atomic(path, &self.to_json()?)
    }
}

fn truncate_to_seconds(time: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(time.timestamp(), 0).unwrap_or(time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tracing_test::traced_test;

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("GeneratedManifest.json");
        let manifest = GeneratedManifest::now("channeldgenpb");

        manifest.save(&path).unwrap();
        let loaded = GeneratedManifest::load(&path).unwrap();

        assert_eq!(loaded, manifest);
        let raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["GeneratedTime"], json!(manifest.generated_time.timestamp()));
        assert_eq!(raw["ProtoPackageName"], json!("channeldgenpb"));
    }

    #[test]
    fn save_requires_existing_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing/GeneratedManifest.json");

        let err = GeneratedManifest::now("pb").save(&path).unwrap_err();

        assert!(matches!(err, GeneratorError::ManifestDirNotFound { .. }));
        assert!(err.to_string().starts_with("Unable to find the directory of GeneratedManifest"));
        assert!(!path.exists());
    }

    #[test]
    fn load_missing_file_fails_with_message() {
        let dir = TempDir::new().unwrap();

        let err = GeneratedManifest::load(&dir.path().join("nope.json")).unwrap_err();

        assert!(err.to_string().starts_with("Unable to load GeneratedManifest"));
    }

    #[test]
    fn load_rejects_non_object() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("GeneratedManifest.json");
        fs::write(&path, "[1, 2]").unwrap();

        let err = GeneratedManifest::load(&path).unwrap_err();

        assert!(matches!(err, GeneratorError::ManifestMalformed { .. }));
    }

    #[traced_test]
    #[test]
    fn missing_fields_keep_defaults_with_warning() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("GeneratedManifest.json");
        fs::write(&path, r#"{ "ProtoPackageName": "mypb" }"#).unwrap();

        let loaded = GeneratedManifest::load(&path).unwrap();

        assert_eq!(loaded.proto_package_name, "mypb");
        assert_eq!(loaded.generated_time, DateTime::<Utc>::default());
        assert!(logs_contain("GeneratedManifest is missing 'GeneratedTime'"));
    }
}
