//! Generator configuration, loaded from TOML.
//!
//! ```toml
//! module_dir = "Source/Game"
//! module_manifest = "Intermediate/ModuleManifest.json"
//! proto_package = "channeldgenpb"
//! go_import_prefix = "github.com/acme/game/"
//!
//! [ignore]
//! class_paths = ["/Game/Debug/BP_Probe.BP_Probe_C"]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::decorator::{DEFAULT_PROTO_PACKAGE, IgnoreList};
use crate::errors::GeneratorError;
use crate::layout::{DEFAULT_INTERMEDIATE_DIR, DEFAULT_STORAGE_DIR_NAME, MANIFEST_FILE, REGISTRY_FILE};
use crate::naming::is_compilable_identifier;

/// File name of the host module manifest when none is configured.
pub const DEFAULT_MODULE_MANIFEST_FILE: &str = "ModuleManifest.json";

fn default_intermediate_dir() -> PathBuf {
    PathBuf::from(DEFAULT_INTERMEDIATE_DIR)
}

fn default_proto_package() -> String {
    DEFAULT_PROTO_PACKAGE.to_string()
}

/// Where a run reads from and writes to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Source directory of the module the generated code belongs to.
    pub module_dir: PathBuf,
    /// Directory receiving generated artifacts.
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,
    /// Directory holding the generated manifest.
    #[serde(default = "default_intermediate_dir")]
    pub intermediate_dir: PathBuf,
    /// Host module manifest used to locate class headers.
    #[serde(default)]
    pub module_manifest: Option<PathBuf>,
    #[serde(default = "default_proto_package")]
    pub proto_package: String,
    /// Prepended verbatim to the schema package to form the Go import path.
    #[serde(default)]
    pub go_import_prefix: String,
    #[serde(default)]
    pub ignore: IgnoreList,
}

impl GeneratorConfig {
    /// Creates a configuration with defaults for everything but the module.
    pub fn new(module_dir: impl Into<PathBuf>) -> Self {
        Self {
            module_dir: module_dir.into(),
            storage_dir: None,
            intermediate_dir: default_intermediate_dir(),
            module_manifest: None,
            proto_package: default_proto_package(),
            go_import_prefix: String::new(),
            ignore: IgnoreList::default(),
        }
    }

    /// Loads and validates a configuration file.
    ///
    /// ## Errors
    ///
    /// Returns [`GeneratorError::ConfigError`] when the file cannot be read,
    /// is not valid TOML, or fails validation.
    pub fn from_file(path: &Path) -> Result<Self, GeneratorError> {
        let text = fs::read_to_string(path).map_err(|e| {
            GeneratorError::ConfigError(format!("cannot read '{}': {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Parses and validates a configuration document.
    pub fn from_toml_str(text: &str) -> Result<Self, GeneratorError> {
        let config: Self =
            toml::from_str(text).map_err(|e| GeneratorError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the values a run depends on.
    pub fn validate(&self) -> Result<(), GeneratorError> {
        if self.module_dir.as_os_str().is_empty() {
            return Err(GeneratorError::ConfigError("module_dir cannot be empty".to_string()));
        }
        let module_name = self.module_name();
        if module_name.is_empty() {
            return Err(GeneratorError::ConfigError(format!(
                "cannot derive a module name from '{}'",
                self.module_dir.display()
            )));
        }
        // The module name is spliced into C++ and schema identifiers.
        if !is_compilable_identifier(&module_name) {
            return Err(GeneratorError::ConfigError(format!(
                "module name '{module_name}' is not a legal identifier"
            )));
        }
        let valid_package = !self.proto_package.is_empty()
            && self
                .proto_package
                .split('.')
                .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
        if !valid_package {
            return Err(GeneratorError::ConfigError(format!(
                "invalid proto_package '{}'",
                self.proto_package
            )));
        }
        Ok(())
    }

    /// Name of the module, taken from the last component of `module_dir`.
    pub fn module_name(&self) -> String {
        self.module_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Resolved storage directory.
    pub fn storage_dir(&self) -> PathBuf {
        self.storage_dir
            .clone()
            .unwrap_or_else(|| self.module_dir.join(DEFAULT_STORAGE_DIR_NAME))
    }

    /// Resolved host module manifest path.
    pub fn module_manifest_path(&self) -> PathBuf {
        self.module_manifest
            .clone()
            .unwrap_or_else(|| self.intermediate_dir.join(DEFAULT_MODULE_MANIFEST_FILE))
    }

    /// Path of the generated manifest.
    pub fn manifest_path(&self) -> PathBuf {
        self.intermediate_dir.join(MANIFEST_FILE)
    }

    /// Path of the generated-class registry.
    pub fn registry_path(&self) -> PathBuf {
        self.storage_dir().join(REGISTRY_FILE)
    }

    /// Go import path of the schema package.
    pub fn go_package(&self) -> String {
        format!("{}{}", self.go_import_prefix, self.proto_package)
    }
}
