//! Locates the header that declares each class.
//!
//! The host build writes a module manifest listing every module and its
//! header files. [`TypeMetadataResolver::refresh_module_info`] reads that
//! manifest, scans each listed header for `UCLASS` declarations and indexes
//! the declared classes by their prefixed C++ name.
//!
//! ## Module Manifest
//!
//! ```json
//! {
//!   "Modules": [
//!     {
//!       "Name": "Game",
//!       "BaseDirectory": "/project/Source/Game",
//!       "IncludeBase": "/project/Source/Game/Public",
//!       "PublicHeaders": ["/project/Source/Game/Public/Door.h"],
//!       "InternalHeaders": [],
//!       "PrivateHeaders": []
//!     }
//!   ]
//! }
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::errors::GeneratorError;

/// Matches `UCLASS(...) class [MODULE_API] AName`, capturing the class name.
static UCLASS_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)UCLASS\s*\(.*?\)\s*class\s+(?:[A-Za-z0-9_]+_API\s+)?([A-Za-z_]\w*)")
        .expect("Invalid UCLASS declaration regex")
});

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ManifestDocument {
    #[serde(default)]
    modules: Vec<ManifestModule>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ManifestModule {
    name: String,
    base_directory: PathBuf,
    #[serde(default)]
    include_base: Option<PathBuf>,
    #[serde(default)]
    public_headers: Vec<PathBuf>,
    #[serde(default)]
    internal_headers: Vec<PathBuf>,
    #[serde(default)]
    private_headers: Vec<PathBuf>,
}

/// A source module known to the host build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    pub name: String,
    /// Root source directory of the module.
    pub base_directory: PathBuf,
    /// Directory that include paths are relative to.
    pub include_base: PathBuf,
    /// Absolute paths of every header listed for the module.
    pub headers: Vec<PathBuf>,
}

/// Where a class is declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CppClassInfo {
    /// Absolute path of the declaring header.
    pub header_path: PathBuf,
    /// Name of the declaring module.
    pub module: String,
    /// Path to use in an `#include` directive, with forward slashes.
    pub include_path: String,
}

/// Refreshable index from class name to declaring header.
#[derive(Debug, Clone)]
pub struct TypeMetadataResolver {
    module_manifest: PathBuf,
    modules: HashMap<String, ModuleInfo>,
    classes: HashMap<String, CppClassInfo>,
    refreshed: bool,
}

impl TypeMetadataResolver {
    /// Creates an empty resolver reading the given module manifest.
    pub fn new(module_manifest: impl Into<PathBuf>) -> Self {
        Self {
            module_manifest: module_manifest.into(),
            modules: HashMap::new(),
            classes: HashMap::new(),
            refreshed: false,
        }
    }

    /// Rebuilds the module and class index from the module manifest.
    ///
    /// Returns the number of classes indexed. Headers that can not be read
    /// are skipped with a warning.
    ///
    /// ## Errors
    ///
    /// Fails when the manifest can not be read or parsed. The previous index
    /// is kept in that case.
    pub fn refresh_module_info(&mut self) -> Result<usize, GeneratorError> {
        let path = &self.module_manifest;
        let content = fs::read_to_string(path).map_err(|e| GeneratorError::ModuleManifestRead {
            path: path.clone(),
            source: e,
        })?;
        let doc: ManifestDocument =
            serde_json::from_str(&content).map_err(|e| GeneratorError::ModuleManifestParse {
                path: path.clone(),
                source: e,
            })?;

        let mut modules = HashMap::with_capacity(doc.modules.len());
        let mut classes = HashMap::new();

        for module in doc.modules {
            let info = ModuleInfo::from_manifest(module);
            for header in &info.headers {
                index_header(&info, header, &mut classes);
            }
            modules.insert(info.name.clone(), info);
        }

        info!(modules = modules.len(), classes = classes.len(), "Refreshed module info");
        let count = classes.len();
        self.modules = modules;
        self.classes = classes;
        self.refreshed = true;
        Ok(count)
    }

    /// Returns the absolute header path declaring `cpp_class_name` (e.g. `APawn`).
    ///
    /// Always `None` before the first successful refresh.
    pub fn resolve_header_path(&self, cpp_class_name: &str) -> Option<&Path> {
        self.classes
            .get(cpp_class_name)
            .map(|c| c.header_path.as_path())
    }

    /// Returns everything known about where `cpp_class_name` is declared.
    pub fn class_info(&self, cpp_class_name: &str) -> Option<&CppClassInfo> {
        self.classes.get(cpp_class_name)
    }

    pub fn module_info(&self, module: &str) -> Option<&ModuleInfo> {
        self.modules.get(module)
    }

    /// Returns true once a refresh has succeeded.
    pub fn is_refreshed(&self) -> bool {
        self.refreshed
    }

    pub fn module_manifest(&self) -> &Path {
        &self.module_manifest
    }
}

impl ModuleInfo {
    fn from_manifest(module: ManifestModule) -> Self {
        let base = module.base_directory;
        let include_base = module.include_base.unwrap_or_else(|| base.clone());
        let headers = module
            .public_headers
            .into_iter()
            .chain(module.internal_headers)
            .chain(module.private_headers)
            .map(|h| base.join(h))
            .collect();

        Self {
            name: module.name,
            base_directory: base,
            include_base,
            headers,
        }
    }

    /// Returns the include path of `header` relative to this module.
    pub fn include_path_for(&self, header: &Path) -> String {
        let relative = header
            .strip_prefix(&self.include_base)
            .or_else(|_| header.strip_prefix(&self.base_directory))
            .unwrap_or_else(|_| Path::new(header.file_name().unwrap_or(header.as_os_str())));

        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

fn index_header(module: &ModuleInfo, header: &Path, classes: &mut HashMap<String, CppClassInfo>) {
    let source = match fs::read_to_string(header) {
        Ok(s) => s,
        Err(e) => {
            warn!(header = %header.display(), error = %e, "Skipping unreadable header");
            return;
        }
    };

    for caps in UCLASS_DECL.captures_iter(&source) {
        let name = &caps[1];
        debug!(class = name, header = %header.display(), "Indexed class");
        classes.insert(
            name.to_string(),
            CppClassInfo {
                header_path: header.to_path_buf(),
                module: module.name.clone(),
                include_path: module.include_path_for(header),
            },
        );
    }
}
