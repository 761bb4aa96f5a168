//! Shared test fixtures for repligen-gen unit tests.
//!
//! Most fixtures build a throwaway module on disk: header files containing
//! `UCLASS` declarations plus the module manifest that lists them.

use std::fs;
use std::path::{Path, PathBuf};

use repligen_define::{ClassKind, ClassMetadata, PropertyMetadata, PropertyType};
use serde_json::json;

use crate::config::GeneratorConfig;
use crate::decorator::{ClassDecorator, ClassDescriptor, DecorateOptions, IgnoreList};
use crate::naming::NameRegistry;
use crate::resolver::TypeMetadataResolver;

/// Writes a module manifest for `module` listing `headers` as public headers.
///
/// The module's base directory is `root/<module>` and its include base is
/// `root/<module>/Public`.
pub fn write_module_manifest(root: &Path, module: &str, headers: &[PathBuf]) -> PathBuf {
    let base = root.join(module);
    let doc = json!({
        "Modules": [{
            "Name": module,
            "BaseDirectory": base,
            "IncludeBase": base.join("Public"),
            "PublicHeaders": headers,
        }]
    });
    let path = root.join("ModuleManifest.json");
    fs::write(&path, serde_json::to_string_pretty(&doc).unwrap()).unwrap();
    path
}

/// Writes `files` (paths relative to `root/<module>`) and a manifest listing
/// them. Returns the manifest path.
pub fn write_module(root: &Path, module: &str, files: &[(&str, &str)]) -> PathBuf {
    let base = root.join(module);
    let mut headers = Vec::with_capacity(files.len());
    for (rel, content) in files {
        let path = base.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        headers.push(path);
    }
    write_module_manifest(root, module, &headers)
}

/// Returns a refreshed resolver that knows the given prefixed class names.
///
/// Each class gets its own header, `Public/<name without prefix>.h`.
pub fn fixture_resolver(root: &Path, cpp_names: &[&str]) -> TypeMetadataResolver {
    let files: Vec<(String, String)> = cpp_names
        .iter()
        .map(|name| {
            (
                format!("Public/{}.h", &name[1..]),
                format!("UCLASS()\nclass {name} {{}};\n"),
            )
        })
        .collect();
    let refs: Vec<(&str, &str)> = files.iter().map(|(p, c)| (p.as_str(), c.as_str())).collect();
    let manifest = write_module(root, "Game", &refs);

    let mut resolver = TypeMetadataResolver::new(manifest);
    resolver.refresh_module_info().unwrap();
    resolver
}

/// A native actor class in module `Game` with no members.
pub fn actor(id: &str, name: &str) -> ClassMetadata {
    ClassMetadata::new(id, name, ClassKind::Actor).with_module("Game")
}

/// `ADoor` with two replicated scalar properties.
pub fn door_class() -> ClassMetadata {
    actor("/Script/Game.Door", "Door")
        .with_package_path("/Script/Game")
        .with_property(PropertyMetadata::replicated("bOpen", PropertyType::Bool))
        .with_property(PropertyMetadata::replicated("OpenAngle", PropertyType::Float))
}

/// Decorates `classes` in order with default options and one name registry.
pub fn decorate_all(root: &Path, classes: Vec<ClassMetadata>) -> Vec<ClassDescriptor> {
    let lookups: Vec<String> = classes.iter().map(ClassMetadata::header_lookup_name).collect();
    let lookup_refs: Vec<&str> = lookups.iter().map(String::as_str).collect();
    let resolver = fixture_resolver(root, &lookup_refs);
    let ignore = IgnoreList::new();
    let mut names = NameRegistry::default();
    let mut decorator = ClassDecorator::new(&resolver, &ignore, &mut names);

    classes
        .iter()
        .map(|class| decorator.decorate(class, &DecorateOptions::default()).unwrap())
        .collect()
}

/// Decorates a single class.
pub fn decorate_one(root: &Path, class: ClassMetadata) -> ClassDescriptor {
    decorate_all(root, vec![class]).remove(0)
}

/// Configuration rooted at `root` for module `Game`.
pub fn test_config(root: &Path, module_manifest: PathBuf) -> GeneratorConfig {
    GeneratorConfig {
        intermediate_dir: root.join("Intermediate"),
        module_manifest: Some(module_manifest),
        ..GeneratorConfig::new(root.join("Game"))
    }
}
