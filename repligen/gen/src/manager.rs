//! Orchestration of generation runs and the generated-artifact lifecycle.
//!
//! [`GenerationManager`] owns the per-session state: the header index, the
//! ignore list, the collision registry and the last loaded manifest. Each
//! [`generate_all`](GenerationManager::generate_all) writes a complete
//! artifact set into the storage directory, removes the artifacts of classes
//! the run no longer produces, records the set in the class registry and
//! then saves the manifest.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use repligen_define::{ClassId, ClassMetadataProvider};
use tracing::{debug, info, warn};

use crate::codegen::{self, ClassSkip, GenerateSettings, GeneratedCodeBundle};
use crate::config::GeneratorConfig;
use crate::decorator::IgnoreList;
use crate::errors::GeneratorError;
use crate::layout::{
    GLOBAL_STRUCT_HEADER, GLOBAL_STRUCT_PROTO, HEADER_EXTENSION, PROTO_EXTENSION, REGISTRATION_HEADER,
    TYPE_DEFINITIONS_HEADER, TYPE_DEFINITIONS_SOURCE, artifact_file_names, channel_data_file_names,
    generated_name_from_header, is_valid_generated_name,
};
use crate::manifest::GeneratedManifest;
use crate::naming::NameRegistry;
use crate::output::{
    list_file_names_with_suffix, purge_directory, remove_file_if_exists, write_atomic,
};
use crate::registry::{GeneratedClassRegistry, RegistryEntry};
use crate::resolver::TypeMetadataResolver;

/// Outcome of one [`GenerationManager::generate_all`] call.
#[derive(Debug, Default)]
pub struct GenerationReport {
    /// Classes whose artifacts were generated, in target order.
    pub generated: Vec<RegistryEntry>,
    /// Targets left out, with the reason.
    pub skipped: Vec<ClassSkip>,
    /// Number of files written successfully.
    pub files_written: usize,
    /// Generated names of earlier runs whose artifacts were removed.
    pub removed_stale: Vec<String>,
    /// Writes and stale-artifact deletions that failed; the run continued
    /// past each of them.
    pub write_failures: Vec<GeneratorError>,
    /// Manifest saved at the end of the run.
    pub manifest: GeneratedManifest,
}

impl GenerationReport {
    /// True when every target was generated and every file was written.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty() && self.write_failures.is_empty()
    }
}

/// Outcome of removing generated classes.
#[derive(Debug, Default)]
pub struct RemovalReport {
    pub files_removed: usize,
    /// Deletions that failed, and a failed registry rewrite.
    pub failures: Vec<GeneratorError>,
}

impl RemovalReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Drives generation runs for one module.
pub struct GenerationManager<P: ClassMetadataProvider> {
    config: GeneratorConfig,
    provider: P,
    resolver: TypeMetadataResolver,
    ignore: IgnoreList,
    names: NameRegistry,
    latest_manifest: Option<GeneratedManifest>,
    generating: bool,
}

impl<P: ClassMetadataProvider> GenerationManager<P> {
    /// Creates a manager; no file is read until a run starts.
    pub fn new(config: GeneratorConfig, provider: P) -> Self {
        let resolver = TypeMetadataResolver::new(config.module_manifest_path());
        let ignore = config.ignore.clone();
        Self {
            config,
            provider,
            resolver,
            ignore,
            names: NameRegistry::default(),
            latest_manifest: None,
            generating: false,
        }
    }

    /// Prepares a generation session.
    ///
    /// Rebuilds the header index when `refresh_module_info` is set or no
    /// index has been built yet, and resets the collision registry.
    ///
    /// ## Errors
    ///
    /// Returns the module-manifest error when the index cannot be rebuilt;
    /// the previous index is kept in that case.
    pub fn start_generation(&mut self, refresh_module_info: bool) -> Result<(), GeneratorError> {
        if refresh_module_info || !self.resolver.is_refreshed() {
            let classes = self.resolver.refresh_module_info()?;
            debug!(classes, "Refreshed module info");
        }
        self.names.reset();
        self.generating = true;
        Ok(())
    }

    /// Ends the session started by [`start_generation`](Self::start_generation).
    pub fn stop_generation(&mut self) {
        self.names.reset();
        self.generating = false;
    }

    /// True between `start_generation` and `stop_generation`.
    pub fn is_generating(&self) -> bool {
        self.generating
    }

    /// Generates and writes every artifact for `targets`, in order.
    ///
    /// `go_import_prefix` overrides the configured prefix of the Go import
    /// path. Classes that cannot be decorated and files that cannot be
    /// written are collected in the report without stopping the run. When no
    /// header index exists yet one is built; if that fails every class is
    /// reported as skipped.
    ///
    /// Artifacts of classes generated by an earlier run but not by this one
    /// are deleted, as is the channel-data pair when no class was generated,
    /// so the storage directory always holds exactly the last run's output.
    ///
    /// ## Errors
    ///
    /// Fails when the configuration is invalid, before anything is written,
    /// or when the manifest cannot be saved.
    pub fn generate_all(
        &mut self,
        targets: &[ClassId],
        go_import_prefix: Option<&str>,
    ) -> Result<GenerationReport, GeneratorError> {
        self.config.validate()?;

        if !self.resolver.is_refreshed()
            && let Err(e) = self.resolver.refresh_module_info()
        {
            warn!(error = %e, "Module info unavailable, class headers cannot be resolved");
        }

        info!("Start generating {} replicators", targets.len());

        let proto_package = self.config.proto_package.clone();
        let prefix = go_import_prefix.unwrap_or(&self.config.go_import_prefix);
        let settings = GenerateSettings {
            module_name: self.config.module_name(),
            go_package: format!("{prefix}{proto_package}"),
            proto_package,
        };
        let bundle = codegen::generate(
            targets,
            &self.provider,
            &self.resolver,
            &self.ignore,
            &mut self.names,
            &settings,
        );

        let mut report = GenerationReport {
            skipped: bundle.skipped.clone(),
            ..GenerationReport::default()
        };
        for skip in &report.skipped {
            warn!(class = %skip.class, reason = %skip.reason, "Skipped class");
        }

        self.remove_stale_artifacts(&bundle, &mut report);
        self.write_bundle(&bundle, &mut report);

        let registry = GeneratedClassRegistry::from_descriptors(bundle.replicators.iter().map(|u| &u.descriptor));
        match registry.save(&self.config.registry_path()) {
            Ok(()) => report.files_written += 1,
            Err(e) => {
                warn!(error = %e, "Failed to write generated class registry");
                report.write_failures.push(e);
            }
        }
        report.generated = registry.classes;

        let manifest = GeneratedManifest::now(&self.config.proto_package);
        self.save_manifest(&manifest)?;
        self.latest_manifest = Some(manifest.clone());
        report.manifest = manifest;

        info!(
            generated = report.generated.len(),
            skipped = report.skipped.len(),
            failed_writes = report.write_failures.len(),
            "Finished generating replicators"
        );
        Ok(report)
    }

    /// Deletes what earlier runs generated and this bundle does not replace.
    ///
    /// Earlier classes are taken from both the registry and the header scan,
    /// so storage written without a registry is cleaned up too.
    fn remove_stale_artifacts(&self, bundle: &GeneratedCodeBundle, report: &mut GenerationReport) {
        let current: BTreeSet<&str> = bundle
            .replicators
            .iter()
            .map(|u| u.descriptor.generated_name.as_str())
            .collect();

        let mut previous: BTreeSet<String> = GeneratedClassRegistry::load(&self.config.registry_path())
            .map(|registry| registry.generated_names().into_iter().collect())
            .unwrap_or_default();
        match self.scan_generated_class_names() {
            Ok(names) => previous.extend(names),
            Err(e) => {
                warn!(error = %e, "Failed to scan storage for stale artifacts");
                report.write_failures.push(e);
            }
        }

        let stale: Vec<&str> = previous
            .iter()
            .map(String::as_str)
            .filter(|name| !current.contains(name))
            .collect();
        if !stale.is_empty() {
            let removal = self.remove_artifacts(&stale);
            debug!(classes = ?stale, files = removal.files_removed, "Removed stale artifacts");
            report.write_failures.extend(removal.failures);
            report.removed_stale = stale.into_iter().map(str::to_string).collect();
        }

        if bundle.channel_data.is_none() {
            let storage = self.config.storage_dir();
            for file in channel_data_file_names(&self.config.module_name()) {
                if let Err(e) = remove_file_if_exists(&storage.join(file)) {
                    warn!(error = %e, "Failed to remove stale channel data");
                    report.write_failures.push(e);
                }
            }
        }
    }

    fn write_bundle(&self, bundle: &GeneratedCodeBundle, report: &mut GenerationReport) {
        let storage = self.config.storage_dir();
        let mut write = |name: &str, content: &str| -> bool {
            match write_atomic(&storage.join(name), content) {
                Ok(()) => {
                    report.files_written += 1;
                    true
                }
                Err(e) => {
                    warn!(error = %e, "Failed to write generated file");
                    report.write_failures.push(e);
                    false
                }
            }
        };

        write(TYPE_DEFINITIONS_HEADER, &bundle.type_definitions_header);
        write(TYPE_DEFINITIONS_SOURCE, &bundle.type_definitions_source);

        for unit in &bundle.replicators {
            let written = [
                write(&unit.header_file_name, &unit.header_code),
                write(&unit.source_file_name, &unit.source_code),
                write(&unit.proto_file_name, &unit.proto_code),
            ];
            if written.iter().all(|ok| *ok) {
                debug!(
                    class = %unit.descriptor.original_name(),
                    package = %unit.descriptor.package_path(),
                    header = %unit.header_file_name,
                    source = %unit.source_file_name,
                    proto = %unit.proto_file_name,
                    "Generated replicator"
                );
            }
        }

        write(GLOBAL_STRUCT_HEADER, &bundle.global_struct_header);
        write(GLOBAL_STRUCT_PROTO, &bundle.global_struct_proto);

        if let Some(channel_data) = &bundle.channel_data {
            write(&channel_data.names.header_file_name, &channel_data.header_code);
            write(&channel_data.names.proto_file_name, &channel_data.proto_code);
        }

        write(REGISTRATION_HEADER, &bundle.registration_header);
    }

    /// Generated class names, from the registry when present.
    ///
    /// Falls back to [`scan_generated_class_names`](Self::scan_generated_class_names)
    /// when the registry is absent or unreadable.
    pub fn list_generated_class_names(&self) -> Result<Vec<String>, GeneratorError> {
        match GeneratedClassRegistry::load(&self.config.registry_path()) {
            Some(registry) => Ok(registry.generated_names()),
            None => self.scan_generated_class_names(),
        }
    }

    /// Generated class names recovered from replicator header file names.
    pub fn scan_generated_class_names(&self) -> Result<Vec<String>, GeneratorError> {
        Ok(list_file_names_with_suffix(&self.config.storage_dir(), HEADER_EXTENSION)?
            .iter()
            .filter_map(|name| generated_name_from_header(name).map(str::to_string))
            .collect())
    }

    /// Schema file names in the storage directory.
    pub fn list_generated_schema_files(&self) -> Result<Vec<String>, GeneratorError> {
        list_file_names_with_suffix(&self.config.storage_dir(), PROTO_EXTENSION)
    }

    /// Deletes the artifacts of one generated class. Missing files are not
    /// an error.
    pub fn remove_generated(&self, generated_name: &str) -> Result<RemovalReport, GeneratorError> {
        self.remove_generated_many(&[generated_name])
    }

    /// Deletes the artifacts of several generated classes.
    ///
    /// A file that cannot be deleted is logged and reported without stopping
    /// the batch, and the registry is rewritten without every requested name.
    ///
    /// ## Errors
    ///
    /// Returns [`GeneratorError::InvalidGeneratedName`] before touching any
    /// file when a name could address files outside the storage directory.
    pub fn remove_generated_many(&self, generated_names: &[&str]) -> Result<RemovalReport, GeneratorError> {
        if let Some(name) = generated_names.iter().find(|n| !is_valid_generated_name(n)) {
            return Err(GeneratorError::InvalidGeneratedName(name.to_string()));
        }

        let mut report = self.remove_artifacts(generated_names);

        let registry_path = self.config.registry_path();
        if let Some(mut registry) = GeneratedClassRegistry::load(&registry_path)
            && registry.remove_names(generated_names) > 0
            && let Err(e) = registry.save(&registry_path)
        {
            warn!(error = %e, "Failed to rewrite generated class registry");
            report.failures.push(e);
        }

        info!(
            classes = generated_names.len(),
            files = report.files_removed,
            failed = report.failures.len(),
            "Removed generated classes"
        );
        Ok(report)
    }

    fn remove_artifacts(&self, generated_names: &[&str]) -> RemovalReport {
        let storage = self.config.storage_dir();
        let mut report = RemovalReport::default();
        for name in generated_names {
            if !is_valid_generated_name(name) {
                warn!(generated_name = %name, "Not removing artifacts of an invalid generated name");
                report.failures.push(GeneratorError::InvalidGeneratedName(name.to_string()));
                continue;
            }
            for file in artifact_file_names(name) {
                match remove_file_if_exists(&storage.join(file)) {
                    Ok(true) => report.files_removed += 1,
                    Ok(false) => {}
                    Err(e) => {
                        warn!(error = %e, "Failed to remove generated file");
                        report.failures.push(e);
                    }
                }
            }
        }
        report
    }

    /// Deletes every file directly in the storage directory.
    pub fn purge_storage_directory(&self) -> Result<usize, GeneratorError> {
        let removed = purge_directory(&self.config.storage_dir())?;
        info!(files = removed, "Purged storage directory");
        Ok(removed)
    }

    /// Loads the manifest from the intermediate directory.
    ///
    /// On failure the previously loaded manifest is kept.
    pub fn load_latest_manifest(&mut self) -> Result<&GeneratedManifest, GeneratorError> {
        let path = self.config.manifest_path();
        self.load_manifest_from(&path)
    }

    /// Loads the manifest from `path`; on failure the previously loaded
    /// manifest is kept.
    pub fn load_manifest_from(&mut self, path: &Path) -> Result<&GeneratedManifest, GeneratorError> {
        let manifest = GeneratedManifest::load(path)?;
        Ok(self.latest_manifest.insert(manifest))
    }

    /// Saves `manifest` to the intermediate directory, creating it first.
    pub fn save_manifest(&self, manifest: &GeneratedManifest) -> Result<(), GeneratorError> {
        let dir = &self.config.intermediate_dir;
        fs::create_dir_all(dir).map_err(|source| GeneratorError::WriteError {
            path: dir.display().to_string(),
            source,
        })?;
        manifest.save(&self.config.manifest_path())
    }

    /// Saves `manifest` to `path`. The directory must already exist.
    pub fn save_manifest_to(&self, manifest: &GeneratedManifest, path: &Path) -> Result<(), GeneratorError> {
        manifest.save(path)
    }

    /// The most recently loaded or saved manifest.
    pub fn latest_manifest(&self) -> Option<&GeneratedManifest> {
        self.latest_manifest.as_ref()
    }

    pub fn storage_dir(&self) -> PathBuf {
        self.config.storage_dir()
    }

    pub fn default_package_name(&self) -> &str {
        &self.config.proto_package
    }

    pub fn ignore_list_mut(&mut self) -> &mut IgnoreList {
        &mut self.ignore
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn resolver(&self) -> &TypeMetadataResolver {
        &self.resolver
    }
}
