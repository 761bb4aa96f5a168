//! Replicator Code Generator
//!
//! Generates replicators, schemas and channel-data code for a module from a
//! class catalog, and manages the generated files.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use repligen_define::{ClassCatalog, ClassId};
use repligen_gen::config::GeneratorConfig;
use repligen_gen::errors::GeneratorError;
use repligen_gen::manager::GenerationManager;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Replicator generator - emits replication glue and schemas for a module
#[derive(Parser, Debug)]
#[command(name = "repligen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Module source directory (overrides the config file)
    #[arg(long, global = true)]
    module_dir: Option<PathBuf>,

    /// Directory receiving generated files
    #[arg(long, global = true)]
    storage_dir: Option<PathBuf>,

    /// Directory holding the generated manifest
    #[arg(long, global = true)]
    intermediate_dir: Option<PathBuf>,

    /// Host module manifest used to locate class headers
    #[arg(long, global = true)]
    module_manifest: Option<PathBuf>,

    /// Schema package name
    #[arg(long, global = true)]
    proto_package: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate code for classes in a catalog
    Generate {
        /// Class catalog (JSON)
        #[arg(long)]
        catalog: PathBuf,

        /// Class ids to generate; defaults to every class in the catalog
        #[arg(long = "class")]
        classes: Vec<String>,

        /// Prefix of the Go import path of the schema package
        #[arg(long)]
        go_import_prefix: Option<String>,
    },
    /// List generated class names
    List {
        /// Scan header file names instead of reading the registry
        #[arg(long)]
        scan: bool,
    },
    /// List generated schema files
    ListSchemas,
    /// Remove the files of generated classes
    Remove {
        /// Generated class names
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Delete every file in the storage directory
    Purge,
    /// Show the manifest of the last run
    Manifest {
        /// Read this manifest instead of the one in the intermediate directory
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

fn init_tracing(verbose: u8) {
    let base_filter = match std::env::var("RUST_LOG") {
        Ok(filter) => filter,
        Err(_) => match verbose {
            0 => "warn".to_string(),
            1 => "warn,repligen_gen=info".to_string(),
            2 => "info,repligen_gen=debug".to_string(),
            _ => "debug,repligen_gen=trace".to_string(),
        },
    };

    let filter = EnvFilter::try_new(&base_filter).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_file(verbose >= 4)
                .with_line_number(verbose >= 4)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

fn load_config(cli: &Cli) -> Result<GeneratorConfig, GeneratorError> {
    let mut config = match (&cli.config, &cli.module_dir) {
        (Some(path), _) => GeneratorConfig::from_file(path)?,
        (None, Some(module_dir)) => GeneratorConfig::new(module_dir),
        (None, None) => {
            return Err(GeneratorError::ConfigError(
                "either --config or --module-dir is required".to_string(),
            ));
        }
    };

    if let Some(module_dir) = &cli.module_dir {
        config.module_dir = module_dir.clone();
    }
    if let Some(storage_dir) = &cli.storage_dir {
        config.storage_dir = Some(storage_dir.clone());
    }
    if let Some(intermediate_dir) = &cli.intermediate_dir {
        config.intermediate_dir = intermediate_dir.clone();
    }
    if let Some(module_manifest) = &cli.module_manifest {
        config.module_manifest = Some(module_manifest.clone());
    }
    if let Some(proto_package) = &cli.proto_package {
        config.proto_package = proto_package.clone();
    }
    config.validate()?;
    Ok(config)
}

fn load_catalog(path: &Path) -> Result<ClassCatalog, GeneratorError> {
    let text = fs::read_to_string(path)
        .map_err(|e| GeneratorError::CatalogError(format!("cannot read '{}': {e}", path.display())))?;
    serde_json::from_str(&text).map_err(|e| GeneratorError::CatalogError(e.to_string()))
}

fn run(cli: Cli) -> Result<ExitCode, GeneratorError> {
    let config = load_config(&cli)?;

    match cli.command {
        Command::Generate {
            catalog,
            classes,
            go_import_prefix,
        } => {
            let catalog = load_catalog(&catalog)?;
            let targets: Vec<ClassId> = if classes.is_empty() {
                catalog.ids().cloned().collect()
            } else {
                classes.into_iter().map(ClassId::from).collect()
            };

            let mut manager = GenerationManager::new(config, catalog);
            manager.start_generation(true)?;
            let report = manager.generate_all(&targets, go_import_prefix.as_deref());
            manager.stop_generation();
            let report = report?;

            for entry in &report.generated {
                println!("{} {} ({})", "generated".green(), entry.generated_name, entry.class_id);
            }
            for name in &report.removed_stale {
                println!("{} {name}", "removed stale".yellow());
            }
            for skip in &report.skipped {
                println!("{} {}: {}", "skipped".yellow(), skip.class, skip.reason);
            }
            for failure in &report.write_failures {
                eprintln!("{} {failure}", "failed".red());
            }
            println!(
                "{} classes, {} files written to {}",
                report.generated.len(),
                report.files_written,
                manager.storage_dir().display()
            );

            if report.write_failures.is_empty() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
        Command::List { scan } => {
            let manager = GenerationManager::new(config, ClassCatalog::default());
            let names = if scan {
                manager.scan_generated_class_names()?
            } else {
                manager.list_generated_class_names()?
            };
            for name in names {
                println!("{name}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::ListSchemas => {
            let manager = GenerationManager::new(config, ClassCatalog::default());
            for file in manager.list_generated_schema_files()? {
                println!("{file}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Remove { names } => {
            let manager = GenerationManager::new(config, ClassCatalog::default());
            let names: Vec<&str> = names.iter().map(String::as_str).collect();
            let report = manager.remove_generated_many(&names)?;
            for failure in &report.failures {
                eprintln!("{} {failure}", "failed".red());
            }
            println!("{} {} files", "removed".green(), report.files_removed);

            if report.is_complete() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
        Command::Purge => {
            let manager = GenerationManager::new(config, ClassCatalog::default());
            let removed = manager.purge_storage_directory()?;
            println!("{} {removed} files", "purged".green());
            Ok(ExitCode::SUCCESS)
        }
        Command::Manifest { path } => {
            let mut manager = GenerationManager::new(config, ClassCatalog::default());
            let manifest = match path {
                Some(path) => manager.load_manifest_from(&path)?,
                None => manager.load_latest_manifest()?,
            };
            println!("{} {}", "generated:".bold(), manifest.generated_time.to_rfc3339());
            println!("{} {}", "package:".bold(), manifest.proto_package_name);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}
