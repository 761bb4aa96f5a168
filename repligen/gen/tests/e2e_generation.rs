//! End-to-end tests: catalog and module headers in, storage directory out.
//!
//! Each test builds a throwaway module on disk, runs the manager and checks
//! the files it leaves behind.

use std::fs;
use std::path::{Path, PathBuf};

use repligen_define::{
    ClassCatalog, ClassId, ClassKind, ClassMetadata, ParamMetadata, PropertyMetadata,
    PropertyType, RpcKind, RpcMetadata, StructMetadata,
};
use repligen_gen::config::GeneratorConfig;
use repligen_gen::errors::DecorateError;
use repligen_gen::manager::GenerationManager;
use repligen_gen::manifest::GeneratedManifest;
use serde_json::json;
use tempfile::TempDir;

/// Writes one header per prefixed class name and a module manifest listing them.
fn write_module(root: &Path, cpp_names: &[&str]) -> PathBuf {
    let base = root.join("Game");
    let public = base.join("Public");
    fs::create_dir_all(&public).unwrap();

    let mut headers = Vec::new();
    for name in cpp_names {
        let header = public.join(format!("{}.h", &name[1..]));
        fs::write(&header, format!("UCLASS()\nclass GAME_API {name} : public AActor\n{{\n}};\n")).unwrap();
        headers.push(header);
    }

    let manifest = root.join("ModuleManifest.json");
    let doc = json!({
        "Modules": [{
            "Name": "Game",
            "BaseDirectory": base,
            "IncludeBase": public,
            "PublicHeaders": headers,
        }]
    });
    fs::write(&manifest, doc.to_string()).unwrap();
    manifest
}

fn manager(root: &Path, cpp_names: &[&str], classes: Vec<ClassMetadata>) -> GenerationManager<ClassCatalog> {
    let manifest = write_module(root, cpp_names);
    let config = GeneratorConfig {
        intermediate_dir: root.join("Intermediate"),
        module_manifest: Some(manifest),
        ..GeneratorConfig::new(root.join("Game"))
    };
    GenerationManager::new(config, ClassCatalog::new(classes).unwrap())
}

fn actor(id: &str, name: &str) -> ClassMetadata {
    ClassMetadata::new(id, name, ClassKind::Actor).with_module("Game")
}

fn ids(ids: &[&str]) -> Vec<ClassId> {
    ids.iter().copied().map(ClassId::from).collect()
}

fn read(dir: &Path, file: &str) -> String {
    fs::read_to_string(dir.join(file)).unwrap_or_else(|e| panic!("{file}: {e}"))
}

#[test]
fn same_named_classes_get_distinct_artifacts() {
    let dir = TempDir::new().unwrap();
    let mut manager = manager(
        dir.path(),
        &["APawn"],
        vec![
            actor("/Script/Engine.Pawn", "Pawn"),
            actor("/Script/Game.Pawn", "Pawn").with_property(PropertyMetadata::replicated("Speed", PropertyType::Float)),
        ],
    );

    let report = manager
        .generate_all(&ids(&["/Script/Engine.Pawn", "/Script/Game.Pawn"]), None)
        .unwrap();

    assert!(report.is_complete());
    let storage = manager.storage_dir();
    for file in [
        "ChanneldPawnReplicator.h",
        "ChanneldPawnReplicator.cpp",
        "Pawn.proto",
        "ChanneldPawn_2Replicator.h",
        "ChanneldPawn_2Replicator.cpp",
        "Pawn_2.proto",
    ] {
        assert!(storage.join(file).is_file(), "missing {file}");
    }
    assert!(read(&storage, "Pawn_2.proto").contains("message Pawn_2State {"));
    assert_eq!(manager.list_generated_class_names().unwrap(), ["Pawn", "Pawn_2"]);
}

#[test]
fn repeated_runs_are_identical() {
    let dir = TempDir::new().unwrap();
    let classes = vec![
        actor("/Script/Game.Door", "Door").with_property(PropertyMetadata::replicated("bOpen", PropertyType::Bool)),
        actor("/Script/Game.VaultDoor", "VaultDoor").with_super_class("/Script/Game.Door"),
    ];
    let mut manager = manager(dir.path(), &["ADoor", "AVaultDoor"], classes);
    let targets = ids(&["/Script/Game.Door", "/Script/Game.VaultDoor"]);
    let storage = manager.storage_dir();

    manager.generate_all(&targets, None).unwrap();
    let first = (read(&storage, "ChannelData_Game.h"), read(&storage, "Door.proto"));
    manager.generate_all(&targets, None).unwrap();
    let second = (read(&storage, "ChannelData_Game.h"), read(&storage, "Door.proto"));

    assert_eq!(first, second);
}

#[test]
fn ignored_class_is_skipped_and_others_proceed() {
    let dir = TempDir::new().unwrap();
    let mut manager = manager(
        dir.path(),
        &["ADoor", "AGhost"],
        vec![actor("/Script/Game.Door", "Door"), actor("/Script/Game.Ghost", "Ghost")],
    );
    manager.ignore_list_mut().ignore_class("/Script/Game.Ghost");

    let report = manager
        .generate_all(&ids(&["/Script/Game.Ghost", "/Script/Game.Door"]), None)
        .unwrap();

    assert_eq!(report.generated.len(), 1);
    assert_eq!(report.generated[0].generated_name, "Door");
    assert!(matches!(&report.skipped[0].reason, DecorateError::Ignored { class, .. } if class == "Ghost"));
    assert!(!manager.storage_dir().join("ChanneldGhostReplicator.h").exists());
    assert!(manager.config().manifest_path().is_file());
}

#[test]
fn child_state_nests_inside_parent_group() {
    let dir = TempDir::new().unwrap();
    let mut manager = manager(
        dir.path(),
        &["AA", "AB"],
        vec![
            actor("/Script/Game.A", "A"),
            actor("/Script/Game.B", "B").with_super_class("/Script/Game.A"),
        ],
    );

    manager.generate_all(&ids(&["/Script/Game.A", "/Script/Game.B"]), None).unwrap();

    let storage = manager.storage_dir();
    let proto = read(&storage, "ChannelData_Game.proto");
    assert!(proto.contains(
        "  message AGroup {\n    map<uint32, channeldgenpb.AState> astates = 1;\n    map<uint32, channeldgenpb.BState> bstates = 2;\n  }\n  AGroup agroup = 1;\n"
    ));
    assert!(!proto.contains("BGroup"));

    let header = read(&storage, "ChannelData_Game.h");
    let parent = header.find("TargetClass == AA::StaticClass()").unwrap();
    let child = header.find("TargetClass == AB::StaticClass()").unwrap();
    assert!(parent < child);
    assert!(header.contains("DstGroup->mutable_bstates()->erase(Pair.first);"));
}

#[test]
fn empty_target_list_writes_shared_files_only() {
    let dir = TempDir::new().unwrap();
    let mut manager = manager(dir.path(), &[], vec![]);

    let report = manager.generate_all(&[], None).unwrap();

    assert!(report.generated.is_empty());
    let storage = manager.storage_dir();
    assert!(storage.join("ChanneldReplicatorRegistration.h").is_file());
    assert!(storage.join("ChanneldReplicatorTypeDefinitions.h").is_file());
    assert!(!storage.join("ChannelData_Game.h").exists());
    assert!(manager.list_generated_class_names().unwrap().is_empty());
}

#[test]
fn every_generated_class_has_its_triple() {
    let dir = TempDir::new().unwrap();
    let names = ["Door", "Lamp", "Crate", "Switch"];
    let cpp: Vec<String> = names.iter().map(|n| format!("A{n}")).collect();
    let cpp_refs: Vec<&str> = cpp.iter().map(String::as_str).collect();
    let classes = names
        .iter()
        .map(|n| actor(&format!("/Script/Game.{n}"), n))
        .collect();
    let mut manager = manager(dir.path(), &cpp_refs, classes);
    let targets: Vec<ClassId> = names.iter().map(|n| ClassId::new(format!("/Script/Game.{n}"))).collect();

    manager.generate_all(&targets, None).unwrap();

    let listed = manager.list_generated_class_names().unwrap();
    assert_eq!(listed.len(), names.len());
    let storage = manager.storage_dir();
    for name in &listed {
        assert!(storage.join(format!("Channeld{name}Replicator.h")).is_file());
        assert!(storage.join(format!("Channeld{name}Replicator.cpp")).is_file());
        assert!(storage.join(format!("{name}.proto")).is_file());
    }
    let registration = read(&storage, "ChanneldReplicatorRegistration.h");
    assert_eq!(registration.matches("RegisterReplicator<").count(), names.len());
}

#[test]
fn remove_then_list_excludes_class() {
    let dir = TempDir::new().unwrap();
    let mut manager = manager(
        dir.path(),
        &["ADoor", "ALamp"],
        vec![actor("/Script/Game.Door", "Door"), actor("/Script/Game.Lamp", "Lamp")],
    );
    manager
        .generate_all(&ids(&["/Script/Game.Door", "/Script/Game.Lamp"]), None)
        .unwrap();

    manager.remove_generated("Lamp").unwrap();

    assert_eq!(manager.list_generated_class_names().unwrap(), ["Door"]);
    assert_eq!(manager.scan_generated_class_names().unwrap(), ["Door"]);
    assert!(!manager.list_generated_schema_files().unwrap().contains(&"Lamp.proto".to_string()));
}

#[test]
fn narrower_rerun_converges_to_new_class_set() {
    let dir = TempDir::new().unwrap();
    let mut manager = manager(
        dir.path(),
        &["ADoor", "ALamp"],
        vec![actor("/Script/Game.Door", "Door"), actor("/Script/Game.Lamp", "Lamp")],
    );
    manager
        .generate_all(&ids(&["/Script/Game.Door", "/Script/Game.Lamp"]), None)
        .unwrap();

    manager.generate_all(&ids(&["/Script/Game.Door"]), None).unwrap();

    assert_eq!(manager.scan_generated_class_names().unwrap(), ["Door"]);
    assert_eq!(manager.list_generated_class_names().unwrap(), ["Door"]);
    let schemas = manager.list_generated_schema_files().unwrap();
    assert!(!schemas.contains(&"Lamp.proto".to_string()));
    assert!(!read(&manager.storage_dir(), "ChannelData_Game.h").contains("ALamp"));

    manager.generate_all(&[], None).unwrap();

    let storage = manager.storage_dir();
    assert!(!storage.join("ChannelData_Game.h").exists());
    assert!(!storage.join("ChannelData_Game.proto").exists());
    assert!(manager.scan_generated_class_names().unwrap().is_empty());
    assert!(manager.list_generated_class_names().unwrap().is_empty());
}

#[test]
fn manifest_round_trips_and_missing_load_keeps_previous() {
    let dir = TempDir::new().unwrap();
    let mut manager = manager(dir.path(), &["ADoor"], vec![actor("/Script/Game.Door", "Door")]);

    let report = manager.generate_all(&ids(&["/Script/Game.Door"]), None).unwrap();
    let loaded = manager.load_latest_manifest().unwrap().clone();

    assert_eq!(loaded, report.manifest);
    assert_eq!(loaded.proto_package_name, "channeldgenpb");

    let err = manager.load_manifest_from(&dir.path().join("absent.json")).unwrap_err();
    assert!(!err.to_string().is_empty());
    assert_eq!(manager.latest_manifest(), Some(&loaded));

    let explicit = dir.path().join("Intermediate/Copy.json");
    manager.save_manifest_to(&GeneratedManifest::now("otherpb"), &explicit).unwrap();
    assert_eq!(manager.load_manifest_from(&explicit).unwrap().proto_package_name, "otherpb");
}

#[test]
fn remote_calls_and_structs_reach_shared_files() {
    let dir = TempDir::new().unwrap();
    let hit = StructMetadata::new(
        "FHitInfo",
        vec![
            PropertyMetadata::replicated("Location", PropertyType::Vector),
            PropertyMetadata::replicated("Damage", PropertyType::Float),
        ],
    );
    let class = actor("/Script/Game.Turret", "Turret")
        .with_property(PropertyMetadata::replicated("LastHit", PropertyType::Struct(hit)))
        .with_rpc(
            RpcMetadata::new("ServerFire", RpcKind::Server)
                .with_param(ParamMetadata::new("Target", PropertyType::Vector)),
        );
    let mut manager = manager(dir.path(), &["ATurret"], vec![class]);

    let report = manager.generate_all(&ids(&["/Script/Game.Turret"]), None).unwrap();

    assert!(report.is_complete());
    let storage = manager.storage_dir();
    assert!(read(&storage, "ChanneldGlobalStruct.proto").contains("message HitInfo {"));
    assert!(read(&storage, "ChanneldGlobalStruct.h").contains("class FChanneldHitInfoHelper"));
    assert!(read(&storage, "ChanneldReplicatorTypeDefinitions.h").contains("struct ServerFireParams"));
    let proto = read(&storage, "Turret.proto");
    assert!(proto.contains("import \"ChanneldGlobalStruct.proto\";"));
    assert!(proto.contains("message ServerFireParams {"));
}

#[test]
fn unknown_class_is_reported_not_fatal() {
    let dir = TempDir::new().unwrap();
    let mut manager = manager(dir.path(), &["ADoor"], vec![actor("/Script/Game.Door", "Door")]);

    let report = manager
        .generate_all(&ids(&["/Script/Game.Nope", "/Script/Game.Door"]), None)
        .unwrap();

    assert!(!report.is_complete());
    assert_eq!(
        report.skipped[0].reason,
        DecorateError::MetadataUnavailable(ClassId::from("/Script/Game.Nope"))
    );
    assert_eq!(report.generated.len(), 1);
}
