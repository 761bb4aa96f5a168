//! Code generation from decorated classes.
//!
//! [`generate`] drives one run: it decorates every target, emits a
//! [`ReplicatorCodeUnit`] per class, then builds the shared artifacts from
//! the whole set. Nothing here touches the filesystem; the
//! [`GenerationManager`](crate::manager::GenerationManager) writes the
//! bundle out.

mod channel_data;
mod code_writer;
mod global_struct;
mod registration;
mod replicator;
mod type_definitions;

use std::collections::{HashMap, HashSet};

use repligen_define::{ClassId, ClassMetadataProvider};
use tracing::{debug, warn};

use crate::decorator::{ClassDecorator, ClassDescriptor, DecorateOptions, IgnoreList};
use crate::errors::DecorateError;
use crate::naming::NameRegistry;
use crate::resolver::TypeMetadataResolver;

pub use channel_data::{
    ChannelDataCode, ChannelDataNames, generate_channel_data_processor,
    generate_channel_data_schema,
};
pub use code_writer::{CodeWriter, IndentGuard};
pub use global_struct::{collect_global_structs, generate_global_structs};
pub use registration::generate_registration;
pub use replicator::{ReplicatorCodeUnit, code_channel_data_merge, generate_replicator};
pub use type_definitions::{LOG_CATEGORY, generate_type_definitions};

use channel_data::{ClassForest, descendant_state_fields};

/// First line of every generated C++ file.
pub const GENERATED_BANNER: &str = "// Generated by repligen. Do not edit.";
/// First line of every generated schema file.
pub const GENERATED_PROTO_BANNER: &str = "// Generated by repligen. Do not edit.";

/// Returns the `go_package` option line, or `None` for an empty package.
pub fn go_package_option(go_package: &str) -> Option<String> {
    if go_package.is_empty() {
        None
    } else {
        Some(format!("option go_package = \"{go_package}\";"))
    }
}

/// Inputs of one run that are not per-class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateSettings {
    /// Module the generated code is compiled into.
    pub module_name: String,
    pub proto_package: String,
    /// Full Go import path of the schema package; empty to omit the option.
    pub go_package: String,
}

/// A target left out of a run, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSkip {
    pub class: ClassId,
    pub reason: DecorateError,
}

/// Everything produced by one run, before it is written.
#[derive(Debug, Clone)]
pub struct GeneratedCodeBundle {
    pub type_definitions_header: String,
    pub type_definitions_source: String,
    pub registration_header: String,
    /// One unit per generated class, in target order.
    pub replicators: Vec<ReplicatorCodeUnit>,
    /// Nearest generated ancestor of each replicator, by index.
    pub parents: Vec<Option<usize>>,
    pub global_struct_header: String,
    pub global_struct_proto: String,
    /// `None` when no class was generated.
    pub channel_data: Option<ChannelDataCode>,
    pub skipped: Vec<ClassSkip>,
}

/// For each descriptor, the index of its nearest ancestor that is also in
/// `descriptors`.
///
/// Super classes are looked up through `provider`; a chain that leaves the
/// provider's knowledge ends the walk. Cyclic chains are cut so the result is
/// always a forest.
pub fn classify_children<P>(descriptors: &[ClassDescriptor], provider: &P) -> Vec<Option<usize>>
where
    P: ClassMetadataProvider + ?Sized,
{
    let index_of: HashMap<&ClassId, usize> = descriptors
        .iter()
        .enumerate()
        .map(|(i, d)| (d.id(), i))
        .collect();

    let mut parents: Vec<Option<usize>> = descriptors
        .iter()
        .map(|desc| {
            let mut visited = HashSet::from([desc.id().clone()]);
            let mut next = desc.class.super_class.clone();
            while let Some(id) = next {
                if !visited.insert(id.clone()) {
                    return None;
                }
                if let Some(&index) = index_of.get(&id) {
                    return Some(index);
                }
                next = provider.class_metadata(&id).and_then(|c| c.super_class);
            }
            None
        })
        .collect();

    for start in 0..parents.len() {
        let mut steps = 0;
        let mut cursor = parents[start];
        while let Some(i) = cursor {
            if i == start {
                warn!(class = %descriptors[start].id(), "Cyclic class hierarchy, treating as top-level");
                parents[start] = None;
                break;
            }
            steps += 1;
            if steps > parents.len() {
                break;
            }
            cursor = parents[i];
        }
    }

    parents
}

/// Leaves out classes that use a struct whose schema message has the name of
/// a state message or of the channel-data message. Every generated message
/// shares one package, so such a struct cannot be emitted next to them.
fn drop_schema_name_clashes(
    descriptors: Vec<ClassDescriptor>,
    channel_names: &ChannelDataNames,
    skipped: &mut Vec<ClassSkip>,
) -> Vec<ClassDescriptor> {
    let mut reserved: HashSet<String> = descriptors.iter().map(|d| d.proto_state_message_type()).collect();
    reserved.insert(channel_names.message_name.clone());

    descriptors
        .into_iter()
        .filter(|desc| {
            let clash = collect_global_structs(std::slice::from_ref(desc))
                .into_iter()
                .map(|st| st.message_name())
                .find(|message| reserved.contains(message));
            match clash {
                Some(message) => {
                    warn!(class = %desc.id(), %message, "Struct message clashes with a generated message");
                    skipped.push(ClassSkip {
                        class: desc.id().clone(),
                        reason: DecorateError::SchemaNameClash {
                            class: desc.original_name().to_string(),
                            message,
                        },
                    });
                    false
                }
                None => true,
            }
        })
        .collect()
}

/// Runs one generation over `targets`, in order.
///
/// Classes that cannot be decorated are reported in
/// [`GeneratedCodeBundle::skipped`] and do not affect the others. `names` is
/// reset first, so identical inputs give identical names.
pub fn generate<P>(
    targets: &[ClassId],
    provider: &P,
    resolver: &TypeMetadataResolver,
    ignore: &IgnoreList,
    names: &mut NameRegistry,
    settings: &GenerateSettings,
) -> GeneratedCodeBundle
where
    P: ClassMetadataProvider + ?Sized,
{
    names.reset();
    let options = DecorateOptions {
        proto_package: settings.proto_package.clone(),
        go_package: settings.go_package.clone(),
        ..DecorateOptions::default()
    };

    let mut descriptors = Vec::with_capacity(targets.len());
    let mut skipped = Vec::new();
    {
        let mut decorator = ClassDecorator::new(resolver, ignore, names);
        for id in targets {
            let result = provider
                .class_metadata(id)
                .ok_or_else(|| DecorateError::MetadataUnavailable(id.clone()))
                .and_then(|class| decorator.decorate(&class, &options));
            match result {
                Ok(desc) => descriptors.push(desc),
                Err(reason) => {
                    debug!(class = %id, %reason, "Skipping class");
                    skipped.push(ClassSkip {
                        class: id.clone(),
                        reason,
                    });
                }
            }
        }
    }

    let channel_names = ChannelDataNames::for_module(&settings.module_name, &settings.proto_package);
    let descriptors = drop_schema_name_clashes(descriptors, &channel_names, &mut skipped);

    let parents = classify_children(&descriptors, provider);
    let forest = ClassForest::new(&parents);
    let mut replicators: Vec<_> = descriptors.iter().map(generate_replicator).collect();
    for (i, unit) in replicators.iter_mut().enumerate() {
        let descendants = descendant_state_fields(&descriptors, &forest, i);
        if !descendants.is_empty() {
            unit.merge_code = code_channel_data_merge(&descriptors[i], &descendants);
        }
    }

    // Both fail only on an empty class list.
    let channel_data = generate_channel_data_processor(&replicators, &parents, &channel_names)
        .and_then(|header_code| {
            let proto_code =
                generate_channel_data_schema(&descriptors, &parents, &channel_names, &settings.go_package)?;
            Ok(ChannelDataCode {
                names: channel_names.clone(),
                header_code,
                proto_code,
            })
        })
        .ok();

    let (type_definitions_header, type_definitions_source) = generate_type_definitions(&descriptors);
    let registration_header =
        generate_registration(&replicators, channel_data.as_ref().map(|c| &c.names));
    let (global_struct_header, global_struct_proto) =
        generate_global_structs(&descriptors, &settings.proto_package, &settings.go_package);

    GeneratedCodeBundle {
        type_definitions_header,
        type_definitions_source,
        registration_header,
        replicators,
        parents,
        global_struct_header,
        global_struct_proto,
        channel_data,
        skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{actor, fixture_resolver};
    use repligen_define::{ClassCatalog, PropertyMetadata, PropertyType, StructMetadata};
    use tempfile::TempDir;

    fn settings() -> GenerateSettings {
        GenerateSettings {
            module_name: "Game".to_string(),
            proto_package: "channeldgenpb".to_string(),
            go_package: String::new(),
        }
    }

    #[test]
    fn go_package_option_is_omitted_when_empty() {
        assert_eq!(go_package_option(""), None);
        assert_eq!(
            go_package_option("example.com/pb").as_deref(),
            Some("option go_package = \"example.com/pb\";")
        );
    }

    #[test]
    fn classify_walks_through_ungenerated_ancestors() {
        let dir = TempDir::new().unwrap();
        let catalog = ClassCatalog::new(vec![
            actor("/Script/Game.Door", "Door"),
            actor("/Script/Game.LockedDoor", "LockedDoor").with_super_class("/Script/Game.Door"),
            actor("/Script/Game.VaultDoor", "VaultDoor").with_super_class("/Script/Game.LockedDoor"),
        ])
        .unwrap();
        let resolver = fixture_resolver(dir.path(), &["ADoor", "AVaultDoor"]);
        let mut names = NameRegistry::default();

        let bundle = generate(
            &[ClassId::from("/Script/Game.VaultDoor"), ClassId::from("/Script/Game.Door")],
            &catalog,
            &resolver,
            &IgnoreList::new(),
            &mut names,
            &settings(),
        );

        assert_eq!(bundle.parents, [Some(1), None]);
        assert!(bundle.replicators[1].merge_code.contains("mutable_vaultdoorstates()->erase"));
    }

    #[test]
    fn cyclic_hierarchy_is_cut() {
        let dir = TempDir::new().unwrap();
        let catalog = ClassCatalog::new(vec![
            actor("/Script/Game.A", "A").with_super_class("/Script/Game.B"),
            actor("/Script/Game.B", "B").with_super_class("/Script/Game.A"),
        ])
        .unwrap();
        let resolver = fixture_resolver(dir.path(), &["AA", "AB"]);
        let mut names = NameRegistry::default();

        let bundle = generate(
            &[ClassId::from("/Script/Game.A"), ClassId::from("/Script/Game.B")],
            &catalog,
            &resolver,
            &IgnoreList::new(),
            &mut names,
            &settings(),
        );

        assert!(bundle.parents.iter().any(Option::is_none));
        assert!(bundle.channel_data.is_some());
    }

    #[test]
    fn unknown_and_unresolvable_classes_are_skipped() {
        let dir = TempDir::new().unwrap();
        let catalog = ClassCatalog::new(vec![
            actor("/Script/Game.Door", "Door"),
            actor("/Script/Game.Lamp", "Lamp"),
        ])
        .unwrap();
        let resolver = fixture_resolver(dir.path(), &["ADoor"]);
        let mut names = NameRegistry::default();

        let bundle = generate(
            &[
                ClassId::from("/Script/Game.Door"),
                ClassId::from("/Script/Game.Lamp"),
                ClassId::from("/Script/Game.Missing"),
            ],
            &catalog,
            &resolver,
            &IgnoreList::new(),
            &mut names,
            &settings(),
        );

        assert_eq!(bundle.replicators.len(), 1);
        assert_eq!(bundle.skipped.len(), 2);
        assert!(matches!(bundle.skipped[0].reason, DecorateError::HeaderNotFound { .. }));
        assert_eq!(
            bundle.skipped[1].reason,
            DecorateError::MetadataUnavailable(ClassId::from("/Script/Game.Missing"))
        );
    }

    #[test]
    fn struct_named_like_a_state_message_skips_its_user() {
        let dir = TempDir::new().unwrap();
        let door_state = StructMetadata::new(
            "FDoorState",
            vec![PropertyMetadata::replicated("Angle", PropertyType::Float)],
        );
        let catalog = ClassCatalog::new(vec![
            actor("/Script/Game.Door", "Door"),
            actor("/Script/Game.Lamp", "Lamp")
                .with_property(PropertyMetadata::replicated("Mirror", PropertyType::Struct(door_state))),
        ])
        .unwrap();
        let resolver = fixture_resolver(dir.path(), &["ADoor", "ALamp"]);
        let mut names = NameRegistry::default();

        let bundle = generate(
            &[ClassId::from("/Script/Game.Door"), ClassId::from("/Script/Game.Lamp")],
            &catalog,
            &resolver,
            &IgnoreList::new(),
            &mut names,
            &settings(),
        );

        assert_eq!(bundle.replicators.len(), 1);
        assert_eq!(bundle.replicators[0].descriptor.generated_name, "Door");
        assert_eq!(
            bundle.skipped[0].reason,
            DecorateError::SchemaNameClash {
                class: "Lamp".to_string(),
                message: "DoorState".to_string(),
            }
        );
        assert!(!bundle.global_struct_proto.contains("message DoorState"));
    }

    #[test]
    fn struct_named_like_channel_data_is_rejected() {
        let dir = TempDir::new().unwrap();
        let clash = StructMetadata::new("FGameChannelData", vec![]);
        let catalog = ClassCatalog::new(vec![
            actor("/Script/Game.Door", "Door")
                .with_property(PropertyMetadata::replicated("Snapshot", PropertyType::Struct(clash))),
        ])
        .unwrap();
        let resolver = fixture_resolver(dir.path(), &["ADoor"]);
        let mut names = NameRegistry::default();

        let bundle = generate(
            &[ClassId::from("/Script/Game.Door")],
            &catalog,
            &resolver,
            &IgnoreList::new(),
            &mut names,
            &settings(),
        );

        assert!(bundle.replicators.is_empty());
        assert!(matches!(
            &bundle.skipped[0].reason,
            DecorateError::SchemaNameClash { message, .. } if message == "GameChannelData"
        ));
    }

    #[test]
    fn empty_targets_produce_shared_files_only() {
        let dir = TempDir::new().unwrap();
        let catalog = ClassCatalog::new(Vec::new()).unwrap();
        let resolver = fixture_resolver(dir.path(), &[]);
        let mut names = NameRegistry::default();

        let bundle = generate(&[], &catalog, &resolver, &IgnoreList::new(), &mut names, &settings());

        assert!(bundle.replicators.is_empty());
        assert!(bundle.channel_data.is_none());
        assert!(bundle.registration_header.contains("static void RegisterAll()"));
        assert!(!bundle.registration_header.contains("RegisterChannelDataProcessor"));
    }
}
