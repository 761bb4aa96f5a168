//! Channel-data aggregation: one message holding the state of every
//! generated class, and the processor that merges and addresses it.
//!
//! Classes are grouped under their top-level generated ancestor. Each
//! top-level class owns a `<Name>Group` sub-message holding its own state
//! field and the fields of all its generated descendants, and the processor
//! nests a child's code block inside its parent's block.
//!
//! ```text
//! message GameChannelData {
//!   message PawnGroup {
//!     map<uint32, channeldgenpb.PawnState> pawnstates = 1;
//!     map<uint32, channeldgenpb.CharacterState> characterstates = 2;
//!   }
//!   PawnGroup pawngroup = 1;
//! }
//! ```

use std::collections::BTreeSet;

use crate::cw_line;
use crate::decorator::ClassDescriptor;
use crate::errors::GeneratorError;
use crate::layout::{
    PROTO_HEADER_EXTENSION, channel_data_header_file_name, channel_data_proto_file_name,
};

use super::replicator::ReplicatorCodeUnit;
use super::{CodeWriter, GENERATED_BANNER, GENERATED_PROTO_BANNER, go_package_option};

/// Names of the channel-data artifacts for one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelDataNames {
    pub module: String,
    pub proto_package: String,
    /// Schema message, e.g. `GameChannelData`.
    pub message_name: String,
    /// C++ namespace of the processor, e.g. `gameprocessor`.
    pub namespace: String,
    /// C++ processor class, e.g. `FGameChannelDataProcessor`.
    pub processor_class: String,
    pub header_file_name: String,
    pub proto_file_name: String,
}

impl ChannelDataNames {
    /// Derives every name from the module name.
    ///
    /// ```
    /// use repligen_gen::codegen::ChannelDataNames;
    ///
    /// let names = ChannelDataNames::for_module("Game", "channeldgenpb");
    /// assert_eq!(names.message_name, "GameChannelData");
    /// assert_eq!(names.namespace, "gameprocessor");
    /// assert_eq!(names.header_file_name, "ChannelData_Game.h");
    /// ```
    pub fn for_module(module: &str, proto_package: &str) -> Self {
        Self {
            module: module.to_string(),
            proto_package: proto_package.to_string(),
            message_name: format!("{module}ChannelData"),
            namespace: format!("{}processor", module.to_lowercase()),
            processor_class: format!("F{module}ChannelDataProcessor"),
            header_file_name: channel_data_header_file_name(module),
            proto_file_name: channel_data_proto_file_name(module),
        }
    }

    fn proto_header_file_name(&self) -> String {
        format!("ChannelData_{}{PROTO_HEADER_EXTENSION}", self.module)
    }

    fn cpp_message_type(&self) -> String {
        format!("{}::{}", self.proto_package, self.message_name)
    }
}

/// Generated channel-data processor and schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelDataCode {
    pub names: ChannelDataNames,
    pub header_code: String,
    pub proto_code: String,
}

/// Parent/child forest over generation-order indices.
pub(crate) struct ClassForest {
    pub roots: Vec<usize>,
    pub children: Vec<Vec<usize>>,
}

impl ClassForest {
    /// Builds the forest from each class's parent index.
    pub fn new(parents: &[Option<usize>]) -> Self {
        let mut roots = Vec::new();
        let mut children = vec![Vec::new(); parents.len()];
        for (i, parent) in parents.iter().enumerate() {
            match parent {
                Some(p) if *p < parents.len() && *p != i => children[*p].push(i),
                _ => roots.push(i),
            }
        }
        Self { roots, children }
    }

    /// Descendants of `index` in pre-order, excluding `index` itself.
    pub fn descendants(&self, index: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.children[index].iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            if out.contains(&next) || next == index {
                continue;
            }
            out.push(next);
            stack.extend(self.children[next].iter().rev().copied());
        }
        out
    }
}

fn group_message_name(desc: &ClassDescriptor) -> String {
    format!("{}Group", desc.generated_name)
}

fn group_field_name(desc: &ClassDescriptor) -> String {
    format!("{}group", desc.generated_name.to_lowercase())
}

/// Channel-data fields of the non-singleton descendants of `index`.
pub(crate) fn descendant_state_fields(
    descriptors: &[ClassDescriptor],
    forest: &ClassForest,
    index: usize,
) -> Vec<String> {
    forest
        .descendants(index)
        .into_iter()
        .map(|i| &descriptors[i])
        .filter(|d| !d.is_singleton())
        .map(|d| d.channel_data_field_name())
        .collect()
}

/// Generates the channel-data processor header.
///
/// `parents[i]` is the index of the nearest generated ancestor of
/// `units[i]`, as computed by [`classify_children`](super::classify_children).
///
/// ## Errors
///
/// Returns [`GeneratorError::EmptyTargets`] when `units` is empty.
pub fn generate_channel_data_processor(
    units: &[ReplicatorCodeUnit],
    parents: &[Option<usize>],
    names: &ChannelDataNames,
) -> Result<String, GeneratorError> {
    if units.is_empty() {
        return Err(GeneratorError::EmptyTargets("channel data processor"));
    }
    let forest = ClassForest::new(parents);
    let message = names.cpp_message_type();
    let mut w = CodeWriter::cpp();

    w.line(GENERATED_BANNER);
    w.blank_line();
    w.line("#pragma once");
    w.blank_line();
    w.line("#include \"CoreMinimal.h\"");
    w.line("#include \"ChannelDataInterfaces.h\"");
    w.line("#include \"ChanneldReplication.h\"");
    cw_line!(w, "#include \"{}\"", names.proto_header_file_name());
    let includes: BTreeSet<_> = units
        .iter()
        .map(|u| u.descriptor.code_include_class_header())
        .collect();
    for include in includes {
        w.line(include);
    }
    w.blank_line();

    w.block(&format!("namespace {}", names.namespace), |w| {
        for unit in units {
            w.line(&unit.path_var_decl);
        }
        w.blank_line();

        let class_header = format!("class {} : public IChannelDataProcessor", names.processor_class);
        w.block_with_tail(&class_header, "};", |w| {
            w.line("public:");
            w.block(
                "virtual bool Merge(const google::protobuf::Message* SrcMsg, google::protobuf::Message* DstMsg) override",
                |w| {
                    cw_line!(w, "auto Src = static_cast<const {message}*>(SrcMsg);");
                    cw_line!(w, "auto Dst = static_cast<{message}*>(DstMsg);");
                    for &root in &forest.roots {
                        let group = group_field_name(&units[root].descriptor);
                        cw_line!(w, "if (Src->has_{group}())");
                        w.block("", |w| {
                            cw_line!(w, "const auto& SrcGroup = Src->{group}();");
                            cw_line!(w, "auto DstGroup = Dst->mutable_{group}();");
                            write_nested(w, units, &forest, root, Fragment::Merge);
                        });
                    }
                    w.line("return true;");
                },
            );
            w.blank_line();

            w.block(
                "virtual const google::protobuf::Message* GetStateFromChannelData(google::protobuf::Message* ChannelData, UClass* TargetClass, uint32 NetGUID, bool& bIsRemoved) override",
                |w| {
                    cw_line!(w, "auto TypedChannelData = static_cast<{message}*>(ChannelData);");
                    for &root in &forest.roots {
                        let group = group_field_name(&units[root].descriptor);
                        w.block("", |w| {
                            cw_line!(w, "auto Group = TypedChannelData->mutable_{group}();");
                            write_nested(w, units, &forest, root, Fragment::GetState);
                        });
                    }
                    w.line("bIsRemoved = false;");
                    w.line("return nullptr;");
                },
            );
            w.blank_line();

            w.block(
                "virtual void SetStateToChannelData(const google::protobuf::Message* State, google::protobuf::Message* ChannelData, UClass* TargetClass, uint32 NetGUID) override",
                |w| {
                    cw_line!(w, "auto TypedChannelData = static_cast<{message}*>(ChannelData);");
                    for &root in &forest.roots {
                        let group = group_field_name(&units[root].descriptor);
                        w.block("", |w| {
                            cw_line!(w, "auto Group = TypedChannelData->mutable_{group}();");
                            write_nested(w, units, &forest, root, Fragment::SetState);
                        });
                    }
                },
            );
        });
    });

    Ok(w.finish())
}

#[derive(Clone, Copy)]
enum Fragment {
    Merge,
    GetState,
    SetState,
}

impl Fragment {
    fn of(self, unit: &ReplicatorCodeUnit) -> &str {
        match self {
            Fragment::Merge => &unit.merge_code,
            Fragment::GetState => &unit.get_state_code,
            Fragment::SetState => &unit.set_state_code,
        }
    }
}

/// Writes the fragment of `index`, then each child's block nested inside.
fn write_nested(
    w: &mut CodeWriter,
    units: &[ReplicatorCodeUnit],
    forest: &ClassForest,
    index: usize,
    fragment: Fragment,
) {
    cw_line!(w, "// {}", units[index].descriptor.generated_name);
    w.fragment(fragment.of(&units[index]));
    for &child in &forest.children[index] {
        w.block("", |w| write_nested(w, units, forest, child, fragment));
    }
}

/// Generates the channel-data schema.
///
/// ## Errors
///
/// Returns [`GeneratorError::EmptyTargets`] when `descriptors` is empty.
pub fn generate_channel_data_schema(
    descriptors: &[ClassDescriptor],
    parents: &[Option<usize>],
    names: &ChannelDataNames,
    go_package: &str,
) -> Result<String, GeneratorError> {
    if descriptors.is_empty() {
        return Err(GeneratorError::EmptyTargets("channel data schema"));
    }
    let forest = ClassForest::new(parents);
    let mut w = CodeWriter::proto();

    w.line(GENERATED_PROTO_BANNER);
    w.line("syntax = \"proto3\";");
    w.blank_line();
    cw_line!(w, "package {};", names.proto_package);
    w.blank_line();
    for desc in descriptors {
        cw_line!(w, "import \"{}.proto\";", desc.generated_name);
    }
    if let Some(option) = go_package_option(go_package) {
        w.blank_line();
        w.line(option);
    }
    w.blank_line();

    w.braced(&format!("message {}", names.message_name), |w| {
        for (ordinal, &root) in forest.roots.iter().enumerate() {
            let root_desc = &descriptors[root];
            let members = std::iter::once(root).chain(forest.descendants(root));

            w.braced(&format!("message {}", group_message_name(root_desc)), |w| {
                for (i, member) in members.enumerate() {
                    let desc = &descriptors[member];
                    let state = format!("{}.{}", desc.proto_package, desc.proto_state_message_type());
                    let field = desc.channel_data_field_name();
                    if desc.is_singleton() {
                        cw_line!(w, "{state} {field} = {};", i + 1);
                    } else {
                        cw_line!(w, "map<uint32, {state}> {field} = {};", i + 1);
                    }
                }
            });
            cw_line!(
                w,
                "{} {} = {};",
                group_message_name(root_desc),
                group_field_name(root_desc),
                ordinal + 1
            );
        }
    });

    Ok(w.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::generate_replicator;
    use crate::test_utils::{actor, decorate_all};
    use tempfile::TempDir;

    #[test]
    fn forest_descendants_are_preorder() {
        // 0 <- 1 <- 3, 0 <- 2
        let forest = ClassForest::new(&[None, Some(0), Some(0), Some(1)]);

        assert_eq!(forest.roots, [0]);
        assert_eq!(forest.descendants(0), [1, 3, 2]);
        assert!(forest.descendants(3).is_empty());
    }

    #[test]
    fn empty_input_is_rejected() {
        let names = ChannelDataNames::for_module("Game", "channeldgenpb");

        assert!(matches!(
            generate_channel_data_processor(&[], &[], &names),
            Err(GeneratorError::EmptyTargets(_))
        ));
        assert!(matches!(
            generate_channel_data_schema(&[], &[], &names, ""),
            Err(GeneratorError::EmptyTargets(_))
        ));
    }

    #[test]
    fn children_share_their_root_group() {
        let dir = TempDir::new().unwrap();
        let descs = decorate_all(
            dir.path(),
            vec![
                actor("/Script/Game.Door", "Door"),
                actor("/Script/Game.Lamp", "Lamp"),
                actor("/Script/Game.VaultDoor", "VaultDoor"),
            ],
        );
        let names = ChannelDataNames::for_module("Game", "channeldgenpb");

        let proto = generate_channel_data_schema(&descs, &[None, None, Some(0)], &names, "").unwrap();

        let expected = "\
message GameChannelData {
  message DoorGroup {
    map<uint32, channeldgenpb.DoorState> doorstates = 1;
    map<uint32, channeldgenpb.VaultDoorState> vaultdoorstates = 2;
  }
  DoorGroup doorgroup = 1;
  message LampGroup {
    map<uint32, channeldgenpb.LampState> lampstates = 1;
  }
  LampGroup lampgroup = 2;
}
";
        assert!(proto.ends_with(expected), "{proto}");
        assert!(proto.contains("import \"Door.proto\";\nimport \"Lamp.proto\";\nimport \"VaultDoor.proto\";\n"));
    }

    #[test]
    fn child_block_is_nested_in_parent_block() {
        let dir = TempDir::new().unwrap();
        let descs = decorate_all(
            dir.path(),
            vec![actor("/Script/Game.Door", "Door"), actor("/Script/Game.VaultDoor", "VaultDoor")],
        );
        let units: Vec<_> = descs.iter().map(generate_replicator).collect();
        let names = ChannelDataNames::for_module("Game", "channeldgenpb");

        let code = generate_channel_data_processor(&units, &[None, Some(0)], &names).unwrap();

        let parent = "\t\t\t\tif (TargetClass == ADoor::StaticClass())\n";
        let child = "\t\t\t\t\tif (TargetClass == AVaultDoor::StaticClass())\n";
        let parent_at = code.find(parent).unwrap();
        let child_at = code.find(child).unwrap();
        assert!(parent_at < child_at);
        assert!(code.contains("namespace gameprocessor\n{\n"));
        assert!(code.contains("\tclass FGameChannelDataProcessor : public IChannelDataProcessor\n"));
        assert!(code.contains("auto Group = TypedChannelData->mutable_doorgroup();"));
        assert!(!code.contains("mutable_vaultdoorgroup"));
    }
}
