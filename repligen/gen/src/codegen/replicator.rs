//! Per-class replicator emission: header, source, schema and the fragments
//! other artifacts splice in.

use crate::cw_line;
use crate::decorator::{ClassDescriptor, FieldCodec, PropertyDescriptor};
use crate::layout::{ArtifactKind, TYPE_DEFINITIONS_HEADER, GLOBAL_STRUCT_HEADER, GLOBAL_STRUCT_PROTO};

use super::{CodeWriter, GENERATED_BANNER, GENERATED_PROTO_BANNER, go_package_option};

/// Everything generated for one class.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplicatorCodeUnit {
    pub descriptor: ClassDescriptor,

    pub header_file_name: String,
    pub header_code: String,
    pub source_file_name: String,
    pub source_code: String,
    pub proto_file_name: String,
    pub proto_code: String,

    /// `#include` of the replicator header.
    pub include_code: String,
    /// Statement registering the replicator with the runtime.
    pub register_code: String,
    /// Class path `FName` declaration used by channel-data code.
    pub path_var_decl: String,
    /// Channel-data merge fragment (reads `SrcGroup`, writes `DstGroup`).
    pub merge_code: String,
    /// Channel-data get-state fragment (reads `Group`).
    pub get_state_code: String,
    /// Channel-data set-state fragment (writes `Group`).
    pub set_state_code: String,
}

/// Generates the replicator for one decorated class.
///
/// The merge fragment folds no child removals; the bundle replaces it once
/// the class's children are known.
pub fn generate_replicator(desc: &ClassDescriptor) -> ReplicatorCodeUnit {
    ReplicatorCodeUnit {
        header_file_name: ArtifactKind::Head.file_name(&desc.generated_name),
        header_code: header_code(desc),
        source_file_name: ArtifactKind::Source.file_name(&desc.generated_name),
        source_code: source_code(desc),
        proto_file_name: ArtifactKind::Schema.file_name(&desc.generated_name),
        proto_code: proto_code(desc),
        include_code: format!(
            "#include \"{}\"",
            ArtifactKind::Head.file_name(&desc.generated_name)
        ),
        register_code: register_code(desc),
        path_var_decl: desc.code_path_var_decl(),
        merge_code: code_channel_data_merge(desc, &[]),
        get_state_code: code_channel_data_get_state(desc),
        set_state_code: code_channel_data_set_state(desc),
        descriptor: desc.clone(),
    }
}

fn all_fields(desc: &ClassDescriptor) -> impl Iterator<Item = &PropertyDescriptor> {
    desc.properties
        .iter()
        .chain(desc.rpcs.iter().flat_map(|r| r.params.iter()))
}

/// True when any field uses a message from the runtime's common schema.
pub(crate) fn uses_unreal_common(desc: &ClassDescriptor) -> bool {
    all_fields(desc).any(|f| match &f.codec {
        FieldCodec::Message { proto, .. } => proto.starts_with("unrealpb."),
        FieldCodec::ObjectRef { .. } => true,
        FieldCodec::Scalar { .. } => false,
    })
}

/// True when any field is a struct described in the global struct schema.
pub(crate) fn uses_global_structs(desc: &ClassDescriptor) -> bool {
    all_fields(desc).any(|f| matches!(&f.codec, FieldCodec::Message { with_world: true, .. }))
}

fn register_code(desc: &ClassDescriptor) -> String {
    let replicator = desc.replicator_class_name(true);
    if desc.is_blueprint() {
        format!(
            "ChanneldReplication::RegisterReplicator<{replicator}>(TEXT(\"{}\"));",
            desc.class.path_name
        )
    } else {
        format!(
            "ChanneldReplication::RegisterReplicator<{replicator}>({}::StaticClass());",
            desc.cpp_class_name()
        )
    }
}

fn header_code(desc: &ClassDescriptor) -> String {
    let replicator = desc.replicator_class_name(true);
    let mut w = CodeWriter::cpp();

    w.line(GENERATED_BANNER);
    w.blank_line();
    w.line("#pragma once");
    w.blank_line();
    w.line("#include \"CoreMinimal.h\"");
    w.line("#include \"ChanneldReplicatorBase.h\"");
    w.line(desc.code_include_class_header());
    cw_line!(w, "#include \"{}\"", ArtifactKind::SchemaHeader.file_name(&desc.generated_name));
    if !desc.rpcs.is_empty() {
        cw_line!(w, "#include \"{TYPE_DEFINITIONS_HEADER}\"");
    }
    w.blank_line();

    w.block_with_tail(&format!("class {replicator} : public FChanneldReplicatorBase"), "};", |w| {
        w.line("public:");
        cw_line!(w, "{replicator}(UObject* InTargetObj);");
        cw_line!(w, "virtual ~{replicator}() override;");
        w.blank_line();
        w.line("//~Begin FChanneldReplicatorBase Interface");
        w.line("virtual UClass* GetTargetClass() override;");
        w.line("virtual google::protobuf::Message* GetDeltaState() override;");
        w.line("virtual void ClearState() override;");
        w.line("virtual void Tick(float DeltaTime) override;");
        w.line("virtual void OnStateChanged(const google::protobuf::Message* InNewState) override;");
        w.line(
            "virtual TSharedPtr<google::protobuf::Message> SerializeFunctionParams(UFunction* Func, void* Params, FOutParmRec* OutParams, bool& bSuccess) override;",
        );
        w.line(
            "virtual TSharedPtr<void> DeserializeFunctionParams(UFunction* Func, const std::string& ParamsPayload, bool& bSuccess, bool& bDelayRPC) override;",
        );
        w.line("//~End FChanneldReplicatorBase Interface");
        w.blank_line();
        w.line("protected:");
        cw_line!(w, "TWeakObjectPtr<{}> {};", desc.instance_cpp_name(), desc.instance_ref_name());
        cw_line!(w, "{}* FullState;", desc.proto_state_cpp_type());
        cw_line!(w, "{}* DeltaState;", desc.proto_state_cpp_type());

        let pointers: Vec<_> = desc.properties.iter().filter(|p| p.indirect).collect();
        if !pointers.is_empty() {
            w.blank_line();
            for p in pointers {
                w.line(p.pointer_declaration());
            }
        }
    });

    w.finish()
}

fn source_code(desc: &ClassDescriptor) -> String {
    let replicator = desc.replicator_class_name(true);
    let state = desc.proto_state_cpp_type();
    let instance = desc.instance_ref_name();
    let owner = format!("{instance}->");
    let world = format!("{instance}->GetWorld()");
    let mut w = CodeWriter::cpp();

    w.line(GENERATED_BANNER);
    w.blank_line();
    cw_line!(w, "#include \"{}\"", ArtifactKind::Head.file_name(&desc.generated_name));
    w.line("#include \"ChanneldUtils.h\"");
    if uses_global_structs(desc) {
        cw_line!(w, "#include \"{GLOBAL_STRUCT_HEADER}\"");
    }
    w.blank_line();

    cw_line!(w, "{replicator}::{replicator}(UObject* InTargetObj)");
    {
        let _indent = w.indent();
        w.line(": FChanneldReplicatorBase(InTargetObj)");
    }
    w.block("", |w| {
        cw_line!(w, "{instance} = CastChecked<{}>(InTargetObj);", desc.instance_cpp_name());
        cw_line!(w, "FullState = new {state};");
        cw_line!(w, "DeltaState = new {state};");
        for p in desc.properties.iter().filter(|p| p.indirect) {
            w.fragment(&p.code_assign_pointer(instance));
        }
    });
    w.blank_line();

    w.block(&format!("{replicator}::~{replicator}()"), |w| {
        w.line("delete FullState;");
        w.line("delete DeltaState;");
    });
    w.blank_line();

    w.block(&format!("UClass* {replicator}::GetTargetClass()"), |w| {
        if desc.is_blueprint() {
            cw_line!(w, "return {instance}.IsValid() ? {instance}->GetClass() : nullptr;");
        } else {
            cw_line!(w, "return {}::StaticClass();", desc.cpp_class_name());
        }
    });
    w.blank_line();

    w.block(&format!("google::protobuf::Message* {replicator}::GetDeltaState()"), |w| {
        w.line("return DeltaState;");
    });
    w.blank_line();

    w.block(&format!("void {replicator}::ClearState()"), |w| {
        w.line("DeltaState->Clear();");
        w.line("bStateChanged = false;");
    });
    w.blank_line();

    w.block(&format!("void {replicator}::Tick(float DeltaTime)"), |w| {
        cw_line!(w, "if (!{instance}.IsValid())");
        w.block("", |w| w.line("return;"));
        for p in &desc.properties {
            w.fragment(&p.code_set_delta_state(&owner, "FullState", "DeltaState", &world));
        }
        w.line("if (bStateChanged)");
        w.block("", |w| w.line("FullState->MergeFrom(*DeltaState);"));
    });
    w.blank_line();

    w.block(
        &format!("void {replicator}::OnStateChanged(const google::protobuf::Message* InNewState)"),
        |w| {
            cw_line!(w, "if (!{instance}.IsValid())");
            w.block("", |w| w.line("return;"));
            cw_line!(w, "auto NewState = static_cast<const {state}*>(InNewState);");
            w.line("FullState->MergeFrom(*NewState);");
            for p in &desc.properties {
                w.fragment(&p.code_on_state_change(&owner, "NewState", &world));
            }
        },
    );
    w.blank_line();

    let namespace = desc.rpc_param_struct_namespace();
    let message_prefix = format!("{}::{}", desc.proto_package, desc.proto_state_message_type());

    w.block(
        &format!(
            "TSharedPtr<google::protobuf::Message> {replicator}::SerializeFunctionParams(UFunction* Func, void* Params, FOutParmRec* OutParams, bool& bSuccess)"
        ),
        |w| {
            for (i, rpc) in desc.rpcs.iter().enumerate() {
                let code = rpc.code_serialize(&namespace, &message_prefix);
                w.fragment(&else_chained(i, &code));
            }
            w.line("bSuccess = false;");
            w.line("return nullptr;");
        },
    );
    w.blank_line();

    w.block(
        &format!(
            "TSharedPtr<void> {replicator}::DeserializeFunctionParams(UFunction* Func, const std::string& ParamsPayload, bool& bSuccess, bool& bDelayRPC)"
        ),
        |w| {
            w.line("bDelayRPC = false;");
            for (i, rpc) in desc.rpcs.iter().enumerate() {
                let code = rpc.code_deserialize(&namespace, &message_prefix, &world);
                w.fragment(&else_chained(i, &code));
            }
            w.line("bSuccess = false;");
            w.line("return nullptr;");
        },
    );

    w.finish()
}

/// Prefixes every `if` block after the first with `else `.
fn else_chained(position: usize, code: &str) -> String {
    if position == 0 {
        code.to_string()
    } else {
        format!("else {code}")
    }
}

fn proto_code(desc: &ClassDescriptor) -> String {
    let mut w = CodeWriter::proto();

    w.line(GENERATED_PROTO_BANNER);
    w.line("syntax = \"proto3\";");
    w.blank_line();
    cw_line!(w, "package {};", desc.proto_package);
    w.blank_line();
    if uses_unreal_common(desc) {
        w.line("import \"unreal_common.proto\";");
    }
    if uses_global_structs(desc) {
        cw_line!(w, "import \"{GLOBAL_STRUCT_PROTO}\";");
    }
    if let Some(option) = go_package_option(&desc.go_package) {
        w.blank_line();
        w.line(option);
    }
    w.blank_line();

    w.braced(&format!("message {}", desc.proto_state_message_type()), |w| {
        for p in &desc.properties {
            w.line(p.proto_field_definition());
        }
        if !desc.is_singleton() {
            cw_line!(w, "bool removed = {};", desc.properties.len() + 1);
        }
        for rpc in &desc.rpcs {
            w.fragment(&rpc.proto_message_definition());
        }
    });

    w.finish()
}

/// Merge fragment for one class.
///
/// `descendant_fields` are the channel-data fields of every non-singleton
/// generated descendant; a removed entry is erased from those maps too.
pub fn code_channel_data_merge(desc: &ClassDescriptor, descendant_fields: &[String]) -> String {
    let f = desc.channel_data_field_name();
    let mut w = CodeWriter::cpp();

    if desc.is_singleton() {
        cw_line!(w, "if (SrcGroup.has_{f}())");
        w.block("", |w| cw_line!(w, "DstGroup->mutable_{f}()->MergeFrom(SrcGroup.{f}());"));
        return w.finish();
    }

    cw_line!(w, "for (auto& Pair : SrcGroup.{f}())");
    w.block("", |w| {
        w.line("if (Pair.second.removed())");
        w.block("", |w| {
            cw_line!(w, "DstGroup->mutable_{f}()->erase(Pair.first);");
            for child in descendant_fields {
                cw_line!(w, "DstGroup->mutable_{child}()->erase(Pair.first);");
            }
            w.line("continue;");
        });
        cw_line!(w, "(*DstGroup->mutable_{f}())[Pair.first].MergeFrom(Pair.second);");
    });
    w.finish()
}

fn code_channel_data_get_state(desc: &ClassDescriptor) -> String {
    let f = desc.channel_data_field_name();
    let mut w = CodeWriter::cpp();

    cw_line!(w, "if ({})", desc.code_is_target_class());
    w.block("", |w| {
        if desc.is_singleton() {
            w.line("bIsRemoved = false;");
            cw_line!(w, "return Group->has_{f}() ? &Group->{f}() : nullptr;");
        } else {
            cw_line!(w, "auto States = Group->mutable_{f}();");
            w.line("auto Entry = States->find(NetGUID);");
            w.line("if (Entry != States->end())");
            w.block("", |w| {
                w.line("bIsRemoved = Entry->second.removed();");
                w.line("return &Entry->second;");
            });
            w.line("bIsRemoved = false;");
            w.line("return nullptr;");
        }
    });
    w.finish()
}

fn code_channel_data_set_state(desc: &ClassDescriptor) -> String {
    let f = desc.channel_data_field_name();
    let mut w = CodeWriter::cpp();

    cw_line!(w, "if ({})", desc.code_is_target_class());
    w.block("", |w| {
        cw_line!(
            w,
            "auto NewState = static_cast<const {}*>(State);",
            desc.proto_state_cpp_type()
        );
        if desc.is_singleton() {
            cw_line!(w, "Group->mutable_{f}()->MergeFrom(*NewState);");
        } else {
            cw_line!(w, "(*Group->mutable_{f}())[NetGUID].MergeFrom(*NewState);");
        }
        w.line("return;");
    });
    w.finish()
}
