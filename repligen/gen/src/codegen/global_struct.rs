//! Helpers and schema messages for struct-typed values.
//!
//! Every struct reached from a replicated property or remote-call parameter
//! gets one `FChanneld<Name>Helper` class and one schema message, shared by
//! all replicators. Structs are emitted once each, dependencies first.

use std::collections::HashSet;

use repligen_define::{PropertyType, StructMetadata};

use crate::cw_line;
use crate::decorator::{ClassDescriptor, FieldAccess, FieldSource, build_fields};
use crate::layout::PROTO_HEADER_EXTENSION;

use super::{CodeWriter, GENERATED_BANNER, GENERATED_PROTO_BANNER, go_package_option};

/// Collects the structs used by `descriptors` in first-seen order, with
/// nested structs ahead of the structs containing them.
pub fn collect_global_structs(descriptors: &[ClassDescriptor]) -> Vec<StructMetadata> {
    let mut seen = HashSet::new();
    let mut ordered = Vec::new();

    for desc in descriptors {
        let types = desc
            .properties
            .iter()
            .map(|p| &p.ty)
            .chain(desc.rpcs.iter().flat_map(|r| r.params.iter().map(|p| &p.ty)));
        for ty in types {
            visit(ty, &mut seen, &mut ordered);
        }
    }

    ordered
}

fn visit(ty: &PropertyType, seen: &mut HashSet<String>, ordered: &mut Vec<StructMetadata>) {
    match ty {
        PropertyType::Array(inner) => visit(inner, seen, ordered),
        PropertyType::Struct(st) => {
            if !seen.insert(st.name.clone()) {
                return;
            }
            for field in &st.fields {
                visit(&field.ty, seen, ordered);
            }
            ordered.push(st.clone());
        }
        _ => {}
    }
}

/// Returns `(header, schema)` for the global struct pair.
pub fn generate_global_structs(
    descriptors: &[ClassDescriptor],
    proto_package: &str,
    go_package: &str,
) -> (String, String) {
    let structs = collect_global_structs(descriptors);
    (
        header_code(&structs, proto_package),
        proto_code(&structs, proto_package, go_package),
    )
}

fn header_code(structs: &[StructMetadata], proto_package: &str) -> String {
    let mut w = CodeWriter::cpp();

    w.line(GENERATED_BANNER);
    w.blank_line();
    w.line("#pragma once");
    w.blank_line();
    w.line("#include \"CoreMinimal.h\"");
    w.line("#include \"ChanneldUtils.h\"");
    let mut included = HashSet::new();
    for header in structs.iter().filter_map(|s| s.header.as_deref()) {
        if included.insert(header) {
            cw_line!(w, "#include \"{header}\"");
        }
    }
    cw_line!(w, "#include \"ChanneldGlobalStruct{PROTO_HEADER_EXTENSION}\"");

    for st in structs {
        let message = format!("{proto_package}::{}", st.message_name());
        let fields = build_fields(
            st.fields.iter().filter(|f| f.replicated).map(|f| FieldSource {
                name: &f.name,
                ty: &f.ty,
                access: f.access,
            }),
            "Prop",
            FieldAccess::Member,
            proto_package,
        );

        w.blank_line();
        w.block_with_tail(&format!("class FChanneld{}Helper", st.message_name()), "};", |w| {
            w.line("public:");
            w.block(
                &format!(
                    "static bool EqualsProto(const {message}* Proto, const {}& Value, UWorld* World)",
                    st.name
                ),
                |w| {
                    for f in &fields {
                        w.fragment(&f.code_equals_check("Value.", "Proto", "World"));
                    }
                    w.line("return true;");
                },
            );
            w.blank_line();
            w.block(
                &format!("static void ToProto({message}* Proto, const {}& Value)", st.name),
                |w| {
                    for f in &fields {
                        w.fragment(&f.code_to_proto("Value.", "Proto"));
                    }
                },
            );
            w.blank_line();
            w.block(
                &format!(
                    "static void FromProto({}& Value, const {message}* Proto, UWorld* World)",
                    st.name
                ),
                |w| {
                    for f in &fields {
                        w.fragment(&f.code_from_proto("Value.", "Proto", "World"));
                    }
                },
            );
        });
    }

    w.finish()
}

fn proto_code(structs: &[StructMetadata], proto_package: &str, go_package: &str) -> String {
    let mut w = CodeWriter::proto();

    w.line(GENERATED_PROTO_BANNER);
    w.line("syntax = \"proto3\";");
    w.blank_line();
    cw_line!(w, "package {proto_package};");
    w.blank_line();
    w.line("import \"unreal_common.proto\";");
    if let Some(option) = go_package_option(go_package) {
        w.blank_line();
        w.line(option);
    }

    for st in structs {
        let fields = build_fields(
            st.fields.iter().filter(|f| f.replicated).map(|f| FieldSource {
                name: &f.name,
                ty: &f.ty,
                access: f.access,
            }),
            "Prop",
            FieldAccess::Member,
            proto_package,
        );
        w.blank_line();
        w.braced(&format!("message {}", st.message_name()), |w| {
            for f in &fields {
                w.line(f.proto_field_definition());
            }
        });
    }

    w.finish()
}
