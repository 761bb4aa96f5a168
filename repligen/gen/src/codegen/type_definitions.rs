//! Shared declarations used by every generated replicator.

use std::collections::BTreeSet;

use crate::cw_line;
use crate::decorator::ClassDescriptor;
use crate::layout::TYPE_DEFINITIONS_HEADER;

use super::{CodeWriter, GENERATED_BANNER};

/// Log category declared for generated code.
pub const LOG_CATEGORY: &str = "LogChanneldGen";

/// Returns `(header, source)` of the type-definitions pair.
///
/// The header declares the log category and, for every class with remote
/// calls, a namespace of parameter structs.
pub fn generate_type_definitions(descriptors: &[ClassDescriptor]) -> (String, String) {
    let with_rpcs: Vec<_> = descriptors.iter().filter(|d| !d.rpcs.is_empty()).collect();
    let mut w = CodeWriter::cpp();

    w.line(GENERATED_BANNER);
    w.blank_line();
    w.line("#pragma once");
    w.blank_line();
    w.line("#include \"CoreMinimal.h\"");
    let includes: BTreeSet<_> = with_rpcs.iter().map(|d| d.code_include_class_header()).collect();
    for include in includes {
        w.line(include);
    }
    w.blank_line();
    cw_line!(w, "DECLARE_LOG_CATEGORY_EXTERN({LOG_CATEGORY}, Log, All);");

    for desc in with_rpcs {
        w.blank_line();
        w.block(&format!("namespace {}", desc.rpc_param_struct_namespace()), |w| {
            for (i, rpc) in desc.rpcs.iter().enumerate() {
                if i > 0 {
                    w.blank_line();
                }
                w.fragment(&rpc.param_struct_declaration());
            }
        });
    }
    let header = w.finish();

    let mut w = CodeWriter::cpp();
    w.line(GENERATED_BANNER);
    w.blank_line();
    cw_line!(w, "#include \"{TYPE_DEFINITIONS_HEADER}\"");
    w.blank_line();
    cw_line!(w, "DEFINE_LOG_CATEGORY({LOG_CATEGORY});");
    let source = w.finish();

    (header, source)
}
