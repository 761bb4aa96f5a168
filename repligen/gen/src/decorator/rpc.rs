//! Remote-call descriptors.

use repligen_define::{PropertyAccess, RpcKind, RpcMetadata};

use super::property::{FieldAccess, FieldSource, PropertyDescriptor, build_fields};
use crate::codegen::CodeWriter;
use crate::cw_line;
use crate::naming::is_compilable_identifier;

/// A replicated remote call with its parameters mapped to schema fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcDescriptor {
    /// Compilable name used for the parameter struct and message.
    pub name: String,
    /// Function name as the host reflects it, used to match calls.
    pub original_name: String,
    pub kind: RpcKind,
    pub params: Vec<PropertyDescriptor>,
}

/// Builds descriptors for `rpcs` in declaration order.
///
/// Call names that are not legal identifiers become `_IllegalNameRpc_<n>_`,
/// with `n` counting per call of this function.
pub fn build_rpcs<'a>(
    rpcs: impl IntoIterator<Item = &'a RpcMetadata>,
    proto_package: &str,
) -> Vec<RpcDescriptor> {
    let mut illegal_index = 0;
    rpcs.into_iter()
        .map(|rpc| {
            let name = if is_compilable_identifier(&rpc.name) {
                rpc.name.clone()
            } else {
                illegal_index += 1;
                format!("_IllegalNameRpc_{illegal_index}_")
            };
            RpcDescriptor::new(rpc, name, proto_package)
        })
        .collect()
}

impl RpcDescriptor {
    /// Builds the descriptor for `rpc` under the compilable `name`.
    /// Parameter names that are not legal identifiers become
    /// `_IllegalNameParam_<n>_`.
    pub fn new(rpc: &RpcMetadata, name: String, proto_package: &str) -> Self {
        let params = build_fields(
            rpc.params.iter().map(|p| FieldSource {
                name: &p.name,
                ty: &p.ty,
                access: PropertyAccess::Public,
            }),
            "Param",
            FieldAccess::Member,
            proto_package,
        );
        Self {
            name,
            original_name: rpc.name.clone(),
            kind: rpc.kind,
            params,
        }
    }

    /// Name of both the C++ parameter struct and the schema sub-message.
    pub fn params_type_name(&self) -> String {
        format!("{}Params", self.name)
    }

    /// C++ struct mirroring the parameter layout of the call.
    pub fn param_struct_declaration(&self) -> String {
        let mut w = CodeWriter::cpp();
        w.block_with_tail(&format!("struct {}", self.params_type_name()), "};", |w| {
            for param in &self.params {
                cw_line!(w, "{} {};", param.cpp_type(), param.name);
            }
        });
        w.finish()
    }

    /// Schema sub-message carrying the parameters.
    pub fn proto_message_definition(&self) -> String {
        let mut w = CodeWriter::proto();
        w.braced(&format!("message {}", self.params_type_name()), |w| {
            for param in &self.params {
                w.line(param.proto_field_definition());
            }
        });
        w.finish()
    }

    /// `if` block serializing the parameters when `Func` is this call.
    ///
    /// `struct_namespace` holds the parameter structs and `message_prefix`
    /// is the C++ name of the enclosing state message.
    pub fn code_serialize(&self, struct_namespace: &str, message_prefix: &str) -> String {
        let params_type = self.params_type_name();
        let mut w = CodeWriter::cpp();
        cw_line!(w, "if (Func->GetFName() == FName(\"{}\"))", self.original_name);
        w.block("", |w| {
            cw_line!(
                w,
                "{struct_namespace}::{params_type}* TypedParams = static_cast<{struct_namespace}::{params_type}*>(Params);"
            );
            cw_line!(w, "auto Msg = MakeShared<{message_prefix}_{params_type}>();");
            for param in &self.params {
                w.fragment(&param.code_to_proto("TypedParams->", "Msg"));
            }
            w.line("bSuccess = true;");
            w.line("return Msg;");
        });
        w.finish()
    }

    /// `if` block deserializing the parameters when `Func` is this call.
    pub fn code_deserialize(&self, struct_namespace: &str, message_prefix: &str, world: &str) -> String {
        let params_type = self.params_type_name();
        let mut w = CodeWriter::cpp();
        cw_line!(w, "if (Func->GetFName() == FName(\"{}\"))", self.original_name);
        w.block("", |w| {
            cw_line!(w, "auto Msg = MakeShared<{message_prefix}_{params_type}>();");
            w.line("if (!Msg->ParseFromString(ParamsPayload))");
            w.block("", |w| {
                cw_line!(
                    w,
                    "UE_LOG(LogChanneldGen, Warning, TEXT(\"Failed to parse {} params\"));",
                    self.original_name
                );
                w.line("return nullptr;");
            });
            cw_line!(w, "auto TypedParams = MakeShared<{struct_namespace}::{params_type}>();");
            for param in &self.params {
                w.fragment(&param.code_from_proto("TypedParams->", "Msg", world));
            }
            w.line("bSuccess = true;");
            w.line("return TypedParams;");
        });
        w.finish()
    }
}
