//! Per-field code emission.
//!
//! A [`PropertyDescriptor`] knows how one replicated value maps onto a schema
//! field and renders the C++ statements that move it in either direction.
//! The same descriptor type backs class properties, remote-call parameters
//! and global struct fields; only the owner expression passed to the
//! `code_*` methods differs.
//!
//! Templates below use `$v` for the C++ value and `$p` for the schema value.

use std::collections::HashSet;

use repligen_define::{PropertyAccess, PropertyType};
use tracing::debug;

use crate::naming::{is_compilable_identifier, to_field_name};

/// How values of one type cross between C++ and the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldCodec {
    /// A schema scalar converted with expression templates.
    Scalar {
        proto: &'static str,
        to_proto: String,
        from_proto: String,
        equals: Option<String>,
    },
    /// A schema message converted by a helper class.
    Message {
        proto: String,
        helper: String,
        with_world: bool,
    },
    /// An object reference resolved through the replication runtime.
    ObjectRef { class: String },
}

impl FieldCodec {
    /// Returns the codec for a non-array type, or `None` when unsupported.
    pub fn for_type(ty: &PropertyType, proto_package: &str) -> Option<Self> {
        let scalar = |proto: &'static str, to: &str, from: &str| FieldCodec::Scalar {
            proto,
            to_proto: to.to_string(),
            from_proto: from.to_string(),
            equals: None,
        };

        let codec = match ty {
            PropertyType::Bool => scalar("bool", "$v", "$p"),
            PropertyType::Byte => scalar("uint32", "$v", "static_cast<uint8>($p)"),
            PropertyType::Int32 => scalar("int32", "$v", "$p"),
            PropertyType::UInt32 => scalar("uint32", "$v", "$p"),
            PropertyType::Int64 => scalar("int64", "$v", "$p"),
            PropertyType::UInt64 => scalar("uint64", "$v", "$p"),
            PropertyType::Float => scalar("float", "$v", "$p"),
            PropertyType::Double => scalar("double", "$v", "$p"),
            PropertyType::String => scalar(
                "string",
                "std::string(TCHAR_TO_UTF8(*$v))",
                "FString(UTF8_TO_TCHAR($p.c_str()))",
            ),
            PropertyType::Name => scalar(
                "string",
                "std::string(TCHAR_TO_UTF8(*$v.ToString()))",
                "FName(UTF8_TO_TCHAR($p.c_str()))",
            ),
            PropertyType::Text => FieldCodec::Scalar {
                proto: "string",
                to_proto: "std::string(TCHAR_TO_UTF8(*$v.ToString()))".to_string(),
                from_proto: "FText::FromString(UTF8_TO_TCHAR($p.c_str()))".to_string(),
                equals: Some("$v.ToString() == FString(UTF8_TO_TCHAR($p.c_str()))".to_string()),
            },
            PropertyType::Enum(name) => FieldCodec::Scalar {
                proto: "uint32",
                to_proto: "static_cast<uint32>($v)".to_string(),
                from_proto: format!("static_cast<{name}>($p)"),
                equals: None,
            },
            PropertyType::Vector => FieldCodec::Message {
                proto: "unrealpb.FVector".to_string(),
                helper: "ChanneldUtils".to_string(),
                with_world: false,
            },
            PropertyType::Rotator => FieldCodec::Message {
                proto: "unrealpb.FRotator".to_string(),
                helper: "ChanneldUtils".to_string(),
                with_world: false,
            },
            PropertyType::Object(class) => FieldCodec::ObjectRef {
                class: class.clone(),
            },
            PropertyType::Struct(st) => FieldCodec::Message {
                proto: format!("{proto_package}.{}", st.message_name()),
                helper: format!("FChanneld{}Helper", st.message_name()),
                with_world: true,
            },
            PropertyType::Array(_) | PropertyType::Unsupported(_) => return None,
        };
        Some(codec)
    }

    /// Returns the schema type name.
    pub fn proto_type(&self) -> &str {
        match self {
            FieldCodec::Scalar { proto, .. } => proto,
            FieldCodec::Message { proto, .. } => proto,
            FieldCodec::ObjectRef { .. } => "unrealpb.UnrealObjectRef",
        }
    }

    fn is_scalar(&self) -> bool {
        matches!(self, FieldCodec::Scalar { .. })
    }

    fn world_arg(&self, world: &str) -> String {
        match self {
            FieldCodec::Message { with_world: true, .. } => format!(", {world}"),
            _ => String::new(),
        }
    }

    /// Statement writing `value` into the singular field `field` of `msg`.
    fn set_single(&self, value: &str, msg: &str, field: &str) -> String {
        match self {
            FieldCodec::Scalar { to_proto, .. } => {
                format!("{msg}->set_{field}({});", to_proto.replace("$v", value))
            }
            FieldCodec::Message { helper, .. } => {
                format!("{helper}::ToProto({msg}->mutable_{field}(), {value});")
            }
            FieldCodec::ObjectRef { .. } => format!(
                "{msg}->mutable_{field}()->CopyFrom(*ChanneldUtils::GetRefOfObject({value}));"
            ),
        }
    }

    /// Statement appending `value` to the repeated field `field` of `msg`.
    fn add_element(&self, value: &str, msg: &str, field: &str) -> String {
        match self {
            FieldCodec::Scalar { to_proto, .. } => {
                format!("{msg}->add_{field}({});", to_proto.replace("$v", value))
            }
            FieldCodec::Message { helper, .. } => {
                format!("{helper}::ToProto({msg}->add_{field}(), {value});")
            }
            FieldCodec::ObjectRef { .. } => format!(
                "{msg}->add_{field}()->CopyFrom(*ChanneldUtils::GetRefOfObject({value}));"
            ),
        }
    }

    /// Statement assigning the schema value `proto` to the C++ lvalue `target`.
    fn read_into(&self, target: &str, proto: &str, world: &str) -> String {
        match self {
            FieldCodec::Scalar { from_proto, .. } => {
                format!("{target} = {};", from_proto.replace("$p", proto))
            }
            FieldCodec::Message { helper, .. } => {
                format!("{helper}::FromProto({target}, &{proto}{});", self.world_arg(world))
            }
            FieldCodec::ObjectRef { class } => format!(
                "{target} = Cast<{class}>(ChanneldUtils::GetObjectByRef(&{proto}, {world}));"
            ),
        }
    }

    /// Expression that is true when `value` equals the schema value `proto`.
    fn equals(&self, value: &str, proto: &str, world: &str) -> String {
        match self {
            FieldCodec::Scalar {
                from_proto, equals, ..
            } => match equals {
                Some(template) => template.replace("$v", value).replace("$p", proto),
                None => format!("{value} == {}", from_proto.replace("$p", proto)),
            },
            FieldCodec::Message { helper, .. } => {
                format!("{helper}::EqualsProto(&{proto}, {value}{})", self.world_arg(world))
            }
            FieldCodec::ObjectRef { .. } => {
                format!("ChanneldUtils::GetObjectByRef(&{proto}, {world}) == {value}")
            }
        }
    }
}

/// Where a field's value lives relative to its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldAccess {
    /// Always a plain member access (struct fields, parameter structs).
    Member,
    /// A reflected class property. Blueprint, non-public and illegally
    /// named properties are reached through property pointers.
    Reflected { blueprint: bool },
}

/// One field as declared by the host.
#[derive(Debug, Clone, Copy)]
pub struct FieldSource<'a> {
    pub name: &'a str,
    pub ty: &'a PropertyType,
    pub access: PropertyAccess,
}

/// A replicated value mapped to one schema field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDescriptor {
    /// Name used in generated C++ (a placeholder when the declared name is illegal).
    pub name: String,
    /// Name declared by the host, used for reflection lookups.
    pub original_name: String,
    /// Schema field name, unique within its message.
    pub field_name: String,
    /// 1-based schema field number.
    pub index: u32,
    pub ty: PropertyType,
    pub codec: FieldCodec,
    pub repeated: bool,
    /// True when the value is reached through a property pointer.
    pub indirect: bool,
}

/// Builds descriptors for `sources` in declaration order.
///
/// Unsupported types are skipped. Illegal names become
/// `_IllegalName<kind>_<n>_` with `n` counting per call, and schema field
/// numbers are assigned after skipping.
pub fn build_fields<'a>(
    sources: impl IntoIterator<Item = FieldSource<'a>>,
    placeholder_kind: &str,
    access: FieldAccess,
    proto_package: &str,
) -> Vec<PropertyDescriptor> {
    let mut illegal_index = 0;
    let mut used_fields = HashSet::new();
    let mut fields = Vec::new();

    for source in sources {
        let (element, repeated) = match source.ty {
            PropertyType::Array(inner) => (inner.as_ref(), true),
            other => (other, false),
        };
        let Some(codec) = FieldCodec::for_type(element, proto_package) else {
            debug!(field = source.name, ty = ?source.ty, "Skipping field with unsupported type");
            continue;
        };

        let legal = is_compilable_identifier(source.name);
        let name = if legal {
            source.name.to_string()
        } else {
            illegal_index += 1;
            format!("_IllegalName{placeholder_kind}_{illegal_index}_")
        };
        let indirect = match access {
            FieldAccess::Member => false,
            FieldAccess::Reflected { blueprint } => {
                blueprint || !legal || source.access != PropertyAccess::Public
            }
        };

        fields.push(PropertyDescriptor {
            field_name: schema_field_name(&name, &mut used_fields),
            name,
            original_name: source.name.to_string(),
            index: fields.len() as u32 + 1,
            ty: source.ty.clone(),
            codec,
            repeated,
            indirect,
        });
    }

    fields
}

fn schema_field_name(name: &str, used: &mut HashSet<String>) -> String {
    let mut base = to_field_name(name).trim_matches('_').to_string();
    if !base.starts_with(|c: char| c.is_ascii_alphabetic()) {
        base = format!("field_{base}");
    }

    let mut candidate = base.clone();
    let mut n = 2;
    while candidate == "removed" || used.contains(&candidate) {
        candidate = format!("{base}_{n}");
        n += 1;
    }
    used.insert(candidate.clone());
    candidate
}

impl PropertyDescriptor {
    /// Returns the C++ type of the value.
    pub fn cpp_type(&self) -> String {
        self.ty.cpp_type()
    }

    /// Name of the property pointer member for indirect access.
    pub fn pointer_name(&self) -> String {
        format!("{}Ptr", self.name)
    }

    /// C++ lvalue for this field. `owner` is a member-access prefix such as
    /// `Actor->` or `Value.`.
    pub fn value_expr(&self, owner: &str) -> String {
        if self.indirect {
            format!("(*{})", self.pointer_name())
        } else {
            format!("{owner}{}", self.name)
        }
    }

    /// Schema field line, e.g. `optional bool b_is_dead = 1;`.
    pub fn proto_field_definition(&self) -> String {
        let label = if self.repeated {
            "repeated "
        } else if self.codec.is_scalar() {
            "optional "
        } else {
            ""
        };
        format!(
            "{label}{} {} = {};",
            self.codec.proto_type(),
            self.field_name,
            self.index
        )
    }

    /// Declaration of the property pointer member.
    pub fn pointer_declaration(&self) -> String {
        format!("{}* {};", self.cpp_type(), self.pointer_name())
    }

    /// Block resolving the property pointer from an instance reference.
    pub fn code_assign_pointer(&self, instance: &str) -> String {
        format!(
            "{{\n\tauto Property = CastFieldChecked<const FProperty>({instance}->GetClass()->FindPropertyByName(FName(\"{orig}\")));\n\
             \t{ptr} = Property->ContainerPtrToValuePtr<{ty}>({instance}.Get());\n\
             \tcheck({ptr});\n}}\n",
            orig = self.original_name,
            ptr = self.pointer_name(),
            ty = self.cpp_type(),
        )
    }

    /// Copies changed values into the delta state and sets `bStateChanged`.
    pub fn code_set_delta_state(&self, owner: &str, full: &str, delta: &str, world: &str) -> String {
        let value = self.value_expr(owner);
        let f = &self.field_name;
        if self.repeated {
            let equals = self
                .codec
                .equals(&format!("{value}[i]"), &format!("{full}->{f}(i)"), world);
            let add = self.codec.add_element("Elem", delta, f);
            format!(
                "{{\n\tbool bChanged = {value}.Num() != {full}->{f}_size();\n\
                 \tfor (int32 i = 0; !bChanged && i < {value}.Num(); i++)\n\t{{\n\
                 \t\tbChanged = !({equals});\n\t}}\n\
                 \tif (bChanged)\n\t{{\n\
                 \t\t{delta}->clear_{f}();\n\
                 \t\tfor (const auto& Elem : {value})\n\t\t{{\n\t\t\t{add}\n\t\t}}\n\
                 \t\tbStateChanged = true;\n\t}}\n}}\n"
            )
        } else {
            let equals = self.codec.equals(&value, &format!("{full}->{f}()"), world);
            let set = self.codec.set_single(&value, delta, f);
            format!(
                "if (!{full}->has_{f}() || !({equals}))\n{{\n\t{set}\n\tbStateChanged = true;\n}}\n"
            )
        }
    }

    /// Applies the fields present in `msg` to the instance.
    pub fn code_on_state_change(&self, owner: &str, msg: &str, world: &str) -> String {
        let value = self.value_expr(owner);
        let f = &self.field_name;
        if self.repeated {
            let read = self.codec.read_into("Elem", &format!("{msg}->{f}(i)"), world);
            format!(
                "if ({msg}->{f}_size() > 0)\n{{\n\
                 \t{value}.Empty({msg}->{f}_size());\n\
                 \tfor (int32 i = 0; i < {msg}->{f}_size(); i++)\n\t{{\n\
                 \t\tauto& Elem = {value}.AddDefaulted_GetRef();\n\t\t{read}\n\t}}\n}}\n"
            )
        } else {
            let read = self.codec.read_into(&value, &format!("{msg}->{f}()"), world);
            format!("if ({msg}->has_{f}())\n{{\n\t{read}\n}}\n")
        }
    }

    /// Writes the value into `msg` unconditionally.
    pub fn code_to_proto(&self, owner: &str, msg: &str) -> String {
        let value = self.value_expr(owner);
        let f = &self.field_name;
        if self.repeated {
            let add = self.codec.add_element("Elem", msg, f);
            format!("for (const auto& Elem : {value})\n{{\n\t{add}\n}}\n")
        } else {
            format!("{}\n", self.codec.set_single(&value, msg, f))
        }
    }

    /// Reads the value from `msg`. Same as applying a state change.
    pub fn code_from_proto(&self, owner: &str, msg: &str, world: &str) -> String {
        self.code_on_state_change(owner, msg, world)
    }

    /// Statements returning `false` when the value differs from `msg`.
    pub fn code_equals_check(&self, owner: &str, msg: &str, world: &str) -> String {
        let value = self.value_expr(owner);
        let f = &self.field_name;
        if self.repeated {
            let equals = self
                .codec
                .equals(&format!("{value}[i]"), &format!("{msg}->{f}(i)"), world);
            format!(
                "if ({value}.Num() != {msg}->{f}_size()) return false;\n\
                 for (int32 i = 0; i < {value}.Num(); i++)\n{{\n\
                 \tif (!({equals})) return false;\n}}\n"
            )
        } else {
            let equals = self.codec.equals(&value, &format!("{msg}->{f}()"), world);
            format!("if (!{msg}->has_{f}() || !({equals})) return false;\n")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repligen_define::{PropertyMetadata, StructMetadata};

    fn build(props: &[PropertyMetadata], access: FieldAccess) -> Vec<PropertyDescriptor> {
        build_fields(
            props.iter().map(|p| FieldSource {
                name: &p.name,
                ty: &p.ty,
                access: p.access,
            }),
            "Prop",
            access,
            "gamepb",
        )
    }

    #[test]
    fn field_numbers_follow_declaration_order_after_skips() {
        let props = [
            PropertyMetadata::replicated("Health", PropertyType::Float),
            PropertyMetadata::replicated("Delegate", PropertyType::Unsupported("FOnHit".into())),
            PropertyMetadata::replicated("bIsDead", PropertyType::Bool),
        ];

        let fields = build(&props, FieldAccess::Reflected { blueprint: false });

        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].proto_field_definition(), "optional float health = 1;");
        assert_eq!(fields[1].proto_field_definition(), "optional bool b_is_dead = 2;");
    }

    #[test]
    fn illegal_names_get_placeholders_and_pointers() {
        let props = [
            PropertyMetadata::replicated("Max Speed", PropertyType::Float),
            PropertyMetadata::replicated("2ndLife", PropertyType::Int32),
        ];

        let fields = build(&props, FieldAccess::Reflected { blueprint: false });

        assert_eq!(fields[0].name, "_IllegalNameProp_1_");
        assert_eq!(fields[1].name, "_IllegalNameProp_2_");
        assert_eq!(fields[0].original_name, "Max Speed");
        assert!(fields[0].indirect);
        assert_eq!(fields[0].field_name, "illegal_name_prop_1");
        assert!(fields[0].code_assign_pointer("Actor").contains("FName(\"Max Speed\")"));
    }

    #[test]
    fn removed_field_name_is_reserved() {
        let props = [
            PropertyMetadata::replicated("Removed", PropertyType::Bool),
            PropertyMetadata::replicated("removed", PropertyType::Bool),
        ];

        let fields = build(&props, FieldAccess::Member);

        assert_eq!(fields[0].field_name, "removed_2");
        assert_eq!(fields[1].field_name, "removed_3");
    }

    #[test]
    fn private_and_blueprint_properties_are_indirect() {
        let props = [PropertyMetadata::replicated("Ammo", PropertyType::Int32)
            .with_access(PropertyAccess::Private)];
        assert!(build(&props, FieldAccess::Reflected { blueprint: false })[0].indirect);

        let props = [PropertyMetadata::replicated("Ammo", PropertyType::Int32)];
        assert!(build(&props, FieldAccess::Reflected { blueprint: true })[0].indirect);
        assert!(!build(&props, FieldAccess::Reflected { blueprint: false })[0].indirect);
        assert_eq!(
            build(&props, FieldAccess::Reflected { blueprint: true })[0].value_expr("Actor->"),
            "(*AmmoPtr)"
        );
    }

    #[test]
    fn arrays_are_repeated_and_nested_arrays_skipped() {
        let props = [
            PropertyMetadata::replicated("Scores", PropertyType::Array(Box::new(PropertyType::Int32))),
            PropertyMetadata::replicated(
                "Grid",
                PropertyType::Array(Box::new(PropertyType::Array(Box::new(PropertyType::Int32)))),
            ),
        ];

        let fields = build(&props, FieldAccess::Member);

        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].proto_field_definition(), "repeated int32 scores = 1;");
        let code = fields[0].code_set_delta_state("Actor->", "FullState", "DeltaState", "World");
        assert!(code.contains("DeltaState->clear_scores();"));
        assert!(code.contains("DeltaState->add_scores(Elem);"));
    }

    #[test]
    fn message_types_use_qualified_schema_names() {
        let weapon = PropertyType::Struct(StructMetadata::new("FWeaponInfo", vec![]));
        let props = [
            PropertyMetadata::replicated("Location", PropertyType::Vector),
            PropertyMetadata::replicated("Weapon", weapon),
            PropertyMetadata::replicated("Owner", PropertyType::Object("AActor".into())),
        ];

        let fields = build(&props, FieldAccess::Member);

        assert_eq!(fields[0].proto_field_definition(), "unrealpb.FVector location = 1;");
        assert_eq!(fields[1].proto_field_definition(), "gamepb.WeaponInfo weapon = 2;");
        assert_eq!(fields[2].proto_field_definition(), "unrealpb.UnrealObjectRef owner = 3;");
        assert!(
            fields[1]
                .code_to_proto("Value.", "Proto")
                .contains("FChanneldWeaponInfoHelper::ToProto(Proto->mutable_weapon(), Value.Weapon);")
        );
    }

    #[test]
    fn state_change_reads_only_present_fields() {
        let props = [PropertyMetadata::replicated("Title", PropertyType::String)];
        let fields = build(&props, FieldAccess::Member);

        let code = fields[0].code_on_state_change("Actor->", "NewState", "World");

        assert_eq!(
            code,
            "if (NewState->has_title())\n{\n\tActor->Title = FString(UTF8_TO_TCHAR(NewState->title().c_str()));\n}\n"
        );
    }

    #[test]
    fn enum_round_trips_through_static_casts() {
        let props = [PropertyMetadata::replicated("Slot", PropertyType::Enum("EWeaponSlot".into()))];
        let fields = build(&props, FieldAccess::Member);

        let delta = fields[0].code_set_delta_state("Actor->", "FullState", "DeltaState", "World");
        assert!(delta.contains("Actor->Slot == static_cast<EWeaponSlot>(FullState->slot())"));
        assert!(delta.contains("DeltaState->set_slot(static_cast<uint32>(Actor->Slot));"));
    }
}
