//! Normalizes one class into a [`ClassDescriptor`].
//!
//! Decoration is where a class's generated name is settled: blueprint names
//! that are not legal identifiers get placeholders, and repeated names get
//! collision suffixes from the run's [`NameRegistry`]. Everything emitted for
//! the class afterwards is derived from the descriptor.

mod property;
mod rpc;

use std::collections::HashSet;

use repligen_define::{ClassId, ClassMetadata};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use property::{FieldAccess, FieldCodec, FieldSource, PropertyDescriptor, build_fields};
pub use rpc::{RpcDescriptor, build_rpcs};

use crate::errors::DecorateError;
use crate::naming::NameRegistry;
use crate::resolver::{CppClassInfo, TypeMetadataResolver};

/// Default schema package for generated messages.
pub const DEFAULT_PROTO_PACKAGE: &str = "channeldgenpb";

/// Classes excluded from generation, by reference or by exact class path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreList {
    #[serde(default)]
    pub class_ids: HashSet<ClassId>,
    #[serde(default)]
    pub class_paths: HashSet<String>,
}

impl IgnoreList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ignore_class(&mut self, id: impl Into<ClassId>) -> &mut Self {
        self.class_ids.insert(id.into());
        self
    }

    pub fn ignore_path(&mut self, path: impl Into<String>) -> &mut Self {
        self.class_paths.insert(path.into());
        self
    }

    /// Returns true when `class` is listed by id or by exact path.
    pub fn is_ignored(&self, class: &ClassMetadata) -> bool {
        self.class_ids.contains(&class.id) || self.class_paths.contains(&class.path_name)
    }
}

/// Per-call decoration settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecorateOptions {
    pub proto_package: String,
    /// Value of the schema's `go_package` option; omitted when empty.
    pub go_package: String,
    /// Extract properties and remote calls. Off for name-only lookups.
    pub init_properties: bool,
    /// Apply the run's collision counter to the generated name.
    pub increment_if_same_name: bool,
}

impl Default for DecorateOptions {
    fn default() -> Self {
        Self {
            proto_package: DEFAULT_PROTO_PACKAGE.to_string(),
            go_package: String::new(),
            init_properties: true,
            increment_if_same_name: true,
        }
    }
}

/// A class ready for code generation.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDescriptor {
    /// Source metadata of the class.
    pub class: ClassMetadata,
    /// Collision-free name all generated identifiers derive from.
    pub generated_name: String,
    /// Where the class (or its native ancestor) is declared.
    pub header: CppClassInfo,
    pub proto_package: String,
    pub go_package: String,
    /// Replicated properties in declaration order.
    pub properties: Vec<PropertyDescriptor>,
    /// Replicated remote calls in declaration order.
    pub rpcs: Vec<RpcDescriptor>,
}

impl ClassDescriptor {
    pub fn id(&self) -> &ClassId {
        &self.class.id
    }

    /// Name of the class as declared by the host.
    pub fn original_name(&self) -> &str {
        &self.class.name
    }

    pub fn package_path(&self) -> &str {
        &self.class.package_path
    }

    /// Module that declares the class header.
    pub fn module_name(&self) -> &str {
        &self.header.module
    }

    pub fn is_blueprint(&self) -> bool {
        self.class.blueprint
    }

    pub fn is_singleton(&self) -> bool {
        self.class.kind.is_singleton()
    }

    /// `FChanneld<Name>Replicator`, or without the `F` prefix.
    pub fn replicator_class_name(&self, with_prefix: bool) -> String {
        let name = format!("Channeld{}Replicator", self.generated_name);
        if with_prefix { format!("F{name}") } else { name }
    }

    /// Prefixed C++ name of the class itself.
    pub fn cpp_class_name(&self) -> String {
        self.class.cpp_name()
    }

    /// C++ type generated code holds instances as.
    pub fn instance_cpp_name(&self) -> String {
        self.class.instance_cpp_name()
    }

    /// Name of the weak instance reference member in the replicator.
    pub fn instance_ref_name(&self) -> &'static str {
        match self.class.kind {
            repligen_define::ClassKind::ActorComponent => "ActorComp",
            _ => "Actor",
        }
    }

    /// Name of the state message in the class schema.
    pub fn proto_state_message_type(&self) -> String {
        format!("{}State", self.generated_name)
    }

    /// C++ name of the state message (`pkg::NameState`).
    pub fn proto_state_cpp_type(&self) -> String {
        format!("{}::{}", self.proto_package, self.proto_state_message_type())
    }

    /// Field holding this class's state in channel data.
    pub fn channel_data_field_name(&self) -> String {
        let suffix = if self.is_singleton() { "" } else { "s" };
        format!("{}{suffix}", self.proto_state_message_type()).to_lowercase()
    }

    /// Variable holding the class path as an `FName` in generated code.
    pub fn path_var_name(&self) -> String {
        format!("{}ClassPathFName", self.generated_name)
    }

    /// `const FName <Var> = FName("<path>");`
    pub fn code_path_var_decl(&self) -> String {
        format!(
            "const FName {} = FName(\"{}\");",
            self.path_var_name(),
            self.class.path_name
        )
    }

    /// Condition matching exactly this class in channel-data code.
    ///
    /// Blueprint classes have no `StaticClass()` and are matched by path.
    pub fn code_is_target_class(&self) -> String {
        if self.is_blueprint() {
            format!(
                "ChanneldReplication::FindReplicatorStateInProto(TargetClass)->TargetClassPathFName == {}",
                self.path_var_name()
            )
        } else {
            format!("TargetClass == {}::StaticClass()", self.cpp_class_name())
        }
    }

    /// Namespace holding this class's remote-call parameter structs.
    pub fn rpc_param_struct_namespace(&self) -> String {
        format!("{}_rpcparamstruct", self.replicator_class_name(false)).to_lowercase()
    }

    /// Include directive for the class header.
    pub fn code_include_class_header(&self) -> String {
        format!("#include \"{}\"", self.header.include_path)
    }
}

/// Builds descriptors for one run.
///
/// Holds the run's collision counter; a decorator is created per run so
/// names are reproducible for identical input order.
pub struct ClassDecorator<'a> {
    resolver: &'a TypeMetadataResolver,
    ignore: &'a IgnoreList,
    names: &'a mut NameRegistry,
}

impl<'a> ClassDecorator<'a> {
    pub fn new(
        resolver: &'a TypeMetadataResolver,
        ignore: &'a IgnoreList,
        names: &'a mut NameRegistry,
    ) -> Self {
        Self {
            resolver,
            ignore,
            names,
        }
    }

    /// Decorates one class.
    ///
    /// ## Errors
    ///
    /// - [`DecorateError::Ignored`] when the class is on the ignore list
    /// - [`DecorateError::HeaderNotFound`] when no module header declares the
    ///   class (or, for blueprints, its native ancestor)
    pub fn decorate(
        &mut self,
        class: &ClassMetadata,
        options: &DecorateOptions,
    ) -> Result<ClassDescriptor, DecorateError> {
        if self.ignore.is_ignored(class) {
            return Err(DecorateError::Ignored {
                class: class.name.clone(),
                path: class.path_name.clone(),
            });
        }

        let lookup = class.header_lookup_name();
        let header = self
            .resolver
            .class_info(&lookup)
            .cloned()
            .ok_or_else(|| DecorateError::HeaderNotFound {
                class: class.name.clone(),
                lookup: lookup.clone(),
            })?;

        let base = if class.blueprint {
            self.names.compilable_class_name(&class.name)
        } else {
            class.name.clone()
        };
        let generated_name = self.names.resolve(&base, options.increment_if_same_name);

        let (properties, rpcs) = if options.init_properties {
            let properties = build_fields(
                class.properties.iter().filter(|p| p.replicated).map(|p| FieldSource {
                    name: &p.name,
                    ty: &p.ty,
                    access: p.access,
                }),
                "Prop",
                FieldAccess::Reflected {
                    blueprint: class.blueprint,
                },
                &options.proto_package,
            );
            let rpcs = build_rpcs(
                class.rpcs.iter().filter(|r| r.replicated),
                &options.proto_package,
            );
            (properties, rpcs)
        } else {
            (Vec::new(), Vec::new())
        };

        debug!(
            class = %class.id,
            generated = %generated_name,
            properties = properties.len(),
            rpcs = rpcs.len(),
            "Decorated class"
        );

        Ok(ClassDescriptor {
            class: class.clone(),
            generated_name,
            header,
            proto_package: options.proto_package.clone(),
            go_package: options.go_package.clone(),
            properties,
            rpcs,
        })
    }
}
