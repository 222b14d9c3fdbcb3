//! Rendering data model
//!
//! The registry's analysis phase fills these records; the rendering stage
//! consumes them read-only. Nested enums and messages are hoisted to the
//! top level of their file because TypeScript modules cannot nest type
//! declarations the way proto does.

use std::collections::BTreeMap;

use heck::ToUpperCamelCase;

/// Scalar proto field types with a fixed target representation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ScalarType {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
}

/// Standard library message types with fixed target representations
///
/// These are never resolved via the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum WellKnownType {
    Timestamp,
    Duration,
    Struct,
    Value,
    ListValue,
    NullValue,
    FieldMask,
    Any,
    Empty,
}

/// A normalized, renderable type reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeReference {
    /// A scalar with a fixed mapping
    Scalar(ScalarType),
    /// A well-known type with a fixed mapping
    WellKnown(WellKnownType),
    /// A message or enum reference by fully qualified name, resolved
    /// against the registry at render time
    Named(String),
}

impl TypeReference {
    /// The fully qualified name, when this reference needs registry resolution
    pub fn named(&self) -> Option<&str> {
        match self {
            TypeReference::Named(fq) => Some(fq),
            _ => None,
        }
    }
}

/// Two-stage externality classification of a type reference
///
/// The per-file pass can only guess from the package prefix; the global
/// pass, with the registry complete, makes the authoritative call. Only
/// finalized states are meaningful to rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Externality {
    /// Just parsed, not yet classified
    #[default]
    Unknown,
    /// First-pass guess: same package prefix
    ProvisionallyInternal,
    /// First-pass guess: outside the referencing package
    ProvisionallyExternal,
    /// Finalized: lives in the referencing output unit
    Internal,
    /// Finalized: imported from another output unit
    External,
}

impl Externality {
    /// First-pass classification from the package-prefix heuristic
    pub fn provisional(external: bool) -> Externality {
        if external {
            Externality::ProvisionallyExternal
        } else {
            Externality::ProvisionallyInternal
        }
    }

    /// Overwrite with the authoritative second-pass decision
    pub fn finalize(&mut self, external: bool) {
        *self = if external {
            Externality::External
        } else {
            Externality::Internal
        };
    }

    /// The finalized decision, `None` while still provisional
    pub fn finalized(&self) -> Option<bool> {
        match self {
            Externality::Internal => Some(false),
            Externality::External => Some(true),
            _ => None,
        }
    }

    /// Whether this reference renders through a module alias
    pub fn is_external(&self) -> bool {
        matches!(self, Externality::External)
    }
}

/// A field inside a message
#[derive(Debug, Clone)]
pub struct Field {
    /// Declared proto name
    pub name: String,
    /// JSON (lower camel) name, as serialized by the gateway
    pub json_name: String,
    /// Normalized type reference
    pub type_ref: TypeReference,
    /// Externality of the type reference
    pub externality: Externality,
    /// Whether the field carries the repeated label
    pub is_repeated: bool,
    /// Whether the field belongs to a one-of group
    pub is_one_of: bool,
    /// Declaration-order index of the owning one-of group
    pub one_of_index: Option<i32>,
    /// Fully qualified name of the owning message (non-owning back-reference)
    pub message: String,
    /// Documentation text, empty if none
    pub comment: String,
}

impl Field {
    /// The name this field renders under, per the naming convention toggle
    pub fn render_name(&self, use_proto_names: bool) -> &str {
        if use_proto_names {
            &self.name
        } else {
            &self.json_name
        }
    }
}

/// A reference to an enum that was declared inside this message
///
/// The enum itself is hoisted to the top level of the file.
#[derive(Debug, Clone)]
pub struct NestedEnum {
    /// Name as declared inside the message
    pub name: String,
    /// Fully qualified name of the hoisted enum
    pub fq_type: String,
}

/// A message, hoisted to package level
#[derive(Debug, Clone, Default)]
pub struct Message {
    /// Package-level display name (enclosing names concatenated)
    pub name: String,
    /// Fully qualified name
    pub fq_type: String,
    /// All fields in declaration order
    pub fields: Vec<Field>,
    /// Indices into `fields` of the fields outside any one-of group
    pub non_one_of_fields: Vec<usize>,
    /// Enums declared inside this message, already hoisted
    pub enums: Vec<NestedEnum>,
    /// Indices into `fields`, grouped by one-of declaration index
    pub one_of_groups: BTreeMap<i32, Vec<usize>>,
    /// Declared one-of group names by declaration index
    pub one_of_names: BTreeMap<i32, String>,
    /// Documentation text, empty if none
    pub comment: String,
}

impl Message {
    /// Whether the message has any one-of groups
    pub fn has_one_of_fields(&self) -> bool {
        !self.one_of_groups.is_empty()
    }
}

/// An enum, hoisted to package level
#[derive(Debug, Clone, Default)]
pub struct Enum {
    /// Package-level display name (enclosing names concatenated)
    pub name: String,
    /// Values in declaration order
    ///
    /// Values render by name, never by tag, so proto alias values stay
    /// distinct.
    pub values: Vec<EnumValue>,
    /// Documentation text, empty if none
    pub comment: String,
}

/// One enum value
#[derive(Debug, Clone)]
pub struct EnumValue {
    /// Declared value name
    pub name: String,
    /// Documentation text, empty if none
    pub comment: String,
}

/// A service and its callable methods
#[derive(Debug, Clone, Default)]
pub struct Service {
    /// Declared service name
    pub name: String,
    /// Methods in declaration order, client-streaming methods excluded
    pub methods: Vec<Method>,
    /// Documentation text, empty if none
    pub comment: String,
}

/// One callable RPC method
#[derive(Debug, Clone)]
pub struct Method {
    /// Declared method name
    pub name: String,
    /// Wire URL template, may contain `{path_param}` placeholders
    pub url: String,
    /// Input argument type
    pub input: MethodArgument,
    /// Output argument type
    pub output: MethodArgument,
    /// Whether the server streams its response
    pub server_streaming: bool,
    /// Whether the client streams its request (always false for emitted
    /// methods; kept so the record mirrors the descriptor)
    pub client_streaming: bool,
    /// HTTP verb used on the wire
    pub http_method: String,
    /// Request body selector from the HTTP annotation: `*` is the whole
    /// request, empty is no body, a dotted path selects a nested field.
    /// `None` means the method had no annotation.
    pub http_request_body: Option<String>,
    /// Documentation text, empty if none
    pub comment: String,
}

/// Type information about a method argument
#[derive(Debug, Clone)]
pub struct MethodArgument {
    /// Type reference, always a registry-resolved name
    pub type_ref: TypeReference,
    /// Externality of the type reference
    pub externality: Externality,
}

/// One import at the top of a generated file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// Module alias, unique within the importing file; references render
    /// as `Alias.TypeName`
    pub module_identifier: String,
    /// Resolved import path, output extension stripped
    pub source_file: String,
}

/// Location of one registry-resolved type reference inside a file record
///
/// The global pass revisits these sites to finalize externality once every
/// file is analyzed.
#[derive(Debug, Clone)]
pub enum TypeRefSite {
    /// A message field, by indices into the file's records
    Field {
        /// Index into `File::messages`
        message: usize,
        /// Index into `Message::fields`
        field: usize,
    },
    /// A method's input argument
    MethodInput {
        /// Index into `File::services`
        service: usize,
        /// Index into `Service::methods`
        method: usize,
    },
    /// A method's output argument
    MethodOutput {
        /// Index into `File::services`
        service: usize,
        /// Index into `Service::methods`
        method: usize,
    },
    /// The key type of a registered map entry
    MapKey {
        /// Fully qualified name of the map entry type
        entry: String,
    },
    /// The value type of a registered map entry
    MapValue {
        /// Fully qualified name of the map entry type
        entry: String,
    },
}

/// Everything needed to render one output unit
#[derive(Debug, Clone, Default)]
pub struct File {
    /// Source proto file name
    pub name: String,
    /// Derived output file name
    pub ts_file_name: String,
    /// Resolved imports; final only after the global pass
    pub dependencies: Vec<Dependency>,
    /// Hoisted enums in declaration order
    pub enums: Vec<Enum>,
    /// Hoisted messages in declaration order
    pub messages: Vec<Message>,
    /// Services in declaration order
    pub services: Vec<Service>,
    /// Fully qualified names this file depends on externally; a to-do
    /// list consumed by the global pass
    pub external_depending_types: Vec<String>,
    /// Every registry-resolved type reference in this file, used to catch
    /// same-package-different-file dependencies in the global pass
    pub non_scalar_refs: Vec<TypeRefSite>,
}

impl File {
    /// Initialise a file record, deriving the output name
    pub fn new(name: &str) -> File {
        File {
            name: name.to_string(),
            ts_file_name: ts_file_name(name),
            ..Default::default()
        }
    }

    /// Whether the file declares nothing renderable
    pub fn is_empty(&self) -> bool {
        self.enums.is_empty() && self.messages.is_empty() && self.services.is_empty()
    }

    /// Whether any message needs the one-of support type utilities
    pub fn needs_one_of_support(&self) -> bool {
        self.messages.iter().any(|m| m.has_one_of_fields())
    }

    /// Whether any service method streams from the server
    pub fn has_server_streaming_method(&self) -> bool {
        self.services
            .iter()
            .flat_map(|s| &s.methods)
            .any(|m| m.server_streaming)
    }

    /// Whether any service method is a plain unary call
    pub fn has_unary_call_method(&self) -> bool {
        self.services
            .iter()
            .flat_map(|s| &s.methods)
            .any(|m| !m.server_streaming && !m.client_streaming)
    }

    /// Whether this file's services need the shared fetch module
    pub fn needs_fetch_module(&self) -> bool {
        !self.services.is_empty()
            && (self.has_unary_call_method() || self.has_server_streaming_method())
    }

    /// Dependencies in a stable order for rendering
    pub fn stable_dependencies(&self) -> Vec<&Dependency> {
        let mut out: Vec<&Dependency> = self.dependencies.iter().collect();
        out.sort_by(|a, b| a.source_file.cmp(&b.source_file));
        out
    }

    /// Record a registry-resolved type reference for the global pass
    pub fn track_non_scalar(&mut self, type_ref: &TypeReference, site: TypeRefSite) {
        if type_ref.named().is_some() {
            self.non_scalar_refs.push(site);
        }
    }
}

/// Module alias for a dependency: upper-camel package plus file stem
///
/// The alias acts as a namespace for every type imported from one foreign
/// file, so it has to be unique per (package, file) and deterministic.
pub fn module_alias(package: &str, file_name: &str) -> String {
    format!(
        "{}{}",
        package.to_upper_camel_case(),
        file_stem(file_name).to_upper_camel_case()
    )
}

/// Output file name for a proto file: extension replaced with `.pb.ts`
pub fn ts_file_name(file_name: &str) -> String {
    match file_name.rsplit_once('/') {
        Some((dir, base)) => format!("{}/{}.pb.ts", dir, strip_extension(base)),
        None => format!("{}.pb.ts", strip_extension(file_name)),
    }
}

fn file_stem(file_name: &str) -> &str {
    let base = match file_name.rsplit_once('/') {
        Some((_, base)) => base,
        None => file_name,
    };
    strip_extension(base)
}

fn strip_extension(base: &str) -> &str {
    match base.rsplit_once('.') {
        Some((stem, _)) => stem,
        None => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_alias() {
        let tests = [
            ("empty", "", "", ""),
            ("simple", "mypackage", "service.proto", "MypackageService"),
            (
                "with file path",
                "mypackage",
                "path/to/proto/file/service.proto",
                "MypackageService",
            ),
            (
                "with underscore",
                "my_package",
                "cool_service.proto",
                "MyPackageCoolService",
            ),
            (
                "with dash",
                "my-package",
                "cool-service.proto",
                "MyPackageCoolService",
            ),
            (
                "with dash and underscore",
                "my-package",
                "cool_service.proto",
                "MyPackageCoolService",
            ),
            (
                "with dots",
                "my.package",
                "cool.service.proto",
                "MyPackageCoolService",
            ),
        ];
        for (name, package, file, want) in tests {
            assert_eq!(module_alias(package, file), want, "case {}", name);
        }
    }

    #[test]
    fn test_ts_file_name() {
        assert_eq!(ts_file_name("service.proto"), "service.pb.ts");
        assert_eq!(ts_file_name("a/b/log.proto"), "a/b/log.pb.ts");
        assert_eq!(
            ts_file_name("path/cool.service.proto"),
            "path/cool.service.pb.ts"
        );
    }

    #[test]
    fn test_externality_state_machine() {
        let mut e = Externality::default();
        assert_eq!(e, Externality::Unknown);
        assert_eq!(e.finalized(), None);

        e = Externality::provisional(true);
        assert_eq!(e, Externality::ProvisionallyExternal);
        assert_eq!(e.finalized(), None);
        assert!(!e.is_external());

        e.finalize(false);
        assert_eq!(e, Externality::Internal);
        assert_eq!(e.finalized(), Some(false));

        let mut e = Externality::provisional(false);
        e.finalize(true);
        assert!(e.is_external());
        assert_eq!(e.finalized(), Some(true));
    }

    #[test]
    fn test_stable_dependencies_sorted_by_source() {
        let mut file = File::new("a.proto");
        file.dependencies = vec![
            Dependency {
                module_identifier: "Z".to_string(),
                source_file: "./z.pb".to_string(),
            },
            Dependency {
                module_identifier: "A".to_string(),
                source_file: "./a.pb".to_string(),
            },
        ];
        let stable = file.stable_dependencies();
        assert_eq!(stable[0].module_identifier, "A");
        assert_eq!(stable[1].module_identifier, "Z");
    }

    #[test]
    fn test_needs_fetch_module() {
        let mut file = File::new("svc.proto");
        assert!(!file.needs_fetch_module());

        file.services.push(Service {
            name: "Svc".to_string(),
            methods: vec![Method {
                name: "Call".to_string(),
                url: "/pkg.Svc/Call".to_string(),
                input: MethodArgument {
                    type_ref: TypeReference::Named(".pkg.In".to_string()),
                    externality: Externality::Internal,
                },
                output: MethodArgument {
                    type_ref: TypeReference::Named(".pkg.Out".to_string()),
                    externality: Externality::Internal,
                },
                server_streaming: false,
                client_streaming: false,
                http_method: "POST".to_string(),
                http_request_body: None,
                comment: String::new(),
            }],
            comment: String::new(),
        });
        assert!(file.needs_fetch_module());
    }
}
