//! HTTP-binding annotation recovery
//!
//! The `google.api.http` method option is an extension on `MethodOptions`,
//! and prost's typed decode drops extension data. This module recovers the
//! rules from the raw request bytes with prost-reflect: the descriptor pool
//! is built from the request's own `proto_file` set (protoc ships all
//! transitive imports, so the `google.api` definitions are present whenever
//! a method is annotated), the raw bytes are re-decoded as a
//! `DynamicMessage`, and every annotated method's rule is cached keyed by
//! its file, service, and method names.

use std::collections::HashMap;

use prost::Message;
use prost_reflect::{DescriptorPool, DynamicMessage, ExtensionDescriptor, ReflectMessage, Value};
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet,
};

use crate::GeneratorError;

/// Extension name for the HTTP binding rule
const HTTP_EXTENSION_NAME: &str = "google.api.http";

/// File that defines the descriptor types every extension hangs off
const DESCRIPTOR_PROTO_FILE: &str = "google/protobuf/descriptor.proto";

/// File that defines the plugin protocol request
const PLUGIN_PROTO_FILE: &str = "google/protobuf/compiler/plugin.proto";

/// Message name of the plugin protocol request
const REQUEST_MESSAGE_NAME: &str = "google.protobuf.compiler.CodeGeneratorRequest";

/// The verb-bearing pattern fields of `google.api.HttpRule`
const VERB_FIELDS: [&str; 5] = ["get", "put", "post", "delete", "patch"];

/// One parsed `google.api.http` rule
#[derive(Debug, Clone)]
pub struct HttpRule {
    /// HTTP verb, upper case
    pub http_method: String,
    /// URL template from the annotation, may contain path parameters
    pub url: String,
    /// Raw body selector from the annotation
    pub body: String,
}

/// All HTTP rules recovered from one request
#[derive(Debug, Default)]
pub struct HttpAnnotations {
    /// Rules keyed by (file name, service name, method name)
    rules: HashMap<(String, String, String), HttpRule>,
}

impl HttpAnnotations {
    /// Record a rule for one method
    pub fn insert(&mut self, file: &str, service: &str, method: &str, rule: HttpRule) {
        self.rules.insert(
            (file.to_string(), service.to_string(), method.to_string()),
            rule,
        );
    }

    /// Look up the rule for one method, if it was annotated
    pub fn get(&self, file: &str, service: &str, method: &str) -> Option<&HttpRule> {
        self.rules
            .get(&(file.to_string(), service.to_string(), method.to_string()))
    }
}

/// Recover every method's HTTP rule from the raw request bytes
///
/// Returns an empty index when the request cannot carry interpreted
/// annotations (no file imports the descriptor definitions).
pub fn extract(
    bytes: &[u8],
    files: &[FileDescriptorProto],
) -> Result<HttpAnnotations, GeneratorError> {
    let mut annotations = HttpAnnotations::default();

    // Interpreted extensions require descriptor.proto in the import
    // closure; without it there is nothing to recover.
    if !files.iter().any(|f| f.name() == DESCRIPTOR_PROTO_FILE) {
        return Ok(annotations);
    }

    let mut set = FileDescriptorSet {
        file: files.to_vec(),
    };
    if !files.iter().any(|f| f.name() == PLUGIN_PROTO_FILE) {
        set.file.push(plugin_descriptor());
    }

    let set_bytes = set.encode_to_vec();
    let pool = DescriptorPool::decode(set_bytes.as_slice())
        .map_err(|e| GeneratorError::InvalidDescriptorSet(e.to_string()))?;

    let ext_field = match pool.get_extension_by_name(HTTP_EXTENSION_NAME) {
        Some(ext) => ext,
        // annotations.proto is not part of the request, so no method has a rule
        None => return Ok(annotations),
    };
    let request_desc = pool
        .get_message_by_name(REQUEST_MESSAGE_NAME)
        .ok_or_else(|| {
            GeneratorError::InvalidDescriptorSet(format!("{} not in pool", REQUEST_MESSAGE_NAME))
        })?;

    let request = DynamicMessage::decode(request_desc, bytes)?;

    if let Some(cow) = request.get_field_by_name("proto_file") {
        if let Value::List(file_values) = cow.as_ref() {
            for file_value in file_values.iter() {
                if let Some(file_msg) = file_value.as_message() {
                    collect_from_file(&mut annotations, &ext_field, file_msg)?;
                }
            }
        }
    }

    Ok(annotations)
}

/// Collect rules from a FileDescriptorProto DynamicMessage
fn collect_from_file(
    annotations: &mut HttpAnnotations,
    ext_field: &ExtensionDescriptor,
    file: &DynamicMessage,
) -> Result<(), GeneratorError> {
    let file_name = string_field(file, "name");

    if let Some(cow) = file.get_field_by_name("service") {
        if let Value::List(services) = cow.as_ref() {
            for service_value in services.iter() {
                if let Some(service_msg) = service_value.as_message() {
                    collect_from_service(annotations, ext_field, &file_name, service_msg)?;
                }
            }
        }
    }

    Ok(())
}

/// Collect rules from a ServiceDescriptorProto DynamicMessage
fn collect_from_service(
    annotations: &mut HttpAnnotations,
    ext_field: &ExtensionDescriptor,
    file_name: &str,
    service: &DynamicMessage,
) -> Result<(), GeneratorError> {
    let service_name = string_field(service, "name");

    if let Some(cow) = service.get_field_by_name("method") {
        if let Value::List(methods) = cow.as_ref() {
            for method_value in methods.iter() {
                let method_msg = match method_value.as_message() {
                    Some(m) => m,
                    None => continue,
                };
                let method_name = string_field(method_msg, "name");

                let opts_cow = match method_msg.get_field_by_name("options") {
                    Some(c) => c,
                    None => continue,
                };
                let opts_msg = match opts_cow.as_ref().as_message() {
                    Some(m) => m,
                    None => continue,
                };
                if !opts_msg.has_extension(ext_field) {
                    continue;
                }

                let ext_value = opts_msg.get_extension(ext_field);
                let rule = rule_from_value(&method_name, &ext_value)?;
                annotations.insert(file_name, &service_name, &method_name, rule);
            }
        }
    }

    Ok(())
}

/// Convert a `google.api.HttpRule` value into an [`HttpRule`]
///
/// Exactly one of GET/POST/PUT/PATCH/DELETE must carry the pattern;
/// anything else (a `custom` pattern, or a rule with no pattern at all) is
/// an unsupported-pattern fatal error.
fn rule_from_value(method_name: &str, value: &Value) -> Result<HttpRule, GeneratorError> {
    let msg = value
        .as_message()
        .ok_or_else(|| GeneratorError::UnsupportedHttpPattern(method_name.to_string()))?;
    let desc = msg.descriptor();

    for verb in VERB_FIELDS {
        if let Some(fd) = desc.get_field_by_name(verb) {
            if msg.has_field(&fd) {
                let url = msg
                    .get_field(&fd)
                    .as_str()
                    .unwrap_or_default()
                    .to_string();
                return Ok(HttpRule {
                    http_method: verb.to_uppercase(),
                    url,
                    body: string_field(msg, "body"),
                });
            }
        }
    }

    Err(GeneratorError::UnsupportedHttpPattern(
        method_name.to_string(),
    ))
}

/// Read a singular string field off a DynamicMessage by name
fn string_field(msg: &DynamicMessage, name: &str) -> String {
    msg.get_field_by_name(name)
        .and_then(|v| v.as_ref().as_str().map(|s| s.to_string()))
        .unwrap_or_default()
}

/// Hand-built descriptor for the plugin protocol request
///
/// Only the fields this generator reads are declared; everything else in
/// the raw bytes lands in unknown fields, which the dynamic decode keeps.
fn plugin_descriptor() -> FileDescriptorProto {
    let string_field = |name: &str, number: i32, label: Label| FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(label as i32),
        r#type: Some(Type::String as i32),
        ..Default::default()
    };

    FileDescriptorProto {
        name: Some(PLUGIN_PROTO_FILE.to_string()),
        package: Some("google.protobuf.compiler".to_string()),
        dependency: vec![DESCRIPTOR_PROTO_FILE.to_string()],
        message_type: vec![DescriptorProto {
            name: Some("CodeGeneratorRequest".to_string()),
            field: vec![
                string_field("file_to_generate", 1, Label::Repeated),
                string_field("parameter", 2, Label::Optional),
                FieldDescriptorProto {
                    name: Some("proto_file".to_string()),
                    number: Some(15),
                    label: Some(Label::Repeated as i32),
                    r#type: Some(Type::Message as i32),
                    type_name: Some(".google.protobuf.FileDescriptorProto".to_string()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }],
        syntax: Some("proto2".to_string()),
        ..Default::default()
    }
}
