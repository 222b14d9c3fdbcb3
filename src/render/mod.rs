//! TypeScript rendering
//!
//! A pure function of the finished data model: the registry is consulted
//! read-only to resolve named type references, every decision about what
//! is external or imported was already made by the analysis phases.

mod fetch;

use heck::ToLowerCamelCase;

use crate::data::{self, Externality, ScalarType, TypeReference, WellKnownType};
use crate::options::Options;
use crate::registry::Registry;
use crate::GeneratorError;

pub use fetch::fetch_module;

/// Banner placed at the top of every generated file
const GENERATED_BANNER: &str =
    "/*\n* This file is a generated Typescript file for GRPC Gateway, DO NOT MODIFY\n*/\n";

/// Suppression header omitted when the styling check is enabled
const SUPPRESSION_HEADER: &str = "/* eslint-disable */\n// @ts-nocheck\n";

/// One-of support types, emitted once per file that needs them
const ONE_OF_SUPPORT: &str = r#"type Absent<T, K extends keyof T> = { [k in Exclude<keyof T, K>]?: undefined };
type OneOf<T> =
  | { [k in keyof T]?: undefined }
  | (
    keyof T extends infer K ?
      (K extends string & keyof T ? { [k in K]: T[K] } & Absent<T, K>
        : never)
    : never);
"#;

/// Render one file's data model into TypeScript source
pub fn render_file(
    registry: &Registry,
    options: &Options,
    file: &data::File,
) -> Result<String, GeneratorError> {
    if file.is_empty() {
        return Ok("export default {}".to_string());
    }

    let mut out = String::new();
    push_header(&mut out, options);

    for dependency in file.stable_dependencies() {
        out.push_str(&format!(
            "import * as {} from \"{}\"\n",
            dependency.module_identifier, dependency.source_file
        ));
    }

    if file.needs_one_of_support() {
        out.push('\n');
        out.push_str(ONE_OF_SUPPORT);
    }

    for enum_data in &file.enums {
        out.push('\n');
        render_enum(&mut out, enum_data);
    }

    for message in &file.messages {
        out.push('\n');
        render_message(&mut out, registry, options, message)?;
    }

    for service in &file.services {
        out.push('\n');
        render_service(&mut out, registry, options, service)?;
    }

    Ok(out.trim().to_string())
}

/// The suppression header plus the generated-file banner
pub(crate) fn push_header(out: &mut String, options: &Options) {
    if !options.enable_styling_check {
        out.push_str(SUPPRESSION_HEADER);
    }
    out.push_str(GENERATED_BANNER);
}

fn render_enum(out: &mut String, enum_data: &data::Enum) {
    if !enum_data.comment.is_empty() {
        out.push_str(&enum_data.comment);
        out.push('\n');
    }
    out.push_str(&format!("export enum {} {{\n", enum_data.name));
    for value in &enum_data.values {
        if !value.comment.is_empty() {
            out.push_str(&indent(&value.comment, "  "));
            out.push('\n');
        }
        out.push_str(&format!("  {} = \"{}\",\n", value.name, value.name));
    }
    out.push_str("}\n");
}

fn render_message(
    out: &mut String,
    registry: &Registry,
    options: &Options,
    message: &data::Message,
) -> Result<(), GeneratorError> {
    if !message.comment.is_empty() {
        out.push_str(&message.comment);
        out.push('\n');
    }

    if message.has_one_of_fields() {
        // the one-of groups intersect a base type of the plain fields, so
        // setting one group member excludes the others at the type level
        out.push_str(&format!("type Base{} = {{\n", message.name));
        for index in &message.non_one_of_fields {
            render_field(out, registry, options, &message.fields[*index])?;
        }
        out.push_str("}\n\n");

        out.push_str(&format!("export type {} = Base{}", message.name, message.name));
        for fields in message.one_of_groups.values() {
            let mut members = Vec::new();
            for index in fields {
                let field = &message.fields[*index];
                members.push(format!(
                    "{}: {}",
                    field.render_name(options.use_proto_names),
                    field_type(registry, field)?
                ));
            }
            out.push_str(&format!("\n  & OneOf<{{ {} }}>", members.join("; ")));
        }
        out.push('\n');
    } else {
        out.push_str(&format!("export type {} = {{\n", message.name));
        for field in &message.fields {
            render_field(out, registry, options, field)?;
        }
        out.push_str("}\n");
    }

    Ok(())
}

fn render_field(
    out: &mut String,
    registry: &Registry,
    options: &Options,
    field: &data::Field,
) -> Result<(), GeneratorError> {
    if !field.comment.is_empty() {
        out.push_str(&indent(&field.comment, "  "));
        out.push('\n');
    }
    out.push_str(&format!(
        "  {}?: {};\n",
        field.render_name(options.use_proto_names),
        field_type(registry, field)?
    ));
    Ok(())
}

fn field_type(registry: &Registry, field: &data::Field) -> Result<String, GeneratorError> {
    ts_type(
        registry,
        &field.type_ref,
        &field.externality,
        field.is_repeated,
    )
}

/// The TypeScript representation of one type reference
pub(crate) fn ts_type(
    registry: &Registry,
    type_ref: &TypeReference,
    externality: &Externality,
    is_repeated: bool,
) -> Result<String, GeneratorError> {
    let base = match type_ref {
        TypeReference::Scalar(scalar) => scalar_ts(*scalar).to_string(),
        TypeReference::WellKnown(well_known) => well_known_ts(*well_known).to_string(),
        TypeReference::Named(fq_name) => {
            let info = registry
                .lookup(fq_name)
                .ok_or_else(|| GeneratorError::MissingType(fq_name.clone()))?;
            if info.is_map_entry {
                // maps render as an index signature; the repeated label on
                // the synthetic entry field never shows through
                let key = info
                    .key_type
                    .as_ref()
                    .ok_or_else(|| GeneratorError::MissingType(format!("{} key", fq_name)))?;
                let value = info
                    .value_type
                    .as_ref()
                    .ok_or_else(|| GeneratorError::MissingType(format!("{} value", fq_name)))?;
                let key_ts = ts_type(registry, &key.type_ref, &key.externality, false)?;
                let value_ts = ts_type(registry, &value.type_ref, &value.externality, false)?;
                return Ok(format!("{{[key: {}]: {}}}", key_ts, value_ts));
            }
            if externality.is_external() {
                format!(
                    "{}.{}",
                    data::module_alias(&info.package, &info.file),
                    info.package_identifier
                )
            } else {
                info.package_identifier.clone()
            }
        }
    };

    Ok(if is_repeated {
        format!("{}[]", base)
    } else {
        base
    })
}

/// Fixed scalar representation
fn scalar_ts(scalar: ScalarType) -> &'static str {
    match scalar {
        // 64 bit integers lose precision in a JS number, the gateway
        // serializes them as strings
        ScalarType::Int64
        | ScalarType::Uint64
        | ScalarType::Sint64
        | ScalarType::Fixed64
        | ScalarType::Sfixed64
        | ScalarType::String => "string",
        ScalarType::Float
        | ScalarType::Double
        | ScalarType::Int32
        | ScalarType::Sint32
        | ScalarType::Uint32
        | ScalarType::Fixed32
        | ScalarType::Sfixed32 => "number",
        ScalarType::Bool => "boolean",
        ScalarType::Bytes => "Uint8Array",
    }
}

/// Fixed well-known type representation
fn well_known_ts(well_known: WellKnownType) -> &'static str {
    match well_known {
        WellKnownType::Timestamp | WellKnownType::Duration => "string",
        WellKnownType::Struct | WellKnownType::Value | WellKnownType::Any => "unknown",
        WellKnownType::ListValue => "unknown[]",
        WellKnownType::NullValue => "null",
        WellKnownType::FieldMask => "string[]",
        WellKnownType::Empty => "{}",
    }
}

fn render_service(
    out: &mut String,
    registry: &Registry,
    options: &Options,
    service: &data::Service,
) -> Result<(), GeneratorError> {
    if !service.comment.is_empty() {
        out.push_str(&service.comment);
        out.push('\n');
    }
    out.push_str(&format!("export class {} {{\n", service.name));
    for method in &service.methods {
        render_method(out, registry, options, method)?;
    }
    out.push_str("}\n");
    Ok(())
}

fn render_method(
    out: &mut String,
    registry: &Registry,
    options: &Options,
    method: &data::Method,
) -> Result<(), GeneratorError> {
    let input = ts_type(
        registry,
        &method.input.type_ref,
        &method.input.externality,
        false,
    )?;
    let output = ts_type(
        registry,
        &method.output.type_ref,
        &method.output.externality,
        false,
    )?;

    let (mut url, path_params) = render_url(&method.url, options.use_proto_names);

    let body = match method.http_request_body.as_deref() {
        // no annotation: RPC-style POST of the whole request
        None => Some("JSON.stringify(req)".to_string()),
        Some("*") => Some("JSON.stringify(req)".to_string()),
        Some("") => None,
        Some(selector) => {
            let chain: String = selector
                .split('.')
                .map(|part| format!("[\"{}\"]", field_name(part, options.use_proto_names)))
                .collect();
            Some(format!("JSON.stringify(req{})", chain))
        }
    };

    // bodyless GET/DELETE carries the request in the query string instead
    if body.is_none() && (method.http_method == "GET" || method.http_method == "DELETE") {
        let params = path_params
            .iter()
            .map(|p| format!("\"{}\"", p))
            .collect::<Vec<_>>()
            .join(", ");
        url.push_str(&format!("?${{fm.renderURLSearchParams(req, [{}])}}", params));
    }

    let mut init = format!("{{...initReq, method: \"{}\"", method.http_method);
    if let Some(body) = body {
        init.push_str(&format!(", body: {}", body));
    }
    init.push('}');

    if !method.comment.is_empty() {
        out.push_str(&indent(&method.comment, "  "));
        out.push('\n');
    }

    if method.server_streaming {
        out.push_str(&format!(
            "  static {}(req: {}, entityNotifier?: fm.NotifyStreamEntityArrival<{}>, initReq?: fm.InitReq): Promise<void> {{\n",
            method.name, input, output
        ));
        out.push_str(&format!(
            "    return fm.fetchStreamingRequest<{}, {}>(`{}`, entityNotifier, {})\n",
            input, output, url, init
        ));
    } else {
        out.push_str(&format!(
            "  static {}(req: {}, initReq?: fm.InitReq): Promise<{}> {{\n",
            method.name, input, output
        ));
        out.push_str(&format!(
            "    return fm.fetchReq<{}, {}>(`{}`, {})\n",
            input, output, url, init
        ));
    }
    out.push_str("  }\n");
    Ok(())
}

/// Substitute `{path_param}` placeholders with template-literal lookups
///
/// Returns the rewritten URL and the substituted parameter names, which
/// the query-string rendering excludes. A `{name=pattern}` placeholder
/// binds on the name alone.
fn render_url(url: &str, use_proto_names: bool) -> (String, Vec<String>) {
    let mut out = String::new();
    let mut params = Vec::new();
    let mut rest = url;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) => {
                let inner = &after[..end];
                let name = inner.split('=').next().unwrap_or(inner);
                let field = field_name(name, use_proto_names);
                out.push_str(&format!("${{req[\"{}\"]}}", field));
                params.push(field);
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);

    (out, params)
}

fn field_name(name: &str, use_proto_names: bool) -> String {
    if use_proto_names {
        name.to_string()
    } else {
        name.to_lower_camel_case()
    }
}

fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| format!("{}{}", prefix, line))
        .collect::<Vec<_>>()
        .join("\n")
}
