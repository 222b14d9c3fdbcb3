//! Field type resolution
//!
//! Converts a raw descriptor field type into a normalized reference:
//! message and enum kinds keep their fully qualified name for registry
//! resolution later, well-known types get a fixed tag, everything else is
//! a scalar. The repeated label is independent of type classification.

use std::collections::HashMap;

use heck::ToLowerCamelCase;
use once_cell::sync::Lazy;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::FieldDescriptorProto;

use crate::comments::{self, CommentIndex};
use crate::data::{self, Externality, ScalarType, TypeRefSite, TypeReference, WellKnownType};
use crate::registry::Registry;

/// Fixed mappings for the standard library message types
static WELL_KNOWN_TYPES: Lazy<HashMap<&'static str, WellKnownType>> = Lazy::new(|| {
    HashMap::from([
        (".google.protobuf.Timestamp", WellKnownType::Timestamp),
        (".google.protobuf.Duration", WellKnownType::Duration),
        (".google.protobuf.Struct", WellKnownType::Struct),
        (".google.protobuf.Value", WellKnownType::Value),
        (".google.protobuf.ListValue", WellKnownType::ListValue),
        (".google.protobuf.NullValue", WellKnownType::NullValue),
        (".google.protobuf.FieldMask", WellKnownType::FieldMask),
        (".google.protobuf.Any", WellKnownType::Any),
        (".google.protobuf.Empty", WellKnownType::Empty),
    ])
});

/// Resolve a raw descriptor field type into a normalized reference
pub fn resolve_field_type(field: &FieldDescriptorProto) -> TypeReference {
    match field.r#type() {
        Type::Message | Type::Enum | Type::Group => {
            match WELL_KNOWN_TYPES.get(field.type_name()) {
                Some(well_known) => TypeReference::WellKnown(*well_known),
                None => TypeReference::Named(field.type_name().to_string()),
            }
        }
        Type::String => TypeReference::Scalar(ScalarType::String),
        Type::Bool => TypeReference::Scalar(ScalarType::Bool),
        Type::Bytes => TypeReference::Scalar(ScalarType::Bytes),
        Type::Float => TypeReference::Scalar(ScalarType::Float),
        Type::Double => TypeReference::Scalar(ScalarType::Double),
        Type::Fixed32 => TypeReference::Scalar(ScalarType::Fixed32),
        Type::Sfixed32 => TypeReference::Scalar(ScalarType::Sfixed32),
        Type::Int32 => TypeReference::Scalar(ScalarType::Int32),
        Type::Sint32 => TypeReference::Scalar(ScalarType::Sint32),
        Type::Uint32 => TypeReference::Scalar(ScalarType::Uint32),
        Type::Fixed64 => TypeReference::Scalar(ScalarType::Fixed64),
        Type::Sfixed64 => TypeReference::Scalar(ScalarType::Sfixed64),
        Type::Int64 => TypeReference::Scalar(ScalarType::Int64),
        Type::Sint64 => TypeReference::Scalar(ScalarType::Sint64),
        Type::Uint64 => TypeReference::Scalar(ScalarType::Uint64),
    }
}

impl Registry {
    /// Analyse one field of a message
    ///
    /// `message_index` is the slot the owning message will occupy in the
    /// file record, so the global pass can find this field again.
    pub(crate) fn analyse_field(
        &mut self,
        file: &mut data::File,
        message_data: &mut data::Message,
        message_index: usize,
        package: &str,
        field: &FieldDescriptorProto,
        comment: Option<&CommentIndex>,
    ) {
        let type_ref = resolve_field_type(field);
        let externality = match type_ref.named() {
            Some(fq_name) => {
                Externality::provisional(Self::is_outside_package(fq_name, package))
            }
            None => Externality::Internal,
        };

        // proto3 optional fields sit in a synthetic one-of; they stay
        // plain optional fields
        let is_one_of = field.oneof_index.is_some() && !field.proto3_optional();

        let json_name = match field.json_name.as_deref() {
            Some(json_name) => json_name.to_string(),
            None => field.name().to_lower_camel_case(),
        };

        let field_data = data::Field {
            name: field.name().to_string(),
            json_name,
            type_ref,
            externality,
            is_repeated: field.label() == Label::Repeated,
            is_one_of,
            one_of_index: if is_one_of { field.oneof_index } else { None },
            message: message_data.fq_type.clone(),
            comment: comments::text_of(comment),
        };

        // possibly-external references become the global pass's to-do list
        if externality == Externality::ProvisionallyExternal {
            if let Some(fq_name) = field_data.type_ref.named() {
                file.external_depending_types.push(fq_name.to_string());
            }
        }

        let field_index = message_data.fields.len();
        file.track_non_scalar(
            &field_data.type_ref,
            TypeRefSite::Field {
                message: message_index,
                field: field_index,
            },
        );

        if field_data.is_one_of {
            let group = field.oneof_index();
            message_data
                .one_of_groups
                .entry(group)
                .or_default()
                .push(field_index);
        } else {
            message_data.non_one_of_fields.push(field_index);
        }

        message_data.fields.push(field_data);
    }
}
