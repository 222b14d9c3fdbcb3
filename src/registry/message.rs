//! Message analysis: recursive descent with hoisting
//!
//! Nested messages and enums are flattened to package-level entities. The
//! display identifier concatenates every enclosing name so two `Status`
//! enums under different parents cannot collide; the registry key keeps
//! the dotted nesting path for uniqueness beyond display purposes.

use prost_types::DescriptorProto;

use crate::comments::{self, CommentIndex, MESSAGE_ENUM, MESSAGE_FIELD, MESSAGE_NESTED};
use crate::data::{self, Externality, TypeRefSite};
use crate::registry::{EntityKind, MapEntryType, Registry, TypeInformation};
use crate::GeneratorError;

impl Registry {
    /// Analyse a message declaration and everything nested inside it
    pub(crate) fn analyse_message(
        &mut self,
        file: &mut data::File,
        package: &str,
        file_name: &str,
        parents: &[String],
        message: &DescriptorProto,
        comment: Option<&CommentIndex>,
    ) -> Result<(), GeneratorError> {
        let package_identifier = Self::package_level_identifier(parents, message.name());
        let fq_name = format!(
            ".{}.{}{}",
            package,
            Self::parent_prefix(parents),
            message.name()
        );

        let is_map_entry = message
            .options
            .as_ref()
            .map(|o| o.map_entry())
            .unwrap_or(false);
        if is_map_entry {
            return self.analyse_map_entry(
                file,
                package,
                file_name,
                message,
                &fq_name,
                &package_identifier,
            );
        }

        self.register(TypeInformation {
            fully_qualified_name: fq_name.clone(),
            package: package.to_string(),
            file: file_name.to_string(),
            package_identifier: package_identifier.clone(),
            local_identifier: message.name().to_string(),
            kind: EntityKind::Message,
            is_map_entry: false,
            key_type: None,
            value_type: None,
        })?;

        let mut message_data = data::Message {
            name: package_identifier,
            fq_type: fq_name.clone(),
            comment: comments::text_of(comment),
            ..Default::default()
        };

        let mut nested_parents = parents.to_vec();
        nested_parents.push(message.name().to_string());

        // nested enums get pulled out to the top level of the file
        for (index, enum_type) in message.enum_type.iter().enumerate() {
            self.analyse_enum(
                file,
                package,
                file_name,
                &nested_parents,
                enum_type,
                comment.and_then(|c| c.sub(&[MESSAGE_ENUM, index as i32])),
            )?;
            message_data.enums.push(data::NestedEnum {
                name: enum_type.name().to_string(),
                fq_type: format!("{}.{}", fq_name, enum_type.name()),
            });
        }

        // nested messages too
        for (index, nested) in message.nested_type.iter().enumerate() {
            self.analyse_message(
                file,
                package,
                file_name,
                &nested_parents,
                nested,
                comment.and_then(|c| c.sub(&[MESSAGE_NESTED, index as i32])),
            )?;
        }

        for (index, one_of) in message.oneof_decl.iter().enumerate() {
            message_data
                .one_of_names
                .insert(index as i32, one_of.name().to_string());
        }

        // this message's own slot in the file record; nested recursion has
        // already pushed everything it hoisted
        let message_index = file.messages.len();
        for (index, field) in message.field.iter().enumerate() {
            self.analyse_field(
                file,
                &mut message_data,
                message_index,
                package,
                field,
                comment.and_then(|c| c.sub(&[MESSAGE_FIELD, index as i32])),
            );
        }

        file.messages.push(message_data);
        Ok(())
    }

    /// Special-case a synthetic map entry message
    ///
    /// No message record is emitted; instead the key and value types are
    /// extracted onto the registered entry so map fields can render an
    /// index signature. The two types are still tracked for the global
    /// external-dependency pass.
    fn analyse_map_entry(
        &mut self,
        file: &mut data::File,
        package: &str,
        file_name: &str,
        message: &DescriptorProto,
        fq_name: &str,
        package_identifier: &str,
    ) -> Result<(), GeneratorError> {
        let mut key_type = None;
        let mut value_type = None;

        for field in &message.field {
            let type_ref = super::resolve_field_type(field);
            let externality = match type_ref.named() {
                Some(named) => {
                    Externality::provisional(Self::is_outside_package(named, package))
                }
                None => Externality::Internal,
            };

            if let Some(named) = type_ref.named() {
                if externality == Externality::ProvisionallyExternal {
                    file.external_depending_types.push(named.to_string());
                }
                let site = match field.name() {
                    "key" => TypeRefSite::MapKey {
                        entry: fq_name.to_string(),
                    },
                    _ => TypeRefSite::MapValue {
                        entry: fq_name.to_string(),
                    },
                };
                file.non_scalar_refs.push(site);
            }

            let entry_type = MapEntryType {
                type_ref,
                externality,
            };
            match field.name() {
                "key" => key_type = Some(entry_type),
                "value" => value_type = Some(entry_type),
                _ => {}
            }
        }

        self.register(TypeInformation {
            fully_qualified_name: fq_name.to_string(),
            package: package.to_string(),
            file: file_name.to_string(),
            package_identifier: package_identifier.to_string(),
            local_identifier: message.name().to_string(),
            kind: EntityKind::Message,
            is_map_entry: true,
            key_type,
            value_type,
        })
    }
}
