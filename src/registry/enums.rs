//! Enum analysis

use prost_types::EnumDescriptorProto;

use crate::comments::{self, CommentIndex, ENUM_VALUE};
use crate::data;
use crate::registry::{EntityKind, Registry, TypeInformation};
use crate::GeneratorError;

impl Registry {
    /// Analyse an enum declaration, hoisting it to package level
    ///
    /// Values are recorded by name only; rendering by name keeps proto
    /// alias values distinct.
    pub(crate) fn analyse_enum(
        &mut self,
        file: &mut data::File,
        package: &str,
        file_name: &str,
        parents: &[String],
        enum_type: &EnumDescriptorProto,
        comment: Option<&CommentIndex>,
    ) -> Result<(), GeneratorError> {
        let package_identifier = Self::package_level_identifier(parents, enum_type.name());
        let fq_name = format!(
            ".{}.{}{}",
            package,
            Self::parent_prefix(parents),
            enum_type.name()
        );

        self.register(TypeInformation {
            fully_qualified_name: fq_name,
            package: package.to_string(),
            file: file_name.to_string(),
            package_identifier: package_identifier.clone(),
            local_identifier: enum_type.name().to_string(),
            kind: EntityKind::Enum,
            is_map_entry: false,
            key_type: None,
            value_type: None,
        })?;

        let mut enum_data = data::Enum {
            name: package_identifier,
            comment: comments::text_of(comment),
            ..Default::default()
        };
        for (index, value) in enum_type.value.iter().enumerate() {
            enum_data.values.push(data::EnumValue {
                name: value.name().to_string(),
                comment: comments::text_under(comment, &[ENUM_VALUE, index as i32]),
            });
        }

        file.enums.push(enum_data);
        Ok(())
    }
}
