//! Per-file analysis

use prost_types::FileDescriptorProto;

use crate::annotations::HttpAnnotations;
use crate::comments::{CommentIndex, FILE_ENUM, FILE_MESSAGE, FILE_SERVICE};
use crate::data::{self, Dependency};
use crate::paths;
use crate::registry::Registry;
use crate::GeneratorError;

impl Registry {
    /// Analyse one file of the request into its rendering record
    ///
    /// Entities are visited in declaration order: enums, then messages
    /// (each recursively), then services. Every visit registers the entity
    /// in the shared type registry as a side effect. A child failure
    /// propagates; nothing is partially committed for retry.
    pub(crate) fn analyse_file(
        &mut self,
        f: &FileDescriptorProto,
        http: &HttpAnnotations,
    ) -> Result<data::File, GeneratorError> {
        let mut file = data::File::new(f.name());
        let package = f.package();
        let comments = CommentIndex::from_source_code_info(f.source_code_info.as_ref());
        let parents: Vec<String> = Vec::new();

        for (index, enum_type) in f.enum_type.iter().enumerate() {
            self.analyse_enum(
                &mut file,
                package,
                f.name(),
                &parents,
                enum_type,
                comments.sub(&[FILE_ENUM, index as i32]),
            )?;
        }

        // each message descends recursively, hoisting what it finds
        for (index, message) in f.message_type.iter().enumerate() {
            self.analyse_message(
                &mut file,
                package,
                f.name(),
                &parents,
                message,
                comments.sub(&[FILE_MESSAGE, index as i32]),
            )?;
        }

        for (index, service) in f.service.iter().enumerate() {
            self.analyse_service(
                &mut file,
                package,
                f.name(),
                service,
                http,
                comments.sub(&[FILE_SERVICE, index as i32]),
            )?;
        }

        // callable methods go through the shared fetch module
        if file.needs_fetch_module() {
            let fetch_path = self.options().fetch_module_path();
            file.dependencies.push(Dependency {
                module_identifier: "fm".to_string(),
                source_file: paths::relative_module_path(&file.ts_file_name, &fetch_path),
            });
        }

        Ok(file)
    }
}
