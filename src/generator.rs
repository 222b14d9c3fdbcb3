//! Generation orchestration
//!
//! Ties the pieces together: parse options, analyse the request with a
//! fresh registry, render every file designated for generation, and emit
//! the shared fetch module when any generated unit needs it. One bad file
//! aborts the whole batch; partial generation output is worse than none.

use prost_types::compiler::code_generator_response::{Feature, File as ResponseFile};
use prost_types::compiler::{CodeGeneratorRequest, CodeGeneratorResponse};

use crate::annotations::HttpAnnotations;
use crate::options::{self, Options};
use crate::registry::Registry;
use crate::render;
use crate::GeneratorError;

/// Generate the full response for one request
pub fn generate_with_annotations(
    request: CodeGeneratorRequest,
    http: HttpAnnotations,
) -> Result<CodeGeneratorResponse, GeneratorError> {
    let options = Options::parse(request.parameter())?;
    options::init_logging(&options);

    let mut registry = Registry::new(options.clone());
    let files = registry.analyse(&request, &http)?;

    let mut response = CodeGeneratorResponse::default();
    let mut needs_fetch_module = false;

    for file in &files {
        if !registry.is_file_to_generate(&file.name) {
            tracing::debug!(file = %file.name, "not a file to generate, skipping");
            continue;
        }

        tracing::debug!(file = %file.ts_file_name, "generating file");
        let content = render::render_file(&registry, &options, file).map_err(|e| {
            GeneratorError::Render {
                file: file.name.clone(),
                reason: e.to_string(),
            }
        })?;

        response.file.push(ResponseFile {
            name: Some(file.ts_file_name.clone()),
            content: Some(content),
            ..Default::default()
        });
        needs_fetch_module = needs_fetch_module || file.needs_fetch_module();
    }

    if needs_fetch_module {
        tracing::debug!("generating fetch module");
        response.file.push(ResponseFile {
            name: Some(options.fetch_module_path()),
            content: Some(render::fetch_module(&options)),
            ..Default::default()
        });
    }

    response.supported_features = Some(Feature::Proto3Optional as u64);
    Ok(response)
}
