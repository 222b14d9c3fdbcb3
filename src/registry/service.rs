//! Service analysis
//!
//! Methods become callable-method records with a wire URL, HTTP verb and
//! request body mapping. An HTTP-binding annotation supplies those when
//! present; otherwise the method falls back to the default RPC-style
//! `POST /<package>.<service>/<method>` path. Client-streaming methods are
//! dropped entirely: the gateway cannot carry them.

use prost_types::ServiceDescriptorProto;

use crate::annotations::HttpAnnotations;
use crate::comments::{self, CommentIndex, SERVICE_METHOD};
use crate::data::{self, Externality, MethodArgument, TypeRefSite, TypeReference};
use crate::registry::{EntityKind, Registry, TypeInformation};
use crate::GeneratorError;

impl Registry {
    /// Analyse a service declaration
    pub(crate) fn analyse_service(
        &mut self,
        file: &mut data::File,
        package: &str,
        file_name: &str,
        service: &ServiceDescriptorProto,
        http: &HttpAnnotations,
        comment: Option<&CommentIndex>,
    ) -> Result<(), GeneratorError> {
        let package_identifier = service.name().to_string();
        let fq_name = format!(".{}.{}", package, package_identifier);

        self.register(TypeInformation {
            fully_qualified_name: fq_name,
            package: package.to_string(),
            file: file_name.to_string(),
            package_identifier: package_identifier.clone(),
            local_identifier: service.name().to_string(),
            kind: EntityKind::Service,
            is_map_entry: false,
            key_type: None,
            value_type: None,
        })?;

        let service_index = file.services.len();
        let mut service_data = data::Service {
            name: service.name().to_string(),
            comment: comments::text_of(comment),
            ..Default::default()
        };
        let service_url_part = format!("{}.{}", package, service_data.name);

        for (index, method) in service.method.iter().enumerate() {
            // the gateway has no client streaming support, ignore the method
            if method.client_streaming() {
                tracing::debug!(
                    method = method.name(),
                    "skipping client streaming method"
                );
                continue;
            }

            let input_fq = method.input_type().to_string();
            let input_external = Self::is_outside_package(&input_fq, package);
            if input_external {
                file.external_depending_types.push(input_fq.clone());
            }

            let output_fq = method.output_type().to_string();
            let output_external = Self::is_outside_package(&output_fq, package);
            if output_external {
                file.external_depending_types.push(output_fq.clone());
            }

            let rule = http.get(file_name, service.name(), method.name());

            let mut http_method = "POST".to_string();
            let mut url = format!("/{}/{}", service_url_part, method.name());
            if let Some(rule) = rule {
                if !rule.http_method.is_empty() && !rule.url.is_empty() {
                    http_method = rule.http_method.clone();
                    url = rule.url.clone();
                }
            }
            // GET carries no body; otherwise the annotation's selector is
            // taken verbatim
            let http_request_body = rule.map(|r| {
                if r.http_method == "GET" {
                    String::new()
                } else {
                    r.body.clone()
                }
            });

            let method_index = service_data.methods.len();
            let method_data = data::Method {
                name: method.name().to_string(),
                url,
                input: MethodArgument {
                    type_ref: TypeReference::Named(input_fq),
                    externality: Externality::provisional(input_external),
                },
                output: MethodArgument {
                    type_ref: TypeReference::Named(output_fq),
                    externality: Externality::provisional(output_external),
                },
                server_streaming: method.server_streaming(),
                client_streaming: false,
                http_method,
                http_request_body,
                comment: comments::text_under(comment, &[SERVICE_METHOD, index as i32]),
            };

            file.track_non_scalar(
                &method_data.input.type_ref,
                TypeRefSite::MethodInput {
                    service: service_index,
                    method: method_index,
                },
            );
            file.track_non_scalar(
                &method_data.output.type_ref,
                TypeRefSite::MethodOutput {
                    service: service_index,
                    method: method_index,
                },
            );

            service_data.methods.push(method_data);
        }

        file.services.push(service_data);
        Ok(())
    }
}
