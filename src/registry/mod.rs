//! Type registry and request analysis
//!
//! The registry is the whole-program symbol table: every message, enum and
//! service in the request is registered under its fully qualified name as
//! its file is analyzed. Analysis runs in two phases. Phase one walks each
//! file in request order, building its rendering record and noting every
//! possibly-external type reference. Phase two, once the registry is
//! complete, revisits those references with full knowledge, finalizes
//! externality, and computes each file's deduplicated import list.
//!
//! The registry is an explicit owned object scoped to one generation run;
//! tests construct isolated instances per case.

mod enums;
mod field;
mod file;
mod message;
mod service;

use std::collections::{BTreeMap, HashSet};

use prost_types::compiler::CodeGeneratorRequest;

use crate::annotations::HttpAnnotations;
use crate::data::{self, Dependency, Externality, TypeRefSite};
use crate::options::Options;
use crate::paths::{self, FsProbe, RootProbe};
use crate::GeneratorError;

pub use field::resolve_field_type;

/// Structural kind of a registered entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// A message declaration
    Message,
    /// An enum declaration
    Enum,
    /// A service declaration
    Service,
}

/// Key or value type of a synthetic map entry
#[derive(Debug, Clone)]
pub struct MapEntryType {
    /// Normalized type reference
    pub type_ref: data::TypeReference,
    /// Externality relative to the file that declared the map
    pub externality: Externality,
}

/// Resolved information about one registered type
#[derive(Debug, Clone)]
pub struct TypeInformation {
    /// Fully qualified name: a dot, the package, then the nested path
    pub fully_qualified_name: String,
    /// Package the type belongs to
    pub package: String,
    /// File the type is declared in; the unit of import dependency
    pub file: String,
    /// Identifier at package scope: enclosing names concatenated so
    /// hoisted nested types stay collision free
    pub package_identifier: String,
    /// Identifier in the type's local scope, undecorated
    pub local_identifier: String,
    /// Structural kind
    pub kind: EntityKind,
    /// Whether this is a synthetic map entry
    pub is_map_entry: bool,
    /// Key type when this is a map entry
    pub key_type: Option<MapEntryType>,
    /// Value type when this is a map entry
    pub value_type: Option<MapEntryType>,
}

/// The whole-program symbol table and analysis driver
#[derive(Debug)]
pub struct Registry {
    /// Type information keyed by fully qualified name
    types: BTreeMap<String, TypeInformation>,
    /// The files that are actual generation targets; the rest of the
    /// request exists only to resolve references
    files_to_generate: HashSet<String>,
    /// Plugin configuration
    options: Options,
}

impl Registry {
    /// Initialise an empty registry for one generation run
    pub fn new(options: Options) -> Registry {
        Registry {
            types: BTreeMap::new(),
            files_to_generate: HashSet::new(),
            options,
        }
    }

    /// Whether `name` is one of the files to generate output for
    pub fn is_file_to_generate(&self, name: &str) -> bool {
        self.files_to_generate.contains(name)
    }

    /// The configured plugin options
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Register a type under its fully qualified name
    ///
    /// Each name is produced by exactly one analysis step; a second
    /// registration is a fatal consistency error, not a recoverable one.
    pub fn register(&mut self, info: TypeInformation) -> Result<(), GeneratorError> {
        let fq = info.fully_qualified_name.clone();
        if self.types.insert(fq.clone(), info).is_some() {
            return Err(GeneratorError::DuplicateType(fq));
        }
        Ok(())
    }

    /// Look up a type by fully qualified name
    ///
    /// May legitimately miss during per-file analysis (the type's file has
    /// not been visited yet); must always hit during the global pass.
    pub fn lookup(&self, fq_name: &str) -> Option<&TypeInformation> {
        self.types.get(fq_name)
    }

    /// Analyse the request and produce the rendering data for every file
    pub fn analyse(
        &mut self,
        request: &CodeGeneratorRequest,
        http: &HttpAnnotations,
    ) -> Result<Vec<data::File>, GeneratorError> {
        self.analyse_with_probe(request, http, &FsProbe)
    }

    /// Analyse with a caller-supplied filesystem probe
    pub fn analyse_with_probe(
        &mut self,
        request: &CodeGeneratorRequest,
        http: &HttpAnnotations,
        probe: &dyn RootProbe,
    ) -> Result<Vec<data::File>, GeneratorError> {
        self.files_to_generate = request.file_to_generate.iter().cloned().collect();

        tracing::debug!(
            total = request.proto_file.len(),
            "about to start analysing files"
        );

        // phase one: analyse every file in the request, imports included
        let mut files = Vec::with_capacity(request.proto_file.len());
        for f in &request.proto_file {
            files.push(self.analyse_file(f, http)?);
        }

        // phase two: with the registry complete, finalize every reference
        // and back-fill the import lists
        self.collect_external_dependencies(&mut files, probe)?;

        Ok(files)
    }

    /// Package-level identifier: enclosing names concatenated with the
    /// entity's own name
    pub(crate) fn package_level_identifier(parents: &[String], name: &str) -> String {
        format!("{}{}", parents.concat(), name)
    }

    /// Dot-joined prefix of the enclosing names, trailing dot included
    pub(crate) fn parent_prefix(parents: &[String]) -> String {
        if parents.is_empty() {
            String::new()
        } else {
            format!("{}.", parents.join("."))
        }
    }

    /// First-pass externality heuristic: is the name outside `package`?
    ///
    /// Tested against the `.<package>.` prefix. A hit can still be wrong
    /// for a type in the same package but a different file; only the
    /// global pass decides for real.
    pub(crate) fn is_outside_package(fq_name: &str, package: &str) -> bool {
        fq_name.starts_with('.') && !fq_name.starts_with(&format!(".{}.", package))
    }

    /// The global pass: finalize externality for every recorded reference
    /// and compute each file's deduplicated import list
    fn collect_external_dependencies(
        &mut self,
        files: &mut [data::File],
        probe: &dyn RootProbe,
    ) -> Result<(), GeneratorError> {
        // finalize every reference site now that the registry is complete;
        // a type in the same package but another file becomes external here
        for index in 0..files.len() {
            let sites = files[index].non_scalar_refs.clone();
            for site in sites {
                let fq = match self.site_type_name(&files[index], &site) {
                    Some(fq) => fq,
                    None => continue,
                };
                let target_file = self
                    .lookup(&fq)
                    .ok_or_else(|| GeneratorError::MissingType(fq.clone()))?
                    .file
                    .clone();
                let external = target_file != files[index].name;
                self.finalize_site(&mut files[index], &site, external);
                if external {
                    files[index].external_depending_types.push(fq);
                }
            }
        }

        // one import per distinct (package, file) group, insertion ordered
        for file in files.iter_mut() {
            let mut seen: HashSet<String> = HashSet::new();
            let mut dependencies: Vec<Dependency> = Vec::new();
            for fq in &file.external_depending_types {
                let info = self
                    .types
                    .get(fq)
                    .ok_or_else(|| GeneratorError::MissingType(fq.clone()))?;
                let group = format!("{}|{}", info.package, info.file);
                if !seen.insert(group) {
                    continue;
                }
                let source_file = paths::resolve_import_path(
                    &self.options,
                    probe,
                    &file.ts_file_name,
                    &info.file,
                )?;
                dependencies.push(Dependency {
                    module_identifier: data::module_alias(&info.package, &info.file),
                    source_file,
                });
            }
            file.dependencies.extend(dependencies);
        }

        Ok(())
    }

    /// The fully qualified name referenced at a site
    fn site_type_name(&self, file: &data::File, site: &TypeRefSite) -> Option<String> {
        match site {
            TypeRefSite::Field { message, field } => file.messages[*message].fields[*field]
                .type_ref
                .named()
                .map(str::to_string),
            TypeRefSite::MethodInput { service, method } => file.services[*service].methods
                [*method]
                .input
                .type_ref
                .named()
                .map(str::to_string),
            TypeRefSite::MethodOutput { service, method } => file.services[*service].methods
                [*method]
                .output
                .type_ref
                .named()
                .map(str::to_string),
            TypeRefSite::MapKey { entry } => self
                .types
                .get(entry)
                .and_then(|t| t.key_type.as_ref())
                .and_then(|k| k.type_ref.named())
                .map(str::to_string),
            TypeRefSite::MapValue { entry } => self
                .types
                .get(entry)
                .and_then(|t| t.value_type.as_ref())
                .and_then(|v| v.type_ref.named())
                .map(str::to_string),
        }
    }

    /// Write the authoritative externality decision back to a site
    fn finalize_site(&mut self, file: &mut data::File, site: &TypeRefSite, external: bool) {
        match site {
            TypeRefSite::Field { message, field } => {
                file.messages[*message].fields[*field]
                    .externality
                    .finalize(external);
            }
            TypeRefSite::MethodInput { service, method } => {
                file.services[*service].methods[*method]
                    .input
                    .externality
                    .finalize(external);
            }
            TypeRefSite::MethodOutput { service, method } => {
                file.services[*service].methods[*method]
                    .output
                    .externality
                    .finalize(external);
            }
            TypeRefSite::MapKey { entry } => {
                if let Some(key) = self
                    .types
                    .get_mut(entry)
                    .and_then(|t| t.key_type.as_mut())
                {
                    key.externality.finalize(external);
                }
            }
            TypeRefSite::MapValue { entry } => {
                if let Some(value) = self
                    .types
                    .get_mut(entry)
                    .and_then(|t| t.value_type.as_mut())
                {
                    value.externality.finalize(external);
                }
            }
        }
    }
}
