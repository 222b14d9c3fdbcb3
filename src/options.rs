//! Plugin parameter parsing
//!
//! protoc passes generator parameters as a single comma-separated string of
//! `key=value` or bare `key` tokens. A bare key is treated as a boolean
//! `true`. Unknown keys are ignored so that wrapper tooling can thread its
//! own flags through; malformed values for known keys are fatal.

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

use crate::GeneratorError;

/// Parameter name for the import root search paths
const TS_IMPORT_ROOTS: &str = "ts_import_roots";

/// Parameter name for the aliases paired with the import roots
const TS_IMPORT_ROOT_ALIASES: &str = "ts_import_root_aliases";

/// Parameter name for explicit per-file import path overrides
const TS_IMPORT_OVERRIDES: &str = "ts_import_overrides";

/// Parameter name for the fetch module output directory
const FETCH_MODULE_DIRECTORY: &str = "fetch_module_directory";

/// Parameter name for the fetch module output filename
const FETCH_MODULE_FILENAME: &str = "fetch_module_filename";

/// Parameter name for the field naming convention toggle
const USE_PROTO_NAMES: &str = "use_proto_names";

/// Parameter name for the styling check toggle
const ENABLE_STYLING_CHECK: &str = "enable_styling_check";

/// Parameter name for routing log output to stderr
const LOG_TO_STDERR: &str = "logtostderr";

/// Parameter name for the log level
const LOG_LEVEL: &str = "loglevel";

/// Parsed plugin configuration
#[derive(Debug, Clone)]
pub struct Options {
    /// Directories probed, in order, to locate a dependency's proto file
    pub ts_import_roots: Vec<PathBuf>,
    /// Aliases positionally paired with `ts_import_roots`
    pub ts_import_root_aliases: Vec<Option<String>>,
    /// Explicit per-file import path overrides, keyed by proto file name
    pub ts_import_overrides: HashMap<String, String>,
    /// Directory the shared fetch module is emitted into
    pub fetch_module_directory: String,
    /// Filename of the shared fetch module
    pub fetch_module_filename: String,
    /// Render declared proto field names instead of JSON (camel) names
    pub use_proto_names: bool,
    /// Omit the eslint/tsc suppression header so output can be linted
    pub enable_styling_check: bool,
    /// Emit tracing output on stderr
    pub log_to_stderr: bool,
    /// Log level used when stderr logging is enabled
    pub log_level: tracing::Level,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            ts_import_roots: Vec::new(),
            ts_import_root_aliases: Vec::new(),
            ts_import_overrides: HashMap::new(),
            fetch_module_directory: ".".to_string(),
            fetch_module_filename: "fetch.pb.ts".to_string(),
            use_proto_names: false,
            enable_styling_check: false,
            log_to_stderr: false,
            log_level: tracing::Level::INFO,
        }
    }
}

impl Options {
    /// Parse options from the request's parameter string
    pub fn parse(parameter: &str) -> Result<Options, GeneratorError> {
        let mut options = Options::default();

        for token in parameter.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }

            let (key, value) = match token.split_once('=') {
                Some((k, v)) => (k, Some(v)),
                None => (token, None),
            };

            match key {
                TS_IMPORT_ROOTS => {
                    options.ts_import_roots = require_value(key, value)?
                        .split(';')
                        .filter(|r| !r.is_empty())
                        .map(PathBuf::from)
                        .collect();
                }
                TS_IMPORT_ROOT_ALIASES => {
                    options.ts_import_root_aliases = require_value(key, value)?
                        .split(';')
                        .map(|a| {
                            if a.is_empty() {
                                None
                            } else {
                                Some(a.to_string())
                            }
                        })
                        .collect();
                }
                TS_IMPORT_OVERRIDES => {
                    for pair in require_value(key, value)?.split(';') {
                        if pair.is_empty() {
                            continue;
                        }
                        let (file, path) = pair.split_once('=').ok_or_else(|| {
                            GeneratorError::InvalidParameter(format!(
                                "{}: expected file=path, got {:?}",
                                key, pair
                            ))
                        })?;
                        options
                            .ts_import_overrides
                            .insert(file.to_string(), path.to_string());
                    }
                }
                FETCH_MODULE_DIRECTORY => {
                    options.fetch_module_directory = require_value(key, value)?.to_string();
                }
                FETCH_MODULE_FILENAME => {
                    options.fetch_module_filename = require_value(key, value)?.to_string();
                }
                USE_PROTO_NAMES => options.use_proto_names = parse_bool(key, value)?,
                ENABLE_STYLING_CHECK => options.enable_styling_check = parse_bool(key, value)?,
                LOG_TO_STDERR => options.log_to_stderr = parse_bool(key, value)?,
                LOG_LEVEL => {
                    let value = require_value(key, value)?;
                    options.log_level = tracing::Level::from_str(value).map_err(|_| {
                        GeneratorError::InvalidParameter(format!(
                            "{}: unknown level {:?}",
                            key, value
                        ))
                    })?;
                }
                _ => tracing::debug!(key, "ignoring unknown parameter"),
            }
        }

        Ok(options)
    }

    /// Look up the alias paired with the import root at `index`
    pub fn alias_for_root(&self, index: usize) -> Option<&str> {
        self.ts_import_root_aliases
            .get(index)
            .and_then(|a| a.as_deref())
    }

    /// Full output path of the shared fetch module
    pub fn fetch_module_path(&self) -> String {
        if self.fetch_module_directory.is_empty() || self.fetch_module_directory == "." {
            self.fetch_module_filename.clone()
        } else {
            format!(
                "{}/{}",
                self.fetch_module_directory.trim_end_matches('/'),
                self.fetch_module_filename
            )
        }
    }
}

/// Set up stderr logging as configured
///
/// stdout belongs to the plugin protocol, so all diagnostics go to stderr.
/// Repeated initialisation (tests call the generator many times in one
/// process) is not an error.
pub fn init_logging(options: &Options) {
    if !options.log_to_stderr {
        return;
    }
    let _ = tracing_subscriber::fmt()
        .with_max_level(options.log_level)
        .with_writer(std::io::stderr)
        .try_init();
}

fn require_value<'a>(key: &str, value: Option<&'a str>) -> Result<&'a str, GeneratorError> {
    value.ok_or_else(|| GeneratorError::InvalidParameter(format!("{}: missing value", key)))
}

fn parse_bool(key: &str, value: Option<&str>) -> Result<bool, GeneratorError> {
    match value {
        // a bare key counts as switching the flag on
        None => Ok(true),
        Some("true") => Ok(true),
        Some("false") => Ok(false),
        Some(other) => Err(GeneratorError::InvalidParameter(format!(
            "{}: expected true or false, got {:?}",
            key, other
        ))),
    }
}
