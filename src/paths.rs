//! Import source path resolution
//!
//! An import for a foreign file resolves, in precedence order, via an
//! explicit per-file override, an alias substitution for a configured
//! import root that contains the target proto, or a relative path from the
//! referencing output file's directory. Filesystem access sits behind
//! [`RootProbe`] so tests run against an in-memory stand-in.
//!
//! Proto file names always use forward slashes, and imports must come out
//! identical on every platform, so all path math here is plain string
//! manipulation rather than `std::path` semantics.

use std::path::{Path, PathBuf};

use crate::data;
use crate::options::Options;
use crate::GeneratorError;

/// Checks whether a candidate import root contains a file
pub trait RootProbe {
    /// Whether `path` exists under the probe's view of the filesystem
    ///
    /// An `Err` is a real I/O failure (permissions, unreadable mount),
    /// not a missing file; it aborts resolution.
    fn exists(&self, path: &Path) -> std::io::Result<bool>;
}

/// The real-filesystem probe used by the plugin binary
#[derive(Debug, Default)]
pub struct FsProbe;

impl RootProbe for FsProbe {
    fn exists(&self, path: &Path) -> std::io::Result<bool> {
        match std::fs::metadata(path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Resolve the import source path for one dependency
///
/// `referencing_ts` is the output file doing the importing; `target_proto`
/// is the proto file the dependency lives in. The returned path has the
/// output `.ts` extension stripped, since imports reference module names.
pub fn resolve_import_path(
    options: &Options,
    probe: &dyn RootProbe,
    referencing_ts: &str,
    target_proto: &str,
) -> Result<String, GeneratorError> {
    // (a) explicit override configured for this exact proto file
    if let Some(path) = options.ts_import_overrides.get(target_proto) {
        return Ok(strip_ts_suffix(path).to_string());
    }

    let target_ts = data::ts_file_name(target_proto);

    // (b) first configured root that contains the target and has an alias
    for (index, root) in options.ts_import_roots.iter().enumerate() {
        let candidate: PathBuf = root.join(target_proto);
        let found = probe
            .exists(&candidate)
            .map_err(|e| GeneratorError::PathResolution {
                file: referencing_ts.to_string(),
                target: target_proto.to_string(),
                reason: e.to_string(),
            })?;
        if found {
            if let Some(alias) = options.alias_for_root(index) {
                let joined = format!("{}/{}", alias.trim_end_matches('/'), target_ts);
                return Ok(strip_ts_suffix(&joined).to_string());
            }
        }
    }

    // (c) relative path between the two output files
    Ok(relative_module_path(referencing_ts, &target_ts))
}

/// Relative module path between two output files
///
/// Forward-slash form, `./`-prefixed unless it already traverses upward,
/// output extension stripped.
pub fn relative_module_path(referencing_ts: &str, target: &str) -> String {
    let relative = relative_path(parent_dir(referencing_ts), target);
    let relative = if relative.starts_with("../") {
        relative
    } else {
        format!("./{}", relative)
    };
    strip_ts_suffix(&relative).to_string()
}

/// Directory part of a forward-slash path, empty for a bare file name
fn parent_dir(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some((dir, _)) => dir,
        None => "",
    }
}

/// Relative forward-slash path from `base_dir` to `target`
fn relative_path(base_dir: &str, target: &str) -> String {
    let (target_dir, target_file) = match target.rsplit_once('/') {
        Some((dir, file)) => (dir, file),
        None => ("", target),
    };

    let base: Vec<&str> = base_dir.split('/').filter(|c| !c.is_empty()).collect();
    let tgt: Vec<&str> = target_dir.split('/').filter(|c| !c.is_empty()).collect();

    let common = base
        .iter()
        .zip(tgt.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = Vec::new();
    for _ in common..base.len() {
        parts.push("..");
    }
    parts.extend(&tgt[common..]);
    parts.push(target_file);
    parts.join("/")
}

/// Strip the trailing output extension, leaving a module path
fn strip_ts_suffix(path: &str) -> &str {
    path.strip_suffix(".ts").unwrap_or(path)
}
