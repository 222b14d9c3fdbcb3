//! protoc-gen-gateway-ts library
//!
//! This crate provides the code generation logic for turning Protocol
//! Buffer definitions into TypeScript type declarations and RPC client
//! stubs that talk to gRPC-gateway fronted services over HTTP/JSON.

#![deny(missing_docs)]

pub mod annotations;
pub mod comments;
pub mod data;
pub mod generator;
pub mod options;
pub mod paths;
pub mod registry;
pub mod render;

use prost::Message;
use prost_types::compiler::{CodeGeneratorRequest, CodeGeneratorResponse};
use thiserror::Error;

/// Errors that can occur during code generation
#[derive(Error, Debug)]
pub enum GeneratorError {
    /// Invalid plugin configuration or parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Two distinct declarations produced the same fully qualified name
    #[error("Duplicate type registration for {0}")]
    DuplicateType(String),

    /// A type was referenced but never registered by any file in the request
    #[error("Cannot find type info for {0}")]
    MissingType(String),

    /// An HTTP annotation used a pattern other than GET/POST/PUT/PATCH/DELETE
    #[error("Unsupported HTTP pattern on method {0}")]
    UnsupportedHttpPattern(String),

    /// Failed to compute an import path between two output files
    #[error("Error resolving import path from {file} to {target}: {reason}")]
    PathResolution {
        /// The referencing output file
        file: String,
        /// The dependency the import points at
        target: String,
        /// What went wrong
        reason: String,
    },

    /// Failed to render an output unit
    #[error("Error generating file for {file}: {reason}")]
    Render {
        /// The source proto file being rendered
        file: String,
        /// What went wrong
        reason: String,
    },

    /// The request's descriptor files could not be assembled into a pool
    #[error("Invalid descriptor set: {0}")]
    InvalidDescriptorSet(String),

    /// Failed to decode the protobuf request
    #[error("Decode error: {0}")]
    Decode(#[from] prost::DecodeError),
}

/// Generate TypeScript sources from a protobuf CodeGeneratorRequest
///
/// This entry point works from an already-decoded request and therefore
/// cannot see `google.api.http` annotations (prost drops extension data on
/// decode); every method falls back to the default RPC-style POST path.
/// Prefer [`generate_from_bytes`] in the plugin binary.
pub fn generate(request: CodeGeneratorRequest) -> Result<CodeGeneratorResponse, GeneratorError> {
    generator::generate_with_annotations(request, annotations::HttpAnnotations::default())
}

/// Generate TypeScript sources from raw protobuf bytes
///
/// This is the main entry point: it recovers HTTP-binding annotations from
/// the raw bytes before handing the typed request to the generator.
pub fn generate_from_bytes(bytes: &[u8]) -> Result<CodeGeneratorResponse, GeneratorError> {
    let request = CodeGeneratorRequest::decode(bytes)?;
    let http = annotations::extract(bytes, &request.proto_file)?;
    generator::generate_with_annotations(request, http)
}
