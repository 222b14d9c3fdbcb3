//! Comment index built from `SourceCodeInfo`
//!
//! protoc reports comments as a flat list of locations, each keyed by the
//! structural path used to reach a declaration (see the `path` field
//! documentation in `google/protobuf/descriptor.proto`). This module folds
//! that list into a tree so any declaration can fetch its documentation
//! text without re-walking the whole source map.

use std::collections::HashMap;

use prost_types::source_code_info::Location;
use prost_types::SourceCodeInfo;

/// Path element for `FileDescriptorProto.message_type`
pub const FILE_MESSAGE: i32 = 4;
/// Path element for `FileDescriptorProto.enum_type`
pub const FILE_ENUM: i32 = 5;
/// Path element for `FileDescriptorProto.service`
pub const FILE_SERVICE: i32 = 6;
/// Path element for `DescriptorProto.field`
pub const MESSAGE_FIELD: i32 = 2;
/// Path element for `DescriptorProto.nested_type`
pub const MESSAGE_NESTED: i32 = 3;
/// Path element for `DescriptorProto.enum_type`
pub const MESSAGE_ENUM: i32 = 4;
/// Path element for `EnumDescriptorProto.value`
pub const ENUM_VALUE: i32 = 2;
/// Path element for `ServiceDescriptorProto.method`
pub const SERVICE_METHOD: i32 = 2;

/// A node in the comment tree
///
/// Each node represents the comments in the context of a prefix of
/// `SourceCodeInfo.Location.path`.
#[derive(Debug, Default)]
pub struct CommentIndex {
    /// Formatted comment text for this source context
    text: String,
    /// Child nodes keyed by the next path element
    children: HashMap<i32, CommentIndex>,
}

impl CommentIndex {
    /// Build the index for one file's source code info
    pub fn from_source_code_info(info: Option<&SourceCodeInfo>) -> CommentIndex {
        let mut root = CommentIndex::default();
        if let Some(info) = info {
            for location in &info.location {
                root.add_location(location);
            }
        }
        root
    }

    /// Fold one location into the tree, creating intermediate nodes
    fn add_location(&mut self, location: &Location) {
        let mut current = self;
        for path in &location.path {
            current = current.children.entry(*path).or_default();
        }

        let mut lines = Vec::new();
        for comment in &location.leading_detached_comments {
            append_comment(&mut lines, comment);
        }
        append_comment(&mut lines, location.leading_comments());
        append_comment(&mut lines, location.trailing_comments());
        if !lines.is_empty() {
            current.text = format!("/**\n{}\n **/", lines.join("\n"));
        }
    }

    /// Navigate to the node at `path`, if one exists
    pub fn sub(&self, path: &[i32]) -> Option<&CommentIndex> {
        let mut current = self;
        for p in path {
            current = current.children.get(p)?;
        }
        Some(current)
    }

    /// Formatted comment text for this node
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Comment text at a relative path, empty if there is none
    pub fn text_at(&self, path: &[i32]) -> String {
        self.sub(path).map(|c| c.text.clone()).unwrap_or_default()
    }
}

/// Comment text for an optional node, empty when the node is absent
pub fn text_of(node: Option<&CommentIndex>) -> String {
    node.map(|c| c.text().to_string()).unwrap_or_default()
}

/// Comment text at a relative path under an optional node
pub fn text_under(node: Option<&CommentIndex>, path: &[i32]) -> String {
    node.and_then(|c| c.sub(path))
        .map(|c| c.text().to_string())
        .unwrap_or_default()
}

fn append_comment(lines: &mut Vec<String>, comment: &str) {
    if comment.trim().is_empty() {
        return;
    }
    if !lines.is_empty() {
        lines.push(" *".to_string());
    }
    let mut split: Vec<&str> = comment.split('\n').collect();
    while let Some(last) = split.last() {
        if last.trim().is_empty() {
            split.pop();
        } else {
            break;
        }
    }
    for line in split {
        lines.push(format!(" *{}", line));
    }
}
