use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::DocgateError;

/// Longest key accepted by any store backend.
pub const MAX_KEY_LEN: usize = 1024;

/// A blob held in the object store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Caller-supplied key; doubles as the filename hint.
    pub key: String,
    pub data: Bytes,
    pub content_type: Option<String>,
}

impl StoredObject {
    pub fn new(key: impl Into<String>, data: impl Into<Bytes>, content_type: Option<&str>) -> Self {
        Self {
            key: key.into(),
            data: data.into(),
            content_type: content_type.map(str::to_string),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// The kinds of files produced by post-processing a provider response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    PageMarkdown,
    PageImage,
    PageJson,
    ExtractArchive,
}

impl ArtifactKind {
    pub fn content_type(self) -> &'static str {
        match self {
            ArtifactKind::PageMarkdown => "text/markdown",
            ArtifactKind::PageImage => "image/jpeg",
            ArtifactKind::PageJson => "application/json",
            ArtifactKind::ExtractArchive => "application/zip",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArtifactKind::PageMarkdown => "page_markdown",
            ArtifactKind::PageImage => "page_image",
            ArtifactKind::PageJson => "page_json",
            ArtifactKind::ExtractArchive => "extract_archive",
        };
        f.write_str(s)
    }
}

// Page and image indexes are zero-based here and one-based in the keys.

/// `<key>.page-<n>.md`
pub fn page_markdown_key(key: &str, page: usize) -> String {
    format!("{key}.page-{}.md", page + 1)
}

/// `<key>.page-<n>.image-<m>.jpeg`
pub fn page_image_key(key: &str, page: usize, image: usize) -> String {
    format!("{key}.page-{}.image-{}.jpeg", page + 1, image + 1)
}

/// `<key>.page-<n>.json`
pub fn page_json_key(key: &str, page: usize) -> String {
    format!("{key}.page-{}.json", page + 1)
}

/// `<key>.adobe-extract.zip`
pub fn extract_archive_key(key: &str) -> String {
    format!("{key}.adobe-extract.zip")
}

/// Reject keys that are empty, oversized, absolute, or that could escape a
/// rooted store through `.`/`..` segments.
pub fn validate_key(key: &str) -> Result<(), DocgateError> {
    if key.is_empty() {
        return Err(DocgateError::BadRequest("key must not be empty".into()));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(DocgateError::BadRequest(format!(
            "key longer than {MAX_KEY_LEN} bytes"
        )));
    }
    if key.starts_with('/') || key.contains('\\') || key.contains('\0') {
        return Err(DocgateError::BadRequest(format!("invalid key: {key}")));
    }
    if key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..") {
        return Err(DocgateError::BadRequest(format!("invalid key segment in: {key}")));
    }
    Ok(())
}
