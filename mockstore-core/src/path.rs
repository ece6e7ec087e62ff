//! Path and identifier validation for collections, documents, and fields.
//!
//! Three kinds of names flow through the store and each has its own rules:
//!
//! - collection/document **ids**, the single segments of a reference path;
//! - **reference paths**, slash-delimited chains of ids whose segment parity
//!   decides whether they address a collection (odd) or a document (even);
//! - **field paths**, dot-delimited chains of field names addressing a value
//!   nested inside a document's data.
//!
//! All checks run at reference construction, so a malformed path fails before
//! it ever reaches the tree.

use std::fmt;

use crate::error::{StoreError, StoreResult};

/// Maximum byte length of a single id, a field name, or a whole path.
pub const MAX_PATH_BYTES: usize = 1500;

/// Whether a reference path addresses a collection or a document.
///
/// Collection paths have an odd number of segments, document paths an even
/// number; everything else about the two is identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// Odd segment count: `coll`, `coll/doc/sub`, ...
    Collection,
    /// Even segment count: `coll/doc`, `coll/doc/sub/doc2`, ...
    Document,
}

/// Validates a single collection or document id.
///
/// Ids must be non-empty, at most [`MAX_PATH_BYTES`] bytes, contain only
/// Unicode letters and digits plus `_` and `-`, must not be `.` or `..`,
/// and must not use the reserved `__name__` shape.
pub fn validate_id(id: &str) -> StoreResult<()> {
    if id.is_empty() {
        return Err(StoreError::InvalidReference("empty id".to_string()));
    }
    if id.len() > MAX_PATH_BYTES {
        return Err(StoreError::InvalidReference(format!(
            "id exceeds {MAX_PATH_BYTES} bytes"
        )));
    }
    if id == "." || id == ".." {
        return Err(StoreError::InvalidReference(format!(
            "id must not be {id:?}"
        )));
    }
    if id.len() >= 4 && id.starts_with("__") && id.ends_with("__") {
        return Err(StoreError::InvalidReference(format!(
            "id {id:?} uses the reserved __*__ form"
        )));
    }
    for c in id.chars() {
        if !(c.is_alphanumeric() || c == '_' || c == '-') {
            return Err(StoreError::InvalidReference(format!(
                "id {id:?} contains forbidden character {c:?}"
            )));
        }
    }
    Ok(())
}

/// Splits and validates a slash-delimited reference path.
///
/// Checks the total length, that no segment is empty (which also catches
/// `//`), that every segment is a valid id, and that the segment count has
/// the parity `kind` requires.
pub fn split_reference_path(path: &str, kind: ReferenceKind) -> StoreResult<Vec<String>> {
    if path.is_empty() {
        return Err(StoreError::InvalidReference("empty path".to_string()));
    }
    if path.len() > MAX_PATH_BYTES {
        return Err(StoreError::InvalidReference(format!(
            "path exceeds {MAX_PATH_BYTES} bytes"
        )));
    }

    let segments: Vec<String> = path.split('/').map(str::to_string).collect();
    for segment in &segments {
        if segment.is_empty() {
            return Err(StoreError::InvalidReference(format!(
                "path {path:?} contains an empty segment"
            )));
        }
        validate_id(segment)?;
    }

    let even = segments.len() % 2 == 0;
    match kind {
        ReferenceKind::Collection if even => Err(StoreError::InvalidReference(format!(
            "collection path {path:?} must have an odd number of segments"
        ))),
        ReferenceKind::Document if !even => Err(StoreError::InvalidReference(format!(
            "document path {path:?} must have an even number of segments"
        ))),
        _ => Ok(segments),
    }
}

/// Returns true when `name` is usable without backtick quoting.
fn is_unquoted_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Validates a single field name segment (quoted or not).
pub fn validate_field_name(name: &str) -> StoreResult<()> {
    if name.is_empty() {
        return Err(StoreError::InvalidFieldName("empty field name".to_string()));
    }
    if name.len() > MAX_PATH_BYTES {
        return Err(StoreError::InvalidFieldName(format!(
            "field name exceeds {MAX_PATH_BYTES} bytes"
        )));
    }
    Ok(())
}

/// An ordered list of field-name segments addressing a nested value.
///
/// The canonical string form joins segments with `.`, backtick-quoting any
/// segment that is not a plain `[A-Za-z_][A-Za-z0-9_]*` identifier. Equality
/// is structural equality of the segment list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Builds a field path from raw segments, validating each one.
    pub fn new<I, S>(segments: I) -> StoreResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(StoreError::InvalidFieldPath("empty field path".to_string()));
        }
        for segment in &segments {
            validate_field_name(segment)?;
        }
        Ok(FieldPath { segments })
    }

    /// Parses a dotted field path.
    ///
    /// Segments are separated by single dots; a segment is either an
    /// unquoted identifier or arbitrary content wrapped in backticks.
    pub fn parse(dotted: &str) -> StoreResult<Self> {
        if dotted.is_empty() {
            return Err(StoreError::InvalidFieldPath("empty field path".to_string()));
        }

        let mut segments = Vec::new();
        let mut chars = dotted.chars().peekable();

        loop {
            let mut segment = String::new();
            if chars.peek() == Some(&'`') {
                chars.next();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '`' {
                        closed = true;
                        break;
                    }
                    segment.push(c);
                }
                if !closed {
                    return Err(StoreError::InvalidFieldPath(format!(
                        "unterminated backtick in {dotted:?}"
                    )));
                }
            } else {
                while let Some(&c) = chars.peek() {
                    if c == '.' {
                        break;
                    }
                    segment.push(c);
                    chars.next();
                }
                if !is_unquoted_name(&segment) {
                    return Err(StoreError::InvalidFieldPath(format!(
                        "segment {segment:?} in {dotted:?} must be a plain identifier or backtick-quoted"
                    )));
                }
            }
            validate_field_name(&segment)
                .map_err(|_| StoreError::InvalidFieldPath(format!("invalid segment in {dotted:?}")))?;
            segments.push(segment);

            match chars.next() {
                None => break,
                Some('.') => {
                    if chars.peek().is_none() {
                        return Err(StoreError::InvalidFieldPath(format!(
                            "trailing separator in {dotted:?}"
                        )));
                    }
                }
                Some(c) => {
                    return Err(StoreError::InvalidFieldPath(format!(
                        "unexpected {c:?} after quoted segment in {dotted:?}"
                    )));
                }
            }
        }

        Ok(FieldPath { segments })
    }

    /// The path's segments in order.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false: construction rejects empty paths.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            if is_unquoted_name(segment) {
                write!(f, "{segment}")?;
            } else {
                write!(f, "`{segment}`")?;
            }
        }
        Ok(())
    }
}

/// A field-path argument: either a dotted string still to be parsed or an
/// already-structured [`FieldPath`].
///
/// Call sites accept `impl Into<FieldRef>` so both forms read naturally;
/// [`FieldRef::into_path`] resolves the dotted form, surfacing parse errors
/// at the call that supplied the string.
#[derive(Debug, Clone)]
pub enum FieldRef {
    /// A dotted string such as `"user.profile.name"`.
    Dotted(String),
    /// A structured path built segment-by-segment.
    Path(FieldPath),
}

impl FieldRef {
    /// Resolves this reference to a structured path.
    pub fn into_path(self) -> StoreResult<FieldPath> {
        match self {
            FieldRef::Dotted(s) => FieldPath::parse(&s),
            FieldRef::Path(p) => Ok(p),
        }
    }
}

impl From<&str> for FieldRef {
    fn from(s: &str) -> Self {
        FieldRef::Dotted(s.to_string())
    }
}

impl From<String> for FieldRef {
    fn from(s: String) -> Self {
        FieldRef::Dotted(s)
    }
}

impl From<FieldPath> for FieldRef {
    fn from(p: FieldPath) -> Self {
        FieldRef::Path(p)
    }
}
