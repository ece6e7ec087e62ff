//! Write payload values and the sentinels they may carry.
//!
//! A write payload is an ordered map from field name to [`FieldValue`]. Most
//! entries are literal [`bson::Bson`] values, but a payload position may also
//! hold a sentinel that triggers a special mutation when the write is
//! applied: delete the field, substitute the store clock, or union/remove
//! array elements. Sentinels are resolved by the engine at apply time and
//! are never stored.

use bson::Bson;
use indexmap::IndexMap;

/// A single value inside a write payload.
///
/// Equality is tag plus payload equality; array payloads compare
/// element-wise and order-sensitively.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// A literal value stored as-is.
    Value(Bson),
    /// A nested payload map that may itself contain sentinels.
    Map(WriteData),
    /// Remove the addressed field from the result.
    Delete,
    /// Substitute the store's configured clock value.
    ServerTimestamp,
    /// Append each payload element not already present to the target array;
    /// a non-array target is replaced by the payload array.
    ArrayUnion(Vec<Bson>),
    /// Remove every occurrence of each payload element from the target
    /// array; a non-array target is replaced by an empty array.
    ArrayRemove(Vec<Bson>),
}

impl FieldValue {
    /// Wraps a literal value.
    pub fn value(value: impl Into<Bson>) -> Self {
        FieldValue::Value(value.into())
    }

    /// Builds an array-union sentinel from any iterable of values.
    pub fn array_union<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Bson>,
    {
        FieldValue::ArrayUnion(values.into_iter().map(Into::into).collect())
    }

    /// Builds an array-remove sentinel from any iterable of values.
    pub fn array_remove<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Bson>,
    {
        FieldValue::ArrayRemove(values.into_iter().map(Into::into).collect())
    }
}

/// An ordered write payload: field name to [`FieldValue`].
///
/// Insertion order is preserved so applied writes keep the field order the
/// caller specified.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WriteData {
    fields: IndexMap<String, FieldValue>,
}

impl WriteData {
    /// Creates an empty payload.
    pub fn new() -> Self {
        WriteData::default()
    }

    /// Inserts a field, replacing any previous entry for the same name.
    pub fn insert(&mut self, key: impl Into<String>, value: FieldValue) {
        self.fields.insert(key.into(), value);
    }

    /// Chainable variant of [`WriteData::insert`] for building payloads
    /// inline.
    pub fn with(mut self, key: impl Into<String>, value: FieldValue) -> Self {
        self.insert(key, value);
        self
    }

    /// Looks up a field by name.
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Iterates fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    /// Number of fields in the payload.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the payload has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<bson::Document> for WriteData {
    /// Wraps every entry of a plain document as a literal value.
    ///
    /// Nested documents stay literal; the engine still merges them
    /// structurally where the write mode calls for it.
    fn from(doc: bson::Document) -> Self {
        let mut data = WriteData::new();
        for (key, value) in doc {
            data.insert(key, FieldValue::Value(value));
        }
        data
    }
}

impl FromIterator<(String, FieldValue)> for WriteData {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        WriteData {
            fields: iter.into_iter().collect(),
        }
    }
}
