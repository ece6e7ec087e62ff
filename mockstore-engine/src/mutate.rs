//! Applies write payloads to document data.
//!
//! Three modes exist: `replace` (set), `merge` (set-with-merge), and the
//! field-path `update` list. Sentinel values resolve wherever they appear:
//! against nothing in replace mode, against the merged position in merge
//! mode, and against the addressed location in update mode.

use bson::{Bson, Document};

use mockstore_core::{
    error::{StoreError, StoreResult},
    path::FieldPath,
    value::{FieldValue, WriteData},
};

use crate::{clock::ServerClock, query_exec::values_equal};

/// Applies a set payload: full replace, or deep merge into the existing
/// data when `merge` is set.
pub(crate) fn apply_set(
    existing: Option<&Document>,
    payload: &WriteData,
    merge: bool,
    clock: &ServerClock,
) -> Document {
    if merge {
        let base = existing.cloned().unwrap_or_default();
        merge_map(base, payload, clock)
    } else {
        resolve_map(payload, None, clock)
    }
}

/// Applies a field-path update list on top of the existing data.
///
/// # Errors
///
/// [`StoreError::NoDocumentToUpdate`] when the document has no data, and
/// [`StoreError::IllegalFieldPath`] when a pair tries to descend through a
/// scalar.
pub(crate) fn apply_update(
    existing: Option<&Document>,
    document_path: &str,
    pairs: &[(FieldPath, FieldValue)],
    clock: &ServerClock,
) -> StoreResult<Document> {
    let Some(existing) = existing else {
        return Err(StoreError::NoDocumentToUpdate(document_path.to_string()));
    };

    let mut data = existing.clone();
    for (path, value) in pairs {
        write_at_path(&mut data, path, value, clock)?;
    }
    Ok(data)
}

/// Builds a document from a payload with no pre-existing data underneath:
/// delete markers drop their key, everything else resolves in place.
fn resolve_map(payload: &WriteData, existing: Option<&Document>, clock: &ServerClock) -> Document {
    let mut result = Document::new();
    for (key, value) in payload.iter() {
        let existing_child = existing.and_then(|doc| doc.get(key.as_str()));
        if let Some(resolved) = resolve_value(value, existing_child, clock) {
            result.insert(key.clone(), resolved);
        }
    }
    result
}

/// Resolves one payload value against whatever currently sits at its
/// position. `None` means the key is dropped from the result.
fn resolve_value(
    value: &FieldValue,
    existing: Option<&Bson>,
    clock: &ServerClock,
) -> Option<Bson> {
    match value {
        FieldValue::Value(literal) => Some(literal.clone()),
        FieldValue::Map(nested) => {
            let existing_map = match existing {
                Some(Bson::Document(doc)) => Some(doc),
                _ => None,
            };
            Some(Bson::Document(resolve_map(nested, existing_map, clock)))
        }
        FieldValue::Delete => None,
        FieldValue::ServerTimestamp => Some(Bson::DateTime(clock.now())),
        FieldValue::ArrayUnion(elements) => Some(array_union(existing, elements)),
        FieldValue::ArrayRemove(elements) => Some(array_remove(existing, elements)),
    }
}

/// Appends each element not already present; replaces a non-array target
/// with the payload array outright.
fn array_union(existing: Option<&Bson>, elements: &[Bson]) -> Bson {
    match existing {
        Some(Bson::Array(items)) => {
            let mut result = items.clone();
            for element in elements {
                if !result.iter().any(|item| values_equal(item, element)) {
                    result.push(element.clone());
                }
            }
            Bson::Array(result)
        }
        _ => Bson::Array(elements.to_vec()),
    }
}

/// Removes every occurrence of each element; replaces a non-array target
/// with an empty array.
fn array_remove(existing: Option<&Bson>, elements: &[Bson]) -> Bson {
    match existing {
        Some(Bson::Array(items)) => Bson::Array(
            items
                .iter()
                .filter(|item| !elements.iter().any(|element| values_equal(item, element)))
                .cloned()
                .collect(),
        ),
        _ => Bson::Array(Vec::new()),
    }
}

/// Deep structural merge of a payload into existing data.
///
/// Nested maps (payload-built or literal) merge key-by-key; arrays and
/// scalars in the payload replace the existing value.
fn merge_map(mut base: Document, payload: &WriteData, clock: &ServerClock) -> Document {
    for (key, value) in payload.iter() {
        match value {
            FieldValue::Map(nested) => {
                let child = match base.get(key.as_str()) {
                    Some(Bson::Document(doc)) => doc.clone(),
                    _ => Document::new(),
                };
                base.insert(key.clone(), Bson::Document(merge_map(child, nested, clock)));
            }
            FieldValue::Value(Bson::Document(literal)) => {
                let child = match base.get(key.as_str()) {
                    Some(Bson::Document(doc)) => doc.clone(),
                    _ => Document::new(),
                };
                base.insert(key.clone(), Bson::Document(merge_plain(child, literal)));
            }
            FieldValue::Delete => {
                base.remove(key.as_str());
            }
            other => {
                let existing = base.get(key.as_str()).cloned();
                if let Some(resolved) = resolve_value(other, existing.as_ref(), clock) {
                    base.insert(key.clone(), resolved);
                }
            }
        }
    }
    base
}

/// Key-by-key merge of two literal documents.
fn merge_plain(mut base: Document, payload: &Document) -> Document {
    for (key, value) in payload {
        match (base.get(key.as_str()), value) {
            (Some(Bson::Document(existing)), Bson::Document(incoming)) => {
                let merged = merge_plain(existing.clone(), incoming);
                base.insert(key.clone(), Bson::Document(merged));
            }
            _ => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
    base
}

/// Writes one resolved value at a field path, creating intermediate maps.
fn write_at_path(
    data: &mut Document,
    path: &FieldPath,
    value: &FieldValue,
    clock: &ServerClock,
) -> StoreResult<()> {
    let (last, parents) = path
        .segments()
        .split_last()
        .expect("field paths are non-empty");

    let mut current = &mut *data;
    for segment in parents {
        if !current.contains_key(segment) {
            current.insert(segment.clone(), Bson::Document(Document::new()));
        }
        match current.get_mut(segment) {
            Some(Bson::Document(inner)) => current = inner,
            _ => {
                return Err(StoreError::IllegalFieldPath {
                    path: path.to_string(),
                    segment: segment.clone(),
                });
            }
        }
    }

    match resolve_value(value, current.get(last.as_str()), clock) {
        Some(resolved) => {
            current.insert(last.clone(), resolved);
        }
        None => {
            current.remove(last.as_str());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn fixed_clock() -> ServerClock {
        ServerClock::Fixed(bson::DateTime::from_millis(86_400_000))
    }

    fn update(
        existing: Option<&Document>,
        pairs: &[(&str, FieldValue)],
    ) -> StoreResult<Document> {
        let parsed: Vec<(FieldPath, FieldValue)> = pairs
            .iter()
            .map(|(path, value)| (FieldPath::parse(path).unwrap(), value.clone()))
            .collect();
        apply_update(existing, "items/x", &parsed, &fixed_clock())
    }

    #[test]
    fn replace_drops_previous_data_and_delete_keys() {
        let existing = doc! { "old": true };
        let payload = WriteData::from(doc! { "a": 1 }).with("gone", FieldValue::Delete);

        let result = apply_set(Some(&existing), &payload, false, &fixed_clock());
        assert_eq!(result, doc! { "a": 1 });
    }

    #[test]
    fn merge_preserves_unnamed_fields_and_recurses_into_maps() {
        let existing = doc! { "keep": 1, "nested": { "a": 1, "b": 2 } };
        let payload = WriteData::from(doc! { "nested": { "b": 3, "c": 4 } });

        let result = apply_set(Some(&existing), &payload, true, &fixed_clock());
        assert_eq!(
            result,
            doc! { "keep": 1, "nested": { "a": 1, "b": 3, "c": 4 } }
        );
    }

    #[test]
    fn merge_replaces_arrays_and_scalars_outright() {
        let existing = doc! { "items": [1, 2, 3], "n": 1 };
        let payload = WriteData::from(doc! { "items": [9], "n": 2 });

        let result = apply_set(Some(&existing), &payload, true, &fixed_clock());
        assert_eq!(result, doc! { "items": [9], "n": 2 });
    }

    #[test]
    fn server_timestamp_resolves_through_the_clock() {
        let payload = WriteData::new().with("at", FieldValue::ServerTimestamp);
        let result = apply_set(None, &payload, false, &fixed_clock());
        assert_eq!(
            result.get("at"),
            Some(&Bson::DateTime(bson::DateTime::from_millis(86_400_000)))
        );
    }

    #[test]
    fn array_union_is_idempotent_and_appends_in_order() {
        let existing = doc! { "tags": ["a", "b"] };
        let payload = WriteData::new().with("tags", FieldValue::array_union(["b", "c"]));

        let once = apply_set(Some(&existing), &payload, true, &fixed_clock());
        assert_eq!(once, doc! { "tags": ["a", "b", "c"] });

        let twice = apply_set(Some(&once), &payload, true, &fixed_clock());
        assert_eq!(twice, doc! { "tags": ["a", "b", "c"] });
    }

    #[test]
    fn array_sentinels_replace_non_array_targets() {
        let existing = doc! { "tags": "scalar" };
        let union = WriteData::new().with("tags", FieldValue::array_union([1]));
        assert_eq!(
            apply_set(Some(&existing), &union, true, &fixed_clock()),
            doc! { "tags": [1] }
        );

        let remove = WriteData::new().with("tags", FieldValue::array_remove([1]));
        assert_eq!(
            apply_set(Some(&existing), &remove, true, &fixed_clock()),
            doc! { "tags": [] }
        );
    }

    #[test]
    fn array_remove_strips_every_occurrence() {
        let existing = doc! { "tags": [1, 2, 1, 3, 1] };
        let payload = WriteData::new().with("tags", FieldValue::array_remove([1]));
        assert_eq!(
            apply_set(Some(&existing), &payload, true, &fixed_clock()),
            doc! { "tags": [2, 3] }
        );
    }

    #[test]
    fn update_writes_nested_paths_and_creates_intermediates() {
        let existing = doc! { "profile": { "name": "Alice" } };
        let result = update(
            Some(&existing),
            &[
                ("profile.age", FieldValue::value(30)),
                ("settings.theme", FieldValue::value("dark")),
            ],
        )
        .unwrap();
        assert_eq!(
            result,
            doc! {
                "profile": { "name": "Alice", "age": 30 },
                "settings": { "theme": "dark" },
            }
        );
    }

    #[test]
    fn update_through_a_scalar_is_illegal() {
        let existing = doc! { "a": 1 };
        let err = update(Some(&existing), &[("a.b", FieldValue::value(2))]).unwrap_err();
        assert!(matches!(err, StoreError::IllegalFieldPath { .. }));
    }

    #[test]
    fn update_requires_an_existing_document() {
        let err = update(None, &[("a", FieldValue::value(1))]).unwrap_err();
        assert!(matches!(err, StoreError::NoDocumentToUpdate(_)));
    }

    #[test]
    fn update_delete_removes_the_field() {
        let existing = doc! { "a": 1, "b": 2 };
        let result = update(Some(&existing), &[("a", FieldValue::Delete)]).unwrap();
        assert_eq!(result, doc! { "b": 2 });
    }
}
