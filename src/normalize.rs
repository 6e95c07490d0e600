use serde_json::{Map, Value};

/// Malformed field key encountered while normalizing an event.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum KeyFormatError {
    #[error("log field key must not be empty")]
    EmptyKey,

    #[error("log field key {0:?} contains an empty path segment")]
    EmptySegment(String),
}

/// Fold an ordered sequence of field maps into one canonical nested tree.
///
/// Layers are given in ascending precedence: a later layer always wins a
/// leaf collision with an earlier one. Dotted keys (`"http.request.method"`)
/// and pre-nested objects (`{"http": {"request": {"method": ...}}}`) are
/// equivalent input conventions and produce the same tree, so normalizing an
/// already-canonical tree returns it unchanged.
///
/// **Merge rules**
/// - A dotted key is split on `.` and intermediate object nodes are created
///   for every segment but the last.
/// - An object value deep-merges into the subtree at its path; its own keys
///   may again be dotted and are expanded recursively.
/// - A non-object value (scalar or array) overwrites whatever is bound at
///   its path.
/// - An intermediate segment bound to a non-object value is a merge
///   conflict; the policy is last-writer-wins and the new branch overwrites
///   the old value.
///
/// **Errors**
/// - [`KeyFormatError`] if any key is empty or contains an empty dotted
///   segment (`"a..b"`). Nothing is silently dropped.
pub fn normalize<'a, I>(layers: I) -> Result<Map<String, Value>, KeyFormatError>
where
    I: IntoIterator<Item = &'a Map<String, Value>>,
{
    let mut tree = Map::new();
    for layer in layers {
        merge_fields(&mut tree, layer)?;
    }
    Ok(tree)
}

fn merge_fields(
    tree: &mut Map<String, Value>,
    fields: &Map<String, Value>,
) -> Result<(), KeyFormatError> {
    for (key, value) in fields {
        let path = split_key(key)?;
        insert_at(tree, &path, value)?;
    }
    Ok(())
}

fn split_key(key: &str) -> Result<Vec<&str>, KeyFormatError> {
    if key.is_empty() {
        return Err(KeyFormatError::EmptyKey);
    }
    let path: Vec<&str> = key.split('.').collect();
    if path.iter().any(|segment| segment.is_empty()) {
        return Err(KeyFormatError::EmptySegment(key.to_string()));
    }
    Ok(path)
}

fn insert_at(
    tree: &mut Map<String, Value>,
    path: &[&str],
    value: &Value,
) -> Result<(), KeyFormatError> {
    let (leaf, branches) = match path.split_last() {
        Some(parts) => parts,
        // split_key never yields an empty path.
        None => return Err(KeyFormatError::EmptyKey),
    };

    let mut node = tree;
    for segment in branches {
        node = child_object(node, segment);
    }

    match value {
        Value::Object(fields) => merge_fields(child_object(node, leaf), fields),
        other => {
            node.insert((*leaf).to_string(), other.clone());
            Ok(())
        }
    }
}

/// Get the object under `key`, creating it if absent. A non-object value
/// already bound there is overwritten by the new branch (last-writer-wins).
fn child_object<'t>(node: &'t mut Map<String, Value>, key: &str) -> &'t mut Map<String, Value> {
    let slot = node
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    slot.as_object_mut().expect("slot is an object")
}
