//! Single-object commands: get, put, put-list, delete.

use savable_core::{is_valid_key, ObjectMeta};
use savable_storage::Meta;
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::Arc;
use tracing::info;

/// One object as printed by `get`.
#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct ObjectOutput {
    /// Object id.
    pub id: String,
    /// Scalar fields.
    pub fields: BTreeMap<String, String>,
    /// Lists.
    pub lists: BTreeMap<String, Vec<String>>,
}

/// Loads one object, or `None` if it has no rows.
pub fn fetch(backend: Arc<dyn Meta>, object_id: &str) -> Result<Option<ObjectOutput>, Box<dyn Error>> {
    let meta = ObjectMeta::new(backend);
    let Some(data) = meta.get_data(object_id)? else {
        return Ok(None);
    };
    let lists = data
        .list_keys()
        .filter_map(|key| Some((key.to_string(), data.get_list(key)?.to_vec())))
        .collect();
    Ok(Some(ObjectOutput {
        id: object_id.to_string(),
        fields: data.values().clone(),
        lists,
    }))
}

/// Runs the get command.
pub fn get(
    backend: Arc<dyn Meta>,
    object_id: &str,
    key: Option<&str>,
    format: &str,
) -> Result<(), Box<dyn Error>> {
    if let Some(key) = key {
        let value = backend
            .get_value(object_id, key)?
            .ok_or_else(|| format!("No field {key:?} on {object_id:?}"))?;
        match format {
            "json" => println!("{}", serde_json::to_string_pretty(&value)?),
            _ => println!("{value} ({})", value.type_name()),
        }
        return Ok(());
    }

    let object = fetch(backend, object_id)?.ok_or_else(|| format!("No object {object_id:?}"))?;
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&object)?),
        _ => {
            println!("{}", object.id);
            for (key, value) in &object.fields {
                println!("  {key} = {value}");
            }
            for (key, items) in &object.lists {
                println!("  {key} = [{}]", items.join(", "));
            }
        }
    }
    Ok(())
}

/// Runs the put command: decodes `value` as `type_name` and writes it.
pub fn put(
    backend: &dyn Meta,
    object_id: &str,
    key: &str,
    value: &str,
    type_name: &str,
) -> Result<(), Box<dyn Error>> {
    if !is_valid_key(key) {
        return Err(format!("Invalid field name {key:?}").into());
    }
    let value = backend.codec().deserialize(type_name, value)?;
    backend.set_value(object_id, key, &value)?;
    info!(object_id, key, type_name, "field written");
    Ok(())
}

/// Runs the put-list command.
pub fn put_list(
    backend: Arc<dyn Meta>,
    object_id: &str,
    key: &str,
    items: &[String],
) -> Result<(), Box<dyn Error>> {
    ObjectMeta::new(backend).set_list(object_id, key, items)?;
    info!(object_id, key, items = items.len(), "list written");
    Ok(())
}

/// Runs the delete command. Returns the number of rows removed.
pub fn delete(backend: Arc<dyn Meta>, object_id: &str, key: Option<&str>) -> Result<usize, Box<dyn Error>> {
    let meta = ObjectMeta::new(backend);
    let removed = match key {
        Some(key) => {
            let scalar = meta.remove_key(object_id, key)?;
            let list = meta.remove_list(object_id, key)?;
            usize::from(scalar) + usize::from(list)
        }
        None => meta.delete(object_id)?,
    };
    info!(object_id, removed, "rows deleted");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use savable_codec::{Value, ValueCodec};
    use savable_storage::FlatFileBackend;

    fn backend(dir: &tempfile::TempDir) -> Arc<dyn Meta> {
        let path = dir.path().join("objects.txt");
        Arc::new(FlatFileBackend::open(&path, ValueCodec::standard()).unwrap())
    }

    #[test]
    fn put_then_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(&dir);

        put(backend.as_ref(), "user-1", "level", "3", "int").unwrap();
        put_list(Arc::clone(&backend), "user-1", "tags", &["a".into(), "b".into()]).unwrap();

        let object = fetch(Arc::clone(&backend), "user-1").unwrap().unwrap();
        assert_eq!(object.fields.get("level").map(String::as_str), Some("3"));
        assert_eq!(object.lists.get("tags"), Some(&vec!["a".to_string(), "b".to_string()]));
        assert_eq!(backend.get_value("user-1", "level").unwrap(), Some(Value::from("3")));
    }

    #[test]
    fn put_rejects_bad_input() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(&dir);
        assert!(put(backend.as_ref(), "o", "_tags", "x", "string").is_err());
        assert!(put(backend.as_ref(), "o", "n", "abc", "int").is_err());
        assert!(put(backend.as_ref(), "o", "n", "1", "widget").is_err());
        assert!(fetch(backend, "o").unwrap().is_none());
    }

    #[test]
    fn delete_field_and_object() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(&dir);
        put(backend.as_ref(), "o", "a", "1", "string").unwrap();
        put(backend.as_ref(), "o", "b", "2", "string").unwrap();
        put_list(Arc::clone(&backend), "o", "c", &["x".into()]).unwrap();

        assert_eq!(delete(Arc::clone(&backend), "o", Some("c")).unwrap(), 1);
        assert_eq!(delete(Arc::clone(&backend), "o", None).unwrap(), 2);
        assert!(fetch(backend, "o").unwrap().is_none());
    }
}
