//! Inspect command implementation.

use savable_core::ObjectMeta;
use savable_storage::{Column, FilterChain, FilterType, Meta, QuerySelect};
use serde::Serialize;
use std::sync::Arc;

/// Store inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Engine name.
    pub engine: String,
    /// Object id prefix the counts are restricted to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Number of stored rows.
    pub row_count: usize,
    /// Number of distinct objects.
    pub object_count: usize,
    /// Number of stored lists.
    pub list_count: usize,
    /// Rows whose value could not be decoded.
    pub undecodable_count: usize,
    /// Per-object statistics (if requested).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objects: Option<Vec<ObjectStats>>,
}

/// Statistics for a single object.
#[derive(Debug, Serialize)]
pub struct ObjectStats {
    /// Object id.
    pub id: String,
    /// Number of scalar fields.
    pub fields: usize,
    /// Number of lists.
    pub lists: usize,
}

/// Gathers statistics.
pub fn collect(
    backend: Arc<dyn Meta>,
    prefix: Option<&str>,
    show_objects: bool,
) -> Result<InspectResult, Box<dyn std::error::Error>> {
    let filters = match prefix {
        Some(prefix) => FilterChain::new().and(Column::RowId, FilterType::StartsWith, prefix),
        None => FilterChain::new(),
    };
    let rows = backend.select(&QuerySelect::all().with_filters(filters))?;

    let meta = ObjectMeta::new(Arc::clone(&backend));
    let objects = meta.get_all(prefix.unwrap_or(""))?;

    let stats: Vec<ObjectStats> = objects
        .iter()
        .map(|(id, data)| ObjectStats {
            id: id.clone(),
            fields: data.values().len(),
            lists: data.list_keys().count(),
        })
        .collect();

    Ok(InspectResult {
        engine: backend.backend_name().to_string(),
        prefix: prefix.map(str::to_string),
        row_count: rows.len() + rows.skipped.len(),
        object_count: stats.len(),
        list_count: stats.iter().map(|s| s.lists).sum(),
        undecodable_count: rows.skipped.len(),
        objects: show_objects.then_some(stats),
    })
}

/// Runs the inspect command.
pub fn run(
    backend: Arc<dyn Meta>,
    prefix: Option<&str>,
    show_objects: bool,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = collect(backend, prefix, show_objects)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("Savable Store");
    println!("=============");
    println!("Engine: {}", result.engine);
    if let Some(prefix) = &result.prefix {
        println!("Prefix: {prefix}");
    }
    println!();
    println!("Rows:         {}", result.row_count);
    println!("Objects:      {}", result.object_count);
    println!("Lists:        {}", result.list_count);
    if result.undecodable_count > 0 {
        println!("Undecodable:  {}", result.undecodable_count);
    }

    if let Some(objects) = &result.objects {
        println!();
        println!("Objects:");
        for object in objects {
            println!("  {}: {} fields, {} lists", object.id, object.fields, object.lists);
        }
    }
}
