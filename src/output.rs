use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};

use crate::config::OutputFormat;
use crate::error::{InventoryError, Result};

/// Pretty JSON with a 4-space indent; non-ASCII text is written as is.
pub fn render_json<T: Serialize>(data: &T) -> Result<String> {
    let mut buf = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    data.serialize(&mut serializer)
        .map_err(|e| InventoryError::Serialize(e.to_string()))?;
    String::from_utf8(buf).map_err(|e| InventoryError::Serialize(e.to_string()))
}

pub fn render<T: Serialize>(data: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => render_json(data),
        OutputFormat::Yaml => {
            serde_yaml::to_string(data).map_err(|e| InventoryError::Serialize(e.to_string()))
        }
    }
}

pub fn output_data<T: Serialize>(data: &T, format: OutputFormat) -> Result<()> {
    println!("{}", render(data, format)?);
    Ok(())
}

/// Write the record to `target`, or to numbered shards when a size limit is set.
///
/// Shards hold contiguous runs of top-level fields in record order. A shard
/// only exceeds the limit when a single field is larger than the limit.
pub fn write_output<T: Serialize>(
    data: &T,
    target: &Path,
    max_shard_bytes: Option<usize>,
) -> Result<Vec<PathBuf>> {
    let Some(limit) = max_shard_bytes else {
        write_file(target, &render_json(data)?)?;
        return Ok(vec![target.to_path_buf()]);
    };

    let value = serde_json::to_value(data).map_err(|e| InventoryError::Serialize(e.to_string()))?;
    let Value::Object(fields) = value else {
        return Err(InventoryError::Serialize("record is not a JSON object".into()));
    };

    let mut written = Vec::new();
    for (idx, shard) in pack_shards(fields, limit)?.iter().enumerate() {
        let path = shard_path(target, idx + 1);
        if shard.oversized {
            tracing::warn!(
                "{} holds one field larger than the shard limit of {} bytes",
                path.display(),
                limit
            );
        }
        write_file(&path, &shard.text)?;
        written.push(path);
    }
    Ok(written)
}

/// One rendered shard; `oversized` when its single field alone exceeds the limit.
#[derive(Debug)]
struct Shard {
    text: String,
    oversized: bool,
}

impl Shard {
    fn new(text: String, limit: usize) -> Self {
        let oversized = text.len() > limit;
        Self { text, oversized }
    }
}

/// Greedily pack fields into rendered shards no larger than `limit` bytes.
fn pack_shards(fields: Map<String, Value>, limit: usize) -> Result<Vec<Shard>> {
    let mut shards = Vec::new();
    let mut current = Map::new();
    let mut rendered = String::new();

    for (key, value) in fields {
        let mut candidate = current.clone();
        candidate.insert(key.clone(), value.clone());
        let candidate_text = render_json(&candidate)?;

        if candidate_text.len() > limit && !current.is_empty() {
            shards.push(Shard::new(std::mem::take(&mut rendered), limit));
            current = Map::new();
            current.insert(key, value);
            rendered = render_json(&current)?;
        } else {
            current = candidate;
            rendered = candidate_text;
        }
    }
    if !current.is_empty() {
        shards.push(Shard::new(rendered, limit));
    }

    Ok(shards)
}

/// `inventory_result.json` -> `inventory_result_3.json`
pub fn shard_path(target: &Path, n: usize) -> PathBuf {
    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match target.extension() {
        Some(ext) => format!("{}_{}.{}", stem, n, ext.to_string_lossy()),
        None => format!("{}_{}", stem, n),
    };
    target.with_file_name(name)
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).map_err(|source| InventoryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!("Wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

// Status lines go to stderr; stdout only carries the echoed record
pub fn print_success(message: &str) {
    eprintln!("✅ {}", message);
}

pub fn print_error(message: &str) {
    eprintln!("\x1b[31m❌ Error: {}\x1b[0m", message);
}

pub fn print_warning(message: &str) {
    eprintln!("\x1b[33m⚠️  Warning: {}\x1b[0m", message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_indent_and_unicode() {
        let text = render_json(&json!({"os_hostname": "höst-01", "cpu_count": 2})).unwrap();
        assert_eq!(text, "{\n    \"os_hostname\": \"höst-01\",\n    \"cpu_count\": 2\n}");
    }

    #[test]
    fn test_shard_names() {
        assert_eq!(
            shard_path(Path::new("/tmp/out/inventory_result.json"), 2),
            PathBuf::from("/tmp/out/inventory_result_2.json")
        );
        assert_eq!(shard_path(Path::new("record"), 1), PathBuf::from("record_1"));
    }

    #[test]
    fn test_unsharded_output_writes_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("inventory_result.json");
        let written = write_output(&json!({"is_vm": false}), &target, None).unwrap();

        assert_eq!(written, vec![target.clone()]);
        assert_eq!(fs::read_to_string(&target).unwrap(), "{\n    \"is_vm\": false\n}");
    }

    #[test]
    fn test_shards_keep_field_order_and_limit() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("inventory_result.json");
        let data = json!({
            "is_vm": false,
            "os_hostname": "db-01",
            "os_users": ["admin", "deploy", "operator", "backup", "monitoring"],
            "cpu_count": 2,
        });

        let written = write_output(&data, &target, Some(60)).unwrap();
        assert!(written.len() > 1);
        assert!(!target.exists());

        let mut keys = Vec::new();
        for path in &written {
            let text = fs::read_to_string(path).unwrap();
            let shard: Map<String, Value> = serde_json::from_str(&text).unwrap();
            if shard.len() > 1 {
                assert!(text.len() <= 60);
            }
            keys.extend(shard.keys().cloned());
        }
        assert_eq!(keys, vec!["is_vm", "os_hostname", "os_users", "cpu_count"]);
        assert_eq!(written[0], dir.path().join("inventory_result_1.json"));
    }

    #[test]
    fn test_oversized_first_field_is_flagged() {
        let mut fields = Map::new();
        fields.insert("os_users".into(), json!(["admin", "deploy", "operator", "backup"]));
        fields.insert("is_vm".into(), json!(false));
        fields.insert("cpu_count".into(), json!(2));

        let shards = pack_shards(fields, 50).unwrap();
        assert_eq!(shards.len(), 2);
        assert!(shards[0].oversized);
        assert!(shards[0].text.contains("os_users"));
        assert!(!shards[1].oversized);
        assert!(shards[1].text.len() <= 50);
    }
}
