//! JSON Schema handling for index snapshot files.
//!
//! Snapshots are the exchange format between the loader CLI and the script
//! renderer. Loading compiles the snapshot schema, checks that its
//! `schema_version` const matches what this build writes, validates the
//! document, and only then deserializes it.

use crate::config;
use crate::index::{IndexSnapshot, SNAPSHOT_SCHEMA_VERSION};
use anyhow::{Context, Result, anyhow, bail};
use jsonschema::JSONSchema;
use serde_json::Value;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Repository-relative location of the canonical snapshot schema.
pub const SNAPSHOT_SCHEMA_PATH: &str = "schema/implementor_snapshot.schema.json";

/// Result of loading and compiling a JSON Schema.
pub(crate) struct SchemaLoadResult {
    pub schema_version: String,
    pub compiled: JSONSchema,
}

/// Controls how schemas are normalized before compilation.
pub(crate) struct SchemaLoadOptions<'a> {
    /// Where to find the schema_version const inside the schema payload.
    pub schema_version_pointer: &'a str,
    /// Required schema_version; loading fails on mismatch.
    pub expected_version: Option<&'a str>,
}

impl Default for SchemaLoadOptions<'_> {
    fn default() -> Self {
        Self {
            schema_version_pointer: "/properties/schema_version/const",
            expected_version: None,
        }
    }
}

pub(crate) fn load_json_schema(path: &Path, options: SchemaLoadOptions<'_>) -> Result<SchemaLoadResult> {
    let schema: Value = serde_json::from_reader(BufReader::new(
        File::open(path).with_context(|| format!("opening schema {}", path.display()))?,
    ))
    .with_context(|| format!("parsing schema {}", path.display()))?;

    let schema_version = extract_schema_version(&schema, options.schema_version_pointer)
        .ok_or_else(|| anyhow!("schema {} missing schema_version const", path.display()))?;
    if let Some(expected) = options.expected_version {
        if schema_version != expected {
            bail!(
                "schema {} declares schema_version '{}', expected '{}'",
                path.display(),
                schema_version,
                expected
            );
        }
    }

    let compiled = JSONSchema::compile(&schema)
        .map_err(|err| anyhow!("compiling schema {}: {err}", path.display()))?;

    Ok(SchemaLoadResult {
        schema_version,
        compiled,
    })
}

fn extract_schema_version(schema: &Value, pointer: &str) -> Option<String> {
    let version = schema.pointer(pointer).and_then(Value::as_str)?;
    if version
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        Some(version.to_string())
    } else {
        None
    }
}

/// Schema path honoring `IMPLEMENTORS_SCHEMA`, falling back to the crate copy.
pub fn snapshot_schema_path() -> PathBuf {
    config::schema_override()
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(SNAPSHOT_SCHEMA_PATH))
}

/// Validate a snapshot document against the schema at `schema_path`.
pub fn validate_snapshot_value(value: &Value, schema_path: &Path) -> Result<()> {
    let schema = load_json_schema(
        schema_path,
        SchemaLoadOptions {
            expected_version: Some(SNAPSHOT_SCHEMA_VERSION),
            ..Default::default()
        },
    )?;

    let declared = value
        .get("schema_version")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if declared != schema.schema_version {
        bail!(
            "snapshot schema_version '{}' does not match schema '{}'",
            declared,
            schema.schema_version
        );
    }

    if let Err(errors) = schema.compiled.validate(value) {
        let details = errors
            .map(|err| format!("{}: {err}", err.instance_path))
            .collect::<Vec<_>>()
            .join("\n");
        bail!("snapshot failed schema validation:\n{details}");
    }
    Ok(())
}

/// Read, validate, and deserialize a snapshot file.
pub fn load_snapshot(path: &Path, schema_path: &Path) -> Result<IndexSnapshot> {
    let file = File::open(path).with_context(|| format!("opening snapshot {}", path.display()))?;
    let value: Value = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing snapshot {}", path.display()))?;
    validate_snapshot_value(&value, schema_path)
        .with_context(|| format!("validating snapshot {}", path.display()))?;
    serde_json::from_value(value).with_context(|| format!("decoding snapshot {}", path.display()))
}

/// Write a snapshot as pretty-printed JSON.
pub fn write_snapshot(path: &Path, snapshot: &IndexSnapshot) -> Result<()> {
    let json = serde_json::to_string_pretty(snapshot)?;
    fs::write(path, json + "\n").with_context(|| format!("writing snapshot {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::{NamedTempFile, TempDir};

    fn canonical_schema() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(SNAPSHOT_SCHEMA_PATH)
    }

    fn sample() -> Value {
        json!({
            "schema_version": "implementor_snapshot_v1",
            "capabilities": {
                "core::default::Default": {
                    "doc_link": "https://doc.rust-lang.org/nightly/core/default/trait.Default.html",
                    "implementors": {
                        "wasmer_wasi": [
                            {"text": "impl Default for WasiStateBuilder", "synthetic": false,
                             "types": ["wasmer_wasi::state::builder::WasiStateBuilder"]}
                        ]
                    }
                }
            }
        })
    }

    #[test]
    fn canonical_schema_accepts_sample() {
        validate_snapshot_value(&sample(), &canonical_schema()).unwrap();
    }

    #[test]
    fn rejects_structural_errors() {
        let mut bad = sample();
        bad["capabilities"]["core::default::Default"]["implementors"]["wasmer_wasi"][0]
            .as_object_mut()
            .unwrap()
            .remove("text");
        let err = validate_snapshot_value(&bad, &canonical_schema()).expect_err("missing text");
        assert!(err.to_string().contains("failed schema validation"));

        let mut bad_name = sample();
        let listing = bad_name["capabilities"]
            .as_object_mut()
            .unwrap()
            .remove("core::default::Default")
            .unwrap();
        bad_name["capabilities"]["not a path"] = listing;
        assert!(validate_snapshot_value(&bad_name, &canonical_schema()).is_err());
    }

    #[test]
    fn rejects_version_mismatch() {
        let mut old = sample();
        old["schema_version"] = json!("implementor_snapshot_v0");
        let err = validate_snapshot_value(&old, &canonical_schema()).expect_err("old version");
        assert!(err.to_string().contains("implementor_snapshot_v0"));
    }

    #[test]
    fn schema_with_unexpected_const_is_refused() {
        let mut schema: Value =
            serde_json::from_str(&fs::read_to_string(canonical_schema()).unwrap()).unwrap();
        schema["properties"]["schema_version"]["const"] = json!("implementor_snapshot_v9");
        let mut file = NamedTempFile::new().unwrap();
        serde_json::to_writer(&mut file, &schema).unwrap();
        let err = validate_snapshot_value(&sample(), file.path()).expect_err("const mismatch");
        assert!(err.to_string().contains("implementor_snapshot_v9"));
    }

    #[test]
    fn write_then_load_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshot.json");
        let snapshot: IndexSnapshot = serde_json::from_value(sample()).unwrap();
        write_snapshot(&path, &snapshot).unwrap();
        let loaded = load_snapshot(&path, &canonical_schema()).unwrap();
        assert_eq!(loaded, snapshot);
    }
}
