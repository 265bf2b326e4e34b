//! Cascade-of-Care Tools
//!
//! CLI tools for compiling and checking campaign policies.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use coc_compiler::Demographics;
use coc_schema::Schema;
use serde_json::Value;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

/// Initialize logging with a default filter.
///
/// Use `RUST_LOG` environment variable to override the default filter.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,coc_campaign=info,coc_cascade=info"));

    fmt().with_env_filter(filter).with_target(false).init();
}

/// Load the engine schema from `path`, or the bundled schema.
pub fn load_schema(path: Option<&Path>) -> anyhow::Result<Arc<Schema>> {
    let schema = match path {
        Some(path) => Schema::load(path)
            .with_context(|| format!("failed to load schema {}", path.display()))?,
        None => Schema::bundled().context("failed to load bundled schema")?,
    };
    info!(
        version = schema.version().unwrap_or("unversioned"),
        classes = schema.class_names().count(),
        "schema loaded"
    );
    Ok(Arc::new(schema))
}

/// Load demographics from `path`, or the standard cascade properties.
pub fn load_demographics(path: Option<&Path>) -> anyhow::Result<Demographics> {
    match path {
        Some(path) => Demographics::load(path)
            .with_context(|| format!("failed to load demographics {}", path.display())),
        None => Ok(Demographics::standard()),
    }
}

/// Load an engine config from `path`, or start from an empty object.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Value> {
    let Some(path) = path else {
        return Ok(Value::Object(Default::default()));
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: Value = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    anyhow::ensure!(
        config.is_object(),
        "config {} is not a JSON object",
        path.display()
    );
    Ok(config)
}
