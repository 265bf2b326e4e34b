//! Campaign artifact output

use std::io::Write;
use std::path::Path;

use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::info;

use crate::{CampaignError, CampaignResult};

/// A finalized `{"Events": [...]}` document.
#[derive(Debug, Clone, PartialEq)]
pub struct CampaignArtifact {
    document: Value,
}

impl CampaignArtifact {
    pub(crate) fn new(document: Value) -> Self {
        Self { document }
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn into_document(self) -> Value {
        self.document
    }

    pub fn event_count(&self) -> usize {
        self.document["Events"].as_array().map_or(0, Vec::len)
    }

    /// Pretty-printed JSON with a trailing newline.
    pub fn to_json_string(&self) -> CampaignResult<String> {
        let mut text = serde_json::to_string_pretty(&self.document)?;
        text.push('\n');
        Ok(text)
    }

    /// Write to `path` through a temporary file in the same directory, so
    /// the target either holds the whole artifact or is left as it was.
    pub fn write(&self, path: impl AsRef<Path>) -> CampaignResult<()> {
        write_json_atomic(path.as_ref(), &self.document)?;
        info!(path = %path.as_ref().display(), events = self.event_count(), "campaign written");
        Ok(())
    }
}

/// Serialize `value` to `path` atomically.
pub fn write_json_atomic(path: &Path, value: &Value) -> CampaignResult<()> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(text.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|e| CampaignError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("campaign.json");
        let artifact = CampaignArtifact::new(json!({"Events": [{"class": "CampaignEventByYear"}]}));
        artifact.write(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(&parsed, artifact.document());
        assert_eq!(artifact.event_count(), 1);
    }

    #[test]
    fn test_failed_write_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("campaign.json");
        let artifact = CampaignArtifact::new(json!({"Events": []}));
        assert!(artifact.write(&path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_serialization_is_stable() {
        let artifact = CampaignArtifact::new(json!({"Events": [{"b": 1, "a": 2}]}));
        let first = artifact.to_json_string().unwrap();
        let reparsed: Value = serde_json::from_str(&first).unwrap();
        let second = CampaignArtifact::new(reparsed).to_json_string().unwrap();
        assert_eq!(first, second);
    }
}
