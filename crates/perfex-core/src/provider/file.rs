//! Snapshot provider backed by a JSON recording on disk.
//!
//! The file is re-read on every fetch so an external agent can keep
//! replacing it between scrapes.

use std::path::{Path, PathBuf};

use tracing::trace;

use crate::provider::{ProviderError, SnapshotData, SnapshotProvider};

/// Reads counter snapshots from a JSON file.
///
/// The file holds a [`SnapshotData`] map (object name → object).
#[derive(Debug, Clone)]
pub struct FileProvider {
    path: PathBuf,
}

impl FileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotProvider for FileProvider {
    fn fetch(&self, objects: &[String]) -> Result<SnapshotData, ProviderError> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            ProviderError::Unavailable(format!("{}: {}", self.path.display(), e))
        })?;

        let mut data: SnapshotData = serde_json::from_str(&content)
            .map_err(|e| ProviderError::Malformed(format!("{}: {}", self.path.display(), e)))?;

        data.retain(|name, _| objects.iter().any(|o| o == name));
        trace!(path = %self.path.display(), objects = data.len(), "snapshot file read");
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "Network Interface": {
            "name": "Network Interface",
            "instances": [{ "name": "Ethernet 1", "counters": { "Bytes Received/sec": 1000 } }]
        },
        "MSMQ Queue": { "name": "MSMQ Queue", "instances": [] }
    }"#;

    #[test]
    fn test_file_provider_filters_objects() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let provider = FileProvider::new(file.path());
        let data = provider.fetch(&["Network Interface".to_string()]).unwrap();

        assert_eq!(data.len(), 1);
        assert_eq!(
            data["Network Interface"].instances[0].value("Bytes Received/sec"),
            1000.0
        );
    }

    #[test]
    fn test_file_provider_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FileProvider::new(dir.path().join("absent.json"));
        let err = provider.fetch(&[]).unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable(_)));
        assert!(err.to_string().contains("absent.json"));
    }

    #[test]
    fn test_file_provider_malformed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();

        let provider = FileProvider::new(file.path());
        let err = provider.fetch(&[]).unwrap_err();
        assert!(matches!(err, ProviderError::Malformed(_)));
    }
}
