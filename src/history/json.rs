use super::{HistoryBackend, HistoryReadError, HistoryWriteError, PostRecord};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// `{"posts": [...]}` document, compatible with existing `post_history.json` files.
#[derive(Serialize, Deserialize, Default)]
struct HistoryDocument {
    #[serde(default)]
    posts: Vec<PostRecord>,
}

pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "post_history.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_err(path: &Path, source: std::io::Error) -> HistoryWriteError {
        HistoryWriteError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

impl HistoryBackend for JsonFileBackend {
    fn read_all(&self) -> Result<Vec<PostRecord>, HistoryReadError> {
        let location = self.location();
        let content = fs::read_to_string(&self.path)
            .map_err(|e| HistoryReadError::from_io(location.clone(), e))?;

        let document: HistoryDocument =
            serde_json::from_str(&content).map_err(|e| HistoryReadError::Parse {
                path: location,
                reason: e.to_string(),
            })?;
        Ok(document.posts)
    }

    /// Writes a sibling temp file, syncs it and renames it over the target.
    fn replace_all(&self, records: &[PostRecord]) -> Result<(), HistoryWriteError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Self::write_err(parent, e))?;
        }

        #[derive(Serialize)]
        struct DocumentRef<'a> {
            posts: &'a [PostRecord],
        }
        let body = serde_json::to_vec_pretty(&DocumentRef { posts: records })?;

        let tmp = self.temp_path();
        let mut file = File::create(&tmp).map_err(|e| Self::write_err(&tmp, e))?;
        file.write_all(&body).map_err(|e| Self::write_err(&tmp, e))?;
        file.sync_all().map_err(|e| Self::write_err(&tmp, e))?;
        drop(file);

        fs::rename(&tmp, &self.path).map_err(|e| Self::write_err(&self.path, e))?;
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::is_duplicate;
    use crate::history::{content_hash, HistoryStore, MAX_HISTORY};

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileBackend::new(dir.path().join("post_history.json"));
        assert!(matches!(
            backend.read_all(),
            Err(HistoryReadError::NotFound(_))
        ));
    }

    #[test]
    fn test_corrupt_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("post_history.json");
        fs::write(&path, "{\"posts\": [ {\"content\": ").unwrap();

        let backend = JsonFileBackend::new(&path);
        assert!(matches!(
            backend.read_all(),
            Err(HistoryReadError::Parse { .. })
        ));

        let store = HistoryStore::load(Box::new(JsonFileBackend::new(&path)), MAX_HISTORY);
        assert_eq!(store.size(), 0);
    }

    #[test]
    fn test_reads_legacy_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("post_history.json");
        // Legacy files store the MD5 of the content.
        fs::write(
            &path,
            r#"{"posts": [{"content": "Legacy post #DAO", "hash": "3ce0164b201e2d4a45878f094bac3376", "date": "2025-03-01 09:30:00"}]}"#,
        )
        .unwrap();

        let records = JsonFileBackend::new(&path).read_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].timestamp.format("%H:%M").to_string(), "09:30");

        let store = HistoryStore::load(Box::new(JsonFileBackend::new(&path)), MAX_HISTORY);
        let snapshot = store.snapshot();
        assert_eq!(snapshot[0].hash, content_hash("Legacy post #DAO"));
        assert!(store.with_history(|h| is_duplicate("Legacy post #DAO", h, 1.01)));
    }

    #[test]
    fn test_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("post_history.json");

        let store = HistoryStore::load(Box::new(JsonFileBackend::new(&path)), MAX_HISTORY);
        let record = PostRecord::new("Treasury clarity drives DAO growth #DAO");
        store.append(record.clone()).unwrap();
        drop(store);

        let reloaded = HistoryStore::load(Box::new(JsonFileBackend::new(&path)), MAX_HISTORY);
        let records = reloaded.snapshot();
        let found = records.iter().find(|r| r.hash == record.hash).unwrap();
        assert_eq!(found.content, record.content);
        assert_eq!(found, &record);
        assert!(!path.with_file_name("post_history.json.tmp").exists());
    }
}
