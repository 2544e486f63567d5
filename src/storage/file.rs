use std::cell::RefCell;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use super::KeyValueStorage;
use crate::error::StorageError;

/// Storage backed by a single JSON document on disk.
///
/// The document is an object of `key -> raw string`. It is read once when
/// opened and rewritten atomically after every mutation: the new content
/// goes to a temp file in the same directory, which is then renamed over
/// the target, so an interrupted write never leaves a partial document.
#[derive(Debug, Clone)]
pub struct FileStorage {
    inner: Rc<FileInner>,
}

#[derive(Debug)]
struct FileInner {
    path: PathBuf,
    items: RefCell<Map<String, Value>>,
}

impl FileStorage {
    /// Open the document at `path`. A missing file is an empty store.
    ///
    /// A document that does not parse is moved aside to `<path>.corrupt`
    /// and the store opens empty. Only I/O errors reading the file fail.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let items = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            if content.trim().is_empty() {
                Map::new()
            } else {
                match serde_json::from_str(&content) {
                    Ok(items) => items,
                    Err(e) => {
                        warn!("Storage document {:?} is malformed: {}", path, e);
                        set_aside(path);
                        Map::new()
                    }
                }
            }
        } else {
            Map::new()
        };

        info!("Opened file storage at {:?} ({} keys)", path, items.len());
        Ok(Self {
            inner: Rc::new(FileInner {
                path: path.to_path_buf(),
                items: RefCell::new(items),
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    fn flush(&self, items: &Map<String, Value>) -> Result<(), StorageError> {
        let path = &self.inner.path;
        let parent = path.parent().ok_or_else(|| {
            StorageError::Unavailable(format!("Storage path has no parent directory: {:?}", path))
        })?;
        std::fs::create_dir_all(parent)?;

        let json = serde_json::to_string_pretty(items)?;
        let mut temp = NamedTempFile::new_in(parent)?;
        temp.write_all(json.as_bytes())?;
        temp.flush()?;
        temp.persist(path).map_err(|e| StorageError::Io(e.error))?;

        debug!("Wrote storage document {:?}", path);
        Ok(())
    }

    /// Apply `mutate` to a copy of the document and commit it only if the
    /// write succeeds, keeping memory and disk in agreement.
    fn commit(&self, mutate: impl FnOnce(&mut Map<String, Value>)) -> Result<(), StorageError> {
        let mut next = self.inner.items.borrow().clone();
        mutate(&mut next);
        self.flush(&next)?;
        *self.inner.items.borrow_mut() = next;
        Ok(())
    }
}

/// Path a malformed document is moved to.
fn corrupt_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".corrupt");
    PathBuf::from(name)
}

fn set_aside(path: &Path) {
    let target = corrupt_path(path);
    match std::fs::rename(path, &target) {
        Ok(()) => warn!("Moved malformed storage document to {:?}", target),
        Err(e) => warn!("Failed to move malformed storage document aside: {}", e),
    }
}

impl KeyValueStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let items = self.inner.items.borrow();
        Ok(items.get(key).and_then(|v| v.as_str()).map(|s| s.to_string()))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.commit(|items| {
            items.insert(key.to_string(), Value::String(value.to_string()));
        })
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        if !self.inner.items.borrow().contains_key(key) {
            return Ok(());
        }
        self.commit(|items| {
            items.remove(key);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::open(&dir.path().join("storage.json")).unwrap();
        assert!(storage.get_item("m3dp-last-page").unwrap().is_none());
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let storage = FileStorage::open(&path).unwrap();
        storage.set_item("m3dp-last-page", "pressure-advance").unwrap();
        storage
            .set_item("m3dp-calculator-values", r#"{"extruder":{"eSteps":415}}"#)
            .unwrap();
        drop(storage);

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(
            reopened.get_item("m3dp-last-page").unwrap().as_deref(),
            Some("pressure-advance")
        );
        assert_eq!(
            reopened.get_item("m3dp-calculator-values").unwrap().as_deref(),
            Some(r#"{"extruder":{"eSteps":415}}"#)
        );
    }

    #[test]
    fn test_remove_item_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("storage.json");

        let storage = FileStorage::open(&path).unwrap();
        storage.set_item("a", "1").unwrap();
        storage.set_item("b", "2").unwrap();
        storage.remove_item("a").unwrap();
        storage.remove_item("never-set").unwrap();

        let reopened = FileStorage::open(&path).unwrap();
        assert!(reopened.get_item("a").unwrap().is_none());
        assert_eq!(reopened.get_item("b").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn test_clones_share_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("storage.json");

        let first = FileStorage::open(&path).unwrap();
        let second = first.clone();
        first.set_item("m3dp-calculator-values", "{}").unwrap();
        second.set_item("m3dp-user-profiles", "[]").unwrap();

        let reopened = FileStorage::open(&path).unwrap();
        assert!(reopened.get_item("m3dp-calculator-values").unwrap().is_some());
        assert!(reopened.get_item("m3dp-user-profiles").unwrap().is_some());
    }

    #[test]
    fn test_corrupt_document_opens_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "{ truncated").unwrap();

        let storage = FileStorage::open(&path).unwrap();
        assert_eq!(storage.path(), path.as_path());
        assert!(storage.get_item("m3dp-user-profiles").unwrap().is_none());

        // The damaged content is kept next to the document
        let aside = corrupt_path(&path);
        assert_eq!(aside, dir.path().join("storage.json.corrupt"));
        assert_eq!(std::fs::read_to_string(&aside).unwrap(), "{ truncated");

        storage.set_item("m3dp-last-page", "flow").unwrap();
        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(
            reopened.get_item("m3dp-last-page").unwrap().as_deref(),
            Some("flow")
        );
    }

    #[test]
    fn test_non_object_document_opens_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        let storage = FileStorage::open(&path).unwrap();
        assert!(storage.get_item("m3dp-last-page").unwrap().is_none());
        assert!(corrupt_path(&path).exists());
    }
}
