//! In-memory documents mirrored to a pretty-printed JSON file.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::io::config::write_atomic;

#[derive(Debug)]
pub(crate) struct JsonStore<T> {
    doc: RwLock<T>,
    path: Option<PathBuf>,
}

impl<T> JsonStore<T>
where
    T: Serialize + DeserializeOwned + Default + Clone + PartialEq,
{
    pub(crate) fn in_memory() -> Self {
        Self {
            doc: RwLock::new(T::default()),
            path: None,
        }
    }

    /// Load `path` if it exists; a missing file starts from the default document.
    pub(crate) fn open(path: &Path) -> Result<Self> {
        let doc = if path.exists() {
            let contents =
                fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
            serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))?
        } else {
            T::default()
        };
        debug!(path = %path.display(), "json store loaded");
        Ok(Self {
            doc: RwLock::new(doc),
            path: Some(path.to_path_buf()),
        })
    }

    pub(crate) fn read<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        let doc = self
            .doc
            .read()
            .map_err(|_| anyhow!("json store lock poisoned"))?;
        Ok(f(&doc))
    }

    /// Apply `f` and write the document if it changed.
    ///
    /// A failed write restores the document to its state before `f`.
    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        let mut doc = self
            .doc
            .write()
            .map_err(|_| anyhow!("json store lock poisoned"))?;
        let before = doc.clone();
        let out = f(&mut doc);
        if *doc == before {
            return Ok(out);
        }
        if let Err(err) = self.persist(&doc) {
            *doc = before;
            return Err(err);
        }
        Ok(out)
    }

    fn persist(&self, doc: &T) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let mut buf = serde_json::to_string_pretty(doc).context("serialize json store")?;
        buf.push('\n');
        write_atomic(path, &buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changes_survive_reopen() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("nested").join("doc.json");

        let store: JsonStore<Vec<String>> = JsonStore::open(&path).expect("open");
        store.update(|doc| doc.push("a".to_string())).expect("update");
        drop(store);

        let reopened: JsonStore<Vec<String>> = JsonStore::open(&path).expect("reopen");
        assert_eq!(reopened.read(Clone::clone).expect("read"), vec!["a"]);
    }

    #[test]
    fn unchanged_document_is_not_written() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("doc.json");
        let store: JsonStore<Vec<String>> = JsonStore::open(&path).expect("open");
        store.update(|doc| doc.len()).expect("noop");
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn failed_write_rolls_back() {
        let temp = tempfile::tempdir().expect("tempdir");
        let blocker = temp.path().join("file");
        fs::write(&blocker, "").expect("write blocker");
        // The parent of the store path is a regular file, so every write fails.
        let store: JsonStore<Vec<String>> =
            JsonStore::open(&blocker.join("doc.json")).expect("open");

        assert!(store.update(|doc| doc.push("lost".to_string())).is_err());
        assert!(store.read(Vec::is_empty).expect("read"));
    }
}
