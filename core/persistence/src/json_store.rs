//! FILENAME: core/persistence/src/json_store.rs
//! PURPOSE: Durable backend that keeps one store's rows in a JSON file.
//! CONTEXT: The file holds a single JSON array. Rows are cached in memory and
//! every mutation rewrites the whole file through a temp file + rename, so a
//! crash mid-write leaves either the old or the new array, never a torn one.

use engine::{log_debug, DurableStore, StoreError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::PersistenceError;

#[derive(Debug)]
pub struct JsonFileStore<T> {
    path: PathBuf,
    rows: Mutex<Vec<T>>,
}

impl<T> JsonFileStore<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    /// Opens the store at `path`. A missing file is an empty store; the file
    /// is created on the first write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let path = path.into();
        let rows = read_rows(&path)?;
        log_debug!("PERSIST", "opened {:?} with {} row(s)", path, rows.len());

        Ok(JsonFileStore {
            path,
            rows: Mutex::new(rows),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, Vec<T>> {
        self.rows.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Applies `change` to a copy of the rows, persists the copy, and only then
    /// swaps it in. A failed write leaves both the file and the cache as they were.
    fn update(&self, change: impl FnOnce(&mut Vec<T>)) -> Result<(), PersistenceError> {
        let mut rows = self.lock();
        let mut next = rows.clone();
        change(&mut next);
        write_rows(&self.path, &next)?;
        *rows = next;
        Ok(())
    }
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, PersistenceError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let value: serde_json::Value = serde_json::from_str(&content)?;
    if !value.is_array() {
        return Err(PersistenceError::InvalidFormat(format!(
            "{:?} does not contain a JSON array",
            path
        )));
    }
    Ok(serde_json::from_value(value)?)
}

/// `<file name>.tmp` next to `path`. Keeps the whole file name so stores that
/// differ only by extension never share a temp file.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), PersistenceError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_vec_pretty(rows)?;
    let tmp = temp_path(path);
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(&json)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

impl<T> DurableStore<T> for JsonFileStore<T>
where
    T: Serialize + DeserializeOwned + Clone + PartialEq + Send,
{
    fn load_all(&self) -> Result<Vec<T>, StoreError> {
        Ok(self.lock().clone())
    }

    fn insert(&self, item: &T) -> Result<(), StoreError> {
        Ok(self.update(|rows| rows.push(item.clone()))?)
    }

    /// One rewrite for the whole batch; a failed write changes nothing.
    fn insert_all(&self, items: &[T]) -> Result<(), StoreError> {
        if items.is_empty() {
            return Ok(());
        }
        Ok(self.update(|rows| rows.extend_from_slice(items))?)
    }

    fn delete(&self, item: &T) -> Result<(), StoreError> {
        if !self.lock().contains(item) {
            return Ok(());
        }
        Ok(self.update(|rows| {
            if let Some(pos) = rows.iter().position(|r| r == item) {
                rows.remove(pos);
            }
        })?)
    }

    fn delete_all(&self) -> Result<(), StoreError> {
        Ok(self.update(|rows| rows.clear())?)
    }
}
