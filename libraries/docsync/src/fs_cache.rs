use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;
use xxhash_rust::xxh3::xxh3_64;

use crate::cache::{CacheError, LocalCache};

const EXTENSION: &str = "json";

#[derive(serde::Serialize, serde::Deserialize)]
struct Entry {
    key: String,
    value: Value,
}

/// A [`LocalCache`] that keeps one JSON file per key in a directory, so entries survive restarts.
///
/// File names are a hash of the key. The key is stored next to the value and checked on read,
/// so a hash collision reads as a miss rather than as someone else's data.
#[derive(Debug, Clone)]
pub struct FileCache {
    directory: PathBuf,
}

impl FileCache {
    pub fn open(directory: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let directory = directory.into();
        fs::create_dir_all(&directory)?;
        Ok(Self { directory })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn file_for(&self, key: &str) -> PathBuf {
        self.directory
            .join(format!("{:016x}.{EXTENSION}", xxh3_64(key.as_bytes())))
    }
}

impl LocalCache for FileCache {
    fn read(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let bytes = match fs::read(self.file_for(key)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let entry: Entry = serde_json::from_slice(&bytes)?;
        if entry.key != key {
            log::warn!("Cache file for {key:?} holds {:?}; treating as a miss", entry.key);
            return Ok(None);
        }
        Ok(Some(entry.value))
    }

    fn write(&self, key: &str, value: &Value) -> Result<(), CacheError> {
        let entry = Entry {
            key: key.to_string(),
            value: value.clone(),
        };
        let path = self.file_for(key);
        // write then rename so a crash never leaves a half-written entry behind
        let staging = path.with_extension("tmp");
        fs::write(&staging, serde_json::to_vec(&entry)?)?;
        fs::rename(&staging, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        match fs::remove_file(self.file_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn clear(&self) -> Result<(), CacheError> {
        for entry in fs::read_dir(&self.directory)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == EXTENSION) {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }
}
