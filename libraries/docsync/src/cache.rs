//! Last-known copies of remote documents, kept on the device.
//!
//! The cache is synchronous on purpose: the cold-start path reads it before anything else happens,
//! and must not wait on the network or the runtime.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache entry is not valid json: {0}")]
    Json(#[from] serde_json::Error),
}

pub trait LocalCache: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<Value>, CacheError>;

    fn write(&self, key: &str, value: &Value) -> Result<(), CacheError>;

    fn remove(&self, key: &str) -> Result<(), CacheError>;

    fn clear(&self) -> Result<(), CacheError>;
}

/// Typed access on top of any [`LocalCache`]. Works for whole documents as well as simple scalars.
pub trait LocalCacheExt: LocalCache {
    fn read_typed<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        self.read(key)?
            .map(serde_json::from_value)
            .transpose()
            .map_err(CacheError::from)
    }

    fn write_typed<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        let value = serde_json::to_value(value)?;
        self.write(key, &value)
    }
}

impl<C: LocalCache + ?Sized> LocalCacheExt for C {}

#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LocalCache for MemoryCache {
    fn read(&self, key: &str) -> Result<Option<Value>, CacheError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn write(&self, key: &str, value: &Value) -> Result<(), CacheError> {
        self.entries.lock().insert(key.to_string(), value.clone());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.entries.lock().remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        self.entries.lock().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Config {
        name: String,
        version: u32,
    }

    #[test]
    fn test_typed_roundtrip_and_scalars() {
        let cache = MemoryCache::new();
        let config = Config {
            name: "host".to_string(),
            version: 3,
        };
        cache.write_typed("config", &config).unwrap();
        cache.write_typed("lastUserId", "u1").unwrap();

        assert_eq!(cache.read_typed::<Config>("config").unwrap(), Some(config));
        assert_eq!(
            cache.read_typed::<String>("lastUserId").unwrap().as_deref(),
            Some("u1")
        );
        assert_eq!(cache.read_typed::<Config>("missing").unwrap(), None);
    }

    #[test]
    fn test_wrong_shape_is_an_error() {
        let cache = MemoryCache::new();
        cache.write_typed("config", &42).unwrap();
        assert!(matches!(
            cache.read_typed::<Config>("config"),
            Err(CacheError::Json(_))
        ));
    }

    #[test]
    fn test_clear_and_remove() {
        let cache = MemoryCache::new();
        cache.write_typed("a", &1).unwrap();
        cache.write_typed("b", &2).unwrap();
        cache.remove("a").unwrap();
        assert_eq!(cache.len(), 1);
        cache.clear().unwrap();
        assert!(cache.is_empty());
    }
}
