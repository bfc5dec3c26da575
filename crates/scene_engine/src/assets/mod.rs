//! Named asset cache and data file loading
//!
//! [`NamedCache`] deduplicates immutable content (sprite sheets, weapon
//! stats, level data) by name: the loader runs once per name and every later
//! request shares the cached `Arc`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::de::DeserializeOwned;
use thiserror::Error;

/// Asset loading errors
#[derive(Error, Debug)]
pub enum AssetError {
    /// The file could not be read
    #[error("Failed to read asset {path}: {source}")]
    Io {
        /// Requested file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The file contents could not be parsed
    #[error("Failed to parse asset {path}: {message}")]
    Parse {
        /// Requested file
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// No asset is registered under the name
    #[error("Asset not found: {0}")]
    NotFound(String),
}

/// Read a RON data file into `T`
pub fn load_ron<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, AssetError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    ron::from_str(&contents).map_err(|e| AssetError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Thread-safe cache of immutable assets keyed by name
pub struct NamedCache<T> {
    entries: RwLock<HashMap<String, Arc<T>>>,
}

impl<T> NamedCache<T> {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<T>>> {
        self.entries.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<T>>> {
        self.entries.write().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Cached asset, or the result of `loader` stored under `name`
    ///
    /// The loader runs without the cache lock held. A failed load caches
    /// nothing.
    pub fn get_or_load<E, F>(&self, name: &str, loader: F) -> Result<Arc<T>, E>
    where
        F: FnOnce(&str) -> Result<T, E>,
    {
        if let Some(cached) = self.get(name) {
            return Ok(cached);
        }

        let loaded = Arc::new(loader(name)?);
        let mut entries = self.write();
        let stored = entries
            .entry(name.to_string())
            .or_insert_with(|| Arc::clone(&loaded));
        log::debug!("Cached asset \"{}\"", name);
        Ok(Arc::clone(stored))
    }

    /// Cached asset, if present
    pub fn get(&self, name: &str) -> Option<Arc<T>> {
        self.read().get(name).map(Arc::clone)
    }

    /// Cached asset or [`AssetError::NotFound`]
    pub fn require(&self, name: &str) -> Result<Arc<T>, AssetError> {
        self.get(name).ok_or_else(|| AssetError::NotFound(name.to_string()))
    }

    /// Store an asset, replacing any previous one of the same name
    pub fn insert(&self, name: impl Into<String>, asset: T) -> Arc<T> {
        let asset = Arc::new(asset);
        self.write().insert(name.into(), Arc::clone(&asset));
        asset
    }

    /// Whether an asset is cached under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    /// Drop one cached asset; holders keep their `Arc`
    pub fn invalidate(&self, name: &str) -> bool {
        self.write().remove(name).is_some()
    }

    /// Drop every cached asset
    pub fn clear(&self) {
        self.write().clear();
    }

    /// Number of cached assets
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Cached names, in no particular order
    pub fn names(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }
}

impl<T> Default for NamedCache<T> {
    fn default() -> Self {
        Self::new()
    }
}
