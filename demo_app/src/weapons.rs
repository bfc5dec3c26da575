//! Weapon stats loaded from RON data files

use std::path::{Path, PathBuf};
use std::sync::Arc;

use scene_engine::assets::{self, AssetError, NamedCache};
use scene_engine::core::AssetConfig;
use serde::Deserialize;

/// Immutable stats shared by every weapon of one kind
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WeaponStats {
    pub name: String,
    pub damage: u32,
    /// Shots per second
    pub fire_rate: f32,
    pub bullet_speed: f32,
    /// Bullet lifetime in seconds
    pub bullet_ttl: f32,
}

/// Loads weapon stats by name, once per name
pub struct WeaponLibrary {
    dir: PathBuf,
    cache: NamedCache<WeaponStats>,
}

impl WeaponLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: NamedCache::new(),
        }
    }

    /// Library reading `<data_dir>/weapons`, falling back to the bundled data
    pub fn from_config(config: &AssetConfig) -> Self {
        let configured = Path::new(&config.data_dir).join("weapons");
        if configured.is_dir() {
            Self::new(configured)
        } else {
            log::debug!("{} not found, using bundled weapon data", configured.display());
            Self::new(Path::new(env!("CARGO_MANIFEST_DIR")).join("data").join("weapons"))
        }
    }

    pub fn get(&self, name: &str) -> Result<Arc<WeaponStats>, AssetError> {
        self.cache.get_or_load(name, |name| {
            let path = self.dir.join(format!("{name}.ron"));
            log::info!("Loading weapon stats from {}", path.display());
            assets::load_ron(path)
        })
    }

    pub fn loaded(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundled() -> WeaponLibrary {
        WeaponLibrary::new(Path::new(env!("CARGO_MANIFEST_DIR")).join("data").join("weapons"))
    }

    #[test]
    fn test_bundled_weapons_load_once() {
        let library = bundled();
        let first = library.get("blaster").unwrap();
        let second = library.get("blaster").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.name, "Blaster");
        assert_eq!(library.loaded(), 1);

        library.get("scatter").unwrap();
        assert_eq!(library.loaded(), 2);
    }

    #[test]
    fn test_unknown_weapon_is_an_error() {
        let library = bundled();
        assert!(matches!(library.get("railgun"), Err(AssetError::Io { .. })));
        assert_eq!(library.loaded(), 0);
    }
}
