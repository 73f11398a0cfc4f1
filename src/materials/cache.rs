use crate::error::MaterialsError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const CACHE_FILE: &str = ".conversion_cache.json";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CacheEntry {
    pub hash: String,
    pub converted: PathBuf,
}

/// Source path -> hash of the bytes that produced `converted`
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ConversionCache {
    #[serde(default)]
    entries: BTreeMap<String, CacheEntry>,
}

pub fn file_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

impl ConversionCache {
    /// Load the cache index; an unreadable index starts a fresh cache
    pub fn load(dir: &Path) -> Self {
        let path = dir.join(CACHE_FILE);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(_) => return Self::default(),
        };
        match serde_json::from_str(&text) {
            Ok(cache) => cache,
            Err(e) => {
                warn!("Ignoring corrupt conversion cache {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self, dir: &Path) -> Result<(), MaterialsError> {
        fs::create_dir_all(dir)?;
        let json = serde_json::to_string_pretty(self)?;
        fs::write(dir.join(CACHE_FILE), json)?;
        Ok(())
    }

    /// Previously converted text for an unchanged source
    pub fn lookup(&self, key: &str, hash: &str) -> Option<String> {
        let entry = self.entries.get(key)?;
        if entry.hash != hash {
            debug!("Cache stale for {}", key);
            return None;
        }
        fs::read_to_string(&entry.converted).ok()
    }

    pub fn record(&mut self, key: &str, hash: String, converted: PathBuf) {
        self.entries
            .insert(key.to_string(), CacheEntry { hash, converted });
    }
}
