use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Serialize};

use crate::{
    errors::Error,
    option::{Absent, OptionValue, Present},
    Result,
};

/// Record holding the bound group's id.
pub const GROUP_KEY: &str = "server.json";
/// Record holding the bound target channel's id.
pub const CHANNEL_KEY: &str = "main-channel.json";

/// Directory-backed key/value cache. One JSON file per key.
///
/// Writes are plain overwrites, not atomic renames: losing a record to a crash only
/// means the one-time setup has to be repeated.
#[derive(Clone, Debug)]
pub struct PersistentStore {
    root: PathBuf,
}

impl PersistentStore {
    /// Open the store, creating `root` if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| Error::StoreInit {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let path = self.path_for(key)?;
        let txt = serde_json::to_string(value)?;
        fs::write(path, txt)?;
        Ok(())
    }

    /// Malformed records surface as [`Error::StoreCorruption`]; they are never read as absent.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<OptionValue<T>> {
        let path = self.path_for(key)?;
        let txt = match fs::read_to_string(&path) {
            Ok(txt) => txt,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Absent),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&txt)
            .map(Present)
            .map_err(|source| Error::StoreCorruption {
                key: key.to_string(),
                source,
            })
    }

    /// Returns whether a record was actually removed.
    pub fn purge(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key)?;
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let invalid = |reason: &str| Error::InvalidPath {
            path: PathBuf::from(key),
            reason: reason.to_string(),
        };
        if key.is_empty() || key == "." || key == ".." {
            return Err(invalid("empty or relative key"));
        }
        if key.contains(['/', '\\', '\0']) {
            return Err(invalid("key must be a plain file name"));
        }
        Ok(self.root.join(key))
    }
}
