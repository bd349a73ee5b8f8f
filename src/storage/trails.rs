//! Trail map persistence.

use std::{fs, io};

use crate::model::TrailMap;

use super::{Result, Storage};

impl Storage {
    /// Loads the trail map. A missing file is an empty map.
    pub fn load_trails(&self) -> Result<TrailMap> {
        match fs::read_to_string(self.trails_path()) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(TrailMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Atomically replaces the trail map.
    pub fn save_trails(&self, trails: &TrailMap) -> Result<()> {
        let json = serde_json::to_string_pretty(trails)?;
        Self::atomic_write(&self.trails_path(), json.as_bytes())?;
        Ok(())
    }
}
