use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use crate::world::World;

/// Writes a JSON snapshot of the world every `interval` simulated days.
pub struct SnapshotWriter {
    output_dir: PathBuf,
    interval: u64,
}

impl SnapshotWriter {
    pub fn new(output_dir: impl AsRef<Path>, interval: u64) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            interval,
        }
    }

    pub fn maybe_write(&self, world: &World, scenario_name: &str) -> Result<Option<PathBuf>> {
        let day = world.day();
        if self.interval == 0 || day % self.interval != 0 {
            return Ok(None);
        }

        let dir = self.output_dir.join(scenario_name);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create snapshot directory {}", dir.display()))?;
        let file_path = dir.join(format!("day_{day:06}.json"));
        let json = serde_json::to_string_pretty(&world.snapshot(scenario_name))
            .context("Failed to serialise snapshot")?;
        fs::write(&file_path, json)
            .with_context(|| format!("Failed to write {}", file_path.display()))?;
        Ok(Some(file_path))
    }
}
