//! Storage layout configuration

use std::path::PathBuf;

use crate::filesys::file::File;

/// On-disk locations used by the runner
#[derive(Debug, Clone)]
pub struct StorageLayout {
    pub base_dir: PathBuf,
}

impl StorageLayout {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn settings_file(&self) -> File {
        File::new(self.base_dir.join("settings.json"))
    }
}

impl Default for StorageLayout {
    fn default() -> Self {
        #[cfg(target_os = "linux")]
        let base_dir = PathBuf::from("/etc/deployd");

        #[cfg(not(target_os = "linux"))]
        let base_dir = std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".deployd");

        Self::new(base_dir)
    }
}
