//! File operations

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tokio::fs;

use crate::errors::DeployError;

/// A file wrapper with path
#[derive(Debug, Clone)]
pub struct File {
    path: PathBuf,
}

impl File {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True only for an existing regular file (directories don't count)
    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }

    pub async fn read_string(&self) -> Result<String, DeployError> {
        Ok(fs::read_to_string(&self.path).await?)
    }

    /// Read file as JSON
    pub async fn read_json<T: DeserializeOwned>(&self) -> Result<T, DeployError> {
        let contents = self.read_string().await?;
        let value = serde_json::from_str(&contents)?;
        Ok(value)
    }

    /// Read file as JSON, or `T::default()` when the file is absent
    pub async fn read_json_or_default<T: DeserializeOwned + Default>(
        &self,
    ) -> Result<T, DeployError> {
        if fs::try_exists(&self.path).await? {
            self.read_json().await
        } else {
            Ok(T::default())
        }
    }
}
