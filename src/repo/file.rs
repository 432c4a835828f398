// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The repositories.yaml index file and its on-disk discipline

use crate::error::{HelmdeckError, Result};
use crate::repo::home::cache_file_name;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

const API_VERSION: &str = "v1";

/// A named chart repository
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RepositoryEntry {
    pub name: String,
    pub url: String,
    /// File name of the cached chart index inside the cache directory
    #[serde(default)]
    pub cache: String,
}

impl RepositoryEntry {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            cache: cache_file_name(name),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryFile {
    #[serde(default)]
    pub api_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated: Option<String>,
    #[serde(default)]
    pub repositories: Vec<RepositoryEntry>,
}

impl Default for RepositoryFile {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            generated: None,
            repositories: Vec::new(),
        }
    }
}

impl RepositoryFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a repository file, converting the legacy `name: url` format.
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with_format(path).map(|(file, _)| file)
    }

    /// Load a repository file; the flag is true when it was in the legacy format.
    pub fn load_with_format(path: &Path) -> Result<(Self, bool)> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    fn parse(content: &str) -> Result<(Self, bool)> {
        match serde_yaml::from_str::<RepositoryFile>(content) {
            Ok(file) if !file.api_version.is_empty() => Ok((file, false)),
            current => {
                let Ok(legacy) = serde_yaml::from_str::<BTreeMap<String, String>>(content) else {
                    return current.map(|file| (file, false)).map_err(Into::into);
                };
                debug!("Converting legacy repository file with {} entries", legacy.len());
                let mut file = RepositoryFile::new();
                for (name, url) in legacy {
                    file.add(RepositoryEntry::new(&name, &url));
                }
                Ok((file, true))
            }
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&RepositoryEntry> {
        self.repositories.iter().find(|r| r.name == name)
    }

    /// Append an entry; callers check for duplicates first
    pub fn add(&mut self, entry: RepositoryEntry) {
        self.repositories.push(entry);
    }

    /// Remove the named entry, returning whether it was present
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.repositories.len();
        self.repositories.retain(|r| r.name != name);
        self.repositories.len() != before
    }

    /// Write the whole file atomically
    pub fn write(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        write_atomic(path, content.as_bytes())
    }
}

/// Exclusive advisory lock on the repository index, released on drop.
pub struct RepositoryLock {
    file: File,
}

impl RepositoryLock {
    pub fn acquire(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)?;
        file.lock_exclusive()?;
        Ok(Self { file })
    }
}

impl Drop for RepositoryLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// Replace `path` with `contents` via a temp file in the same directory and a rename.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let staged = stage_file(path, contents)?;
    staged.persist(path).map_err(|e| HelmdeckError::Io(e.error))?;
    Ok(())
}

/// Write `contents` to a temp file next to `path`; persisting it over `path` is left to the caller.
pub(crate) fn stage_file(path: &Path, contents: &[u8]) -> Result<NamedTempFile> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(0o644))?;
    }

    Ok(tmp)
}

/// Repository names become cache file names and the first segment of `repo/chart`.
pub fn validate_repository_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
        return Err(HelmdeckError::InvalidRepositoryName(name.to_string()));
    }
    Ok(())
}
