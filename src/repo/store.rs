// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Chart repository management on top of the Helm home

use crate::constants::stable;
use crate::error::{HelmdeckError, Result};
use crate::repo::fetch::{index_url, Fetcher};
use crate::repo::file::{
    stage_file, validate_repository_name, RepositoryEntry, RepositoryFile, RepositoryLock,
};
use crate::repo::home::HelmHome;
use crate::repo::index::{IndexFile, RepositoryChartList};
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryPhase {
    Available,
}

/// View of a configured repository
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RepositorySpec {
    #[serde(rename = "name")]
    pub repo_name: String,
    #[serde(rename = "url")]
    pub repo_url: String,
    pub phase: RepositoryPhase,
}

impl RepositorySpec {
    fn available(name: &str, url: &str) -> Self {
        Self {
            repo_name: name.to_string(),
            repo_url: url.to_string(),
            phase: RepositoryPhase::Available,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryListSpec {
    pub repositories: Vec<RepositorySpec>,
    pub total_items: usize,
}

/// A lookup that failed to read the index; `view` holds what is known.
#[derive(Error, Debug)]
#[error("failed to read the repository file while looking up {:?}", .view.repo_name)]
pub struct PartialLookup {
    pub view: RepositorySpec,
    #[source]
    pub source: HelmdeckError,
}

/// Manages repositories.yaml and the cached chart indexes of a Helm home.
pub struct RepositoryStore<F> {
    home: HelmHome,
    fetcher: F,
}

impl<F: Fetcher> RepositoryStore<F> {
    pub fn new(home: HelmHome, fetcher: F) -> Self {
        Self { home, fetcher }
    }

    pub fn home(&self) -> &HelmHome {
        &self.home
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Create the home layout if missing and seed a fresh repository file.
    ///
    /// Failing to download the seeded repository's index is only logged.
    #[instrument(skip(self), fields(home = %self.home.root().display()))]
    pub async fn ensure_home(&self) -> Result<()> {
        for dir in self.home.directories() {
            match fs::metadata(&dir) {
                Ok(meta) if meta.is_dir() => {}
                Ok(_) => {
                    return Err(HelmdeckError::HomeLayout(format!(
                        "{} must be a directory",
                        dir.display()
                    )))
                }
                Err(_) => {
                    info!("Creating {}", dir.display());
                    fs::create_dir_all(&dir).map_err(|e| {
                        HelmdeckError::HomeLayout(format!(
                            "Could not create {}: {}",
                            dir.display(),
                            e
                        ))
                    })?;
                }
            }
        }

        let repo_file = self.home.repository_file();
        match fs::metadata(&repo_file) {
            Ok(meta) if meta.is_dir() => {
                return Err(HelmdeckError::HomeLayout(format!(
                    "{} must be a file, not a directory",
                    repo_file.display()
                )));
            }
            Ok(_) => {
                let _lock = RepositoryLock::acquire(&self.home.repository_lock())?;
                if let Ok((file, true)) = RepositoryFile::load_with_format(&repo_file) {
                    info!("Updating repository file format...");
                    file.write(&repo_file)?;
                }
            }
            Err(_) => {
                info!("Creating {}", repo_file.display());
                let entry = RepositoryEntry::new(stable::NAME, stable::URL);
                {
                    let _lock = RepositoryLock::acquire(&self.home.repository_lock())?;
                    let mut file = RepositoryFile::new();
                    file.add(entry.clone());
                    file.write(&repo_file)?;
                }
                if let Err(e) = self.download_index(&entry.name, &entry.url).await {
                    warn!(
                        "Failed to download {}: {} (run a repository update)",
                        entry.name, e
                    );
                }
            }
        }

        debug!("Helm home is configured at {}", self.home.root().display());
        Ok(())
    }

    /// Add a repository after downloading and validating its index
    #[instrument(skip(self))]
    pub async fn add(&self, name: &str, url: &str) -> Result<()> {
        validate_repository_name(name)?;
        self.ensure_home().await?;
        info!("Adding repo named: {:?} with url: {:?}", name, url);

        if RepositoryFile::load(&self.home.repository_file())?.has(name) {
            return Err(HelmdeckError::DuplicateRepository(name.to_string()));
        }

        let staged = self
            .fetch_index(name, url)
            .await
            .map_err(|e| match e {
                HelmdeckError::InvalidRepository { .. } => e,
                other => HelmdeckError::InvalidRepository {
                    url: url.to_string(),
                    reason: other.to_string(),
                },
            })?;

        self.update_file(|file| {
            // Another writer may have added the name while we were downloading;
            // the staged index is dropped and the winner's cache stays in place.
            if file.has(name) {
                return Err(HelmdeckError::DuplicateRepository(name.to_string()));
            }
            self.store_index(name, staged)?;
            file.add(RepositoryEntry::new(name, url));
            Ok(())
        })
    }

    /// Remove a repository and its cached index
    #[instrument(skip(self))]
    pub fn remove(&self, name: &str) -> Result<()> {
        validate_repository_name(name)?;
        self.update_file(|file| {
            if file.remove(name) {
                Ok(())
            } else {
                Err(HelmdeckError::RepositoryNotFound(name.to_string()))
            }
        })?;

        remove_if_exists(&self.home.cache_index(name))?;
        info!("{:?} has been removed from your repositories", name);
        Ok(())
    }

    /// Look up a repository; unknown names yield an empty URL
    pub async fn get(&self, name: &str) -> std::result::Result<RepositorySpec, PartialLookup> {
        if let Err(e) = self.ensure_home().await {
            warn!("Failed to prepare helm home: {}", e);
        }
        let mut view = RepositorySpec::available(name, "");
        match RepositoryFile::load(&self.home.repository_file()) {
            Ok(file) => {
                if let Some(entry) = file.get(name) {
                    view.repo_url = entry.url.clone();
                }
                Ok(view)
            }
            Err(source) => Err(PartialLookup { view, source }),
        }
    }

    /// All configured repositories; an unreadable index yields an empty list
    pub async fn list(&self) -> RepositoryListSpec {
        if let Err(e) = self.ensure_home().await {
            warn!("Failed to prepare helm home: {}", e);
        }
        let file = match RepositoryFile::load(&self.home.repository_file()) {
            Ok(file) => file,
            Err(e) => {
                warn!("Failed to load repository file: {}", e);
                return RepositoryListSpec::default();
            }
        };

        let repositories: Vec<_> = file
            .repositories
            .iter()
            .map(|r| RepositorySpec::available(&r.name, &r.url))
            .collect();

        RepositoryListSpec {
            total_items: repositories.len(),
            repositories,
        }
    }

    /// Charts listed in a repository's cached index
    pub fn list_charts(&self, name: &str) -> Result<RepositoryChartList> {
        let index = IndexFile::load(&self.home.cache_index(name))?;
        Ok(RepositoryChartList::from(&index))
    }

    /// Re-download the cached index of a configured repository
    #[instrument(skip(self))]
    pub async fn update(&self, name: &str) -> Result<()> {
        validate_repository_name(name)?;
        let file = RepositoryFile::load(&self.home.repository_file())?;
        let entry = file
            .get(name)
            .ok_or_else(|| HelmdeckError::RepositoryNotFound(name.to_string()))?;

        self.download_index(&entry.name, &entry.url).await?;
        info!("Successfully got an update from the {:?} chart repository", name);
        Ok(())
    }

    /// Fetch `<url>/index.yaml`, validate it and store it as the repository's cache
    async fn download_index(&self, name: &str, url: &str) -> Result<()> {
        let staged = self.fetch_index(name, url).await?;
        self.store_index(name, staged)
    }

    /// Fetch and validate an index into a temp file beside the repository's cache
    async fn fetch_index(&self, name: &str, url: &str) -> Result<NamedTempFile> {
        let index_url = index_url(url)?;
        let content = self.fetcher.fetch(&index_url).await?;

        IndexFile::from_slice(&content).map_err(|reason| HelmdeckError::InvalidRepository {
            url: url.to_string(),
            reason,
        })?;

        stage_file(&self.home.cache_index(name), &content)
    }

    fn store_index(&self, name: &str, staged: NamedTempFile) -> Result<()> {
        let cache = self.home.cache_index(name);
        staged
            .persist(&cache)
            .map_err(|e| HelmdeckError::Io(e.error))?;
        debug!("Stored index of {} at {}", name, cache.display());
        Ok(())
    }

    /// Read-modify-write of repositories.yaml under the advisory lock
    fn update_file<T>(&self, mutate: impl FnOnce(&mut RepositoryFile) -> Result<T>) -> Result<T> {
        let _lock = RepositoryLock::acquire(&self.home.repository_lock())?;
        let path = self.home.repository_file();
        let mut file = RepositoryFile::load(&path)?;
        let result = mutate(&mut file)?;
        file.write(&path)?;
        Ok(result)
    }
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No cached index at {}", path.display());
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
