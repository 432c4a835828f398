// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Helm home directory layout

use crate::constants::home;
use std::path::{Path, PathBuf};

/// Paths inside a Helm home directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelmHome {
    root: PathBuf,
}

impl HelmHome {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Chart repository directory
    pub fn repository(&self) -> PathBuf {
        self.root.join(home::REPOSITORY_DIR)
    }

    /// The repository index file listing known chart repositories
    pub fn repository_file(&self) -> PathBuf {
        self.repository().join(home::REPOSITORIES_FILE)
    }

    /// Lock file guarding read-modify-write of the repository index
    pub fn repository_lock(&self) -> PathBuf {
        self.repository().join(home::REPOSITORIES_LOCK)
    }

    /// Directory holding cached per-repository chart indexes
    pub fn cache(&self) -> PathBuf {
        self.repository().join(home::CACHE_DIR)
    }

    /// Cached chart index of the named repository
    pub fn cache_index(&self, name: &str) -> PathBuf {
        self.cache().join(cache_file_name(name))
    }

    pub fn local_repository(&self) -> PathBuf {
        self.repository().join(home::LOCAL_REPOSITORY_DIR)
    }

    /// Directories that must exist for the home to be usable, parents first
    pub fn directories(&self) -> [PathBuf; 4] {
        [
            self.root.clone(),
            self.repository(),
            self.cache(),
            self.local_repository(),
        ]
    }
}

/// File name of a repository's cached chart index
pub fn cache_file_name(name: &str) -> String {
    format!("{}-index.yaml", name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let home = HelmHome::new("/.helm");

        assert_eq!(home.root(), Path::new("/.helm"));
        assert_eq!(home.repository(), PathBuf::from("/.helm/repository"));
        assert_eq!(
            home.repository_file(),
            PathBuf::from("/.helm/repository/repositories.yaml")
        );
        assert_eq!(home.cache(), PathBuf::from("/.helm/repository/cache"));
        assert_eq!(
            home.cache_index("stable"),
            PathBuf::from("/.helm/repository/cache/stable-index.yaml")
        );
        assert_eq!(
            home.local_repository(),
            PathBuf::from("/.helm/repository/local")
        );
    }

    #[test]
    fn test_directories_parents_first() {
        let home = HelmHome::new("/tmp/h");
        let dirs = home.directories();

        assert_eq!(dirs[0], PathBuf::from("/tmp/h"));
        assert_eq!(dirs[1], home.repository());
        assert!(dirs[2].starts_with(&dirs[1]));
        assert!(dirs[3].starts_with(&dirs[1]));
    }
}
