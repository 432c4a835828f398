// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Resolution of a chart reference to a local archive path

use crate::chart::download::{ChartDownloader, VerificationStrategy};
use crate::chart::verify::ProvenanceVerifier;
use crate::error::{HelmdeckError, Result};
use crate::repo::fetch::Fetcher;
use crate::repo::home::HelmHome;
use std::fs;
use std::path::{self, Path, PathBuf};
use tracing::{debug, info, instrument};

/// Resolves chart references: local paths, charts in the local repository,
/// and finally charts downloaded from a configured repository.
pub struct ChartLocator<F, V> {
    downloader: ChartDownloader<F, V>,
    destination: PathBuf,
}

impl<F: Fetcher, V: ProvenanceVerifier> ChartLocator<F, V> {
    /// Downloads land in the current directory unless configured otherwise
    pub fn new(home: HelmHome, fetcher: F, verifier: V) -> Self {
        Self {
            downloader: ChartDownloader::new(home, fetcher, verifier),
            destination: PathBuf::from("."),
        }
    }

    pub fn with_destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.destination = destination.into();
        self
    }

    #[instrument(skip(self, keyring))]
    pub async fn locate(
        &self,
        name: &str,
        version: &str,
        verify: bool,
        keyring: &Path,
    ) -> Result<PathBuf> {
        let name = name.trim();
        let version = version.trim();

        if let Ok(meta) = fs::metadata(name) {
            let abs = path::absolute(name)?;
            if verify {
                if meta.is_dir() {
                    return Err(HelmdeckError::CannotVerifyDirectory(abs));
                }
                self.downloader.verifier().verify(&abs, keyring)?;
            }
            return Ok(abs);
        }

        if Path::new(name).is_absolute() || name.starts_with('.') {
            return Err(HelmdeckError::PathNotFound(name.to_string()));
        }

        let local = self.downloader.home().repository().join(name);
        if local.exists() {
            return Ok(path::absolute(local)?);
        }

        let strategy = if verify {
            VerificationStrategy::Always
        } else {
            VerificationStrategy::Never
        };
        match self
            .downloader
            .download_to(name, version, &self.destination, strategy, keyring)
            .await
        {
            Ok(file) => {
                let abs = path::absolute(&file)?;
                info!("Fetched {} to {}", name, file.display());
                Ok(abs)
            }
            Err(e) => {
                debug!("Failed to download {}: {}", name, e);
                Err(HelmdeckError::ChartNotFound(name.to_string()))
            }
        }
    }
}
