// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Chart archive download from configured repositories

use crate::chart::verify::{provenance_path, ProvenanceVerifier};
use crate::error::{HelmdeckError, Result};
use crate::repo::fetch::{resolve_chart_url, Fetcher};
use crate::repo::file::{write_atomic, RepositoryFile};
use crate::repo::home::HelmHome;
use crate::repo::index::{ChartVersion, IndexFile};
use semver::{Version, VersionReq};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};
use url::Url;

/// When a downloaded chart is checked against its provenance file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerificationStrategy {
    #[default]
    Never,
    Always,
}

pub struct ChartDownloader<F, V> {
    home: HelmHome,
    fetcher: F,
    verifier: V,
}

impl<F: Fetcher, V: ProvenanceVerifier> ChartDownloader<F, V> {
    pub fn new(home: HelmHome, fetcher: F, verifier: V) -> Self {
        Self {
            home,
            fetcher,
            verifier,
        }
    }

    pub fn home(&self) -> &HelmHome {
        &self.home
    }

    pub fn verifier(&self) -> &V {
        &self.verifier
    }

    /// Download `reference` (`repo/chart` or a chart URL) into `dest`.
    ///
    /// An empty `version` selects the newest version; otherwise it is a
    /// semver requirement, or an exact version string.
    #[instrument(skip(self, dest, keyring))]
    pub async fn download_to(
        &self,
        reference: &str,
        version: &str,
        dest: &Path,
        verify: VerificationStrategy,
        keyring: &Path,
    ) -> Result<PathBuf> {
        let url = self.resolve_chart_url(reference, version)?;
        let file_name = url
            .path_segments()
            .and_then(|segments| segments.last())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| HelmdeckError::FetchError {
                url: url.to_string(),
                reason: "URL does not name a file".to_string(),
            })?
            .to_string();

        let data = self.fetcher.fetch(&url).await?;
        let target = dest.join(&file_name);
        write_atomic(&target, &data)?;
        debug!("Downloaded {} to {}", url, target.display());

        if verify == VerificationStrategy::Always {
            let prov_url = Url::parse(&format!("{}.prov", url)).map_err(|e| {
                HelmdeckError::FetchError {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            })?;
            let prov = self.fetcher.fetch(&prov_url).await?;
            write_atomic(&provenance_path(&target), &prov)?;

            let verification = self.verifier.verify(&target, keyring)?;
            info!("Verified {} (sha256:{})", verification.file_name, verification.sha256);
        }

        Ok(target)
    }

    /// Find the archive URL for a chart reference using the cached indexes
    fn resolve_chart_url(&self, reference: &str, version: &str) -> Result<Url> {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            return Url::parse(reference).map_err(|e| HelmdeckError::FetchError {
                url: reference.to_string(),
                reason: e.to_string(),
            });
        }

        let Some((repo_name, chart_name)) = reference.split_once('/') else {
            return Err(HelmdeckError::ChartNotFound(reference.to_string()));
        };

        let file = RepositoryFile::load(&self.home.repository_file())?;
        let entry = file
            .get(repo_name)
            .ok_or_else(|| HelmdeckError::RepositoryNotFound(repo_name.to_string()))?;
        let index = IndexFile::load(&self.home.cache_index(repo_name))?;

        let chart = select_version(index.chart_versions(chart_name), version).ok_or_else(|| {
            HelmdeckError::ChartNotFound(format!("{} {}", reference, version).trim().to_string())
        })?;
        let chart_url = chart
            .urls
            .first()
            .ok_or_else(|| HelmdeckError::ChartNotFound(reference.to_string()))?;

        resolve_chart_url(&entry.url, chart_url)
    }
}

/// Pick the version to download from the versions of one chart
fn select_version<'a>(versions: Vec<&'a ChartVersion>, constraint: &str) -> Option<&'a ChartVersion> {
    if constraint.is_empty() {
        return versions
            .iter()
            .copied()
            .filter_map(|c| Version::parse(&c.version).ok().map(|v| (v, c)))
            .max_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(_, c)| c)
            .or_else(|| versions.first().copied());
    }

    if let Some(exact) = versions.iter().copied().find(|c| c.version == constraint) {
        return Some(exact);
    }

    let requirement = VersionReq::parse(constraint).ok()?;
    versions
        .into_iter()
        .filter_map(|c| Version::parse(&c.version).ok().map(|v| (v, c)))
        .filter(|(v, _)| requirement.matches(v))
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, c)| c)
}
