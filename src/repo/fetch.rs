// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Remote fetching of repository indexes and chart files

use crate::error::{HelmdeckError, Result};
use bytes::Bytes;
use std::future::Future;
use tracing::debug;
use url::Url;

/// Source of remote files.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<Bytes>> + Send;
}

/// Fetches over HTTP(S).
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<Bytes> {
        debug!("Fetching {}", url);
        let fetch_error = |e: reqwest::Error| HelmdeckError::FetchError {
            url: url.to_string(),
            reason: e.to_string(),
        };

        self.client
            .get(url.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(fetch_error)?
            .bytes()
            .await
            .map_err(fetch_error)
    }
}

/// Location of a repository's `index.yaml`
pub fn index_url(repo_url: &str) -> Result<Url> {
    let base = format!("{}/index.yaml", repo_url.trim_end_matches('/'));
    Url::parse(&base).map_err(|e| HelmdeckError::InvalidRepository {
        url: repo_url.to_string(),
        reason: e.to_string(),
    })
}

/// Resolve a chart URL from an index against the repository URL it came from
pub fn resolve_chart_url(repo_url: &str, chart_url: &str) -> Result<Url> {
    if let Ok(absolute) = Url::parse(chart_url) {
        return Ok(absolute);
    }
    let base = format!("{}/", repo_url.trim_end_matches('/'));
    Url::parse(&base)
        .and_then(|base| base.join(chart_url))
        .map_err(|e| HelmdeckError::FetchError {
            url: chart_url.to_string(),
            reason: e.to_string(),
        })
}
