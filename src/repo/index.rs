// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Chart repository index files (`index.yaml`) and their display projection

use crate::constants::display;
use crate::error::{HelmdeckError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// One version of a chart as listed in a repository index
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChartVersion {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct IndexFile {
    #[serde(default)]
    pub api_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated: Option<String>,
    /// Chart name to its versions; null versions are tolerated and skipped
    #[serde(default)]
    pub entries: BTreeMap<String, Vec<Option<ChartVersion>>>,
}

impl IndexFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read(path)?;
        Self::from_slice(&content).map_err(|reason| HelmdeckError::InvalidIndex {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Parse and validate index bytes; an index must declare its apiVersion
    pub fn from_slice(content: &[u8]) -> std::result::Result<Self, String> {
        let index: IndexFile = serde_yaml::from_slice(content).map_err(|e| e.to_string())?;
        if index.api_version.is_empty() {
            return Err("no API version specified".to_string());
        }
        Ok(index)
    }

    /// All non-null chart versions, in chart name order
    pub fn versions(&self) -> impl Iterator<Item = &ChartVersion> {
        self.entries.values().flatten().flatten()
    }

    /// Non-null versions of one chart
    pub fn chart_versions(&self, name: &str) -> Vec<&ChartVersion> {
        self.entries
            .get(name)
            .map(|versions| versions.iter().flatten().collect())
            .unwrap_or_default()
    }
}

/// Display view of a chart version
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ChartSpec {
    pub name: String,
    pub version: String,
    #[serde(rename = "fullURL")]
    pub full_url: String,
    pub description: String,
    pub icon: String,
}

impl From<&ChartVersion> for ChartSpec {
    fn from(chart: &ChartVersion) -> Self {
        let icon = match chart.icon.as_deref() {
            Some(icon) if !icon.is_empty() => icon.to_string(),
            _ => display::DEFAULT_ICON.to_string(),
        };

        ChartSpec {
            name: chart.name.clone(),
            version: chart.version.clone(),
            full_url: chart.urls.first().cloned().unwrap_or_default(),
            description: truncate_description(chart.description.as_deref().unwrap_or_default()),
            icon,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct RepositoryChartList {
    pub charts: Vec<ChartSpec>,
}

impl From<&IndexFile> for RepositoryChartList {
    fn from(index: &IndexFile) -> Self {
        RepositoryChartList {
            charts: index.versions().map(ChartSpec::from).collect(),
        }
    }
}

fn truncate_description(description: &str) -> String {
    if description.chars().count() <= display::MAX_DESCRIPTION_CHARS {
        return description.to_string();
    }
    let mut short: String = description
        .chars()
        .take(display::TRUNCATED_DESCRIPTION_CHARS)
        .collect();
    short.push_str("...");
    short
}
