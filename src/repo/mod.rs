// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Local chart repository management: Helm home layout, repositories.yaml, cached indexes.

pub mod fetch;
pub mod file;
pub mod home;
pub mod index;
pub mod store;

pub use fetch::{Fetcher, HttpFetcher};
pub use file::{RepositoryEntry, RepositoryFile};
pub use home::HelmHome;
pub use index::{ChartSpec, ChartVersion, IndexFile, RepositoryChartList};
pub use store::{PartialLookup, RepositoryListSpec, RepositoryPhase, RepositorySpec, RepositoryStore};
