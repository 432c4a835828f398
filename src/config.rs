// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::{home, tiller};
use std::env;
use std::path::PathBuf;

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the local Helm home (repository index, caches)
    pub helm_home: PathBuf,
    /// Namespace the Tiller pod runs in
    pub tiller_namespace: String,
    pub tiller_port: u16,
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let helm_home = env::var("HELM_HOME")
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(home::DEFAULT_PATH));
        let tiller_namespace = env::var("TILLER_NAMESPACE")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| tiller::NAMESPACE.to_string());

        Config {
            helm_home,
            tiller_namespace,
            tiller_port: tiller::PORT,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            helm_home: PathBuf::from(home::DEFAULT_PATH),
            tiller_namespace: tiller::NAMESPACE.to_string(),
            tiller_port: tiller::PORT,
        }
    }
}
