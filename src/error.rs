// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HelmdeckError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("could not find a pod matching {selector} in namespace {namespace}")]
    PodNotFound { namespace: String, selector: String },

    #[error("could not find a ready pod matching {selector} in namespace {namespace}")]
    NoReadyPod { namespace: String, selector: String },

    #[error("Port forward failed: {0}")]
    TunnelError(String),

    #[error("no repo named {0:?} found")]
    RepositoryNotFound(String),

    #[error("Invalid repository name {0:?}: names must not contain path separators or '..'")]
    InvalidRepositoryName(String),

    #[error("The repository name you provided ({0}) already exists. Please specify a different name.")]
    DuplicateRepository(String),

    #[error("Looks like {url:?} is not a valid chart repository or cannot be reached: {reason}")]
    InvalidRepository { url: String, reason: String },

    #[error("Invalid chart index {path}: {reason}")]
    InvalidIndex { path: PathBuf, reason: String },

    #[error("Invalid helm home: {0}")]
    HomeLayout(String),

    #[error("cannot verify a directory: {0}")]
    CannotVerifyDirectory(PathBuf),

    #[error("path {0:?} not found")]
    PathNotFound(String),

    #[error("file {0:?} not found")]
    ChartNotFound(String),

    #[error("Chart verification failed: {0}")]
    VerificationFailed(String),

    #[error("Failed to fetch {url}: {reason}")]
    FetchError { url: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, HelmdeckError>;
