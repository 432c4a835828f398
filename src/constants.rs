// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Tiller (Helm v2 release server) location in the cluster
pub mod tiller {
    /// Namespace Tiller is installed in unless configured otherwise
    pub const NAMESPACE: &str = "kube-system";
    /// gRPC port Tiller listens on inside its pod
    pub const PORT: u16 = 44134;
    /// Labels identifying the Tiller pod
    pub const LABELS: [(&str, &str); 2] = [("app", "helm"), ("name", "tiller")];
}

/// Helm home defaults
pub mod home {
    /// Home directory used when HELM_HOME is not set
    pub const DEFAULT_PATH: &str = "/.helm";
    pub const REPOSITORY_DIR: &str = "repository";
    pub const CACHE_DIR: &str = "cache";
    pub const LOCAL_REPOSITORY_DIR: &str = "local";
    pub const REPOSITORIES_FILE: &str = "repositories.yaml";
    pub const REPOSITORIES_LOCK: &str = "repositories.lock";
}

/// Repository seeded into a fresh home
pub mod stable {
    pub const NAME: &str = "kubernetes-charts";
    pub const URL: &str = "http://storage.googleapis.com/kubernetes-charts";
}

/// Chart list display defaults
pub mod display {
    /// Icon shown for charts that do not declare one
    pub const DEFAULT_ICON: &str = "https://deis.com/assets/images/svg/helm-logo.svg";
    /// Descriptions longer than this are truncated
    pub const MAX_DESCRIPTION_CHARS: usize = 45;
    /// Characters kept before the ellipsis when truncating
    pub const TRUNCATED_DESCRIPTION_CHARS: usize = 41;
}
