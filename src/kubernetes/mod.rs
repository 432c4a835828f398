// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes utilities for pod lookup, port forwarding, and Tiller client creation.

pub mod client;
pub mod pods;
pub mod tunnel;

pub use client::{create_release_client, create_release_client_with, ReleaseClient};
pub use pods::find_first_ready_pod;
pub use tunnel::{KubeStreamer, PodStreamer, Tunnel};
