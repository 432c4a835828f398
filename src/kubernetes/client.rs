// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Tiller client creation over a port-forward tunnel

use crate::config::Config;
use crate::constants::tiller;
use crate::error::Result;
use crate::kubernetes::pods::find_first_ready_pod;
use crate::kubernetes::tunnel::{KubeStreamer, PodStreamer, Tunnel};
use kube::{Client, ResourceExt};
use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use tokio::net::TcpStream;
use tracing::{info, instrument};

/// Handle to the Tiller release server, reachable through the tunnel it owns.
#[derive(Debug)]
pub struct ReleaseClient {
    host: String,
    tunnel: Tunnel,
}

impl ReleaseClient {
    /// Host string the release server is reachable at, `:<local-port>`
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn local_port(&self) -> u16 {
        self.tunnel.local_port()
    }

    pub fn tunnel(&self) -> &Tunnel {
        &self.tunnel
    }

    /// Check that the local end of the tunnel accepts connections
    pub async fn ping(&self) -> Result<()> {
        TcpStream::connect((Ipv4Addr::LOCALHOST, self.local_port())).await?;
        Ok(())
    }

    /// Close the tunnel backing this client
    pub async fn close(self) {
        self.tunnel.close().await;
    }
}

/// Labels identifying the Tiller pod
pub fn tiller_labels() -> BTreeMap<String, String> {
    tiller::LABELS
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Create a Tiller client through a new port-forward tunnel
#[instrument(skip(client, config), fields(namespace = %config.tiller_namespace))]
pub async fn create_release_client(client: &Client, config: &Config) -> Result<ReleaseClient> {
    let streamer = KubeStreamer::new(client.clone(), &config.tiller_namespace);
    create_release_client_with(client, streamer, config).await
}

/// Create a Tiller client using the given stream source for the tunnel
pub async fn create_release_client_with<S: PodStreamer>(
    client: &Client,
    streamer: S,
    config: &Config,
) -> Result<ReleaseClient> {
    let pod = find_first_ready_pod(client, &config.tiller_namespace, &tiller_labels()).await?;
    let pod_name = pod.name_any();
    info!("tiller pod found: {}", pod_name);

    let tunnel = Tunnel::open(streamer, &pod_name, config.tiller_port).await?;
    info!("Created tunnel using local port: {}", tunnel.local_port());

    let host = format!(":{}", tunnel.local_port());
    info!("Creating tiller client using host: {:?}", host);

    Ok(ReleaseClient { host, tunnel })
}
