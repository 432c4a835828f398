// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Local TCP tunnels to a port inside a pod

use crate::error::{HelmdeckError, Result};
use k8s_openapi::api::core::v1::Pod;
use kube::{Api, Client};
use std::future::Future;
use std::net::Ipv4Addr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

const ACCEPT_BACKOFF_MIN: Duration = Duration::from_millis(10);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// A bidirectional byte stream to a pod port.
pub trait Duplex: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Duplex for T {}

/// Source of streams to a port inside a pod.
pub trait PodStreamer: Clone + Send + Sync + 'static {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    fn connect(&self, pod: &str, port: u16) -> impl Future<Output = Result<Self::Stream>> + Send;
}

/// Streams through the Kubernetes port-forward subresource.
#[derive(Clone)]
pub struct KubeStreamer {
    pods: Api<Pod>,
}

impl KubeStreamer {
    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            pods: Api::namespaced(client, namespace),
        }
    }
}

impl PodStreamer for KubeStreamer {
    type Stream = Box<dyn Duplex>;

    async fn connect(&self, pod: &str, port: u16) -> Result<Self::Stream> {
        let mut forwarder = self.pods.portforward(pod, &[port]).await?;
        let stream = forwarder.take_stream(port).ok_or_else(|| {
            HelmdeckError::TunnelError(format!("no stream for port {} on pod {}", port, pod))
        })?;

        let pod = pod.to_string();
        tokio::spawn(async move {
            if let Err(e) = forwarder.join().await {
                debug!("Port forward to {}:{} ended with error: {}", pod, port, e);
            }
        });

        Ok(Box::new(stream))
    }
}

/// A listener on 127.0.0.1 whose connections are forwarded to a pod port.
///
/// The tunnel is owned by whoever opened it. Closing or dropping it stops the
/// accept loop, aborts in-flight connections and releases the local port.
#[derive(Debug)]
pub struct Tunnel {
    local_port: u16,
    pod: String,
    remote_port: u16,
    task: JoinHandle<()>,
}

impl Tunnel {
    /// Open a tunnel to `pod:remote_port` on an OS-assigned local port.
    ///
    /// Returns once a probe stream to the pod has been established, so a
    /// returned tunnel is known to be usable.
    pub async fn open<S: PodStreamer>(streamer: S, pod: &str, remote_port: u16) -> Result<Self> {
        let probe = streamer.connect(pod, remote_port).await?;
        drop(probe);

        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
        let local_port = listener.local_addr()?.port();

        let task = tokio::spawn(accept_loop(
            listener,
            streamer,
            pod.to_string(),
            remote_port,
        ));

        debug!(
            "Tunnel 127.0.0.1:{} -> {}:{} is active",
            local_port, pod, remote_port
        );

        Ok(Self {
            local_port,
            pod: pod.to_string(),
            remote_port,
            task,
        })
    }

    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    pub fn pod(&self) -> &str {
        &self.pod
    }

    pub fn remote_port(&self) -> u16 {
        self.remote_port
    }

    /// Stop forwarding and wait until the local port is released.
    pub async fn close(mut self) {
        self.task.abort();
        let _ = (&mut self.task).await;
        info!(
            "Closed tunnel 127.0.0.1:{} -> {}:{}",
            self.local_port, self.pod, self.remote_port
        );
    }
}

impl Drop for Tunnel {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn accept_loop<S: PodStreamer>(
    listener: TcpListener,
    streamer: S,
    pod: String,
    remote_port: u16,
) {
    // Dropping the set on abort cancels every connection it still holds.
    let mut connections = JoinSet::new();
    let mut backoff = AcceptBackoff::default();

    loop {
        let (conn, peer) = match listener.accept().await {
            Ok(accepted) => {
                backoff.reset();
                accepted
            }
            Err(e) => {
                // Errors such as EMFILE persist until connections close.
                let delay = backoff.next_delay();
                warn!("Failed to accept tunnel connection: {} (retrying in {:?})", e, delay);
                tokio::time::sleep(delay).await;
                continue;
            }
        };
        while connections.try_join_next().is_some() {}

        debug!("Forwarding connection from {} to {}:{}", peer, pod, remote_port);
        connections.spawn(forward(conn, streamer.clone(), pod.clone(), remote_port));
    }
}

/// Doubling delay between failed accepts, capped at [`ACCEPT_BACKOFF_MAX`].
#[derive(Debug, Default)]
struct AcceptBackoff {
    current: Option<Duration>,
}

impl AcceptBackoff {
    fn next_delay(&mut self) -> Duration {
        let delay = match self.current {
            None => ACCEPT_BACKOFF_MIN,
            Some(d) => (d * 2).min(ACCEPT_BACKOFF_MAX),
        };
        self.current = Some(delay);
        delay
    }

    fn reset(&mut self) {
        self.current = None;
    }
}

async fn forward<S: PodStreamer>(mut conn: TcpStream, streamer: S, pod: String, remote_port: u16) {
    let mut upstream = match streamer.connect(&pod, remote_port).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!("Failed to open stream to {}:{}: {}", pod, remote_port, e);
            return;
        }
    };

    match tokio::io::copy_bidirectional(&mut conn, &mut upstream).await {
        Ok((sent, received)) => debug!(
            "Connection to {}:{} finished ({} bytes sent, {} received)",
            pod, remote_port, sent, received
        ),
        Err(e) => debug!("Connection to {}:{} failed: {}", pod, remote_port, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{EchoStreamer, FailingStreamer};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_open_binds_local_port_and_forwards_bytes() {
        let tunnel = Tunnel::open(EchoStreamer, "tiller-0", 44134).await.unwrap();
        assert_ne!(tunnel.local_port(), 0);
        assert_eq!(tunnel.pod(), "tiller-0");
        assert_eq!(tunnel.remote_port(), 44134);

        let mut conn = TcpStream::connect((Ipv4Addr::LOCALHOST, tunnel.local_port()))
            .await
            .unwrap();
        conn.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        conn.read_exact(&mut buf).await.unwrap();

        assert_eq!(&buf, b"ping");
        tunnel.close().await;
    }

    #[tokio::test]
    async fn test_open_propagates_forward_error() {
        let result = Tunnel::open(FailingStreamer, "tiller-0", 44134).await;
        assert!(matches!(result, Err(HelmdeckError::TunnelError(_))));
    }

    #[tokio::test]
    async fn test_close_releases_local_port() {
        let tunnel = Tunnel::open(EchoStreamer, "tiller-0", 44134).await.unwrap();
        let port = tunnel.local_port();

        tunnel.close().await;

        assert!(TcpStream::connect((Ipv4Addr::LOCALHOST, port)).await.is_err());
    }

    #[test]
    fn test_accept_backoff_doubles_up_to_cap() {
        let mut backoff = AcceptBackoff::default();

        assert_eq!(backoff.next_delay(), Duration::from_millis(10));
        assert_eq!(backoff.next_delay(), Duration::from_millis(20));
        assert_eq!(backoff.next_delay(), Duration::from_millis(40));
        for _ in 0..10 {
            backoff.next_delay();
        }
        assert_eq!(backoff.next_delay(), ACCEPT_BACKOFF_MAX);
    }

    #[test]
    fn test_accept_backoff_resets_after_success() {
        let mut backoff = AcceptBackoff::default();
        backoff.next_delay();
        backoff.next_delay();

        backoff.reset();

        assert_eq!(backoff.next_delay(), ACCEPT_BACKOFF_MIN);
    }

    #[tokio::test]
    async fn test_each_tunnel_gets_its_own_port() {
        let first = Tunnel::open(EchoStreamer, "tiller-0", 44134).await.unwrap();
        let second = Tunnel::open(EchoStreamer, "tiller-0", 44134).await.unwrap();

        assert_ne!(first.local_port(), second.local_port());

        first.close().await;
        second.close().await;
    }
}
