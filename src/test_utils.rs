// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities: a mocked Kubernetes API, in-memory fetching and pod streams.

use crate::error::{HelmdeckError, Result};
use crate::kubernetes::tunnel::PodStreamer;
use crate::repo::fetch::Fetcher;
use crate::repo::index::{ChartVersion, IndexFile};
use bytes::Bytes;
use http::{Request, Response};
use kube::client::Body;
use kube::Client;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::io::DuplexStream;
use tokio::sync::Notify;
use tower::Service;
use url::Url;

/// A mock HTTP service that returns predefined responses based on request paths.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Add a response for GET requests matching the exact path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(("GET".to_string(), path.to_string()), (status, body.to_string()));
        self
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        self.responses
            .lock()
            .unwrap()
            .get(&(method.to_string(), path.to_string()))
            .cloned()
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();

        let (status, body) = self.find_response(&method, &path).unwrap_or_else(|| {
            (
                404,
                r#"{"kind":"Status","apiVersion":"v1","status":"Failure","message":"not found","reason":"NotFound","code":404}"#
                    .to_string(),
            )
        });

        Box::pin(async move {
            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(body.into_bytes()))
                .unwrap())
        })
    }
}

/// A pod JSON object with its Ready condition set accordingly
pub fn pod_json(name: &str, ready: bool) -> serde_json::Value {
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": {
            "name": name,
            "namespace": "kube-system",
            "labels": { "app": "helm", "name": "tiller" }
        },
        "status": {
            "phase": "Running",
            "conditions": [
                { "type": "Initialized", "status": "True" },
                { "type": "Ready", "status": if ready { "True" } else { "False" } }
            ]
        }
    })
}

/// A PodList JSON response
pub fn pod_list_json(pods: Vec<serde_json::Value>) -> String {
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "PodList",
        "metadata": { "resourceVersion": "1" },
        "items": pods
    })
    .to_string()
}

/// Streams that echo back whatever is written to them.
#[derive(Clone, Copy)]
pub struct EchoStreamer;

impl PodStreamer for EchoStreamer {
    type Stream = DuplexStream;

    async fn connect(&self, _pod: &str, _port: u16) -> Result<Self::Stream> {
        let (local, remote) = tokio::io::duplex(1024);
        tokio::spawn(async move {
            let (mut reader, mut writer) = tokio::io::split(remote);
            let _ = tokio::io::copy(&mut reader, &mut writer).await;
        });
        Ok(local)
    }
}

/// Streams that can never be opened.
#[derive(Clone, Copy)]
pub struct FailingStreamer;

impl PodStreamer for FailingStreamer {
    type Stream = DuplexStream;

    async fn connect(&self, pod: &str, port: u16) -> Result<Self::Stream> {
        Err(HelmdeckError::TunnelError(format!(
            "unable to forward {}:{}",
            pod, port
        )))
    }
}

/// Serves fixed bodies by URL; everything else fails like a 404.
#[derive(Clone, Default)]
pub struct StaticFetcher {
    bodies: HashMap<String, Bytes>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, body: &str) -> Self {
        self.bodies
            .insert(url.to_string(), Bytes::from(body.to_string()));
        self
    }
}

impl Fetcher for StaticFetcher {
    async fn fetch(&self, url: &Url) -> Result<Bytes> {
        self.bodies
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| HelmdeckError::FetchError {
                url: url.to_string(),
                reason: "404 Not Found".to_string(),
            })
    }
}

/// Pauses fetches of one URL until released, so tests can interleave callers.
pub struct GatedFetcher {
    inner: StaticFetcher,
    gated: String,
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

impl GatedFetcher {
    pub fn new(inner: StaticFetcher, gated: &str) -> Self {
        Self {
            inner,
            gated: gated.to_string(),
            entered: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        }
    }

    /// Resolves once a fetch of the gated URL is waiting.
    pub async fn entered(&self) {
        self.entered.notified().await
    }

    pub fn release(&self) {
        self.release.notify_one();
    }
}

impl Fetcher for GatedFetcher {
    async fn fetch(&self, url: &Url) -> Result<Bytes> {
        if url.as_str() == self.gated {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.inner.fetch(url).await
    }
}

/// An index.yaml with one version per `(name, version, description)`;
/// chart URLs are relative `<name>-<version>.tgz`.
pub fn index_yaml(charts: &[(&str, &str, &str)]) -> String {
    let mut index = IndexFile {
        api_version: "v1".to_string(),
        ..Default::default()
    };
    for (name, version, description) in charts {
        index
            .entries
            .entry(name.to_string())
            .or_default()
            .push(Some(ChartVersion {
                name: name.to_string(),
                version: version.to_string(),
                urls: vec![format!("{}-{}.tgz", name, version)],
                description: Some(description.to_string()),
                ..Default::default()
            }));
    }
    serde_yaml::to_string(&index).unwrap()
}

/// A clear-signed provenance document listing the digest of `data`
pub fn provenance(file_name: &str, data: &[u8]) -> String {
    format!(
        "-----BEGIN PGP SIGNED MESSAGE-----\n\
         Hash: SHA512\n\
         \n\
         apiVersion: v1\n\
         name: demo\n\
         version: 0.1.0\n\
         \n\
         ...\n\
         files:\n  {}: sha256:{:x}\n\
         -----BEGIN PGP SIGNATURE-----\n\
         \n\
         wsBcBAEBCgAQBQJYmzs0CRDq7Z1jvnPgSQAA\n\
         -----END PGP SIGNATURE-----\n",
        file_name,
        Sha256::digest(data)
    )
}
