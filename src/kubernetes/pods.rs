// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Pod lookup by label selector

use crate::error::{HelmdeckError, Result};
use k8s_openapi::api::core::v1::Pod;
use kube::{api::ListParams, Api, Client, ResourceExt};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Render an exact-match label set as a Kubernetes label selector string
pub fn label_selector(labels: &BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}

/// Check if a pod reports the Ready condition as True
pub fn is_pod_ready(pod: &Pod) -> bool {
    pod.status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .is_some_and(|conditions| {
            conditions
                .iter()
                .any(|c| c.type_ == "Ready" && c.status == "True")
        })
}

/// Return the first ready pod matching `labels` in `namespace`, in list order.
#[instrument(skip(client))]
pub async fn find_first_ready_pod(
    client: &Client,
    namespace: &str,
    labels: &BTreeMap<String, String>,
) -> Result<Pod> {
    let selector = label_selector(labels);
    let pods: Api<Pod> = Api::namespaced(client.clone(), namespace);
    let pod_list = pods.list(&ListParams::default().labels(&selector)).await?;

    if pod_list.items.is_empty() {
        return Err(HelmdeckError::PodNotFound {
            namespace: namespace.to_string(),
            selector,
        });
    }

    debug!("Found {} pods matching {}", pod_list.items.len(), selector);

    pod_list
        .items
        .into_iter()
        .find(is_pod_ready)
        .ok_or_else(|| HelmdeckError::NoReadyPod {
            namespace: namespace.to_string(),
            selector,
        })
        .inspect(|pod| debug!("Selected ready pod {}", pod.name_any()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{pod_json, pod_list_json, MockService};

    const PODS_PATH: &str = "/api/v1/namespaces/kube-system/pods";

    fn tiller_labels() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("app".to_string(), "helm".to_string()),
            ("name".to_string(), "tiller".to_string()),
        ])
    }

    #[test]
    fn test_label_selector_is_sorted_and_joined() {
        assert_eq!(label_selector(&tiller_labels()), "app=helm,name=tiller");
    }

    #[test]
    fn test_label_selector_empty() {
        assert_eq!(label_selector(&BTreeMap::new()), "");
    }

    #[test]
    fn test_is_pod_ready_without_status() {
        let pod = Pod::default();
        assert!(!is_pod_ready(&pod));
    }

    #[test]
    fn test_is_pod_ready_from_json() {
        let ready: Pod = serde_json::from_value(pod_json("tiller-1", true)).unwrap();
        let not_ready: Pod = serde_json::from_value(pod_json("tiller-2", false)).unwrap();

        assert!(is_pod_ready(&ready));
        assert!(!is_pod_ready(&not_ready));
    }

    #[tokio::test]
    async fn test_no_pods_is_not_found() {
        let client = MockService::new()
            .on_get(PODS_PATH, 200, &pod_list_json(vec![]))
            .into_client();

        let result = find_first_ready_pod(&client, "kube-system", &tiller_labels()).await;

        assert!(matches!(result, Err(HelmdeckError::PodNotFound { .. })));
    }

    #[tokio::test]
    async fn test_only_unready_pods_is_no_ready_pod() {
        let client = MockService::new()
            .on_get(
                PODS_PATH,
                200,
                &pod_list_json(vec![pod_json("tiller-a", false), pod_json("tiller-b", false)]),
            )
            .into_client();

        let result = find_first_ready_pod(&client, "kube-system", &tiller_labels()).await;

        assert!(matches!(result, Err(HelmdeckError::NoReadyPod { .. })));
    }

    #[tokio::test]
    async fn test_first_ready_pod_in_list_order() {
        let client = MockService::new()
            .on_get(
                PODS_PATH,
                200,
                &pod_list_json(vec![
                    pod_json("tiller-a", false),
                    pod_json("tiller-b", true),
                    pod_json("tiller-c", true),
                ]),
            )
            .into_client();

        let pod = find_first_ready_pod(&client, "kube-system", &tiller_labels())
            .await
            .unwrap();

        assert_eq!(pod.name_any(), "tiller-b");
    }

    #[tokio::test]
    async fn test_api_error_propagates() {
        let client = MockService::new().into_client();

        let result = find_first_ready_pod(&client, "kube-system", &tiller_labels()).await;

        assert!(matches!(result, Err(HelmdeckError::KubeError(_))));
    }
}
