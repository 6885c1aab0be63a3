//! Manifest fetch, path normalization, and fragment traversal.
//!
//! Once the barrier releases a reload, the fresh manifest document is
//! fetched from its well-known location and walked segment by segment to
//! the fragment the changed file addresses. Fetch and parse failures are
//! retried indefinitely with a fixed delay - a transient dev-server
//! hiccup must not permanently break live reload.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tokio::time::sleep;

use super::error::ReloadError;

/// Seam for manifest retrieval, swappable in tests.
#[async_trait]
pub trait ManifestFetcher: Send + Sync {
    /// Fetch and parse the current manifest document.
    async fn fetch(&self) -> Result<Value, ReloadError>;
}

/// Fetches the manifest over HTTP from the dev server.
pub struct HttpManifestFetcher {
    client: reqwest::Client,
    url: String,
}

impl HttpManifestFetcher {
    /// Create a fetcher for the manifest's well-known location.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl ManifestFetcher for HttpManifestFetcher {
    async fn fetch(&self) -> Result<Value, ReloadError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ReloadError::Fetch {
                reason: e.to_string(),
            })?;

        response.json::<Value>().await.map_err(|e| {
            if e.is_decode() {
                ReloadError::Parse {
                    reason: e.to_string(),
                }
            } else {
                ReloadError::Fetch {
                    reason: e.to_string(),
                }
            }
        })
    }
}

/// Fixed-delay retry policy for manifest fetches.
///
/// Attempts are unlimited and the delay never grows. Tests use
/// [`RetryPolicy::immediate`] to skip the waits.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Zero-delay policy for fast test runs.
    pub fn immediate() -> Self {
        Self {
            delay: Duration::ZERO,
        }
    }
}

/// Normalize a logical path into manifest-traversal form.
///
/// A leading `app/` segment is stripped. Aliased paths (`@name/...`)
/// traverse directly by their own segments; anything else not already
/// under one of the two top-level namespaces (`dashboard/`, `blueprint/`)
/// is addressed under `dashboard/`.
pub fn normalize_logical_path(path: &str) -> String {
    let path = path.strip_prefix("app/").unwrap_or(path);

    if path.starts_with('@') || path.starts_with("dashboard/") || path.starts_with("blueprint/") {
        path.to_string()
    } else {
        format!("dashboard/{path}")
    }
}

/// Walk the manifest document segment by segment to the addressed
/// fragment.
///
/// An absent segment is a config or programmer error, not a recoverable
/// condition: the traversal fails for this one reload attempt.
pub fn traverse<'a>(document: &'a Value, normalized: &str) -> Result<&'a Value, ReloadError> {
    let mut current = document;

    for segment in normalized.split('/') {
        current = current.get(segment).ok_or_else(|| ReloadError::Traverse {
            segment: segment.to_string(),
            path: normalized.to_string(),
        })?;
    }

    Ok(current)
}

/// Fetch the manifest (retrying transport/parse failures forever with the
/// policy's fixed delay) and extract the fragment for one logical path.
///
/// Returns the normalized path together with the fragment. A traversal
/// failure is returned rather than retried.
pub async fn fetch_fragment(
    fetcher: &dyn ManifestFetcher,
    policy: &RetryPolicy,
    logical_path: &str,
) -> Result<(String, Value), ReloadError> {
    let normalized = normalize_logical_path(logical_path);

    let document = loop {
        match fetcher.fetch().await {
            Ok(document) => break document,
            Err(e) => {
                tracing::error!("[client] error fetching updated manifest: {e}");
                tracing::error!("[client] retrying in {}ms", policy.delay.as_millis());
                sleep(policy.delay).await;
            }
        }
    };

    let fragment = traverse(&document, &normalized)?.clone();
    Ok((normalized, fragment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fetcher that fails a fixed number of times before succeeding.
    struct FlakyFetcher {
        failures: usize,
        attempts: AtomicUsize,
        document: Value,
    }

    impl FlakyFetcher {
        fn new(failures: usize, document: Value) -> Self {
            Self {
                failures,
                attempts: AtomicUsize::new(0),
                document,
            }
        }
    }

    #[async_trait]
    impl ManifestFetcher for FlakyFetcher {
        async fn fetch(&self) -> Result<Value, ReloadError> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < self.failures {
                Err(ReloadError::Fetch {
                    reason: "connection refused".to_string(),
                })
            } else {
                Ok(self.document.clone())
            }
        }
    }

    #[test]
    fn test_normalize_prefixes_dashboard() {
        assert_eq!(
            normalize_logical_path("app/widgets/foo.json"),
            "dashboard/widgets/foo.json"
        );
    }

    #[test]
    fn test_normalize_keeps_blueprint_namespace() {
        assert_eq!(
            normalize_logical_path("app/blueprint/bar.json"),
            "blueprint/bar.json"
        );
    }

    #[test]
    fn test_normalize_leaves_dashboard_paths_unchanged() {
        assert_eq!(
            normalize_logical_path("dashboard/panel.json"),
            "dashboard/panel.json"
        );
        assert_eq!(
            normalize_logical_path("app/dashboard/panel.json"),
            "dashboard/panel.json"
        );
    }

    #[test]
    fn test_normalize_leaves_aliased_paths_unchanged() {
        assert_eq!(
            normalize_logical_path("@shared/widgets/a.json"),
            "@shared/widgets/a.json"
        );
    }

    #[test]
    fn test_traverse_walks_nested_keys() {
        let doc = json!({
            "dashboard": {
                "widgets": {
                    "foo.json": { "id": "foo" }
                }
            }
        });

        let fragment = traverse(&doc, "dashboard/widgets/foo.json").unwrap();
        assert_eq!(fragment, &json!({ "id": "foo" }));
    }

    #[test]
    fn test_traverse_reports_the_missing_segment() {
        let doc = json!({ "dashboard": {} });

        let err = traverse(&doc, "dashboard/widgets/foo.json").unwrap_err();
        match err {
            ReloadError::Traverse { segment, path } => {
                assert_eq!(segment, "widgets");
                assert_eq!(path, "dashboard/widgets/foo.json");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_retries_until_success() {
        let fetcher = FlakyFetcher::new(
            2,
            json!({ "dashboard": { "panel.json": { "id": "panel" } } }),
        );

        let (normalized, fragment) =
            fetch_fragment(&fetcher, &RetryPolicy::immediate(), "app/panel.json")
                .await
                .unwrap();

        assert_eq!(fetcher.attempts.load(Ordering::SeqCst), 3);
        assert_eq!(normalized, "dashboard/panel.json");
        assert_eq!(fragment, json!({ "id": "panel" }));
    }

    #[tokio::test]
    async fn test_traversal_failure_is_not_retried() {
        let fetcher = FlakyFetcher::new(0, json!({ "dashboard": {} }));

        let result = fetch_fragment(&fetcher, &RetryPolicy::immediate(), "app/panel.json").await;

        assert!(matches!(result, Err(ReloadError::Traverse { .. })));
        assert_eq!(fetcher.attempts.load(Ordering::SeqCst), 1);
    }
}
