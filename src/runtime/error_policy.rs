//! # Error Policy
//!
//! Retry scheduling for failed reconciliations and classification of watch
//! stream errors.

use crate::controller::reconciler::{Reconciler, ReconcilerError};
use crate::observability::metrics;
use crate::store::{ObjectKey, ObjectStore};
use k8s_openapi::api::core::v1::Secret;
use kube_runtime::controller::{self, Action};
use kube_runtime::watcher;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Requeue a failed secret with its own Fibonacci backoff
pub fn handle_reconciliation_error<S: ObjectStore>(
    secret: Arc<Secret>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler<S>>,
) -> Action {
    let key = ObjectKey::of(secret.as_ref());

    error!(
        secret = %key,
        reason = error.reason(),
        "Reconciliation error: {}", error
    );
    metrics::increment_reconciliation_errors(error.reason());

    let (backoff_seconds, error_count) = ctx.next_backoff(&key);
    let next_trigger_time = chrono::Utc::now()
        + chrono::Duration::seconds(i64::try_from(backoff_seconds).unwrap_or(i64::MAX));

    info!(
        "Retrying {} with Fibonacci backoff: {}s (error count: {}, next retry: {}, trigger source: error-backoff)",
        key,
        backoff_seconds,
        error_count,
        next_trigger_time.to_rfc3339()
    );

    metrics::increment_requeues_total("error-backoff");
    Action::requeue(Duration::from_secs(backoff_seconds))
}

/// How the watch loop should treat a controller stream error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchErrorKind {
    /// 401/403, RBAC revoked or token expired
    Unauthorized,
    /// 410, resource version expired
    Expired,
    /// 429, API server storage reinitializing
    Throttled,
    /// 404, object or API missing
    NotFound,
    /// A reconcile failed; the error policy already scheduled its retry
    Reconciler,
    Other,
}

impl WatchErrorKind {
    #[must_use]
    pub fn from_status_code(code: u16) -> Self {
        match code {
            401 | 403 => WatchErrorKind::Unauthorized,
            404 => WatchErrorKind::NotFound,
            410 => WatchErrorKind::Expired,
            429 => WatchErrorKind::Throttled,
            _ => WatchErrorKind::Other,
        }
    }

    /// API errors carry their status code; anything else falls back to its message
    #[must_use]
    pub fn from_kube_error(error: &kube::Error) -> Self {
        match error {
            kube::Error::Api(response) => Self::from_status_code(response.code),
            other => Self::classify(&other.to_string()),
        }
    }

    #[must_use]
    pub fn from_watcher_error(error: &watcher::Error) -> Self {
        match error {
            watcher::Error::InitialListFailed(e)
            | watcher::Error::WatchStartFailed(e)
            | watcher::Error::WatchFailed(e) => Self::from_kube_error(e),
            watcher::Error::WatchError(response) => Self::from_status_code(response.code),
            watcher::Error::NoResourceVersion => WatchErrorKind::Other,
        }
    }

    #[must_use]
    pub fn from_controller_error<R>(error: &controller::Error<R, watcher::Error>) -> Self {
        match error {
            controller::Error::ObjectNotFound(_) => WatchErrorKind::NotFound,
            controller::Error::ReconcilerFailed(..) => WatchErrorKind::Reconciler,
            controller::Error::QueueError(e) => Self::from_watcher_error(e),
            controller::Error::RunnerError(_) => WatchErrorKind::Other,
        }
    }

    /// Classify an error that only exists as text
    ///
    /// Status codes only count when labelled (`code: 404`) or leading the
    /// message (`404 page not found`), never as digits inside other values.
    #[must_use]
    pub fn classify(message: &str) -> Self {
        // 404 first: plain-text 404 bodies surface as serde errors mentioning WatchFailed
        if mentions_status(message, 404)
            || message.contains("NotFound")
            || message.contains("page not found")
        {
            return WatchErrorKind::NotFound;
        }
        if mentions_status(message, 401)
            || mentions_status(message, 403)
            || message.contains("Unauthorized")
            || message.contains("Forbidden")
        {
            return WatchErrorKind::Unauthorized;
        }
        if mentions_status(message, 410)
            || message.contains("too old resource version")
            || message.contains("Expired")
            || message.contains("Gone")
        {
            return WatchErrorKind::Expired;
        }
        if mentions_status(message, 429)
            || message.contains("storage is (re)initializing")
            || message.contains("TooManyRequests")
        {
            return WatchErrorKind::Throttled;
        }
        WatchErrorKind::Other
    }
}

fn mentions_status(message: &str, code: u16) -> bool {
    let code = code.to_string();
    message.match_indices(code.as_str()).any(|(at, _)| {
        let standalone = !message[at + code.len()..].starts_with(|c: char| c.is_ascii_digit());
        let label = message[..at].trim_end_matches([' ', ':', '=']);
        standalone && (label.is_empty() || label.ends_with("code") || label.ends_with("status"))
    })
}

/// Handle a watch stream error
///
/// Returns `true` when the stream should keep running, `false` when the error
/// was handled by waiting and the event should be dropped.
pub async fn handle_watch_stream_error(
    kind: WatchErrorKind,
    message: &str,
    watch_restart_delay: Duration,
) -> bool {
    match kind {
        WatchErrorKind::Unauthorized => {
            error!(
                "Watch authentication failed, RBAC may have been revoked or the token expired: {}",
                message
            );
            error!("Check that the service account can get/list/watch secrets, configmaps and cloudcredentials, and update secrets");
            warn!(
                "Waiting {}s before retrying watch",
                watch_restart_delay.as_secs()
            );
            tokio::time::sleep(watch_restart_delay).await;
            false
        }
        WatchErrorKind::Expired => {
            warn!(error_type = "410", "Watch resource version expired, watch will restart");
            false
        }
        WatchErrorKind::Throttled => {
            warn!(
                "API server storage reinitializing (429), backing off for {}s",
                watch_restart_delay.as_secs()
            );
            tokio::time::sleep(watch_restart_delay).await;
            false
        }
        WatchErrorKind::NotFound => {
            warn!(
                "Watched object not found (404), this is normal if it was deleted: {}",
                message
            );
            true
        }
        WatchErrorKind::Reconciler => {
            debug!("Reconcile failed, retry already scheduled: {}", message);
            true
        }
        WatchErrorKind::Other => {
            error!("Controller stream error: {}", message);
            tokio::time::sleep(watch_restart_delay).await;
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControllerConfig;
    use crate::store::InMemoryStore;
    use kube::core::ErrorResponse;
    use kube_runtime::reflector::ObjectRef;

    fn api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: format!("request failed: {reason}"),
            reason: reason.to_string(),
            code,
        })
    }

    #[test]
    fn test_status_codes() {
        let cases = [
            (401, WatchErrorKind::Unauthorized),
            (403, WatchErrorKind::Unauthorized),
            (404, WatchErrorKind::NotFound),
            (410, WatchErrorKind::Expired),
            (429, WatchErrorKind::Throttled),
            (500, WatchErrorKind::Other),
        ];
        for (code, expected) in cases {
            assert_eq!(WatchErrorKind::from_status_code(code), expected, "{code}");
        }
    }

    #[test]
    fn test_kube_errors_are_classified_by_code() {
        assert_eq!(
            WatchErrorKind::from_kube_error(&api_error(410, "Gone")),
            WatchErrorKind::Expired
        );
        // The reason text must not override the code
        assert_eq!(
            WatchErrorKind::from_kube_error(&api_error(500, "NotFound")),
            WatchErrorKind::Other
        );
    }

    #[test]
    fn test_controller_errors_are_classified_structurally() {
        type Error = controller::Error<ReconcilerError, watcher::Error>;

        let cases = [
            (
                "watch failed with 403",
                Error::QueueError(watcher::Error::WatchFailed(api_error(403, "Forbidden"))),
                WatchErrorKind::Unauthorized,
            ),
            (
                "initial list throttled",
                Error::QueueError(watcher::Error::InitialListFailed(api_error(
                    429,
                    "TooManyRequests",
                ))),
                WatchErrorKind::Throttled,
            ),
            (
                "watch event expired",
                Error::QueueError(watcher::Error::WatchError(ErrorResponse {
                    status: "Failure".to_string(),
                    message: "too old resource version: 1404 (1405)".to_string(),
                    reason: "Expired".to_string(),
                    code: 410,
                })),
                WatchErrorKind::Expired,
            ),
            (
                "object missing from store",
                Error::ObjectNotFound(ObjectRef::<Secret>::new("openstack-credentials").erase()),
                WatchErrorKind::NotFound,
            ),
            (
                "reconcile failure",
                Error::ReconcilerFailed(
                    ReconcilerError::from(crate::annotator::AnnotatorError::InvalidMode {
                        mode: "bogus".to_string(),
                    }),
                    ObjectRef::<Secret>::new("openstack-credentials").erase(),
                ),
                WatchErrorKind::Reconciler,
            ),
        ];

        for (name, error, expected) in cases {
            assert_eq!(WatchErrorKind::from_controller_error(&error), expected, "{name}");
        }
    }

    #[test]
    fn test_classify_text_errors() {
        let cases = [
            ("404 page not found", WatchErrorKind::NotFound),
            ("ErrorResponse { code: 404 }", WatchErrorKind::NotFound),
            ("status=401", WatchErrorKind::Unauthorized),
            ("too old resource version: 1 (2)", WatchErrorKind::Expired),
            ("TooManyRequests", WatchErrorKind::Throttled),
            ("connection reset", WatchErrorKind::Other),
            // Digits inside other values are not status codes
            ("unexpected resourceVersion 4041 in event", WatchErrorKind::Other),
            ("resourceVersion: 14045", WatchErrorKind::Other),
            ("dial tcp 10.0.4.29:6443: i/o timeout", WatchErrorKind::Other),
        ];
        for (message, expected) in cases {
            assert_eq!(WatchErrorKind::classify(message), expected, "{message}");
        }
    }

    #[tokio::test]
    async fn test_not_found_keeps_stream_running() {
        assert!(
            handle_watch_stream_error(WatchErrorKind::NotFound, "404 not found", Duration::ZERO)
                .await
        );
        assert!(
            handle_watch_stream_error(WatchErrorKind::Reconciler, "invalid mode", Duration::ZERO)
                .await
        );
        assert!(!handle_watch_stream_error(WatchErrorKind::Expired, "Gone", Duration::ZERO).await);
    }

    #[test]
    fn test_reconciliation_error_requeues_with_growing_backoff() {
        let config = ControllerConfig {
            backoff_min_secs: 3,
            backoff_max_secs: 100,
            ..ControllerConfig::default()
        };
        let ctx = Arc::new(Reconciler::new(InMemoryStore::new(), config));
        let mut secret = Secret::default();
        secret.metadata.namespace = Some("kube-system".to_string());
        secret.metadata.name = Some("openstack-credentials".to_string());
        let secret = Arc::new(secret);
        let error = ReconcilerError::from(crate::annotator::AnnotatorError::InvalidMode {
            mode: "bogus".to_string(),
        });

        let delays: Vec<Action> = (0..3)
            .map(|_| handle_reconciliation_error(Arc::clone(&secret), &error, Arc::clone(&ctx)))
            .collect();
        assert_eq!(
            delays,
            vec![
                Action::requeue(Duration::from_secs(3)),
                Action::requeue(Duration::from_secs(3)),
                Action::requeue(Duration::from_secs(6)),
            ]
        );
    }
}
