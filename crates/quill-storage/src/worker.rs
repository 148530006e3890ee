//! Background credential refresh worker.
//!
//! Periodically inspects the credential manager and refreshes eagerly
//! before expiry, so foreground requests rarely pay the exchange latency.

use std::time::Duration;

use jiff::SignedDuration;
use tokio_util::sync::CancellationToken;

use crate::credentials::CredentialManager;

/// Tracing target for refresh worker operations.
const TRACING_TARGET: &str = "quill_storage::worker";

/// How often the worker inspects credential state.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Remaining lifetime below which the worker logs a warning.
const WARN_THRESHOLD: SignedDuration = SignedDuration::from_hours(2);

/// Remaining lifetime below which the worker refreshes immediately.
const EAGER_REFRESH_THRESHOLD: SignedDuration = SignedDuration::from_mins(30);

/// Periodic credential refresh worker.
pub struct CredentialRefreshWorker {
    manager: CredentialManager,
    check_interval: Duration,
}

impl CredentialRefreshWorker {
    /// Creates a worker with the default check interval.
    pub fn new(manager: CredentialManager) -> Self {
        Self {
            manager,
            check_interval: DEFAULT_CHECK_INTERVAL,
        }
    }

    /// Overrides the check interval.
    pub fn with_check_interval(mut self, check_interval: Duration) -> Self {
        self.check_interval = check_interval;
        self
    }

    /// Run the refresh worker until cancelled.
    ///
    /// Refresh failures are logged and retried on the next tick; the
    /// worker itself never exits on error.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            target: TRACING_TARGET,
            check_interval_secs = self.check_interval.as_secs(),
            "Starting credential refresh worker"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(
                        target: TRACING_TARGET,
                        "Credential refresh worker shutdown requested"
                    );
                    break;
                }
                _ = tokio::time::sleep(self.check_interval) => {
                    self.check().await;
                }
            }
        }

        tracing::info!(
            target: TRACING_TARGET,
            "Credential refresh worker stopped"
        );
    }

    /// Single inspection tick.
    async fn check(&self) {
        let status = self.manager.status().await;

        let Some(valid_until) = status.valid_until else {
            // Uninitialized, failed, or a non-expiring strategy. Foreground
            // calls drive recovery in the first two cases.
            return;
        };

        let remaining = valid_until.duration_since(jiff::Timestamp::now());

        if remaining <= EAGER_REFRESH_THRESHOLD {
            tracing::info!(
                target: TRACING_TARGET,
                %valid_until,
                remaining_secs = remaining.as_secs(),
                "Refreshing credential ahead of expiry"
            );
            if let Err(err) = self.manager.refresh_now().await {
                tracing::error!(
                    target: TRACING_TARGET,
                    error = %err,
                    remediation = err.remediation(),
                    "Eager credential refresh failed"
                );
            }
        } else if remaining <= WARN_THRESHOLD {
            tracing::warn!(
                target: TRACING_TARGET,
                %valid_until,
                remaining_secs = remaining.as_secs(),
                "Credential expires soon"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use jiff::Timestamp;

    use super::*;
    use crate::config::{
        CredentialStrategyConfig, LongLivedConfig, StorageConfig, StorageProfile, Strategy,
    };
    use crate::credentials::{CredentialProvider, InMemorySettingsStore, ResolvedCredential};
    use crate::error::CredentialResult;

    struct CountingProvider {
        calls: Arc<AtomicUsize>,
        lifetime: SignedDuration,
    }

    #[async_trait]
    impl CredentialProvider for CountingProvider {
        fn strategy(&self) -> Strategy {
            Strategy::LongLived
        }

        async fn resolve(&self) -> CredentialResult<ResolvedCredential> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ResolvedCredential {
                access_key_id: "AKIA_TEST".to_owned(),
                secret_access_key: "secret".to_owned(),
                session_token: None,
                expires_at: Some(Timestamp::now() + self.lifetime),
            })
        }
    }

    fn manager_with_lifetime(
        lifetime: SignedDuration,
    ) -> (CredentialManager, Arc<AtomicUsize>) {
        let store = Arc::new(InMemorySettingsStore::new(StorageConfig {
            profile: StorageProfile::new("quill-media", "us-east-1"),
            credentials: CredentialStrategyConfig::LongLived(LongLivedConfig {
                access_key_id: Some("AKIA_TEST".to_owned()),
                secret_access_key: Some("secret".to_owned()),
            }),
        }));
        let calls = Arc::new(AtomicUsize::new(0));
        let factory_calls = calls.clone();
        let manager = CredentialManager::with_provider_factory(
            store,
            Arc::new(move |_| {
                Box::new(CountingProvider {
                    calls: factory_calls.clone(),
                    lifetime,
                }) as Box<dyn CredentialProvider>
            }),
        );
        (manager, calls)
    }

    #[tokio::test]
    async fn tick_refreshes_a_nearly_expired_credential() {
        let (manager, calls) = manager_with_lifetime(SignedDuration::from_mins(5));
        manager.initialize().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let worker = CredentialRefreshWorker::new(manager.clone());
        worker.check().await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(manager.status().await.healthy);
    }

    #[tokio::test]
    async fn tick_leaves_a_healthy_credential_alone() {
        let (manager, calls) = manager_with_lifetime(SignedDuration::from_hours(10));
        manager.initialize().await.unwrap();

        let worker = CredentialRefreshWorker::new(manager.clone());
        worker.check().await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn tick_is_a_noop_when_nothing_is_configured() {
        let store = Arc::new(InMemorySettingsStore::default());
        let manager = CredentialManager::new(store);
        let worker = CredentialRefreshWorker::new(manager.clone());

        // The tick must not error or force initialization.
        worker.check().await;
        assert!(manager.status().await.valid_until.is_none());
    }
}
