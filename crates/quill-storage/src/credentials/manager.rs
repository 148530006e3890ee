use std::sync::Arc;

use async_trait::async_trait;
use jiff::Timestamp;
use tokio::sync::{Mutex, RwLock};

use super::{CredentialProvider, ResolvedCredential, provider_for};
use crate::config::{CredentialStrategyConfig, StorageConfig, StorageProfile, Strategy};
use crate::error::{BoxError, CredentialError, CredentialResult};

/// Persistence boundary for storage configuration and cached credentials.
///
/// The production implementation sits on the settings table; tests use
/// [`InMemorySettingsStore`].
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Loads the deployment's storage configuration, if one was written.
    async fn load_storage_config(&self) -> Result<Option<StorageConfig>, BoxError>;

    /// Loads the last persisted temporary credential, if any.
    async fn load_cached_credential(&self) -> Result<Option<ResolvedCredential>, BoxError>;

    /// Persists a freshly resolved temporary credential.
    async fn store_cached_credential(
        &self,
        credential: &ResolvedCredential,
    ) -> Result<(), BoxError>;
}

/// Lifecycle phase of the credential manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum LifecyclePhase {
    Uninitialized,
    Initializing,
    Ready,
    Refreshing,
    Failed,
}

/// Health snapshot exposed to status endpoints and the refresh worker.
#[derive(Debug, Clone)]
pub struct CredentialStatus {
    pub phase: LifecyclePhase,
    pub strategy: Option<Strategy>,
    pub valid_until: Option<Timestamp>,
    pub healthy: bool,
    pub last_error: Option<String>,
}

/// Factory building a provider for a strategy configuration.
pub type ProviderFactory =
    Arc<dyn Fn(&CredentialStrategyConfig) -> Box<dyn CredentialProvider> + Send + Sync>;

struct ManagerState {
    phase: LifecyclePhase,
    config: Option<StorageConfig>,
    provider: Option<Arc<dyn CredentialProvider>>,
    last_error: Option<String>,
}

struct ManagerInner {
    store: Arc<dyn SettingsStore>,
    provider_factory: ProviderFactory,
    state: RwLock<ManagerState>,
    credential: RwLock<Option<Arc<ResolvedCredential>>>,
    // Serializes initialization and refresh; readers of a valid cached
    // credential never touch it.
    flight: Mutex<()>,
}

/// Owns the active credential provider and the cached credential.
///
/// All resolution goes through a single-flight lock: when N callers race
/// on an expired credential, exactly one performs the exchange and the
/// rest adopt its result. Lookups that find a valid cached credential
/// return without contending on the lock.
#[derive(Clone)]
pub struct CredentialManager {
    inner: Arc<ManagerInner>,
}

impl CredentialManager {
    /// Creates a manager over the given settings store with the built-in
    /// provider set.
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self::with_provider_factory(store, Arc::new(provider_for))
    }

    /// Creates a manager with a custom provider factory.
    ///
    /// Used by tests to substitute deterministic providers.
    pub fn with_provider_factory(store: Arc<dyn SettingsStore>, factory: ProviderFactory) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                store,
                provider_factory: factory,
                state: RwLock::new(ManagerState {
                    phase: LifecyclePhase::Uninitialized,
                    config: None,
                    provider: None,
                    last_error: None,
                }),
                credential: RwLock::new(None),
                flight: Mutex::new(()),
            }),
        }
    }

    /// Returns a credential that is valid right now.
    ///
    /// Initializes lazily on first use and after failure, refreshes when
    /// the cached credential has expired, and never hands out an expired
    /// credential.
    pub async fn credentials(&self) -> CredentialResult<Arc<ResolvedCredential>> {
        let phase = self.inner.state.read().await.phase;
        if matches!(phase, LifecyclePhase::Uninitialized | LifecyclePhase::Failed) {
            self.initialize().await?;
        }

        if let Some(credential) = self.cached_valid().await {
            return Ok(credential);
        }
        self.refresh().await
    }

    /// Loads configuration, builds the provider, and installs an initial
    /// credential.
    pub async fn initialize(&self) -> CredentialResult<()> {
        let _guard = self.inner.flight.lock().await;

        // Another caller may have finished initializing while we waited.
        if self.inner.state.read().await.phase == LifecyclePhase::Ready
            && self.cached_valid().await.is_some()
        {
            return Ok(());
        }

        self.initialize_locked().await.map(|_| ())
    }

    /// Forces a resolution regardless of the cached credential's validity.
    pub async fn refresh_now(&self) -> CredentialResult<Arc<ResolvedCredential>> {
        let _guard = self.inner.flight.lock().await;

        let provider = match self.active_provider().await {
            Some(provider) => provider,
            None => return self.initialize_locked().await,
        };

        self.set_phase(LifecyclePhase::Refreshing).await;
        self.resolve_and_install(&provider).await
    }

    /// Drops all cached state and re-runs initialization, picking up
    /// configuration changes.
    pub async fn reinitialize(&self) -> CredentialResult<()> {
        let _guard = self.inner.flight.lock().await;

        *self.inner.credential.write().await = None;
        {
            let mut state = self.inner.state.write().await;
            state.phase = LifecyclePhase::Uninitialized;
            state.config = None;
            state.provider = None;
            state.last_error = None;
        }

        self.initialize_locked().await.map(|_| ())
    }

    /// Current lifecycle snapshot.
    pub async fn status(&self) -> CredentialStatus {
        let state = self.inner.state.read().await;
        let credential = self.inner.credential.read().await;

        let valid_until = credential.as_ref().and_then(|c| c.expires_at);
        let healthy = state.phase == LifecyclePhase::Ready
            && credential.as_ref().is_some_and(|c| !c.is_expired());

        CredentialStatus {
            phase: state.phase,
            strategy: state.config.as_ref().map(StorageConfig::strategy),
            valid_until,
            healthy,
            last_error: state.last_error.clone(),
        }
    }

    /// Bucket profile from the active configuration, initializing first
    /// if needed.
    pub async fn storage_profile(&self) -> CredentialResult<StorageProfile> {
        if let Some(config) = self.inner.state.read().await.config.as_ref() {
            return Ok(config.profile.clone());
        }
        self.initialize().await?;

        let state = self.inner.state.read().await;
        state
            .config
            .as_ref()
            .map(|config| config.profile.clone())
            .ok_or(CredentialError::NotConfigured)
    }

    async fn cached_valid(&self) -> Option<Arc<ResolvedCredential>> {
        let credential = self.inner.credential.read().await;
        credential.as_ref().filter(|c| !c.is_expired()).cloned()
    }

    async fn active_provider(&self) -> Option<Arc<dyn CredentialProvider>> {
        self.inner.state.read().await.provider.clone()
    }

    async fn set_phase(&self, phase: LifecyclePhase) {
        self.inner.state.write().await.phase = phase;
    }

    /// Refreshes the cached credential, single-flight.
    async fn refresh(&self) -> CredentialResult<Arc<ResolvedCredential>> {
        let _guard = self.inner.flight.lock().await;

        // The winner of the race already installed a fresh credential.
        if let Some(credential) = self.cached_valid().await {
            return Ok(credential);
        }

        let provider = match self.active_provider().await {
            Some(provider) => provider,
            None => return self.initialize_locked().await,
        };

        self.set_phase(LifecyclePhase::Refreshing).await;
        self.resolve_and_install(&provider).await
    }

    /// Initialization body. Caller must hold the flight lock.
    async fn initialize_locked(&self) -> CredentialResult<Arc<ResolvedCredential>> {
        self.set_phase(LifecyclePhase::Initializing).await;

        let config = match self.inner.store.load_storage_config().await {
            Ok(Some(config)) => config,
            Ok(None) => {
                self.record_failure("media storage is not configured").await;
                return Err(CredentialError::NotConfigured);
            }
            Err(err) => {
                let err = CredentialError::store(err);
                self.record_failure(err.to_string()).await;
                return Err(err);
            }
        };

        let strategy = config.strategy();
        let provider: Arc<dyn CredentialProvider> =
            Arc::from((self.inner.provider_factory)(&config.credentials));

        {
            let mut state = self.inner.state.write().await;
            state.config = Some(config);
            state.provider = Some(provider.clone());
        }

        // Role sessions are persisted across restarts; adopt one that is
        // still valid instead of re-assuming.
        if strategy == Strategy::RoleAssumption {
            match self.inner.store.load_cached_credential().await {
                Ok(Some(cached)) if !cached.is_expired() => {
                    tracing::info!(
                        target: crate::TRACING_TARGET_CREDENTIALS,
                        expires_at = ?cached.expires_at,
                        "Adopting persisted role session",
                    );
                    let credential = Arc::new(cached);
                    *self.inner.credential.write().await = Some(credential.clone());
                    self.mark_ready().await;
                    return Ok(credential);
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(
                        target: crate::TRACING_TARGET_CREDENTIALS,
                        error = %err, "Failed to load persisted role session",
                    );
                }
            }
        }

        self.resolve_and_install(&provider).await
    }

    /// Resolves through the provider and installs the result wholesale.
    /// Caller must hold the flight lock.
    async fn resolve_and_install(
        &self,
        provider: &Arc<dyn CredentialProvider>,
    ) -> CredentialResult<Arc<ResolvedCredential>> {
        let strategy = provider.strategy();

        let resolved = match provider.resolve().await {
            Ok(resolved) => resolved,
            Err(err) => {
                tracing::error!(
                    target: crate::TRACING_TARGET_CREDENTIALS,
                    %strategy, error = %err,
                    remediation = err.remediation(),
                    "Credential resolution failed",
                );
                self.record_failure(err.to_string()).await;
                return Err(err);
            }
        };

        if strategy == Strategy::RoleAssumption {
            if let Err(err) = self.inner.store.store_cached_credential(&resolved).await {
                tracing::warn!(
                    target: crate::TRACING_TARGET_CREDENTIALS,
                    error = %err, "Failed to persist role session",
                );
            }
        }

        tracing::info!(
            target: crate::TRACING_TARGET_CREDENTIALS,
            %strategy, expires_at = ?resolved.expires_at,
            "Credential resolved",
        );

        let credential = Arc::new(resolved);
        *self.inner.credential.write().await = Some(credential.clone());
        self.mark_ready().await;
        Ok(credential)
    }

    async fn mark_ready(&self) {
        let mut state = self.inner.state.write().await;
        state.phase = LifecyclePhase::Ready;
        state.last_error = None;
    }

    async fn record_failure(&self, message: impl Into<String>) {
        let mut state = self.inner.state.write().await;
        state.phase = LifecyclePhase::Failed;
        state.last_error = Some(message.into());
    }
}

/// Settings store backed by process memory.
///
/// Used in tests and in deployments that have not wired a database yet.
#[derive(Default)]
pub struct InMemorySettingsStore {
    config: RwLock<Option<StorageConfig>>,
    cached: RwLock<Option<ResolvedCredential>>,
}

impl InMemorySettingsStore {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config: RwLock::new(Some(config)),
            cached: RwLock::new(None),
        }
    }

    /// Replaces the stored configuration.
    pub async fn set_config(&self, config: StorageConfig) {
        *self.config.write().await = Some(config);
    }

    /// Seeds a persisted credential, as a previous process would have.
    pub async fn seed_cached_credential(&self, credential: ResolvedCredential) {
        *self.cached.write().await = Some(credential);
    }

    /// Currently persisted credential, if any.
    pub async fn cached_credential(&self) -> Option<ResolvedCredential> {
        self.cached.read().await.clone()
    }
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn load_storage_config(&self) -> Result<Option<StorageConfig>, BoxError> {
        Ok(self.config.read().await.clone())
    }

    async fn load_cached_credential(&self) -> Result<Option<ResolvedCredential>, BoxError> {
        Ok(self.cached.read().await.clone())
    }

    async fn store_cached_credential(
        &self,
        credential: &ResolvedCredential,
    ) -> Result<(), BoxError> {
        *self.cached.write().await = Some(credential.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use jiff::SignedDuration;

    use super::*;
    use crate::config::{LongLivedConfig, RoleAssumptionConfig, StorageProfile};

    fn fresh_credential() -> ResolvedCredential {
        ResolvedCredential {
            access_key_id: "AKIA_FRESH".to_owned(),
            secret_access_key: "secret".to_owned(),
            session_token: Some("session".to_owned()),
            expires_at: Some(Timestamp::now() + SignedDuration::from_hours(1)),
        }
    }

    fn expired_credential() -> ResolvedCredential {
        ResolvedCredential {
            access_key_id: "AKIA_STALE".to_owned(),
            secret_access_key: "secret".to_owned(),
            session_token: None,
            expires_at: Some(Timestamp::now() - SignedDuration::from_secs(60)),
        }
    }

    fn long_lived_config() -> StorageConfig {
        StorageConfig {
            profile: StorageProfile::new("quill-media", "us-east-1"),
            credentials: CredentialStrategyConfig::LongLived(LongLivedConfig {
                access_key_id: Some("AKIA_TEST".to_owned()),
                secret_access_key: Some("secret".to_owned()),
            }),
        }
    }

    fn role_assumption_config() -> StorageConfig {
        StorageConfig {
            profile: StorageProfile::new("quill-media", "us-east-1"),
            credentials: CredentialStrategyConfig::RoleAssumption(RoleAssumptionConfig {
                role_arn: Some("arn:aws:iam::123456789012:role/media".to_owned()),
                sts_region: Some("us-east-1".to_owned()),
                base_access_key_id: Some("AKIA_BASE".to_owned()),
                base_secret_access_key: Some("secret".to_owned()),
                external_id: None,
            }),
        }
    }

    /// Provider that replays a script of outcomes, then keeps returning
    /// fresh credentials. Shared across factory invocations.
    #[derive(Clone)]
    struct ScriptedProvider {
        strategy: Strategy,
        calls: Arc<AtomicUsize>,
        script: Arc<StdMutex<VecDeque<CredentialResult<ResolvedCredential>>>>,
    }

    impl ScriptedProvider {
        fn new(strategy: Strategy) -> Self {
            Self {
                strategy,
                calls: Arc::new(AtomicUsize::new(0)),
                script: Arc::new(StdMutex::new(VecDeque::new())),
            }
        }

        fn push(&self, outcome: CredentialResult<ResolvedCredential>) {
            self.script.lock().unwrap().push_back(outcome);
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn factory(&self) -> ProviderFactory {
            let provider = self.clone();
            Arc::new(move |_| Box::new(provider.clone()) as Box<dyn CredentialProvider>)
        }
    }

    #[async_trait]
    impl CredentialProvider for ScriptedProvider {
        fn strategy(&self) -> Strategy {
            self.strategy
        }

        async fn resolve(&self) -> CredentialResult<ResolvedCredential> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.script.lock().unwrap().pop_front() {
                Some(outcome) => outcome,
                None => Ok(fresh_credential()),
            }
        }
    }

    fn manager_with(
        config: StorageConfig,
        provider: &ScriptedProvider,
    ) -> (CredentialManager, Arc<InMemorySettingsStore>) {
        let store = Arc::new(InMemorySettingsStore::new(config));
        let manager = CredentialManager::with_provider_factory(store.clone(), provider.factory());
        (manager, store)
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_resolution() {
        let provider = ScriptedProvider::new(Strategy::LongLived);
        let (manager, _) = manager_with(long_lived_config(), &provider);

        let mut handles = Vec::new();
        for _ in 0..16 {
            let manager = manager.clone();
            handles.push(tokio::spawn(async move { manager.credentials().await }));
        }

        let mut credentials = Vec::new();
        for handle in handles {
            credentials.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(provider.calls(), 1);
        for credential in &credentials[1..] {
            assert!(Arc::ptr_eq(&credentials[0], credential));
        }
    }

    #[tokio::test]
    async fn expired_credentials_are_never_served() {
        let provider = ScriptedProvider::new(Strategy::LongLived);
        provider.push(Ok(expired_credential()));
        let (manager, _) = manager_with(long_lived_config(), &provider);

        let credential = manager.credentials().await.unwrap();
        assert!(!credential.is_expired());
        assert_eq!(credential.access_key_id, "AKIA_FRESH");
        // One resolution during initialize, one refresh after spotting
        // the expired result.
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn role_sessions_are_persisted_after_resolution() {
        let provider = ScriptedProvider::new(Strategy::RoleAssumption);
        let (manager, store) = manager_with(role_assumption_config(), &provider);

        let credential = manager.credentials().await.unwrap();

        let persisted = store.cached_credential().await.unwrap();
        assert_eq!(persisted, *credential);

        let remaining = persisted.remaining().unwrap();
        assert!(remaining > SignedDuration::from_mins(59));
        assert!(remaining <= SignedDuration::from_hours(1));
    }

    #[tokio::test]
    async fn warm_start_adopts_persisted_role_session() {
        let provider = ScriptedProvider::new(Strategy::RoleAssumption);
        let store = Arc::new(InMemorySettingsStore::new(role_assumption_config()));
        let seeded = fresh_credential();
        store.seed_cached_credential(seeded.clone()).await;

        let manager = CredentialManager::with_provider_factory(store, provider.factory());

        let credential = manager.credentials().await.unwrap();
        assert_eq!(*credential, seeded);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn missing_configuration_fails_with_remediation() {
        let provider = ScriptedProvider::new(Strategy::LongLived);
        let store = Arc::new(InMemorySettingsStore::default());
        let manager = CredentialManager::with_provider_factory(store, provider.factory());

        let error = manager.credentials().await.unwrap_err();
        assert!(matches!(error, CredentialError::NotConfigured));

        let status = manager.status().await;
        assert_eq!(status.phase, LifecyclePhase::Failed);
        assert!(!status.healthy);
        assert!(status.last_error.is_some());
    }

    #[tokio::test]
    async fn failed_manager_recovers_on_next_call() {
        let provider = ScriptedProvider::new(Strategy::LongLived);
        provider.push(Err(CredentialError::upstream_auth("transient outage")));
        let (manager, _) = manager_with(long_lived_config(), &provider);

        let error = manager.credentials().await.unwrap_err();
        assert!(matches!(error, CredentialError::UpstreamAuth { .. }));
        assert_eq!(manager.status().await.phase, LifecyclePhase::Failed);

        let credential = manager.credentials().await.unwrap();
        assert!(!credential.is_expired());
        assert_eq!(manager.status().await.phase, LifecyclePhase::Ready);
    }

    #[tokio::test]
    async fn refresh_now_replaces_a_valid_credential() {
        let provider = ScriptedProvider::new(Strategy::LongLived);
        let (manager, _) = manager_with(long_lived_config(), &provider);

        let first = manager.credentials().await.unwrap();
        let second = manager.refresh_now().await.unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn reinitialize_picks_up_new_configuration() {
        let provider = ScriptedProvider::new(Strategy::LongLived);
        let (manager, store) = manager_with(long_lived_config(), &provider);

        manager.credentials().await.unwrap();
        assert_eq!(
            manager.status().await.strategy,
            Some(Strategy::LongLived)
        );

        store.set_config(role_assumption_config()).await;
        manager.reinitialize().await.unwrap();

        assert_eq!(
            manager.status().await.strategy,
            Some(Strategy::RoleAssumption)
        );
    }
}
