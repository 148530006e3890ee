use async_trait::async_trait;

use super::{
    AssumeRoleProvider, IdentityCenterProvider, LongLivedProvider, ResolvedCredential,
    StaticTemporaryProvider, WebIdentityProvider,
};
use crate::config::{CredentialStrategyConfig, Strategy};
use crate::error::CredentialResult;

/// Turns persisted strategy configuration into usable credentials.
///
/// Implementations validate their configuration at resolution time and
/// never retry internally; the lifecycle manager decides when to call
/// again.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Strategy this provider implements.
    fn strategy(&self) -> Strategy;

    /// Resolves a fresh credential from configuration.
    async fn resolve(&self) -> CredentialResult<ResolvedCredential>;
}

/// Builds the provider matching the configured strategy.
pub fn provider_for(config: &CredentialStrategyConfig) -> Box<dyn CredentialProvider> {
    match config {
        CredentialStrategyConfig::StaticTemporary(config) => {
            Box::new(StaticTemporaryProvider::new(config.clone()))
        }
        CredentialStrategyConfig::IdentityCenterSso(config) => {
            Box::new(IdentityCenterProvider::new(config.clone()))
        }
        CredentialStrategyConfig::RoleAssumption(config) => {
            Box::new(AssumeRoleProvider::new(config.clone()))
        }
        CredentialStrategyConfig::WebIdentity(config) => {
            Box::new(WebIdentityProvider::new(config.clone()))
        }
        CredentialStrategyConfig::LongLived(config) => {
            Box::new(LongLivedProvider::new(config.clone()))
        }
    }
}
