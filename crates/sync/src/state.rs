//! Application state shared across handlers.

use std::sync::Arc;

use crate::channel::{ChannelClient, ChannelError};
use crate::config::SyncConfig;
use crate::tenant::TenantRegistry;

/// Application state shared across all handlers.
///
/// Holds only tenant-agnostic pieces: the tenant registry hands out
/// per-tenant contexts and the channel client resolves credentials through
/// the current context. Nothing here is tenant-scoped mutable state.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: SyncConfig,
    registry: TenantRegistry,
    channel: ChannelClient,
}

impl AppState {
    /// Build the application state from configuration.
    ///
    /// # Errors
    ///
    /// Returns `ChannelError` if the channel HTTP client cannot be
    /// constructed.
    pub fn new(config: SyncConfig) -> Result<Self, ChannelError> {
        let registry = TenantRegistry::new(&config.tenants);
        let channel = ChannelClient::new(&config.channel)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                registry,
                channel,
            }),
        })
    }

    /// Server configuration.
    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    /// Tenant registry.
    #[must_use]
    pub fn registry(&self) -> &TenantRegistry {
        &self.inner.registry
    }

    /// Channel API client.
    #[must_use]
    pub fn channel(&self) -> &ChannelClient {
        &self.inner.channel
    }
}
