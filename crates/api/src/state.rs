//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::services::notifications::WhatsAppNotifier;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    notifier: WhatsAppNotifier,
}

impl AppState {
    /// Build the state from loaded configuration and an open pool.
    #[must_use]
    pub fn new(config: ApiConfig, pool: PgPool) -> Self {
        let notifier = WhatsAppNotifier::new(config.whatsapp.clone());
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                notifier,
            }),
        }
    }

    /// The loaded configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// The database pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// The order notification sink.
    #[must_use]
    pub fn notifier(&self) -> &WhatsAppNotifier {
        &self.inner.notifier
    }
}
