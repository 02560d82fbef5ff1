//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::broadcast;

use crate::catalog::Catalog;
use crate::config::StorefrontConfig;
use crate::context::ContextChange;
use crate::services::email::EmailService;
use crate::services::notifications::Dispatcher;

/// Buffered context events per subscriber before it starts lagging.
const CONTEXT_EVENT_CAPACITY: usize = 256;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    catalog: Catalog,
    email: Option<EmailService>,
    context_events: broadcast::Sender<ContextChange>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// SMTP is optional; without it notices are recorded in-app only.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP relay configuration is invalid.
    pub fn new(
        config: StorefrontConfig,
        pool: PgPool,
    ) -> Result<Self, lettre::transport::smtp::Error> {
        let catalog = Catalog::new(&config.catalog);
        let email = config.email.as_ref().map(EmailService::new).transpose()?;
        let (context_events, _) = broadcast::channel(CONTEXT_EVENT_CAPACITY);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                catalog,
                email,
                context_events,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// The configured catalog backend.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    /// SMTP email service, when configured.
    #[must_use]
    pub fn email(&self) -> Option<&EmailService> {
        self.inner.email.as_ref()
    }

    /// Notification dispatcher bound to this state.
    #[must_use]
    pub fn notifier(&self) -> Dispatcher<'_> {
        Dispatcher::new(self.pool(), self.email(), &self.inner.config.base_url)
    }

    /// Sender for shopper context changes.
    #[must_use]
    pub fn context_events(&self) -> &broadcast::Sender<ContextChange> {
        &self.inner.context_events
    }
}
