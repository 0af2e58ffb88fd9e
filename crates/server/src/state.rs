//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ServerConfig;
use crate::services::auth::AuthService;
use crate::services::checkout::CheckoutService;
use crate::services::mirror::MirrorStore;
use crate::services::notify::Notifier;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
    mirror: Option<MirrorStore>,
    notifier: Notifier,
}

impl AppState {
    /// Create a new application state.
    ///
    /// The mirror store is non-critical: when it is configured but
    /// unreachable at startup, mirroring is disabled with a warning rather
    /// than failing the boot.
    pub async fn new(config: ServerConfig, pool: PgPool) -> Self {
        let mirror = match config.mirror.url.as_deref() {
            Some(url) => match MirrorStore::connect(url).await {
                Ok(store) => {
                    tracing::info!("mirror store connected");
                    Some(store)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "mirror store unreachable, mirroring disabled");
                    None
                }
            },
            None => None,
        };

        let notifier = Notifier::from_config(mirror.as_ref(), &config.mirror);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                mirror,
                notifier,
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the mirror store, if configured and reachable.
    #[must_use]
    pub fn mirror(&self) -> Option<&MirrorStore> {
        self.inner.mirror.as_ref()
    }

    /// Get a reference to the notification dispatcher.
    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }

    /// Build an authentication service over the pool.
    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(self.pool())
    }

    /// Build a checkout service over the pool, mirror, and notifier.
    #[must_use]
    pub fn checkout(&self) -> CheckoutService<'_> {
        CheckoutService::new(self.pool(), self.mirror(), self.notifier())
    }
}
