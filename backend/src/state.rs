//! Application state management
//!
//! Shared resources passed to every handler through Axum's state
//! extraction. Everything expensive (JWT keys, the pool) is built once at
//! startup and is cheap to clone afterwards.

use crate::auth::JwtService;
use crate::config::AppConfig;
use crate::uploads::AvatarStore;
use sqlx::PgPool;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Pre-initialized JWT service with cached keys
    pub jwt: JwtService,
    pub avatars: Arc<AvatarStore>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Derives the JWT keys from the configured secret; call once at startup.
    pub fn new(db: PgPool, config: AppConfig) -> Self {
        let jwt = JwtService::new(
            &config.jwt.secret,
            config.jwt.registration_token_expiry_secs,
            config.jwt.login_token_expiry_secs,
        );
        let avatars = AvatarStore::from_config(&config.uploads);

        Self {
            db,
            config: Arc::new(config),
            jwt,
            avatars: Arc::new(avatars),
        }
    }

    #[inline]
    pub fn db(&self) -> &PgPool {
        &self.db
    }

    #[inline]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[inline]
    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    #[inline]
    pub fn avatars(&self) -> &AvatarStore {
        &self.avatars
    }
}
