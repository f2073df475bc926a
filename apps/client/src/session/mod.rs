pub mod store;

use std::sync::Arc;

use tracing::info;

use crate::errors::ClientError;

pub use store::{FileTokenStore, MemoryTokenStore, TokenStore, AUTH_TOKEN_KEY};

/// The authenticated session: at most one bearer token, mirrored in a `TokenStore`.
///
/// Lifecycle: `init` loads whatever token was persisted, `set_token` replaces it
/// after a login, `teardown` wipes both the stored and the held copy.
pub struct Session {
    store: Arc<dyn TokenStore>,
    token: Option<String>,
}

impl Session {
    pub async fn init(store: Arc<dyn TokenStore>) -> Result<Self, ClientError> {
        let token = store.load().await?;
        if token.is_some() {
            info!("Restored persisted session");
        }
        Ok(Self { store, token })
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn require_token(&self) -> Result<&str, ClientError> {
        self.token().ok_or(ClientError::Unauthenticated)
    }

    /// Persists first; the held token only changes once storage succeeded.
    pub async fn set_token(&mut self, token: String) -> Result<(), ClientError> {
        self.store.save(&token).await?;
        self.token = Some(token);
        Ok(())
    }

    pub async fn teardown(&mut self) -> Result<(), ClientError> {
        self.token = None;
        self.store.clear().await?;
        Ok(())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}
