//! Identity provider seam.
//!
//! Every call-initiating operation asks the provider for the signed-in user;
//! the app's auth layer implements [`IdentityProvider`].

use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{CallError, Result};

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The authenticated user, or [`CallError::Auth`].
    async fn current_user(&self) -> Result<Uuid>;
}

/// An identity held in memory, set and cleared by the embedding app.
#[derive(Debug, Default)]
pub struct StaticIdentity {
    user: RwLock<Option<Uuid>>,
}

impl StaticIdentity {
    pub fn signed_in(user_id: Uuid) -> Self {
        Self {
            user: RwLock::new(Some(user_id)),
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, user_id: Uuid) {
        *self.user.write().unwrap_or_else(|e| e.into_inner()) = Some(user_id);
    }

    pub fn sign_out(&self) {
        *self.user.write().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current_user(&self) -> Result<Uuid> {
        let user = *self.user.read().unwrap_or_else(|e| e.into_inner());
        user.ok_or(CallError::Auth)
    }
}
