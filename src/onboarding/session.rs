//! Session bridge — hands a completed onboarding over to authentication.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use secrecy::SecretString;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::model::ExtractedIdentity;
use crate::error::SessionError;

/// Length of generated session tokens.
const TOKEN_LEN: usize = 48;

/// Receives the verified identity once onboarding reaches `Complete`.
#[async_trait]
pub trait SessionBridge: Send + Sync {
    async fn on_onboarding_complete(&self, identity: &ExtractedIdentity);
}

/// An authenticated session minted from a completed onboarding.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub session_id: Uuid,
    pub token: SecretString,
    pub subject_name: String,
    pub national_id: String,
    pub issued_at: DateTime<Utc>,
}

/// Mints one [`AuthSession`] and holds it in memory for the host app to
/// collect. Storing the token securely is the host's job.
#[derive(Debug, Default)]
pub struct InMemorySessionBridge {
    session: RwLock<Option<AuthSession>>,
}

impl InMemorySessionBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// The issued session, if onboarding has completed.
    pub async fn session(&self) -> Option<AuthSession> {
        self.session.read().await.clone()
    }

    /// Mint a session for `identity`. Fails if one was already issued.
    pub async fn issue(&self, identity: &ExtractedIdentity) -> Result<AuthSession, SessionError> {
        let mut slot = self.session.write().await;
        if slot.is_some() {
            return Err(SessionError::AlreadyIssued);
        }

        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LEN)
            .map(char::from)
            .collect();

        let session = AuthSession {
            session_id: Uuid::new_v4(),
            token: SecretString::from(token),
            subject_name: identity.name.clone(),
            national_id: identity.national_id.clone(),
            issued_at: Utc::now(),
        };
        *slot = Some(session.clone());
        Ok(session)
    }
}

#[async_trait]
impl SessionBridge for InMemorySessionBridge {
    async fn on_onboarding_complete(&self, identity: &ExtractedIdentity) {
        match self.issue(identity).await {
            Ok(session) => tracing::info!(
                session_id = %session.session_id,
                subject = %session.subject_name,
                "Authentication session issued"
            ),
            Err(e) => tracing::warn!(error = %e, "Session hand-off skipped"),
        }
    }
}
