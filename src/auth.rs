//! Supabase (GoTrue) account flows and auth-state notifications.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::Config;
use crate::storage::supabase::{api_error, SupabaseClient, SupabaseError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    pub user: AuthUser,
}

/// Result of a sign-up: a session only when email confirmation is off
#[derive(Debug, Clone, PartialEq)]
pub struct SignUpOutcome {
    pub user: Option<AuthUser>,
    pub session: Option<AuthSession>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    PasswordRecovery,
}

/// Email/password auth against Supabase.
///
/// Shares its session with the [`SupabaseClient`] it was built from.
pub struct SupabaseAuth {
    supabase: SupabaseClient,
    redirect_url: String,
    events: watch::Sender<AuthEvent>,
}

impl SupabaseAuth {
    pub fn new(supabase: SupabaseClient, config: &Config) -> Self {
        let (events, _) = watch::channel(AuthEvent::InitialSession);
        Self {
            supabase,
            redirect_url: config.auth_redirect_url(),
            events,
        }
    }

    /// Latest auth event; receivers see every change after subscribing
    pub fn subscribe(&self) -> watch::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    pub fn redirect_url(&self) -> &str {
        &self.redirect_url
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, SupabaseError> {
        let url = self.supabase.url("/auth/v1/signup");
        let request = self
            .supabase
            .http()
            .post(&url)
            .query(&[("redirect_to", self.redirect_url.as_str())])
            .json(&json!({ "email": email, "password": password }));
        let body: Value = self.send_json(request).await?;

        // With autoconfirm on GoTrue answers with a session, otherwise with the bare user
        if body.get("access_token").is_some() {
            let session: AuthSession = serde_json::from_value(body)
                .map_err(|e| SupabaseError::InvalidResponse(e.to_string()))?;
            self.store(Some(session.clone()), AuthEvent::SignedIn).await;
            Ok(SignUpOutcome {
                user: Some(session.user.clone()),
                session: Some(session),
            })
        } else {
            let user = serde_json::from_value(body).ok();
            Ok(SignUpOutcome {
                user,
                session: None,
            })
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, SupabaseError> {
        let url = self.supabase.url("/auth/v1/token");
        let request = self
            .supabase
            .http()
            .post(&url)
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));
        let session: AuthSession = self.send_json(request).await?;

        info!("Signed in user {}", session.user.id);
        self.store(Some(session.clone()), AuthEvent::SignedIn).await;
        Ok(session)
    }

    /// Exchanges an emailed token hash (signup confirmation, recovery) for a session
    pub async fn verify_otp(&self, token_hash: &str, kind: &str) -> Result<AuthSession, SupabaseError> {
        let url = self.supabase.url("/auth/v1/verify");
        let request = self
            .supabase
            .http()
            .post(&url)
            .json(&json!({ "token_hash": token_hash, "type": kind }));
        let session: AuthSession = self.send_json(request).await?;

        let event = if kind == "recovery" {
            AuthEvent::PasswordRecovery
        } else {
            AuthEvent::SignedIn
        };
        self.store(Some(session.clone()), event).await;
        Ok(session)
    }

    pub async fn reset_password(&self, email: &str) -> Result<(), SupabaseError> {
        let url = self.supabase.url("/auth/v1/recover");
        let request = self
            .supabase
            .http()
            .post(&url)
            .query(&[("redirect_to", self.redirect_url.as_str())])
            .json(&json!({ "email": email }));
        let response = self.supabase.authorize(request).await.send().await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(api_error(status, response.text().await.unwrap_or_default()))
        }
    }

    pub async fn current_session(&self) -> Option<AuthSession> {
        self.supabase.session().await
    }

    /// User as the server sees it for the current token
    pub async fn current_user(&self) -> Result<AuthUser, SupabaseError> {
        let url = self.supabase.url("/auth/v1/user");
        let request = self.supabase.http().get(&url);
        self.send_json(request).await
    }

    pub async fn current_user_id(&self) -> Option<String> {
        if self.supabase.session().await.is_none() {
            return None;
        }
        match self.current_user().await {
            Ok(user) => Some(user.id),
            Err(e) => {
                warn!("Error getting current user ID: {}", e);
                None
            }
        }
    }

    /// Revokes the token server-side; the local session is cleared either way
    pub async fn sign_out(&self) -> Result<(), SupabaseError> {
        let result = if self.supabase.session().await.is_some() {
            let url = self.supabase.url("/auth/v1/logout");
            let request = self.supabase.http().post(&url);
            match self.supabase.authorize(request).await.send().await {
                Ok(response) if response.status().is_success() => Ok(()),
                Ok(response) => {
                    let status = response.status();
                    Err(api_error(status, response.text().await.unwrap_or_default()))
                }
                Err(e) => Err(SupabaseError::HttpError(e)),
            }
        } else {
            Ok(())
        };

        self.store(None, AuthEvent::SignedOut).await;
        result
    }

    async fn store(&self, session: Option<AuthSession>, event: AuthEvent) {
        self.supabase.set_session(session).await;
        self.events.send_replace(event);
    }

    async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, SupabaseError> {
        let response = self.supabase.authorize(request).await.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(api_error(status, response.text().await.unwrap_or_default()));
        }
        response
            .json()
            .await
            .map_err(|e| SupabaseError::InvalidResponse(e.to_string()))
    }
}
