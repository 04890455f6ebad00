//! Session manager: credential pool, lazy login, token refresh, rotation.
//!
//! One [`Session`] exists per configured credential. Credentials are logged
//! in lazily on first use, in configured order, before the pool falls back to
//! round-robin reuse — front-loading each login exactly once while spreading
//! requests evenly so the per-credential rate stays near
//! `global rate / pool size`.
//!
//! Login and refresh for a given credential are at-most-once-in-flight: the
//! per-slot mutex is held for the whole exchange, so concurrent acquirers of
//! the same credential await the in-flight attempt and share its result.
//! Duplicate logins waste rate-limit budget and can invalidate the sibling
//! session on the remote side.

use crate::client::{ApiClient, HttpMethod};
use crate::config::{ApiConfig, AuthConfig, Credential};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;

/// An authenticated credential's current token pair and expiry
#[derive(Clone, Debug)]
pub struct Session {
    /// Credential identifier this session belongs to
    pub identifier: String,
    /// Current access token
    pub access_token: String,
    /// Current refresh token
    pub refresh_token: String,
    /// When the access token stops being considered fresh
    pub expires_at: DateTime<Utc>,
}

/// Snapshot of a session handed out for one request
///
/// The underlying slot may refresh its tokens concurrently; a handle stays
/// valid for the single request it was acquired for.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    /// Index of the credential slot this handle came from
    pub slot: usize,
    /// Credential identifier
    pub identifier: String,
    /// Access token to authorize the request with
    pub access_token: String,
}

struct SessionSlot {
    credential: Credential,
    /// Set once a login for this credential has been attempted (success or
    /// not), so the in-order scan moves on to the next credential
    attempted: AtomicBool,
    state: Mutex<Option<Session>>,
}

/// Owns the credential pool and hands out ready sessions
pub struct SessionManager {
    client: Arc<ApiClient>,
    login_path: String,
    refresh_path: String,
    token_ttl: chrono::Duration,
    slots: Vec<SessionSlot>,
    /// Round-robin cursor over the slots
    cursor: AtomicUsize,
}

impl SessionManager {
    /// Build a manager over the configured credential pool
    pub fn new(
        client: Arc<ApiClient>,
        api: &ApiConfig,
        auth: &AuthConfig,
        credentials: &[Credential],
    ) -> Self {
        let slots = credentials
            .iter()
            .map(|credential| SessionSlot {
                credential: credential.clone(),
                attempted: AtomicBool::new(false),
                state: Mutex::new(None),
            })
            .collect();

        Self {
            client,
            login_path: api.login_path.clone(),
            refresh_path: api.refresh_path.clone(),
            token_ttl: chrono::Duration::from_std(auth.token_ttl)
                .unwrap_or_else(|_| chrono::Duration::seconds(200)),
            slots,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Number of credentials in the pool
    pub fn pool_size(&self) -> usize {
        self.slots.len()
    }

    /// Acquire a session ready for immediate use
    ///
    /// Picks the next credential (unauthenticated ones first, in configured
    /// order, then round-robin), logging in or refreshing as needed. A
    /// login/refresh failure surfaces as [`Error::Auth`] and does not poison
    /// the rest of the pool — the caller's retry loop will rotate onward.
    pub async fn acquire(&self) -> Result<SessionHandle> {
        if self.slots.is_empty() {
            return Err(Error::NoCredentials);
        }

        let index = self.next_slot();
        self.ensure_fresh(index, false).await
    }

    /// Ensure the session in `slot` is authenticated and fresh
    ///
    /// With `force`, performs the refresh exchange even if the token has not
    /// expired yet. Safe to call before every request.
    pub async fn ensure_fresh(&self, slot: usize, force: bool) -> Result<SessionHandle> {
        let Some(slot_ref) = self.slots.get(slot) else {
            return Err(Error::Other(format!(
                "session slot {slot} out of range (pool size {})",
                self.slots.len()
            )));
        };
        let mut state = slot_ref.state.lock().await;

        match state.as_mut() {
            None => {
                let session = self.login(&slot_ref.credential).await?;
                let handle = SessionHandle {
                    slot,
                    identifier: session.identifier.clone(),
                    access_token: session.access_token.clone(),
                };
                *state = Some(session);
                Ok(handle)
            }
            Some(session) => {
                if force || Utc::now() >= session.expires_at {
                    match self.refresh(session).await {
                        Ok(()) => {}
                        Err(e) => {
                            // Drop the stale session so the next acquire
                            // re-runs a full login for this credential
                            *state = None;
                            return Err(e);
                        }
                    }
                }
                Ok(SessionHandle {
                    slot,
                    identifier: session.identifier.clone(),
                    access_token: session.access_token.clone(),
                })
            }
        }
    }

    /// Pick the next slot: first never-attempted credential in configured
    /// order, else round-robin
    fn next_slot(&self) -> usize {
        for (index, slot) in self.slots.iter().enumerate() {
            if slot
                .attempted
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return index;
            }
        }
        self.cursor.fetch_add(1, Ordering::SeqCst) % self.slots.len()
    }

    /// Perform the login exchange for one credential
    async fn login(&self, credential: &Credential) -> Result<Session> {
        let body = json!({
            "identifier": credential.identifier,
            "secret": credential.secret,
        });

        // Never cached, never authenticated: the login endpoint is reached
        // through the raw client, outside the executor
        let response = self
            .client
            .request(HttpMethod::Post, &self.login_path, Some(&body), None)
            .await
            .map_err(|e| Error::Auth {
                identifier: credential.identifier.clone(),
                reason: e.to_string(),
            })?;

        let (access_token, refresh_token) =
            extract_tokens(&response).ok_or_else(|| Error::Auth {
                identifier: credential.identifier.clone(),
                reason: "login response is missing token fields".to_string(),
            })?;

        tracing::info!(identifier = %credential.identifier, "logged in");

        Ok(Session {
            identifier: credential.identifier.clone(),
            access_token,
            refresh_token,
            expires_at: Utc::now() + self.token_ttl,
        })
    }

    /// Perform the refresh exchange, replacing both tokens and extending expiry
    async fn refresh(&self, session: &mut Session) -> Result<()> {
        let body = json!({"refreshToken": session.refresh_token});

        let response = self
            .client
            .request(HttpMethod::Post, &self.refresh_path, Some(&body), None)
            .await
            .map_err(|e| Error::Auth {
                identifier: session.identifier.clone(),
                reason: e.to_string(),
            })?;

        let (access_token, refresh_token) =
            extract_tokens(&response).ok_or_else(|| Error::Auth {
                identifier: session.identifier.clone(),
                reason: "refresh response is missing token fields".to_string(),
            })?;

        session.access_token = access_token;
        session.refresh_token = refresh_token;
        session.expires_at = Utc::now() + self.token_ttl;

        tracing::debug!(identifier = %session.identifier, "token refreshed");

        Ok(())
    }
}

/// Pull the access/refresh token pair out of an auth response
fn extract_tokens(response: &Value) -> Option<(String, String)> {
    let access = response.get("token").and_then(Value::as_str)?;
    let refresh = response.get("refreshToken").and_then(Value::as_str)?;
    Some((access.to_string(), refresh.to_string()))
}
