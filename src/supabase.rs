//! Supabase Auth Client
//!
//! HTTP implementation of [`AuthService`] against the hosted GoTrue API.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::auth::{mask_email, Session, User};
use crate::config::{Config, ConfigError};
use crate::service::{
    AuthChangeEvent, AuthError, AuthListener, AuthListeners, AuthService, SignUpResult,
    Subscription,
};
use crate::storage::SessionFileStore;

const SESSION_KEY: &str = "session";

/// Auth client for the hosted service
pub struct SupabaseAuthClient {
    auth_url: String,
    anon_key: String,
    client: reqwest::Client,
    session: Mutex<Option<Session>>,
    storage: Option<SessionFileStore>,
    listeners: AuthListeners,
}

impl SupabaseAuthClient {
    /// Create a new auth client. Sessions live in memory only until
    /// [`SupabaseAuthClient::with_storage`] is used.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            auth_url: format!("{}/auth/v1", config.supabase_url),
            anon_key: config.anon_key.clone(),
            client,
            session: Mutex::new(None),
            storage: None,
            listeners: AuthListeners::new(),
        })
    }

    /// Persist sessions in `storage`
    pub fn with_storage(mut self, storage: SessionFileStore) -> Self {
        self.storage = Some(storage);
        self
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.auth_url, path);
        debug!("{} {}", method, url);
        self.client
            .request(method, url)
            .header("apikey", &self.anon_key)
    }

    fn slot(&self) -> MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Session held in memory, falling back to the persisted one
    fn current_session(&self) -> Option<Session> {
        if let Some(session) = self.slot().clone() {
            return Some(session);
        }

        let storage = self.storage.as_ref()?;
        match storage.load::<Session>(SESSION_KEY) {
            Ok(session) => session,
            Err(e) => {
                warn!("Ignoring unreadable stored session: {}", e);
                None
            }
        }
    }

    fn store_session(&self, session: &Session) {
        *self.slot() = Some(session.clone());

        if let Some(storage) = &self.storage {
            if let Err(e) = storage.save(SESSION_KEY, session) {
                error!("Failed to save session: {}", e);
            }
        }
    }

    fn clear_session(&self) {
        *self.slot() = None;

        if let Some(storage) = &self.storage {
            if let Err(e) = storage.delete(SESSION_KEY) {
                error!("Failed to delete stored session: {}", e);
            }
        }
    }

    async fn send(builder: RequestBuilder) -> Result<Response, AuthError> {
        builder
            .send()
            .await
            .map_err(|e| AuthError::NetworkFailure(e.to_string()))
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, AuthError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_error_response(status.as_u16(), &body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AuthError::UnexpectedResponse(e.to_string()))
    }
}

#[async_trait]
impl AuthService for SupabaseAuthClient {
    async fn get_session(&self) -> Result<Option<Session>, AuthError> {
        match self.current_session() {
            Some(session) if session.is_expired() => {
                info!("Stored session is expired");
                self.clear_session();
                Ok(None)
            }
            Some(session) => {
                *self.slot() = Some(session.clone());
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<Session>, AuthError> {
        debug!("Signing in with password: {}", mask_email(email));

        let response = Self::send(
            self.request(Method::POST, "/token?grant_type=password")
                .json(&Credentials { email, password }),
        )
        .await?;
        let session = with_expiry(Self::parse(response).await?);

        self.store_session(&session);
        self.listeners.notify(AuthChangeEvent::SignedIn, Some(&session));

        info!("Signed in user: {}", session.user.id);
        Ok(Some(session))
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpResult, AuthError> {
        debug!("Signing up: {}", mask_email(email));

        let response = Self::send(
            self.request(Method::POST, "/signup")
                .json(&Credentials { email, password }),
        )
        .await?;

        match Self::parse::<SignUpResponse>(response).await? {
            SignUpResponse::Session(session) => {
                let session = with_expiry(session);
                self.store_session(&session);
                self.listeners.notify(AuthChangeEvent::SignedIn, Some(&session));
                info!("Signed up and signed in user: {}", session.user.id);
                Ok(SignUpResult {
                    user: Some(session.user.clone()),
                    session: Some(session),
                })
            }
            SignUpResponse::User(user) => {
                info!("Signed up user awaiting confirmation: {}", user.id);
                Ok(SignUpResult {
                    user: Some(user),
                    session: None,
                })
            }
        }
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if let Some(session) = self.current_session() {
            let response = Self::send(
                self.request(Method::POST, "/logout")
                    .bearer_auth(&session.access_token),
            )
            .await?;

            let status = response.status();
            // The session is already gone server-side for these.
            let already_gone = matches!(
                status,
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND
            );
            if !status.is_success() && !already_gone {
                let body = response.text().await.unwrap_or_default();
                return Err(map_error_response(status.as_u16(), &body));
            }
        }

        self.clear_session();
        self.listeners.notify(AuthChangeEvent::SignedOut, None);

        info!("Signed out");
        Ok(())
    }

    fn on_auth_state_change(&self, listener: AuthListener) -> Subscription {
        self.listeners.register(listener)
    }
}

/// Stamp an absolute expiry on sessions that only carry `expires_in`
fn with_expiry(mut session: Session) -> Session {
    if session.expires_at.is_none() {
        session.expires_at = Some(Utc::now().timestamp() + session.expires_in);
    }
    session
}

/// Map a failed HTTP response onto an [`AuthError`] kind
pub fn map_error_response(status: u16, body: &str) -> AuthError {
    let body: ErrorResponse = serde_json::from_str(body).unwrap_or_default();
    let kind = body.kind();
    let message = body.message().unwrap_or_else(|| format!("HTTP {}", status));

    match (status, kind.as_deref()) {
        (429, _) | (_, Some("over_request_rate_limit" | "over_email_send_rate_limit")) => {
            AuthError::RateLimited
        }
        (500..=599, _) => AuthError::ServiceUnavailable(message),
        (_, Some("email_not_confirmed")) => AuthError::EmailNotConfirmed,
        (_, Some("invalid_grant")) if message.eq_ignore_ascii_case("email not confirmed") => {
            AuthError::EmailNotConfirmed
        }
        (_, Some("invalid_grant" | "invalid_credentials")) => AuthError::InvalidCredentials,
        (_, Some("user_already_exists" | "email_exists")) => AuthError::UserAlreadyRegistered,
        (_, Some("weak_password")) => AuthError::WeakPassword(message),
        (422, _) if message.to_lowercase().contains("already registered") => {
            AuthError::UserAlreadyRegistered
        }
        _ => AuthError::Rejected { status, message },
    }
}

// Request/Response types

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(Session),
    User(User),
}

/// Error body; the service has used several shapes over time
#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    error_code: Option<String>,
    error: Option<String>,
    code: Option<serde_json::Value>,
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
}

impl ErrorResponse {
    fn kind(&self) -> Option<String> {
        self.error_code
            .clone()
            .or_else(|| match &self.code {
                Some(serde_json::Value::String(code)) => Some(code.clone()),
                _ => None,
            })
            .or_else(|| self.error.clone())
    }

    fn message(&self) -> Option<String> {
        self.msg
            .clone()
            .or_else(|| self.message.clone())
            .or_else(|| self.error_description.clone())
            .or_else(|| self.error.clone())
    }
}
