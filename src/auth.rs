//! Authentication Module
//!
//! Session types and the session store that mirrors the auth service's
//! session state for the UI layer.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, warn};

use crate::service::{AuthChangeEvent, AuthError, AuthService, SignUpResult, Subscription};

const EVENT_CAPACITY: usize = 32;

/// Authenticated principal as reported by the auth service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub email_confirmed_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

/// Session issued by the auth service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: i64,
    /// Unix timestamp (seconds)
    pub expires_at: Option<i64>,
    pub refresh_token: String,
    pub user: User,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl Session {
    /// Check if the session is expired
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires_at| Utc::now().timestamp() >= expires_at)
    }
}

/// Snapshot of the session store.
///
/// Authentication is derived from the presence of a user, so the two can
/// never disagree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    user: Option<User>,
    initialized: bool,
}

impl SessionState {
    /// Check if a user is present
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Check if the first session check has settled
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }
}

/// Events emitted by the session store
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// An explicit login opened a session
    LoggedIn(User),
    /// An explicit logout closed the session
    LoggedOut,
    /// The auth service pushed a change on its own
    StateChanged {
        event: AuthChangeEvent,
        authenticated: bool,
    },
}

/// Session context owned by the application root.
///
/// All real work is delegated to the [`AuthService`]; the store only keeps
/// the resulting state and announces logins and logouts as
/// [`SessionEvent`]s. Call [`SessionStore::start`] to follow the service's
/// change notifications and [`SessionStore::dispose`] (or drop the store) to
/// stop following them.
pub struct SessionStore {
    service: Arc<dyn AuthService>,
    state: Arc<watch::Sender<SessionState>>,
    events: broadcast::Sender<SessionEvent>,
    subscription: Option<Subscription>,
}

impl SessionStore {
    /// Create a new session store
    pub fn new(service: Arc<dyn AuthService>) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            service,
            state: Arc::new(state),
            events,
            subscription: None,
        }
    }

    /// Start mirroring the service's auth-state notifications
    pub fn start(&mut self) {
        if self.subscription.is_some() {
            debug!("Session store already started");
            return;
        }

        let state = Arc::clone(&self.state);
        let events = self.events.clone();
        let subscription = self.service.on_auth_state_change(Box::new(move |event, session| {
            let user = session.map(|session| session.user.clone());
            let authenticated = user.is_some();
            debug!("Auth state changed: {} (authenticated: {})", event, authenticated);

            state.send_modify(|state| state.user = user);
            let _ = events.send(SessionEvent::StateChanged {
                event,
                authenticated,
            });
        }));

        self.subscription = Some(subscription);
        info!("Session store started");
    }

    /// Stop mirroring notifications
    pub fn dispose(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
            info!("Session store disposed");
        }
    }

    /// Check if the store is following auth-state notifications
    pub fn is_started(&self) -> bool {
        self.subscription.is_some()
    }

    /// Load the current session from the service.
    ///
    /// Failures are logged and otherwise ignored; the store is marked
    /// initialized in every case.
    pub async fn init_auth(&self) {
        match self.service.get_session().await {
            Ok(Some(session)) => {
                info!("Restored session for user: {}", session.user.id);
                self.state.send_modify(|state| state.user = Some(session.user));
            }
            Ok(None) => debug!("No existing session"),
            Err(e) => error!("Error initializing auth: {}", e),
        }

        self.state.send_modify(|state| state.initialized = true);
    }

    /// Sign in with email and password
    pub async fn login(&self, email: &str, password: &str) -> Result<(), AuthError> {
        info!("Logging in: {}", mask_email(email));

        let session = match self.service.sign_in_with_password(email, password).await {
            Ok(session) => session,
            Err(e) => {
                warn!("Login failed: {}", e);
                return Err(e);
            }
        };

        let Some(session) = session else {
            warn!("Sign-in succeeded without a session, state unchanged");
            return Ok(());
        };

        let user = session.user;
        info!("Logged in as user: {}", user.id);
        self.state.send_modify(|state| state.user = Some(user.clone()));
        let _ = self.events.send(SessionEvent::LoggedIn(user));

        Ok(())
    }

    /// Register a new account. Session state is left alone.
    pub async fn signup(&self, email: &str, password: &str) -> Result<SignUpResult, AuthError> {
        info!("Signing up: {}", mask_email(email));

        let result = self.service.sign_up(email, password).await.map_err(|e| {
            warn!("Signup failed: {}", e);
            e
        })?;

        if result.requires_confirmation() {
            info!("Signup pending email confirmation");
        }
        Ok(result)
    }

    /// Sign out and clear the session
    pub async fn logout(&self) -> Result<(), AuthError> {
        info!("Logging out");

        if let Err(e) = self.service.sign_out().await {
            warn!("Logout failed: {}", e);
            return Err(e);
        }

        self.state.send_modify(|state| state.user = None);
        let _ = self.events.send(SessionEvent::LoggedOut);

        Ok(())
    }

    /// Check if currently authenticated
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// Check if the first session check has settled
    pub fn is_initialized(&self) -> bool {
        self.state.borrow().is_initialized()
    }

    /// Currently authenticated user, if any
    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    /// Copy of the full state
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every state change
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Receiver for login, logout and change events emitted from now on
    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Wait until the first session check has settled
    pub async fn wait_initialized(&self) {
        let mut receiver = self.state.subscribe();
        let _ = receiver.wait_for(SessionState::is_initialized).await;
    }
}

/// Mask an email address for logging
pub(crate) fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let first: String = local.chars().take(1).collect();
            format!("{}***@{}", first, domain)
        }
        None => "***".to_string(),
    }
}
