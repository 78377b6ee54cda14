//! Auth Service Module
//!
//! The contract of the hosted authentication backend, its closed error
//! kinds, and the listener registry used for auth-state notifications.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::auth::{Session, User};

/// Kind of change reported by the auth service's notification stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthChangeEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

impl fmt::Display for AuthChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthChangeEvent::InitialSession => "INITIAL_SESSION",
            AuthChangeEvent::SignedIn => "SIGNED_IN",
            AuthChangeEvent::SignedOut => "SIGNED_OUT",
            AuthChangeEvent::TokenRefreshed => "TOKEN_REFRESHED",
            AuthChangeEvent::UserUpdated => "USER_UPDATED",
        };
        f.write_str(name)
    }
}

/// Result of a registration request.
///
/// `session` is only present when the service established a live session
/// right away; with email confirmation enabled only `user` comes back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignUpResult {
    pub user: Option<User>,
    pub session: Option<Session>,
}

impl SignUpResult {
    /// Whether the account still has to be confirmed before signing in
    pub fn requires_confirmation(&self) -> bool {
        self.session.is_none()
    }
}

/// Errors surfaced by the auth service
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid login credentials")]
    InvalidCredentials,

    #[error("Email address not confirmed")]
    EmailNotConfirmed,

    #[error("User already registered")]
    UserAlreadyRegistered,

    #[error("Weak password: {0}")]
    WeakPassword(String),

    #[error("Too many requests")]
    RateLimited,

    #[error("Network error: {0}")]
    NetworkFailure(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// Callback invoked on every auth-state change
pub type AuthListener = Box<dyn Fn(AuthChangeEvent, Option<&Session>) + Send + Sync>;

/// The hosted authentication backend, as consumed by the session store
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Current session, if the service knows one
    async fn get_session(&self) -> Result<Option<Session>, AuthError>;

    /// Verify credentials and open a session
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<Session>, AuthError>;

    /// Register a new account
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpResult, AuthError>;

    /// End the current session
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Register a listener for session changes. The listener stays active
    /// until the returned [`Subscription`] is dropped.
    fn on_auth_state_change(&self, listener: AuthListener) -> Subscription;
}

type SharedListener = Arc<dyn Fn(AuthChangeEvent, Option<&Session>) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(u64, SharedListener)>,
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Registry of auth-state listeners shared by [`AuthService`] implementations
#[derive(Clone, Default)]
pub struct AuthListeners {
    inner: Arc<Mutex<Registry>>,
}

impl AuthListeners {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener and hand back its unsubscribe handle
    pub fn register(&self, listener: AuthListener) -> Subscription {
        let mut registry = lock(&self.inner);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.push((id, Arc::from(listener)));

        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Invoke every registered listener.
    ///
    /// Listeners run outside the registry lock, so they may drop their own
    /// subscription from inside the callback.
    pub fn notify(&self, event: AuthChangeEvent, session: Option<&Session>) {
        let listeners: Vec<SharedListener> = lock(&self.inner)
            .listeners
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener(event, session);
        }
    }

    /// Number of active listeners
    pub fn len(&self) -> usize {
        lock(&self.inner).listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle to a registered listener; dropping it unregisters the listener
#[must_use = "dropping a Subscription unregisters its listener"]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Unregister the listener now
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).listeners.retain(|(id, _)| *id != self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_listener(counter: &Arc<AtomicUsize>) -> AuthListener {
        let counter = Arc::clone(counter);
        Box::new(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn notify_reaches_every_listener() {
        let listeners = AuthListeners::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let _first = listeners.register(counting_listener(&counter));
        let _second = listeners.register(counting_listener(&counter));

        listeners.notify(AuthChangeEvent::SignedOut, None);

        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn dropped_subscription_stops_notifications() {
        let listeners = AuthListeners::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let subscription = listeners.register(counting_listener(&counter));
        let _other = listeners.register(Box::new(|_, _| {}));

        subscription.unsubscribe();
        listeners.notify(AuthChangeEvent::SignedOut, None);

        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(listeners.len(), 1);
    }

    #[test]
    fn subscription_outliving_registry_is_harmless() {
        let listeners = AuthListeners::new();
        let subscription = listeners.register(Box::new(|_, _| {}));
        drop(listeners);
        drop(subscription);
    }

    #[test]
    fn subscription_ids_are_unique() {
        let listeners = AuthListeners::new();
        let a = listeners.register(Box::new(|_, _| {}));
        let b = listeners.register(Box::new(|_, _| {}));
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn change_event_uses_wire_names() {
        let json = serde_json::to_string(&AuthChangeEvent::TokenRefreshed).unwrap();
        assert_eq!(json, "\"TOKEN_REFRESHED\"");
        assert_eq!(AuthChangeEvent::SignedIn.to_string(), "SIGNED_IN");
    }

    #[test]
    fn signup_without_session_requires_confirmation() {
        assert!(SignUpResult::default().requires_confirmation());
    }
}
