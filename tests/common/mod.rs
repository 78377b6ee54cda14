//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;

use invoicer_lib::auth::{Session, User};
use invoicer_lib::navigation::{NavigationError, Navigator};
use invoicer_lib::service::{
    AuthChangeEvent, AuthError, AuthListener, AuthListeners, AuthService, SignUpResult,
    Subscription,
};

pub fn user(id: &str) -> User {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "email": format!("{}@example.com", id),
        "role": "authenticated"
    }))
    .unwrap()
}

pub fn session(id: &str) -> Session {
    Session {
        access_token: format!("access-{}", id),
        token_type: "bearer".to_string(),
        expires_in: 3600,
        expires_at: None,
        refresh_token: format!("refresh-{}", id),
        user: user(id),
    }
}

/// Auth service with canned answers
pub struct FakeAuthService {
    pub get_session: Mutex<Result<Option<Session>, AuthError>>,
    pub sign_in: Mutex<Result<Option<Session>, AuthError>>,
    pub sign_up: Mutex<Result<SignUpResult, AuthError>>,
    pub sign_out: Mutex<Result<(), AuthError>>,
    pub calls: Mutex<Vec<String>>,
    listeners: AuthListeners,
}

impl FakeAuthService {
    pub fn new() -> Self {
        Self {
            get_session: Mutex::new(Ok(None)),
            sign_in: Mutex::new(Ok(None)),
            sign_up: Mutex::new(Ok(SignUpResult::default())),
            sign_out: Mutex::new(Ok(())),
            calls: Mutex::new(Vec::new()),
            listeners: AuthListeners::new(),
        }
    }

    pub fn with_get_session(self, result: Result<Option<Session>, AuthError>) -> Self {
        *self.get_session.lock().unwrap() = result;
        self
    }

    pub fn with_sign_in(self, result: Result<Option<Session>, AuthError>) -> Self {
        *self.sign_in.lock().unwrap() = result;
        self
    }

    pub fn with_sign_up(self, result: Result<SignUpResult, AuthError>) -> Self {
        *self.sign_up.lock().unwrap() = result;
        self
    }

    pub fn with_sign_out(self, result: Result<(), AuthError>) -> Self {
        *self.sign_out.lock().unwrap() = result;
        self
    }

    /// Push a change notification the way the hosted service would
    pub fn emit(&self, event: AuthChangeEvent, session: Option<&Session>) {
        self.listeners.notify(event, session);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }
}

#[async_trait]
impl AuthService for FakeAuthService {
    async fn get_session(&self) -> Result<Option<Session>, AuthError> {
        self.record("get_session");
        self.get_session.lock().unwrap().clone()
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        _password: &str,
    ) -> Result<Option<Session>, AuthError> {
        self.record(&format!("sign_in:{}", email));
        self.sign_in.lock().unwrap().clone()
    }

    async fn sign_up(&self, email: &str, _password: &str) -> Result<SignUpResult, AuthError> {
        self.record(&format!("sign_up:{}", email));
        self.sign_up.lock().unwrap().clone()
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.record("sign_out");
        self.sign_out.lock().unwrap().clone()
    }

    fn on_auth_state_change(&self, listener: AuthListener) -> Subscription {
        self.listeners.register(listener)
    }
}

/// Navigator that remembers every route it was asked for
#[derive(Default)]
pub struct RecordingNavigator {
    pushed: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn pushed(&self) -> Vec<String> {
        self.pushed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Navigator for RecordingNavigator {
    async fn push(&self, path: &str) -> Result<(), NavigationError> {
        self.pushed.lock().unwrap().push(path.to_string());
        Ok(())
    }
}
