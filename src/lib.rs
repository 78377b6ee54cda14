//! Invoicer Client Library
//!
//! Session store over the hosted auth service, plus the invoice schema.

pub mod auth;
pub mod config;
pub mod invoice;
pub mod logging;
pub mod navigation;
pub mod service;
pub mod storage;
pub mod supabase;

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::debug;

use auth::SessionStore;
use navigation::{NavigationPolicy, Navigator};
use service::AuthService;

/// Application context owned by the application root.
///
/// Wires the session store to the navigation policy and owns both
/// lifecycles.
pub struct AppContext {
    session: SessionStore,
    navigator: Arc<dyn Navigator>,
    navigation_task: Option<JoinHandle<()>>,
}

impl AppContext {
    pub fn new(service: Arc<dyn AuthService>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            session: SessionStore::new(service),
            navigator,
            navigation_task: None,
        }
    }

    /// Start following auth changes and spawn the navigation policy.
    ///
    /// Can be called again after [`AppContext::dispose`]. Must be called
    /// from within a tokio runtime.
    pub fn start(&mut self) {
        if self.navigation_task.is_none() {
            let policy = NavigationPolicy::new(Arc::clone(&self.navigator));
            let events = self.session.events();
            self.navigation_task = Some(tokio::spawn(policy.run(events)));
            debug!("Navigation task started");
        }
        self.session.start();
    }

    /// Session store backing this context
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Release the auth subscription and stop navigating
    pub fn dispose(&mut self) {
        self.session.dispose();
        if let Some(task) = self.navigation_task.take() {
            task.abort();
            debug!("Navigation task stopped");
        }
    }
}

impl Drop for AppContext {
    fn drop(&mut self) {
        self.dispose();
    }
}
