//! Navigation Module
//!
//! Turns session events into route changes.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, error, info, warn};

use crate::auth::SessionEvent;

/// Fixed application routes
pub mod routes {
    /// Destination after a successful login
    pub const DASHBOARD: &str = "/dashboard";
    /// Destination after logout
    pub const LOGIN: &str = "/login";
}

/// Navigation errors
#[derive(Debug, thiserror::Error)]
pub enum NavigationError {
    #[error("Unknown route: {0}")]
    UnknownRoute(String),
}

/// Router the application navigates with
#[async_trait]
pub trait Navigator: Send + Sync {
    async fn push(&self, path: &str) -> Result<(), NavigationError>;
}

/// Navigator that only records route changes in the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNavigator;

#[async_trait]
impl Navigator for TracingNavigator {
    async fn push(&self, path: &str) -> Result<(), NavigationError> {
        info!("Navigating to {}", path);
        Ok(())
    }
}

/// Decides where the application goes after session events
pub struct NavigationPolicy {
    navigator: Arc<dyn Navigator>,
}

impl NavigationPolicy {
    pub fn new(navigator: Arc<dyn Navigator>) -> Self {
        Self { navigator }
    }

    /// Route an event leads to, if any
    pub fn route_for(event: &SessionEvent) -> Option<&'static str> {
        match event {
            SessionEvent::LoggedIn(_) => Some(routes::DASHBOARD),
            SessionEvent::LoggedOut => Some(routes::LOGIN),
            SessionEvent::StateChanged { .. } => None,
        }
    }

    /// Navigate for a single event. Failures are logged.
    pub async fn handle(&self, event: &SessionEvent) {
        let Some(path) = Self::route_for(event) else {
            return;
        };

        if let Err(e) = self.navigator.push(path).await {
            error!("Failed to navigate to {}: {}", path, e);
        }
    }

    /// Handle events until the sending side goes away
    pub async fn run(self, mut events: broadcast::Receiver<SessionEvent>) {
        loop {
            match events.recv().await {
                Ok(event) => self.handle(&event).await,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Navigation policy skipped {} session events", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
        debug!("Navigation policy stopped");
    }
}
