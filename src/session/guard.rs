//! Completion of the identity provider's redirect handoff.
//!
//! ```text
//! Processing ──token present──▶ Success ──(success delay)──▶ Dashboard
//!      └──────token missing───▶ Failed  ──(failure delay)──▶ Entry
//! ```

use std::time::Duration;

use tracing::{info, warn};

use super::{Navigation, Route};
use crate::credentials::CredentialStore;

pub const DEFAULT_SUCCESS_DELAY: Duration = Duration::from_millis(1000);
pub const DEFAULT_FAILURE_DELAY: Duration = Duration::from_millis(2000);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandoffState {
    Processing,
    Success,
    Failed(String),
}

impl HandoffState {
    /// Status line shown while the handoff is on screen.
    pub fn message(&self) -> &'static str {
        match self {
            HandoffState::Processing => "Processing...",
            HandoffState::Success => "Success! Redirecting...",
            HandoffState::Failed(_) => "Authentication failed",
        }
    }
}

/// Result of one handoff: the state reached and where to go next.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Handoff {
    pub state: HandoffState,
    pub navigation: Option<Navigation>,
}

pub struct SessionGuard {
    credentials: CredentialStore,
    success_delay: Duration,
    failure_delay: Duration,
}

impl SessionGuard {
    pub fn new(credentials: CredentialStore) -> Self {
        Self {
            credentials,
            success_delay: DEFAULT_SUCCESS_DELAY,
            failure_delay: DEFAULT_FAILURE_DELAY,
        }
    }

    pub fn with_delays(mut self, success: Duration, failure: Duration) -> Self {
        self.success_delay = success;
        self.failure_delay = failure;
        self
    }

    /// Finishes the handoff for the `token` redirect parameter.
    ///
    /// The credential is written only on success; a failed handoff never
    /// touches the store.
    pub async fn complete(&self, token: Option<&str>) -> Handoff {
        let token = token.map(str::trim).filter(|t| !t.is_empty());

        let Some(token) = token else {
            warn!("Redirect arrived without a token");
            return self.failed("missing token parameter".into());
        };

        if let Err(e) = self.credentials.set(token).await {
            warn!(error = %e, "Failed to persist credential");
            return self.failed(format!("could not store credential: {e}"));
        }

        info!(delay_ms = self.success_delay.as_millis() as u64, "Handoff complete");
        Handoff {
            state: HandoffState::Success,
            navigation: Some(Navigation {
                to: Route::Dashboard,
                after: self.success_delay,
            }),
        }
    }

    fn failed(&self, reason: String) -> Handoff {
        Handoff {
            state: HandoffState::Failed(reason),
            navigation: Some(Navigation {
                to: Route::Entry,
                after: self.failure_delay,
            }),
        }
    }
}
