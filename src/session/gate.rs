//! Gate in front of protected views.
//!
//! One [`ViewGate`] corresponds to one mounted view. Activation verifies the
//! stored credential with the backend exactly once; later activations of the
//! same gate reuse the outcome.

use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::{Navigation, Route};
use crate::api::{AuthApi, SessionUser};
use crate::credentials::CredentialStore;
use crate::resource::FetchOutcome;
use crate::Result;

/// Why the gate sent the user back to the entry point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RedirectReason {
    /// No credential stored. No request was made.
    MissingCredential,
    /// The backend did not accept the stored credential.
    Unauthorized,
}

#[derive(Clone, Debug, PartialEq)]
pub enum GateState {
    Loading,
    Authenticated(SessionUser),
    Redirected(RedirectReason),
}

impl GateState {
    pub fn user(&self) -> Option<&SessionUser> {
        match self {
            GateState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    /// Where to go instead of rendering, if anywhere.
    pub fn navigation(&self) -> Option<Navigation> {
        match self {
            GateState::Redirected(_) => Some(Navigation::immediate(Route::Entry)),
            _ => None,
        }
    }
}

pub struct ViewGate<A> {
    api: A,
    credentials: CredentialStore,
    outcome: OnceCell<GateState>,
}

impl<A: AuthApi> ViewGate<A> {
    pub fn new(api: A, credentials: CredentialStore) -> Self {
        Self {
            api,
            credentials,
            outcome: OnceCell::new(),
        }
    }

    /// `Loading` until [`activate`](Self::activate) resolves.
    pub fn state(&self) -> GateState {
        self.outcome.get().cloned().unwrap_or(GateState::Loading)
    }

    /// Verifies the session. Concurrent and repeated calls share one check.
    pub async fn activate(&self) -> GateState {
        self.outcome.get_or_init(|| self.verify()).await.clone()
    }

    async fn verify(&self) -> GateState {
        if self.credentials.get().await.is_none() {
            debug!("No credential, redirecting to entry");
            return GateState::Redirected(RedirectReason::MissingCredential);
        }

        match self.api.current_user().await {
            Ok(user) => {
                info!(user = %user.display_name, "Session verified");
                GateState::Authenticated(user)
            }
            Err(e) => {
                warn!(error = %e, "Session check failed, evicting credential");
                if let Err(e) = self.credentials.clear().await {
                    warn!(error = %e, "Failed to clear credential");
                }
                GateState::Redirected(RedirectReason::Unauthorized)
            }
        }
    }

    /// Ends the session if the backend rejected the credential during any of
    /// the view's fetches. Returns the redirect to follow, if any.
    pub async fn evict_on_rejection(&self, outcomes: &[FetchOutcome]) -> Result<Option<Navigation>> {
        if !outcomes.contains(&FetchOutcome::Unauthorized) {
            return Ok(None);
        }
        warn!("Credential rejected while loading view data, evicting");
        self.credentials.clear().await?;
        Ok(Some(Navigation::immediate(Route::Entry)))
    }

    /// Ends the session.
    pub async fn logout(&self) -> Result<Navigation> {
        self.credentials.clear().await?;
        info!("Logged out");
        Ok(Navigation::immediate(Route::Entry))
    }
}
