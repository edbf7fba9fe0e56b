//! Session lifecycle: the redirect handoff and the gate in front of protected
//! views.

pub mod gate;
pub mod guard;

use std::time::Duration;

/// Views the client can navigate to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    /// Sign-in entry point.
    Entry,
    /// The protected listening dashboard.
    Dashboard,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Route::Entry => "/",
            Route::Dashboard => "/dashboard",
        }
    }
}

/// A navigation to perform once `after` has elapsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Navigation {
    pub to: Route,
    pub after: Duration,
}

impl Navigation {
    pub fn immediate(to: Route) -> Self {
        Self {
            to,
            after: Duration::ZERO,
        }
    }

    /// Waits out the delay and yields the target.
    pub async fn wait(self) -> Route {
        if !self.after.is_zero() {
            tokio::time::sleep(self.after).await;
        }
        self.to
    }
}
