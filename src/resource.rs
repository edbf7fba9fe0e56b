//! Generation-stamped asynchronous resource.
//!
//! Every fetch takes a [`Ticket`] from [`Resource::begin`]. Only the ticket of
//! the most recently begun fetch may write a result; anything older is
//! discarded when it resolves, however late. The last-begun fetch wins, not
//! the last-resolved one.

use std::fmt::Display;
use std::future::Future;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::Result;

/// Lifecycle of the latest fetch.
#[derive(Clone, Debug, PartialEq)]
pub enum Phase {
    Idle,
    Loading,
    Ready,
    Failed(String),
}

/// Observable state of a resource.
#[derive(Clone, Debug)]
pub struct Snapshot<T> {
    /// Generation of the latest begun fetch.
    pub generation: u64,
    pub phase: Phase,
    /// Last successfully committed value. A failed fetch leaves it untouched.
    pub value: Option<T>,
}

/// Proof that a fetch was begun, carrying its generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ticket(u64);

impl Ticket {
    pub fn generation(self) -> u64 {
        self.0
    }
}

/// What [`Resource::resolve`] did with a result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Commit {
    Applied,
    Failed,
    Stale,
}

/// Outcome of one fetch cycle as seen by the caller that started it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    Committed,
    /// Failed; the previous value stays in place.
    Failed,
    /// Failed because the backend rejected the credential.
    Unauthorized,
    /// A newer fetch was begun meanwhile; this result was dropped.
    Superseded,
}

pub struct Resource<T> {
    state: watch::Sender<Snapshot<T>>,
}

impl<T: Clone> Default for Resource<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Resource<T> {
    pub fn new() -> Self {
        let (state, _) = watch::channel(Snapshot {
            generation: 0,
            phase: Phase::Idle,
            value: None,
        });
        Self { state }
    }

    /// Starts a fetch, superseding any fetch still in flight.
    pub fn begin(&self) -> Ticket {
        let mut generation = 0;
        self.state.send_modify(|s| {
            s.generation += 1;
            s.phase = Phase::Loading;
            generation = s.generation;
        });
        Ticket(generation)
    }

    /// Records the outcome of the fetch identified by `ticket`.
    pub fn resolve<E: Display>(
        &self,
        ticket: Ticket,
        result: std::result::Result<T, E>,
    ) -> Commit {
        let mut outcome = Commit::Stale;
        self.state.send_if_modified(|s| {
            if s.generation != ticket.0 {
                return false;
            }
            match result {
                Ok(value) => {
                    s.value = Some(value);
                    s.phase = Phase::Ready;
                    outcome = Commit::Applied;
                }
                Err(e) => {
                    s.phase = Phase::Failed(e.to_string());
                    outcome = Commit::Failed;
                }
            }
            true
        });
        outcome
    }

    /// Resolves `ticket` and classifies the result for the caller. `label`
    /// names the resource in logs.
    pub fn finish(&self, label: &'static str, ticket: Ticket, result: Result<T>) -> FetchOutcome {
        let failure = result.as_ref().err().map(|e| (e.to_string(), e.is_auth()));

        match self.resolve(ticket, result) {
            Commit::Applied => {
                debug!(resource = label, generation = ticket.0, "Committed");
                FetchOutcome::Committed
            }
            Commit::Failed => {
                let (error, auth) = failure.unwrap_or_default();
                warn!(resource = label, generation = ticket.0, %error, "Fetch failed");
                if auth {
                    FetchOutcome::Unauthorized
                } else {
                    FetchOutcome::Failed
                }
            }
            Commit::Stale => {
                debug!(resource = label, generation = ticket.0, "Discarded stale result");
                FetchOutcome::Superseded
            }
        }
    }

    /// Begins a fetch, awaits it and commits it if still current.
    pub async fn load<F>(&self, label: &'static str, fetch: F) -> FetchOutcome
    where
        F: Future<Output = Result<T>>,
    {
        let ticket = self.begin();
        let result = fetch.await;
        self.finish(label, ticket, result)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.state.borrow().generation == ticket.0
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().phase == Phase::Loading
    }

    pub fn phase(&self) -> Phase {
        self.state.borrow().phase.clone()
    }

    pub fn value(&self) -> Option<T> {
        self.state.borrow().value.clone()
    }

    pub fn snapshot(&self) -> Snapshot<T> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot<T>> {
        self.state.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn starts_idle() {
        let res: Resource<u32> = Resource::new();
        let snap = res.snapshot();
        assert_eq!(snap.generation, 0);
        assert_eq!(snap.phase, Phase::Idle);
        assert_eq!(snap.value, None);
    }

    #[test]
    fn latest_ticket_wins_over_late_older_one() {
        let res = Resource::new();
        let first = res.begin();
        let second = res.begin();

        assert_eq!(res.resolve::<String>(second, Ok("second")), Commit::Applied);
        assert_eq!(res.resolve::<String>(first, Ok("first")), Commit::Stale);

        assert_eq!(res.value(), Some("second"));
        assert_eq!(res.phase(), Phase::Ready);
        assert!(!res.is_current(first));
        assert!(res.is_current(second));
    }

    #[test]
    fn stale_resolution_keeps_newer_fetch_loading() {
        let res = Resource::new();
        let first = res.begin();
        let _second = res.begin();

        assert_eq!(res.resolve::<String>(first, Ok(1)), Commit::Stale);
        assert!(res.is_loading());
        assert_eq!(res.value(), None);
    }

    #[test]
    fn failure_keeps_previous_value() {
        let res = Resource::new();
        let t = res.begin();
        res.resolve::<String>(t, Ok(vec![1, 2]));

        let t = res.begin();
        assert_eq!(res.resolve(t, Err("boom")), Commit::Failed);
        assert_eq!(res.value(), Some(vec![1, 2]));
        assert_eq!(res.phase(), Phase::Failed("boom".into()));
    }

    #[tokio::test]
    async fn subscribers_observe_commits() {
        let res = Resource::new();
        let mut rx = res.subscribe();

        let t = res.begin();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().phase, Phase::Loading);

        res.resolve::<String>(t, Ok(7));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().value, Some(7));
    }

    #[tokio::test]
    async fn load_classifies_outcomes() {
        let res = Resource::new();
        assert_eq!(res.load("test", async { Ok(1) }).await, FetchOutcome::Committed);
        assert_eq!(
            res.load("test", async { Err(Error::InvalidTimeRange("x".into())) }).await,
            FetchOutcome::Failed
        );
        assert_eq!(
            res.load("test", async { Err(Error::Unauthorized) }).await,
            FetchOutcome::Unauthorized
        );
        assert_eq!(res.value(), Some(1));
    }

    #[tokio::test]
    async fn finish_reports_superseded() {
        let res = Resource::new();
        let old = res.begin();
        let _new = res.begin();
        assert_eq!(res.finish("test", old, Ok(1)), FetchOutcome::Superseded);
    }

    #[test]
    fn stale_resolution_does_not_notify() {
        let res = Resource::new();
        let old = res.begin();
        let _new = res.begin();
        let mut rx = res.subscribe();
        rx.borrow_and_update();

        res.resolve::<String>(old, Ok(1));
        assert!(!rx.has_changed().unwrap());
    }
}
