//! Listening dashboard orchestration.
//!
//! A round fetches top items and analytics for one time range concurrently
//! and commits both together or not at all. Rounds are generation-stamped: if
//! the user switches range while a round is in flight, the older round's
//! result is dropped whenever it arrives.

use tokio::sync::watch;
use tracing::{info, instrument};

use crate::api::{Analytics, Artist, ListeningApi, TimeRange, Track};
use crate::resource::{FetchOutcome, Phase, Resource, Snapshot};
use crate::Error;

/// Everything the dashboard shows for one time range.
#[derive(Clone, Debug, PartialEq)]
pub struct ListeningSnapshot {
    pub range: TimeRange,
    pub top_tracks: Vec<Track>,
    pub top_artists: Vec<Artist>,
    pub analytics: Analytics,
}

pub struct Dashboard<A> {
    api: A,
    snapshot: Resource<ListeningSnapshot>,
}

impl<A: ListeningApi> Dashboard<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            snapshot: Resource::new(),
        }
    }

    /// Runs one orchestration round for `range`.
    #[instrument(skip(self))]
    pub async fn refresh(&self, range: TimeRange) -> FetchOutcome {
        let ticket = self.snapshot.begin();
        let generation = ticket.generation();

        let result = tokio::try_join!(self.api.top_items(range), self.api.analytics(range))
            .map(|(items, analytics)| ListeningSnapshot {
                range,
                top_tracks: items.tracks,
                top_artists: items.artists,
                analytics,
            })
            .map_err(|e| Error::PartialRoundFailure(Box::new(e)));

        let outcome = self.snapshot.finish("dashboard", ticket, result);
        if outcome == FetchOutcome::Committed {
            info!(%range, generation, "Dashboard updated");
        }
        outcome
    }

    /// Range the committed snapshot belongs to. This is the range to show as
    /// selected; a failed or superseded round never changes it.
    pub fn current_range(&self) -> Option<TimeRange> {
        self.snapshot.value().map(|s| s.range)
    }

    pub fn snapshot(&self) -> Option<ListeningSnapshot> {
        self.snapshot.value()
    }

    /// True while the latest round is unresolved.
    pub fn is_refreshing(&self) -> bool {
        self.snapshot.is_loading()
    }

    pub fn phase(&self) -> Phase {
        self.snapshot.phase()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot<ListeningSnapshot>> {
        self.snapshot.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::testing::FakeBackend;

    fn top_genre(dash: &Dashboard<Arc<FakeBackend>>) -> Option<String> {
        dash.snapshot().and_then(|s| s.analytics.top_genre)
    }

    #[tokio::test]
    async fn round_commits_both_halves() {
        let api = FakeBackend::new();
        let dash = Dashboard::new(api.clone());
        assert_eq!(dash.phase(), Phase::Idle);
        assert_eq!(dash.snapshot(), None);

        assert_eq!(dash.refresh(TimeRange::Long).await, FetchOutcome::Committed);

        let snap = dash.snapshot().unwrap();
        assert_eq!(snap.range, TimeRange::Long);
        assert_eq!(snap.top_tracks[0].id, "long_term-top");
        assert_eq!(snap.analytics.top_genre.as_deref(), Some("rock"));
        assert_eq!(dash.current_range(), Some(TimeRange::Long));
        assert!(!dash.is_refreshing());
        assert_eq!(api.call_count("top-items:long_term"), 1);
        assert_eq!(api.call_count("analytics:long_term"), 1);
    }

    #[tokio::test]
    async fn late_older_round_does_not_overwrite_newer_one() {
        let api = FakeBackend::new();
        api.hold("analytics:short_term");
        api.hold("analytics:long_term");
        let dash = Dashboard::new(api.clone());
        let mut rx = dash.subscribe();

        let driver = async {
            tokio::task::yield_now().await;
            assert!(dash.is_refreshing());
            assert_eq!(dash.current_range(), None);

            // Long resolves first...
            api.release("analytics:long_term");
            rx.wait_for(|s| s.value.is_some()).await.unwrap();
            assert_eq!(top_genre(&dash).as_deref(), Some("rock"));

            // ...then the superseded short round arrives late.
            api.release("analytics:short_term");
        };

        let (short, long, ()) = tokio::join!(
            dash.refresh(TimeRange::Short),
            dash.refresh(TimeRange::Long),
            driver
        );

        assert_eq!(short, FetchOutcome::Superseded);
        assert_eq!(long, FetchOutcome::Committed);
        assert_eq!(top_genre(&dash).as_deref(), Some("rock"));
        assert_eq!(dash.current_range(), Some(TimeRange::Long));
        assert!(!dash.is_refreshing());
    }

    #[tokio::test]
    async fn stale_round_keeps_in_flight_flag_for_newer_round() {
        let api = FakeBackend::new();
        api.hold("analytics:short_term");
        api.hold("analytics:long_term");
        let dash = Dashboard::new(api.clone());
        let short_done = tokio::sync::Notify::new();

        let short = async {
            let outcome = dash.refresh(TimeRange::Short).await;
            short_done.notify_one();
            outcome
        };
        let driver = async {
            tokio::task::yield_now().await;
            api.release("analytics:short_term");
            short_done.notified().await;

            // Short has resolved but is stale; long is still pending.
            assert!(dash.is_refreshing());
            assert_eq!(dash.snapshot(), None);
            api.release("analytics:long_term");
        };

        let (short, long, ()) = tokio::join!(short, dash.refresh(TimeRange::Long), driver);
        assert_eq!(short, FetchOutcome::Superseded);
        assert_eq!(long, FetchOutcome::Committed);
        assert!(!dash.is_refreshing());
    }

    #[tokio::test]
    async fn failed_half_leaves_snapshot_unchanged() {
        let api = FakeBackend::new();
        let dash = Dashboard::new(api.clone());
        dash.refresh(TimeRange::Medium).await;
        let before = dash.snapshot();

        api.fail("analytics:short_term");
        assert_eq!(dash.refresh(TimeRange::Short).await, FetchOutcome::Failed);

        assert_eq!(dash.snapshot(), before);
        assert_eq!(dash.current_range(), Some(TimeRange::Medium));
        assert!(matches!(dash.phase(), Phase::Failed(msg) if msg.contains("orchestration round failed")));
        assert!(!dash.is_refreshing());
    }

    #[tokio::test]
    async fn rejected_credential_is_reported() {
        let api = FakeBackend::new();
        api.reject("top-items:medium_term");
        let dash = Dashboard::new(api);

        assert_eq!(dash.refresh(TimeRange::Medium).await, FetchOutcome::Unauthorized);
        assert_eq!(dash.snapshot(), None);
    }

    #[tokio::test]
    async fn duplicate_refresh_is_harmless() {
        let once = Dashboard::new(FakeBackend::new());
        once.refresh(TimeRange::Short).await;

        let api = FakeBackend::new();
        api.hold("analytics:short_term");
        let twice = Dashboard::new(api.clone());
        let driver = async {
            tokio::task::yield_now().await;
            api.release("analytics:short_term");
        };
        let (a, b, ()) = tokio::join!(
            twice.refresh(TimeRange::Short),
            twice.refresh(TimeRange::Short),
            driver
        );

        assert_eq!(a, FetchOutcome::Superseded);
        assert_eq!(b, FetchOutcome::Committed);
        assert_eq!(twice.snapshot(), once.snapshot());
    }
}
