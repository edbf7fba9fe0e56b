//! Self-fetching display panels.
//!
//! Panels own their fetch cycle and never share state with the dashboard
//! orchestrator. A failed fetch renders as an empty panel.

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::instrument;

use crate::api::{Analytics, GeneratedPlaylist, PlayEvent, RecentlyPlayedApi, RecommendationApi, TimeRange, Track};
use crate::resource::{FetchOutcome, Phase, Resource, Snapshot};
use crate::Result;

pub const DEFAULT_RECENTLY_PLAYED_LIMIT: u32 = 20;
pub const DEFAULT_DISCOVER_LIMIT: u32 = 20;
pub const DEFAULT_SIMILAR_LIMIT: u32 = 10;
pub const DEFAULT_PLAYLIST_TRACK_COUNT: u32 = 20;

/// Recently played history, newest first.
pub struct RecentlyPlayedPanel<A> {
    api: A,
    limit: u32,
    events: Resource<Vec<PlayEvent>>,
}

impl<A: RecentlyPlayedApi> RecentlyPlayedPanel<A> {
    pub fn new(api: A) -> Self {
        Self::with_limit(api, DEFAULT_RECENTLY_PLAYED_LIMIT)
    }

    pub fn with_limit(api: A, limit: u32) -> Self {
        Self {
            api,
            limit,
            events: Resource::new(),
        }
    }

    #[instrument(skip(self), fields(limit = self.limit))]
    pub async fn load(&self) -> FetchOutcome {
        self.events
            .load("recently-played", self.api.recently_played(self.limit))
            .await
    }

    /// Entries to display; empty while loading for the first time or after a
    /// failure.
    pub fn events(&self) -> Vec<PlayEvent> {
        visible(&self.events.snapshot()).unwrap_or_default()
    }

    pub fn phase(&self) -> Phase {
        self.events.phase()
    }

    pub fn is_loading(&self) -> bool {
        self.events.is_loading()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot<Vec<PlayEvent>>> {
        self.events.subscribe()
    }
}

/// Recommendations fetched for one time range.
#[derive(Clone, Debug, PartialEq)]
pub struct Recommendations {
    pub range: TimeRange,
    pub tracks: Vec<Track>,
}

/// Discovery grid. Follows an externally supplied time range and re-fetches
/// whenever it changes.
pub struct DiscoverPanel<A> {
    api: A,
    limit: u32,
    range: watch::Sender<TimeRange>,
    recommendations: Resource<Recommendations>,
}

impl<A: RecommendationApi> DiscoverPanel<A> {
    pub fn new(api: A, range: TimeRange) -> Self {
        Self::with_limit(api, range, DEFAULT_DISCOVER_LIMIT)
    }

    pub fn with_limit(api: A, range: TimeRange, limit: u32) -> Self {
        Self {
            api,
            limit,
            range: watch::channel(range).0,
            recommendations: Resource::new(),
        }
    }

    pub fn range(&self) -> TimeRange {
        *self.range.borrow()
    }

    /// Fetches recommendations for the current range.
    pub async fn load(&self) -> FetchOutcome {
        self.fetch(self.range()).await
    }

    /// Manual refresh; identical to [`load`](Self::load).
    pub async fn refresh(&self) -> FetchOutcome {
        self.load().await
    }

    /// Switches range. Returns `None` without fetching when `range` is
    /// already selected.
    pub async fn set_range(&self, range: TimeRange) -> Option<FetchOutcome> {
        let changed = self.range.send_if_modified(|current| {
            if *current == range {
                return false;
            }
            *current = range;
            true
        });
        if !changed {
            return None;
        }
        Some(self.fetch(range).await)
    }

    #[instrument(skip(self), fields(limit = self.limit))]
    async fn fetch(&self, range: TimeRange) -> FetchOutcome {
        let fetch = async {
            self.api
                .discover_recommendations(range, self.limit)
                .await
                .map(|tracks| Recommendations { range, tracks })
        };
        self.recommendations.load("discover", fetch).await
    }

    /// Tracks to display; empty while loading for the first time or after a
    /// failure.
    pub fn tracks(&self) -> Vec<Track> {
        visible(&self.recommendations.snapshot())
            .map(|r| r.tracks)
            .unwrap_or_default()
    }

    /// Range the displayed tracks belong to.
    pub fn committed_range(&self) -> Option<TimeRange> {
        self.recommendations.value().map(|r| r.range)
    }

    pub fn phase(&self) -> Phase {
        self.recommendations.phase()
    }

    pub fn is_loading(&self) -> bool {
        self.recommendations.is_loading()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot<Recommendations>> {
        self.recommendations.subscribe()
    }

    /// Tracks resembling `track_id`, [`DEFAULT_SIMILAR_LIMIT`] unless given.
    /// Fetched on demand, not kept.
    pub async fn similar_to(&self, track_id: &str, limit: Option<u32>) -> Result<Vec<Track>> {
        self.api
            .similar_tracks(track_id, limit.unwrap_or(DEFAULT_SIMILAR_LIMIT))
            .await
    }

    /// Asks the backend for a playlist seeded with the displayed tracks. With
    /// nothing displayed the seed list is empty.
    pub async fn generate_playlist(
        &self,
        playlist_type: &str,
        track_count: Option<u32>,
    ) -> Result<GeneratedPlaylist> {
        let seeds: Vec<String> = self.tracks().into_iter().map(|t| t.id).collect();
        self.api
            .generate_playlist(
                playlist_type,
                track_count.unwrap_or(DEFAULT_PLAYLIST_TRACK_COUNT),
                &seeds,
            )
            .await
    }
}

fn visible<T: Clone>(snapshot: &Snapshot<T>) -> Option<T> {
    match snapshot.phase {
        Phase::Failed(_) => None,
        _ => snapshot.value.clone(),
    }
}

/// Track length as `m:ss`.
pub fn format_duration(duration_ms: u64) -> String {
    let minutes = duration_ms / 60_000;
    let seconds = (duration_ms % 60_000) / 1000;
    format!("{}:{:02}", minutes, seconds)
}

/// Coarse age of a play, e.g. `5m ago`, `3h ago`, `2d ago`.
pub fn format_played_ago(played_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - played_at).num_minutes().max(0);
    let hours = minutes / 60;
    if minutes < 60 {
        format!("{}m ago", minutes)
    } else if hours < 24 {
        format!("{}h ago", hours)
    } else {
        format!("{}d ago", hours / 24)
    }
}

/// Genre distribution as display lines, in backend order.
pub fn genre_breakdown(analytics: &Analytics) -> Vec<String> {
    let shares = analytics.genre_shares();
    if shares.is_empty() {
        return vec!["No genre data available".to_string()];
    }
    shares
        .into_iter()
        .map(|(genre, share)| format!("{:<24} {:>3.0}%", genre, share * 100.0))
        .collect()
}
