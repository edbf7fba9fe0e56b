//! Scripted in-process backend for unit tests.
//!
//! Calls are keyed `"<endpoint>:<argument>"`, e.g. `"analytics:short_term"`.
//! A held key blocks its calls until released, which lets tests decide the
//! order in which concurrent requests complete.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use reqwest::StatusCode;
use tokio::sync::Semaphore;

use crate::api::*;
use crate::{Error, Result};

#[derive(Default)]
pub(crate) struct FakeBackend {
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    failing: Mutex<HashSet<String>>,
    rejecting: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Blocks calls for `key` until [`release`](Self::release).
    pub fn hold(&self, key: &str) {
        self.gates
            .lock()
            .unwrap()
            .insert(key.to_string(), Arc::new(Semaphore::new(0)));
    }

    pub fn release(&self, key: &str) {
        if let Some(gate) = self.gates.lock().unwrap().get(key) {
            gate.add_permits(64);
        }
    }

    /// Calls for `key` answer HTTP 500.
    pub fn fail(&self, key: &str) {
        self.failing.lock().unwrap().insert(key.to_string());
    }

    /// Calls for `key` answer `Unauthorized`.
    pub fn reject(&self, key: &str) {
        self.rejecting.lock().unwrap().insert(key.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    async fn enter(&self, key: String) -> Result<()> {
        self.calls.lock().unwrap().push(key.clone());
        let gate = self.gates.lock().unwrap().get(&key).cloned();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }
        if self.rejecting.lock().unwrap().contains(&key) {
            return Err(Error::Unauthorized);
        }
        if self.failing.lock().unwrap().contains(&key) {
            return Err(Error::Status {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: format!("{key} failed"),
            });
        }
        Ok(())
    }
}

pub(crate) fn genre_for(range: TimeRange) -> &'static str {
    match range {
        TimeRange::Short => "jazz",
        TimeRange::Medium => "pop",
        TimeRange::Long => "rock",
    }
}

pub(crate) fn track(id: &str) -> Track {
    Track {
        id: id.to_string(),
        name: format!("Track {id}"),
        artists: vec!["Artist".into()],
        duration_ms: 200_000,
        ..Default::default()
    }
}

#[async_trait]
impl AuthApi for FakeBackend {
    async fn auth_redirect_url(&self) -> Result<String> {
        self.enter("auth-url".into()).await?;
        Ok("https://accounts.example/authorize".into())
    }

    async fn current_user(&self) -> Result<SessionUser> {
        self.enter("me".into()).await?;
        Ok(SessionUser {
            display_name: "Ada".into(),
            email: None,
            spotify_id: "ada".into(),
        })
    }
}

#[async_trait]
impl ListeningApi for FakeBackend {
    async fn top_items(&self, range: TimeRange) -> Result<TopItems> {
        self.enter(format!("top-items:{range}")).await?;
        Ok(TopItems {
            tracks: vec![track(&format!("{range}-top"))],
            artists: vec![Artist {
                id: format!("{range}-artist"),
                name: "Artist".into(),
                ..Default::default()
            }],
        })
    }

    async fn top_tracks(&self, range: TimeRange) -> Result<Vec<Track>> {
        self.enter(format!("top-tracks:{range}")).await?;
        Ok(vec![track(&format!("{range}-top"))])
    }

    async fn top_artists(&self, range: TimeRange) -> Result<Vec<Artist>> {
        self.enter(format!("top-artists:{range}")).await?;
        Ok(vec![Artist {
            id: format!("{range}-artist"),
            name: "Artist".into(),
            ..Default::default()
        }])
    }

    async fn analytics(&self, range: TimeRange) -> Result<Analytics> {
        self.enter(format!("analytics:{range}")).await?;
        Ok(Analytics {
            total_top_tracks: 1,
            total_top_artists: 1,
            top_genre: Some(genre_for(range).into()),
            avg_popularity: 50.0,
            genre_distribution: vec![GenreCount {
                name: genre_for(range).into(),
                count: 1,
            }],
        })
    }
}

#[async_trait]
impl RecentlyPlayedApi for FakeBackend {
    async fn recently_played(&self, limit: u32) -> Result<Vec<PlayEvent>> {
        self.enter(format!("recently-played:{limit}")).await?;
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        Ok((0..limit)
            .map(|i| PlayEvent {
                track: track(&format!("played-{i}")),
                played_at: start - Duration::minutes(i64::from(i) * 5),
            })
            .collect())
    }
}

#[async_trait]
impl RecommendationApi for FakeBackend {
    async fn discover_recommendations(&self, range: TimeRange, limit: u32) -> Result<Vec<Track>> {
        self.enter(format!("discover:{range}")).await?;
        Ok((0..limit).map(|i| track(&format!("{range}-{i}"))).collect())
    }

    async fn similar_tracks(&self, track_id: &str, limit: u32) -> Result<Vec<Track>> {
        self.enter(format!("similar:{track_id}")).await?;
        Ok((0..limit)
            .map(|i| track(&format!("{track_id}-like-{i}")))
            .collect())
    }

    async fn generate_playlist(
        &self,
        playlist_type: &str,
        track_count: u32,
        seed_track_ids: &[String],
    ) -> Result<GeneratedPlaylist> {
        self.enter(format!("playlist:{playlist_type}")).await?;
        Ok(GeneratedPlaylist {
            name: Some(playlist_type.to_string()),
            description: None,
            tracks: seed_track_ids
                .iter()
                .cycle()
                .take(track_count as usize)
                .map(|id| track(id))
                .collect(),
        })
    }
}
