//! MoodTune backend API client.
//!
//! Every request carries the stored session credential as a bearer token when
//! one is present. Whether a missing or stale token is acceptable is the
//! backend's decision; this layer only reports what it answered.

mod models;

pub use models::*;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::credentials::CredentialStore;
use crate::{Error, Result};

/// Identity endpoints.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// URL of the identity provider's consent page.
    async fn auth_redirect_url(&self) -> Result<String>;

    /// The user behind the current credential. Any rejection is `Unauthorized`.
    async fn current_user(&self) -> Result<SessionUser>;
}

/// Listening statistics scoped by time range.
#[async_trait]
pub trait ListeningApi: Send + Sync {
    async fn top_items(&self, range: TimeRange) -> Result<TopItems>;
    async fn top_tracks(&self, range: TimeRange) -> Result<Vec<Track>>;
    async fn top_artists(&self, range: TimeRange) -> Result<Vec<Artist>>;
    async fn analytics(&self, range: TimeRange) -> Result<Analytics>;
}

#[async_trait]
pub trait RecentlyPlayedApi: Send + Sync {
    async fn recently_played(&self, limit: u32) -> Result<Vec<PlayEvent>>;
}

#[async_trait]
pub trait RecommendationApi: Send + Sync {
    async fn discover_recommendations(&self, range: TimeRange, limit: u32) -> Result<Vec<Track>>;
    async fn similar_tracks(&self, track_id: &str, limit: u32) -> Result<Vec<Track>>;
    async fn generate_playlist(
        &self,
        playlist_type: &str,
        track_count: u32,
        seed_track_ids: &[String],
    ) -> Result<GeneratedPlaylist>;
}

/// HTTP client for the MoodTune backend.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    credentials: CredentialStore,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, credentials: CredentialStore) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        }
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(self.client.get(self.url(path))).await
    }

    /// Attaches the credential, sends, and decodes a success body.
    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
        let req = match self.credentials.get().await {
            Some(token) => req.header("Authorization", format!("Bearer {}", token)),
            None => req,
        };

        let res = req.send().await?;
        let status = res.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            debug!(%status, "Backend rejected credential");
            return Err(Error::Unauthorized);
        }

        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(Error::Status { status, body });
        }

        Ok(res.json().await?)
    }
}

/// The redirect URL endpoint answers either a bare string or `{"url": ...}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum AuthUrlResponse {
    Bare(String),
    Wrapped { url: String },
}

#[async_trait]
impl AuthApi for ApiClient {
    #[instrument(skip_all)]
    async fn auth_redirect_url(&self) -> Result<String> {
        let body: AuthUrlResponse = self.get("/auth/spotify/url").await?;
        Ok(match body {
            AuthUrlResponse::Bare(url) | AuthUrlResponse::Wrapped { url } => url,
        })
    }

    #[instrument(skip_all)]
    async fn current_user(&self) -> Result<SessionUser> {
        match self.get("/auth/me").await {
            Err(Error::Status { status, .. }) => {
                debug!(%status, "Session check failed");
                Err(Error::Unauthorized)
            }
            other => other,
        }
    }
}

#[async_trait]
impl ListeningApi for ApiClient {
    #[instrument(skip(self))]
    async fn top_items(&self, range: TimeRange) -> Result<TopItems> {
        self.get(&format!("/spotify/top-items?timeRange={}", range)).await
    }

    #[instrument(skip(self))]
    async fn top_tracks(&self, range: TimeRange) -> Result<Vec<Track>> {
        self.get(&format!("/spotify/top-tracks?timeRange={}", range)).await
    }

    #[instrument(skip(self))]
    async fn top_artists(&self, range: TimeRange) -> Result<Vec<Artist>> {
        self.get(&format!("/spotify/top-artists?timeRange={}", range)).await
    }

    #[instrument(skip(self))]
    async fn analytics(&self, range: TimeRange) -> Result<Analytics> {
        self.get(&format!("/spotify/analytics?timeRange={}", range)).await
    }
}

#[async_trait]
impl RecentlyPlayedApi for ApiClient {
    #[instrument(skip(self))]
    async fn recently_played(&self, limit: u32) -> Result<Vec<PlayEvent>> {
        self.get(&format!("/spotify/recently-played?limit={}", limit)).await
    }
}

#[async_trait]
impl RecommendationApi for ApiClient {
    #[instrument(skip(self))]
    async fn discover_recommendations(&self, range: TimeRange, limit: u32) -> Result<Vec<Track>> {
        self.get(&format!(
            "/recommendations/discover?timeRange={}&limit={}",
            range, limit
        ))
        .await
    }

    #[instrument(skip(self))]
    async fn similar_tracks(&self, track_id: &str, limit: u32) -> Result<Vec<Track>> {
        self.get(&format!(
            "/recommendations/similar/{}?limit={}",
            urlencoding::encode(track_id),
            limit
        ))
        .await
    }

    #[instrument(skip(self, seed_track_ids), fields(seeds = seed_track_ids.len()))]
    async fn generate_playlist(
        &self,
        playlist_type: &str,
        track_count: u32,
        seed_track_ids: &[String],
    ) -> Result<GeneratedPlaylist> {
        let body = PlaylistRequest {
            playlist_type: playlist_type.to_string(),
            track_count,
            seed_track_ids: seed_track_ids.to_vec(),
        };
        let req = self
            .client
            .post(self.url("/recommendations/playlist/generate"))
            .json(&body);
        self.send(req).await
    }
}

#[async_trait]
impl<T: AuthApi + ?Sized> AuthApi for Arc<T> {
    async fn auth_redirect_url(&self) -> Result<String> {
        (**self).auth_redirect_url().await
    }

    async fn current_user(&self) -> Result<SessionUser> {
        (**self).current_user().await
    }
}

#[async_trait]
impl<T: ListeningApi + ?Sized> ListeningApi for Arc<T> {
    async fn top_items(&self, range: TimeRange) -> Result<TopItems> {
        (**self).top_items(range).await
    }

    async fn top_tracks(&self, range: TimeRange) -> Result<Vec<Track>> {
        (**self).top_tracks(range).await
    }

    async fn top_artists(&self, range: TimeRange) -> Result<Vec<Artist>> {
        (**self).top_artists(range).await
    }

    async fn analytics(&self, range: TimeRange) -> Result<Analytics> {
        (**self).analytics(range).await
    }
}

#[async_trait]
impl<T: RecentlyPlayedApi + ?Sized> RecentlyPlayedApi for Arc<T> {
    async fn recently_played(&self, limit: u32) -> Result<Vec<PlayEvent>> {
        (**self).recently_played(limit).await
    }
}

#[async_trait]
impl<T: RecommendationApi + ?Sized> RecommendationApi for Arc<T> {
    async fn discover_recommendations(&self, range: TimeRange, limit: u32) -> Result<Vec<Track>> {
        (**self).discover_recommendations(range, limit).await
    }

    async fn similar_tracks(&self, track_id: &str, limit: u32) -> Result<Vec<Track>> {
        (**self).similar_tracks(track_id, limit).await
    }

    async fn generate_playlist(
        &self,
        playlist_type: &str,
        track_count: u32,
        seed_track_ids: &[String],
    ) -> Result<GeneratedPlaylist> {
        (**self)
            .generate_playlist(playlist_type, track_count, seed_track_ids)
            .await
    }
}
