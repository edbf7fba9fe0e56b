//! Backend payloads. All of these are read-only display projections.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Listening-history window the backend aggregates over.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "short_term")]
    Short,
    #[default]
    #[serde(rename = "medium_term")]
    Medium,
    #[serde(rename = "long_term")]
    Long,
}

impl TimeRange {
    /// Query-string value.
    pub fn as_str(self) -> &'static str {
        match self {
            TimeRange::Short => "short_term",
            TimeRange::Medium => "medium_term",
            TimeRange::Long => "long_term",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimeRange::Short => "Recent Vibes",
            TimeRange::Medium => "Current Favorites",
            TimeRange::Long => "All-Time Classics",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            TimeRange::Short => "Last 4 weeks",
            TimeRange::Medium => "Last 6 months",
            TimeRange::Long => "Your entire history",
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "short" | "recent" | "short_term" => Ok(TimeRange::Short),
            "medium" | "medium_term" => Ok(TimeRange::Medium),
            "long" | "long_term" => Ok(TimeRange::Long),
            other => Err(Error::InvalidTimeRange(other.to_string())),
        }
    }
}

/// The signed-in user as reported by `/auth/me`.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub spotify_id: String,
}

/// A track as projected by the backend.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<String>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub spotify_url: Option<String>,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub popularity: Option<u32>,
    #[serde(default)]
    pub genres: Vec<String>,
}

impl Track {
    pub fn artist_line(&self) -> String {
        self.artists.join(", ")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Artist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub popularity: Option<u32>,
    #[serde(default)]
    pub genres: Vec<String>,
}

/// `GET /spotify/top-items` body.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct TopItems {
    #[serde(default)]
    pub tracks: Vec<Track>,
    #[serde(default)]
    pub artists: Vec<Artist>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct GenreCount {
    pub name: String,
    pub count: u32,
}

/// `GET /spotify/analytics` body.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    #[serde(default)]
    pub total_top_tracks: u32,
    #[serde(default)]
    pub total_top_artists: u32,
    #[serde(default)]
    pub top_genre: Option<String>,
    #[serde(default)]
    pub avg_popularity: f64,
    #[serde(default)]
    pub genre_distribution: Vec<GenreCount>,
}

impl Analytics {
    /// Each genre's share of the distribution, in `0.0..=1.0`.
    pub fn genre_shares(&self) -> Vec<(&str, f64)> {
        let total: u32 = self.genre_distribution.iter().map(|g| g.count).sum();
        if total == 0 {
            return Vec::new();
        }
        self.genre_distribution
            .iter()
            .map(|g| (g.name.as_str(), f64::from(g.count) / f64::from(total)))
            .collect()
    }
}

/// One entry of the recently-played history.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayEvent {
    #[serde(flatten)]
    pub track: Track,
    pub played_at: DateTime<Utc>,
}

/// `POST /recommendations/playlist/generate` body.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistRequest {
    pub playlist_type: String,
    pub track_count: u32,
    pub seed_track_ids: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct GeneratedPlaylist {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tracks: Vec<Track>,
}
