//! # MoodTune client
//!
//! Session and data orchestration for the MoodTune listening dashboard.
//!
//! The pieces, leaf first:
//!
//! - [`credentials::CredentialStore`] holds the bearer token, optionally on disk.
//! - [`api::ApiClient`] talks to the backend and attaches the token.
//! - [`session::guard::SessionGuard`] completes the identity provider's redirect.
//! - [`session::gate::ViewGate`] keeps protected views behind a verified session.
//! - [`dashboard::Dashboard`] runs generation-stamped orchestration rounds.
//! - [`panels`] hold the independently fetching recently-played and discovery
//!   panels.
//!
//! ```ignore
//! use moodtune_client::{api::ApiClient, credentials::CredentialStore, dashboard::Dashboard};
//! use moodtune_client::api::TimeRange;
//!
//! let store = CredentialStore::open("/tmp/moodtune-token").await?;
//! let dashboard = Dashboard::new(ApiClient::new("http://localhost:8080/api", store));
//! dashboard.refresh(TimeRange::Short).await;
//! ```

pub mod api;
pub mod callback;
pub mod config;
pub mod credentials;
pub mod dashboard;
pub mod error;
pub mod panels;
pub mod resource;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use error::Error;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
