use anyhow::{anyhow, bail};
use chrono::Utc;
use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use moodtune_client::api::{ApiClient, AuthApi, TimeRange};
use moodtune_client::callback::{self, CallbackState};
use moodtune_client::config::Config;
use moodtune_client::credentials::CredentialStore;
use moodtune_client::dashboard::{Dashboard, ListeningSnapshot};
use moodtune_client::panels::{
    format_duration, format_played_ago, genre_breakdown, DiscoverPanel, RecentlyPlayedPanel,
};
use moodtune_client::session::gate::{GateState, ViewGate};
use moodtune_client::session::guard::{HandoffState, SessionGuard};
use moodtune_client::session::Route;

const MAX_SIGN_IN_ATTEMPTS: u32 = 3;

/// MoodTune listening dashboard.
#[derive(Debug, Parser)]
#[command(name = "moodtune", version)]
struct Cli {
    /// Listening window: short, medium or long.
    #[arg(long, default_value = "medium")]
    range: TimeRange,

    /// Forget the stored session and exit.
    #[arg(long)]
    logout: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let credentials = CredentialStore::open(&config.token_file).await?;
    let api = ApiClient::new(config.api_base_url.clone(), credentials.clone());

    if cli.logout {
        let gate = ViewGate::new(api.clone(), credentials.clone());
        gate.logout().await?;
        println!("Signed out.");
        return Ok(());
    }

    let mut route = if credentials.get().await.is_some() {
        Route::Dashboard
    } else {
        Route::Entry
    };
    let mut attempts = 0;

    loop {
        route = match route {
            Route::Entry => {
                attempts += 1;
                if attempts > MAX_SIGN_IN_ATTEMPTS {
                    bail!("sign-in failed {} times, giving up", MAX_SIGN_IN_ATTEMPTS);
                }
                sign_in(&config, &api, &credentials).await?
            }
            Route::Dashboard => match show_dashboard(&config, &api, cli.range).await? {
                Some(next) => next,
                None => return Ok(()),
            },
        };
    }
}

/// Runs the redirect handoff and returns where it navigates to.
async fn sign_in(config: &Config, api: &ApiClient, credentials: &CredentialStore) -> anyhow::Result<Route> {
    let url = api.auth_redirect_url().await?;

    let (tx, mut rx) = mpsc::channel(1);
    let guard = SessionGuard::new(credentials.clone())
        .with_delays(config.handoff_success_delay, config.handoff_failure_delay);
    let (addr, server) = callback::serve(config.callback_port, CallbackState::new(guard, tx)).await?;

    println!("Open this URL to sign in:\n\n  {}\n", url);
    println!("Waiting for the redirect on http://{}/auth/callback", addr);
    println!("{}", HandoffState::Processing.message());

    let handoff = rx
        .recv()
        .await
        .ok_or_else(|| anyhow!("callback listener stopped"))?;
    println!("{}", handoff.state.message());

    let next = match handoff.navigation {
        Some(nav) => nav.wait().await,
        None => Route::Entry,
    };
    server.abort();
    Ok(next)
}

/// Shows the protected dashboard. `None` means the view rendered and the
/// program is done; `Some` is a redirect.
async fn show_dashboard(config: &Config, api: &ApiClient, range: TimeRange) -> anyhow::Result<Option<Route>> {
    let gate = ViewGate::new(api.clone(), api.credentials().clone());
    println!("Loading...");

    let user = match gate.activate().await {
        GateState::Authenticated(user) => user,
        state => return Ok(Some(state.navigation().map_or(Route::Entry, |n| n.to))),
    };
    println!("\nWelcome, {}!", user.display_name);
    println!("Email: {}", user.email.as_deref().unwrap_or("Not provided"));
    println!("Spotify ID: {}", user.spotify_id);

    let dashboard = Dashboard::new(api.clone());
    let recent = RecentlyPlayedPanel::with_limit(api.clone(), config.recently_played_limit);
    let discover = DiscoverPanel::with_limit(api.clone(), range, config.discover_limit);

    let (round, recent_outcome, discover_outcome) =
        tokio::join!(dashboard.refresh(range), recent.load(), discover.load());

    if let Some(nav) = gate
        .evict_on_rejection(&[round, recent_outcome, discover_outcome])
        .await?
    {
        return Ok(Some(nav.to));
    }

    match dashboard.snapshot() {
        Some(snapshot) => print_snapshot(&snapshot),
        None => println!("\nListening stats are unavailable right now."),
    }

    println!("\nRecently Played");
    let now = Utc::now();
    for event in recent.events() {
        println!(
            "  {:<40} {:<30} {:>8} {:>6}",
            event.track.name,
            event.track.artist_line(),
            format_played_ago(event.played_at, now),
            format_duration(event.track.duration_ms),
        );
    }

    let tracks = discover.tracks();
    println!("\nDiscover: {} ({})", range.label(), range.description());
    if tracks.is_empty() {
        println!("  No recommendations found");
    }
    for (i, track) in tracks.iter().enumerate() {
        println!(
            "  #{:<3} {:<40} {:<30} {:>3}%",
            i + 1,
            track.name,
            track.artist_line(),
            track.popularity.unwrap_or(0),
        );
    }

    Ok(None)
}

fn print_snapshot(snapshot: &ListeningSnapshot) {
    let analytics = &snapshot.analytics;
    println!("\n{} ({})", snapshot.range.label(), snapshot.range.description());
    println!("  Top tracks:     {}", analytics.total_top_tracks);
    println!("  Top artists:    {}", analytics.total_top_artists);
    println!("  Top genre:      {}", analytics.top_genre.as_deref().unwrap_or("-"));
    println!("  Avg popularity: {:.0}", analytics.avg_popularity);

    for line in genre_breakdown(analytics) {
        println!("    {}", line);
    }

    println!("\nTop Tracks");
    for (i, track) in snapshot.top_tracks.iter().enumerate() {
        println!("  {:>2}. {} - {}", i + 1, track.name, track.artist_line());
    }

    println!("\nTop Artists");
    for (i, artist) in snapshot.top_artists.iter().enumerate() {
        println!("  {:>2}. {}", i + 1, artist.name);
    }
}
