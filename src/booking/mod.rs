mod client;
mod extract;

use crate::configuration::WaitingRoomSettings;
use crate::domain::{Anchor, Location};
use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;

pub use client::BookingClient;
pub use extract::extract_availability;

const REAUTH_MARKERS: [&str; 3] = [
    "session expired",
    "Votre session a expiré",
    "Your session has expired",
];
const WAITING_ROOM_MARKER: &str = "Your Rank in the waiting room";

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Failed to reach the booking site.")]
    Transport(#[from] reqwest::Error),
    #[error("The booking site answered with status {status}.")]
    Upstream { status: u16 },
    #[error("The booking session has expired and must be refreshed.")]
    ReauthRequired,
    #[error("Still queued in the booking waiting room after {attempts} attempts.")]
    WaitingRoom { attempts: u32 },
}

/// Source of raw booking calendar pages.
#[async_trait]
pub trait BookingPage: Send + Sync {
    async fn fetch(&self, location: Location, anchor: Anchor) -> Result<String, FetchError>;
}

pub fn requires_reauth(body: &str) -> bool {
    REAUTH_MARKERS.iter().any(|marker| body.contains(marker))
}

pub fn is_waiting_room(body: &str) -> bool {
    body.contains(WAITING_ROOM_MARKER)
}

/// Fetches a page, waiting out the upstream queue with a bounded exponential backoff.
#[tracing::instrument(name = "Fetch with waiting room backoff", skip(page, policy))]
pub async fn fetch_with_backoff(
    page: &dyn BookingPage,
    location: Location,
    anchor: Anchor,
    policy: &WaitingRoomSettings,
) -> Result<String, FetchError> {
    let mut attempt = 1;
    loop {
        let body = page.fetch(location, anchor).await?;
        if !is_waiting_room(&body) {
            return Ok(body);
        }
        if attempt >= policy.max_attempts {
            return Err(FetchError::WaitingRoom { attempts: attempt });
        }
        let delay = backoff_delay(policy, attempt);
        tracing::info!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            "Queued in the booking waiting room, retrying"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

/// `initial * 2^(attempt - 1)` plus up to 20% jitter, never above the configured maximum.
fn backoff_delay(policy: &WaitingRoomSettings, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    let base = policy
        .initial_backoff()
        .saturating_mul(1 << exponent)
        .min(policy.max_backoff());
    let jitter_ms = (base.as_millis() as u64) / 5;
    let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms));
    (base + jitter).min(policy.max_backoff())
}
