//! Random pairing of a roster of email addresses, steering away from pairs
//! that met in recent rounds.

pub mod emails;
pub mod pairs;

pub use emails::{collect_emails, filter_emails};
pub use pairs::{
    calculate_history_score, convert_date_to_score, has_pair_in_pairs, pair_emails, ScoredRound,
    HISTORY_BASELINE_DAYS,
};

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::config::PairingConfig;
use crate::error::SdkResult;

/// The groups chosen for a round and how much recent history they repeat.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Round {
    pub score: i64,
    pub pairs: Vec<Vec<String>>,
}

/// Collect the roster and pair it against the configured history.
pub async fn run_pairing(http: &reqwest::Client, config: &PairingConfig) -> SdkResult<Round> {
    let now = Utc::now();
    let history = config
        .history
        .iter()
        .map(|round| ScoredRound::from_past(round, now))
        .collect::<SdkResult<Vec<_>>>()?;

    let emails = collect_emails(http, config).await?;
    let (score, pairs) = pair_emails(
        &emails,
        &history,
        config.sample_count,
        &mut rand::thread_rng(),
    );
    info!(
        "Paired {} emails into {} groups (history score {})",
        emails.len(),
        pairs.len(),
        score
    );
    Ok(Round { score, pairs })
}
