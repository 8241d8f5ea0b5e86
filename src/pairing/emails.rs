use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::config::PairingConfig;
use crate::error::{check_response, SdkError, SdkResult};

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)*\.[A-Za-z]{2,}$")
        .expect("Failed to compile email regex")
});

/// Keep well-formed addresses, trimmed and lowercased, in first-seen order
/// without duplicates.
pub fn filter_emails<S: AsRef<str>>(emails: &[S]) -> Vec<String> {
    let mut kept: Vec<String> = Vec::new();
    for email in emails {
        let email = email.as_ref().trim().to_lowercase();
        if EMAIL_REGEX.is_match(&email) && !kept.contains(&email) {
            kept.push(email);
        }
    }
    kept
}

/// Every cell of a CSV export, unquoted.
fn csv_cells(body: &str) -> impl Iterator<Item = &str> {
    body.lines()
        .flat_map(|line| line.split(','))
        .map(|cell| cell.trim().trim_matches('"').trim())
}

/// Fetch the roster sheet as CSV and return the valid addresses in it.
pub async fn collect_emails(
    http: &reqwest::Client,
    config: &PairingConfig,
) -> SdkResult<Vec<String>> {
    let spreadsheet = config
        .spreadsheet
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| SdkError::InvalidConfig("pairing.spreadsheet is not set".to_string()))?;

    let url = format!(
        "{}/{}/export",
        config.export_url.trim_end_matches('/'),
        urlencoding::encode(spreadsheet)
    );
    debug!("Fetching roster sheet '{}' from {}", config.sheet, url);
    let resp = http
        .get(&url)
        .query(&[("format", "csv"), ("gid", config.sheet.as_str())])
        .send()
        .await?;
    let body = check_response(resp).await?.text().await?;

    let cells: Vec<&str> = csv_cells(&body).filter(|c| c.contains('@')).collect();
    let emails = filter_emails(cells.as_slice());
    info!(
        "Collected {} emails from {} candidate cells",
        emails.len(),
        cells.len()
    );
    Ok(emails)
}
