use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Where the pairing roster lives and how hard to look for fresh pairs.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct PairingConfig {
    /// Spreadsheet id holding the roster, exported as CSV.
    #[serde(default)]
    pub spreadsheet: Option<String>,
    /// Sheet id within the spreadsheet.
    #[serde(default = "default_sheet")]
    pub sheet: String,
    /// Random pairings tried before keeping the least repetitive one.
    #[serde(default = "default_sample_count")]
    pub sample_count: usize,
    #[serde(default = "default_export_url")]
    pub export_url: String,
    /// Earlier rounds, used to avoid repeating recent pairs.
    #[serde(default)]
    pub history: Vec<PastRound>,
}

/// A previous round: when it was sent and who was paired.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, JsonSchema)]
pub struct PastRound {
    /// `YYYY-MM-DDTHH:MM:SS` or RFC 3339.
    pub sent_at: String,
    pub pairs: Vec<Vec<String>>,
}

fn default_sheet() -> String {
    "0".to_string()
}

fn default_sample_count() -> usize {
    1000
}

fn default_export_url() -> String {
    "https://docs.google.com/spreadsheets/d".to_string()
}

impl Default for PairingConfig {
    fn default() -> Self {
        PairingConfig {
            spreadsheet: None,
            sheet: default_sheet(),
            sample_count: default_sample_count(),
            export_url: default_export_url(),
            history: Vec::new(),
        }
    }
}
