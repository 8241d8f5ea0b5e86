use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Connection parameters for the identity/database project.
///
/// The endpoint URLs default to the public Google APIs and only need to be
/// set when talking to an emulator or a mock server.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ConnectionConfig {
    pub api_key: String,
    pub auth_domain: String,
    pub project_id: String,
    #[serde(default)]
    pub storage_bucket: Option<String>,
    #[serde(default)]
    pub messaging_sender_id: Option<String>,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub measurement_id: Option<String>,
    #[serde(default = "default_identity_toolkit_url")]
    pub identity_toolkit_url: String,
    #[serde(default = "default_secure_token_url")]
    pub secure_token_url: String,
    #[serde(default = "default_firestore_url")]
    pub firestore_url: String,
}

fn default_identity_toolkit_url() -> String {
    "https://identitytoolkit.googleapis.com".to_string()
}

fn default_secure_token_url() -> String {
    "https://securetoken.googleapis.com".to_string()
}

fn default_firestore_url() -> String {
    "https://firestore.googleapis.com".to_string()
}

impl ConnectionConfig {
    /// Connection parameters with every endpoint pointed at `base_url`.
    pub fn with_endpoint(api_key: &str, project_id: &str, base_url: &str) -> Self {
        ConnectionConfig {
            api_key: api_key.to_string(),
            auth_domain: format!("{}.firebaseapp.com", project_id),
            project_id: project_id.to_string(),
            storage_bucket: None,
            messaging_sender_id: None,
            app_id: None,
            measurement_id: None,
            identity_toolkit_url: base_url.to_string(),
            secure_token_url: base_url.to_string(),
            firestore_url: base_url.to_string(),
        }
    }
}
