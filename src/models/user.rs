use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tokens are treated as expired this long before their real expiry.
pub const TOKEN_REFRESH_BUFFER_MS: i64 = 30_000;

/// The refresh/access token pair the provider keeps per signed-in user.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StsTokenManager {
    pub refresh_token: String,
    pub access_token: String,
    /// Expiry of `access_token`, in epoch milliseconds.
    pub expiration_time: i64,
}

impl StsTokenManager {
    /// Build from a provider response carrying `expiresIn` seconds.
    /// Lifetimes too large to represent saturate at `i64::MAX`.
    pub fn from_expires_in(refresh_token: String, access_token: String, expires_in: i64) -> Self {
        StsTokenManager {
            refresh_token,
            access_token,
            expiration_time: Utc::now()
                .timestamp_millis()
                .saturating_add(expires_in.saturating_mul(1000)),
        }
    }

    /// Whether the access token is expired or about to expire.
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp_millis() >= self.expiration_time - TOKEN_REFRESH_BUFFER_MS
    }
}

/// Profile information a linked identity provider holds about the user.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub provider_id: String,
    pub uid: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
}

/// A signed-in user as the provider describes it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RawUser {
    pub uid: String,
    pub email: Option<String>,
    pub email_verified: bool,
    pub display_name: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    pub phone_number: Option<String>,
    pub is_anonymous: bool,
    pub provider_data: Vec<UserInfo>,
    /// Account creation time, epoch milliseconds as a string.
    pub created_at: Option<String>,
    /// Last sign-in time, epoch milliseconds as a string.
    pub last_login_at: Option<String>,
    pub api_key: String,
    pub app_name: String,
    pub sts_token_manager: StsTokenManager,
}

impl RawUser {
    /// A user with only the identifying fields set.
    pub fn new(uid: &str, api_key: &str, app_name: &str, tokens: StsTokenManager) -> Self {
        RawUser {
            uid: uid.to_string(),
            email: None,
            email_verified: false,
            display_name: None,
            photo_url: None,
            phone_number: None,
            is_anonymous: false,
            provider_data: Vec::new(),
            created_at: None,
            last_login_at: None,
            api_key: api_key.to_string(),
            app_name: app_name.to_string(),
            sts_token_manager: tokens,
        }
    }

    /// Serialized snapshot of the user, the shape other tooling expects
    /// (`stsTokenManager` included).
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Fold an `accounts:lookup` entry into this user.
    pub fn apply_lookup(&mut self, account: &Value) {
        let string = |key: &str| account[key].as_str().map(str::to_string);

        if let Some(email) = string("email") {
            self.email = Some(email);
        }
        if let Some(verified) = account["emailVerified"].as_bool() {
            self.email_verified = verified;
        }
        if let Some(name) = string("displayName") {
            self.display_name = Some(name);
        }
        if let Some(photo) = string("photoUrl") {
            self.photo_url = Some(photo);
        }
        if let Some(phone) = string("phoneNumber") {
            self.phone_number = Some(phone);
        }
        self.created_at = string("createdAt").or(self.created_at.take());
        self.last_login_at = string("lastLoginAt").or(self.last_login_at.take());

        if let Some(providers) = account["providerUserInfo"].as_array() {
            self.provider_data = providers
                .iter()
                .map(|p| UserInfo {
                    provider_id: p["providerId"].as_str().unwrap_or_default().to_string(),
                    uid: p["rawId"]
                        .as_str()
                        .or_else(|| p["federatedId"].as_str())
                        .unwrap_or_default()
                        .to_string(),
                    display_name: p["displayName"].as_str().map(str::to_string),
                    email: p["email"].as_str().map(str::to_string),
                    phone_number: p["phoneNumber"].as_str().map(str::to_string),
                    photo_url: p["photoUrl"].as_str().map(str::to_string),
                })
                .collect();
        }
        // A sign-in response names the provider at the top level.
        let linked = account["providerId"].as_str().is_some_and(|p| !p.is_empty());
        self.is_anonymous = !linked && self.provider_data.is_empty() && self.email.is_none();
    }
}
