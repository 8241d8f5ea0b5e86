use thiserror::Error;

/// Errors surfaced by the provider client.
#[derive(Debug, Error)]
pub enum SdkError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with an error payload, e.g. `INVALID_IDP_RESPONSE`.
    #[error("Provider error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("No user is currently signed in")]
    NoCurrentUser,

    #[error("Invalid id token: {0}")]
    InvalidToken(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unsupported document value: {0}")]
    UnsupportedValue(String),

    #[error("Invalid document path: {0}")]
    InvalidPath(String),
}

pub type SdkResult<T> = Result<T, SdkError>;

impl SdkError {
    /// The provider's error code when this is an API error.
    pub fn api_code(&self) -> Option<&str> {
        match self {
            SdkError::Api { message, .. } => {
                // Codes may carry a detail suffix: "TOKEN_EXPIRED : details"
                Some(message.split(" : ").next().unwrap_or(message).trim())
            }
            _ => None,
        }
    }
}

/// Turns a non-success provider response into `SdkError::Api`, keeping the
/// provider's `error.message` code when the body has one.
pub(crate) async fn check_response(resp: reqwest::Response) -> SdkResult<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| {
            v["error"]["message"]
                .as_str()
                .or_else(|| v["error"].as_str())
                .map(str::to_string)
        })
        .unwrap_or(body);

    Err(SdkError::Api {
        status: status.as_u16(),
        message,
    })
}
