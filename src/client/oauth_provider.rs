use std::collections::BTreeMap;

use serde::Serialize;

pub const GOOGLE_PROVIDER_ID: &str = "google.com";

/// Scopes requested on every Google sign-in.
pub const DEFAULT_SCOPES: [&str; 2] = ["profile", "email"];

/// Describes an OAuth sign-in method: provider id, requested scopes and any
/// custom parameters to forward to the provider's consent screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthProvider {
    provider_id: String,
    scopes: Vec<String>,
    custom_parameters: BTreeMap<String, String>,
}

impl OAuthProvider {
    pub fn new(provider_id: &str) -> Self {
        OAuthProvider {
            provider_id: provider_id.to_string(),
            scopes: Vec::new(),
            custom_parameters: BTreeMap::new(),
        }
    }

    /// A Google provider with no scopes yet.
    pub fn google() -> Self {
        Self::new(GOOGLE_PROVIDER_ID)
    }

    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    /// Request an extra scope. Duplicates are ignored; order is kept.
    pub fn add_scope(&mut self, scope: &str) -> &mut Self {
        if !self.scopes.iter().any(|s| s == scope) {
            self.scopes.push(scope.to_string());
        }
        self
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Replace the custom OAuth parameters (e.g. `prompt`, `login_hint`).
    pub fn set_custom_parameters<I, K, V>(&mut self, params: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.custom_parameters = params
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    pub fn custom_parameters(&self) -> &BTreeMap<String, String> {
        &self.custom_parameters
    }

    /// Build a credential from tokens obtained out of band.
    pub fn credential(&self, id_token: Option<&str>, access_token: Option<&str>) -> OAuthCredential {
        OAuthCredential {
            provider_id: self.provider_id.clone(),
            id_token: id_token.map(str::to_string),
            access_token: access_token.map(str::to_string),
        }
    }
}

/// Tokens from an OAuth provider, exchangeable for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthCredential {
    pub provider_id: String,
    pub id_token: Option<String>,
    pub access_token: Option<String>,
}

impl OAuthCredential {
    /// The url-encoded `postBody` expected by `accounts:signInWithIdp`.
    pub fn post_body(&self) -> String {
        let mut parts = Vec::new();
        if let Some(id_token) = &self.id_token {
            parts.push(format!("id_token={}", urlencoding::encode(id_token)));
        }
        if let Some(access_token) = &self.access_token {
            parts.push(format!("access_token={}", urlencoding::encode(access_token)));
        }
        parts.push(format!("providerId={}", urlencoding::encode(&self.provider_id)));
        parts.join("&")
    }
}
