use std::sync::Arc;

use tracing::info;

use crate::config::ConnectionConfig;
use crate::error::{SdkError, SdkResult};

pub const DEFAULT_APP_NAME: &str = "[DEFAULT]";

/// Connection handle to the provider project. Immutable once built and
/// cheap to clone; every service handle keeps one.
#[derive(Clone, Debug)]
pub struct App {
    inner: Arc<AppInner>,
}

#[derive(Debug)]
struct AppInner {
    name: String,
    options: ConnectionConfig,
    http: reqwest::Client,
}

impl App {
    pub fn initialize(options: ConnectionConfig) -> SdkResult<Self> {
        Self::initialize_named(options, DEFAULT_APP_NAME)
    }

    pub fn initialize_named(options: ConnectionConfig, name: &str) -> SdkResult<Self> {
        for (key, url) in [
            ("identity_toolkit_url", &options.identity_toolkit_url),
            ("secure_token_url", &options.secure_token_url),
            ("firestore_url", &options.firestore_url),
        ] {
            reqwest::Url::parse(url)
                .map_err(|e| SdkError::InvalidConfig(format!("{} '{}': {}", key, url, e)))?;
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("authwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        info!(
            "Initialized app '{}' for project '{}'",
            name, options.project_id
        );

        Ok(App {
            inner: Arc::new(AppInner {
                name: name.to_string(),
                options,
                http,
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn options(&self) -> &ConnectionConfig {
        &self.inner.options
    }

    pub fn api_key(&self) -> &str {
        &self.inner.options.api_key
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    /// `{identity_toolkit}/v1/accounts:{method}?key=...`
    pub(crate) fn accounts_endpoint(&self, method: &str) -> String {
        format!(
            "{}/v1/accounts:{}?key={}",
            self.inner.options.identity_toolkit_url.trim_end_matches('/'),
            method,
            urlencoding::encode(self.api_key())
        )
    }

    pub(crate) fn secure_token_endpoint(&self) -> String {
        format!(
            "{}/v1/token?key={}",
            self.inner.options.secure_token_url.trim_end_matches('/'),
            urlencoding::encode(self.api_key())
        )
    }

    /// Root of the default database's documents.
    pub(crate) fn documents_root(&self) -> String {
        format!(
            "{}/v1/projects/{}/databases/(default)/documents",
            self.inner.options.firestore_url.trim_end_matches('/'),
            self.inner.options.project_id
        )
    }

    /// Resource name of the default database's documents, as used inside
    /// document payloads.
    pub(crate) fn documents_resource(&self) -> String {
        format!(
            "projects/{}/databases/(default)/documents",
            self.inner.options.project_id
        )
    }
}
