//! Client initialization: the connection handle, the auth and database
//! services bound to it, and the OAuth provider used for sign-in.

pub mod app;
pub mod oauth_provider;
pub mod sdk_log;

use std::sync::Arc;

use tracing::info;

pub use app::{App, DEFAULT_APP_NAME};
pub use oauth_provider::{OAuthCredential, OAuthProvider, DEFAULT_SCOPES};
pub use sdk_log::{LogLevel, SdkLog, SdkLogger};

use crate::auth::AuthService;
use crate::config::ConfigV1;
use crate::db::Database;
use crate::error::SdkResult;

/// Everything the rest of the application needs from the provider.
pub struct Client {
    pub app: App,
    pub auth: Arc<AuthService>,
    pub provider: OAuthProvider,
    pub db: Database,
}

/// Initialize the client with the default SDK logger.
pub fn initialize_client(config: &ConfigV1) -> SdkResult<Client> {
    initialize_client_with(config, Arc::new(SdkLogger::new()))
}

/// Initialize the client, raising `sdk_log` to `debug` when the config's
/// debug flag is set.
pub fn initialize_client_with(config: &ConfigV1, sdk_log: Arc<dyn SdkLog>) -> SdkResult<Client> {
    let app = App::initialize(config.connection.clone())?;
    let auth = Arc::new(AuthService::new(app.clone()));

    let mut provider = OAuthProvider::google();
    for scope in DEFAULT_SCOPES {
        provider.add_scope(scope);
    }

    if config.debug {
        sdk_log.set_log_level(LogLevel::Debug);
    }
    let db = Database::new(app.clone(), auth.clone(), sdk_log);

    info!(
        "Client ready: provider '{}' with scopes [{}]",
        provider.provider_id(),
        provider.scopes().join(", ")
    );

    Ok(Client {
        app,
        auth,
        provider,
        db,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConnectionConfig, LoggingConfig, PairingConfig};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingLog {
        calls: Mutex<Vec<LogLevel>>,
    }

    impl SdkLog for RecordingLog {
        fn set_log_level(&self, level: LogLevel) {
            self.calls.lock().unwrap().push(level);
        }

        fn log_level(&self) -> LogLevel {
            self.calls.lock().unwrap().last().copied().unwrap_or(LogLevel::Error)
        }
    }

    fn config(debug: bool) -> ConfigV1 {
        ConfigV1 {
            connection: ConnectionConfig::with_endpoint("key", "demo", "http://127.0.0.1:9099"),
            debug,
            logging: LoggingConfig::default(),
            pairing: PairingConfig::default(),
        }
    }

    #[test]
    fn test_debug_flag_raises_sdk_log_once() {
        let log = Arc::new(RecordingLog::default());
        let client = initialize_client_with(&config(true), log.clone()).unwrap();

        assert_eq!(*log.calls.lock().unwrap(), vec![LogLevel::Debug]);
        assert_eq!(client.app.options().project_id, "demo");
    }

    #[test]
    fn test_no_debug_flag_leaves_sdk_log_alone() {
        let log = Arc::new(RecordingLog::default());
        initialize_client_with(&config(false), log.clone()).unwrap();
        assert!(log.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_provider_has_profile_and_email_scopes() {
        let client = initialize_client(&config(false)).unwrap();
        assert_eq!(client.provider.provider_id(), "google.com");
        assert_eq!(client.provider.scopes(), ["profile", "email"]);
    }

    #[test]
    fn test_handles_share_the_connection() {
        let client = initialize_client(&config(false)).unwrap();
        assert_eq!(client.auth.app().name(), client.app.name());
        assert_eq!(client.db.app().api_key(), "key");
        assert!(client.auth.current_user().is_none());
    }
}
