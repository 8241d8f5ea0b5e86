#![allow(dead_code)]

use authwatch::config::{load_config_str, ConfigV1};
use mockito::{Matcher, Mock, ServerGuard};
use serde_json::json;

pub const API_KEY: &str = "test-key";

/// A v1 config with every endpoint pointed at `server`.
pub fn config_for(server: &ServerGuard, debug: bool) -> ConfigV1 {
    let yaml = format!(
        r#"
version: "1.0.0"
debug: {debug}
connection:
  api_key: "{key}"
  auth_domain: "demo.firebaseapp.com"
  project_id: "demo"
  storage_bucket: "demo.appspot.com"
  messaging_sender_id: "1234"
  app_id: "1:1234:web:abcd"
  identity_toolkit_url: "{url}"
  secure_token_url: "{url}"
  firestore_url: "{url}"
logging:
  level: "debug"
  format: "console"
"#,
        debug = debug,
        key = API_KEY,
        url = server.url()
    );
    load_config_str(&yaml).expect("test config should parse")
}

pub fn key_query() -> Matcher {
    Matcher::UrlEncoded("key".into(), API_KEY.into())
}

/// Mock `signInWithIdp` and `lookup` for a Google sign-in of `uid`.
/// Returns `(sign_in, lookup)`; keep both alive for the test's duration.
pub async fn mock_google_sign_in(
    server: &mut ServerGuard,
    uid: &str,
    id_token: &str,
) -> (Mock, Mock) {
    let lookup = server
        .mock("POST", "/v1/accounts:lookup")
        .match_query(key_query())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({ "users": [{
                "localId": uid,
                "email": format!("{}@example.com", uid),
                "emailVerified": true,
                "displayName": "Test User",
                "createdAt": "1600000000000",
                "lastLoginAt": "1700000000000",
                "providerUserInfo": [{ "providerId": "google.com", "rawId": format!("g-{}", uid) }]
            }]})
            .to_string(),
        )
        .create_async()
        .await;

    let sign_in = server
        .mock("POST", "/v1/accounts:signInWithIdp")
        .match_query(key_query())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "localId": uid,
                "idToken": id_token,
                "refreshToken": format!("refresh-{}", uid),
                "expiresIn": "3600",
                "providerId": "google.com"
            })
            .to_string(),
        )
        .create_async()
        .await;

    (sign_in, lookup)
}
