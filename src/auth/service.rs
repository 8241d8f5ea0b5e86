use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use super::session::SessionSource;
use super::token::{parse_id_token, IdTokenResult};
use crate::client::oauth_provider::{OAuthCredential, OAuthProvider};
use crate::client::App;
use crate::error::{check_response, SdkError, SdkResult};
use crate::models::{RawUser, StsTokenManager};

/// Refresh failures after which the session cannot be recovered.
const FATAL_REFRESH_CODES: [&str; 4] = [
    "TOKEN_EXPIRED",
    "USER_DISABLED",
    "USER_NOT_FOUND",
    "INVALID_REFRESH_TOKEN",
];

/// Where to send the user to start an OAuth redirect sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUri {
    pub auth_uri: String,
    pub session_id: String,
}

#[derive(Deserialize)]
struct SecureTokenResponse {
    id_token: Option<String>,
    access_token: Option<String>,
    refresh_token: String,
    expires_in: Value,
}

/// Auth-service handle bound to an `App`. Holds the current session and
/// notifies subscribers whenever the signed-in uid changes.
pub struct AuthService {
    app: App,
    session: watch::Sender<Option<RawUser>>,
    refresh_lock: Mutex<()>,
}

fn parse_expires_in(value: &Value) -> SdkResult<i64> {
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
        .filter(|secs| *secs >= 0)
        .ok_or_else(|| SdkError::InvalidResponse(format!("invalid expiresIn: {}", value)))
}

fn required_str<'a>(value: &'a Value, key: &str) -> SdkResult<&'a str> {
    value[key]
        .as_str()
        .ok_or_else(|| SdkError::InvalidResponse(format!("missing '{}' in response", key)))
}

impl AuthService {
    pub fn new(app: App) -> Self {
        let (session, _) = watch::channel(None);
        AuthService {
            app,
            session,
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    pub fn current_user(&self) -> Option<RawUser> {
        self.session.borrow().clone()
    }

    /// Replace the session. Subscribers are only notified when the uid
    /// changes, so token refreshes and profile reloads stay silent.
    fn set_session(&self, user: Option<RawUser>) {
        self.session.send_if_modified(|current| {
            let changed = current.as_ref().map(|u| &u.uid) != user.as_ref().map(|u| &u.uid);
            *current = user;
            changed
        });
    }

    async fn post_json(&self, url: String, body: &Value) -> SdkResult<Value> {
        let resp = self.app.http().post(&url).json(body).send().await?;
        let resp = check_response(resp).await?;
        resp.json::<Value>()
            .await
            .map_err(|e| SdkError::InvalidResponse(e.to_string()))
    }

    /// Ask the provider for an authorization URL for `provider`, carrying its
    /// scopes and custom parameters.
    pub async fn create_auth_uri(
        &self,
        provider: &OAuthProvider,
        continue_uri: &str,
    ) -> SdkResult<AuthUri> {
        let body = json!({
            "providerId": provider.provider_id(),
            "continueUri": continue_uri,
            "oauthScope": provider.scopes().join(","),
            "customParameter": provider.custom_parameters(),
        });
        let resp = self
            .post_json(self.app.accounts_endpoint("createAuthUri"), &body)
            .await?;
        debug!("createAuthUri returned session for '{}'", provider.provider_id());
        serde_json::from_value(resp).map_err(|e| SdkError::InvalidResponse(e.to_string()))
    }

    /// Exchange OAuth tokens obtained elsewhere for a session.
    pub async fn sign_in_with_credential(&self, credential: &OAuthCredential) -> SdkResult<RawUser> {
        self.sign_in_with_idp(json!({
            "requestUri": "http://localhost",
            "postBody": credential.post_body(),
            "returnSecureToken": true,
            "returnIdpCredential": true,
        }))
        .await
    }

    /// Complete a redirect sign-in started with `create_auth_uri`.
    /// `request_uri` is the full callback URL the provider redirected to.
    pub async fn sign_in_with_redirect_result(
        &self,
        request_uri: &str,
        session_id: &str,
    ) -> SdkResult<RawUser> {
        self.sign_in_with_idp(json!({
            "requestUri": request_uri,
            "sessionId": session_id,
            "returnSecureToken": true,
            "returnIdpCredential": true,
        }))
        .await
    }

    async fn sign_in_with_idp(&self, body: Value) -> SdkResult<RawUser> {
        let resp = self
            .post_json(self.app.accounts_endpoint("signInWithIdp"), &body)
            .await?;

        if let Some(msg) = resp["errorMessage"].as_str() {
            return Err(SdkError::Api {
                status: 200,
                message: msg.to_string(),
            });
        }

        let tokens = StsTokenManager::from_expires_in(
            required_str(&resp, "refreshToken")?.to_string(),
            required_str(&resp, "idToken")?.to_string(),
            parse_expires_in(&resp["expiresIn"])?,
        );
        let mut user = RawUser::new(
            required_str(&resp, "localId")?,
            self.app.api_key(),
            self.app.name(),
            tokens,
        );
        user.apply_lookup(&resp);
        let linked = !user.is_anonymous;

        if let Some(account) = self.lookup(&user.sts_token_manager.access_token).await? {
            user.apply_lookup(&account);
            user.is_anonymous &= !linked;
        }

        info!("User '{}' signed in", user.uid);
        self.set_session(Some(user.clone()));
        Ok(user)
    }

    async fn lookup(&self, id_token: &str) -> SdkResult<Option<Value>> {
        let resp = self
            .post_json(
                self.app.accounts_endpoint("lookup"),
                &json!({ "idToken": id_token }),
            )
            .await?;
        Ok(resp["users"].as_array().and_then(|u| u.first()).cloned())
    }

    /// Re-read the current user's profile from the provider.
    pub async fn reload(&self) -> SdkResult<RawUser> {
        let token = self.get_id_token(false).await?;
        let mut user = self.current_user().ok_or(SdkError::NoCurrentUser)?;
        let account = self
            .lookup(&token)
            .await?
            .ok_or_else(|| SdkError::InvalidResponse("lookup returned no users".to_string()))?;
        user.apply_lookup(&account);

        let uid = user.uid.clone();
        let updated = user.clone();
        self.session.send_if_modified(|current| {
            if current.as_ref().is_some_and(|c| c.uid == uid) {
                *current = Some(updated);
            }
            false
        });
        Ok(user)
    }

    pub fn sign_out(&self) {
        if let Some(user) = self.current_user() {
            info!("User '{}' signed out", user.uid);
        }
        self.set_session(None);
    }

    async fn refresh(&self, refresh_token: &str) -> SdkResult<StsTokenManager> {
        let resp = self
            .app
            .http()
            .post(self.app.secure_token_endpoint())
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await?;
        let body = check_response(resp)
            .await?
            .json::<SecureTokenResponse>()
            .await
            .map_err(|e| SdkError::InvalidResponse(e.to_string()))?;

        let token = body.id_token.or(body.access_token).ok_or_else(|| {
            SdkError::InvalidResponse("token response carried no id_token".to_string())
        })?;
        Ok(StsTokenManager::from_expires_in(
            body.refresh_token,
            token,
            parse_expires_in(&body.expires_in)?,
        ))
    }

    /// The current user's ID token, refreshed first when it is about to
    /// expire or when `force_refresh` is set.
    pub async fn get_id_token(&self, force_refresh: bool) -> SdkResult<String> {
        let user = self.current_user().ok_or(SdkError::NoCurrentUser)?;
        if !force_refresh && !user.sts_token_manager.is_expired() {
            return Ok(user.sts_token_manager.access_token);
        }

        let _guard = self.refresh_lock.lock().await;
        // Another caller may have refreshed while we waited.
        let user = self.current_user().ok_or(SdkError::NoCurrentUser)?;
        if !force_refresh && !user.sts_token_manager.is_expired() {
            return Ok(user.sts_token_manager.access_token);
        }

        debug!("Refreshing id token for '{}'", user.uid);
        let tokens = match self.refresh(&user.sts_token_manager.refresh_token).await {
            Ok(tokens) => tokens,
            Err(e) => {
                if e.api_code().is_some_and(|c| FATAL_REFRESH_CODES.contains(&c)) {
                    warn!("Session for '{}' can no longer be refreshed: {}", user.uid, e);
                    self.set_session(None);
                }
                return Err(e);
            }
        };

        let token = tokens.access_token.clone();
        self.session.send_if_modified(|current| {
            if let Some(current) = current.as_mut().filter(|c| c.uid == user.uid) {
                current.sts_token_manager = tokens;
            }
            false
        });
        Ok(token)
    }

    pub async fn get_id_token_result(&self, force_refresh: bool) -> SdkResult<IdTokenResult> {
        let token = self.get_id_token(force_refresh).await?;
        parse_id_token(&token)
    }
}

#[async_trait]
impl SessionSource for AuthService {
    fn subscribe(&self) -> watch::Receiver<Option<RawUser>> {
        let mut rx = self.session.subscribe();
        rx.mark_changed();
        rx
    }

    async fn get_id_token(&self, force_refresh: bool) -> SdkResult<String> {
        AuthService::get_id_token(self, force_refresh).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::tests::make_id_token;
    use crate::config::ConnectionConfig;
    use chrono::Utc;
    use mockito::{Matcher, Mock, Server, ServerGuard};

    const API_KEY: &str = "test-key";

    fn auth_for(server: &ServerGuard) -> AuthService {
        let app = App::initialize(ConnectionConfig::with_endpoint(API_KEY, "demo", &server.url()))
            .expect("app should initialize");
        AuthService::new(app)
    }

    fn key_query() -> Matcher {
        Matcher::UrlEncoded("key".into(), API_KEY.into())
    }

    /// Mocks `signInWithIdp` and `lookup`; keep the returned mocks alive.
    async fn mock_sign_in(
        server: &mut ServerGuard,
        uid: &str,
        id_token: &str,
        expires_in: &str,
    ) -> (Mock, Mock) {
        let sign_in = server
            .mock("POST", "/v1/accounts:signInWithIdp")
            .match_query(key_query())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "localId": uid,
                    "idToken": id_token,
                    "refreshToken": "refresh-1",
                    "expiresIn": expires_in,
                    "email": "ada@example.com",
                    "providerId": "google.com"
                })
                .to_string(),
            )
            .create_async()
            .await;
        let lookup = server
            .mock("POST", "/v1/accounts:lookup")
            .match_query(key_query())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({ "users": [{
                    "localId": uid,
                    "email": "ada@example.com",
                    "emailVerified": true,
                    "displayName": "Ada",
                    "providerUserInfo": [{ "providerId": "google.com", "rawId": "g-1" }]
                }]})
                .to_string(),
            )
            .create_async()
            .await;
        (sign_in, lookup)
    }

    #[tokio::test]
    async fn test_sign_in_with_credential_sets_session() {
        let mut server = Server::new_async().await;
        let _mocks = mock_sign_in(&mut server, "u1", "tok123", "3600").await;
        let auth = auth_for(&server);
        let mut rx = SessionSource::subscribe(&auth);
        assert!(rx.borrow_and_update().is_none());

        let credential = OAuthProvider::google().credential(Some("google-id-token"), None);
        let user = auth.sign_in_with_credential(&credential).await.unwrap();

        assert_eq!(user.uid, "u1");
        assert_eq!(user.display_name.as_deref(), Some("Ada"));
        assert_eq!(user.provider_data[0].provider_id, "google.com");
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().as_ref().map(|u| u.uid.clone()), Some("u1".to_string()));
        assert_eq!(auth.get_id_token(false).await.unwrap(), "tok123");
    }

    #[tokio::test]
    async fn test_sign_in_error_surfaces_provider_code() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/v1/accounts:signInWithIdp")
            .match_query(key_query())
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": {"code": 400, "message": "INVALID_IDP_RESPONSE : bad token"}}"#)
            .create_async()
            .await;
        let auth = auth_for(&server);

        let credential = OAuthProvider::google().credential(Some("bad"), None);
        let err = auth.sign_in_with_credential(&credential).await.unwrap_err();
        assert_eq!(err.api_code(), Some("INVALID_IDP_RESPONSE"));
        assert!(auth.current_user().is_none());
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed_silently() {
        let mut server = Server::new_async().await;
        // expiresIn of 0 puts the token inside the refresh buffer immediately.
        let _mocks = mock_sign_in(&mut server, "u1", "stale", "0").await;
        let refresh = server
            .mock("POST", "/v1/token")
            .match_query(key_query())
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
                Matcher::UrlEncoded("refresh_token".into(), "refresh-1".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"id_token": "fresh", "refresh_token": "refresh-2", "expires_in": "3600", "token_type": "Bearer"}"#,
            )
            .expect(1)
            .create_async()
            .await;
        let auth = auth_for(&server);
        let credential = OAuthProvider::google().credential(Some("x"), None);
        auth.sign_in_with_credential(&credential).await.unwrap();

        let mut rx = SessionSource::subscribe(&auth);
        rx.borrow_and_update();

        assert_eq!(auth.get_id_token(false).await.unwrap(), "fresh");
        // Cached now; no second refresh call.
        assert_eq!(auth.get_id_token(false).await.unwrap(), "fresh");
        refresh.assert_async().await;

        let user = auth.current_user().unwrap();
        assert_eq!(user.sts_token_manager.refresh_token, "refresh-2");
        assert!(user.sts_token_manager.expiration_time > Utc::now().timestamp_millis());
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_fatal_refresh_error_signs_out() {
        let mut server = Server::new_async().await;
        let _mocks = mock_sign_in(&mut server, "u1", "stale", "0").await;
        let _m = server
            .mock("POST", "/v1/token")
            .match_query(key_query())
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": {"code": 400, "message": "TOKEN_EXPIRED"}}"#)
            .create_async()
            .await;
        let auth = auth_for(&server);
        let credential = OAuthProvider::google().credential(Some("x"), None);
        auth.sign_in_with_credential(&credential).await.unwrap();

        let err = auth.get_id_token(false).await.unwrap_err();
        assert_eq!(err.api_code(), Some("TOKEN_EXPIRED"));
        assert!(auth.current_user().is_none());
    }

    #[tokio::test]
    async fn test_get_id_token_without_user() {
        let server = Server::new_async().await;
        let auth = auth_for(&server);
        assert!(matches!(
            auth.get_id_token(false).await,
            Err(SdkError::NoCurrentUser)
        ));
    }

    #[tokio::test]
    async fn test_negative_expires_in_is_rejected() {
        let mut server = Server::new_async().await;
        let _mocks = mock_sign_in(&mut server, "u1", "tok", "-60").await;
        let auth = auth_for(&server);
        let credential = OAuthProvider::google().credential(Some("x"), None);

        let result = auth.sign_in_with_credential(&credential).await;
        assert!(matches!(result, Err(SdkError::InvalidResponse(_))));
        assert!(auth.current_user().is_none());
    }

    #[tokio::test]
    async fn test_huge_expires_in_does_not_overflow() {
        let mut server = Server::new_async().await;
        let huge = (i64::MAX / 10).to_string();
        let _mocks = mock_sign_in(&mut server, "u1", "tok", &huge).await;
        let auth = auth_for(&server);
        let credential = OAuthProvider::google().credential(Some("x"), None);

        let user = auth.sign_in_with_credential(&credential).await.unwrap();
        assert_eq!(user.sts_token_manager.expiration_time, i64::MAX);
        assert_eq!(auth.get_id_token(false).await.unwrap(), "tok");
    }

    #[tokio::test]
    async fn test_sign_out_notifies_once() {
        let mut server = Server::new_async().await;
        let _mocks = mock_sign_in(&mut server, "u1", "tok", "3600").await;
        let auth = auth_for(&server);
        let credential = OAuthProvider::google().credential(Some("x"), None);
        auth.sign_in_with_credential(&credential).await.unwrap();

        let mut rx = SessionSource::subscribe(&auth);
        rx.borrow_and_update();
        auth.sign_out();
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_none());

        auth.sign_out();
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_create_auth_uri_sends_scopes() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/v1/accounts:createAuthUri")
            .match_query(key_query())
            .match_body(Matcher::PartialJson(json!({
                "providerId": "google.com",
                "oauthScope": "profile,email",
                "customParameter": { "prompt": "select_account" }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"authUri": "https://accounts.example.com/auth", "sessionId": "s-1", "providerId": "google.com"}"#)
            .create_async()
            .await;
        let auth = auth_for(&server);

        let mut provider = OAuthProvider::google();
        provider.add_scope("profile").add_scope("email");
        provider.set_custom_parameters([("prompt", "select_account")]);
        let uri = auth
            .create_auth_uri(&provider, "http://localhost/callback")
            .await
            .unwrap();

        m.assert_async().await;
        assert_eq!(uri.auth_uri, "https://accounts.example.com/auth");
        assert_eq!(uri.session_id, "s-1");
    }

    #[tokio::test]
    async fn test_id_token_result() {
        let mut server = Server::new_async().await;
        let now = Utc::now().timestamp();
        let token = make_id_token("u1", now, now + 3600);
        let _mocks = mock_sign_in(&mut server, "u1", &token, "3600").await;
        let auth = auth_for(&server);
        let credential = OAuthProvider::google().credential(Some("x"), None);
        auth.sign_in_with_credential(&credential).await.unwrap();

        let result = auth.get_id_token_result(false).await.unwrap();
        assert_eq!(result.token, token);
        assert_eq!(result.expiration_time.timestamp(), now + 3600);
        assert_eq!(result.sign_in_provider.as_deref(), Some("google.com"));
    }

    #[tokio::test]
    async fn test_redirect_result_sends_session_id() {
        let mut server = Server::new_async().await;
        let sign_in = server
            .mock("POST", "/v1/accounts:signInWithIdp")
            .match_query(key_query())
            .match_body(Matcher::PartialJson(json!({
                "requestUri": "http://localhost/callback?code=abc",
                "sessionId": "s-1",
                "returnSecureToken": true
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"localId": "u2", "idToken": "tok", "refreshToken": "r", "expiresIn": 3600, "providerId": "google.com"}"#)
            .create_async()
            .await;
        let _lookup = server
            .mock("POST", "/v1/accounts:lookup")
            .match_query(key_query())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"users": []}"#)
            .create_async()
            .await;
        let auth = auth_for(&server);

        let user = auth
            .sign_in_with_redirect_result("http://localhost/callback?code=abc", "s-1")
            .await
            .unwrap();
        sign_in.assert_async().await;
        assert_eq!(user.uid, "u2");
        assert!(!user.is_anonymous);
    }

    #[tokio::test]
    async fn test_reload_updates_profile_silently() {
        let mut server = Server::new_async().await;
        let _mocks = mock_sign_in(&mut server, "u1", "tok", "3600").await;
        let auth = auth_for(&server);
        let credential = OAuthProvider::google().credential(Some("x"), None);
        auth.sign_in_with_credential(&credential).await.unwrap();

        let mut rx = SessionSource::subscribe(&auth);
        rx.borrow_and_update();
        let user = auth.reload().await.unwrap();

        assert_eq!(user.display_name.as_deref(), Some("Ada"));
        assert_eq!(auth.current_user().unwrap().display_name.as_deref(), Some("Ada"));
        assert!(!rx.has_changed().unwrap());
    }
}
