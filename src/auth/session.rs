use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::SdkResult;
use crate::models::RawUser;

/// Source of sign-in/sign-out notifications and of ID tokens for the
/// current user. `AuthService` is the real one; tests substitute fakes.
#[async_trait]
pub trait SessionSource: Send + Sync {
    /// A receiver whose current value is the session at subscription time;
    /// it is marked changed on every later sign-in or sign-out.
    fn subscribe(&self) -> watch::Receiver<Option<RawUser>>;

    /// A bearer token for whoever is signed in when the call is made.
    async fn get_id_token(&self, force_refresh: bool) -> SdkResult<String>;
}
