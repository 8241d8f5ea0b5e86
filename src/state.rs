//! Shared application state.
//!
//! Bundles what an embedding application reads: the configuration, the
//! initialized provider client, and the observable current-user slot.

use crate::client::Client;
use crate::config::ConfigV1;
use crate::store::UserSlot;
use std::sync::Arc;

/// Application state, cheap to clone into whatever needs it.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration loaded at startup.
    pub config: Arc<ConfigV1>,
    /// Connection, auth, OAuth provider and database handles.
    pub client: Arc<Client>,
    /// Current user, kept up to date by the auth state publisher.
    pub user: UserSlot,
}
