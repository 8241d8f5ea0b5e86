//! Application startup.
//!
//! Initializes the provider client, wires the auth state publisher to a
//! fresh user slot, and (for the binary) follows user transitions until
//! shutdown.

use std::sync::Arc;

use tracing::info;

use crate::client::initialize_client;
use crate::config::ConfigV1;
use crate::error::SdkResult;
use crate::state::AppState;
use crate::store::{AuthStatePublisher, Subscription, UserSlot};

/// Build the application state and start publishing auth state into it.
/// Keep the returned `Subscription` alive for as long as the slot should
/// follow the session. Must be called inside a tokio runtime.
pub fn start(config: Arc<ConfigV1>) -> SdkResult<(AppState, Subscription)> {
    let client = Arc::new(initialize_client(&config)?);
    let user = UserSlot::new();
    let subscription = AuthStatePublisher::start(client.auth.clone(), user.clone());

    let state = AppState {
        config,
        client,
        user,
    };
    Ok((state, subscription))
}

/// Start the client and log every user transition until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the client cannot be initialized.
pub async fn run(config: Arc<ConfigV1>) -> Result<(), Box<dyn std::error::Error>> {
    let (state, subscription) = start(config)?;
    let mut user = state.user.subscribe();

    info!(
        "Watching auth state for project '{}'",
        state.config.connection.project_id
    );

    loop {
        tokio::select! {
            changed = user.changed() => match changed {
                Ok(record) => match record.uid() {
                    Some(uid) => info!("User '{}' is signed in", uid),
                    None => info!("No user is signed in"),
                },
                Err(_) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    subscription.unsubscribe();
    state.user.close();
    Ok(())
}
