//! Republishes the auth service's session notifications into a [`UserSlot`].
//!
//! Each notification is numbered. Sign-outs publish immediately; sign-ins
//! fetch an ID token first and publish the enriched record when the fetch
//! resolves. The slot drops any completion older than what it already holds,
//! so a sign-in whose fetch finishes after a later sign-out is discarded.

use std::sync::Arc;

use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use super::slot::UserSlot;
use crate::auth::SessionSource;
use crate::error::SdkError;
use crate::models::{RawUser, UserRecord};

/// Handle to a running publisher. Dropping it, or calling
/// [`Subscription::unsubscribe`], stops the publisher and cancels any
/// in-flight token fetch.
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        drop(self);
    }

    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub struct AuthStatePublisher;

impl AuthStatePublisher {
    /// Subscribe to `source` and keep `slot` in step with it. The current
    /// session is handled right away; must be called inside a tokio runtime.
    pub fn start(source: Arc<dyn SessionSource>, slot: UserSlot) -> Subscription {
        let task = tokio::spawn(run(source, slot));
        Subscription { task }
    }
}

async fn enrich(source: Arc<dyn SessionSource>, user: RawUser) -> Result<UserRecord, SdkError> {
    let token = source.get_id_token(false).await?;
    if token.is_empty() {
        return Err(SdkError::InvalidToken("provider returned an empty token".to_string()));
    }
    Ok(UserRecord::signed_in(user, token))
}

#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Published,
    Stale,
    Closed,
}

fn publish_sign_in(slot: &UserSlot, seq: u64, record: UserRecord) -> Outcome {
    if slot.publish(seq, record) {
        Outcome::Published
    } else if slot.is_closed() {
        Outcome::Closed
    } else {
        Outcome::Stale
    }
}

async fn run(source: Arc<dyn SessionSource>, slot: UserSlot) {
    let mut sessions = source.subscribe();
    let mut inflight = JoinSet::new();
    let mut seq: u64 = slot.seq();

    loop {
        tokio::select! {
            changed = sessions.changed() => {
                if changed.is_err() {
                    debug!("Session source closed; publisher stopping");
                    break;
                }
                let session = sessions.borrow_and_update().clone();
                seq += 1;

                match session {
                    None => {
                        debug!(seq, "Publishing signed-out user");
                        slot.publish(seq, UserRecord::SignedOut);
                    }
                    Some(user) => {
                        let source = source.clone();
                        let slot = slot.clone();
                        let notified = seq;
                        inflight.spawn(async move {
                            let uid = user.uid.clone();
                            match enrich(source, user).await {
                                Ok(record) => match publish_sign_in(&slot, notified, record) {
                                    Outcome::Published => {
                                        info!(seq = notified, "Published signed-in user '{}'", uid);
                                    }
                                    Outcome::Stale => {
                                        debug!(seq = notified, "Discarded stale sign-in for '{}'", uid);
                                    }
                                    Outcome::Closed => {
                                        debug!(seq = notified, "Slot closed; dropped sign-in for '{}'", uid);
                                    }
                                },
                                Err(e) => {
                                    warn!(seq = notified, "Token fetch for '{}' failed: {}", uid, e);
                                }
                            }
                        });
                    }
                }
            }
            Some(joined) = inflight.join_next(), if !inflight.is_empty() => {
                if let Err(e) = joined {
                    if e.is_panic() {
                        warn!("User enrichment task panicked: {}", e);
                    }
                }
            }
        }
    }

    // Let pending enrichments finish so the final state is published.
    while let Some(joined) = inflight.join_next().await {
        if let Err(e) = joined {
            if e.is_panic() {
                warn!("User enrichment task panicked: {}", e);
            }
        }
    }
}
