use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use crate::models::UserRecord;

#[derive(Debug, Clone)]
struct Versioned {
    seq: u64,
    record: UserRecord,
}

/// The shared, observable "current user" value.
///
/// One writer publishes records tagged with a sequence number; a publish
/// only lands if its number is higher than the one already held, so a slow
/// enrichment can never overwrite a newer state. Any number of readers
/// subscribe through [`UserSubscriber`]. Clones share the same slot.
#[derive(Clone)]
pub struct UserSlot {
    inner: Arc<SlotInner>,
}

struct SlotInner {
    tx: Mutex<Option<watch::Sender<Versioned>>>,
    rx: watch::Receiver<Versioned>,
}

/// Returned by [`UserSubscriber::changed`] once the slot has been closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("user slot closed")]
pub struct SlotClosed;

impl UserSlot {
    /// A new slot holding `SignedOut`.
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(Versioned {
            seq: 0,
            record: UserRecord::SignedOut,
        });
        UserSlot {
            inner: Arc::new(SlotInner {
                tx: Mutex::new(Some(tx)),
                rx,
            }),
        }
    }

    pub fn get(&self) -> UserRecord {
        self.inner.rx.borrow().record.clone()
    }

    /// Sequence number of the record currently held.
    pub fn seq(&self) -> u64 {
        self.inner.rx.borrow().seq
    }

    pub fn subscribe(&self) -> UserSubscriber {
        let mut rx = self.inner.rx.clone();
        rx.borrow_and_update();
        UserSubscriber { rx }
    }

    /// Replace the held record if `seq` is newer than the current one.
    /// Returns whether the record was stored.
    pub fn publish(&self, seq: u64, record: UserRecord) -> bool {
        let tx = match self.inner.tx.lock() {
            Ok(tx) => tx,
            Err(poisoned) => poisoned.into_inner(),
        };
        match tx.as_ref() {
            Some(tx) => tx.send_if_modified(|current| {
                if seq <= current.seq {
                    return false;
                }
                *current = Versioned { seq, record };
                true
            }),
            None => false,
        }
    }

    /// Stop accepting publishes and wake every subscriber with `SlotClosed`.
    /// The last record stays readable.
    pub fn close(&self) {
        let mut tx = match self.inner.tx.lock() {
            Ok(tx) => tx,
            Err(poisoned) => poisoned.into_inner(),
        };
        tx.take();
    }

    pub fn is_closed(&self) -> bool {
        match self.inner.tx.lock() {
            Ok(tx) => tx.is_none(),
            Err(poisoned) => poisoned.into_inner().is_none(),
        }
    }
}

impl Default for UserSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// A reader of a [`UserSlot`].
pub struct UserSubscriber {
    rx: watch::Receiver<Versioned>,
}

impl UserSubscriber {
    /// The record currently held, marking it as seen.
    pub fn current(&mut self) -> UserRecord {
        self.rx.borrow_and_update().record.clone()
    }

    /// Wait for the next published record. Intermediate records published
    /// faster than the reader polls are skipped; the latest one is returned.
    pub async fn changed(&mut self) -> Result<UserRecord, SlotClosed> {
        self.rx.changed().await.map_err(|_| SlotClosed)?;
        Ok(self.current())
    }

    /// Wait until a record satisfies `predicate`, checking the current one
    /// first.
    pub async fn wait_for<F>(&mut self, mut predicate: F) -> Result<UserRecord, SlotClosed>
    where
        F: FnMut(&UserRecord) -> bool,
    {
        let current = self.current();
        if predicate(&current) {
            return Ok(current);
        }
        loop {
            let record = self.changed().await?;
            if predicate(&record) {
                return Ok(record);
            }
        }
    }
}
