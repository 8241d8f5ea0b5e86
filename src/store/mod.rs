pub mod publisher;
pub mod slot;

// Re-export the primary store items so code outside can do
// "use crate::store::{UserSlot, AuthStatePublisher};"
pub use publisher::{AuthStatePublisher, Subscription};
pub use slot::{SlotClosed, UserSlot, UserSubscriber};
