pub mod record;
pub mod user;

pub use record::{SignedInUser, UserRecord};
pub use user::{RawUser, StsTokenManager, UserInfo};
