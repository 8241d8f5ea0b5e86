pub mod service;
pub mod session;
pub mod token;

// Re-export so we can do "use crate::auth::*;"
pub use service::{AuthService, AuthUri};
pub use session::SessionSource;
pub use token::{parse_id_token, IdTokenResult};
