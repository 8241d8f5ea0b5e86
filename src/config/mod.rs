// This module re-exports important pieces for convenience,
// so we can "use crate::config::*" easily.
pub mod connection;
pub mod logging;
pub mod pairing;
pub mod types;

pub use connection::*;
pub use logging::*;
pub use pairing::*;
pub use types::*;
