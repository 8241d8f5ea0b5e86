//! Library exports for authwatch, shared between the binary and tests.

pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod pairing;
pub mod startup;
pub mod state;
pub mod store;
pub mod utils;

pub use error::{SdkError, SdkResult};
