pub mod firestore;
pub mod value;

pub use firestore::{Database, Document};
