#[cfg(feature = "azure")]
pub mod azure;
pub mod echo;
mod types;

pub use types::{ChatRequest, Provider};
