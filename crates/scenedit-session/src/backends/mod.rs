#[cfg(feature = "json")]
pub mod json;

#[cfg(feature = "json")]
pub use json::{JsonAdapter, JsonBackendError};
