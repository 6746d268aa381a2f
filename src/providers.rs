//! Upstream provider implementations.

pub mod backend;

// Re-export for convenience
pub use backend::BackendClient;
