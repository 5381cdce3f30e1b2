//! Shared test fixtures

pub mod metadata;
#[cfg(not(target_arch = "wasm32"))]
pub mod node;
