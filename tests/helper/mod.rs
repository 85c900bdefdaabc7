//! Shared builders for the integration tests

#[allow(dead_code)]
pub mod peers;
