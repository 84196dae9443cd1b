//! Common test utilities for bulk-certs integration tests

#[allow(dead_code)]
pub mod config;
#[allow(dead_code)]
pub mod services;

#[allow(unused_imports)]
pub use config::*;
#[allow(unused_imports)]
pub use services::*;
