pub mod cache;
pub mod common;
pub mod config;
pub mod market;
pub mod trade;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
