pub mod config;
pub mod infra;
pub mod pipeline;
pub mod scout;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;
