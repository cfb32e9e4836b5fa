pub mod classifier;
pub mod discovery;
pub mod fields;
pub mod record;
pub mod stats;
pub mod sync;
pub mod workflow;
