pub mod runner;
pub mod signal;
