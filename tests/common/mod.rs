pub mod fake_runner;
pub mod fixtures;
