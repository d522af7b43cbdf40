//! Unit test suite entry point.

mod concurrency_tests;
mod config_tests;
mod persistence_tests;
mod scenario_tests;
