//! Codec Integration Tests
//!
//! Full and delta encoding of tracked documents through the public API.

#[path = "../common/mod.rs"]
mod common;

mod delta_scenarios;
mod errors;
mod link_bags;
