//! Trial result records

pub mod fitness;
pub mod health;
pub mod run_result;
