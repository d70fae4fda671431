//! Reproduction operators
//!
//! All operators take their inputs by value or clone them first, so sibling
//! offspring never share parameter state.

pub mod composition;
pub mod crossover;
pub mod mutation;

pub use composition::{compose, composition};
pub use crossover::crossover;
pub use mutation::{mutate, mutate_scenario};
