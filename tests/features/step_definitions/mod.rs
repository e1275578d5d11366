//! Step definitions for Cucumber scenarios

pub mod membership_steps;
pub mod roster_steps;
