//! Step definitions for context delegation scenarios.

mod given;
mod then;
mod when;
pub mod world;
