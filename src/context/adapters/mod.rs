//! Adapter implementations for context ports.

pub mod memory;
pub mod postgres;
