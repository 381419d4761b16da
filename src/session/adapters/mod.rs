//! Adapter implementations for work session ports.

pub mod memory;
pub mod postgres;
