//! Unit tests for the work session module.
