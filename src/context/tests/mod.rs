//! Unit tests for the context module.

mod delegation_tests;
