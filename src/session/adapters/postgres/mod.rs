//! `PostgreSQL` adapter for work session persistence.

mod models;
mod repository;
mod schema;


pub use repository::{PostgresWorkSessionRepository, SessionPgPool};
