//! `PostgreSQL` adapters for contexts and delegations.

mod models;
mod repository;
mod schema;

#[cfg(test)]
mod tests;

pub use repository::{ContextPgPool, PostgresContextRepository, PostgresDelegationRepository};
