pub mod config;
pub mod constants;
pub mod domain;
pub mod error;
pub mod observability;
pub mod server;

// Layered boundaries: use case and ports, then adapters
pub mod app;
pub mod infra;
