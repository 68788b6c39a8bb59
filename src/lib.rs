//! Bookshelf application library
//!
//! Domain modules plus the bootstrap used by both the server binary and the CLI.

pub mod app;
pub mod modules;

pub use app::{build_registry, migrate, serve};
