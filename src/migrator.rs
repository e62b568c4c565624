//! Embedded schema migrator, shared with the standalone `migrations` runner.

pub use migrations::Migrator;
