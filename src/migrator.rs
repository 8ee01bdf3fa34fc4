//! Embedded migrator backed by the `migrations` workspace member.

pub use migrations::Migrator;
