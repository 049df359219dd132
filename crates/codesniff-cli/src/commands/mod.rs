//! Subcommand implementations.

pub mod check;
pub mod docs;
pub mod init;
pub mod list_standards;
pub mod output;
