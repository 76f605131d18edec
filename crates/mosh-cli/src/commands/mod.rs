//! Subcommand implementations.

pub mod bloom;
pub mod inspect;
pub mod melt;
