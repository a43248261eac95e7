//! Command handlers for the snipvault CLI.

pub mod index;
pub mod serve;
pub mod snippets;

pub use index::*;
pub use serve::*;
pub use snippets::*;
