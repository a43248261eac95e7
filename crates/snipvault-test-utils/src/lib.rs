//! Testing utilities, fixtures, and builders for snipvault.
//!
//! - **Builders**: fluent construction of `SnippetInput`
//! - **Fixtures**: memory stores pre-seeded with snippets, and helpers that
//!   put a store into states the repository would never produce itself
//! - **Assertions**: comparisons between stored snippets and their input
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use snipvault_test_utils::{fixtures::seeded_store, SnippetInputBuilder};
//!
//! #[tokio::test]
//! async fn test_listing() {
//!     let seeded = seeded_store(3).await;
//!     let listed = seeded.vault().snippets().list().await.unwrap();
//!     assert_eq!(listed.len(), 3);
//! }
//! ```

pub mod assertions;
pub mod builders;
pub mod fixtures;

// Re-export commonly used items
pub use builders::SnippetInputBuilder;
pub use fixtures::{corrupt_snippet, seeded_store, Seeded};
