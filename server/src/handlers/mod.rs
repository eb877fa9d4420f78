//! Request handlers for user documents.

mod documents;

pub use documents::*;
