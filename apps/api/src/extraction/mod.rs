// Text-level extraction from uploaded résumés.
// Document parsing is blocking and runs inside tokio::task::spawn_blocking.

pub mod contact;
pub mod document;
pub mod identity;

pub use document::{FileTextExtractor, TextExtractor};
