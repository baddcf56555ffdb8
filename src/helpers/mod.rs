//! Helper functions shared by the renderers
//!
//! Date formatting, word counting and small HTML builders.

mod date;
mod html;
mod words;

pub use date::*;
pub use html::*;
pub use words::*;
